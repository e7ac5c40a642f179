// ==========================================
// 数据管道 - 编排器 (DataPipeline)
// ==========================================
// 流程: 抽取 → 转换 → 加载 → 校验，计时并汇总运行结果
// 状态机: Extracting → Transforming → Loading → Validating → Done
//         任一阶段失败进入 Failed（吸收态）
// 红线: 运行结果是唯一的错误上报通道，run_pipeline 不返回 Err、不向外 panic
// ==========================================

use crate::config::PipelineConfig;
use crate::db::StorageHandle;
use crate::domain::{Dataset, PipelineRunResult, PipelineStage, ValidationOutcome};
use crate::logging::build_dispatch;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::extractor::CsvExtractor;
use crate::pipeline::loader::Loader;
use crate::pipeline::transformer::Transformer;
use crate::pipeline::validator::OutputValidator;
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, debug_span, error, info, info_span, Dispatch};
use uuid::Uuid;

/// 默认输出表名
pub const DEFAULT_OUTPUT_TABLE: &str = "processed_data";

// ==========================================
// 阶段执行汇总
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    /// 抽取到的行数
    pub rows_processed: usize,
    /// None: 加载失败，校验被跳过
    pub validation: Option<ValidationOutcome>,
}

// ==========================================
// DataPipeline - 管道编排器
// ==========================================
pub struct DataPipeline {
    // 存储句柄（首次加载/校验时才打开连接）
    storage: StorageHandle,

    // 管道专属日志分发器；None 时沿用调用方的订阅者
    dispatch: Option<Dispatch>,
}

impl DataPipeline {
    /// 创建管道
    ///
    /// # 参数
    /// - config: 连接串 + 日志配置
    ///
    /// # 返回
    /// - Err(Storage(UnsupportedUrl)): 连接串不是 sqlite
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        let dispatch = config.logging.as_ref().map(build_dispatch);

        let storage = with_dispatch(dispatch.as_ref(), || {
            let storage = StorageHandle::new(config.db_url.clone())?;
            info!(
                db_url = %storage.url(),
                in_memory = storage.target().is_in_memory(),
                "管道初始化完成"
            );
            Ok::<_, PipelineError>(storage)
        })?;

        Ok(Self { storage, dispatch })
    }

    /// 按环境变量创建管道（DATABASE_URL，缺省为内存库）
    pub fn from_env() -> PipelineResult<Self> {
        Self::new(PipelineConfig::from_env())
    }

    /// 内存库 + 调用方日志订阅者
    pub fn in_memory() -> PipelineResult<Self> {
        Self::new(PipelineConfig::default())
    }

    pub fn storage(&self) -> &StorageHandle {
        &self.storage
    }

    pub fn db_url(&self) -> &str {
        self.storage.url()
    }

    /// 在管道日志范围内执行
    fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        with_dispatch(self.dispatch.as_ref(), f)
    }

    /// 抽取 CSV 文件
    pub fn extract(&self, file_path: impl AsRef<Path>) -> PipelineResult<Dataset> {
        self.in_scope(|| timed_stage("extract", || CsvExtractor.extract(file_path.as_ref())))
    }

    /// 转换数据集（返回新数据集，不修改入参）
    pub fn transform(&self, dataset: &Dataset) -> PipelineResult<Dataset> {
        self.in_scope(|| timed_stage("transform", || Transformer.transform(dataset)))
    }

    /// 加载数据集到指定表（整表替换）
    pub fn load(&self, dataset: &Dataset, table_name: &str) -> bool {
        self.in_scope(|| {
            timed_stage("load", || Loader::new(&self.storage).load(dataset, table_name))
        })
    }

    /// 校验输出表
    pub fn validate_output(&self, table_name: &str) -> ValidationOutcome {
        self.in_scope(|| {
            timed_stage("validate", || {
                OutputValidator::new(&self.storage).validate(table_name)
            })
        })
    }

    /// 执行完整 ETL 流程
    ///
    /// # 返回
    /// - success=true: 校验通过
    /// - success=false + message: 加载失败 / 校验未通过
    /// - success=false + error: 抽取/转换失败或未捕获的 panic
    pub fn run_pipeline(
        &self,
        input_file: impl AsRef<Path>,
        output_table: &str,
    ) -> PipelineRunResult {
        let input_file = input_file.as_ref();
        let input_display = input_file.display().to_string();
        let run_id = Uuid::new_v4();

        self.in_scope(|| {
            let span = info_span!(
                "pipeline_run",
                run_id = %run_id,
                input = %input_display,
                table = output_table
            );
            let _enter = span.enter();

            info!("开始执行管道");
            let start = Instant::now();
            let stage = Cell::new(PipelineStage::Extracting);

            let outcome = run_guarded(&stage, || self.run_stages(&stage, input_file, output_table));
            let duration_seconds = start.elapsed().as_secs_f64();

            let result = match outcome {
                Ok(StageReport {
                    rows_processed,
                    validation: Some(validation),
                }) => PipelineRunResult::completed(
                    input_display.clone(),
                    output_table,
                    rows_processed,
                    duration_seconds,
                    validation,
                ),
                Ok(StageReport {
                    rows_processed,
                    validation: None,
                }) => PipelineRunResult::load_failed(
                    input_display.clone(),
                    output_table,
                    rows_processed,
                    duration_seconds,
                ),
                Err(e) => {
                    error!(error = %e, "管道执行失败");
                    PipelineRunResult::failed(e, duration_seconds)
                }
            };

            info!(
                success = result.success,
                rows = result.rows_processed,
                duration_seconds,
                "管道执行结束"
            );
            result
        })
    }

    /// 依次执行各阶段，stage 记录当前所处阶段
    fn run_stages(
        &self,
        stage: &Cell<PipelineStage>,
        input_file: &Path,
        output_table: &str,
    ) -> PipelineResult<StageReport> {
        // === 阶段 1: 抽取 ===
        advance(stage, PipelineStage::Extracting);
        let raw = self.extract(input_file)?;
        let rows_processed = raw.row_count();

        // === 阶段 2: 转换 ===
        advance(stage, PipelineStage::Transforming);
        let transformed = self.transform(&raw)?;

        // === 阶段 3: 加载 ===
        advance(stage, PipelineStage::Loading);
        if !self.load(&transformed, output_table) {
            advance(stage, PipelineStage::Failed);
            return Ok(StageReport {
                rows_processed,
                validation: None,
            });
        }

        // === 阶段 4: 校验 ===
        advance(stage, PipelineStage::Validating);
        let validation = self.validate_output(output_table);

        advance(
            stage,
            if validation.is_valid {
                PipelineStage::Done
            } else {
                PipelineStage::Failed
            },
        );
        Ok(StageReport {
            rows_processed,
            validation: Some(validation),
        })
    }
}

impl std::fmt::Debug for DataPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataPipeline")
            .field("storage", &self.storage)
            .field("scoped_logging", &self.dispatch.is_some())
            .finish()
    }
}

fn with_dispatch<T>(dispatch: Option<&Dispatch>, f: impl FnOnce() -> T) -> T {
    match dispatch {
        Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
        None => f(),
    }
}

/// 在阶段 span 内执行，结束时记录耗时
fn timed_stage<T>(name: &'static str, f: impl FnOnce() -> T) -> T {
    let span = debug_span!("stage", name);
    let _enter = span.enter();

    let start = Instant::now();
    let out = f();
    debug!(elapsed_ms = start.elapsed().as_millis() as u64, "阶段完成");
    out
}

fn advance(stage: &Cell<PipelineStage>, next: PipelineStage) {
    let prev = stage.replace(next);
    if prev != next {
        debug!(from = %prev, to = %next, "阶段切换");
    }
}

/// 执行阶段闭包，把 panic 转为 Unhandled 错误并标记 Failed
pub(crate) fn run_guarded<F>(stage: &Cell<PipelineStage>, f: F) -> PipelineResult<StageReport>
where
    F: FnOnce() -> PipelineResult<StageReport>,
{
    let result = match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(PipelineError::Unhandled(panic_message(&*payload))),
    };

    if result.is_err() {
        // 保留失败阶段用于日志，之后进入吸收态
        error!(stage = %stage.get(), "阶段失败");
        stage.set(PipelineStage::Failed);
    }
    result
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "未知 panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StorageError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", content).unwrap();
        temp_file
    }

    #[test]
    fn test_new_rejects_unsupported_url() {
        let err = DataPipeline::new(PipelineConfig::default().with_db_url("mysql://localhost/db"))
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Storage(StorageError::UnsupportedUrl(_))
        ));
    }

    #[test]
    fn test_connection_opened_lazily() {
        let pipeline = DataPipeline::in_memory().unwrap();
        assert!(!pipeline.storage().is_open());

        let file = csv_file("a\n1\n");
        let _ = pipeline.extract(file.path()).unwrap();
        assert!(!pipeline.storage().is_open());

        let result = pipeline.run_pipeline(file.path(), "t");
        assert!(result.success);
        assert!(pipeline.storage().is_open());
    }

    #[test]
    fn test_run_pipeline_success() {
        let pipeline = DataPipeline::in_memory().unwrap();
        let file = csv_file("id,amount,quantity\n1,10.0,2\n2,,3\n3,30.0,1\n");

        let result = pipeline.run_pipeline(file.path(), "out");
        assert!(result.success, "{:?}", result);
        assert_eq!(result.rows_processed, 3);
        assert_eq!(result.message(), Some("Validation passed: 3 rows"));
        assert_eq!(result.output_table.as_deref(), Some("out"));
        assert!(result.duration_seconds >= 0.0);
    }

    #[test]
    fn test_run_pipeline_missing_file() {
        let pipeline = DataPipeline::in_memory().unwrap();
        let result = pipeline.run_pipeline("/nonexistent/input.csv", "out");

        assert!(!result.success);
        let error = result.error().unwrap();
        assert!(error.contains("/nonexistent/input.csv"), "{}", error);
        assert_eq!(result.rows_processed, 0);
        assert!(result.input_file.is_none());
    }

    #[test]
    fn test_run_pipeline_load_failure() {
        let pipeline = DataPipeline::in_memory().unwrap();
        let file = csv_file("a\n1\n");

        let result = pipeline.run_pipeline(file.path(), "");
        assert!(!result.success);
        assert_eq!(result.message(), Some("Load failed"));
        assert_eq!(result.rows_processed, 1);
    }

    #[test]
    fn test_run_pipeline_empty_input_fails_validation() {
        let pipeline = DataPipeline::in_memory().unwrap();
        let file = csv_file("a,b\n");

        let result = pipeline.run_pipeline(file.path(), "empty");
        assert!(!result.success);
        assert_eq!(result.message(), Some("Validation failed: No data"));
        assert_eq!(result.rows_processed, 0);
    }

    #[test]
    fn test_run_pipeline_transform_failure() {
        let pipeline = DataPipeline::in_memory().unwrap();
        let file = csv_file("amount\nabc\n");

        let result = pipeline.run_pipeline(file.path(), "out");
        assert!(!result.success);
        assert!(result.error().is_some());
    }

    #[test]
    fn test_run_guarded_converts_panic() {
        let stage = Cell::new(PipelineStage::Loading);
        let result = run_guarded(&stage, || panic!("boom"));

        assert!(matches!(result, Err(PipelineError::Unhandled(ref m)) if m == "boom"));
        assert_eq!(stage.get(), PipelineStage::Failed);
    }

    #[test]
    fn test_run_guarded_passes_through_ok() {
        let stage = Cell::new(PipelineStage::Done);
        let report = StageReport {
            rows_processed: 2,
            validation: Some(ValidationOutcome::passed(2)),
        };
        let expected = report.clone();

        assert_eq!(run_guarded(&stage, || Ok(report)).unwrap(), expected);
        assert_eq!(stage.get(), PipelineStage::Done);
    }

    #[test]
    fn test_timed_stage_returns_inner_value() {
        let dispatch = build_dispatch(&crate::config::LoggingConfig::default().with_filter("debug"));
        let out = tracing::dispatcher::with_default(&dispatch, || timed_stage("extract", || 42));
        assert_eq!(out, 42);
    }

    #[test]
    fn test_panic_message_formats() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*owned), "owned");
        let other: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(&*other), "未知 panic");
    }

    #[test]
    fn test_scoped_logging_pipeline_runs() {
        let config = PipelineConfig::default()
            .with_logging(crate::config::LoggingConfig::default().with_filter("debug"));
        let pipeline = DataPipeline::new(config).unwrap();
        let file = csv_file("a\n1\n2\n");

        let result = pipeline.run_pipeline(file.path(), "t");
        assert!(result.success);
    }
}
