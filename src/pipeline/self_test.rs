// ==========================================
// 数据管道 - 自检流程
// ==========================================
// 用固定的 5 行样本跑一遍完整管道，供 CI 冒烟测试
// 临时 CSV 在 NamedTempFile 析构时删除（成功/失败均删除）
// ==========================================

use crate::domain::{Column, ColumnData, Dataset, PipelineRunResult};
use crate::pipeline::csv_writer::write_csv;
use crate::pipeline::error::PipelineResult;
use crate::pipeline::orchestrator::DataPipeline;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::{error, info};

/// 自检输出表名
pub const TEST_OUTPUT_TABLE: &str = "test_output";

/// 自检样本: 5 行，amount 无空值
pub fn self_test_dataset() -> Dataset {
    let columns = vec![
        Column::new("customer_id", ColumnData::Integer((1..=5).map(Some).collect())),
        Column::new(
            "amount",
            ColumnData::Float(
                [100.0, 200.0, 150.0, 300.0, 250.0]
                    .into_iter()
                    .map(Some)
                    .collect(),
            ),
        ),
        Column::new(
            "quantity",
            ColumnData::Integer([2, 1, 3, 2, 1].into_iter().map(Some).collect()),
        ),
        Column::new(
            "product",
            ColumnData::Text(
                ["A", "B", "A", "C", "B"]
                    .into_iter()
                    .map(|p| Some(p.to_string()))
                    .collect(),
            ),
        ),
    ];

    // 固定列定义，长度一致
    Dataset::new(columns).unwrap_or_default()
}

impl DataPipeline {
    /// 自检: 写临时 CSV → run_pipeline(临时文件, "test_output")
    pub fn run_test_pipeline(&self) -> PipelineRunResult {
        self.run_test_pipeline_in(&std::env::temp_dir())
    }

    /// 在指定目录下创建临时 CSV 并执行自检
    pub(crate) fn run_test_pipeline_in(&self, temp_dir: &Path) -> PipelineRunResult {
        info!(dir = %temp_dir.display(), "开始管道自检");
        let start = Instant::now();

        let temp_file = match write_self_test_csv(temp_dir) {
            Ok(temp_file) => temp_file,
            Err(e) => {
                error!(error = %e, "自检样本写入失败");
                return PipelineRunResult::failed(e, start.elapsed().as_secs_f64());
            }
        };

        let result = self.run_pipeline(temp_file.path(), TEST_OUTPUT_TABLE);
        info!(success = result.success, "管道自检结束");
        result
    }
}

fn write_self_test_csv(temp_dir: &Path) -> PipelineResult<NamedTempFile> {
    let mut temp_file = tempfile::Builder::new()
        .prefix("data_pipeline_selftest_")
        .suffix(".csv")
        .tempfile_in(temp_dir)?;

    write_csv(&self_test_dataset(), temp_file.as_file_mut())?;
    temp_file.flush()?;
    Ok(temp_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_test_dataset_shape() {
        let dataset = self_test_dataset();
        assert_eq!(dataset.row_count(), 5);
        assert_eq!(
            dataset.column_names(),
            vec!["customer_id", "amount", "quantity", "product"]
        );
        assert_eq!(dataset.column("amount").unwrap().data().null_count(), 0);
    }

    #[test]
    fn test_run_test_pipeline_passes() {
        let pipeline = DataPipeline::in_memory().unwrap();
        let result = pipeline.run_test_pipeline();

        assert!(result.success, "{:?}", result);
        assert_eq!(result.rows_processed, 5);
        assert_eq!(result.output_table.as_deref(), Some(TEST_OUTPUT_TABLE));
        assert_eq!(result.message(), Some("Validation passed: 5 rows"));
    }

    #[test]
    fn test_temp_file_removed_after_run() {
        let pipeline = DataPipeline::in_memory().unwrap();
        let result = pipeline.run_test_pipeline();

        let input = result.input_file.expect("input file recorded");
        assert!(input.ends_with(".csv"));
        assert!(!std::path::Path::new(&input).exists());
    }

    #[test]
    fn test_unwritable_temp_dir_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does_not_exist");

        let pipeline = DataPipeline::in_memory().unwrap();
        let result = pipeline.run_test_pipeline_in(&missing);

        assert!(!result.success);
        assert!(result.error().is_some());
        assert_eq!(result.rows_processed, 0);
        assert!(result.duration_seconds.is_finite() && result.duration_seconds >= 0.0);
        // 未进入抽取阶段，连接不会被打开
        assert!(!pipeline.storage().is_open());
    }

    #[test]
    fn test_total_value_loaded() {
        let pipeline = DataPipeline::in_memory().unwrap();
        assert!(pipeline.run_test_pipeline().success);

        let total: f64 = pipeline
            .storage()
            .with_connection(|conn| {
                Ok(conn.query_row(
                    "SELECT SUM(total_value) FROM test_output",
                    [],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        // 200 + 200 + 450 + 600 + 250
        assert!((total - 1700.0).abs() < 1e-9);
    }
}
