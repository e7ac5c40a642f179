// ==========================================
// 数据管道 - 抽取器 (Extract)
// ==========================================
// 职责: 读取带表头的 CSV 文件，推断列类型，生成 Dataset
// 失败: 文件不存在 → FileNotFound；格式错误 → ParseError
// ==========================================

use crate::domain::{Column, ColumnData, Dataset};
use crate::pipeline::error::{PipelineError, PipelineResult};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::path::Path;
use tracing::{error, info};

/// 识别为空值的单元格文本
pub const NULL_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None", "#N/A",
    "<NA>",
];

// ==========================================
// CSV 抽取器
// ==========================================
pub struct CsvExtractor;

impl CsvExtractor {
    /// 抽取 CSV 文件为数据集
    ///
    /// # 返回
    /// - Ok(Dataset): 列类型已推断的数据集
    /// - Err(FileNotFound): 路径不存在
    /// - Err(ParseError): 无表头、行字段数与表头不一致、非 UTF-8 等
    pub fn extract(&self, file_path: &Path) -> PipelineResult<Dataset> {
        info!(file = %file_path.display(), "开始抽取数据");

        // 检查文件存在
        if !file_path.exists() {
            let err = PipelineError::FileNotFound(file_path.display().to_string());
            error!(error = %err, "抽取失败");
            return Err(err);
        }

        match self.read_dataset(file_path) {
            Ok(dataset) => {
                info!(
                    rows = dataset.row_count(),
                    columns = dataset.column_count(),
                    "抽取完成"
                );
                Ok(dataset)
            }
            Err(e) => {
                error!(error = %e, "抽取失败");
                Err(e)
            }
        }
    }

    fn read_dataset(&self, file_path: &Path) -> PipelineResult<Dataset> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 短行补空；超长行在下方报错
            .from_path(file_path)?;

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() {
            return Err(PipelineError::ParseError(
                "文件无表头，无可解析的列".to_string(),
            ));
        }
        let headers = dedupe_headers(headers);

        // 按列收集原始单元格
        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for result in reader.records() {
            let record = result?;
            if record.len() > headers.len() {
                let line = record.position().map(|p| p.line()).unwrap_or(0);
                return Err(PipelineError::ParseError(format!(
                    "第 {} 行字段数 {} 超过表头列数 {}",
                    line,
                    record.len(),
                    headers.len()
                )));
            }

            for (col_idx, column) in cells.iter_mut().enumerate() {
                column.push(record.get(col_idx).and_then(normalize_null));
            }
        }

        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, values)| Column::new(name, infer_column(values)))
            .collect();

        Ok(Dataset::new(columns)?)
    }
}

/// 空值标准化：命中 NULL_TOKENS 的单元格视为 None
fn normalize_null(value: &str) -> Option<String> {
    if NULL_TOKENS.contains(&value) {
        None
    } else {
        Some(value.to_string())
    }
}

/// 重复表头去重：a, a → a, a.1
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut result = Vec::with_capacity(headers.len());

    for header in headers {
        let mut candidate = header.clone();
        while result.contains(&candidate) {
            let n = counts.entry(header.clone()).or_insert(0);
            *n += 1;
            candidate = format!("{}.{}", header, n);
        }
        result.push(candidate);
    }

    result
}

/// 列类型推断
///
/// # 规则（按顺序）
/// 1. 全部为空 → Float
/// 2. 非空值全部可解析为 i64 → Integer
/// 3. 非空值全部可解析为 f64 → Float（NaN 记为空）
/// 4. 非空值全部为 true/false（忽略大小写）→ Boolean
/// 5. 其他 → Text
pub fn infer_column(values: Vec<Option<String>>) -> ColumnData {
    if values.iter().all(Option::is_none) {
        return ColumnData::Float(vec![None; values.len()]);
    }

    if let Some(ints) = parse_all(&values, |s| s.parse::<i64>().ok()) {
        return ColumnData::Integer(ints);
    }

    if let Some(floats) = parse_all(&values, |s| s.parse::<f64>().ok()) {
        // "NAN" / "+nan" 等可解析为 NaN 的单元格同样视为空值
        let floats = floats
            .into_iter()
            .map(|v| v.filter(|f| !f.is_nan()))
            .collect();
        return ColumnData::Float(floats);
    }

    if let Some(bools) = parse_all(&values, parse_bool) {
        return ColumnData::Boolean(bools);
    }

    ColumnData::Text(values)
}

fn parse_all<T, F>(values: &[Option<String>], parse: F) -> Option<Vec<Option<T>>>
where
    F: Fn(&str) -> Option<T>,
{
    values
        .iter()
        .map(|v| match v {
            None => Some(None),
            Some(s) => parse(s.trim()).map(Some),
        })
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
