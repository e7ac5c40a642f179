// ==========================================
// 数据管道 - 转换器 (Transform)
// ==========================================
// 职责: 列名规范化 / amount 中位数补空 / total_value 派生 / processed_at 打时间戳
// 顺序: 先改名，再按规范化后的列名查找 amount / quantity
// 红线: 不修改调用方传入的数据集；不增减行
// ==========================================

use crate::domain::{Column, ColumnData, Dataset, DatasetError};
use crate::pipeline::error::{PipelineError, PipelineResult};
use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, warn};

pub const AMOUNT_COLUMN: &str = "amount";
pub const QUANTITY_COLUMN: &str = "quantity";
pub const TOTAL_VALUE_COLUMN: &str = "total_value";
pub const PROCESSED_AT_COLUMN: &str = "processed_at";

// ==========================================
// 转换器
// ==========================================
pub struct Transformer;

impl Transformer {
    /// 以当前本地时间作为 processed_at 执行转换
    pub fn transform(&self, dataset: &Dataset) -> PipelineResult<Dataset> {
        self.transform_at(dataset, Local::now().naive_local())
    }

    /// 以指定时间作为 processed_at 执行转换
    pub fn transform_at(
        &self,
        dataset: &Dataset,
        processed_at: NaiveDateTime,
    ) -> PipelineResult<Dataset> {
        info!(rows = dataset.row_count(), "开始转换数据");

        // === 步骤 1: 列名规范化 ===
        let mut result = dataset
            .rename_columns(normalize_column_name)
            .map_err(|e| match e {
                DatasetError::DuplicateColumn(name) => PipelineError::DuplicateColumn(name),
                other => PipelineError::Dataset(other),
            })?;
        debug!(columns = ?result.column_names(), "列名规范化完成");

        // === 步骤 2: amount 中位数补空 ===
        if let Some(amount) = result.column(AMOUNT_COLUMN) {
            let filled = fill_nulls_with_median(amount)?;
            result.upsert_column(filled)?;
        }

        // === 步骤 3: total_value 派生 ===
        if let (Some(amount), Some(quantity)) =
            (result.column(AMOUNT_COLUMN), result.column(QUANTITY_COLUMN))
        {
            let total_value = multiply_columns(TOTAL_VALUE_COLUMN, amount, quantity)?;
            result.upsert_column(total_value)?;
        }

        // === 步骤 4: processed_at 时间戳 ===
        let stamps = vec![Some(processed_at); result.row_count()];
        result.upsert_column(Column::new(
            PROCESSED_AT_COLUMN,
            ColumnData::Timestamp(stamps),
        ))?;

        info!(
            rows = result.row_count(),
            columns = result.column_count(),
            "转换完成"
        );
        Ok(result)
    }
}

/// 列名规范化：去首尾空白 → 小写 → 空格替换为下划线
pub fn normalize_column_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// 中位数（忽略空值与 NaN；无有效值时返回 None）
pub fn median(values: &[Option<f64>]) -> Option<f64> {
    let mut present: Vec<f64> = values
        .iter()
        .flatten()
        .copied()
        .filter(|v| !v.is_nan())
        .collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(f64::total_cmp);

    let mid = present.len() / 2;
    if present.len() % 2 == 0 {
        Some((present[mid - 1] + present[mid]) / 2.0)
    } else {
        Some(present[mid])
    }
}

/// 用非空值中位数填充空值
///
/// # 规则
/// - 无空值 → 原样返回（整数列保持整数）
/// - 有空值 → 转为 Float 后填充
/// - 全部为空 → 保持为空并告警
fn fill_nulls_with_median(column: &Column) -> PipelineResult<Column> {
    // NaN 与空值同等对待
    let values: Vec<Option<f64>> = numeric_values(column)?
        .into_iter()
        .map(|v| v.filter(|f| !f.is_nan()))
        .collect();

    let null_count = values.iter().filter(|v| v.is_none()).count();
    if null_count == 0 {
        return Ok(column.clone());
    }

    let Some(fill) = median(&values) else {
        warn!(column = column.name(), "列全部为空，无法计算中位数，保留空值");
        return Ok(Column::new(column.name(), ColumnData::Float(values)));
    };

    debug!(column = column.name(), null_count, fill, "中位数补空");
    let filled = values.into_iter().map(|v| Some(v.unwrap_or(fill))).collect();
    Ok(Column::new(column.name(), ColumnData::Float(filled)))
}

/// 逐行相乘派生新列
///
/// # 规则
/// - Integer × Integer → Integer（溢出报错）
/// - 其他数值组合 → Float
/// - 任一操作数为空 → 空
fn multiply_columns(name: &str, left: &Column, right: &Column) -> PipelineResult<Column> {
    if let (ColumnData::Integer(l), ColumnData::Integer(r)) = (left.data(), right.data()) {
        let product = l
            .iter()
            .zip(r)
            .enumerate()
            .map(|(row, (a, b))| match (a, b) {
                (Some(a), Some(b)) => a
                    .checked_mul(*b)
                    .map(Some)
                    .ok_or_else(|| PipelineError::ArithmeticOverflow {
                        row,
                        column: name.to_string(),
                    }),
                _ => Ok(None),
            })
            .collect::<PipelineResult<Vec<_>>>()?;
        return Ok(Column::new(name, ColumnData::Integer(product)));
    }

    let l = numeric_values(left)?;
    let r = numeric_values(right)?;
    let product = l
        .iter()
        .zip(&r)
        .map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) => Some(a * b),
            _ => None,
        })
        .collect();
    Ok(Column::new(name, ColumnData::Float(product)))
}

fn numeric_values(column: &Column) -> PipelineResult<Vec<Option<f64>>> {
    column
        .data()
        .to_f64_values()
        .ok_or_else(|| PipelineError::NonNumericColumn {
            column: column.name().to_string(),
            column_type: column.column_type(),
        })
}
