// ==========================================
// 数据管道 - 样例交易数据生成
// ==========================================
// 列: transaction_date, transaction_id, customer_id, product_id,
//     amount, quantity, region
// amount 约 10% 为空值，用于覆盖中位数填充
// ==========================================

use crate::domain::{Column, ColumnData, Dataset};
use crate::pipeline::csv_writer::write_csv_file;
use crate::pipeline::error::PipelineResult;
use chrono::{Duration, Local, NaiveDateTime};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// 默认输出路径
pub const DEFAULT_SAMPLE_PATH: &str = "data/raw/sample_data.csv";
/// 默认行数
pub const DEFAULT_SAMPLE_ROWS: usize = 1000;

const FIRST_TRANSACTION_ID: i64 = 100_000;
const PRODUCTS: &[&str] = &["PROD001", "PROD002", "PROD003"];
const REGIONS: &[&str] = &["North", "South", "East", "West"];
const NULL_AMOUNT_RATE: f64 = 0.1;

/// 生成结果摘要
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleDataSummary {
    pub output_path: PathBuf,
    pub rows: usize,
    pub columns: usize,
    pub null_amounts: usize,
}

/// 生成样例数据集
///
/// 日期从一年前开始按天递增；随机源由调用方提供
pub fn generate_sample_dataset<R: Rng>(num_rows: usize, rng: &mut R) -> Dataset {
    let start = Local::now().naive_local() - Duration::days(365);
    generate_sample_dataset_from(start, num_rows, rng)
}

fn generate_sample_dataset_from<R: Rng>(
    start: NaiveDateTime,
    num_rows: usize,
    rng: &mut R,
) -> Dataset {
    let mut dates = Vec::with_capacity(num_rows);
    let mut transaction_ids = Vec::with_capacity(num_rows);
    let mut customer_ids = Vec::with_capacity(num_rows);
    let mut product_ids = Vec::with_capacity(num_rows);
    let mut amounts = Vec::with_capacity(num_rows);
    let mut quantities = Vec::with_capacity(num_rows);
    let mut regions = Vec::with_capacity(num_rows);

    for (i, transaction_id) in (FIRST_TRANSACTION_ID..).take(num_rows).enumerate() {
        dates.push(Some(start + Duration::days(i as i64)));
        transaction_ids.push(Some(transaction_id));
        customer_ids.push(Some(rng.gen_range(1000..9999_i64)));
        product_ids.push(PRODUCTS.choose(rng).map(|p| p.to_string()));

        let amount = (rng.gen_range(10.0..1000.0_f64) * 100.0).round() / 100.0;
        amounts.push(if rng.gen_bool(NULL_AMOUNT_RATE) {
            None
        } else {
            Some(amount)
        });

        quantities.push(Some(rng.gen_range(1..10_i64)));
        regions.push(REGIONS.choose(rng).map(|r| r.to_string()));
    }

    let columns = vec![
        Column::new("transaction_date", ColumnData::Timestamp(dates)),
        Column::new("transaction_id", ColumnData::Integer(transaction_ids)),
        Column::new("customer_id", ColumnData::Integer(customer_ids)),
        Column::new("product_id", ColumnData::Text(product_ids)),
        Column::new("amount", ColumnData::Float(amounts)),
        Column::new("quantity", ColumnData::Integer(quantities)),
        Column::new("region", ColumnData::Text(regions)),
    ];

    // 各列按同一循环填充，长度一致
    Dataset::new(columns).unwrap_or_default()
}

/// 生成样例数据并写入 CSV（自动创建父目录）
pub fn generate_sample_data(num_rows: usize, output_path: &Path) -> PipelineResult<SampleDataSummary> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let dataset = generate_sample_dataset(num_rows, &mut rand::thread_rng());
    write_csv_file(&dataset, output_path)?;

    let summary = SampleDataSummary {
        output_path: output_path.to_path_buf(),
        rows: dataset.row_count(),
        columns: dataset.column_count(),
        null_amounts: dataset
            .column("amount")
            .map(|c| c.data().null_count())
            .unwrap_or(0),
    };

    info!(
        path = %output_path.display(),
        rows = summary.rows,
        null_amounts = summary.null_amounts,
        "样例数据已生成"
    );
    Ok(summary)
}
