// ==========================================
// 本地演示: 用样例数据跑一遍管道
// ==========================================
// 1. data/raw/sample_data.csv 不存在时先生成 100 行
// 2. 落库到 sqlite:///data/pipeline.db 的 processed_transactions 表
// 3. 打印结果摘要，退出码 0/1
// ==========================================

use anyhow::{Context, Result};
use data_pipeline::config::{LoggingConfig, PipelineConfig};
use data_pipeline::sample_data::{generate_sample_data, DEFAULT_SAMPLE_PATH};
use data_pipeline::{DataPipeline, PipelineRunResult};
use std::path::Path;

const DEMO_DB_URL: &str = "sqlite:///data/pipeline.db";
const DEMO_TABLE: &str = "processed_transactions";
const DEMO_ROWS: usize = 100;

fn print_result(result: &PipelineRunResult) {
    let rule = "=".repeat(50);
    println!();
    println!("{}", rule);
    println!("PIPELINE RESULTS");
    println!("{}", rule);
    println!("Status: {}", if result.success { "SUCCESS" } else { "FAILED" });
    println!("Input: {}", result.input_file.as_deref().unwrap_or("N/A"));
    println!("Output: {}", result.output_table.as_deref().unwrap_or("N/A"));
    println!("Rows: {}", result.rows_processed);
    println!("Duration: {:.2} seconds", result.duration_seconds);
    if let Some(message) = result.message() {
        println!("Message: {}", message);
    }
    if let Some(error) = result.error() {
        println!("Error: {}", error);
    }
    println!("{}", rule);
}

fn main() -> Result<()> {
    println!("Starting Data Pipeline...");

    let data_file = Path::new(DEFAULT_SAMPLE_PATH);
    if !data_file.exists() {
        println!("Generating sample data...");
        generate_sample_data(DEMO_ROWS, data_file).context("生成样例数据失败")?;
    }

    println!("Running ETL pipeline...");
    let config = PipelineConfig::default()
        .with_db_url(DEMO_DB_URL)
        .with_logging(LoggingConfig::from_env());
    let pipeline = DataPipeline::new(config).context("管道初始化失败")?;
    let result = pipeline.run_pipeline(data_file, DEMO_TABLE);

    print_result(&result);
    std::process::exit(result.exit_code())
}
