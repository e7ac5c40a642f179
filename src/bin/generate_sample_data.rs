// ==========================================
// 样例数据生成工具
// ==========================================
// 用法: generate_sample_data [--rows N] [--output PATH]
// ==========================================

use anyhow::{Context, Result};
use clap::Parser;
use data_pipeline::logging;
use data_pipeline::sample_data::{generate_sample_data, DEFAULT_SAMPLE_PATH, DEFAULT_SAMPLE_ROWS};
use std::path::PathBuf;

/// Generate sample transaction data as CSV.
#[derive(Parser, Debug)]
#[command(name = "generate_sample_data", version, about = "Generate sample data")]
struct Cli {
    /// Number of rows
    #[arg(long, default_value_t = DEFAULT_SAMPLE_ROWS)]
    rows: usize,

    /// Output file path
    #[arg(long, default_value = DEFAULT_SAMPLE_PATH)]
    output: PathBuf,
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    let summary = generate_sample_data(cli.rows, &cli.output)
        .with_context(|| format!("生成样例数据失败: {}", cli.output.display()))?;

    println!("Generated {} rows", summary.rows);
    println!("Saved to: {}", summary.output_path.display());
    println!("Shape: ({}, {})", summary.rows, summary.columns);
    println!("Null amounts: {}", summary.null_amounts);
    Ok(())
}
