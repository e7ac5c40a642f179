// ==========================================
// 数据管道 - 命令行入口
// ==========================================
// 子命令:
// - run:  抽取指定 CSV → 转换 → 落库 → 校验
// - test: 用内置 5 行样本跑一遍完整管道
// 输出: 运行结果 JSON (stdout)；日志走 stderr
// 退出码: 成功 0，失败 1
// ==========================================

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use data_pipeline::config::{LogFormat, LoggingConfig, PipelineConfig};
use data_pipeline::{DataPipeline, PipelineRunResult, DEFAULT_OUTPUT_TABLE};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "data-pipeline",
    version,
    about = "CSV → SQLite ETL pipeline (extract, transform, load, validate)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log filter, e.g. "info" or "data_pipeline=debug" (overrides RUST_LOG).
    #[arg(long = "log-level", global = true)]
    log_level: Option<String>,

    /// Log output format: pretty, compact or json.
    #[arg(long = "log-format", global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the pipeline on a CSV file.
    Run {
        /// Input CSV file.
        #[arg(long, value_name = "PATH")]
        input: PathBuf,

        /// Output table name.
        #[arg(long, default_value = DEFAULT_OUTPUT_TABLE)]
        output: String,

        /// Database URL (overrides DATABASE_URL).
        #[arg(long = "db-url")]
        db_url: Option<String>,
    },

    /// Run the built-in self test.
    Test {
        /// Database URL (overrides DATABASE_URL).
        #[arg(long = "db-url")]
        db_url: Option<String>,
    },
}

impl Command {
    fn db_url(&self) -> Option<String> {
        match self {
            Command::Run { db_url, .. } | Command::Test { db_url } => db_url.clone(),
        }
    }
}

fn build_config(cli: &Cli) -> PipelineConfig {
    let mut logging = LoggingConfig::from_env();
    if let Some(level) = &cli.log_level {
        logging = logging.with_filter(level.clone());
    }
    if let Some(format) = cli.log_format {
        logging = logging.with_format(format);
    }

    PipelineConfig::from_env()
        .with_db_url_override(cli.command.db_url())
        .with_logging(logging)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);

    let result = match DataPipeline::new(config) {
        Ok(pipeline) => match &cli.command {
            Command::Run { input, output, .. } => pipeline.run_pipeline(input, output),
            Command::Test { .. } => pipeline.run_test_pipeline(),
        },
        // 构造失败同样输出结果 JSON
        Err(e) => PipelineRunResult::failed(e, 0.0),
    };

    let json = serde_json::to_string_pretty(&result).context("序列化运行结果失败")?;
    println!("{}", json);

    std::process::exit(result.exit_code())
}
