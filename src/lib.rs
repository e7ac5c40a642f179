// ==========================================
// 数据管道 - 核心库
// ==========================================
// 流程: CSV 抽取 → 清洗转换 → SQLite 落库 → 行数校验
// 技术栈: Rust + csv + SQLite (rusqlite)
// 系统定位: CI/CD 演示用的最小 ETL 管道
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 数据集与运行结果
pub mod domain;

// 配置层 - 连接串与日志配置
pub mod config;

// 数据库基础设施（连接串解析/连接初始化）
pub mod db;

// 日志系统
pub mod logging;

// ETL 层 - 抽取/转换/加载/校验/编排
pub mod pipeline;

// 样例数据生成
pub mod sample_data;

// ==========================================
// 重导出核心类型
// ==========================================

// 配置
pub use config::{LogFormat, LoggingConfig, PipelineConfig};

// 领域对象
pub use domain::{
    Column, ColumnData, ColumnType, Dataset, PipelineRunResult, PipelineStage, ValidationOutcome,
};

// 存储
pub use db::{DatabaseTarget, StorageError, StorageHandle};

// 管道
pub use pipeline::{DataPipeline, PipelineError, PipelineResult, DEFAULT_OUTPUT_TABLE};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "数据管道";
