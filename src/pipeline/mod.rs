// ==========================================
// 数据管道 - ETL 层
// ==========================================
// 抽取 (extractor) → 转换 (transformer) → 加载 (loader) → 校验 (validator)
// 由编排器 (orchestrator) 串联，自检流程 (self_test) 复用编排器
// ==========================================

pub mod csv_writer;
pub mod error;
pub mod extractor;
pub mod loader;
pub mod orchestrator;
pub mod self_test;
pub mod transformer;
pub mod validator;

// 重导出核心类型
pub use csv_writer::{write_csv, write_csv_file};
pub use error::{PipelineError, PipelineResult};
pub use extractor::{CsvExtractor, NULL_TOKENS};
pub use loader::Loader;
pub use orchestrator::{DataPipeline, StageReport, DEFAULT_OUTPUT_TABLE};
pub use self_test::{self_test_dataset, TEST_OUTPUT_TABLE};
pub use transformer::{
    Transformer, AMOUNT_COLUMN, PROCESSED_AT_COLUMN, QUANTITY_COLUMN, TOTAL_VALUE_COLUMN,
};
pub use validator::OutputValidator;
