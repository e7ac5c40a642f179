// ==========================================
// 数据管道 - 领域模型层
// ==========================================
// 职责: 列式数据集、运行阶段、校验结论、运行结果
// 红线: 不含文件/数据库访问逻辑
// ==========================================

pub mod dataset;
pub mod error;
pub mod run_result;

// 重导出核心类型
pub use dataset::{CellValue, Column, ColumnData, ColumnType, Dataset, TIMESTAMP_FORMAT};
pub use error::{DatasetError, DatasetResult};
pub use run_result::{
    PipelineRunResult, PipelineStage, RunOutcome, ValidationOutcome, LOAD_FAILED_MESSAGE,
};
