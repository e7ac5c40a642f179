// ==========================================
// 数据管道 - 管道错误类型
// ==========================================
// 传播策略:
// - 抽取/转换错误向上传播，仅在编排器最外层捕获
// - 加载/校验错误在本地转为 bool / ValidationOutcome，不越过自身边界
// 工具: thiserror 派生宏
// ==========================================

use crate::db::StorageError;
use crate::domain::{ColumnType, DatasetError};
use thiserror::Error;

/// 管道错误类型
#[derive(Error, Debug)]
pub enum PipelineError {
    // ===== 抽取错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("CSV 解析失败: {0}")]
    ParseError(String),

    // ===== 转换错误 =====
    #[error("列名规范化后重复: {0}")]
    DuplicateColumn(String),

    #[error("列 {column} 不是数值列 (类型: {column_type})")]
    NonNumericColumn {
        column: String,
        column_type: ColumnType,
    },

    #[error("整数溢出 (行 {row}, 列 {column})")]
    ArithmeticOverflow { row: usize, column: String },

    #[error("数据集结构错误: {0}")]
    Dataset(#[from] DatasetError),

    // ===== 存储错误 =====
    #[error(transparent)]
    Storage(#[from] StorageError),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    Unhandled(String),
}

impl PipelineError {
    pub fn is_file_not_found(&self) -> bool {
        matches!(self, PipelineError::FileNotFound(_))
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::ParseError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        PipelineError::ParseError(err.to_string())
    }
}

/// Result 类型别名
pub type PipelineResult<T> = Result<T, PipelineError>;
