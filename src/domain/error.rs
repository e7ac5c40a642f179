// ==========================================
// 数据管道 - 领域层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 数据集结构错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatasetError {
    #[error("列长度不一致 (列 {column}): 期望 {expected} 行，实际 {actual} 行")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("列名重复: {0}")]
    DuplicateColumn(String),

    #[error("列不存在: {0}")]
    ColumnNotFound(String),
}

/// Result 类型别名
pub type DatasetResult<T> = Result<T, DatasetError>;
