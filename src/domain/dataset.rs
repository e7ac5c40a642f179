// ==========================================
// 数据管道 - 表格数据集
// ==========================================
// 职责: 强类型列存结构（列名 + 列类型 + 显式可空）
// 红线: 所有列行数一致；列名唯一
// ==========================================

use crate::domain::error::{DatasetError, DatasetResult};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// 时间戳的文本格式（CSV 输出 / SQLite 存储共用）
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

// ==========================================
// 列类型 (Column Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnType {
    Integer,   // i64
    Float,     // f64
    Boolean,   // bool
    Text,      // String
    Timestamp, // 本地时间（无时区）
}

impl ColumnType {
    /// 是否为数值列（可参与中位数/乘法计算）
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => write!(f, "INTEGER"),
            ColumnType::Float => write!(f, "FLOAT"),
            ColumnType::Boolean => write!(f, "BOOLEAN"),
            ColumnType::Text => write!(f, "TEXT"),
            ColumnType::Timestamp => write!(f, "TIMESTAMP"),
        }
    }
}

// ==========================================
// 单元格值 (借用视图)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue<'a> {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(&'a str),
    Timestamp(NaiveDateTime),
}

impl CellValue<'_> {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl fmt::Display for CellValue<'_> {
    /// 空值输出为空串；浮点保留小数点（100.0 而非 100），保证回读类型不变
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Integer(v) => write!(f, "{}", v),
            CellValue::Float(v) => write!(f, "{:?}", v),
            CellValue::Boolean(v) => write!(f, "{}", if *v { "True" } else { "False" }),
            CellValue::Text(v) => write!(f, "{}", v),
            CellValue::Timestamp(v) => write!(f, "{}", v.format(TIMESTAMP_FORMAT)),
        }
    }
}

// ==========================================
// 列数据 (Column Data)
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Integer(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Boolean(Vec<Option<bool>>),
    Text(Vec<Option<String>>),
    Timestamp(Vec<Option<NaiveDateTime>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Integer(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Boolean(v) => v.len(),
            ColumnData::Text(v) => v.len(),
            ColumnData::Timestamp(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnData::Integer(_) => ColumnType::Integer,
            ColumnData::Float(_) => ColumnType::Float,
            ColumnData::Boolean(_) => ColumnType::Boolean,
            ColumnData::Text(_) => ColumnType::Text,
            ColumnData::Timestamp(_) => ColumnType::Timestamp,
        }
    }

    /// 读取第 row 行的值（越界返回 None）
    pub fn get(&self, row: usize) -> Option<CellValue<'_>> {
        let cell = match self {
            ColumnData::Integer(v) => v.get(row)?.map_or(CellValue::Null, CellValue::Integer),
            ColumnData::Float(v) => v.get(row)?.map_or(CellValue::Null, CellValue::Float),
            ColumnData::Boolean(v) => v.get(row)?.map_or(CellValue::Null, CellValue::Boolean),
            ColumnData::Text(v) => v
                .get(row)?
                .as_deref()
                .map_or(CellValue::Null, CellValue::Text),
            ColumnData::Timestamp(v) => v.get(row)?.map_or(CellValue::Null, CellValue::Timestamp),
        };
        Some(cell)
    }

    pub fn null_count(&self) -> usize {
        (0..self.len())
            .filter_map(|row| self.get(row))
            .filter(CellValue::is_null)
            .count()
    }

    /// 数值列转 f64 视图；非数值列返回 None
    pub fn to_f64_values(&self) -> Option<Vec<Option<f64>>> {
        match self {
            ColumnData::Integer(v) => Some(v.iter().map(|x| x.map(|i| i as f64)).collect()),
            ColumnData::Float(v) => Some(v.clone()),
            _ => None,
        }
    }
}

// ==========================================
// 列 (Column)
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn column_type(&self) -> ColumnType {
        self.data.column_type()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// ==========================================
// 数据集 (Dataset)
// ==========================================
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<Column>,
}

impl Dataset {
    /// 构造数据集
    ///
    /// # 校验
    /// - 列名唯一
    /// - 所有列行数一致（以第一列为准）
    pub fn new(columns: Vec<Column>) -> DatasetResult<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name()) {
                return Err(DatasetError::DuplicateColumn(column.name().to_string()));
            }
        }

        if let Some(first) = columns.first() {
            let expected = first.len();
            if let Some(bad) = columns.iter().find(|c| c.len() != expected) {
                return Err(DatasetError::ColumnLengthMismatch {
                    column: bad.name().to_string(),
                    expected,
                    actual: bad.len(),
                });
            }
        }

        Ok(Self { columns })
    }

    /// 行数（无列时为 0）
    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// 取列，不存在时返回 ColumnNotFound
    pub fn require_column(&self, name: &str) -> DatasetResult<&Column> {
        self.column(name)
            .ok_or_else(|| DatasetError::ColumnNotFound(name.to_string()))
    }

    /// 写入列：同名列原位替换，否则追加到末尾
    pub fn upsert_column(&mut self, column: Column) -> DatasetResult<()> {
        if !self.columns.is_empty() && column.len() != self.row_count() {
            return Err(DatasetError::ColumnLengthMismatch {
                column: column.name().to_string(),
                expected: self.row_count(),
                actual: column.len(),
            });
        }

        match self.columns.iter_mut().find(|c| c.name() == column.name()) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    /// 按映射函数重命名全部列，返回新数据集
    pub fn rename_columns<F>(&self, rename: F) -> DatasetResult<Dataset>
    where
        F: Fn(&str) -> String,
    {
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(rename(c.name()), c.data().clone()))
            .collect();
        Dataset::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::new(vec![
            Column::new("id", ColumnData::Integer(vec![Some(1), Some(2)])),
            Column::new("name", ColumnData::Text(vec![Some("a".to_string()), None])),
        ])
        .unwrap()
    }

    #[test]
    fn test_new_rejects_length_mismatch() {
        let result = Dataset::new(vec![
            Column::new("a", ColumnData::Integer(vec![Some(1), Some(2)])),
            Column::new("b", ColumnData::Float(vec![Some(1.0)])),
        ]);
        assert_eq!(
            result.unwrap_err(),
            DatasetError::ColumnLengthMismatch {
                column: "b".to_string(),
                expected: 2,
                actual: 1,
            }
        );
    }

    #[test]
    fn test_new_rejects_duplicate_names() {
        let result = Dataset::new(vec![
            Column::new("a", ColumnData::Integer(vec![Some(1)])),
            Column::new("a", ColumnData::Integer(vec![Some(2)])),
        ]);
        assert_eq!(result.unwrap_err(), DatasetError::DuplicateColumn("a".to_string()));
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut ds = sample();
        ds.upsert_column(Column::new("id", ColumnData::Float(vec![Some(1.5), None])))
            .unwrap();
        assert_eq!(ds.column_names(), vec!["id", "name"]);
        assert_eq!(ds.column("id").unwrap().column_type(), ColumnType::Float);

        ds.upsert_column(Column::new("flag", ColumnData::Boolean(vec![Some(true), None])))
            .unwrap();
        assert_eq!(ds.column_names(), vec!["id", "name", "flag"]);

        let err = ds
            .upsert_column(Column::new("short", ColumnData::Integer(vec![Some(1)])))
            .unwrap_err();
        assert!(matches!(err, DatasetError::ColumnLengthMismatch { .. }));
    }

    #[test]
    fn test_cell_access_and_nulls() {
        let ds = sample();
        let name = ds.column("name").unwrap().data();
        assert_eq!(name.get(0), Some(CellValue::Text("a")));
        assert_eq!(name.get(1), Some(CellValue::Null));
        assert_eq!(name.get(2), None);
        assert_eq!(name.null_count(), 1);
        assert_eq!(ds.row_count(), 2);
        assert!(ds.require_column("missing").is_err());
    }

    #[test]
    fn test_float_display_keeps_decimal_point() {
        assert_eq!(CellValue::Float(100.0).to_string(), "100.0");
        assert_eq!(CellValue::Float(2.5).to_string(), "2.5");
        assert_eq!(CellValue::Null.to_string(), "");
        assert_eq!(CellValue::Boolean(true).to_string(), "True");
    }

    #[test]
    fn test_to_f64_values() {
        let ints = ColumnData::Integer(vec![Some(2), None]);
        assert_eq!(ints.to_f64_values(), Some(vec![Some(2.0), None]));
        let text = ColumnData::Text(vec![Some("x".to_string())]);
        assert_eq!(text.to_f64_values(), None);
    }
}
