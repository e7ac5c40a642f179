// ==========================================
// 数据管道 - 加载器 (Load)
// ==========================================
// 职责: 以“整表替换”语义把数据集写入存储句柄
// 流程: 单事务内 DROP → CREATE → 批量 INSERT
// 红线: 写入错误不向上抛出，转为 false + error 日志
// ==========================================

use crate::db::{quote_identifier, StorageError, StorageHandle, StorageResult};
use crate::domain::{ColumnData, ColumnType, Dataset, TIMESTAMP_FORMAT};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use tracing::{debug, error, info};

pub struct Loader<'a> {
    storage: &'a StorageHandle,
}

impl<'a> Loader<'a> {
    pub fn new(storage: &'a StorageHandle) -> Self {
        Self { storage }
    }

    /// 加载数据集到指定表（存在则整表替换）
    ///
    /// # 返回
    /// - true: 写入成功
    /// - false: 写入失败（错误已记录日志）
    pub fn load(&self, dataset: &Dataset, table_name: &str) -> bool {
        info!(table = table_name, "开始加载数据");

        match self.try_load(dataset, table_name) {
            Ok(rows) => {
                info!(table = table_name, rows, "加载完成");
                true
            }
            Err(e) => {
                error!(table = table_name, error = %e, "加载失败");
                false
            }
        }
    }

    /// 加载实现（错误向调用方返回）
    pub fn try_load(&self, dataset: &Dataset, table_name: &str) -> StorageResult<usize> {
        if table_name.trim().is_empty() {
            return Err(StorageError::InvalidTableName(table_name.to_string()));
        }
        if dataset.column_count() == 0 {
            return Err(StorageError::WriteError("数据集没有任何列".to_string()));
        }

        self.storage
            .with_connection(|conn| replace_table(conn, dataset, table_name))
    }
}

fn replace_table(conn: &Connection, dataset: &Dataset, table_name: &str) -> StorageResult<usize> {
    let table = quote_identifier(table_name);
    let column_names: Vec<String> = dataset
        .columns()
        .iter()
        .map(|c| quote_identifier(c.name()))
        .collect();

    let column_defs: Vec<String> = dataset
        .columns()
        .iter()
        .zip(&column_names)
        .map(|(c, quoted)| format!("{} {}", quoted, sql_type(c.column_type())))
        .collect();

    let create_sql = format!("CREATE TABLE {} ({})", table, column_defs.join(", "));
    let placeholders: Vec<String> = (1..=column_names.len()).map(|i| format!("?{}", i)).collect();
    let insert_sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        column_names.join(", "),
        placeholders.join(", ")
    );
    debug!(sql = %create_sql, "建表语句");

    let write_err = |e: rusqlite::Error| StorageError::WriteError(e.to_string());

    let tx = conn.unchecked_transaction().map_err(write_err)?;
    tx.execute(&format!("DROP TABLE IF EXISTS {}", table), [])
        .map_err(write_err)?;
    tx.execute(&create_sql, []).map_err(write_err)?;

    let mut inserted = 0;
    {
        let mut stmt = tx.prepare(&insert_sql).map_err(write_err)?;
        for row in 0..dataset.row_count() {
            let values = dataset.columns().iter().map(|c| sql_value(c.data(), row));
            inserted += stmt.execute(params_from_iter(values)).map_err(write_err)?;
        }
    }

    tx.commit().map_err(write_err)?;
    Ok(inserted)
}

/// 列类型 → SQLite 声明类型
pub fn sql_type(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Integer => "INTEGER",
        ColumnType::Float => "REAL",
        ColumnType::Boolean => "INTEGER",
        ColumnType::Text => "TEXT",
        ColumnType::Timestamp => "TIMESTAMP",
    }
}

/// 单元格 → SQLite 值
fn sql_value(data: &ColumnData, row: usize) -> Value {
    match data {
        ColumnData::Integer(v) => v[row].map_or(Value::Null, Value::Integer),
        ColumnData::Float(v) => v[row].map_or(Value::Null, Value::Real),
        ColumnData::Boolean(v) => v[row].map_or(Value::Null, |b| Value::Integer(b as i64)),
        ColumnData::Text(v) => v[row].clone().map_or(Value::Null, Value::Text),
        ColumnData::Timestamp(v) => v[row].map_or(Value::Null, |ts| {
            Value::Text(ts.format(TIMESTAMP_FORMAT).to_string())
        }),
    }
}
