// ==========================================
// 数据管道 - 输出校验器 (Validate)
// ==========================================
// 职责: 对已加载表执行 COUNT(*)，归类为 通过 / 无数据 / 查询错误
// 红线: 查询错误不向上抛出，转为 ValidationOutcome
// ==========================================

use crate::db::{quote_identifier, StorageHandle, StorageResult};
use crate::domain::ValidationOutcome;
use tracing::{info, warn};

pub struct OutputValidator<'a> {
    storage: &'a StorageHandle,
}

impl<'a> OutputValidator<'a> {
    pub fn new(storage: &'a StorageHandle) -> Self {
        Self { storage }
    }

    /// 校验输出表
    ///
    /// # 返回
    /// - (true, "Validation passed: N rows"): N > 0
    /// - (false, "Validation failed: No data"): N == 0
    /// - (false, "Validation error: <原因>"): 查询失败（如表不存在）
    pub fn validate(&self, table_name: &str) -> ValidationOutcome {
        let outcome = match self.count_rows(table_name) {
            Ok(count) if count > 0 => ValidationOutcome::passed(count),
            Ok(_) => ValidationOutcome::no_data(),
            Err(e) => ValidationOutcome::error(e),
        };

        if outcome.is_valid {
            info!(table = table_name, message = %outcome.message, "输出校验通过");
        } else {
            warn!(table = table_name, message = %outcome.message, "输出校验未通过");
        }
        outcome
    }

    /// 统计表行数
    pub fn count_rows(&self, table_name: &str) -> StorageResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table_name));
        self.storage
            .with_connection(|conn| Ok(conn.query_row(&sql, [], |row| row.get(0))?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DEFAULT_DATABASE_URL;

    fn storage_with(sql: &str) -> StorageHandle {
        let storage = StorageHandle::new(DEFAULT_DATABASE_URL).unwrap();
        storage
            .with_connection(|conn| Ok(conn.execute_batch(sql)?))
            .unwrap();
        storage
    }

    #[test]
    fn test_validate_passed() {
        let storage = storage_with("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (1), (2);");
        let outcome = OutputValidator::new(&storage).validate("t");
        assert_eq!(
            outcome.into_tuple(),
            (true, "Validation passed: 2 rows".to_string())
        );
    }

    #[test]
    fn test_validate_empty_table() {
        let storage = storage_with("CREATE TABLE empty_table (col REAL);");
        let outcome = OutputValidator::new(&storage).validate("empty_table");
        assert_eq!(
            outcome.into_tuple(),
            (false, "Validation failed: No data".to_string())
        );
    }

    #[test]
    fn test_validate_missing_table() {
        let storage = storage_with("");
        let outcome = OutputValidator::new(&storage).validate("missing");
        assert!(!outcome.is_valid);
        assert!(
            outcome.message.starts_with("Validation error: "),
            "{}",
            outcome.message
        );
        assert!(outcome.message.contains("no such table"), "{}", outcome.message);
    }
}
