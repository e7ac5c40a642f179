// ==========================================
// 数据管道 - SQLite 存储句柄
// ==========================================
// 目标:
// - 解析 URL 风格连接串（内存库 / 文件库）
// - 统一 Connection::open 后的 PRAGMA 行为
// - 连接延迟到首次使用时打开，之后在同一管道实例内复用
// ==========================================

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 默认连接串（内存库）
pub const DEFAULT_DATABASE_URL: &str = "sqlite:///:memory:";

// ==========================================
// 存储层错误类型
// ==========================================
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("不支持的数据库连接串: {0}（仅支持 sqlite）")]
    UnsupportedUrl(String),

    #[error("数据库连接失败: {0}")]
    ConnectionError(String),

    #[error("非法表名: {0:?}")]
    InvalidTableName(String),

    #[error("数据写入失败: {0}")]
    WriteError(String),

    #[error("{0}")]
    QueryError(String),
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::QueryError(err.to_string())
    }
}

/// Result 类型别名
pub type StorageResult<T> = Result<T, StorageError>;

// ==========================================
// 连接目标
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    InMemory,
    File(PathBuf),
}

impl DatabaseTarget {
    /// 解析连接串
    ///
    /// # 支持格式
    /// - `sqlite:///:memory:` / `sqlite://` / `sqlite:` / `:memory:` → 内存库
    /// - `sqlite:///data/pipeline.db` → 相对路径 `data/pipeline.db`
    /// - `sqlite:////tmp/pipeline.db` → 绝对路径 `/tmp/pipeline.db`
    /// - 不带 scheme 的路径 → 文件库
    /// - 其他 scheme（postgres:// 等）→ UnsupportedUrl
    pub fn parse(url: &str) -> StorageResult<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(StorageError::UnsupportedUrl(url.to_string()));
        }

        let rest = if let Some(rest) = url.strip_prefix("sqlite://") {
            // SQLAlchemy 风格: sqlite:/// 后为相对路径，sqlite://// 后为绝对路径
            rest.strip_prefix('/').unwrap_or(rest)
        } else if let Some(rest) = url.strip_prefix("sqlite:") {
            rest
        } else if url.contains("://") {
            return Err(StorageError::UnsupportedUrl(url.to_string()));
        } else {
            url
        };

        match rest {
            "" | ":memory:" => Ok(DatabaseTarget::InMemory),
            path => Ok(DatabaseTarget::File(PathBuf::from(path))),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self, DatabaseTarget::InMemory)
    }
}

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(target: &DatabaseTarget) -> StorageResult<Connection> {
    let conn = match target {
        DatabaseTarget::InMemory => Connection::open_in_memory(),
        DatabaseTarget::File(path) => {
            ensure_parent_dir(path)?;
            Connection::open(path)
        }
    }
    .map_err(|e| StorageError::ConnectionError(e.to_string()))?;

    configure_sqlite_connection(&conn).map_err(|e| StorageError::ConnectionError(e.to_string()))?;
    Ok(conn)
}

fn ensure_parent_dir(path: &Path) -> StorageResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::ConnectionError(format!("无法创建目录 {}: {}", parent.display(), e))
            })
        }
        _ => Ok(()),
    }
}

/// 标识符加双引号并转义（表名/列名）
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// ==========================================
// StorageHandle - 延迟打开的共享连接
// ==========================================
pub struct StorageHandle {
    url: String,
    target: DatabaseTarget,
    conn: Mutex<Option<Connection>>,
}

impl StorageHandle {
    /// 创建存储句柄（仅解析连接串，不打开连接）
    pub fn new(url: impl Into<String>) -> StorageResult<Self> {
        let url = url.into();
        let target = DatabaseTarget::parse(&url)?;

        Ok(Self {
            url,
            target,
            conn: Mutex::new(None),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn target(&self) -> &DatabaseTarget {
        &self.target
    }

    /// 连接是否已打开
    pub fn is_open(&self) -> bool {
        self.conn
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// 在共享连接上执行操作（首次调用时打开连接）
    pub fn with_connection<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Connection) -> StorageResult<T>,
    {
        // 闭包内 panic 会毒化锁；连接本身仍可用，直接取回
        let mut guard = self.conn.lock().unwrap_or_else(PoisonError::into_inner);

        if guard.is_none() {
            debug!(
                url = %self.url,
                in_memory = self.target.is_in_memory(),
                "打开数据库连接"
            );
            *guard = Some(open_sqlite_connection(&self.target)?);
            info!(url = %self.url, "数据库连接已建立");
        }

        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Err(StorageError::ConnectionError(self.url.clone())),
        }
    }
}

impl std::fmt::Debug for StorageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageHandle")
            .field("url", &self.url)
            .field("target", &self.target)
            .field("open", &self.is_open())
            .finish()
    }
}
