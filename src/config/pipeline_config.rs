// ==========================================
// 数据管道 - 管道配置
// ==========================================
// 职责: 连接串 + 日志配置，构造管道时显式传入
// 来源优先级: 显式设置 > 环境变量 > 默认值
// ==========================================

use crate::db::DEFAULT_DATABASE_URL;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 配置相关环境变量
pub mod env_keys {
    /// 数据库连接串
    pub const DATABASE_URL: &str = "DATABASE_URL";
    /// 日志过滤器（tracing EnvFilter 语法）
    pub const LOG_FILTER: &str = "RUST_LOG";
    /// 日志格式: pretty / compact / json
    pub const LOG_FORMAT: &str = "DATA_PIPELINE_LOG_FORMAT";
}

/// 默认日志过滤器
pub const DEFAULT_LOG_FILTER: &str = "info";

// ==========================================
// 日志格式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("未知日志格式: {}", other)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Compact => write!(f, "compact"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

// ==========================================
// 日志配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// EnvFilter 语法，如 "info" / "data_pipeline=debug"
    pub filter: String,
    pub format: LogFormat,
    /// 是否输出 ANSI 颜色
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            format: LogFormat::default(),
            ansi: false,
        }
    }
}

impl LoggingConfig {
    /// 从环境变量读取（非法格式回退为默认值）
    pub fn from_env() -> Self {
        let filter = std::env::var(env_keys::LOG_FILTER)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        let format = std::env::var(env_keys::LOG_FORMAT)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();

        Self {
            filter,
            format,
            ansi: false,
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }
}

// ==========================================
// 管道配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub db_url: String,
    /// None: 沿用调用方当前的 tracing 订阅者
    pub logging: Option<LoggingConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DATABASE_URL.to_string(),
            logging: None,
        }
    }
}

impl PipelineConfig {
    /// 从环境变量构造: DATABASE_URL（缺省为内存库）+ 日志配置
    pub fn from_env() -> Self {
        let db_url = std::env::var(env_keys::DATABASE_URL)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        Self {
            db_url,
            logging: Some(LoggingConfig::from_env()),
        }
    }

    pub fn with_db_url(mut self, db_url: impl Into<String>) -> Self {
        self.db_url = db_url.into();
        self
    }

    /// 显式传入的连接串优先，否则保留当前值
    pub fn with_db_url_override(self, db_url: Option<String>) -> Self {
        match db_url {
            Some(url) => self.with_db_url(url),
            None => self,
        }
    }

    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    pub fn without_logging(mut self) -> Self {
        self.logging = None;
        self
    }
}
