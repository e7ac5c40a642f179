// ==========================================
// 日志系统初始化
// ==========================================
// 使用 tracing 和 tracing-subscriber
// 库内不做进程级初始化：按 LoggingConfig 构造独立的 Dispatch，
// 由管道在自身调用范围内启用
// ==========================================

use crate::config::{LogFormat, LoggingConfig};
use tracing::Dispatch;
use tracing_subscriber::{fmt, EnvFilter};

/// 按配置构造日志分发器（输出到 stderr，不影响 stdout 上的 JSON 结果）
///
/// # 示例
/// ```no_run
/// use data_pipeline::config::LoggingConfig;
/// use data_pipeline::logging;
///
/// let dispatch = logging::build_dispatch(&LoggingConfig::default());
/// tracing::dispatcher::with_default(&dispatch, || {
///     tracing::info!("scoped");
/// });
/// ```
pub fn build_dispatch(config: &LoggingConfig) -> Dispatch {
    // 非法过滤器回退为 info
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(config.ansi)
        .with_target(true)
        .with_line_number(true);

    match config.format {
        LogFormat::Pretty => Dispatch::new(builder.pretty().finish()),
        LogFormat::Compact => Dispatch::new(builder.compact().finish()),
        LogFormat::Json => Dispatch::new(builder.json().finish()),
    }
}

/// 初始化全局日志系统（供二进制入口使用）
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器（默认: info）
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .try_init();
}

/// 初始化测试环境的日志系统
///
/// 使用更详细的日志级别，便于调试
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
