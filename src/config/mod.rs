// ==========================================
// 数据管道 - 配置层
// ==========================================
// 职责: 管道配置（连接串 + 日志），显式传入管道构造函数
// 来源: 环境变量 / 命令行参数 / 代码设置
// ==========================================

pub mod pipeline_config;

// 重导出核心配置类型
pub use pipeline_config::{
    env_keys, LogFormat, LoggingConfig, PipelineConfig, DEFAULT_LOG_FILTER,
};
