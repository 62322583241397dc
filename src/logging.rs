//! 日志初始化和配置模块
//!
//! 使用 tracing 生态：控制台输出到标准错误（标准输出留给生成的 SQL），
//! 文件输出到日志目录并按天滚动。`RUST_LOG` 环境变量优先于配置的级别。

use crate::config;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, time::SystemTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// 日志配置结构体
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志级别
    pub level: Level,
    /// 日志文件目录，`None` 表示不写文件
    pub log_dir: Option<PathBuf>,
    /// 是否输出到控制台
    pub enable_stdout: bool,
}

impl LogConfig {
    /// 创建新的日志配置，使用默认级别
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置日志级别
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// 设置日志文件目录
    pub fn log_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// 由配置文件中的日志段构造
    pub fn from_config(config: &config::LogConfig) -> LogResult<Self> {
        let level = Level::from_str(&config.level).map_err(|_| {
            LogError::Config(format!("无效的日志级别: {}", config.level))
        })?;
        let log_dir = (!config.log_dir.trim().is_empty())
            .then(|| PathBuf::from(&config.log_dir));

        Ok(Self { level, log_dir, enable_stdout: config.enable_stdout })
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: Level::INFO, log_dir: None, enable_stdout: true }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("IO错误: {0}")]
    Io(#[from] io::Error),
    #[error("日志配置错误: {0}")]
    Config(String),
    #[error("日志初始化错误: {0}")]
    Init(String),
}

/// 日志初始化结果
pub type LogResult<T> = Result<T, LogError>;

/// 命令行 `-v` 次数对应的级别，0 表示沿用配置
pub fn verbosity_level(verbose: u8, quiet: bool) -> Option<Level> {
    if quiet {
        return Some(Level::ERROR);
    }
    match verbose {
        0 => None,
        1 => Some(Level::INFO),
        2 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}

/// 初始化日志系统
///
/// 返回文件输出的 [`WorkerGuard`]，调用方需要持有到程序结束，
/// 否则缓冲中的日志可能丢失。未配置日志目录时返回 `None`。
///
/// # Examples
///
/// ```no_run
/// use binlog_analysis::logging::{init_logging, LogConfig};
/// use tracing::Level;
///
/// let config = LogConfig::new().level(Level::DEBUG).log_dir("logs");
/// let _guard = init_logging(&config).unwrap();
/// ```
pub fn init_logging(config: &LogConfig) -> LogResult<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

    let console_layer = config.enable_stdout.then(|| {
        fmt::layer()
            .with_writer(io::stderr)
            .with_timer(SystemTime)
            .with_target(false)
            .with_ansi(true)
            .boxed()
    });

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender =
                tracing_appender::rolling::daily(dir, "binlog-analysis");
            let (non_blocking, guard) =
                tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_timer(SystemTime)
                .with_target(true)
                .with_ansi(false)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LogError::Init(e.to_string()))?;

    tracing::debug!(
        level = %config.level,
        log_dir = ?config.log_dir,
        "日志系统初始化完成"
    );
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let mut section = config::LogConfig::default();
        section.level = "debug".to_string();
        section.log_dir = String::new();

        let config = LogConfig::from_config(&section).unwrap();
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.log_dir.is_none());

        section.level = "loud".to_string();
        assert!(matches!(
            LogConfig::from_config(&section),
            Err(LogError::Config(_))
        ));
    }

    #[test]
    fn test_verbosity_level() {
        assert_eq!(verbosity_level(0, false), None);
        assert_eq!(verbosity_level(1, false), Some(Level::INFO));
        assert_eq!(verbosity_level(2, false), Some(Level::DEBUG));
        assert_eq!(verbosity_level(5, false), Some(Level::TRACE));
        assert_eq!(verbosity_level(3, true), Some(Level::ERROR));
    }
}
