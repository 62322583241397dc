//! 配置管理模块
//!
//! 提供统一的配置文件读取和管理功能。所有段落都有默认值，
//! 配置文件只需写出需要改动的项；命令行参数会覆盖文件中的值。

use crate::binlog::types::{FlashbackMode, KeyFilter};
use crate::error::{BinlogError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 主配置结构体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 日志配置
    pub log: LogConfig,
    /// mysqlbinlog 解码配置
    pub decoder: DecoderConfig,
    /// 数据库/表过滤，未设置表示不过滤
    pub filter: KeyFilter,
    /// 闪回配置
    pub flashback: FlashbackConfig,
    /// 统计报告配置
    pub report: ReportConfig,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// 是否启用控制台输出
    pub enable_stdout: bool,
    /// 日志输出目录
    pub log_dir: String,
    /// 日志级别 (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enable_stdout: true,
            log_dir: "logs".to_string(),
            level: "info".to_string(),
        }
    }
}

/// mysqlbinlog 解码配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// mysqlbinlog 可执行文件路径
    pub mysqlbinlog_path: String,
    /// 附加给 mysqlbinlog 的参数
    pub extra_args: Vec<String>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self { mysqlbinlog_path: "mysqlbinlog".to_string(), extra_args: vec![] }
    }
}

/// 闪回配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FlashbackConfig {
    /// 闪回模式 (deletes, updates, inserts)
    pub mode: FlashbackMode,
    /// SQL 输出文件，未设置时输出到标准输出
    pub output: Option<String>,
}

/// 统计报告配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// 统计报告输出文件
    pub output: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { output: "binlog_stats.txt".to_string() }
    }
}

impl Config {
    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_str(&content)?;
        tracing::debug!(path = %path.display(), "已加载配置文件");
        Ok(config)
    }

    /// 从字符串加载配置
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        match self.log.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(BinlogError::config_error(format!(
                    "无效的日志级别: {}",
                    self.log.level
                )));
            }
        }

        if self.decoder.mysqlbinlog_path.trim().is_empty() {
            return Err(BinlogError::config_error("mysqlbinlog 路径不能为空"));
        }

        if self.report.output.trim().is_empty() {
            return Err(BinlogError::config_error("统计报告输出路径不能为空"));
        }

        if self.filter.table.is_some() && self.filter.database.is_none() {
            tracing::warn!("只设置了表过滤，将匹配所有数据库中的同名表");
        }

        Ok(())
    }
}
