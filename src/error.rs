//! 错误类型定义
//!
//! 这个模块定义了库中使用的所有错误类型，使用 thiserror 提供丰富的错误信息。
//! 解析过程本身不会因为内容格式问题报错，只有输入流缺失或解码失败才会返回错误。

/// binlog 分析库的结果类型
pub type Result<T> = std::result::Result<T, BinlogError>;

/// binlog 分析错误类型
#[derive(Debug, thiserror::Error)]
pub enum BinlogError {
    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// 配置文件反序列化错误
    #[error("配置解析错误: {0}")]
    Toml(#[from] toml::de::Error),

    /// 配置文件序列化错误
    #[error("配置序列化错误: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// JSON 序列化错误
    #[cfg(feature = "export-json")]
    #[error("JSON序列化错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 解码工具执行失败
    #[error("mysqlbinlog 执行失败 (状态 {status}): {stderr}")]
    Decoder { status: String, stderr: String },

    /// 输入流为空，后续无任何可处理内容
    #[error("无法获取 binlog 内容: 输入为空")]
    EmptyInput,
}

impl BinlogError {
    /// 创建一个配置错误
    pub fn config_error<S: Into<String>>(message: S) -> Self {
        let message = message.into();
        tracing::error!("配置错误: {}", message);
        Self::Config(message)
    }

    /// 创建一个解码工具错误
    pub fn decoder_error<S: Into<String>, E: Into<String>>(
        status: S,
        stderr: E,
    ) -> Self {
        let status = status.into();
        let stderr = stderr.into();
        tracing::error!("mysqlbinlog 执行失败 (状态 {}): {}", status, stderr);
        Self::Decoder { status, stderr }
    }

    /// 检查是否为 IO 错误
    pub fn is_io_error(&self) -> bool {
        matches!(self, BinlogError::Io(_))
    }

    /// 检查是否为配置错误
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            BinlogError::Config(_)
                | BinlogError::Toml(_)
                | BinlogError::TomlSer(_)
        )
    }

    /// 检查是否为解码工具错误
    pub fn is_decoder_error(&self) -> bool {
        matches!(self, BinlogError::Decoder { .. })
    }

    /// 检查是否为空输入错误
    pub fn is_empty_input(&self) -> bool {
        matches!(self, BinlogError::EmptyInput)
    }
}
