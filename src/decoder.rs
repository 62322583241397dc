//! mysqlbinlog 解码调用
//!
//! 负责拼装 mysqlbinlog 的参数、执行并把输出转换为文本。
//! 输出不是合法 UTF-8 时按有损方式转换并记录警告，不会中断处理。

use crate::error::{BinlogError, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// 行事件输出的详细程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowVerbosity {
    /// `-v`：只输出伪 SQL
    #[default]
    Verbose,
    /// `-vv`：附带列类型注释
    VeryVerbose,
}

/// 传给 mysqlbinlog 的范围与输出选项
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    pub start_datetime: Option<String>,
    pub stop_datetime: Option<String>,
    pub start_position: Option<u64>,
    pub stop_position: Option<u64>,
    pub verbose_rows: RowVerbosity,
    pub extra_args: Vec<String>,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn datetime_range(
        mut self,
        start: Option<String>,
        stop: Option<String>,
    ) -> Self {
        self.start_datetime = start;
        self.stop_datetime = stop;
        self
    }

    pub fn position_range(mut self, start: Option<u64>, stop: Option<u64>) -> Self {
        self.start_position = start;
        self.stop_position = stop;
        self
    }

    pub fn verbose_rows(mut self, verbosity: RowVerbosity) -> Self {
        self.verbose_rows = verbosity;
        self
    }

    pub fn extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// 生成命令行参数（不含 binlog 文件路径）
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["--base64-output=decode-rows".to_string()];
        args.push(
            match self.verbose_rows {
                RowVerbosity::Verbose => "-v",
                RowVerbosity::VeryVerbose => "-vv",
            }
            .to_string(),
        );

        if let Some(start) = &self.start_datetime {
            args.push(format!("--start-datetime={start}"));
        }
        if let Some(stop) = &self.stop_datetime {
            args.push(format!("--stop-datetime={stop}"));
        }
        if let Some(start) = self.start_position {
            args.push(format!("--start-position={start}"));
        }
        if let Some(stop) = self.stop_position {
            args.push(format!("--stop-position={stop}"));
        }

        args.extend(self.extra_args.iter().cloned());
        args
    }
}

fn build_command(binary: &str, binlog: &Path, options: &DecodeOptions) -> Command {
    let mut command = Command::new(binary);
    command.args(options.to_args()).arg(binlog);
    command
}

/// 执行 mysqlbinlog 并返回解码后的文本
///
/// # Errors
/// 无法启动返回 [`BinlogError::Io`]，非零退出返回 [`BinlogError::Decoder`]。
pub fn decode_binlog(
    binary: &str,
    binlog: &Path,
    options: &DecodeOptions,
) -> Result<String> {
    tracing::info!(
        binlog = %binlog.display(),
        args = ?options.to_args(),
        "执行 mysqlbinlog"
    );

    let output = build_command(binary, binlog, options)
        .stdin(Stdio::null())
        .output()?;

    if !output.status.success() {
        return Err(BinlogError::decoder_error(
            output.status.to_string(),
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    Ok(decode_bytes(output.stdout, &binlog.display().to_string()))
}

/// 把 mysqlbinlog 的输出直接写入 `dest` 再读回，避免在内存中持有管道缓冲
///
/// # Errors
/// 同 [`decode_binlog`]，另外包括读写 `dest` 的 IO 错误。
pub fn decode_binlog_via_file(
    binary: &str,
    binlog: &Path,
    options: &DecodeOptions,
    dest: &Path,
) -> Result<String> {
    tracing::debug!(dest = %dest.display(), "使用直接解析模式");

    let file = File::create(dest)?;
    let output = build_command(binary, binlog, options)
        .stdin(Stdio::null())
        .stdout(Stdio::from(file))
        .output()?;

    if !output.status.success() {
        let _ = std::fs::remove_file(dest);
        return Err(BinlogError::decoder_error(
            output.status.to_string(),
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    let text = read_decoded(dest);
    if let Err(e) = std::fs::remove_file(dest) {
        tracing::warn!(path = %dest.display(), error = %e, "无法删除临时文件");
    }
    text
}

/// 直接解析模式使用的临时文件路径
pub fn temp_decode_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("binlog_content_{}.txt", std::process::id()))
}

/// 读取已经解码好的文本文件
///
/// # Errors
/// 文件无法读取时返回 [`BinlogError::Io`]。
pub fn read_decoded<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    Ok(decode_bytes(bytes, &path.display().to_string()))
}

/// 字节转文本，无效 UTF-8 时有损转换
pub fn decode_bytes(bytes: Vec<u8>, source: &str) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(
                source,
                valid_up_to = e.utf8_error().valid_up_to(),
                "解码输出包含无效 UTF-8，按有损方式转换"
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}
