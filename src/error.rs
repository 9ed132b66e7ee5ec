//! # 统一错误处理模块
//!
//! 定义 qhakit 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// qhakit 统一错误类型
#[derive(Error, Debug)]
pub enum QhaError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 归档错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to open archive: {path}\nReason: {reason}")]
    ArchiveError { path: String, reason: String },

    #[error("No matching structure files found with pattern: {pattern}")]
    NoFilesFound { pattern: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Unknown element symbol: {0}")]
    UnknownElement(String),

    // ─────────────────────────────────────────────────────────────
    // 外部命令错误
    // ─────────────────────────────────────────────────────────────
    #[error("External command '{command}' not found in PATH")]
    CommandNotFound { command: String },

    #[error("External command failed: {command}\n{stderr}")]
    CommandFailed { command: String, stderr: String },

    // ─────────────────────────────────────────────────────────────
    // 力场 / 声子 / 拟合错误
    // ─────────────────────────────────────────────────────────────
    #[error("Force field '{name}' failed: {reason}")]
    ForceFieldFailed { name: String, reason: String },

    #[error("Phonon calculation out of order: {0}")]
    PhononState(String),

    #[error("QHA fit failed: {0}")]
    FitFailed(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // 序列化错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

impl QhaError {
    /// 输入文件本身不可用（无法读取、格式不支持或内容错误）
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            QhaError::FileReadError { .. }
                | QhaError::FileNotFound { .. }
                | QhaError::ParseError { .. }
                | QhaError::UnsupportedFormat(_)
                | QhaError::UnknownElement(_)
        )
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, QhaError>;
