//! 错误定义模块

use std::path::PathBuf;
use thiserror::Error;

/// 导出流程统一错误类型
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("配置错误: {0}")]
    Config(String),

    /// 影像文件不在配置的源目录下，属于配置错误，整个导出中止
    #[error("路径不在源目录 {root} 之下: {path}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("IO错误 ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV写入错误 ({sink}): {source}")]
    Csv {
        sink: String,
        #[source]
        source: csv::Error,
    },

    #[error("输出表尚未初始化: {0}")]
    WriterNotReady(String),

    #[error("导出已取消 ({context})")]
    Cancelled { context: String },

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ExportError {
    /// 构造带实体上下文的IO错误
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// 是否为取消导致的错误
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// 导出流程统一结果类型
pub type Result<T> = std::result::Result<T, ExportError>;
