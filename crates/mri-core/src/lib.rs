//! # MRI Core
//!
//! MRI元数据导出的核心模块，提供记录模型、错误定义和通用工具。

pub mod error;
pub mod models;
pub mod utils;

pub use error::{ExportError, Result};
pub use models::*;
