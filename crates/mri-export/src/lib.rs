//! # MRI Export
//!
//! 遍历 患者/检查/系列/影像 目录树，为每层实体分配代理键，
//! 并输出规范化的实体表和关联表，供批量导入关系库或图数据库。

pub mod allocator;
pub mod config;
pub mod exporter;
pub mod lister;
pub mod parser;
pub mod resolver;
pub mod summary;
pub mod walker;
pub mod writer;

pub use allocator::{IdAllocator, SequentialAllocator};
pub use config::ExportConfig;
pub use exporter::Exporter;
pub use lister::{DirLister, EntryKind, FsLister};
pub use parser::{parse_study_name, StudyName};
pub use resolver::UrlResolver;
pub use summary::ExportSummary;
pub use walker::TreeWalker;
pub use writer::{SinkCounts, TableWriter, WriterState};
