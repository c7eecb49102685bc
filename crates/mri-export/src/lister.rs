//! 目录读取接口
//!
//! 遍历器通过 [`DirLister`] 读取目录和条目类型，测试中可以替换为脚本化实现。

use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

/// 目录条目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Dir,
    File,
    Other,
}

/// 目录读取接口
#[async_trait]
pub trait DirLister: Send + Sync {
    /// 列出目录下的 (文件名, 完整路径)，不保证顺序
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<(OsString, PathBuf)>>;

    /// 读取条目类型（跟随符号链接）
    async fn entry_kind(&self, path: &Path) -> io::Result<EntryKind>;
}

/// 基于 `tokio::fs` 的本地文件系统实现
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLister;

#[async_trait]
impl DirLister for FsLister {
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<(OsString, PathBuf)>> {
        let mut read_dir = tokio::fs::read_dir(path).await?;
        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            entries.push((entry.file_name(), entry.path()));
        }
        Ok(entries)
    }

    async fn entry_kind(&self, path: &Path) -> io::Result<EntryKind> {
        let meta = tokio::fs::metadata(path).await?;
        Ok(if meta.is_dir() {
            EntryKind::Dir
        } else if meta.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        })
    }
}
