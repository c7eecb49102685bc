//! 目录树遍历
//!
//! 源目录结构固定为 患者/检查/系列/影像文件：
//!
//! ```text
//! <source_root>/<patient>/<study>/<series>/<image>
//! ```
//!
//! 深度优先、单线程：一个患者的全部检查、系列、影像处理完之后才进入下一个患者，
//! 代理键按遍历顺序分配。每个目录的条目按文件名字节序排序后访问，
//! 这只保证同一台机器上可复现，不同文件系统之间不保证相同的键分配。

use crate::allocator::IdAllocator;
use crate::config::ExportConfig;
use crate::lister::{DirLister, EntryKind, FsLister};
use crate::parser::parse_study_name;
use crate::resolver::UrlResolver;
use crate::summary::ExportSummary;
use crate::writer::TableWriter;
use mri_core::utils::{has_allowed_extension, is_numeric_name, parse_instance_number, parse_series_number};
use mri_core::{EntityKind, ExportError, ImageRecord, Result, SeriesRecord, StudyRecord};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

static FS_LISTER: FsLister = FsLister;

#[derive(Debug)]
struct Entry {
    name: String,
    path: PathBuf,
    kind: EntryKind,
}

/// 目录树遍历器
pub struct TreeWalker<'a> {
    allocator: &'a dyn IdAllocator,
    lister: &'a dyn DirLister,
    writer: &'a mut TableWriter,
    resolver: UrlResolver,
    image_extensions: Vec<String>,
    numeric_patients_only: bool,
    retry_delay: Duration,
    summary: &'a mut ExportSummary,
}

impl<'a> TreeWalker<'a> {
    pub fn new(
        config: &ExportConfig,
        allocator: &'a dyn IdAllocator,
        writer: &'a mut TableWriter,
        summary: &'a mut ExportSummary,
    ) -> Self {
        Self {
            allocator,
            lister: &FS_LISTER,
            writer,
            resolver: UrlResolver::new(config.source_root.clone(), &config.base_url),
            image_extensions: config.image_extensions.clone(),
            numeric_patients_only: config.numeric_patients_only,
            retry_delay: config.retry_delay(),
            summary,
        }
    }

    /// 替换目录读取实现
    pub fn with_lister(mut self, lister: &'a dyn DirLister) -> Self {
        self.lister = lister;
        self
    }

    /// 遍历整个源目录
    pub async fn walk(&mut self, cancel: &CancellationToken) -> Result<()> {
        let root = self.resolver.root().to_path_buf();
        let entries = self.entries(&root, &format!("源目录 {}", root.display())).await?;

        for entry in entries {
            check_cancelled(cancel, || format!("患者 {}", entry.name))?;

            if entry.kind != EntryKind::Dir {
                self.skip(&entry, "源目录下的非目录条目");
                continue;
            }
            if self.numeric_patients_only && !is_numeric_name(&entry.name) {
                self.skip(&entry, "非数字患者目录");
                continue;
            }

            self.walk_patient(&entry, cancel).await?;
        }

        Ok(())
    }

    async fn walk_patient(&mut self, patient: &Entry, cancel: &CancellationToken) -> Result<()> {
        info!("处理患者 {}", patient.name);
        self.summary.patients += 1;

        let entries = self.entries(&patient.path, &format!("患者 {}", patient.name)).await?;

        for entry in entries {
            check_cancelled(cancel, || format!("患者 {} / 检查 {}", patient.name, entry.name))?;

            if entry.kind != EntryKind::Dir {
                self.skip(&entry, "患者目录下的非目录条目");
                continue;
            }

            self.walk_study(&patient.name, &entry, cancel).await?;
        }

        Ok(())
    }

    async fn walk_study(&mut self, patient_id: &str, study: &Entry, cancel: &CancellationToken) -> Result<()> {
        let parsed = parse_study_name(&study.name);
        let study_id = self.allocator.next_id(EntityKind::Study);

        if parsed.date_fallback {
            self.summary.date_fallbacks += 1;
        }
        if parsed.is_degraded() {
            self.summary.degraded_studies += 1;
            warn!(
                "检查目录名无法解析出时间，时间字段置空: {}/{} (日期位置 {}{})",
                patient_id,
                study.name,
                parsed.date_index,
                if parsed.date_fallback { "，使用默认位置" } else { "" }
            );
        }

        let record = StudyRecord {
            study_id,
            patient_id: patient_id.to_string(),
            region: parsed.region,
            protocol: parsed.protocol,
            study_datetime: parsed.datetime,
            study_uid: parsed.uid,
        };
        self.writer.write_study(&record)?;
        self.summary.studies += 1;
        debug!("检查 {} -> study_id {}", study.name, study_id);

        let context = format!("患者 {} / 检查 {}", patient_id, study.name);
        let entries = self.entries(&study.path, &context).await?;

        for entry in entries {
            check_cancelled(cancel, || format!("{} / 系列 {}", context, entry.name))?;

            if entry.kind != EntryKind::Dir {
                self.skip(&entry, "检查目录下的非目录条目");
                continue;
            }

            self.walk_series(&context, study_id, &entry).await?;
        }

        Ok(())
    }

    async fn walk_series(&mut self, study_context: &str, study_id: u64, series: &Entry) -> Result<()> {
        let series_id = self.allocator.next_id(EntityKind::Series);
        let record = SeriesRecord {
            series_id,
            study_id,
            series_name: series.name.clone(),
            series_number: parse_series_number(&series.name),
        };
        self.writer.write_series(&record)?;
        self.summary.series += 1;

        let context = format!("{} / 系列 {}", study_context, series.name);
        let entries = self.entries(&series.path, &context).await?;

        for entry in entries {
            if entry.kind != EntryKind::File {
                self.skip(&entry, "系列目录下的非文件条目");
                continue;
            }
            if !has_allowed_extension(&entry.path, &self.image_extensions) {
                self.skip(&entry, "扩展名不在影像白名单中");
                continue;
            }

            // 路径不在源目录下属于配置错误，直接中止
            let url = self.resolver.resolve(&entry.path)?;
            let image_id = self.allocator.next_id(EntityKind::Image);
            let record = ImageRecord {
                image_id,
                series_id,
                instance_number: parse_instance_number(&entry.name),
                filename: entry.name,
                url,
            };
            self.writer.write_image(&record)?;
            self.summary.images += 1;
        }

        Ok(())
    }

    fn skip(&mut self, entry: &Entry, reason: &str) {
        self.summary.skipped_entries += 1;
        debug!("跳过 {} ({})", entry.path.display(), reason);
    }

    /// 读取目录并识别每个条目的类型，按文件名排序
    ///
    /// 列目录和读取条目类型都经过 [`Self::read_with_retry`]；第二次失败时报告实体上下文。
    /// 不存在的条目（悬空符号链接）和非UTF-8名称按跳过处理。
    async fn entries(&mut self, path: &Path, context: &str) -> Result<Vec<Entry>> {
        let lister = self.lister;
        let mut listed = self
            .read_with_retry(context, || lister.read_dir(path))
            .await
            .map_err(|e| ExportError::io(context, e))?;
        listed.sort_by(|a, b| a.0.cmp(&b.0));

        let mut entries = Vec::with_capacity(listed.len());
        for (raw_name, entry_path) in listed {
            let name = match raw_name.into_string() {
                Ok(name) => name,
                Err(_) => {
                    // 有损转换可能让两个目录得到相同的患者ID
                    warn!("条目名不是有效的UTF-8，跳过: {}", entry_path.display());
                    self.summary.skipped_entries += 1;
                    continue;
                }
            };

            let entry_context = format!("{} / {}", context, name);
            let kind = match self
                .read_with_retry(&entry_context, || lister.entry_kind(&entry_path))
                .await
            {
                Ok(kind) => kind,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    warn!("条目不存在（可能是悬空符号链接），跳过: {}", entry_path.display());
                    EntryKind::Other
                }
                Err(e) => return Err(ExportError::io(entry_context, e)),
            };

            entries.push(Entry {
                name,
                path: entry_path,
                kind,
            });
        }

        Ok(entries)
    }

    /// 临时性错误重试一次
    async fn read_with_retry<T, F, Fut>(&mut self, context: &str, op: F) -> io::Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = io::Result<T>>,
    {
        match op().await {
            Err(e) if is_transient(&e) => {
                warn!("读取 {} 失败，{:?} 后重试: {}", context, self.retry_delay, e);
                self.summary.retried_reads += 1;
                tokio::time::sleep(self.retry_delay).await;
                op().await
            }
            result => result,
        }
    }
}

fn check_cancelled(cancel: &CancellationToken, context: impl FnOnce() -> String) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(ExportError::Cancelled { context: context() });
    }
    Ok(())
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::PermissionDenied
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::Interrupted
            | io::ErrorKind::TimedOut
    )
}
