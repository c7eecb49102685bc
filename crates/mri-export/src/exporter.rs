//! 导出流程编排

use crate::allocator::{IdAllocator, SequentialAllocator};
use crate::config::ExportConfig;
use crate::summary::ExportSummary;
use crate::walker::TreeWalker;
use crate::writer::TableWriter;
use mri_core::{ExportError, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// 一次性批量导出
///
/// 不支持断点续传：每次运行都会截断全部输出表并从头开始。
pub struct Exporter {
    config: ExportConfig,
    allocator: Arc<dyn IdAllocator>,
}

impl Exporter {
    pub fn new(config: ExportConfig) -> Self {
        Self::with_allocator(config, Arc::new(SequentialAllocator::new()))
    }

    pub fn with_allocator(config: ExportConfig, allocator: Arc<dyn IdAllocator>) -> Self {
        Self { config, allocator }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// 执行导出
    pub async fn run(&self, cancel: &CancellationToken) -> Result<ExportSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("export", run_id = %run_id);
        self.run_inner(run_id, cancel).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, cancel: &CancellationToken) -> Result<ExportSummary> {
        let started = Instant::now();
        self.config.validate()?;
        let delimiter = self.config.delimiter_byte().map_err(ExportError::Config)?;

        // 源目录不可读时不截断已有输出
        let root = &self.config.source_root;
        let meta = tokio::fs::metadata(root)
            .await
            .map_err(|e| ExportError::io(format!("源目录 {}", root.display()), e))?;
        if !meta.is_dir() {
            return Err(ExportError::Config(format!("源目录不是目录: {}", root.display())));
        }

        info!(
            "开始导出: {} -> {} (URL前缀 {})",
            root.display(),
            self.config.output_directory.display(),
            self.config.base_url
        );

        let mut writer = TableWriter::new(self.config.output_directory.clone(), delimiter);
        writer.open()?;

        let mut summary = ExportSummary::new(run_id);
        let result = TreeWalker::new(&self.config, self.allocator.as_ref(), &mut writer, &mut summary)
            .walk(cancel)
            .await;

        // 失败时也刷新已写出的部分
        let flushed = writer.flush();
        summary.sinks = writer.counts();
        summary.elapsed_ms = started.elapsed().as_millis() as u64;

        if let Err(e) = result {
            error!("导出中止: {} (已写出 {} 个检查, {} 个影像)", e, summary.studies, summary.images);
            return Err(e);
        }
        flushed?;

        summary.log();
        Ok(summary)
    }
}
