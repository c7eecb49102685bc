//! 导出运行报告

use crate::writer::SinkCounts;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

/// 一次导出的统计结果
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportSummary {
    pub run_id: Uuid,
    pub patients: u64,
    pub studies: u64,
    pub series: u64,
    pub images: u64,
    /// 检查时间为空的检查数
    pub degraded_studies: u64,
    /// 没有8位日期片段、使用固定日期位置的检查数
    pub date_fallbacks: u64,
    /// 跳过的非目录/非影像条目数
    pub skipped_entries: u64,
    /// 临时性读取错误后重试的次数
    pub retried_reads: u64,
    pub elapsed_ms: u64,
    pub sinks: SinkCounts,
}

impl ExportSummary {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            ..Self::default()
        }
    }

    /// 输出到日志
    pub fn log(&self) {
        info!(
            run_id = %self.run_id,
            patients = self.patients,
            studies = self.studies,
            series = self.series,
            images = self.images,
            skipped = self.skipped_entries,
            retried = self.retried_reads,
            elapsed_ms = self.elapsed_ms,
            "导出完成"
        );

        if self.degraded_studies > 0 {
            warn!(
                "{} 个检查的时间无法从目录名解析 (其中 {} 个没有8位日期片段)，请检查目录命名格式",
                self.degraded_studies, self.date_fallbacks
            );
        }
    }

    pub fn to_json(&self) -> mri_core::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
