//! 输出表写入
//!
//! 六个输出表：三个实体表 (study/series/image) 和三个关联表
//! (patient_study/study_series/series_image)。每个表在初始化时截断并写入固定表头，
//! 之后逐行追加。实体行和对应的关联行由同一次调用写出，两者不会错位。
//!
//! 引号约定：字段包含分隔符、双引号或换行时整体加双引号，内部双引号加倍。

use csv::{QuoteStyle, WriterBuilder};
use mri_core::{
    ExportError, ImageRecord, PatientStudyLink, Result, SeriesImageLink, SeriesRecord, StudyRecord,
    StudySeriesLink, TableRow,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 写入器状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WriterState {
    Uninitialized,
    Ready,
}

/// 单个输出表
struct Sink {
    table: &'static str,
    path: PathBuf,
    writer: csv::Writer<File>,
    rows: u64,
}

impl Sink {
    fn create<T: TableRow>(output_dir: &Path, delimiter: u8) -> Result<Self> {
        let path = output_dir.join(format!("{}.csv", T::TABLE));
        let file = File::create(&path).map_err(|e| ExportError::io(format!("创建输出表 {}", path.display()), e))?;

        let mut writer = WriterBuilder::new()
            .delimiter(delimiter)
            .quote_style(QuoteStyle::Necessary)
            .has_headers(false)
            .from_writer(file);

        writer.write_record(T::HEADER).map_err(|source| ExportError::Csv {
            sink: T::TABLE.to_string(),
            source,
        })?;

        Ok(Self {
            table: T::TABLE,
            path,
            writer,
            rows: 0,
        })
    }

    fn append<T: TableRow>(&mut self, row: &T) -> Result<()> {
        debug_assert_eq!(self.table, T::TABLE);
        self.writer.write_record(row.fields()).map_err(|source| ExportError::Csv {
            sink: self.table.to_string(),
            source,
        })?;
        self.rows += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| ExportError::io(format!("刷新输出表 {}", self.path.display()), e))
    }
}

struct Sinks {
    study: Sink,
    series: Sink,
    image: Sink,
    patient_study: Sink,
    study_series: Sink,
    series_image: Sink,
}

impl Sinks {
    fn all_mut(&mut self) -> [&mut Sink; 6] {
        [
            &mut self.study,
            &mut self.series,
            &mut self.image,
            &mut self.patient_study,
            &mut self.study_series,
            &mut self.series_image,
        ]
    }
}

/// 各输出表的数据行数（不含表头）
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SinkCounts {
    pub study: u64,
    pub series: u64,
    pub image: u64,
    pub patient_study: u64,
    pub study_series: u64,
    pub series_image: u64,
}

/// 输出表写入器
pub struct TableWriter {
    output_dir: PathBuf,
    delimiter: u8,
    sinks: Option<Sinks>,
}

impl TableWriter {
    pub fn new(output_dir: impl Into<PathBuf>, delimiter: u8) -> Self {
        Self {
            output_dir: output_dir.into(),
            delimiter,
            sinks: None,
        }
    }

    pub fn state(&self) -> WriterState {
        if self.sinks.is_some() {
            WriterState::Ready
        } else {
            WriterState::Uninitialized
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// 所有输出表的文件名
    pub fn table_files() -> [String; 6] {
        [
            format!("{}.csv", StudyRecord::TABLE),
            format!("{}.csv", SeriesRecord::TABLE),
            format!("{}.csv", ImageRecord::TABLE),
            format!("{}.csv", PatientStudyLink::TABLE),
            format!("{}.csv", StudySeriesLink::TABLE),
            format!("{}.csv", SeriesImageLink::TABLE),
        ]
    }

    /// 创建输出目录，截断全部输出表并写入表头
    pub fn open(&mut self) -> Result<()> {
        if self.sinks.is_some() {
            debug!("输出表已初始化，忽略重复打开");
            return Ok(());
        }

        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| ExportError::io(format!("创建输出目录 {}", self.output_dir.display()), e))?;

        let dir = self.output_dir.as_path();
        let mut sinks = Sinks {
            study: Sink::create::<StudyRecord>(dir, self.delimiter)?,
            series: Sink::create::<SeriesRecord>(dir, self.delimiter)?,
            image: Sink::create::<ImageRecord>(dir, self.delimiter)?,
            patient_study: Sink::create::<PatientStudyLink>(dir, self.delimiter)?,
            study_series: Sink::create::<StudySeriesLink>(dir, self.delimiter)?,
            series_image: Sink::create::<SeriesImageLink>(dir, self.delimiter)?,
        };

        for sink in sinks.all_mut() {
            sink.flush()?;
        }

        info!("输出表已初始化: {}", self.output_dir.display());
        self.sinks = Some(sinks);
        Ok(())
    }

    fn ready(&mut self, table: &str) -> Result<&mut Sinks> {
        self.sinks
            .as_mut()
            .ok_or_else(|| ExportError::WriterNotReady(table.to_string()))
    }

    /// 写入检查行及 患者-检查 关联行
    pub fn write_study(&mut self, study: &StudyRecord) -> Result<()> {
        let sinks = self.ready(StudyRecord::TABLE)?;
        sinks.study.append(study)?;
        sinks.patient_study.append(&study.link())
    }

    /// 写入系列行及 检查-系列 关联行
    pub fn write_series(&mut self, series: &SeriesRecord) -> Result<()> {
        let sinks = self.ready(SeriesRecord::TABLE)?;
        sinks.series.append(series)?;
        sinks.study_series.append(&series.link())
    }

    /// 写入影像行及 系列-影像 关联行
    pub fn write_image(&mut self, image: &ImageRecord) -> Result<()> {
        let sinks = self.ready(ImageRecord::TABLE)?;
        sinks.image.append(image)?;
        sinks.series_image.append(&image.link())
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(sinks) = self.sinks.as_mut() {
            for sink in sinks.all_mut() {
                sink.flush()?;
            }
        }
        Ok(())
    }

    pub fn counts(&self) -> SinkCounts {
        match &self.sinks {
            Some(s) => SinkCounts {
                study: s.study.rows,
                series: s.series.rows,
                image: s.image.rows,
                patient_study: s.patient_study.rows,
                study_series: s.study_series.rows,
                series_image: s.series_image.rows,
            },
            None => SinkCounts::default(),
        }
    }
}
