//! 导出记录模型定义
//!
//! 每个实体表和关联表对应一个记录类型，列顺序由 [`TableRow::HEADER`] 固定。

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 检查时间的输出格式 (ISO-8601，无时区)
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// 需要分配代理键的实体类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Study,
    Series,
    Image,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Study => write!(f, "study"),
            EntityKind::Series => write!(f, "series"),
            EntityKind::Image => write!(f, "image"),
        }
    }
}

/// 可写入输出表的一行
pub trait TableRow {
    /// 输出表名 (同时作为文件名主干)
    const TABLE: &'static str;
    /// 固定表头
    const HEADER: &'static [&'static str];

    /// 按表头顺序输出字段值
    fn fields(&self) -> Vec<String>;
}

/// 检查记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudyRecord {
    pub study_id: u64,
    pub patient_id: String,
    pub region: String,
    pub protocol: String,
    pub study_datetime: Option<NaiveDateTime>,
    pub study_uid: String,
}

impl StudyRecord {
    /// 与本行同时写出的 患者-检查 关联
    pub fn link(&self) -> PatientStudyLink {
        PatientStudyLink {
            patient_id: self.patient_id.clone(),
            study_id: self.study_id,
        }
    }

    /// 格式化后的检查时间，解析失败时为空串
    pub fn datetime_field(&self) -> String {
        self.study_datetime
            .map(|dt| dt.format(DATETIME_FORMAT).to_string())
            .unwrap_or_default()
    }
}

impl TableRow for StudyRecord {
    const TABLE: &'static str = "study";
    const HEADER: &'static [&'static str] = &[
        "study_id",
        "patient_id",
        "region",
        "protocol",
        "study_datetime",
        "study_uid",
    ];

    fn fields(&self) -> Vec<String> {
        vec![
            self.study_id.to_string(),
            self.patient_id.clone(),
            self.region.clone(),
            self.protocol.clone(),
            self.datetime_field(),
            self.study_uid.clone(),
        ]
    }
}

/// 系列记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeriesRecord {
    pub series_id: u64,
    pub study_id: u64,
    pub series_name: String,
    pub series_number: u64,
}

impl SeriesRecord {
    pub fn link(&self) -> StudySeriesLink {
        StudySeriesLink {
            study_id: self.study_id,
            series_id: self.series_id,
        }
    }
}

impl TableRow for SeriesRecord {
    const TABLE: &'static str = "series";
    const HEADER: &'static [&'static str] = &["series_id", "study_id", "series_name", "series_number"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.series_id.to_string(),
            self.study_id.to_string(),
            self.series_name.clone(),
            self.series_number.to_string(),
        ]
    }
}

/// 影像记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageRecord {
    pub image_id: u64,
    pub series_id: u64,
    pub filename: String,
    pub instance_number: Option<u64>,
    pub url: String,
}

impl ImageRecord {
    pub fn link(&self) -> SeriesImageLink {
        SeriesImageLink {
            series_id: self.series_id,
            image_id: self.image_id,
        }
    }
}

impl TableRow for ImageRecord {
    const TABLE: &'static str = "image";
    const HEADER: &'static [&'static str] = &["image_id", "series_id", "filename", "instance_number", "url"];

    fn fields(&self) -> Vec<String> {
        vec![
            self.image_id.to_string(),
            self.series_id.to_string(),
            self.filename.clone(),
            self.instance_number.map(|n| n.to_string()).unwrap_or_default(),
            self.url.clone(),
        ]
    }
}

/// 患者-检查 关联
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientStudyLink {
    pub patient_id: String,
    pub study_id: u64,
}

impl TableRow for PatientStudyLink {
    const TABLE: &'static str = "patient_study";
    const HEADER: &'static [&'static str] = &["patient_id", "study_id"];

    fn fields(&self) -> Vec<String> {
        vec![self.patient_id.clone(), self.study_id.to_string()]
    }
}

/// 检查-系列 关联
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StudySeriesLink {
    pub study_id: u64,
    pub series_id: u64,
}

impl TableRow for StudySeriesLink {
    const TABLE: &'static str = "study_series";
    const HEADER: &'static [&'static str] = &["study_id", "series_id"];

    fn fields(&self) -> Vec<String> {
        vec![self.study_id.to_string(), self.series_id.to_string()]
    }
}

/// 系列-影像 关联
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeriesImageLink {
    pub series_id: u64,
    pub image_id: u64,
}

impl TableRow for SeriesImageLink {
    const TABLE: &'static str = "series_image";
    const HEADER: &'static [&'static str] = &["series_id", "image_id"];

    fn fields(&self) -> Vec<String> {
        vec![self.series_id.to_string(), self.image_id.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_study_fields_follow_header() {
        let study = StudyRecord {
            study_id: 7,
            patient_id: "0001".to_string(),
            region: "L".to_string(),
            protocol: "SPINE_PROT1".to_string(),
            study_datetime: NaiveDate::from_ymd_opt(2016, 3, 9).and_then(|d| d.and_hms_opt(14, 30, 0)),
            study_uid: "UID123".to_string(),
        };

        let fields = study.fields();
        assert_eq!(fields.len(), StudyRecord::HEADER.len());
        assert_eq!(fields[4], "2016-03-09T14:30:00");
        assert_eq!(study.link(), PatientStudyLink { patient_id: "0001".to_string(), study_id: 7 });
    }

    #[test]
    fn test_missing_values_render_empty() {
        let study = StudyRecord {
            study_id: 1,
            patient_id: "P".to_string(),
            region: "A".to_string(),
            protocol: String::new(),
            study_datetime: None,
            study_uid: "B".to_string(),
        };
        assert_eq!(study.datetime_field(), "");

        let image = ImageRecord {
            image_id: 3,
            series_id: 2,
            filename: "scout.ima".to_string(),
            instance_number: None,
            url: "http://localhost:8000/data/P/S/X/scout.ima".to_string(),
        };
        assert_eq!(image.fields()[3], "");
        assert_eq!(image.link(), SeriesImageLink { series_id: 2, image_id: 3 });
    }
}
