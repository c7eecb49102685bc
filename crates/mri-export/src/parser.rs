//! 检查目录名解析
//!
//! 检查目录名形如 `L-SPINE_LSS_20160309_091629_240000`，按下划线切分后按位置提取
//! 部位、协议、检查时间和UID。解析失败不会中止导出，只会让时间字段为空。

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 目录名分隔符
pub const NAME_SEPARATOR: char = '_';

/// 找不到8位日期片段时使用的日期位置
pub const FALLBACK_DATE_INDEX: usize = 2;

const COMPACT_DATETIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// 检查目录名解析结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudyName {
    pub region: String,
    pub protocol: String,
    pub datetime: Option<NaiveDateTime>,
    pub uid: String,
    /// 日期片段所在位置
    pub date_index: usize,
    /// 没有找到8位日期片段，使用了固定位置
    pub date_fallback: bool,
}

impl StudyName {
    /// 检查时间为空即视为降级记录
    pub fn is_degraded(&self) -> bool {
        self.datetime.is_none()
    }
}

/// 解析检查目录名
pub fn parse_study_name(name: &str) -> StudyName {
    let tokens: Vec<&str> = name.split(NAME_SEPARATOR).collect();

    let region = tokens.first().copied().unwrap_or_default().to_string();
    let uid = tokens.last().copied().unwrap_or_default().to_string();

    let found = tokens.iter().position(|t| is_date_token(t));
    let date_fallback = found.is_none();
    let date_index = found.unwrap_or(FALLBACK_DATE_INDEX);

    let protocol = if date_index > 1 && date_index < tokens.len() {
        tokens[1..date_index].join(&NAME_SEPARATOR.to_string())
    } else {
        String::new()
    };

    let datetime = match (tokens.get(date_index), tokens.get(date_index + 1)) {
        (Some(date), Some(time)) => parse_compact_datetime(date, time),
        _ => None,
    };

    StudyName {
        region,
        protocol,
        datetime,
        uid,
        date_index,
        date_fallback,
    }
}

fn is_date_token(token: &str) -> bool {
    token.len() == 8 && token.bytes().all(|b| b.is_ascii_digit())
}

/// `YYYYMMDD` + `HHMMSS` -> 时间，任何格式问题都返回 None
fn parse_compact_datetime(date: &str, time: &str) -> Option<NaiveDateTime> {
    let candidate = format!("{}{}", date, time);
    if candidate.len() != 14 || !candidate.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDateTime::parse_from_str(&candidate, COMPACT_DATETIME_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_well_formed_name() {
        let parsed = parse_study_name("L_SPINE_PROT1_20160309_143000_UID123");

        assert_eq!(parsed.region, "L");
        assert_eq!(parsed.date_index, 3);
        assert_eq!(parsed.protocol, "SPINE_PROT1");
        assert_eq!(
            parsed.datetime,
            NaiveDate::from_ymd_opt(2016, 3, 9).and_then(|d| d.and_hms_opt(14, 30, 0))
        );
        assert_eq!(parsed.uid, "UID123");
        assert!(!parsed.date_fallback);
        assert!(!parsed.is_degraded());
    }

    #[test]
    fn test_parse_dataset_style_name() {
        let parsed = parse_study_name("L-SPINE_LSS_20160309_091629_240000");

        assert_eq!(parsed.region, "L-SPINE");
        assert_eq!(parsed.protocol, "LSS");
        assert_eq!(
            parsed.datetime.map(|d| d.format("%Y-%m-%dT%H:%M:%S").to_string()),
            Some("2016-03-09T09:16:29".to_string())
        );
        assert_eq!(parsed.uid, "240000");
    }

    #[test]
    fn test_short_name_degrades() {
        let parsed = parse_study_name("A_B");

        assert_eq!(parsed.region, "A");
        assert_eq!(parsed.protocol, "");
        assert_eq!(parsed.datetime, None);
        assert_eq!(parsed.uid, "B");
        assert_eq!(parsed.date_index, FALLBACK_DATE_INDEX);
        assert!(parsed.date_fallback);
        assert!(parsed.is_degraded());
    }

    #[test]
    fn test_fallback_index_inside_tokens() {
        let parsed = parse_study_name("KNEE_PD_SAG_FOO_BAR");

        assert!(parsed.date_fallback);
        assert_eq!(parsed.protocol, "PD");
        assert_eq!(parsed.datetime, None);
        assert_eq!(parsed.uid, "BAR");
    }

    #[test]
    fn test_date_as_second_to_last_token() {
        let parsed = parse_study_name("L_PROT_20160309");

        assert!(!parsed.date_fallback);
        assert_eq!(parsed.protocol, "PROT");
        assert_eq!(parsed.datetime, None);
        assert_eq!(parsed.uid, "20160309");
    }

    #[test]
    fn test_invalid_calendar_values() {
        assert_eq!(parse_study_name("L_P_20161309_143000_U").datetime, None);
        assert_eq!(parse_study_name("L_P_20160309_256000_U").datetime, None);
        assert_eq!(parse_study_name("L_P_20160309_1430_U").datetime, None);
        assert_eq!(parse_study_name("L_P_20160309_14300a_U").datetime, None);
    }

    #[test]
    fn test_empty_name() {
        let parsed = parse_study_name("");

        assert_eq!(parsed.region, "");
        assert_eq!(parsed.uid, "");
        assert!(parsed.is_degraded());
    }
}
