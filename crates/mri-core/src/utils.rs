//! 通用工具函数

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::debug;

static SERIES_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^.*_(\d+)$").expect("valid series regex"));
static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid digit regex"));

/// 从系列目录名解析系列号
///
/// `T2_TSE_TRA_384_0004` -> 4；没有数字后缀时返回 0。
pub fn parse_series_number(folder_name: &str) -> u64 {
    SERIES_SUFFIX
        .captures(folder_name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_digits(m.as_str(), folder_name))
        .unwrap_or(0)
}

/// 从影像文件名解析实例号（文件名主干中最后一段数字）
///
/// `LOCALIZER_0_0570_008.ima` -> Some(8)
pub fn parse_instance_number(filename: &str) -> Option<u64> {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();

    DIGIT_RUN
        .find_iter(&stem)
        .last()
        .and_then(|m| parse_digits(m.as_str(), filename))
}

/// 数字串超出 u64 范围时按无编号处理
fn parse_digits(digits: &str, name: &str) -> Option<u64> {
    match digits.parse() {
        Ok(n) => Some(n),
        Err(e) => {
            debug!("编号超出范围，按无编号处理: {} ({})", name, e);
            None
        }
    }
}

/// 目录名是否全部由ASCII数字组成
pub fn is_numeric_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}

/// 文件扩展名是否在允许列表中（不区分大小写，允许列表为空时全部接受）
pub fn has_allowed_extension(path: &Path, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }

    match path.extension().map(|e| e.to_string_lossy()) {
        Some(ext) => allowed
            .iter()
            .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(&ext)),
        None => false,
    }
}
