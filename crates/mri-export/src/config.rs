//! 导出配置
//!
//! 配置来源按优先级从低到高：内置默认值、配置文件、`MRI_EXPORT_*` 环境变量、命令行覆盖。

use config::{Config, Environment, File};
use mri_core::{ExportError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "MRI_EXPORT";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/";
pub const DEFAULT_DELIMITER: &str = ",";
pub const DEFAULT_RETRY_DELAY_MS: u64 = 200;

/// 导出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// 患者目录树的根目录
    pub source_root: PathBuf,
    /// 输出表所在目录
    pub output_directory: PathBuf,
    /// 影像URL前缀
    pub base_url: String,
    /// 字段分隔符（单个ASCII字符）
    #[serde(default = "default_delimiter")]
    pub field_delimiter: String,
    /// 影像文件扩展名白名单，为空时接受所有文件
    #[serde(default)]
    pub image_extensions: Vec<String>,
    /// 只导出名称全为数字的患者目录
    #[serde(default)]
    pub numeric_patients_only: bool,
    /// 临时性读取错误的重试等待时间
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::new(),
            output_directory: PathBuf::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            field_delimiter: default_delimiter(),
            image_extensions: Vec::new(),
            numeric_patients_only: false,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl ExportConfig {
    pub fn new(source_root: impl Into<PathBuf>, output_directory: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            source_root: source_root.into(),
            output_directory: output_directory.into(),
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    /// 加载配置
    ///
    /// `overrides` 为命令行给出的 (键, 值)，优先级最高。
    pub fn load(config_path: Option<&Path>, overrides: &[(&str, String)]) -> Result<Self> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("base_url", defaults.base_url)
            .and_then(|b| b.set_default("field_delimiter", defaults.field_delimiter))
            .and_then(|b| b.set_default("image_extensions", Vec::<String>::new()))
            .and_then(|b| b.set_default("numeric_patients_only", defaults.numeric_patients_only))
            .and_then(|b| b.set_default("retry_delay_ms", defaults.retry_delay_ms as i64))
            .map_err(config_error)?;

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("image_extensions"),
        );

        for (key, value) in overrides {
            builder = builder.set_override(*key, value.as_str()).map_err(config_error)?;
        }

        let config: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(config_error)?;

        config.validate()?;
        Ok(config)
    }

    /// 校验配置，任何错误都在截断输出表之前报告
    pub fn validate(&self) -> Result<()> {
        let checks: [(&str, fn(&ExportConfig) -> std::result::Result<(), String>); 4] = [
            ("source_root", |c| {
                if c.source_root.as_os_str().is_empty() {
                    Err("源目录不能为空".to_string())
                } else {
                    Ok(())
                }
            }),
            ("output_directory", |c| {
                if c.output_directory.as_os_str().is_empty() {
                    Err("输出目录不能为空".to_string())
                } else if normalize(&c.output_directory).starts_with(normalize(&c.source_root)) {
                    Err(format!(
                        "输出目录 {} 位于源目录 {} 之内",
                        c.output_directory.display(),
                        c.source_root.display()
                    ))
                } else {
                    Ok(())
                }
            }),
            ("base_url", |c| {
                if c.base_url.trim().is_empty() {
                    Err("URL前缀不能为空".to_string())
                } else {
                    Ok(())
                }
            }),
            ("field_delimiter", |c| c.delimiter_byte().map(|_| ())),
        ];

        for (field, check) in checks {
            if let Err(message) = check(self) {
                error!("配置校验失败 {}: {}", field, message);
                return Err(ExportError::Config(format!("{}: {}", field, message)));
            }
        }

        info!("配置校验通过");
        Ok(())
    }

    /// 分隔符对应的字节
    pub fn delimiter_byte(&self) -> std::result::Result<u8, String> {
        let mut chars = self.field_delimiter.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii() && !matches!(c, '"' | '\r' | '\n') => Ok(c as u8),
            _ => Err(format!("分隔符必须是单个ASCII字符且不能是引号或换行: {:?}", self.field_delimiter)),
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// 转为绝对路径并按字面消去 `.` 和 `..`，不访问文件系统
fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn config_error(e: config::ConfigError) -> ExportError {
    ExportError::Config(e.to_string())
}
