//! MRI元数据导出主程序

use anyhow::Context;
use clap::Parser;
use mri_export::{ExportConfig, Exporter};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// 导出命令行参数
#[derive(Parser, Debug)]
#[command(name = "mri-exporter")]
#[command(about = "遍历 患者/检查/系列/影像 目录树并导出规范化CSV表")]
struct Args {
    /// 配置文件路径 (toml/yaml/json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 患者目录树的根目录
    #[arg(short, long)]
    source_root: Option<String>,

    /// 输出目录
    #[arg(short, long)]
    output_directory: Option<String>,

    /// 影像URL前缀
    #[arg(short, long)]
    base_url: Option<String>,

    /// 字段分隔符
    #[arg(short, long)]
    delimiter: Option<String>,

    /// 运行报告JSON输出路径
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// 日志级别，优先于 RUST_LOG
    #[arg(short, long)]
    log_level: Option<String>,
}

const DEFAULT_LOG_LEVEL: &str = "info";

/// 日志过滤指令：命令行参数 > RUST_LOG > 默认 info
fn filter_directive(cli: Option<&str>, env: Option<String>) -> String {
    cli.map(str::to_string)
        .or_else(|| env.filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

impl Args {
    fn overrides(&self) -> Vec<(&'static str, String)> {
        [
            ("source_root", &self.source_root),
            ("output_directory", &self.output_directory),
            ("base_url", &self.base_url),
            ("field_delimiter", &self.delimiter),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.clone().map(|v| (key, v)))
        .collect()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日志
    let directive = filter_directive(args.log_level.as_deref(), std::env::var(EnvFilter::DEFAULT_ENV).ok());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ExportConfig::load(args.config.as_deref(), &args.overrides()).context("加载导出配置失败")?;

    info!("导出配置:");
    info!("  源目录: {}", config.source_root.display());
    info!("  输出目录: {}", config.output_directory.display());
    info!("  URL前缀: {}", config.base_url);
    info!("  分隔符: {:?}", config.field_delimiter);

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("收到中断信号，当前目录层级处理完后停止");
            signal_token.cancel();
        }
    });

    let exporter = Exporter::new(config);
    let summary = match exporter.run(&cancel).await {
        Ok(summary) => summary,
        Err(e) => {
            error!("导出失败: {}", e);
            return Err(e).context("导出失败，输出表不完整，需要重新运行");
        }
    };

    if let Some(path) = &args.summary_json {
        let json = summary.to_json()?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("写入运行报告失败: {}", path.display()))?;
        info!("运行报告已写入 {}", path.display());
    }

    Ok(())
}
