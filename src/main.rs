//! SubtitleCat 中文字幕下载器。
//!
//! 根据视频文件名（或 NFO 中的番号）在 subtitlecat.com 搜索字幕，
//! 优先下载简体中文，其次繁体中文。
//!
//! 代码结构（读代码入口）：
//! - `base_system`：配置/日志/番号提取/视频文件判断等基础设施
//! - `network_parser`：站点请求与页面解析
//! - `download`：单条下载流程与批处理
//! - `library`：按 NFO 递归扫描媒体库
//! - `third_party`：webhook 通知

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::{error, info};

mod base_system;
mod download;
mod library;
mod network_parser;
mod third_party;

use base_system::config::load_or_create;
use base_system::context::Config;
use base_system::logging::{LogOptions, LogSystem};
use download::models::ItemOutcome;
use network_parser::network::SubtitleCatClient;
use third_party::webhook::WebhookNotifier;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "subtitlecat-downloader")]
#[command(about = "Search subtitlecat.com and download Chinese subtitles")]
struct Cli {
    /// 番号、视频文件路径或视频目录
    #[arg(required_unless_present_any = ["library", "version"])]
    input: Option<String>,

    /// 字幕保存目录（默认：目录输入为其自身，文件输入为所在目录，关键字为当前目录）
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// 按配置中的 library_src_path / library_save_path 扫描媒体库
    #[arg(long, default_value_t = false)]
    library: bool,

    /// 启用调试日志输出
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// 数据目录路径（用于存放 config.yml 和 logs）
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// 显示版本信息后退出
    #[arg(long, default_value_t = false)]
    version: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("subtitlecat-downloader v{}", VERSION);
        return Ok(());
    }

    let data_dir = cli.data_dir.as_deref();
    let _log = init_logging(cli.debug, data_dir)?;
    info!(target: "startup", "当前版本: v{}", VERSION);

    let config = load_or_create::<Config>(None, data_dir)
        .map_err(|e| anyhow!(e))
        .context("加载配置失败")?;
    let client = SubtitleCatClient::new(&config).context("初始化网络客户端失败")?;

    if cli.library {
        let notifier = WebhookNotifier::from_config(&config);
        if library::scan::run_library(&client, &config, &notifier).is_none() {
            error!("媒体库未配置，已退出");
        }
        return Ok(());
    }

    let Some(input) = cli.input.as_deref() else {
        return Err(anyhow!("缺少输入参数"));
    };
    let report = download::batch::run(&client, &config, input, cli.output_dir.as_deref());
    let ok = report.count(ItemOutcome::is_success);
    info!("处理完成：成功 {} 个，未成功 {} 个", ok, report.items.len() - ok);
    Ok(())
}

fn init_logging(debug: bool, base_dir: Option<&Path>) -> Result<LogSystem> {
    let opts = LogOptions {
        debug,
        base_dir: base_dir.map(Path::to_path_buf),
        ..LogOptions::default()
    };
    LogSystem::init(opts).map_err(|e| anyhow!(e))
}
