mod cli;
mod commands;
mod logging;
mod report;
mod settings;

use clap::Parser;
use cli::{Cli, Command};
use std::path::PathBuf;
use tracing::{error, info};

/// # Summary
/// 命令行入口。
///
/// # Logic
/// 1. 解析命令行并初始化全局日志，配置错误也能落到日志里。
/// 2. 加载配置并安装 TLS 加密后端。
/// 3. 注册数据根目录。
/// 4. 分派到具体子命令。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    // 1. 日志守卫需存活到进程结束
    let _guard = logging::init();

    let config = match settings::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config {}: {}", cli.config, e);
            return Err(e.into());
        }
    };
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        info!("TLS crypto provider already installed");
    }
    candlecast_store::config::set_root_dir(PathBuf::from(&config.data.dir));
    info!(
        "candlecast starting: {} {}, data dir {}",
        config.feed.symbol, config.feed.timeframe, config.data.dir
    );

    // 2. 分派子命令
    match &cli.command {
        Command::Prepare(args) => commands::run_prepare(&config, args),
        Command::Train(args) => commands::run_train(&config, args),
        Command::Validate(args) => commands::run_validate(&config, args),
        Command::PredictNow(args) => commands::run_predict_now(&config, args).await,
        Command::Forecast(args) => commands::run_forecast(&config, args).await,
        Command::Live(args) => commands::run_live(&config, args).await,
    }
}
