mod runner;

use anyhow::Context;
use clap::Parser;
use portal_core::config::PortalConfig;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "/etc/captive-portal/portal.toml";

#[derive(Debug, Parser)]
#[command(name = "portal-daemon")]
#[command(about = "Captive portal for putting a headless device on WiFi")]
struct Cli {
    /// TOML configuration file. Built-in defaults are used when the default
    /// path does not exist.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides `server.port`.
    #[arg(long)]
    port: Option<u16>,

    /// Serve the UI from this directory instead of the embedded copy.
    #[arg(long)]
    assets_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 初始化日志（这是入口点的职责）
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // 2. 加载配置并调用库的核心逻辑
    let result = match load_config(&cli) {
        Ok(config) => runner::run_portal(config).await,
        Err(e) => Err(e),
    };

    // 3. 处理顶层错误
    if let Err(e) = result {
        tracing::error!("❌ Captive portal failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<PortalConfig> {
    let mut config = match &cli.config {
        Some(path) => PortalConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            PortalConfig::load(Path::new(DEFAULT_CONFIG_PATH))
                .with_context(|| format!("loading {}", DEFAULT_CONFIG_PATH))?
        }
        None => {
            tracing::info!("No config at {}, using built-in defaults", DEFAULT_CONFIG_PATH);
            PortalConfig::default()
        }
    };

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(dir) = &cli.assets_dir {
        config.server.assets_dir = Some(dir.clone());
    }
    Ok(config)
}
