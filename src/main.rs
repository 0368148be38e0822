use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

use hoop_scrape::cli::{resolve_interactive, Cli};
use hoop_scrape::utils::logging;
use hoop_scrape::App;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = cli.load_config().context("加载配置失败")?;

    // 初始化日志
    logging::init(config.verbose_logging, &config.log_file)?;

    let interactive = resolve_interactive(&config);

    // 初始化并运行应用
    let mut app = App::initialize(config, &cli.url, interactive)?;
    let summary = match app.run().await {
        Ok(summary) => summary,
        Err(e) => {
            error!("❌ {:#}", e);
            std::process::exit(1);
        }
    };

    if summary.is_aborted() {
        let stem = app
            .output_file()
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        error!(
            "🛑 运行已中止，可用 --update --output {} 重新运行，从中断处继续",
            stem
        );
        std::process::exit(1);
    }
    Ok(())
}
