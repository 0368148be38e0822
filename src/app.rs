//! 应用入口
//!
//! 把配置变成一个装配好的 `Orchestrator`，运行一次并输出统计

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::infrastructure::ChromiumSessionFactory;
use crate::models::RunSummary;
use crate::orchestrator::Orchestrator;
use crate::services::listing_discoverer::league_name_from_url;
use crate::services::{BasketballExtractor, RateController, ResultStore};
use crate::utils::logging::{log_startup, print_final_stats};

/// 应用主结构
pub struct App {
    config: Config,
    listing_url: String,
    output_file: PathBuf,
    orchestrator: Orchestrator,
}

impl App {
    /// 初始化应用（日志需已初始化）
    ///
    /// `interactive` 决定批次暂停时是否询问操作者
    pub fn initialize(config: Config, listing_url: &str, interactive: bool) -> Result<Self> {
        config.validate().context("配置校验失败")?;

        let output_file = output_file_path(&config, listing_url);
        log_startup(&config, listing_url, &output_file);

        let factory = Arc::new(ChromiumSessionFactory::new(&config));
        let extractor = Arc::new(BasketballExtractor::new(&config).context("创建字段提取器失败")?);
        let store = ResultStore::new(&output_file);
        let rate = RateController::new(&config, interactive);
        if !interactive {
            info!("非交互模式：不会在批次之间暂停");
        }

        let orchestrator = Orchestrator::new(&config, factory, extractor, store, rate);
        Ok(Self {
            config,
            listing_url: listing_url.to_string(),
            output_file,
            orchestrator,
        })
    }

    pub fn output_file(&self) -> &Path {
        &self.output_file
    }

    /// 运行一次并输出统计
    pub async fn run(&mut self) -> Result<RunSummary> {
        let summary = self
            .orchestrator
            .run(&self.listing_url)
            .await
            .with_context(|| format!("处理 {} 失败", self.listing_url))?;
        print_final_stats(&summary, &self.output_file, &self.config.log_file);
        Ok(summary)
    }
}

/// 输出文件路径：`<output_path>/<文件名>.json`
///
/// 未指定文件名时：更新模式用联赛名（多次运行写同一个文件），
/// 完整抓取用联赛名加时间戳
pub fn output_file_path(config: &Config, listing_url: &str) -> PathBuf {
    let stem = match &config.output_name {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => {
            let league = league_name_from_url(listing_url);
            if config.update {
                league
            } else {
                format!(
                    "{}_{}",
                    league,
                    chrono::Local::now().format("%Y%m%d_%H%M%S")
                )
            }
        }
    };
    Path::new(&config.output_path).join(format!("{}.json", stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.flashscore.com/basketball/usa/nba/results/";

    #[test]
    fn explicit_output_name_wins() {
        let config = Config {
            output_name: Some("nba_run".into()),
            ..Config::default()
        };
        assert_eq!(
            output_file_path(&config, URL),
            Path::new("output").join("nba_run.json")
        );
    }

    #[test]
    fn update_mode_uses_stable_league_name() {
        let config = Config {
            update: true,
            ..Config::default()
        };
        assert_eq!(
            output_file_path(&config, URL),
            Path::new("output").join("usa_nba.json")
        );
    }

    #[test]
    fn full_run_appends_timestamp() {
        let path = output_file_path(&Config::default(), URL);
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("usa_nba_"));
        assert!(name.ends_with(".json"));
        assert_eq!(name.len(), "usa_nba_".len() + "YYYYmmdd_HHMMSS".len() + ".json".len());
    }
}
