//! 命令行参数

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;
use crate::error::ConfigError;
use crate::models::SortDirection;

/// 指定配置文件的环境变量
pub const CONFIG_ENV: &str = "HOOP_SCRAPE_CONFIG";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "hoop_scrape",
    version,
    about = "Flashscore 篮球比赛数据抓取（可断点续抓）"
)]
pub struct Cli {
    /// 联赛结果页 URL
    #[arg(long)]
    pub url: String,

    /// 输出文件名（不含扩展名）
    #[arg(long)]
    pub output: Option<String>,

    /// 只处理最新的 N 场（在去重之后）
    #[arg(long, value_name = "N")]
    pub last: Option<usize>,

    /// 更新模式：跳过结果文件中已有的比赛
    #[arg(long)]
    pub update: bool,

    /// 显示浏览器窗口
    #[arg(long)]
    pub no_headless: bool,

    /// 结束时不重新排序
    #[arg(long)]
    pub no_sort: bool,

    /// 按时间升序排序（默认最新的在前）
    #[arg(long)]
    pub asc: bool,

    /// 批次之间不暂停询问
    #[arg(long)]
    pub non_interactive: bool,

    /// TOML 配置文件
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// 默认值 → TOML 文件 → 环境变量 → 命令行参数
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        let config_path = self
            .config
            .clone()
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from));
        let base = match config_path {
            Some(path) => Config::from_toml_file(path)?,
            None => Config::default(),
        };
        let config = self.apply(base.with_env_overrides()?);
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, mut config: Config) -> Config {
        if let Some(output) = &self.output {
            config.output_name = Some(output.clone());
        }
        if self.last.is_some() {
            config.limit = self.last;
        }
        if self.update {
            config.update = true;
        }
        if self.no_headless {
            config.headless = false;
        }
        if self.no_sort {
            config.sort_on_finalize = false;
        }
        if self.asc {
            config.sort_direction = SortDirection::Asc;
        }
        if self.non_interactive {
            config.interactive = Some(false);
        }
        if self.verbose {
            config.verbose_logging = true;
        }
        config
    }
}

/// 未显式指定时，标准输入是终端才进入交互模式
pub fn resolve_interactive(config: &Config) -> bool {
    config
        .interactive
        .unwrap_or_else(|| std::io::stdin().is_terminal())
}
