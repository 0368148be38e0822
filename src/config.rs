use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::models::{InsertPosition, SortDirection, SortKey};

/// 程序配置文件
///
/// 加载顺序：默认值 → TOML 文件 → 环境变量 → 命令行参数
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- 站点 ---
    pub base_url: String,
    /// 列表页最多点击"显示更多"的次数
    pub max_show_more_clicks: u32,
    /// 单场比赛最多尝试的统计节数（4 节 + 加时）
    pub max_stat_periods: u32,

    // --- 输出 ---
    pub output_path: String,
    pub backup_path: String,
    pub log_file: String,
    /// 输出文件名（不含扩展名），为空时按联赛名+时间生成
    pub output_name: Option<String>,

    // --- 超时（毫秒） ---
    pub timeout_fast_ms: u64,
    pub timeout_slow_ms: u64,
    /// 列表容器出现的最长等待
    pub listing_timeout_ms: u64,
    /// 统计页签出现的最长等待
    pub stats_timeout_ms: u64,

    // --- 会话与重试 ---
    /// 整次运行允许的会话重启次数
    pub max_global_restarts: u32,
    /// 建立单个会话的最大尝试次数
    pub session_max_attempts: u32,
    pub reconnection_delay_secs: u64,
    /// 单场比赛因会话崩溃可被重试的次数
    pub max_item_attempts: u32,

    // --- 限速 ---
    pub matches_per_batch: usize,
    pub batch_cooldown_secs: u64,
    pub pace_min_ms: u64,
    pub pace_max_ms: u64,
    /// 点击"显示更多"之后的随机等待
    pub expand_delay_min_ms: u64,
    pub expand_delay_max_ms: u64,
    /// 统计页加载后的随机等待
    pub settle_delay_min_ms: u64,
    pub settle_delay_max_ms: u64,
    /// None 表示根据终端自动判断
    pub interactive: Option<bool>,

    // --- 运行模式 ---
    /// 只在已有结果文件的基础上补充新比赛
    pub update: bool,
    /// 最多处理多少场（在去重之后）
    pub limit: Option<usize>,
    pub insert_position: InsertPosition,
    pub sort_on_finalize: bool,
    pub sort_key: SortKey,
    pub sort_direction: SortDirection,
    pub auto_shutdown_threshold: usize,

    // --- 浏览器 ---
    pub headless: bool,
    pub disable_images: bool,
    pub chrome_executable: Option<String>,
    /// 设置后附加到该调试端口上的现有浏览器，而不是自行启动
    pub browser_debug_port: Option<u16>,
    pub user_agents: Vec<String>,

    pub stat_categories: Vec<String>,
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://www.flashscore.com".to_string(),
            max_show_more_clicks: 30,
            max_stat_periods: 9,
            output_path: "output".to_string(),
            backup_path: "backups".to_string(),
            log_file: "log.txt".to_string(),
            output_name: None,
            timeout_fast_ms: 10_000,
            timeout_slow_ms: 30_000,
            listing_timeout_ms: 15_000,
            stats_timeout_ms: 5_000,
            max_global_restarts: 5,
            session_max_attempts: 3,
            reconnection_delay_secs: 30,
            max_item_attempts: 3,
            matches_per_batch: 250,
            batch_cooldown_secs: 300,
            pace_min_ms: 1_000,
            pace_max_ms: 3_000,
            expand_delay_min_ms: 2_000,
            expand_delay_max_ms: 4_000,
            settle_delay_min_ms: 1_000,
            settle_delay_max_ms: 2_000,
            interactive: None,
            update: false,
            limit: None,
            insert_position: InsertPosition::End,
            sort_on_finalize: true,
            sort_key: SortKey::Timestamp,
            sort_direction: SortDirection::Desc,
            auto_shutdown_threshold: 500,
            headless: true,
            disable_images: true,
            chrome_executable: None,
            browser_debug_port: None,
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            ],
            stat_categories: DEFAULT_STAT_CATEGORIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            verbose_logging: false,
        }
    }
}

/// 需要保留的统计项（按页面显示顺序）
pub const DEFAULT_STAT_CATEGORIES: [&str; 20] = [
    "Field Goals Attempted",
    "Field Goals Made",
    "Field Goals %",
    "2-Point Field G. Attempted",
    "2-Point Field Goals Made",
    "2-Point Field Goals %",
    "3-Point Field G. Attempted",
    "3-Point Field Goals Made",
    "3-Point Field Goals %",
    "Free Throws Attempted",
    "Free Throws Made",
    "Free Throws %",
    "Offensive Rebounds",
    "Defensive Rebounds",
    "Total Rebounds",
    "Assists",
    "Blocks",
    "Turnovers",
    "Steals",
    "Personal Fouls",
];

impl Config {
    /// 从 TOML 文件加载，缺省字段使用默认值
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::FileParse {
            path: path.display().to_string(),
            source,
        })
    }

    /// 默认值 + 环境变量
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// 用环境变量覆盖已有配置
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(v) = std::env::var("BASE_URL") {
            self.base_url = v;
        }
        if let Ok(v) = std::env::var("OUTPUT_PATH") {
            self.output_path = v;
        }
        if let Ok(v) = std::env::var("BACKUP_PATH") {
            self.backup_path = v;
        }
        if let Ok(v) = std::env::var("LOG_FILE") {
            self.log_file = v;
        }
        if let Ok(v) = std::env::var("CHROME_EXECUTABLE") {
            self.chrome_executable = Some(v);
        }
        if let Ok(v) = std::env::var("BROWSER_DEBUG_PORT") {
            let port = v.trim().parse().map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: "BROWSER_DEBUG_PORT".to_string(),
                value: v.clone(),
                expected_type: "u16".to_string(),
            })?;
            self.browser_debug_port = Some(port);
        }
        env_parse("MAX_SHOW_MORE_CLICKS", &mut self.max_show_more_clicks)?;
        env_parse("MAX_GLOBAL_RESTARTS", &mut self.max_global_restarts)?;
        env_parse("SESSION_MAX_ATTEMPTS", &mut self.session_max_attempts)?;
        env_parse("RECONNECTION_DELAY_SECS", &mut self.reconnection_delay_secs)?;
        env_parse("MAX_ITEM_ATTEMPTS", &mut self.max_item_attempts)?;
        env_parse("MATCHES_PER_BATCH", &mut self.matches_per_batch)?;
        env_parse("BATCH_COOLDOWN_SECS", &mut self.batch_cooldown_secs)?;
        env_parse("PACE_MIN_MS", &mut self.pace_min_ms)?;
        env_parse("PACE_MAX_MS", &mut self.pace_max_ms)?;
        env_parse("TIMEOUT_FAST_MS", &mut self.timeout_fast_ms)?;
        env_parse("TIMEOUT_SLOW_MS", &mut self.timeout_slow_ms)?;
        env_parse("LISTING_TIMEOUT_MS", &mut self.listing_timeout_ms)?;
        env_parse("HEADLESS", &mut self.headless)?;
        env_parse("VERBOSE_LOGGING", &mut self.verbose_logging)?;
        env_parse("AUTO_SHUTDOWN_THRESHOLD", &mut self.auto_shutdown_threshold)?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pace_min_ms > self.pace_max_ms {
            return Err(ConfigError::Invalid(format!(
                "pace_min_ms ({}) 大于 pace_max_ms ({})",
                self.pace_min_ms, self.pace_max_ms
            )));
        }
        if self.expand_delay_min_ms > self.expand_delay_max_ms
            || self.settle_delay_min_ms > self.settle_delay_max_ms
        {
            return Err(ConfigError::Invalid("随机等待的最小值大于最大值".into()));
        }
        if self.max_item_attempts == 0 {
            return Err(ConfigError::Invalid("max_item_attempts 不能为 0".into()));
        }
        if self.session_max_attempts == 0 {
            return Err(ConfigError::Invalid("session_max_attempts 不能为 0".into()));
        }
        if self.user_agents.is_empty() {
            return Err(ConfigError::Invalid("user_agents 不能为空".into()));
        }
        Ok(())
    }

    pub fn timeout_fast(&self) -> Duration {
        Duration::from_millis(self.timeout_fast_ms)
    }

    pub fn timeout_slow(&self) -> Duration {
        Duration::from_millis(self.timeout_slow_ms)
    }

    pub fn listing_timeout(&self) -> Duration {
        Duration::from_millis(self.listing_timeout_ms)
    }

    pub fn stats_timeout(&self) -> Duration {
        Duration::from_millis(self.stats_timeout_ms)
    }

    pub fn reconnection_delay(&self) -> Duration {
        Duration::from_secs(self.reconnection_delay_secs)
    }

    pub fn batch_cooldown(&self) -> Duration {
        Duration::from_secs(self.batch_cooldown_secs)
    }
}

fn env_parse<T: FromStr>(var_name: &str, target: &mut T) -> Result<(), ConfigError> {
    let Ok(value) = std::env::var(var_name) else {
        return Ok(());
    };
    *target = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value: value.clone(),
            expected_type: std::any::type_name::<T>().to_string(),
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.stat_categories.len(), 20);
        assert_eq!(config.timeout_fast(), Duration::from_secs(10));
    }

    #[test]
    fn rejects_inverted_pacing() {
        let config = Config {
            pace_min_ms: 5,
            pace_max_ms: 1,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn toml_fills_missing_fields_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hoop_scrape.toml");
        std::fs::write(
            &path,
            "matches_per_batch = 10\nsort_direction = \"asc\"\nupdate = true\n",
        )
        .unwrap();

        let config = Config::from_toml_file(&path).unwrap();
        assert_eq!(config.matches_per_batch, 10);
        assert_eq!(config.sort_direction, SortDirection::Asc);
        assert!(config.update);
        assert_eq!(config.max_global_restarts, 5);
    }

    #[test]
    fn malformed_toml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "matches_per_batch = \"many\"").unwrap();
        assert!(matches!(
            Config::from_toml_file(&path),
            Err(ConfigError::FileParse { .. })
        ));
    }
}
