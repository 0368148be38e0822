//! 浏览器启动与连接
//!
//! 只负责拿到一个可用的 `(Browser, Page)`，不关心页面内容

pub mod connection;
pub mod headless;

pub use connection::connect_to_browser_and_page;
pub use headless::launch_headless_browser;

use rand::seq::SliceRandom;

use crate::config::Config;

/// 启动浏览器所需的参数
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub disable_images: bool,
    pub chrome_executable: Option<String>,
    pub user_agent: Option<String>,
}

impl LaunchOptions {
    /// 从配置生成，每次调用都会重新随机选择 User-Agent
    pub fn from_config(config: &Config) -> Self {
        Self {
            headless: config.headless,
            disable_images: config.disable_images,
            chrome_executable: config.chrome_executable.clone(),
            user_agent: pick_user_agent(&config.user_agents),
        }
    }
}

/// 随机选择一个 User-Agent
pub fn pick_user_agent(user_agents: &[String]) -> Option<String> {
    user_agents.choose(&mut rand::thread_rng()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_from_configured_agents() {
        let agents = vec!["a".to_string(), "b".to_string()];
        let picked = pick_user_agent(&agents).unwrap();
        assert!(agents.contains(&picked));
        assert_eq!(pick_user_agent(&[]), None);
    }
}
