//! 批次与限速控制 - 业务能力层
//!
//! 两件事：
//! 1. 每场比赛之间随机等待一小段时间
//! 2. 每处理完一批（默认 250 场）后暂停，询问操作者是继续、冷却还是停止

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::Config;
use crate::utils::logging::log_batch_pause;

/// 在 `[min, max]` 之间随机休眠
pub async fn random_delay(min: Duration, max: Duration) {
    if max.is_zero() {
        return;
    }
    let (low, high) = if min <= max { (min, max) } else { (max, min) };
    let millis = rand::thread_rng().gen_range(low.as_millis()..=high.as_millis());
    sleep(Duration::from_millis(millis as u64)).await;
}

/// 操作者在批次暂停时的选择
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseChoice {
    /// 立即继续
    Continue,
    /// 冷却一段时间后继续
    Cooldown,
    /// 停止，剩余比赛不再处理
    Stop,
}

impl PauseChoice {
    /// `1`/回车 继续，`2` 冷却，`3`/`q` 停止；无法识别的输入按继续处理
    pub fn parse(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "2" | "c" | "cooldown" => PauseChoice::Cooldown,
            "3" | "q" | "quit" | "stop" => PauseChoice::Stop,
            _ => PauseChoice::Continue,
        }
    }
}

/// 批次结束后的决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchDecision {
    Continue,
    Stop,
}

/// 批次暂停时询问操作者
#[async_trait]
pub trait PausePrompt: Send + Sync {
    async fn ask(&self, processed: usize, remaining: usize) -> PauseChoice;
}

/// 从标准输入读取选择
///
/// 标准输入关闭（EOF）或读取失败时视为停止
pub struct StdinPrompt;

#[async_trait]
impl PausePrompt for StdinPrompt {
    async fn ask(&self, processed: usize, remaining: usize) -> PauseChoice {
        println!(
            "\n已处理 {} 场，剩余 {} 场。[1] 继续  [2] 冷却后继续  [3] 停止",
            processed, remaining
        );
        let line = tokio::task::spawn_blocking(|| {
            let mut buf = String::new();
            match std::io::stdin().read_line(&mut buf) {
                Ok(0) | Err(_) => None,
                Ok(_) => Some(buf),
            }
        })
        .await;

        match line {
            Ok(Some(input)) => PauseChoice::parse(&input),
            Ok(None) => {
                warn!("标准输入已关闭，按停止处理");
                PauseChoice::Stop
            }
            Err(e) => {
                warn!("读取输入失败: {}，按停止处理", e);
                PauseChoice::Stop
            }
        }
    }
}

/// 批次与限速控制器
pub struct RateController {
    batch_size: usize,
    pace: (Duration, Duration),
    cooldown: Duration,
    interactive: bool,
    prompt: Box<dyn PausePrompt>,
    processed_in_batch: usize,
    processed_total: usize,
}

impl RateController {
    pub fn new(config: &Config, interactive: bool) -> Self {
        Self::with_prompt(config, interactive, Box::new(StdinPrompt))
    }

    pub fn with_prompt(config: &Config, interactive: bool, prompt: Box<dyn PausePrompt>) -> Self {
        Self {
            batch_size: config.matches_per_batch,
            pace: (
                Duration::from_millis(config.pace_min_ms),
                Duration::from_millis(config.pace_max_ms),
            ),
            cooldown: config.batch_cooldown(),
            interactive,
            prompt,
            processed_in_batch: 0,
            processed_total: 0,
        }
    }

    /// 清零批次计数，每次运行开始时调用
    pub fn reset(&mut self) {
        self.processed_in_batch = 0;
        self.processed_total = 0;
    }

    /// 本批是否已满
    ///
    /// `batch_size` 为 0 表示不分批
    pub fn should_pause(items_processed_in_batch: usize, batch_size: usize) -> bool {
        batch_size > 0 && items_processed_in_batch > 0 && items_processed_in_batch % batch_size == 0
    }

    /// 两场比赛之间的随机等待
    pub async fn pace(&self) {
        random_delay(self.pace.0, self.pace.1).await;
    }

    /// 一场比赛处理结束（无论成败）后调用
    ///
    /// `remaining` 是队列中还没处理的数量
    pub async fn after_item(&mut self, remaining: usize) -> BatchDecision {
        self.processed_in_batch += 1;
        self.processed_total += 1;

        if !Self::should_pause(self.processed_in_batch, self.batch_size) || remaining == 0 {
            return BatchDecision::Continue;
        }
        self.processed_in_batch = 0;

        if !self.interactive {
            info!("非交互模式，跳过批次暂停");
            return BatchDecision::Continue;
        }

        log_batch_pause(self.processed_total, remaining);
        match self.prompt.ask(self.processed_total, remaining).await {
            PauseChoice::Continue => BatchDecision::Continue,
            PauseChoice::Cooldown => {
                info!("😴 冷却 {} 秒...", self.cooldown.as_secs());
                sleep(self.cooldown).await;
                info!("冷却结束，继续处理");
                BatchDecision::Continue
            }
            PauseChoice::Stop => {
                info!("🛑 用户选择停止，剩余 {} 场不再处理", remaining);
                BatchDecision::Stop
            }
        }
    }
}
