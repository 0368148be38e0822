//! 批量比赛处理器 - 编排层
//!
//! ## 职责
//!
//! 一次运行的顶层状态机：
//!
//! `INIT → DISCOVER → FILTER → PROCESS_LOOP → FINALIZE → DONE | ABORTED`
//!
//! 1. **DISCOVER**：取得第一个会话，发现比赛列表（一次运行只发现一次）
//! 2. **FILTER**：去掉结果文件中已存在的比赛，应用数量限制
//! 3. **PROCESS_LOOP**：按发现顺序逐场处理；会话致命错误时重启会话，
//!    从同一场未完成的比赛继续
//! 4. **FINALIZE**：整体排序，汇总统计
//!
//! ## 设计特点
//!
//! - **资源所有者**：通过 `SessionManager` 唯一持有会话，任何退出路径都会释放
//! - **向下委托**：单场比赛的细节交给 `ItemProcessor`
//! - **计数器显式化**：重启次数、尝试次数都是本次运行的局部状态

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{ErrorKind, ItemError, OrchestratorError};
use crate::infrastructure::SessionFactory;
use crate::models::{RunState, RunSummary, SortDirection, SortKey, WorkItem};
use crate::orchestrator::session_manager::SessionManager;
use crate::services::listing_discoverer::league_name_from_url;
use crate::services::{BatchDecision, FieldExtractor, ListingDiscoverer, RateController, ResultStore};
use crate::utils::logging::{log_items_filtered, log_progress};
use crate::workflow::{ItemCtx, ItemOutcome, ItemProcessor};

/// 运行模式相关的设置
#[derive(Debug, Clone)]
struct RunSettings {
    update: bool,
    limit: Option<usize>,
    backup_path: String,
    max_global_restarts: u32,
    max_item_attempts: u32,
    sort_on_finalize: bool,
    sort_key: SortKey,
    sort_direction: SortDirection,
    auto_shutdown_threshold: usize,
}

impl RunSettings {
    fn from_config(config: &Config) -> Self {
        Self {
            update: config.update,
            limit: config.limit,
            backup_path: config.backup_path.clone(),
            max_global_restarts: config.max_global_restarts,
            max_item_attempts: config.max_item_attempts.max(1),
            sort_on_finalize: config.sort_on_finalize,
            sort_key: config.sort_key,
            sort_direction: config.sort_direction,
            auto_shutdown_threshold: config.auto_shutdown_threshold,
        }
    }
}

/// 编排器
pub struct Orchestrator {
    settings: RunSettings,
    sessions: SessionManager,
    discoverer: ListingDiscoverer,
    processor: ItemProcessor,
    store: ResultStore,
    rate: RateController,
}

impl Orchestrator {
    pub fn new(
        config: &Config,
        factory: Arc<dyn SessionFactory>,
        extractor: Arc<dyn FieldExtractor>,
        store: ResultStore,
        rate: RateController,
    ) -> Self {
        Self {
            settings: RunSettings::from_config(config),
            sessions: SessionManager::new(config, factory),
            discoverer: ListingDiscoverer::new(config),
            processor: ItemProcessor::new(config, extractor),
            store,
            rate,
        }
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// 执行一次完整运行
    ///
    /// 返回 `Err` 只可能发生在处理循环之前（结果文件无法读取或备份）。
    /// 无论结果如何，会话都会在返回前释放。
    pub async fn run(&mut self, listing_url: &str) -> Result<RunSummary, OrchestratorError> {
        let mut summary = RunSummary::default();
        let result = self.drive(listing_url, &mut summary).await;
        self.sessions.release().await;

        match result {
            Ok(()) => {
                info!("🏁 运行结束，状态: {}", summary.state);
                Ok(summary)
            }
            Err(e) => {
                error!("❌ 运行在 {} 阶段终止: {}", summary.state, e);
                Err(e)
            }
        }
    }

    async fn drive(
        &mut self,
        listing_url: &str,
        summary: &mut RunSummary,
    ) -> Result<(), OrchestratorError> {
        self.rate.reset();

        // ========== DISCOVER ==========
        summary.state = RunState::Discover;
        let Some(items) = self.discover(listing_url, summary).await else {
            return Ok(());
        };
        summary.discovered = items.len();

        // ========== FILTER ==========
        summary.state = RunState::Filter;
        let queue = self.filter(items, listing_url, summary)?;

        // ========== PROCESS_LOOP ==========
        summary.state = RunState::ProcessLoop;
        if !self.process_loop(&queue, summary).await {
            return Ok(());
        }

        // ========== FINALIZE ==========
        summary.state = RunState::Finalize;
        self.finalize(summary);
        summary.state = RunState::Done;
        Ok(())
    }

    /// 发现比赛列表；会话致命错误按全局重启次数重试
    ///
    /// 重启次数用尽时返回 `None`（状态已置为 ABORTED）
    async fn discover(&mut self, listing_url: &str, summary: &mut RunSummary) -> Option<Vec<WorkItem>> {
        loop {
            let attempt = match self.sessions.acquire().await {
                Ok(session) => self.discoverer.discover(session, listing_url).await,
                Err(e) => Err(e),
            };
            match attempt {
                Ok(items) => return Some(items),
                Err(e) if e.is_fatal() => {
                    error!("💥 发现比赛列表时会话失效: {}", e);
                    if !self.recover(summary).await {
                        return None;
                    }
                }
                Err(e) => {
                    warn!("⚠️ 比赛列表读取失败，按空列表处理: {}", e);
                    return Some(Vec::new());
                }
            }
        }
    }

    fn filter(
        &self,
        items: Vec<WorkItem>,
        listing_url: &str,
        summary: &mut RunSummary,
    ) -> Result<Vec<WorkItem>, OrchestratorError> {
        let known: HashSet<String> = if self.settings.update {
            self.store.load_ids()?
        } else {
            HashSet::new()
        };

        let (present, mut queue): (Vec<_>, Vec<_>) =
            items.into_iter().partition(|item| known.contains(&item.id));
        if let Some(limit) = self.settings.limit {
            queue.truncate(limit);
        }
        summary.already_present = present.len();
        summary.queued = queue.len();
        log_items_filtered(summary.discovered, summary.already_present, summary.queued);

        if !self.settings.update && !queue.is_empty() {
            let league = league_name_from_url(listing_url);
            self.store.backup(&self.settings.backup_path, &league)?;
            self.store.reset()?;
        }
        Ok(queue)
    }

    /// 逐场处理
    ///
    /// 返回 `false` 表示重启次数用尽、运行已中止
    async fn process_loop(&mut self, queue: &[WorkItem], summary: &mut RunSummary) -> bool {
        let total = queue.len();
        let started = Instant::now();
        let mut index = 0;
        let mut attempt: u32 = 1;

        while index < total {
            let ctx = ItemCtx::new(queue[index].clone(), index + 1, total, attempt);
            log_progress(index + 1, total, &ctx.item.id, eta(started.elapsed(), index, total));

            let outcome = match self.sessions.acquire().await {
                Ok(session) => self.processor.process(session, &ctx, &self.store).await,
                Err(e) => Err(ItemError::from(e)),
            };

            match outcome {
                Ok(ItemOutcome::Saved) => summary.succeeded += 1,
                Ok(ItemOutcome::Unpersisted) => summary.unpersisted += 1,
                Err(e) if e.kind() == ErrorKind::SessionFatal => {
                    error!("{} 💥 会话致命错误: {}", ctx, e);
                    let exhausted = attempt >= self.settings.max_item_attempts;
                    if exhausted {
                        error!(
                            "{} ❌ 已尝试 {} 次，记为失败",
                            ctx, self.settings.max_item_attempts
                        );
                        summary.failed += 1;
                        summary.failed_ids.push(ctx.item.id.clone());
                    }
                    if !self.recover(summary).await {
                        return false;
                    }
                    if !exhausted {
                        attempt += 1;
                        continue;
                    }
                }
                Err(e) => {
                    warn!("{} ⚠️ 处理失败，跳过 ({}): {}", ctx, ctx.item.stage, e);
                    summary.failed += 1;
                    summary.failed_ids.push(ctx.item.id.clone());
                }
            }

            index += 1;
            attempt = 1;
            let remaining = total - index;
            if remaining == 0 {
                break;
            }
            if self.rate.after_item(remaining).await == BatchDecision::Stop {
                summary.stopped_by_user = remaining;
                break;
            }
            self.rate.pace().await;
        }
        true
    }

    /// 全局重启：释放旧会话、建立新会话
    ///
    /// 重启次数达到上限时返回 `false` 并把状态置为 ABORTED
    async fn recover(&mut self, summary: &mut RunSummary) -> bool {
        loop {
            if summary.global_restarts >= self.settings.max_global_restarts {
                error!(
                    "🛑 全局重启次数已达上限 ({})，中止运行",
                    self.settings.max_global_restarts
                );
                summary.state = RunState::Aborted;
                return false;
            }
            summary.global_restarts += 1;
            warn!(
                "🔄 全局重启 {}/{}",
                summary.global_restarts, self.settings.max_global_restarts
            );
            match self.sessions.restart().await {
                Ok(()) => return true,
                Err(e) => error!("重启会话失败: {}", e),
            }
        }
    }

    fn finalize(&self, summary: &mut RunSummary) {
        if self.settings.sort_on_finalize {
            summary.sorted = self
                .store
                .sort(self.settings.sort_key, self.settings.sort_direction);
        }

        let threshold = self.settings.auto_shutdown_threshold;
        summary.shutdown_suggested = threshold > 0 && summary.processed() >= threshold;
        if summary.shutdown_suggested {
            warn!(
                "💤 本次已处理 {} 场（阈值 {}），建议关机休息",
                summary.processed(),
                threshold
            );
        }
    }
}

/// 按已完成比赛的平均耗时估算剩余时间
fn eta(elapsed: Duration, finished: usize, total: usize) -> Option<Duration> {
    if finished == 0 || finished >= total {
        return None;
    }
    let per_item = elapsed / finished as u32;
    Some(per_item * (total - finished) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eta_uses_mean_time_per_item() {
        assert_eq!(eta(Duration::from_secs(10), 0, 5), None);
        assert_eq!(
            eta(Duration::from_secs(10), 2, 5),
            Some(Duration::from_secs(15))
        );
        assert_eq!(eta(Duration::from_secs(10), 5, 5), None);
    }
}
