//! 比赛列表发现服务 - 业务能力层
//!
//! 打开联赛结果页，反复点击"显示更多"，再按文档顺序遍历
//! 阶段标题行和比赛行，产出 `WorkItem` 列表（默认最新的在前）。

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::SessionResult;
use crate::infrastructure::{RemoteElement, RemoteSession};
use crate::models::WorkItem;
use crate::services::rate_controller::random_delay;

const SHOW_MORE_WAIT: Duration = Duration::from_secs(2);

/// 列表页选择器
#[derive(Debug, Clone)]
pub struct ListingSelectors {
    /// 列表容器
    pub container: String,
    /// 标题行和比赛行（按文档顺序）
    pub rows: String,
    pub header_class: String,
    pub match_class: String,
    /// 标题行内的阶段名称
    pub header_stage: String,
    /// 比赛行内自带的阶段标签
    pub row_stage: String,
    /// 页面顶部的联赛名称
    pub league_heading: String,
    /// "显示更多"按钮，按顺序尝试
    pub show_more: Vec<String>,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            container: ".sportName.basketball".to_string(),
            rows: ".event__match, .event__title".to_string(),
            header_class: "event__title".to_string(),
            match_class: "event__match".to_string(),
            header_stage: "div.event__titleBox strong".to_string(),
            row_stage: ".event__round".to_string(),
            league_heading: ".heading__name".to_string(),
            show_more: vec![
                "a.event__more.event__more--static".to_string(),
                "a.wclButtonLink".to_string(),
            ],
        }
    }
}

/// 遍历列表时的"当前阶段"上下文
///
/// 比赛行自带标签 > 最近的阶段标题 > 联赛名称
#[derive(Debug, Clone)]
pub struct StageTracker {
    league: String,
    current_header: Option<String>,
}

impl StageTracker {
    pub fn new(league: impl Into<String>) -> Self {
        Self {
            league: league.into(),
            current_header: None,
        }
    }

    pub fn observe_header(&mut self, header: &str) {
        let header = header.trim();
        if !header.is_empty() {
            self.current_header = Some(header.to_string());
        }
    }

    pub fn compose(&self, row_label: Option<&str>) -> String {
        row_label
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(str::to_string)
            .or_else(|| self.current_header.clone())
            .unwrap_or_else(|| self.league.clone())
    }
}

/// 列表中一行读出来的内容
enum ListingRow {
    Header(String),
    Match { id: String, label: Option<String> },
    Skip,
}

/// 比赛列表发现服务
pub struct ListingDiscoverer {
    selectors: ListingSelectors,
    max_expansions: u32,
    open_timeout: Duration,
    container_timeout: Duration,
    expand_delay: (Duration, Duration),
}

impl ListingDiscoverer {
    pub fn new(config: &Config) -> Self {
        Self::with_selectors(config, ListingSelectors::default())
    }

    pub fn with_selectors(config: &Config, selectors: ListingSelectors) -> Self {
        Self {
            selectors,
            max_expansions: config.max_show_more_clicks,
            open_timeout: config.timeout_slow(),
            container_timeout: config.listing_timeout(),
            expand_delay: (
                Duration::from_millis(config.expand_delay_min_ms),
                Duration::from_millis(config.expand_delay_max_ms),
            ),
        }
    }

    /// 发现所有比赛
    ///
    /// 列表容器在超时内没有出现时返回空列表（不是错误）；
    /// 只有会话层面的错误会向上传播，单行读取失败只跳过该行。
    pub async fn discover(
        &self,
        session: &dyn RemoteSession,
        listing_url: &str,
    ) -> SessionResult<Vec<WorkItem>> {
        let results_url = normalize_listing_url(listing_url);
        info!("📋 正在获取比赛列表: {}", results_url);
        session.open(&results_url, self.open_timeout).await?;

        self.expand(session).await?;

        info!("等待比赛列表加载...");
        if !session
            .wait_for(&self.selectors.container, self.container_timeout)
            .await?
        {
            warn!("⚠️ 页面没有篮球比赛列表或加载超时");
            return Ok(Vec::new());
        }

        let league = match session.text_of(&self.selectors.league_heading).await? {
            Some(heading) if !heading.is_empty() => heading,
            _ => league_name_from_url(listing_url),
        };
        let mut tracker = StageTracker::new(league);

        let rows = session.find_all(&self.selectors.rows).await?;
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for (index, row) in rows.iter().enumerate() {
            match self.read_row(row.as_ref()).await {
                Ok(ListingRow::Header(stage)) => {
                    info!("阶段: {}", stage);
                    tracker.observe_header(&stage);
                }
                Ok(ListingRow::Match { id, label }) => {
                    if seen.insert(id.clone()) {
                        items.push(WorkItem::new(id, tracker.compose(label.as_deref())));
                    }
                }
                Ok(ListingRow::Skip) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!("⚠️ 第 {} 行读取失败，已跳过: {}", index + 1, e),
            }
        }

        info!("✓ 找到 {} 场比赛", items.len());
        Ok(items)
    }

    async fn read_row(&self, row: &dyn RemoteElement) -> SessionResult<ListingRow> {
        let classes = row.attribute("class").await?.unwrap_or_default();
        if has_class(&classes, &self.selectors.header_class) {
            return Ok(match row.child_text(&self.selectors.header_stage).await? {
                Some(stage) if !stage.is_empty() => ListingRow::Header(stage),
                _ => {
                    debug!("标题行没有阶段名称，沿用上一个阶段");
                    ListingRow::Skip
                }
            });
        }
        if !has_class(&classes, &self.selectors.match_class) {
            return Ok(ListingRow::Skip);
        }
        let Some(raw_id) = row.attribute("id").await? else {
            return Ok(ListingRow::Skip);
        };
        let id = clean_match_id(&raw_id);
        if id.is_empty() {
            return Ok(ListingRow::Skip);
        }
        let label = row.child_text(&self.selectors.row_stage).await?;
        Ok(ListingRow::Match { id, label })
    }

    /// 点击"显示更多"，直到按钮消失或达到上限
    async fn expand(&self, session: &dyn RemoteSession) -> SessionResult<()> {
        for click in 0..self.max_expansions {
            let mut clicked = false;
            for selector in &self.selectors.show_more {
                if session.wait_for(selector, SHOW_MORE_WAIT).await?
                    && session.click(selector).await?
                {
                    debug!("点击\"显示更多\" #{} ({})", click + 1, selector);
                    random_delay(self.expand_delay.0, self.expand_delay.1).await;
                    clicked = true;
                    break;
                }
            }
            if !clicked {
                info!("没有更多\"显示更多\"按钮，共展开 {} 次", click);
                return Ok(());
            }
        }
        info!("已达到展开上限 {} 次", self.max_expansions);
        Ok(())
    }
}

fn has_class(classes: &str, class_name: &str) -> bool {
    classes.split_whitespace().any(|c| c == class_name)
}

/// `g_3_AbCdEf12` → `AbCdEf12`
pub fn clean_match_id(raw: &str) -> String {
    raw.rsplit('_').next().unwrap_or_default().trim().to_string()
}

/// 去掉查询串和片段，统一为 `.../results`
pub fn normalize_listing_url(url: &str) -> String {
    let base = strip_query(url).trim_end_matches('/');
    if base.ends_with("/results") {
        base.to_string()
    } else {
        format!("{}/results", base)
    }
}

/// 由联赛 URL 生成文件名用的联赛名
///
/// `https://www.flashscore.com/basketball/usa/nba-2023-2024/` → `usa_nba_2023_2024`
pub fn league_name_from_url(url: &str) -> String {
    let clean = strip_query(url).trim_end_matches('/');
    let clean = clean.strip_suffix("/results").unwrap_or(clean);
    let parts: Vec<&str> = clean.split('/').collect();
    let name = if parts.len() >= 3 {
        format!("{}_{}", parts[parts.len() - 2], parts[parts.len() - 1])
    } else {
        parts.last().copied().unwrap_or_default().to_string()
    };
    if name.is_empty() {
        "flashscore_data".to_string()
    } else {
        name.replace('-', "_")
    }
}

fn strip_query(url: &str) -> &str {
    let end = url.find(|c: char| c == '?' || c == '#').unwrap_or(url.len());
    &url[..end]
}
