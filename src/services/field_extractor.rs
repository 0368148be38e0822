//! 字段提取服务 - 业务能力层
//!
//! `FieldExtractor` 把一个已加载的详情页变成扁平字段。
//! 处理流程只依赖这个 trait，站点相关的选择器都在 `BasketballExtractor` 里。

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use phf::phf_map;
use regex::Regex;
use serde_json::{json, Map, Value as JsonValue};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::SessionResult;
use crate::infrastructure::RemoteSession;
use crate::models::{Fields, WorkItem};
use crate::services::rate_controller::random_delay;

/// 缺失文本字段的占位值
pub const MISSING: &str = "N/A";

/// 统计页签名称 → 记录中的节次键
static PERIOD_KEYS: phf::Map<&'static str, &'static str> = phf_map! {
    "1st Quarter" => "Q1",
    "2nd Quarter" => "Q2",
    "3rd Quarter" => "Q3",
    "4th Quarter" => "Q4",
    "Overtime" => "OT",
};

/// 站点相关的字段提取
///
/// 除会话致命错误外不应失败：取不到的字段用占位值代替
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    /// 比赛详情页地址
    fn detail_url(&self, item: &WorkItem) -> String;

    /// 详情页加载完成的标志元素
    fn ready_selector(&self) -> &str;

    /// 从已加载的详情页提取主字段
    async fn extract(&self, session: &dyn RemoteSession, item: &WorkItem) -> SessionResult<Fields>;

    /// 尽力而为的二次提取字段名（失败时记录为空对象）
    fn secondary_fields(&self) -> &[&'static str] {
        &[]
    }

    async fn extract_secondary(
        &self,
        _name: &str,
        _session: &dyn RemoteSession,
        _item: &WorkItem,
        _primary: &Fields,
    ) -> SessionResult<JsonValue> {
        Ok(JsonValue::Null)
    }
}

/// 详情页选择器
#[derive(Debug, Clone)]
struct DetailSelectors {
    start_time: &'static str,
    home_team: &'static str,
    away_team: &'static str,
    home_score: &'static str,
    away_score: &'static str,
    period_template: &'static str,
    stats_row: &'static str,
    stats_category: &'static str,
    stats_value: &'static str,
    selected_tab: &'static str,
}

const DETAIL_SELECTORS: DetailSelectors = DetailSelectors {
    start_time: ".duelParticipant__startTime",
    home_team: ".duelParticipant__home .participant__participantName",
    away_team: ".duelParticipant__away .participant__participantName",
    home_score: ".detailScore__wrapper .detailScore__home",
    away_score: ".detailScore__wrapper .detailScore__away",
    period_template: ".smh__template.basketball",
    stats_row: "div[data-testid='wcl-statistics']",
    stats_category: "[data-testid='wcl-statistics-category']",
    stats_value: "[data-testid='wcl-statistics-value'] > strong",
    selected_tab: "button.wcl-tabSelected_T--kd",
};

/// 单节统计的提取结果
enum PeriodStats {
    /// 统计容器没有出现，后面的节次也不会有
    Missing,
    /// 页面存在但没有需要的统计项
    Empty,
    Found { key: String, value: JsonValue },
}

/// 篮球比赛提取器
pub struct BasketballExtractor {
    base_url: String,
    max_periods: u32,
    categories: Vec<String>,
    page_timeout: Duration,
    stats_timeout: Duration,
    settle_delay: (Duration, Duration),
    stat_key_re: Regex,
}

impl BasketballExtractor {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_periods: config.max_stat_periods,
            categories: config.stat_categories.clone(),
            page_timeout: config.timeout_slow(),
            stats_timeout: config.stats_timeout(),
            settle_delay: (
                Duration::from_millis(config.settle_delay_min_ms),
                Duration::from_millis(config.settle_delay_max_ms),
            ),
            stat_key_re: Regex::new(r"[^a-z0-9_]")?,
        })
    }

    /// `Field Goals %` → `field_goals_`
    pub fn stat_key(&self, category: &str) -> String {
        let lowered = category.to_lowercase().replace(' ', "_");
        self.stat_key_re.replace_all(&lowered, "").into_owned()
    }

    fn stats_url(&self, item: &WorkItem, period: u32) -> String {
        format!(
            "{}/match/{}/#/match-summary/match-statistics/{}",
            self.base_url, item.id, period
        )
    }

    async fn text_or_missing(session: &dyn RemoteSession, selector: &str) -> SessionResult<String> {
        Ok(session
            .text_of(selector)
            .await?
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| MISSING.to_string()))
    }

    /// 各节比分，遇到第一个缺失的节次即停止
    async fn quarter_scores(&self, session: &dyn RemoteSession) -> SessionResult<Fields> {
        let sel = &DETAIL_SELECTORS;
        let mut quarters = Fields::new();
        if !session.wait_for(sel.period_template, self.stats_timeout).await? {
            debug!("没有分节比分");
            return Ok(quarters);
        }
        for i in 1..=5 {
            let key = if i <= 4 { format!("Q{}", i) } else { "OT".to_string() };
            let home = session
                .text_of(&format!("{} .smh__home.smh__part--{}", sel.period_template, i))
                .await?;
            let away = session
                .text_of(&format!("{} .smh__away.smh__part--{}", sel.period_template, i))
                .await?;
            let (Some(home), Some(away)) = (home, away) else {
                break;
            };
            if is_number(&home) && is_number(&away) {
                quarters.insert(key, json!({ "home_score": home, "away_score": away }));
            }
        }
        Ok(quarters)
    }

    async fn period_stats(
        &self,
        session: &dyn RemoteSession,
        item: &WorkItem,
        period: u32,
        home_team: &str,
        away_team: &str,
    ) -> SessionResult<PeriodStats> {
        let sel = &DETAIL_SELECTORS;
        session
            .open(&self.stats_url(item, period), self.page_timeout)
            .await?;
        if !session.wait_for(sel.stats_row, self.stats_timeout).await? {
            return Ok(PeriodStats::Missing);
        }
        random_delay(self.settle_delay.0, self.settle_delay.1).await;

        let tab_name = session
            .text_of(sel.selected_tab)
            .await?
            .unwrap_or_else(|| format!("Period {}", period));
        let key = PERIOD_KEYS
            .get(tab_name.as_str())
            .map(|k| k.to_string())
            .unwrap_or_else(|| tab_name.clone());
        info!("提取统计: {} ({})", tab_name, key);

        let mut home_stats = Map::new();
        let mut away_stats = Map::new();
        for row in session.find_all(sel.stats_row).await? {
            let Some(category) = row.child_text(sel.stats_category).await? else {
                continue;
            };
            if !self.categories.iter().any(|c| *c == category) {
                continue;
            }
            let stat_key = self.stat_key(&category);
            let values = row.child_texts(sel.stats_value).await?;
            let value_at = |i: usize| values.get(i).cloned().unwrap_or_else(|| MISSING.to_string());
            home_stats.insert(stat_key.clone(), JsonValue::String(value_at(0)));
            away_stats.insert(stat_key, JsonValue::String(value_at(1)));
        }

        if home_stats.is_empty() || away_stats.is_empty() {
            return Ok(PeriodStats::Empty);
        }
        let mut teams = Map::new();
        teams.insert(home_team.to_string(), JsonValue::Object(home_stats));
        teams.insert(away_team.to_string(), JsonValue::Object(away_stats));
        Ok(PeriodStats::Found {
            key,
            value: JsonValue::Object(teams),
        })
    }

    /// 逐节打开统计页签
    ///
    /// 临时错误只结束本轮，已取得的节次保留
    async fn quarter_stats(
        &self,
        session: &dyn RemoteSession,
        item: &WorkItem,
        primary: &Fields,
    ) -> SessionResult<JsonValue> {
        let (home_team, away_team) = team_keys(primary);
        let mut all_stats = Map::new();
        for period in 1..=self.max_periods {
            match self
                .period_stats(session, item, period, &home_team, &away_team)
                .await
            {
                Ok(PeriodStats::Found { key, value }) => {
                    all_stats.insert(key, value);
                }
                Ok(PeriodStats::Empty) => continue,
                Ok(PeriodStats::Missing) => {
                    info!("第 {} 节没有统计数据，结束提取", period);
                    break;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("提取第 {} 节统计失败: {}", period, e);
                    break;
                }
            }
        }
        Ok(JsonValue::Object(all_stats))
    }
}

#[async_trait]
impl FieldExtractor for BasketballExtractor {
    fn detail_url(&self, item: &WorkItem) -> String {
        format!(
            "{}/match/{}/#/match-summary/match-summary",
            self.base_url, item.id
        )
    }

    fn ready_selector(&self) -> &str {
        DETAIL_SELECTORS.start_time
    }

    async fn extract(&self, session: &dyn RemoteSession, _item: &WorkItem) -> SessionResult<Fields> {
        let sel = &DETAIL_SELECTORS;
        let quarter_scores = self.quarter_scores(session).await?;

        let mut home_score = Self::text_or_missing(session, sel.home_score).await?;
        let mut away_score = Self::text_or_missing(session, sel.away_score).await?;
        if home_score == MISSING || away_score == MISSING {
            let (home_total, away_total) = sum_quarters(&quarter_scores);
            home_score = total_or_missing(home_total);
            away_score = total_or_missing(away_total);
        }

        let mut fields = Fields::new();
        fields.insert(
            "date".into(),
            Self::text_or_missing(session, sel.start_time).await?.into(),
        );
        fields.insert(
            "home_team".into(),
            Self::text_or_missing(session, sel.home_team).await?.into(),
        );
        fields.insert(
            "away_team".into(),
            Self::text_or_missing(session, sel.away_team).await?.into(),
        );
        fields.insert("home_score".into(), home_score.into());
        fields.insert("away_score".into(), away_score.into());
        fields.insert("quarter_scores".into(), JsonValue::Object(quarter_scores));
        Ok(fields)
    }

    fn secondary_fields(&self) -> &[&'static str] {
        &["quarter_stats"]
    }

    async fn extract_secondary(
        &self,
        name: &str,
        session: &dyn RemoteSession,
        item: &WorkItem,
        primary: &Fields,
    ) -> SessionResult<JsonValue> {
        match name {
            "quarter_stats" => self.quarter_stats(session, item, primary).await,
            _ => Ok(JsonValue::Null),
        }
    }
}

fn is_number(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

fn sum_quarters(quarters: &Fields) -> (u32, u32) {
    let score = |q: &JsonValue, side: &str| {
        q.get(side)
            .and_then(JsonValue::as_str)
            .and_then(|s| s.parse::<u32>().ok())
    };
    quarters.values().fold((0, 0), |(home, away), q| {
        match (score(q, "home_score"), score(q, "away_score")) {
            (Some(h), Some(a)) => (home.saturating_add(h), away.saturating_add(a)),
            _ => (home, away),
        }
    })
}

fn total_or_missing(total: u32) -> String {
    if total > 0 {
        total.to_string()
    } else {
        MISSING.to_string()
    }
}

/// 统计对象里的球队键；两队名称相同（通常都缺失）时退回 home/away
fn team_keys(primary: &Fields) -> (String, String) {
    let name = |key: &str| {
        primary
            .get(key)
            .and_then(JsonValue::as_str)
            .unwrap_or(MISSING)
            .to_string()
    };
    let (home, away) = (name("home_team"), name("away_team"));
    if home == away {
        ("home".to_string(), "away".to_string())
    } else {
        (home, away)
    }
}
