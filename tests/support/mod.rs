//! 集成测试用的内存站点
//!
//! `FakeSite` 模拟联赛列表页和比赛详情页，可以为每场比赛预设
//! 依次出现的结果（成功 / 会话致命错误 / 详情页加载失败）。

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

use hoop_scrape::config::Config;
use hoop_scrape::error::{SessionError, SessionResult};
use hoop_scrape::infrastructure::{ElementHandle, RemoteElement, RemoteSession, SessionFactory};
use hoop_scrape::models::{Fields, WorkItem};
use hoop_scrape::orchestrator::Orchestrator;
use hoop_scrape::services::{FieldExtractor, PauseChoice, PausePrompt, RateController, ResultStore};

pub const LISTING_URL: &str = "https://www.flashscore.com/basketball/usa/nba/";
const READY_SELECTOR: &str = "#detail-ready";

/// 列表页中的一行
#[derive(Debug, Clone)]
pub enum Row {
    Header(String),
    Match { id: String, label: Option<String> },
    /// 读取属性时返回临时错误（元素已失效）
    Stale,
    /// 读取属性时连接断开
    Severed,
}

pub fn header(stage: &str) -> Row {
    Row::Header(stage.to_string())
}

pub fn game(id: &str) -> Row {
    Row::Match {
        id: id.to_string(),
        label: None,
    }
}

pub fn labelled(id: &str, label: &str) -> Row {
    Row::Match {
        id: id.to_string(),
        label: Some(label.to_string()),
    }
}

/// 打开详情页时的预设结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Ok,
    /// 传输层断开
    Fatal,
    /// 详情页不出现
    NotLoaded,
}

#[derive(Default)]
pub struct FakeSite {
    pub rows: Mutex<Vec<Row>>,
    pub league: Mutex<Option<String>>,
    pub container_missing: Mutex<bool>,
    /// 每次 open 都返回致命错误
    pub always_fatal: Mutex<bool>,
    /// 会话工厂总是失败
    pub factory_fails: Mutex<bool>,
    /// 还能点击几次"显示更多"
    pub show_more_left: AtomicUsize,
    pub steps: Mutex<HashMap<String, VecDeque<Step>>>,
    pub created: AtomicUsize,
    pub create_attempts: AtomicUsize,
    pub closed: AtomicUsize,
    pub detail_opens: AtomicUsize,
}

impl FakeSite {
    pub fn with_rows(rows: Vec<Row>) -> Arc<Self> {
        let site = Self::default();
        *site.rows.lock().unwrap() = rows;
        *site.league.lock().unwrap() = Some("NBA".to_string());
        Arc::new(site)
    }

    pub fn script(&self, id: &str, steps: &[Step]) {
        self.steps
            .lock()
            .unwrap()
            .insert(id.to_string(), steps.iter().copied().collect());
    }

    fn next_step(&self, id: &str) -> Step {
        self.steps
            .lock()
            .unwrap()
            .get_mut(id)
            .and_then(|q| q.pop_front())
            .unwrap_or(Step::Ok)
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct FakeSession {
    site: Arc<FakeSite>,
    current: Mutex<String>,
    detail_loaded: Mutex<bool>,
    closed: bool,
}

fn detail_id(url: &str) -> Option<&str> {
    url.split("/match/").nth(1).map(|rest| rest.trim_end_matches('/'))
}

#[async_trait]
impl RemoteSession for FakeSession {
    async fn open(&self, url: &str, _timeout: Duration) -> SessionResult<()> {
        if *self.site.always_fatal.lock().unwrap() {
            return Err(SessionError::Transport("websocket closed".into()));
        }
        if let Some(id) = detail_id(url) {
            self.site.detail_opens.fetch_add(1, Ordering::SeqCst);
            match self.site.next_step(id) {
                Step::Fatal => return Err(SessionError::Transport("websocket closed".into())),
                Step::NotLoaded => *self.detail_loaded.lock().unwrap() = false,
                Step::Ok => *self.detail_loaded.lock().unwrap() = true,
            }
        }
        *self.current.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn wait_for(&self, selector: &str, _timeout: Duration) -> SessionResult<bool> {
        Ok(match selector {
            READY_SELECTOR => *self.detail_loaded.lock().unwrap(),
            ".sportName.basketball" => !*self.site.container_missing.lock().unwrap(),
            s if s.contains("event__more") || s.contains("wclButtonLink") => {
                self.site.show_more_left.load(Ordering::SeqCst) > 0
            }
            _ => false,
        })
    }

    async fn find_all(&self, selector: &str) -> SessionResult<Vec<ElementHandle>> {
        if !selector.contains("event__match") {
            return Ok(Vec::new());
        }
        let rows = self.site.rows.lock().unwrap().clone();
        Ok(rows
            .into_iter()
            .map(|row| Box::new(FakeElement(row)) as ElementHandle)
            .collect())
    }

    async fn click(&self, _selector: &str) -> SessionResult<bool> {
        let left = self.site.show_more_left.load(Ordering::SeqCst);
        if left == 0 {
            return Ok(false);
        }
        self.site.show_more_left.store(left - 1, Ordering::SeqCst);
        Ok(true)
    }

    async fn text_of(&self, selector: &str) -> SessionResult<Option<String>> {
        if selector == ".heading__name" {
            return Ok(self.site.league.lock().unwrap().clone());
        }
        Ok(None)
    }

    async fn close(&mut self) -> SessionResult<()> {
        if !self.closed {
            self.closed = true;
            self.site.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

struct FakeElement(Row);

#[async_trait]
impl RemoteElement for FakeElement {
    async fn attribute(&self, name: &str) -> SessionResult<Option<String>> {
        match &self.0 {
            Row::Stale => return Err(SessionError::Script("stale element".into())),
            Row::Severed => return Err(SessionError::Transport("websocket closed".into())),
            _ => {}
        }
        Ok(match (&self.0, name) {
            (Row::Header(_), "class") => Some("event__title event__title--first".into()),
            (Row::Match { .. }, "class") => Some("event__match event__match--static".into()),
            (Row::Match { id, .. }, "id") => Some(format!("g_3_{}", id)),
            _ => None,
        })
    }

    async fn child_text(&self, selector: &str) -> SessionResult<Option<String>> {
        Ok(match (&self.0, selector) {
            (Row::Header(stage), "div.event__titleBox strong") => Some(stage.clone()),
            (Row::Match { label, .. }, ".event__round") => label.clone(),
            _ => None,
        })
    }

    async fn child_texts(&self, _selector: &str) -> SessionResult<Vec<String>> {
        Ok(Vec::new())
    }
}

pub struct FakeFactory {
    pub site: Arc<FakeSite>,
}

#[async_trait]
impl SessionFactory for FakeFactory {
    async fn create(&self) -> SessionResult<Box<dyn RemoteSession>> {
        self.site.create_attempts.fetch_add(1, Ordering::SeqCst);
        if *self.site.factory_fails.lock().unwrap() {
            return Err(SessionError::Launch("chrome not found".into()));
        }
        self.site.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            site: self.site.clone(),
            current: Mutex::new(String::new()),
            detail_loaded: Mutex::new(false),
            closed: false,
        }))
    }
}

/// 提取固定字段；`secondary_fails` 时二次提取返回临时错误
pub struct FakeExtractor {
    pub secondary_fails: bool,
}

#[async_trait]
impl FieldExtractor for FakeExtractor {
    fn detail_url(&self, item: &WorkItem) -> String {
        format!("https://fake.test/match/{}", item.id)
    }

    fn ready_selector(&self) -> &str {
        READY_SELECTOR
    }

    async fn extract(&self, _session: &dyn RemoteSession, item: &WorkItem) -> SessionResult<Fields> {
        let mut fields = Fields::new();
        fields.insert("home_team".into(), format!("home-{}", item.id).into());
        fields.insert("away_team".into(), "away".into());
        Ok(fields)
    }

    fn secondary_fields(&self) -> &[&'static str] {
        &["quarter_stats"]
    }

    async fn extract_secondary(
        &self,
        _name: &str,
        _session: &dyn RemoteSession,
        _item: &WorkItem,
        _primary: &Fields,
    ) -> SessionResult<JsonValue> {
        if self.secondary_fails {
            return Err(SessionError::element_missing("button.wcl-tabSelected_T--kd"));
        }
        Ok(json!({ "Q1": { "home": {}, "away": {} } }))
    }
}

/// 固定回答的批次暂停提示
pub struct FixedPrompt(pub PauseChoice);

#[async_trait]
impl PausePrompt for FixedPrompt {
    async fn ask(&self, _processed: usize, _remaining: usize) -> PauseChoice {
        self.0
    }
}

/// 所有等待都为 0 的配置
pub fn test_config(dir: &Path) -> Config {
    Config {
        output_path: dir.join("output").to_string_lossy().to_string(),
        backup_path: dir.join("backups").to_string_lossy().to_string(),
        log_file: dir.join("log.txt").to_string_lossy().to_string(),
        max_show_more_clicks: 5,
        max_global_restarts: 5,
        session_max_attempts: 2,
        reconnection_delay_secs: 0,
        max_item_attempts: 3,
        batch_cooldown_secs: 0,
        pace_min_ms: 0,
        pace_max_ms: 0,
        expand_delay_min_ms: 0,
        expand_delay_max_ms: 0,
        settle_delay_min_ms: 0,
        settle_delay_max_ms: 0,
        interactive: Some(false),
        ..Config::default()
    }
}

pub fn store_path(dir: &Path) -> std::path::PathBuf {
    dir.join("output").join("usa_nba.json")
}

pub fn orchestrator(config: &Config, site: &Arc<FakeSite>, prompt: Option<PauseChoice>) -> Orchestrator {
    orchestrator_with(config, site, prompt, false)
}

pub fn orchestrator_with(
    config: &Config,
    site: &Arc<FakeSite>,
    prompt: Option<PauseChoice>,
    secondary_fails: bool,
) -> Orchestrator {
    let factory = Arc::new(FakeFactory { site: site.clone() });
    let extractor = Arc::new(FakeExtractor { secondary_fails });
    let store = ResultStore::new(Path::new(&config.output_path).join("usa_nba.json"));
    let rate = match prompt {
        Some(choice) => RateController::with_prompt(config, true, Box::new(FixedPrompt(choice))),
        None => RateController::with_prompt(config, false, Box::new(FixedPrompt(PauseChoice::Continue))),
    };
    Orchestrator::new(config, factory, extractor, store, rate)
}
