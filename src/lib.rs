//! # Hoop Scrape
//!
//! 可断点续抓的篮球比赛数据抓取程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（浏览器页面），只暴露远程会话能力
//! - `BrowserSession` - 唯一的 page owner，实现 `RemoteSession`
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `ListingDiscoverer` - 展开联赛列表，发现比赛
//! - `BasketballExtractor` - 详情页字段提取
//! - `ResultStore` - 结果文件的原子读写、排序、备份
//! - `RateController` - 限速与批次暂停
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一场比赛"的完整处理流程
//! - `ItemCtx` - 上下文封装（第几场、第几次尝试）
//! - `ItemProcessor` - 打开 → 提取 → 二次提取 → 落盘，并对错误分级
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 运行状态机，全局重启与统计
//! - `orchestrator/session_manager` - 会话的创建、重试、重启与释放
//!
//! ## 模块结构

pub mod app;
pub mod browser;
pub mod cli;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use config::Config;
pub use error::{ErrorKind, ItemError, OrchestratorError, SessionError, StoreError};
pub use infrastructure::{RemoteElement, RemoteSession, SessionFactory};
pub use models::{Record, RunState, RunSummary, WorkItem};
pub use orchestrator::{Orchestrator, SessionManager};
pub use services::{FieldExtractor, RateController, ResultStore};
pub use workflow::{ItemCtx, ItemOutcome, ItemProcessor};
