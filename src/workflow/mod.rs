//! 流程层
//!
//! 定义"一场比赛"的完整处理流程

pub mod item_ctx;
pub mod item_processor;

pub use item_ctx::ItemCtx;
pub use item_processor::{ItemOutcome, ItemProcessor};
