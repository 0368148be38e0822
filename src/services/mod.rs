//! 业务能力层
//!
//! 每个服务只描述"我能做什么"，不关心处理顺序和重试

pub mod field_extractor;
pub mod listing_discoverer;
pub mod rate_controller;
pub mod result_store;

pub use field_extractor::{BasketballExtractor, FieldExtractor};
pub use listing_discoverer::{ListingDiscoverer, ListingSelectors, StageTracker};
pub use rate_controller::{BatchDecision, PauseChoice, PausePrompt, RateController, StdinPrompt};
pub use result_store::ResultStore;
