//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责一次运行的流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量比赛处理器
//! - 状态机：发现 → 过滤 → 处理循环 → 收尾
//! - 全局重启计数、单场尝试计数
//! - 批次暂停与限速（委托 `RateController`）
//! - 输出运行统计（`RunSummary`）
//!
//! ### `session_manager` - 会话管理器
//! - 唯一持有远程会话
//! - 创建失败时固定间隔重试
//! - 重启、释放
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<WorkItem>)
//!     ↓
//! workflow::ItemProcessor (处理单场比赛)
//!     ↓
//! services (能力层：discover / extract / store / rate)
//!     ↓
//! infrastructure (基础设施：RemoteSession)
//! ```

pub mod batch_processor;
pub mod session_manager;

// 重新导出主要类型
pub use batch_processor::Orchestrator;
pub use session_manager::SessionManager;
