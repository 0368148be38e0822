//! 比赛处理上下文
//!
//! 封装"我正在处理第几场比赛、第几次尝试"这一信息

use std::fmt::Display;

use crate::models::WorkItem;

/// 比赛处理上下文
#[derive(Debug, Clone)]
pub struct ItemCtx {
    pub item: WorkItem,

    /// 在本次队列中的位置（从1开始，仅用于日志显示）
    pub position: usize,

    /// 队列总数
    pub total: usize,

    /// 第几次尝试（会话重启后重试同一场比赛时递增）
    pub attempt: u32,
}

impl ItemCtx {
    pub fn new(item: WorkItem, position: usize, total: usize, attempt: u32) -> Self {
        Self {
            item,
            position,
            total,
            attempt,
        }
    }
}

impl Display for ItemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[比赛 {}/{} ID#{} 尝试#{}]",
            self.position, self.total, self.item.id, self.attempt
        )
    }
}
