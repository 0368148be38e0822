use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// 列表页发现的一场比赛
///
/// 只在一次运行内存在，不会单独落盘
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    /// 远程站点分配的比赛ID（唯一、稳定）
    pub id: String,
    /// 阶段描述（如 "Playoffs"），可重复
    pub stage: String,
}

impl WorkItem {
    pub fn new(id: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            stage: stage.into(),
        }
    }
}

impl Display for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.id, self.stage)
    }
}
