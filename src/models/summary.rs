use std::fmt::Display;

/// 编排器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Discover,
    Filter,
    ProcessLoop,
    Finalize,
    Done,
    Aborted,
}

impl Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::Init => "INIT",
            RunState::Discover => "DISCOVER",
            RunState::Filter => "FILTER",
            RunState::ProcessLoop => "PROCESS_LOOP",
            RunState::Finalize => "FINALIZE",
            RunState::Done => "DONE",
            RunState::Aborted => "ABORTED",
        };
        f.write_str(name)
    }
}

/// 一次运行的统计
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub state: RunState,
    /// 列表页发现的比赛数
    pub discovered: usize,
    /// 结果文件中已存在、被过滤掉的数量
    pub already_present: usize,
    /// 过滤（和数量限制）后进入处理循环的数量
    pub queued: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// 提取成功但落盘失败
    pub unpersisted: usize,
    /// 用户在批次暂停时选择停止，未处理的数量
    pub stopped_by_user: usize,
    pub global_restarts: u32,
    pub sorted: bool,
    pub shutdown_suggested: bool,
    pub failed_ids: Vec<String>,
}

impl Default for RunSummary {
    fn default() -> Self {
        Self {
            state: RunState::Init,
            discovered: 0,
            already_present: 0,
            queued: 0,
            succeeded: 0,
            failed: 0,
            unpersisted: 0,
            stopped_by_user: 0,
            global_restarts: 0,
            sorted: false,
            shutdown_suggested: false,
            failed_ids: Vec::new(),
        }
    }
}

impl RunSummary {
    /// 实际尝试过的比赛数
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed + self.unpersisted
    }

    pub fn is_aborted(&self) -> bool {
        self.state == RunState::Aborted
    }
}
