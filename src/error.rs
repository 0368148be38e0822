//! 错误类型
//!
//! 两级错误分类是整个流程的核心：
//! - `ErrorKind::SessionFatal`：浏览器会话本身已不可用，只能整体重启
//! - `ErrorKind::ItemTransient`：只是这一场比赛有问题，跳过即可
//!
//! 调用方只根据 `kind()` 分支，不解析错误文本。

use chromiumoxide::error::CdpError;
use thiserror::Error;

/// 错误级别标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 会话级致命错误，需要重建会话
    SessionFatal,
    /// 单条目临时错误，记录失败后继续
    ItemTransient,
}

/// 远程会话错误
#[derive(Debug, Error)]
pub enum SessionError {
    /// 传输层错误（WebSocket 断开、通道关闭、无响应）
    #[error("会话传输错误: {0}")]
    Transport(String),
    /// 启动浏览器失败
    #[error("启动浏览器失败: {0}")]
    Launch(String),
    /// 操作超时
    #[error("操作超时: {operation}")]
    Timeout { operation: String },
    /// 元素不存在
    #[error("元素不存在: {selector}")]
    ElementMissing { selector: String },
    /// 页面脚本或协议层返回错误
    #[error("页面操作失败: {0}")]
    Script(String),
    /// 多次尝试后仍无法建立会话
    #[error("建立会话失败，已尝试 {attempts} 次: {last}")]
    Exhausted { attempts: u32, last: String },
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Transport(_) | SessionError::Launch(_) | SessionError::Exhausted { .. } => {
                ErrorKind::SessionFatal
            }
            SessionError::Timeout { .. }
            | SessionError::ElementMissing { .. }
            | SessionError::Script(_) => ErrorKind::ItemTransient,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::SessionFatal
    }

    pub fn element_missing(selector: impl Into<String>) -> Self {
        SessionError::ElementMissing {
            selector: selector.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        SessionError::Timeout {
            operation: operation.into(),
        }
    }
}

impl From<CdpError> for SessionError {
    fn from(err: CdpError) -> Self {
        match err {
            CdpError::Ws(_) | CdpError::Io(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
                SessionError::Transport(err.to_string())
            }
            CdpError::NotFound => SessionError::ElementMissing {
                selector: String::new(),
            },
            CdpError::Timeout => SessionError::Timeout {
                operation: "cdp".to_string(),
            },
            other => SessionError::Script(other.to_string()),
        }
    }
}

/// 结果文件错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("读取结果文件失败 ({path}): {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("写入结果文件失败 ({path}): {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("结果文件格式错误 ({path}): {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("创建备份失败 ({path}): {source}")]
    Backup {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 单场比赛处理错误
#[derive(Debug, Error)]
pub enum ItemError {
    #[error(transparent)]
    Session(#[from] SessionError),
    /// 详情页未在超时时间内加载
    #[error("详情页未加载: {url}")]
    DetailNotLoaded { url: String },
    /// 字段提取失败
    #[error("字段提取失败: {0}")]
    Extraction(String),
}

impl ItemError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ItemError::Session(e) => e.kind(),
            ItemError::DetailNotLoaded { .. } | ItemError::Extraction(_) => {
                ErrorKind::ItemTransient
            }
        }
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    #[error("读取配置文件失败 ({path}): {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML解析失败 ({path}): {source}")]
    FileParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("配置无效: {0}")]
    Invalid(String),
}

/// 使整次运行提前结束的错误（只发生在处理循环之外）
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type SessionResult<T> = Result<T, SessionError>;
pub type StoreResult<T> = Result<T, StoreError>;
