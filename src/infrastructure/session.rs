//! 远程会话能力
//!
//! 上层（发现、提取、处理流程）只依赖这里的 trait，
//! 测试中可以用内存实现替换真实浏览器。

use std::time::Duration;

use async_trait::async_trait;

use crate::error::SessionResult;

/// 页面元素句柄
pub type ElementHandle = Box<dyn RemoteElement>;

/// 一个有状态的远程浏览会话
///
/// 错误要么是传输层致命错误，要么是元素缺失之类的临时错误，
/// 由 `SessionError::kind()` 区分。
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// 导航到指定 URL
    async fn open(&self, url: &str, timeout: Duration) -> SessionResult<()>;

    /// 等待选择器出现，超时返回 `Ok(false)`
    async fn wait_for(&self, selector: &str, timeout: Duration) -> SessionResult<bool>;

    /// 按文档顺序返回所有匹配元素
    async fn find_all(&self, selector: &str) -> SessionResult<Vec<ElementHandle>>;

    /// 点击第一个匹配元素，不存在时返回 `Ok(false)`
    async fn click(&self, selector: &str) -> SessionResult<bool>;

    /// 第一个匹配元素的文本（已 trim），不存在时返回 `None`
    async fn text_of(&self, selector: &str) -> SessionResult<Option<String>>;

    /// 释放底层资源，之后不得再使用该会话
    async fn close(&mut self) -> SessionResult<()>;
}

/// 页面中的单个元素
#[async_trait]
pub trait RemoteElement: Send + Sync {
    async fn attribute(&self, name: &str) -> SessionResult<Option<String>>;

    /// 第一个匹配子元素的文本（已 trim）
    async fn child_text(&self, selector: &str) -> SessionResult<Option<String>>;

    /// 所有匹配子元素的文本（已 trim）
    async fn child_texts(&self, selector: &str) -> SessionResult<Vec<String>>;
}

/// 会话工厂，每次调用都创建一个全新的会话
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create(&self) -> SessionResult<Box<dyn RemoteSession>>;
}
