//! 基础设施层
//!
//! 持有稀缺资源（浏览器页面），只向上暴露"远程会话"能力

pub mod browser_session;
pub mod session;

pub use browser_session::{BrowserSession, ChromiumSessionFactory};
pub use session::{ElementHandle, RemoteElement, RemoteSession, SessionFactory};
