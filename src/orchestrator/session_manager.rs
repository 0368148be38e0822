//! 会话管理器 - 编排层
//!
//! 唯一持有远程会话的地方。负责：
//! - 按需创建会话，创建失败时按固定间隔重试
//! - 致命错误后释放旧会话、换一个新的
//! - 运行结束（无论成败）时释放会话

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{SessionError, SessionResult};
use crate::infrastructure::{RemoteSession, SessionFactory};

pub struct SessionManager {
    factory: Arc<dyn SessionFactory>,
    max_attempts: u32,
    retry_delay: Duration,
    session: Option<Box<dyn RemoteSession>>,
}

impl SessionManager {
    pub fn new(config: &Config, factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            factory,
            max_attempts: config.session_max_attempts.max(1),
            retry_delay: config.reconnection_delay(),
            session: None,
        }
    }

    /// 获取当前会话，没有时新建一个
    pub async fn acquire(&mut self) -> SessionResult<&dyn RemoteSession> {
        let session = match self.session.take() {
            Some(session) => session,
            None => self.create_with_retry().await?,
        };
        Ok(&**self.session.insert(session))
    }

    async fn create_with_retry(&self) -> SessionResult<Box<dyn RemoteSession>> {
        let mut last_error = String::new();
        for attempt in 1..=self.max_attempts {
            match self.factory.create().await {
                Ok(session) => {
                    info!("✓ 会话已建立 (第 {}/{} 次尝试)", attempt, self.max_attempts);
                    return Ok(session);
                }
                Err(e) => {
                    warn!(
                        "⚠️ 建立会话失败 (第 {}/{} 次尝试): {}",
                        attempt, self.max_attempts, e
                    );
                    last_error = e.to_string();
                    if attempt < self.max_attempts {
                        info!("{} 秒后重试...", self.retry_delay.as_secs());
                        sleep(self.retry_delay).await;
                    }
                }
            }
        }
        error!("❌ 建立会话失败，已放弃");
        Err(SessionError::Exhausted {
            attempts: self.max_attempts,
            last: last_error,
        })
    }

    /// 释放当前会话（没有会话时什么也不做）
    pub async fn release(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        if let Err(e) = session.close().await {
            warn!("关闭会话时出错（已忽略）: {}", e);
        }
    }

    /// 丢弃当前会话并建立一个新的
    pub async fn restart(&mut self) -> SessionResult<()> {
        info!("🔄 重启会话...");
        self.release().await;
        self.acquire().await.map(|_| ())
    }
}
