//! 基于 chromiumoxide 的远程会话实现
//!
//! `BrowserSession` 是唯一的 page owner

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, Page};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::browser::{self, LaunchOptions};
use crate::config::Config;
use crate::error::{SessionError, SessionResult};
use crate::infrastructure::session::{ElementHandle, RemoteElement, RemoteSession, SessionFactory};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// 浏览器会话
pub struct BrowserSession {
    browser: Option<Browser>,
    page: Page,
    handler_task: JoinHandle<()>,
    /// 是否由本程序启动（附加到现有浏览器时只关闭页面）
    owns_browser: bool,
}

impl BrowserSession {
    pub fn new(browser: Browser, page: Page, handler_task: JoinHandle<()>, owns_browser: bool) -> Self {
        Self {
            browser: Some(browser),
            page,
            handler_task,
            owns_browser,
        }
    }
}

/// 非致命错误视为"元素不存在"
fn absent_unless_fatal<T>(result: Result<T, CdpError>) -> SessionResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            let err = SessionError::from(e);
            if err.is_fatal() {
                Err(err)
            } else {
                Ok(None)
            }
        }
    }
}

fn trimmed(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string())
}

#[async_trait]
impl RemoteSession for BrowserSession {
    async fn open(&self, url: &str, timeout: Duration) -> SessionResult<()> {
        debug!("导航到: {}", url);
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(SessionError::timeout(format!("打开 {}", url))),
        }
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> SessionResult<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if absent_unless_fatal(self.page.find_element(selector).await)?.is_some() {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                debug!("等待元素超时: {}", selector);
                return Ok(false);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn find_all(&self, selector: &str) -> SessionResult<Vec<ElementHandle>> {
        let elements = absent_unless_fatal(self.page.find_elements(selector).await)?
            .unwrap_or_default();
        Ok(elements
            .into_iter()
            .map(|e| Box::new(ChromiumElement(e)) as ElementHandle)
            .collect())
    }

    async fn click(&self, selector: &str) -> SessionResult<bool> {
        let selector_json =
            serde_json::to_string(selector).map_err(|e| SessionError::Script(e.to_string()))?;
        let js_code = format!(
            r#"
            (() => {{
                const el = document.querySelector({});
                if (!el) return false;
                el.click();
                return true;
            }})()
            "#,
            selector_json
        );
        let result = self.page.evaluate(js_code).await?;
        result
            .into_value::<bool>()
            .map_err(|e| SessionError::Script(e.to_string()))
    }

    async fn text_of(&self, selector: &str) -> SessionResult<Option<String>> {
        let Some(element) = absent_unless_fatal(self.page.find_element(selector).await)? else {
            return Ok(None);
        };
        Ok(absent_unless_fatal(element.inner_text().await)?
            .flatten()
            .map(|t| t.trim().to_string()))
    }

    /// 先关闭浏览器（或附加模式下的页面），最后才停止事件处理任务
    async fn close(&mut self) -> SessionResult<()> {
        let Some(mut browser) = self.browser.take() else {
            self.handler_task.abort();
            return Ok(());
        };
        let result = if self.owns_browser {
            match browser.close().await {
                Ok(_) => {
                    if let Err(e) = browser.wait().await {
                        warn!("等待浏览器进程退出失败: {}", e);
                    }
                    Ok(())
                }
                Err(e) => Err(SessionError::from(e)),
            }
        } else {
            self.page.clone().close().await.map_err(SessionError::from)
        };
        self.handler_task.abort();
        if result.is_ok() {
            debug!("浏览器会话已释放");
        }
        result
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

struct ChromiumElement(Element);

#[async_trait]
impl RemoteElement for ChromiumElement {
    async fn attribute(&self, name: &str) -> SessionResult<Option<String>> {
        Ok(self.0.attribute(name).await?)
    }

    async fn child_text(&self, selector: &str) -> SessionResult<Option<String>> {
        let Some(child) = absent_unless_fatal(self.0.find_element(selector).await)? else {
            return Ok(None);
        };
        Ok(trimmed(child.inner_text().await?))
    }

    async fn child_texts(&self, selector: &str) -> SessionResult<Vec<String>> {
        let children = absent_unless_fatal(self.0.find_elements(selector).await)?
            .unwrap_or_default();
        let mut texts = Vec::with_capacity(children.len());
        for child in children {
            texts.push(trimmed(child.inner_text().await?).unwrap_or_default());
        }
        Ok(texts)
    }
}

/// 每次调用都启动（或连接）一个新的浏览器
pub struct ChromiumSessionFactory {
    config: Config,
}

impl ChromiumSessionFactory {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl SessionFactory for ChromiumSessionFactory {
    async fn create(&self) -> SessionResult<Box<dyn RemoteSession>> {
        let session = match self.config.browser_debug_port {
            Some(port) => {
                let (b, page, handler) = browser::connect_to_browser_and_page(port)
                    .await
                    .map_err(|e| SessionError::Launch(format!("{:#}", e)))?;
                BrowserSession::new(b, page, handler, false)
            }
            None => {
                let options = LaunchOptions::from_config(&self.config);
                let (b, page, handler) = browser::launch_headless_browser(&options)
                    .await
                    .map_err(|e| SessionError::Launch(format!("{:#}", e)))?;
                BrowserSession::new(b, page, handler, true)
            }
        };
        Ok(Box::new(session))
    }
}
