//! Chromium session over the DevTools protocol, using chromiumoxide.
//!
//! The browser is never launched here: the user starts it with
//! `--remote-debugging-port` and logs in, and we attach to it so saves land
//! in their account.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

use saved_places::{ChannelError, ClickResult, ControlState, ImportError, ImportResult, UiChannel};

use super::{check_socket, Connector};
use crate::config::Endpoint;

/// Attaches to the browser behind the configured endpoint.
pub struct ChromiumConnector {
    pub probe_timeout: Duration,
    pub navigation_timeout: Duration,
}

#[async_trait]
impl Connector for ChromiumConnector {
    async fn connect(&self, endpoint: &Endpoint) -> ImportResult<Box<dyn UiChannel>> {
        if !check_socket(&endpoint.host, endpoint.port, self.probe_timeout).await {
            return Err(ImportError::ChannelUnavailable {
                host: endpoint.host.clone(),
                port: endpoint.port,
            });
        }
        let channel = ChromiumChannel::attach(endpoint, self.navigation_timeout).await?;
        Ok(Box::new(channel))
    }
}

/// One tab in the user's browser.
pub struct ChromiumChannel {
    _browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    navigation_timeout: Duration,
}

impl ChromiumChannel {
    /// Connect to the running browser and open a fresh tab in it.
    pub async fn attach(endpoint: &Endpoint, navigation_timeout: Duration) -> Result<Self, ChannelError> {
        let url = endpoint.http_url();
        let (browser, mut handler) = Browser::connect(url.clone())
            .await
            .map_err(|e| ChannelError::Command(format!("failed to attach to {url}: {e}")))?;

        // Spawn the handler task
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("devtools handler: {e}");
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ChannelError::Command(format!("failed to open a tab: {e}")))?;
        tracing::info!("attached to browser at {url}");

        Ok(Self {
            _browser: browser,
            page,
            handler,
            navigation_timeout,
        })
    }
}

impl Drop for ChromiumChannel {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Errors that mean "the element is not (or no longer) there".
fn is_stale(e: &CdpError) -> bool {
    matches!(
        e,
        CdpError::NotFound | CdpError::Chrome(_) | CdpError::JavascriptException(_)
    )
}

fn control_script(selector: &str) -> String {
    let selector = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        r#"(() => {{
            const el = document.querySelector({selector});
            if (!el) return JSON.stringify(null);
            const rect = el.getBoundingClientRect();
            const style = window.getComputedStyle(el);
            const displayed = rect.width > 0 && rect.height > 0
                && style.visibility !== "hidden" && style.display !== "none";
            return JSON.stringify({{ text: el.innerText || "", displayed }});
        }})()"#
    )
}

#[async_trait]
impl UiChannel for ChromiumChannel {
    async fn navigate(&mut self, url: &str) -> Result<(), ChannelError> {
        let result = tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await;
        match result {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(ChannelError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(ChannelError::Navigation {
                url: url.to_string(),
                reason: format!("timed out after {:?}", self.navigation_timeout),
            }),
        }
    }

    async fn find_control(&mut self, selector: &str) -> Result<Option<ControlState>, ChannelError> {
        let result = match self.page.evaluate(control_script(selector)).await {
            Ok(result) => result,
            // The page may be between documents while it settles.
            Err(e) if is_stale(&e) => {
                tracing::trace!("control lookup for '{selector}' failed: {e}");
                return Ok(None);
            }
            Err(e) => return Err(ChannelError::Command(format!("control lookup failed: {e}"))),
        };
        let json: String = result
            .into_value()
            .map_err(|e| ChannelError::Command(format!("unexpected control lookup result: {e}")))?;
        serde_json::from_str(&json)
            .map_err(|e| ChannelError::Command(format!("unexpected control state: {e}")))
    }

    async fn click(&mut self, selector: &str) -> Result<ClickResult, ChannelError> {
        let element = match self.page.find_element(selector).await {
            Ok(element) => element,
            Err(e) if is_stale(&e) => return Ok(ClickResult::Detached),
            Err(e) => return Err(ChannelError::Command(format!("find '{selector}' failed: {e}"))),
        };
        match element.click().await {
            Ok(_) => Ok(ClickResult::Clicked),
            Err(e) if is_stale(&e) => Ok(ClickResult::Detached),
            Err(e) => Err(ChannelError::Command(format!("click on '{selector}' failed: {e}"))),
        }
    }

    async fn page_source(&mut self) -> Result<String, ChannelError> {
        self.page
            .evaluate("new XMLSerializer().serializeToString(document)")
            .await
            .map_err(|e| ChannelError::Command(format!("failed to read page source: {e}")))?
            .into_value()
            .map_err(|e| ChannelError::Command(format!("failed to convert page source: {e}")))
    }
}
