//! Browser session acquisition.
//!
//! A `Connector` turns the configured endpoint into a live `UiChannel`
//! (currently Chromium over the DevTools protocol via chromiumoxide).

pub mod chromium;

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use saved_places::{ImportResult, UiChannel};

use crate::config::Endpoint;

/// Opens the single browser session a run works in.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, endpoint: &Endpoint) -> ImportResult<Box<dyn UiChannel>>;
}

/// Whether something accepts TCP connections on `host:port`.
pub async fn check_socket(host: &str, port: u16, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(timeout, TcpStream::connect((host, port))).await,
        Ok(Ok(_))
    )
}
