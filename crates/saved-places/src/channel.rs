//! Browser session abstraction.
//!
//! Defines the `UiChannel` trait the classifier and driver talk to. The real
//! implementation lives in the CLI crate (Chromium over CDP); tests script
//! their own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

/// Observed state of a page control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlState {
    /// Rendered text of the control.
    pub text: String,
    /// Whether the control is laid out and visible.
    pub displayed: bool,
}

impl ControlState {
    /// Case-insensitive match of the trimmed text against `label`.
    pub fn reads(&self, label: &str) -> bool {
        self.text.trim().eq_ignore_ascii_case(label)
    }
}

/// Result of a click request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickResult {
    Clicked,
    /// The element vanished before the click landed.
    Detached,
}

/// A single remote-controlled browser tab.
#[async_trait]
pub trait UiChannel: Send {
    /// Load `url` in the tab.
    async fn navigate(&mut self, url: &str) -> Result<(), ChannelError>;
    /// Look up the first element matching `selector`.
    async fn find_control(&mut self, selector: &str) -> Result<Option<ControlState>, ChannelError>;
    /// Click the first element matching `selector`.
    async fn click(&mut self, selector: &str) -> Result<ClickResult, ChannelError>;
    /// Serialized source of the current document.
    async fn page_source(&mut self) -> Result<String, ChannelError>;
}

/// Channel used when no browser is attached (dry runs, empty imports).
///
/// Every call fails with `ChannelError::Detached`.
pub struct DetachedChannel;

#[async_trait]
impl UiChannel for DetachedChannel {
    async fn navigate(&mut self, _url: &str) -> Result<(), ChannelError> {
        Err(ChannelError::Detached)
    }
    async fn find_control(
        &mut self,
        _selector: &str,
    ) -> Result<Option<ControlState>, ChannelError> {
        Err(ChannelError::Detached)
    }
    async fn click(&mut self, _selector: &str) -> Result<ClickResult, ChannelError> {
        Err(ChannelError::Detached)
    }
    async fn page_source(&mut self) -> Result<String, ChannelError> {
        Err(ChannelError::Detached)
    }
}
