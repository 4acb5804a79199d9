//! Save-button state machine.
//!
//! The control cycles `SAVE -> (click) -> SAVED`, or already reads `SAVED`
//! when the place was saved since the bookmark snapshot was taken. The page
//! updates asynchronously, so every state is polled for within a bounded
//! window:
//!
//! 1. control present and displayed (presence timeout, fatal on expiry)
//! 2. reads `SAVED` (state timeout) -> `AlreadyAdded`
//! 3. reads `SAVE` (state timeout), else `UnknownError`
//! 4. click, then pick the target list entry if one is configured
//! 5. reads `SAVED` (confirm timeout) -> `Success`, else `Failure`

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::channel::{ClickResult, ControlState, UiChannel};
use crate::error::ChannelError;
use crate::report::{Level, SharedReporter};
use crate::types::{Outcome, TargetList};

/// Control text before the place is saved.
pub const SAVE_LABEL: &str = "SAVE";
/// Control text once the place is saved.
pub const SAVED_LABEL: &str = "SAVED";

/// Selectors and wait windows for the save control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    /// CSS selector of the save control.
    pub control_selector: String,
    /// CSS selector of a list entry in the save menu; `{index}` is replaced
    /// by the list's menu index.
    pub list_item_selector: String,
    #[serde(with = "millis")]
    pub present_timeout: Duration,
    #[serde(with = "millis")]
    pub state_timeout: Duration,
    #[serde(with = "millis")]
    pub confirm_timeout: Duration,
    #[serde(with = "millis")]
    pub poll_interval: Duration,
    /// List to file the place under, when the save control opens a menu.
    pub target_list: Option<TargetList>,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            control_selector: ".section-entity-action-save-button".to_string(),
            list_item_selector: "#action-menu [data-index='{index}']".to_string(),
            present_timeout: Duration::from_secs(10),
            state_timeout: Duration::from_secs(6),
            confirm_timeout: Duration::from_secs(6),
            poll_interval: Duration::from_millis(100),
            target_list: None,
        }
    }
}

impl ClassifierSettings {
    fn list_item_selector_for(&self, list: TargetList) -> String {
        self.list_item_selector
            .replace("{index}", &list.menu_index().to_string())
    }
}

/// Result of one bounded wait.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Probe<T> {
    Ready(T),
    TimedOut,
}

/// Drives the save control for one place and classifies what happened.
pub struct OutcomeClassifier {
    settings: ClassifierSettings,
    reporter: SharedReporter,
}

impl OutcomeClassifier {
    pub fn new(settings: ClassifierSettings, reporter: SharedReporter) -> Self {
        Self { settings, reporter }
    }

    pub fn settings(&self) -> &ClassifierSettings {
        &self.settings
    }

    /// Open `url` and try to save it.
    ///
    /// Returns an error only for channel faults, including the control never
    /// showing up; every other path yields an [`Outcome`].
    pub async fn classify<C>(&self, channel: &mut C, url: &str) -> Result<Outcome, ChannelError>
    where
        C: UiChannel + ?Sized,
    {
        let selector = self.settings.control_selector.as_str();
        channel.navigate(url).await?;

        let present = self
            .probe(channel, selector, self.settings.present_timeout, |s| s.displayed)
            .await?;
        if present == Probe::TimedOut {
            return Err(ChannelError::ControlMissing {
                selector: selector.to_string(),
                timeout: self.settings.present_timeout,
            });
        }

        let saved = self
            .probe(channel, selector, self.settings.state_timeout, |s| {
                s.reads(SAVED_LABEL)
            })
            .await?;
        if let Probe::Ready(_) = saved {
            tracing::debug!("{url} already saved");
            return Ok(Outcome::AlreadyAdded);
        }

        let unsaved = self
            .probe(channel, selector, self.settings.state_timeout, |s| {
                s.reads(SAVE_LABEL)
            })
            .await?;
        if unsaved == Probe::TimedOut {
            let text = self.current_text(channel).await?;
            self.report_error(url, &format!("Save button contained unknown text '{text}'"));
            return Ok(Outcome::UnknownError);
        }

        self.click_tolerant(channel, selector).await?;

        if let Some(list) = self.settings.target_list {
            let item = self.settings.list_item_selector_for(list);
            let entry = self
                .probe(channel, &item, self.settings.confirm_timeout, |s| s.displayed)
                .await?;
            if entry == Probe::TimedOut {
                self.report_error(url, &format!("Save menu entry '{item}' never appeared"));
                return Ok(Outcome::Failure);
            }
            self.click_tolerant(channel, &item).await?;
        }

        let confirmed = self
            .probe(channel, selector, self.settings.confirm_timeout, |s| {
                s.reads(SAVED_LABEL)
            })
            .await?;
        match confirmed {
            Probe::Ready(_) => Ok(Outcome::Success),
            Probe::TimedOut => {
                let text = self.current_text(channel).await?;
                self.report_error(
                    url,
                    &format!("Save button didn't switch to '{SAVED_LABEL}', it contains '{text}'"),
                );
                Ok(Outcome::Failure)
            }
        }
    }

    /// Poll `selector` until `accept` holds or `timeout` expires.
    async fn probe<C, F>(
        &self,
        channel: &mut C,
        selector: &str,
        timeout: Duration,
        accept: F,
    ) -> Result<Probe<ControlState>, ChannelError>
    where
        C: UiChannel + ?Sized,
        F: Fn(&ControlState) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(state) = channel.find_control(selector).await? {
                if accept(&state) {
                    return Ok(Probe::Ready(state));
                }
            }
            if Instant::now() >= deadline {
                return Ok(Probe::TimedOut);
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    // The click only triggers the transition that is verified afterwards, so
    // a control that vanished underneath it is not an error.
    async fn click_tolerant<C>(&self, channel: &mut C, selector: &str) -> Result<(), ChannelError>
    where
        C: UiChannel + ?Sized,
    {
        if channel.click(selector).await? == ClickResult::Detached {
            tracing::debug!("click target '{selector}' was gone");
        }
        Ok(())
    }

    async fn current_text<C>(&self, channel: &mut C) -> Result<String, ChannelError>
    where
        C: UiChannel + ?Sized,
    {
        let state = channel
            .find_control(&self.settings.control_selector)
            .await?;
        Ok(state.map(|s| s.text).unwrap_or_else(|| "<missing>".to_string()))
    }

    fn report_error(&self, url: &str, detail: &str) {
        self.reporter
            .emit(Level::ERROR, &format!(" > [ERROR] Feature: '{url}'"));
        self.reporter.emit(Level::ERROR, &format!(" > [ERROR] {detail}"));
    }
}

/// Serialize durations as whole milliseconds in config files.
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::MemoryReporter;
    use async_trait::async_trait;

    /// Control that shows `before` until clicked and `after` once clicked.
    struct ScriptedButton {
        present: bool,
        before: &'static str,
        after: &'static str,
        menu: bool,
        clicks: Vec<String>,
        detached_click: bool,
    }

    impl ScriptedButton {
        fn new(before: &'static str, after: &'static str) -> Self {
            Self {
                present: true,
                before,
                after,
                menu: false,
                clicks: Vec::new(),
                detached_click: false,
            }
        }
    }

    #[async_trait]
    impl UiChannel for ScriptedButton {
        async fn navigate(&mut self, _url: &str) -> Result<(), ChannelError> {
            Ok(())
        }

        async fn find_control(
            &mut self,
            selector: &str,
        ) -> Result<Option<ControlState>, ChannelError> {
            if selector.starts_with("#action-menu") {
                return Ok(self.menu.then(|| ControlState {
                    text: "Starred places".into(),
                    displayed: true,
                }));
            }
            if !self.present {
                return Ok(None);
            }
            let text = if self.clicks.is_empty() {
                self.before
            } else {
                self.after
            };
            Ok(Some(ControlState {
                text: text.into(),
                displayed: true,
            }))
        }

        async fn click(&mut self, selector: &str) -> Result<ClickResult, ChannelError> {
            self.clicks.push(selector.to_string());
            if self.detached_click {
                Ok(ClickResult::Detached)
            } else {
                Ok(ClickResult::Clicked)
            }
        }

        async fn page_source(&mut self) -> Result<String, ChannelError> {
            Ok(String::new())
        }
    }

    fn classifier(reporter: SharedReporter) -> OutcomeClassifier {
        OutcomeClassifier::new(ClassifierSettings::default(), reporter)
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_path() {
        let reporter = MemoryReporter::new();
        let mut button = ScriptedButton::new("SAVE", "SAVED");
        let outcome = classifier(reporter.clone())
            .classify(&mut button, "http://maps.google.com/?cid=1")
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Success);
        assert_eq!(button.clicks.len(), 1);
        assert!(reporter.lines_at(Level::ERROR).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_saved_never_clicks() {
        let reporter = MemoryReporter::new();
        let mut button = ScriptedButton::new("SAVED", "SAVED");
        let outcome = classifier(reporter)
            .classify(&mut button, "http://maps.google.com/?cid=1")
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::AlreadyAdded);
        assert!(button.clicks.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_text_is_unknown_error() {
        let reporter = MemoryReporter::new();
        let mut button = ScriptedButton::new("LOADING", "LOADING");
        let outcome = classifier(reporter.clone())
            .classify(&mut button, "http://maps.google.com/?cid=1")
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::UnknownError);
        assert!(button.clicks.is_empty());
        assert!(reporter.contains("unknown text 'LOADING'"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_without_transition_is_failure() {
        let reporter = MemoryReporter::new();
        let mut button = ScriptedButton::new("SAVE", "SAVE");
        let outcome = classifier(reporter.clone())
            .classify(&mut button, "http://maps.google.com/?cid=1")
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Failure);
        assert_eq!(button.clicks.len(), 1);
        assert!(reporter.contains("it contains 'SAVE'"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_detached_click_is_tolerated() {
        let reporter = MemoryReporter::new();
        let mut button = ScriptedButton::new("SAVE", "SAVED");
        button.detached_click = true;
        let outcome = classifier(reporter)
            .classify(&mut button, "http://maps.google.com/?cid=1")
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_control_is_fatal() {
        let reporter = MemoryReporter::new();
        let mut button = ScriptedButton::new("SAVE", "SAVED");
        button.present = false;
        let err = classifier(reporter)
            .classify(&mut button, "http://maps.google.com/?cid=1")
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::ControlMissing { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_target_list_entry_is_clicked() {
        let reporter = MemoryReporter::new();
        let settings = ClassifierSettings {
            target_list: Some(TargetList::Starred),
            ..ClassifierSettings::default()
        };
        let mut button = ScriptedButton::new("SAVE", "SAVED");
        button.menu = true;
        let outcome = OutcomeClassifier::new(settings, reporter)
            .classify(&mut button, "http://maps.google.com/?cid=1")
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Success);
        assert_eq!(
            button.clicks,
            vec![
                ".section-entity-action-save-button".to_string(),
                "#action-menu [data-index='2']".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_list_entry_is_failure() {
        let reporter = MemoryReporter::new();
        let settings = ClassifierSettings {
            target_list: Some(TargetList::WantToGo),
            ..ClassifierSettings::default()
        };
        let mut button = ScriptedButton::new("SAVE", "SAVED");
        let outcome = OutcomeClassifier::new(settings, reporter.clone())
            .classify(&mut button, "http://maps.google.com/?cid=1")
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Failure);
        assert!(reporter.contains("data-index='1'"));
    }

    #[test]
    fn test_settings_from_json_uses_defaults() {
        let settings: ClassifierSettings =
            serde_json::from_str(r#"{"state_timeout": 1500, "target_list": "want-to-go"}"#)
                .unwrap();
        assert_eq!(settings.state_timeout, Duration::from_millis(1500));
        assert_eq!(settings.present_timeout, Duration::from_secs(10));
        assert_eq!(settings.target_list, Some(TargetList::WantToGo));
    }
}
