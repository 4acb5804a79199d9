//! Snapshot of places that are already saved remotely.

use std::collections::HashSet;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::channel::UiChannel;
use crate::error::{ImportError, ImportResult};

/// XML export of every bookmark the logged-in account has saved.
pub const DEFAULT_BOOKMARKS_URL: &str = "https://www.google.com/bookmarks/?output=xml&num=10000";

/// Identifiers saved remotely at the time of the fetch.
///
/// Fetched once per run and never refreshed; places saved during the run
/// are not reflected here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkSet {
    urls: HashSet<String>,
}

impl BookmarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for BookmarkSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            urls: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Load the bookmark export through the browser session.
///
/// The export is only served to an authenticated browser, so it has to go
/// through the same session that saves the places.
pub async fn fetch_bookmarks<C>(channel: &mut C, endpoint: &str) -> ImportResult<BookmarkSet>
where
    C: UiChannel + ?Sized,
{
    channel.navigate(endpoint).await?;
    let source = channel.page_source().await?;
    let bookmarks = parse_bookmarks(&source)?;
    tracing::debug!("fetched {} bookmarks from {endpoint}", bookmarks.len());
    Ok(bookmarks)
}

/// Collect the text of every `<url>` element inside a `<bookmark>` element.
pub fn parse_bookmarks(xml: &str) -> ImportResult<BookmarkSet> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut urls = HashSet::new();
    let mut in_bookmark = false;
    let mut in_url = false;
    let mut current = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"bookmark" => in_bookmark = true,
                b"url" if in_bookmark => {
                    in_url = true;
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::Text(e)) if in_url => {
                let text = e.unescape().map_err(|err| {
                    ImportError::MalformedInput(format!("bookmark export: {err}"))
                })?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"bookmark" => in_bookmark = false,
                b"url" if in_url => {
                    in_url = false;
                    let url = current.trim();
                    if !url.is_empty() {
                        urls.insert(url.to_string());
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ImportError::MalformedInput(format!(
                    "bookmark export is not valid XML: {e}"
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(BookmarkSet { urls })
}
