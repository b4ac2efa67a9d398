//! Progress events emitted while an audit runs

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// One progress notification
///
/// Serialized with a `type` tag, e.g.
/// `{"type":"page_done","url":"...","statusCode":200,...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CrawlEvent {
    /// A pre-crawl check is starting
    PreCheck { message: String },

    /// A page was fetched, analyzed and committed
    #[serde(rename_all = "camelCase")]
    PageDone {
        url: String,
        status_code: u16,
        ttfb: f64,
        pages_scanned: usize,
        urls_discovered: usize,
        queue_size: usize,
        /// Pages with at least one critical issue so far
        errors_count: usize,
    },

    /// A worker failed before producing a page result
    #[serde(rename_all = "camelCase")]
    PageError { url: String, error: String },

    /// The audit finished; always the last event of a run
    #[serde(rename_all = "camelCase")]
    Done {
        pages_scanned: usize,
        health_score: u32,
    },
}

/// Optional event channel
///
/// A dropped receiver is not an error: the audit keeps running and events
/// are discarded.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    sender: Option<UnboundedSender<CrawlEvent>>,
}

impl EventSink {
    pub fn new(sender: Option<UnboundedSender<CrawlEvent>>) -> Self {
        Self { sender }
    }

    pub fn emit(&self, event: CrawlEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }
}
