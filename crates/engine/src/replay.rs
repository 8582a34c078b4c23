use async_trait::async_trait;
use tracing::{debug, info};

use common::{Error, Event, Result, TopicSet};

use crate::notifier::{EventSink, Feed, Notifier};

enum Source {
    File(String),
    Events(Vec<Event>),
}

/// Replays recorded events once, in order.
///
/// Account and market events outside the subscribed topics are filtered
/// out the way a live upstream would. Reaching the end of the recording
/// ends listening successfully.
///
/// File format: one JSON event per line (same shape as the WebSocket
/// frames); blank lines and lines starting with `#` are skipped.
pub struct ReplayNotifier {
    source: Source,
}

impl ReplayNotifier {
    pub fn from_file(path: impl Into<String>) -> Self {
        Self {
            source: Source::File(path.into()),
        }
    }

    pub fn from_events(events: Vec<Event>) -> Self {
        Self {
            source: Source::Events(events),
        }
    }

    fn load(&self) -> Result<Vec<Event>> {
        match &self.source {
            Source::Events(events) => Ok(events.clone()),
            Source::File(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::Subscription(format!("cannot open replay file '{path}': {e}"))
                })?;
                parse_lines(&content)
                    .map_err(|e| Error::Subscription(format!("replay file '{path}': {e}")))
            }
        }
    }
}

fn parse_lines(content: &str) -> std::result::Result<Vec<Event>, String> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| format!("line {}: {e}", i + 1))
        })
        .collect()
}

#[async_trait]
impl Notifier for ReplayNotifier {
    async fn subscribe(&self, topics: &TopicSet, sink: EventSink) -> Result<Box<dyn Feed>> {
        let recorded = self.load()?;
        let total = recorded.len();
        let events: Vec<Event> = recorded.into_iter().filter(|e| topics.covers(e)).collect();
        info!(
            total,
            subscribed = events.len(),
            "Replay loaded"
        );
        Ok(Box::new(ReplayFeed { events, sink }))
    }
}

struct ReplayFeed {
    events: Vec<Event>,
    sink: EventSink,
}

#[async_trait]
impl Feed for ReplayFeed {
    async fn listen(self: Box<Self>) -> Result<()> {
        let ReplayFeed { events, sink } = *self;
        for event in events {
            if !sink.deliver(event).await {
                debug!("Event consumer gone, stopping replay");
                break;
            }
        }
        info!("Replay finished");
        Ok(())
    }
}
