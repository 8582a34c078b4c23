use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use common::{Error, Event, Result, TopicSet};

use crate::notifier::{EventSink, Feed, Notifier};

/// Bridges the registry's topic set to a single upstream subscription.
pub struct SubscriptionAdapter {
    notifier: Arc<dyn Notifier>,
    buffer: usize,
}

impl SubscriptionAdapter {
    pub const DEFAULT_BUFFER: usize = 1024;

    pub fn new(notifier: Arc<dyn Notifier>, buffer: usize) -> Self {
        Self {
            notifier,
            buffer: buffer.max(1),
        }
    }

    /// Open one subscription over every account and market in `topics`.
    pub async fn open(&self, topics: &TopicSet) -> Result<Subscription> {
        info!(
            accounts = ?topics.accounts,
            markets = ?topics.markets,
            "Opening upstream subscription"
        );
        let (tx, events) = mpsc::channel(self.buffer);
        let feed = self.notifier.subscribe(topics, EventSink::new(tx)).await?;
        Ok(Subscription { feed, events })
    }
}

/// An opened subscription that has not started delivering yet.
pub struct Subscription {
    feed: Box<dyn Feed>,
    events: mpsc::Receiver<Event>,
}

impl Subscription {
    /// Start the transport on its own task.
    pub fn start(self) -> Listener {
        let task = tokio::spawn(self.feed.listen());
        Listener {
            events: self.events,
            task,
        }
    }
}

/// Receiving end of a running subscription.
pub struct Listener {
    events: mpsc::Receiver<Event>,
    task: JoinHandle<Result<()>>,
}

impl Listener {
    /// Next event in arrival order. `None` once the feed has stopped and
    /// everything it delivered has been consumed.
    pub async fn next(&mut self) -> Option<Event> {
        self.events.recv().await
    }

    /// How the feed ended. Call after `next` returned `None`.
    pub async fn finish(self) -> Result<()> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(Error::FeedLost(format!("feed task failed: {e}"))),
        }
    }
}
