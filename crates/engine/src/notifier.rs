use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::trace;

use common::{AccountEvent, BlockEvent, Event, MarketEvent, Result, TopicSet};

/// Upstream notification source.
///
/// `WsNotifier` implements this for a live JSON feed.
/// `ReplayNotifier` implements this for recorded event files.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Open one subscription multiplexing every account and market in
    /// `topics`. Fails with `Error::Subscription` if the upstream cannot be
    /// reached. The returned feed owns `sink`.
    async fn subscribe(&self, topics: &TopicSet, sink: EventSink) -> Result<Box<dyn Feed>>;
}

/// An open subscription, ready to deliver.
#[async_trait]
pub trait Feed: Send {
    /// Deliver events into the sink until the upstream is exhausted (`Ok`)
    /// or fails (`Err(Error::FeedLost)`).
    async fn listen(self: Box<Self>) -> Result<()>;
}

/// The three callback entry points handed to the transport.
///
/// All classes share one FIFO channel, so arrival order within each class
/// is preserved. The send awaits when the dispatcher falls behind.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<Event>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<Event>) -> Self {
        Self { tx }
    }

    /// Returns `false` once the consumer is gone.
    pub async fn on_block(&self, block: BlockEvent) -> bool {
        self.tx.send(Event::Block(block)).await.is_ok()
    }

    /// Deleted entries carry no payload and are dropped here.
    pub async fn on_market(&self, event: MarketEvent) -> bool {
        if event.deleted {
            trace!(market = %event.market, "Skipping deleted market entry");
            return !self.tx.is_closed();
        }
        self.tx.send(Event::Market(event)).await.is_ok()
    }

    pub async fn on_account(&self, event: AccountEvent) -> bool {
        self.tx.send(Event::Account(event)).await.is_ok()
    }

    /// Route an already-decoded event to the matching entry point.
    pub async fn deliver(&self, event: Event) -> bool {
        match event {
            Event::Block(block) => self.on_block(block).await,
            Event::Market(event) => self.on_market(event).await,
            Event::Account(event) => self.on_account(event).await,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
