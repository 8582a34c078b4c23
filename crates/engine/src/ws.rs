use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use common::{Error, Event, Result, TopicSet};

use crate::notifier::{EventSink, Feed, Notifier};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// JSON-over-WebSocket notification source.
///
/// After connecting, sends one subscribe frame:
/// `{"op":"subscribe","accounts":[...],"markets":[...]}`
/// and then reads text frames tagged `"type": "block" | "market" | "account"`.
/// Frames of any other type (acks, heartbeats) are ignored.
///
/// There is no reconnection: a dropped connection ends the feed with
/// `Error::FeedLost` and the process manager decides what to do next.
pub struct WsNotifier {
    url: String,
}

impl WsNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[derive(Serialize)]
struct SubscribeFrame<'a> {
    op: &'static str,
    accounts: Vec<&'a str>,
    markets: Vec<&'a str>,
}

#[async_trait]
impl Notifier for WsNotifier {
    async fn subscribe(&self, topics: &TopicSet, sink: EventSink) -> Result<Box<dyn Feed>> {
        let url = Url::parse(&self.url)
            .map_err(|e| Error::Subscription(format!("invalid notify url '{}': {e}", self.url)))?;

        info!(url = %url, "Connecting to notification stream");
        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| Error::Subscription(e.to_string()))?;
        let (mut write, read) = ws_stream.split();

        let frame = serde_json::to_string(&SubscribeFrame {
            op: "subscribe",
            accounts: topics.accounts.iter().map(String::as_str).collect(),
            markets: topics.markets.iter().map(String::as_str).collect(),
        })?;
        write
            .send(Message::Text(frame))
            .await
            .map_err(|e| Error::Subscription(e.to_string()))?;

        Ok(Box::new(WsFeed { write, read, sink }))
    }
}

struct WsFeed {
    // Held so the connection stays open while reading.
    write: SplitSink<WsStream, Message>,
    read: SplitStream<WsStream>,
    sink: EventSink,
}

#[async_trait]
impl Feed for WsFeed {
    async fn listen(self: Box<Self>) -> Result<()> {
        let WsFeed {
            write: _write,
            mut read,
            sink,
        } = *self;

        while let Some(msg) = read.next().await {
            let msg = msg.map_err(|e| Error::FeedLost(e.to_string()))?;

            match msg {
                Message::Text(text) => match parse_notification(&text) {
                    Ok(Some(event)) => {
                        if !sink.deliver(event).await {
                            debug!("Event consumer gone, closing feed");
                            return Ok(());
                        }
                    }
                    Ok(None) => {} // ack or heartbeat
                    Err(e) => {
                        warn!(error = %e, "Failed to parse notification");
                    }
                },
                Message::Close(frame) => {
                    return Err(Error::FeedLost(format!("upstream closed: {frame:?}")));
                }
                _ => {}
            }
        }

        Err(Error::FeedLost("notification stream ended".into()))
    }
}

// ─── Notification JSON parsing ───────────────────────────────────────────────

/// Decode one text frame. `Ok(None)` for frames that are not events.
pub fn parse_notification(text: &str) -> Result<Option<Event>> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    match value.get("type").and_then(|v| v.as_str()) {
        Some("block" | "market" | "account") => Ok(Some(serde_json::from_value(value)?)),
        _ => Ok(None),
    }
}
