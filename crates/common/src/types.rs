use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A new block observed upstream. Ticks are global: every enabled bot
/// receives every block regardless of its account/market binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockEvent {
    /// Block identifier as reported by the transport.
    pub block: String,
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

/// An order book / trade update for one market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketEvent {
    /// Market identifier, e.g. "BTS:USD".
    pub market: String,
    /// Set by the transport for removed orders. These carry no usable
    /// payload and never reach a strategy.
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

/// A balance / history update for one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountEvent {
    pub account: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

/// Normalized upstream notification, as handed to the dispatcher.
///
/// Wire form is internally tagged:
/// `{"type":"market","market":"BTS:USD","payload":{...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    Block(BlockEvent),
    Market(MarketEvent),
    Account(AccountEvent),
}

impl Event {
    pub fn block(block: impl Into<String>) -> Self {
        Event::Block(BlockEvent {
            block: block.into(),
            number: None,
            received_at: Utc::now(),
        })
    }

    pub fn market(market: impl Into<String>, payload: serde_json::Value) -> Self {
        Event::Market(MarketEvent {
            market: market.into(),
            deleted: false,
            payload,
            received_at: Utc::now(),
        })
    }

    pub fn account(account: impl Into<String>, payload: serde_json::Value) -> Self {
        Event::Account(AccountEvent {
            account: account.into(),
            payload,
            received_at: Utc::now(),
        })
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Event::Block(_) => EventKind::Tick,
            Event::Market(_) => EventKind::MarketUpdate,
            Event::Account(_) => EventKind::AccountUpdate,
        }
    }
}

/// Which capability of a strategy an event is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Tick,
    MarketUpdate,
    AccountUpdate,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Tick => write!(f, "on_tick"),
            EventKind::MarketUpdate => write!(f, "on_market_update"),
            EventKind::AccountUpdate => write!(f, "on_account_update"),
        }
    }
}

/// De-duplicated accounts and markets needed by the constructed bots.
/// Computed once at startup; read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSet {
    pub accounts: BTreeSet<String>,
    pub markets: BTreeSet<String>,
}

impl TopicSet {
    pub fn insert(&mut self, account: &str, market: &str) {
        self.accounts.insert(account.to_string());
        self.markets.insert(market.to_string());
    }

    /// True when there is nothing to subscribe to.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.markets.is_empty()
    }

    /// Whether an upstream subscription over this set would carry `event`.
    /// Blocks are always carried.
    pub fn covers(&self, event: &Event) -> bool {
        match event {
            Event::Block(_) => true,
            Event::Market(m) => self.markets.contains(&m.market),
            Event::Account(a) => self.accounts.contains(&a.account),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_parses_from_tagged_json() {
        let event: Event =
            serde_json::from_str(r#"{"type":"market","market":"BTS:USD","deleted":true}"#)
                .unwrap();
        match event {
            Event::Market(m) => {
                assert_eq!(m.market, "BTS:USD");
                assert!(m.deleted);
                assert!(m.payload.is_null());
            }
            other => panic!("expected market event, got {other:?}"),
        }
    }

    #[test]
    fn topic_set_dedups_and_covers() {
        let mut topics = TopicSet::default();
        assert!(topics.is_empty());
        topics.insert("alice", "BTS:USD");
        topics.insert("alice", "BTS:EUR");

        assert_eq!(topics.accounts.len(), 1);
        assert_eq!(topics.markets.len(), 2);
        assert!(topics.covers(&Event::block("1")));
        assert!(topics.covers(&Event::account("alice", serde_json::Value::Null)));
        assert!(!topics.covers(&Event::account("bob", serde_json::Value::Null)));
        assert!(!topics.covers(&Event::market("BTS:CNY", serde_json::Value::Null)));
    }
}
