//! Per-bot event log.
//!
//! Separate from the general process log: every record names the bot it
//! concerns and carries a live, read-only view of that bot's disabled flag
//! so an observer (dashboard, supervisor UI) can poll it without holding
//! the registry.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::handle::DisabledProbe;

/// Placeholder used when a binding is absent from the bot definition.
pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BotLogLevel {
    Info,
    Warn,
    Error,
    Critical,
}

impl std::fmt::Display for BotLogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BotLogLevel::Info => write!(f, "info"),
            BotLogLevel::Warn => write!(f, "warn"),
            BotLogLevel::Error => write!(f, "error"),
            BotLogLevel::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BotRecord {
    pub botname: String,
    pub account: String,
    pub market: String,
    pub level: BotLogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    probe: DisabledProbe,
}

impl BotRecord {
    /// Current disabled state of the bot, read at call time.
    pub fn is_disabled(&self) -> bool {
        self.probe.get()
    }
}

/// Broadcast sink for per-bot records. Cheap to clone.
#[derive(Clone)]
pub struct BotLog {
    tx: broadcast::Sender<BotRecord>,
}

impl BotLog {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BotRecord> {
        self.tx.subscribe()
    }

    /// A logger bound to one bot's identity.
    pub fn logger(
        &self,
        botname: &str,
        account: &str,
        market: &str,
        probe: DisabledProbe,
    ) -> BotLogger {
        BotLogger {
            log: self.clone(),
            botname: botname.to_string(),
            account: account.to_string(),
            market: market.to_string(),
            probe,
        }
    }

    fn emit(&self, record: BotRecord) {
        let disabled = record.is_disabled();
        match record.level {
            BotLogLevel::Info => info!(
                target: "botmux::per_bot",
                bot = %record.botname, account = %record.account, market = %record.market,
                disabled, "{}", record.message
            ),
            BotLogLevel::Warn => warn!(
                target: "botmux::per_bot",
                bot = %record.botname, account = %record.account, market = %record.market,
                disabled, "{}", record.message
            ),
            BotLogLevel::Error => error!(
                target: "botmux::per_bot",
                bot = %record.botname, account = %record.account, market = %record.market,
                disabled, "{}", record.message
            ),
            BotLogLevel::Critical => error!(
                target: "botmux::per_bot",
                critical = true,
                bot = %record.botname, account = %record.account, market = %record.market,
                disabled, "{}", record.message
            ),
        }
        // Ignore send errors (no active observers)
        let _ = self.tx.send(record);
    }
}

/// Per-bot handle onto the `BotLog`. Given to strategies at construction.
#[derive(Clone)]
pub struct BotLogger {
    log: BotLog,
    botname: String,
    account: String,
    market: String,
    probe: DisabledProbe,
}

impl BotLogger {
    pub fn botname(&self) -> &str {
        &self.botname
    }

    pub fn log(&self, level: BotLogLevel, message: impl Into<String>) {
        self.log.emit(BotRecord {
            botname: self.botname.clone(),
            account: self.account.clone(),
            market: self.market.clone(),
            level,
            message: message.into(),
            timestamp: Utc::now(),
            probe: self.probe.clone(),
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(BotLogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(BotLogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(BotLogLevel::Error, message);
    }

    pub fn critical(&self, message: impl Into<String>) {
        self.log(BotLogLevel::Critical, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::DisabledFlag;

    #[test]
    fn records_reflect_live_disabled_state() {
        let log = BotLog::new(16);
        let mut rx = log.subscribe();
        let flag = DisabledFlag::new();
        let logger = log.logger("A", "alice", "BTS:USD", flag.probe());

        logger.info("hello");
        let record = rx.try_recv().unwrap();
        assert_eq!(record.botname, "A");
        assert_eq!(record.level, BotLogLevel::Info);
        assert!(!record.is_disabled());

        flag.disable();
        assert!(record.is_disabled(), "probe reads the flag at call time");
    }

    #[test]
    fn emitting_without_observers_is_fine() {
        let log = BotLog::new(1);
        let logger = log.logger(UNKNOWN, UNKNOWN, UNKNOWN, DisabledProbe::always_disabled());
        logger.critical("nobody is listening");
    }
}
