use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use common::{AccountEvent, BlockEvent, EventKind, MarketEvent, StrategyError};

use crate::config::StrategyConfig;
use crate::telemetry::BotLogger;
use crate::Strategy;

/// Shared enabled/disabled switch of one bot.
///
/// The strategy holds a clone so it can disable itself; the supervisor's
/// control channel writes it from outside. Dispatch is single-threaded, so
/// relaxed ordering is enough.
#[derive(Debug, Clone, Default)]
pub struct DisabledFlag(Arc<AtomicBool>);

impl DisabledFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_disabled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn disable(&self) {
        self.set(true);
    }

    pub fn enable(&self) {
        self.set(false);
    }

    /// Returns the previous value.
    pub fn set(&self, disabled: bool) -> bool {
        self.0.swap(disabled, Ordering::Relaxed)
    }

    /// Read-only view for observers.
    pub fn probe(&self) -> DisabledProbe {
        DisabledProbe(Probe::Live(self.0.clone()))
    }
}

/// Read-only accessor over a bot's disabled state.
#[derive(Debug, Clone)]
pub struct DisabledProbe(Probe);

#[derive(Debug, Clone)]
enum Probe {
    Live(Arc<AtomicBool>),
    Fixed(bool),
}

impl DisabledProbe {
    /// For bots that never got a handle.
    pub fn always_disabled() -> Self {
        DisabledProbe(Probe::Fixed(true))
    }

    pub fn get(&self) -> bool {
        match &self.0 {
            Probe::Live(flag) => flag.load(Ordering::Relaxed),
            Probe::Fixed(v) => *v,
        }
    }
}

/// A constructed bot: its configuration, its disabled flag and the strategy
/// instance. Owned by the `Registry`.
pub struct StrategyHandle {
    config: Arc<StrategyConfig>,
    disabled: DisabledFlag,
    logger: BotLogger,
    strategy: Box<dyn Strategy>,
}

impl StrategyHandle {
    pub(crate) fn new(
        config: Arc<StrategyConfig>,
        disabled: DisabledFlag,
        logger: BotLogger,
        strategy: Box<dyn Strategy>,
    ) -> Self {
        Self {
            config,
            disabled,
            logger,
            strategy,
        }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.is_disabled()
    }

    /// Returns the previous value.
    pub fn set_disabled(&self, disabled: bool) -> bool {
        self.disabled.set(disabled)
    }

    pub fn probe(&self) -> DisabledProbe {
        self.disabled.probe()
    }

    pub fn logger(&self) -> &BotLogger {
        &self.logger
    }

    pub fn on_tick(&mut self, block: &BlockEvent) -> Result<(), StrategyError> {
        self.guarded(|s| s.on_tick(block))
    }

    pub fn on_market_update(&mut self, event: &MarketEvent) -> Result<(), StrategyError> {
        self.guarded(|s| s.on_market_update(event))
    }

    pub fn on_account_update(&mut self, event: &AccountEvent) -> Result<(), StrategyError> {
        self.guarded(|s| s.on_account_update(event))
    }

    /// Let the strategy react to one of its own failures. A panic in the
    /// hook is swallowed.
    pub fn report_error(&mut self, kind: EventKind, error: &StrategyError) {
        let _ = self.guarded(|s| {
            s.on_error(kind, error);
            Ok(())
        });
    }

    fn guarded<F>(&mut self, f: F) -> Result<(), StrategyError>
    where
        F: FnOnce(&mut dyn Strategy) -> Result<(), StrategyError>,
    {
        let strategy = self.strategy.as_mut();
        match panic::catch_unwind(AssertUnwindSafe(|| f(strategy))) {
            Ok(result) => result,
            Err(payload) => Err(StrategyError::Panicked(panic_message(payload))),
        }
    }
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BotEntry;
    use crate::telemetry::BotLog;

    struct Grumpy;

    impl Strategy for Grumpy {
        fn on_tick(&mut self, _block: &BlockEvent) -> Result<(), StrategyError> {
            panic!("tick went wrong");
        }

        fn on_market_update(&mut self, _event: &MarketEvent) -> Result<(), StrategyError> {
            Err(StrategyError::failed("no liquidity"))
        }

        fn on_account_update(&mut self, event: &AccountEvent) -> Result<(), StrategyError> {
            let balance: u64 = event
                .payload
                .get("balance")
                .and_then(|v| v.as_u64())
                .ok_or_else(|| anyhow::anyhow!("account {} has no balance", event.account))?;
            if balance == 0 {
                return Err(StrategyError::failed("empty balance"));
            }
            Ok(())
        }
    }

    fn handle() -> StrategyHandle {
        let config = Arc::new(
            BotEntry::new("grumpy", "test")
                .account("alice")
                .market("BTS:USD")
                .validate()
                .unwrap(),
        );
        let flag = DisabledFlag::new();
        let logger = BotLog::new(8).logger("grumpy", "alice", "BTS:USD", flag.probe());
        StrategyHandle::new(config, flag, logger, Box::new(Grumpy))
    }

    #[test]
    fn panics_become_errors() {
        let mut h = handle();
        let block = match common::Event::block("1") {
            common::Event::Block(b) => b,
            _ => unreachable!(),
        };
        match h.on_tick(&block) {
            Err(StrategyError::Panicked(msg)) => assert_eq!(msg, "tick went wrong"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn anyhow_errors_pass_through() {
        let mut h = handle();
        let event = match common::Event::account("alice", serde_json::json!({"balance": 5})) {
            common::Event::Account(a) => a,
            _ => unreachable!(),
        };
        assert!(h.on_account_update(&event).is_ok());

        let event = match common::Event::account("alice", serde_json::Value::Null) {
            common::Event::Account(a) => a,
            _ => unreachable!(),
        };
        let err = h.on_account_update(&event).unwrap_err();
        assert!(matches!(err, StrategyError::Other(_)));
        assert_eq!(err.to_string(), "account alice has no balance");
    }

    #[test]
    fn flag_and_probe_share_state() {
        let h = handle();
        let probe = h.probe();
        assert!(!h.is_disabled());
        assert!(!h.set_disabled(true));
        assert!(probe.get());
        assert!(DisabledProbe::always_disabled().get());
    }
}
