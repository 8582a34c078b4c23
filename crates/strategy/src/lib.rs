pub mod builtin;
pub mod config;
pub mod dispatcher;
pub mod factory;
pub mod handle;
pub mod registry;
pub mod telemetry;

pub use config::{BotEntry, BotsFileConfig, StrategyConfig};
pub use dispatcher::{DispatchReport, Dispatcher};
pub use factory::{BotContext, SharedContext, StrategyFactories, StrategyFactory};
pub use handle::{DisabledFlag, DisabledProbe, StrategyHandle};
pub use registry::Registry;
pub use telemetry::{BotLog, BotLogLevel, BotLogger, BotRecord};

use common::{AccountEvent, BlockEvent, EventKind, MarketEvent, StrategyError};

/// All strategy implementations must satisfy this trait.
///
/// The dispatcher decides which calls a bot receives: every block goes to
/// `on_tick`, market and account updates only when they match the bot's
/// binding, and nothing at all while the bot is disabled. Errors and panics
/// never leave the dispatcher; they are logged against the bot and passed
/// to `on_error`.
pub trait Strategy: Send {
    fn on_tick(&mut self, _block: &BlockEvent) -> Result<(), StrategyError> {
        Ok(())
    }

    fn on_market_update(&mut self, _event: &MarketEvent) -> Result<(), StrategyError> {
        Ok(())
    }

    fn on_account_update(&mut self, _event: &AccountEvent) -> Result<(), StrategyError> {
        Ok(())
    }

    /// Called after one of the handlers above failed.
    fn on_error(&mut self, _kind: EventKind, _error: &StrategyError) {}
}
