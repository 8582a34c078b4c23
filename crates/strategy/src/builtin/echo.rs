use common::{AccountEvent, BlockEvent, MarketEvent, StrategyError};

use crate::factory::BotContext;
use crate::telemetry::BotLogger;
use crate::Strategy;

pub const MODULE: &str = "echo";

/// Logs every event it receives. Useful to check a deployment's bindings.
///
/// Params: `log_payload` (bool, default false) includes the raw payload of
/// market and account updates in the log line.
pub struct EchoStrategy {
    log: BotLogger,
    log_payload: bool,
}

pub fn build(ctx: BotContext) -> Result<Box<dyn Strategy>, StrategyError> {
    let log_payload = ctx.config.param_bool("log_payload", false);
    ctx.log.info(format!("echo started for {}", ctx.name));
    Ok(Box::new(EchoStrategy {
        log: ctx.log,
        log_payload,
    }))
}

impl Strategy for EchoStrategy {
    fn on_tick(&mut self, block: &BlockEvent) -> Result<(), StrategyError> {
        self.log.info(format!("block {}", block.block));
        Ok(())
    }

    fn on_market_update(&mut self, event: &MarketEvent) -> Result<(), StrategyError> {
        if self.log_payload {
            self.log
                .info(format!("market update {}: {}", event.market, event.payload));
        } else {
            self.log.info(format!("market update {}", event.market));
        }
        Ok(())
    }

    fn on_account_update(&mut self, event: &AccountEvent) -> Result<(), StrategyError> {
        if self.log_payload {
            self.log
                .info(format!("account update {}: {}", event.account, event.payload));
        } else {
            self.log.info(format!("account update {}", event.account));
        }
        Ok(())
    }
}
