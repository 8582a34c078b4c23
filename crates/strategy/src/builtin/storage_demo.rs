use common::{BlockEvent, StrategyError};

use crate::factory::BotContext;
use crate::telemetry::BotLogger;
use crate::Strategy;

pub const MODULE: &str = "storage_demo";

/// Remembers the last block it saw and reports it alongside each new one.
/// State lives in memory only and is lost on restart.
pub struct StorageDemo {
    log: BotLogger,
    previous: Option<String>,
}

pub fn build(ctx: BotContext) -> Result<Box<dyn Strategy>, StrategyError> {
    Ok(Box::new(StorageDemo {
        log: ctx.log,
        previous: None,
    }))
}

impl StorageDemo {
    pub fn previous(&self) -> Option<&str> {
        self.previous.as_deref()
    }
}

impl Strategy for StorageDemo {
    fn on_tick(&mut self, block: &BlockEvent) -> Result<(), StrategyError> {
        self.log.info(format!(
            "previous block: {}, new block: {}",
            self.previous.as_deref().unwrap_or("none"),
            block.block
        ));
        self.previous = Some(block.block.clone());
        Ok(())
    }
}
