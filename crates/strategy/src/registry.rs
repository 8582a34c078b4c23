use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{info, warn};

use common::{Error, Result, StrategyError, TopicSet};

use crate::config::{BotEntry, StrategyConfig};
use crate::factory::{BotContext, SharedContext, StrategyFactories};
use crate::handle::{panic_message, DisabledFlag, DisabledProbe, StrategyHandle};
use crate::telemetry::{BotLog, UNKNOWN};

struct Entry {
    config: Arc<StrategyConfig>,
    /// `None` when construction failed; the bot stays absent for the life
    /// of the process.
    handle: Option<StrategyHandle>,
}

/// All configured bots in configuration order, with the handles of the ones
/// that could be constructed.
pub struct Registry {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    topics: TopicSet,
}

impl Registry {
    /// Build the registry from bot definitions.
    ///
    /// A bot with a duplicate name, a missing account or market, an unknown
    /// module or a failing factory is reported on the per-bot log and
    /// skipped; the remaining bots still load.
    pub fn build(
        bots: &[BotEntry],
        factories: &StrategyFactories,
        shared: &SharedContext,
        log: &BotLog,
    ) -> Self {
        let mut registry = Registry {
            entries: Vec::with_capacity(bots.len()),
            index: HashMap::new(),
            topics: TopicSet::default(),
        };

        for bot in bots {
            let account = bot.account.as_deref().unwrap_or(UNKNOWN);
            let market = bot.market.as_deref().unwrap_or(UNKNOWN);
            let rejected = log.logger(&bot.name, account, market, DisabledProbe::always_disabled());

            let config = match bot.validate() {
                Ok(config) => Arc::new(config),
                Err(e) => {
                    rejected.critical(e.to_string());
                    continue;
                }
            };

            // Only validated bots hold a name.
            if registry.index.contains_key(&config.name) {
                rejected.critical(Error::DuplicateBot(config.name.clone()).to_string());
                continue;
            }

            let handle = match construct(&config, factories, shared, log) {
                Ok(handle) => {
                    info!(
                        bot = %config.name,
                        account = %config.account,
                        market = %config.market,
                        module = %config.module,
                        "Registered bot"
                    );
                    registry.topics.insert(&config.account, &config.market);
                    Some(handle)
                }
                Err(e) => {
                    rejected.critical(e.to_string());
                    None
                }
            };

            registry
                .index
                .insert(config.name.clone(), registry.entries.len());
            registry.entries.push(Entry { config, handle });
        }

        if registry.topics.is_empty() {
            warn!(configured = bots.len(), "No bot could be constructed");
        }

        registry
    }

    /// Accounts and markets of the constructed bots.
    pub fn topics(&self) -> &TopicSet {
        &self.topics
    }

    /// Every bot that passed validation, including failed constructions.
    pub fn configs(&self) -> impl Iterator<Item = &StrategyConfig> {
        self.entries.iter().map(|e| e.config.as_ref())
    }

    pub fn config(&self, name: &str) -> Option<&StrategyConfig> {
        self.index.get(name).map(|&i| self.entries[i].config.as_ref())
    }

    pub fn handle(&self, name: &str) -> Option<&StrategyHandle> {
        self.index
            .get(name)
            .and_then(|&i| self.entries[i].handle.as_ref())
    }

    /// Constructed handles in configuration order.
    pub fn handles(&self) -> impl Iterator<Item = &StrategyHandle> {
        self.entries.iter().filter_map(|e| e.handle.as_ref())
    }

    pub fn handles_mut(&mut self) -> impl Iterator<Item = &mut StrategyHandle> {
        self.entries.iter_mut().filter_map(|e| e.handle.as_mut())
    }

    pub fn handle_names(&self) -> Vec<&str> {
        self.handles().map(StrategyHandle::name).collect()
    }

    /// Set a bot's disabled flag from outside. Returns the previous value,
    /// or `None` if the bot has no handle.
    pub fn set_disabled(&self, name: &str, disabled: bool) -> Option<bool> {
        self.handle(name).map(|h| h.set_disabled(disabled))
    }

    /// Number of configured bots (with or without a handle).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn construct(
    config: &Arc<StrategyConfig>,
    factories: &StrategyFactories,
    shared: &SharedContext,
    log: &BotLog,
) -> Result<StrategyHandle> {
    let factory = factories
        .resolve(&config.module)
        .ok_or_else(|| Error::UnknownModule {
            bot: config.name.clone(),
            module: config.module.clone(),
        })?;

    let disabled = DisabledFlag::new();
    let logger = log.logger(&config.name, &config.account, &config.market, disabled.probe());
    let ctx = BotContext {
        name: config.name.clone(),
        config: config.clone(),
        shared: shared.clone(),
        disabled: disabled.clone(),
        log: logger.clone(),
    };

    let built = panic::catch_unwind(AssertUnwindSafe(|| factory(ctx)))
        .unwrap_or_else(|payload| Err(StrategyError::Panicked(panic_message(payload))));
    let strategy = built.map_err(|source| Error::Construction {
        bot: config.name.clone(),
        source,
    })?;

    // A factory may not hand back a pre-disabled bot.
    disabled.enable();

    Ok(StrategyHandle::new(config.clone(), disabled, logger, strategy))
}
