use std::collections::BTreeMap;
use std::sync::Arc;

use common::StrategyError;

use crate::builtin;
use crate::config::StrategyConfig;
use crate::handle::DisabledFlag;
use crate::telemetry::BotLogger;
use crate::Strategy;

/// Read-only runtime data shared by every bot (the `[runtime]` table of
/// the bots file).
#[derive(Debug, Clone, Default)]
pub struct SharedContext {
    runtime: Arc<toml::Table>,
}

impl SharedContext {
    pub fn new(runtime: toml::Table) -> Self {
        Self {
            runtime: Arc::new(runtime),
        }
    }

    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.runtime.get(key)
    }
}

/// Everything a factory receives to build one bot.
pub struct BotContext {
    pub name: String,
    pub config: Arc<StrategyConfig>,
    pub shared: SharedContext,
    /// The bot's own switch; keep a clone to self-disable.
    pub disabled: DisabledFlag,
    pub log: BotLogger,
}

pub type StrategyFactory =
    Arc<dyn Fn(BotContext) -> Result<Box<dyn Strategy>, StrategyError> + Send + Sync>;

/// Table of known strategy implementations, keyed by the `module` value of
/// a bot definition.
#[derive(Clone, Default)]
pub struct StrategyFactories {
    factories: BTreeMap<String, StrategyFactory>,
}

impl StrategyFactories {
    pub fn new() -> Self {
        Self::default()
    }

    /// The strategies shipped with this crate.
    pub fn with_builtins() -> Self {
        let mut factories = Self::new();
        factories.register(builtin::echo::MODULE, builtin::echo::build);
        factories.register(builtin::storage_demo::MODULE, builtin::storage_demo::build);
        factories
    }

    /// Register a factory. A later registration under the same id wins.
    pub fn register<F>(&mut self, module: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(BotContext) -> Result<Box<dyn Strategy>, StrategyError> + Send + Sync + 'static,
    {
        self.factories.insert(module.into(), Arc::new(factory));
        self
    }

    pub fn resolve(&self, module: &str) -> Option<&StrategyFactory> {
        self.factories.get(module)
    }

    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}
