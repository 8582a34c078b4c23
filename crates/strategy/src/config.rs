use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use common::{Error, Result};

/// Top-level bot definitions file (TOML).
///
/// Example `config/bots.toml`:
/// ```toml
/// [runtime]
/// node = "wss://node.example.org"
///
/// [[bot]]
/// name = "usd-echo"
/// account = "alice"
/// market = "BTS:USD"
/// module = "echo"
///
/// [bot.params]
/// log_payload = true
/// ```
///
/// Bots are loaded in file order. `account` and `market` are optional at
/// this layer: a bot missing either is reported and skipped at registry
/// build time instead of failing the whole file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BotsFileConfig {
    #[serde(rename = "bot", default)]
    pub bots: Vec<BotEntry>,
    /// Free-form data shared with every strategy factory.
    #[serde(default)]
    pub runtime: toml::Table,
}

/// One `[[bot]]` table as written by the operator.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotEntry {
    pub name: String,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub market: Option<String>,
    /// Strategy identifier resolved through `StrategyFactories`.
    pub module: String,
    #[serde(default)]
    pub params: HashMap<String, toml::Value>,
}

/// A bot definition with every required binding present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyConfig {
    pub name: String,
    pub account: String,
    pub market: String,
    pub module: String,
    pub params: HashMap<String, toml::Value>,
}

impl BotsFileConfig {
    /// Load from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read bot config at '{path}': {e}"))
        })?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("failed to parse bot config at '{path}': {e}")))
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

impl BotEntry {
    pub fn new(name: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            account: None,
            market: None,
            module: module.into(),
            params: HashMap::new(),
        }
    }

    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn market(mut self, market: impl Into<String>) -> Self {
        self.market = Some(market.into());
        self
    }

    /// Check the required bindings. Account is checked before market.
    pub fn validate(&self) -> Result<StrategyConfig> {
        let account = self.account.clone().ok_or_else(|| Error::MissingField {
            bot: self.name.clone(),
            field: "account",
        })?;
        let market = self.market.clone().ok_or_else(|| Error::MissingField {
            bot: self.name.clone(),
            field: "market",
        })?;

        Ok(StrategyConfig {
            name: self.name.clone(),
            account,
            market,
            module: self.module.clone(),
            params: self.params.clone(),
        })
    }
}

impl StrategyConfig {
    pub fn param(&self, key: &str) -> Option<&toml::Value> {
        self.params.get(key)
    }

    pub fn param_bool(&self, key: &str, default: bool) -> bool {
        self.param(key).and_then(|v| v.as_bool()).unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [runtime]
        node = "wss://node.example.org"

        [[bot]]
        name = "A"
        account = "alice"
        market = "BTS:USD"
        module = "echo"

        [bot.params]
        log_payload = true

        [[bot]]
        name = "B"
        market = "BTS:EUR"
        module = "echo"
    "#;

    #[test]
    fn parses_bots_in_file_order() {
        let cfg = BotsFileConfig::parse(SAMPLE).unwrap();
        let names: Vec<_> = cfg.bots.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(cfg.runtime.get("node").and_then(|v| v.as_str()), Some("wss://node.example.org"));
        assert!(cfg.bots[1].account.is_none());
    }

    #[test]
    fn validate_reports_missing_account_before_market() {
        let entry = BotEntry::new("lonely", "echo");
        match entry.validate() {
            Err(Error::MissingField { field, .. }) => assert_eq!(field, "account"),
            other => panic!("unexpected: {other:?}"),
        }

        let entry = BotEntry::new("half", "echo").account("bob");
        match entry.validate() {
            Err(Error::MissingField { field, .. }) => assert_eq!(field, "market"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn params_are_readable_after_validation() {
        let cfg = BotsFileConfig::parse(SAMPLE).unwrap();
        let config = cfg.bots[0].validate().unwrap();
        assert!(config.param_bool("log_payload", false));
        assert!(!config.param_bool("missing", false));
    }

    #[test]
    fn load_reports_missing_file_as_config_error() {
        let err = BotsFileConfig::load("/nonexistent/bots.toml").unwrap_err();
        assert_eq!(err.exit_code(), 78);
    }
}
