use proptest::prelude::*;
use strategy::{BotEntry, BotLog, Registry, SharedContext, Strategy as Bot, StrategyFactories};

struct Idle;
impl Bot for Idle {}

fn factories() -> StrategyFactories {
    let mut f = StrategyFactories::with_builtins();
    f.register("idle", |_ctx| Ok(Box::new(Idle) as Box<dyn Bot>));
    f.register("broken", |_ctx| Err(common::StrategyError::failed("refused")));
    f
}

fn bot_entry() -> impl Strategy<Value = BotEntry> {
    (
        0usize..6,
        proptest::option::weighted(0.8, prop::sample::select(vec!["alice", "bob", "carol"])),
        proptest::option::weighted(0.8, prop::sample::select(vec!["BTS:USD", "BTS:EUR"])),
        prop::sample::select(vec!["idle", "echo", "broken", "missing"]),
    )
        .prop_map(|(n, account, market, module)| {
            let mut entry = BotEntry::new(format!("bot-{n}"), module);
            entry.account = account.map(str::to_string);
            entry.market = market.map(str::to_string);
            entry
        })
}

fn build(bots: &[BotEntry]) -> Registry {
    Registry::build(bots, &factories(), &SharedContext::default(), &BotLog::new(256))
}

proptest! {
    /// Bots missing a binding never get a handle and never claim their
    /// name; the first complete bot with a name is the one registered.
    #[test]
    fn incomplete_bots_never_block_complete_ones(bots in prop::collection::vec(bot_entry(), 0..12)) {
        let registry = build(&bots);
        let complete = |bot: &BotEntry| bot.account.is_some() && bot.market.is_some();

        let mut claimed = std::collections::HashSet::new();
        for bot in &bots {
            if !complete(bot) {
                if !bots.iter().any(|b| b.name == bot.name && complete(b)) {
                    prop_assert!(registry.handle(&bot.name).is_none());
                    prop_assert!(registry.config(&bot.name).is_none());
                }
                continue;
            }
            if !claimed.insert(bot.name.clone()) {
                continue;
            }

            let config = registry.config(&bot.name);
            prop_assert!(config.is_some());
            prop_assert_eq!(Some(&config.unwrap().account), bot.account.as_ref());

            if bot.module == "idle" || bot.module == "echo" {
                let handle = registry.handle(&bot.name);
                prop_assert!(handle.is_some());
                prop_assert!(!handle.unwrap().is_disabled());
            }
        }
    }

    /// Every handle has a config, and the topic set is exactly the bindings
    /// of the constructed bots.
    #[test]
    fn topics_match_constructed_handles(bots in prop::collection::vec(bot_entry(), 0..12)) {
        let registry = build(&bots);

        let mut accounts = std::collections::BTreeSet::new();
        let mut markets = std::collections::BTreeSet::new();
        for handle in registry.handles() {
            prop_assert!(registry.config(handle.name()).is_some());
            accounts.insert(handle.config().account.clone());
            markets.insert(handle.config().market.clone());
        }
        prop_assert_eq!(&registry.topics().accounts, &accounts);
        prop_assert_eq!(&registry.topics().markets, &markets);
        prop_assert_eq!(registry.topics().is_empty(), registry.handles().count() == 0);
    }

    /// Building twice from the same definitions gives the same result.
    #[test]
    fn build_is_deterministic(bots in prop::collection::vec(bot_entry(), 0..12)) {
        let first = build(&bots);
        let second = build(&bots);

        prop_assert_eq!(first.handle_names(), second.handle_names());
        prop_assert_eq!(first.topics(), second.topics());
        let first_configs: Vec<_> = first.configs().map(|c| c.name.clone()).collect();
        let second_configs: Vec<_> = second.configs().map(|c| c.name.clone()).collect();
        prop_assert_eq!(first_configs, second_configs);
    }
}
