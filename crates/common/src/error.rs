use thiserror::Error;

use crate::EventKind;

/// Exit status for "no viable bots" (EX_SOFTWARE in sysexits.h).
pub const EXIT_NO_VIABLE_BOTS: i32 = 70;
/// Upstream could not be reached when opening the subscription (EX_UNAVAILABLE).
pub const EXIT_SUBSCRIPTION: i32 = 69;
/// Upstream feed failed while listening (EX_IOERR).
pub const EXIT_FEED_LOST: i32 = 74;
/// Environment or bot file is unusable (EX_CONFIG).
pub const EXIT_CONFIG: i32 = 78;

#[derive(Debug, Error)]
pub enum Error {
    #[error("bot '{bot}' has no {field}")]
    MissingField { bot: String, field: &'static str },

    #[error("bot name '{0}' is configured more than once")]
    DuplicateBot(String),

    #[error("bot '{bot}' references unknown strategy module '{module}'")]
    UnknownModule { bot: String, module: String },

    #[error("bot '{bot}' failed to initialise: {source}")]
    Construction {
        bot: String,
        #[source]
        source: StrategyError,
    },

    #[error("bot '{bot}' failed in {kind}: {source}")]
    Handler {
        bot: String,
        kind: EventKind,
        #[source]
        source: StrategyError,
    },

    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("Upstream feed lost: {0}")]
    FeedLost(String),

    #[error("No bots to launch")]
    NoViableBots,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit status for errors that terminate the supervisor.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::NoViableBots => EXIT_NO_VIABLE_BOTS,
            Error::Subscription(_) => EXIT_SUBSCRIPTION,
            Error::FeedLost(_) | Error::Io(_) => EXIT_FEED_LOST,
            Error::Config(_) | Error::Json(_) => EXIT_CONFIG,
            _ => 1,
        }
    }

    /// Recoverable errors are handled where they occur and never cross
    /// the supervisor boundary.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::MissingField { .. }
                | Error::DuplicateBot(_)
                | Error::UnknownModule { .. }
                | Error::Construction { .. }
                | Error::Handler { .. }
        )
    }
}

/// Failure raised by a strategy factory or event handler.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("{0}")]
    Failed(String),

    #[error("panicked: {0}")]
    Panicked(String),

    /// Displays the whole context chain.
    #[error("{0:#}")]
    Other(#[from] anyhow::Error),
}

impl StrategyError {
    pub fn failed(msg: impl Into<String>) -> Self {
        StrategyError::Failed(msg.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
