pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, NotifySource};
pub use error::{Error, Result, StrategyError};
pub use types::*;
