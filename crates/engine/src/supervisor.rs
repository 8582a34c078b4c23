use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn};

use common::{Error, Result};
use strategy::{BotLog, BotsFileConfig, Dispatcher, Registry, SharedContext, StrategyFactories};

use crate::notifier::Notifier;
use crate::subscription::SubscriptionAdapter;

/// Lifecycle of the supervisor. There is no way back from `Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SupervisorState {
    #[default]
    Initializing,
    Ready,
    Listening,
    Terminated,
}

impl std::fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SupervisorState::Initializing => write!(f, "initializing"),
            SupervisorState::Ready => write!(f, "ready"),
            SupervisorState::Listening => write!(f, "listening"),
            SupervisorState::Terminated => write!(f, "terminated"),
        }
    }
}

/// Commands sent to a running supervisor. Applied between events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Disable(String),
    Enable(String),
}

impl FromStr for ControlCommand {
    type Err = Error;

    /// `disable <bot>` or `enable <bot>`.
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().splitn(2, char::is_whitespace);
        let verb = parts.next().unwrap_or_default();
        let name = parts.next().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            return Err(Error::Config(format!("control command needs a bot name: '{s}'")));
        }
        match verb.to_lowercase().as_str() {
            "disable" => Ok(ControlCommand::Disable(name.to_string())),
            "enable" => Ok(ControlCommand::Enable(name.to_string())),
            other => Err(Error::Config(format!("unknown control command '{other}'"))),
        }
    }
}

/// Cloneable handle for whoever manages the process.
#[derive(Clone)]
pub struct SupervisorHandle {
    command_tx: mpsc::Sender<ControlCommand>,
    state: Arc<RwLock<SupervisorState>>,
}

impl SupervisorHandle {
    pub async fn send(&self, cmd: ControlCommand) {
        let _ = self.command_tx.send(cmd).await;
    }

    pub async fn disable(&self, bot: impl Into<String>) {
        self.send(ControlCommand::Disable(bot.into())).await;
    }

    pub async fn enable(&self, bot: impl Into<String>) {
        self.send(ControlCommand::Enable(bot.into())).await;
    }

    pub async fn state(&self) -> SupervisorState {
        *self.state.read().await
    }
}

/// Builds the registry, opens the single upstream subscription and feeds
/// every event through the dispatcher until the feed ends.
pub struct Supervisor {
    bots: BotsFileConfig,
    factories: StrategyFactories,
    notifier: Arc<dyn Notifier>,
    log: BotLog,
    dispatcher: Dispatcher,
    event_buffer: usize,
    state: Arc<RwLock<SupervisorState>>,
    command_rx: mpsc::Receiver<ControlCommand>,
    #[allow(dead_code)] // kept to prevent channel close
    command_tx: mpsc::Sender<ControlCommand>,
}

impl Supervisor {
    pub fn new(
        bots: BotsFileConfig,
        factories: StrategyFactories,
        notifier: Arc<dyn Notifier>,
        log: BotLog,
    ) -> (Self, SupervisorHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let state = Arc::new(RwLock::new(SupervisorState::Initializing));

        let handle = SupervisorHandle {
            command_tx: command_tx.clone(),
            state: state.clone(),
        };

        let supervisor = Supervisor {
            bots,
            factories,
            notifier,
            log,
            dispatcher: Dispatcher::default(),
            event_buffer: SubscriptionAdapter::DEFAULT_BUFFER,
            state,
            command_rx,
            command_tx,
        };

        (supervisor, handle)
    }

    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn with_event_buffer(mut self, event_buffer: usize) -> Self {
        self.event_buffer = event_buffer;
        self
    }

    /// Run to completion. Returns `Ok` only when the upstream feed ends
    /// cleanly; every other exit is one of the fatal errors.
    pub async fn run(mut self) -> Result<()> {
        let outcome = self.drive().await;
        self.set_state(SupervisorState::Terminated).await;
        if let Err(e) = &outcome {
            debug_assert!(!e.is_recoverable(), "per-bot error escaped the registry: {e}");
            error!(error = %e, exit_code = e.exit_code(), "Supervisor terminated");
        }
        outcome
    }

    async fn drive(&mut self) -> Result<()> {
        self.set_state(SupervisorState::Initializing).await;
        let shared = SharedContext::new(self.bots.runtime.clone());
        let mut registry = Registry::build(&self.bots.bots, &self.factories, &shared, &self.log);

        if registry.topics().is_empty() {
            error!("No bots to launch, exiting");
            return Err(Error::NoViableBots);
        }
        info!(
            configured = self.bots.bots.len(),
            running = registry.handles().count(),
            "Registry ready"
        );

        let adapter = SubscriptionAdapter::new(self.notifier.clone(), self.event_buffer);
        let subscription = adapter.open(registry.topics()).await?;
        self.set_state(SupervisorState::Ready).await;

        let mut listener = subscription.start();
        self.set_state(SupervisorState::Listening).await;
        info!("Listening for notifications");

        loop {
            tokio::select! {
                Some(cmd) = self.command_rx.recv() => {
                    apply_command(&registry, cmd);
                }
                event = listener.next() => {
                    let Some(event) = event else { break };
                    let report = self.dispatcher.dispatch(&mut registry, &event);
                    debug!(
                        kind = %event.kind(),
                        delivered = report.delivered,
                        skipped = report.skipped_disabled,
                        failed = report.failed.len(),
                        "Event dispatched"
                    );
                }
            }
        }

        // Commands that arrived alongside the last events.
        while let Ok(cmd) = self.command_rx.try_recv() {
            apply_command(&registry, cmd);
        }

        let outcome = listener.finish().await;
        if outcome.is_ok() {
            info!("Upstream feed ended");
        }
        outcome
    }

    async fn set_state(&self, next: SupervisorState) {
        let mut state = self.state.write().await;
        debug!(from = %*state, to = %next, "Supervisor state change");
        *state = next;
    }
}

fn apply_command(registry: &Registry, cmd: ControlCommand) {
    let (name, disabled) = match &cmd {
        ControlCommand::Disable(name) => (name, true),
        ControlCommand::Enable(name) => (name, false),
    };

    match registry.handle(name) {
        Some(handle) => {
            let was = handle.set_disabled(disabled);
            if was != disabled {
                let verb = if disabled { "disabled" } else { "enabled" };
                handle.logger().info(format!("bot {verb} by operator"));
            }
        }
        None => warn!(bot = %name, ?cmd, "Control command for unknown or unconstructed bot"),
    }
}
