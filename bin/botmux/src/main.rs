use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use common::{Config, NotifySource, Result};
use engine::{ControlCommand, Notifier, ReplayNotifier, Supervisor, SupervisorHandle, WsNotifier};
use strategy::{BotLog, BotsFileConfig, Dispatcher, StrategyFactories};

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %e, "botmux exiting");
            e.exit_code()
        }
    };
    std::process::exit(code);
}

async fn run() -> Result<()> {
    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env()?;
    let bots = BotsFileConfig::load(&cfg.bots_config_path)?;
    info!(
        path = %cfg.bots_config_path,
        bots = bots.bots.len(),
        "botmux starting"
    );

    // ── Upstream ──────────────────────────────────────────────────────────────
    let notifier: Arc<dyn Notifier> = match &cfg.notify_source {
        NotifySource::WebSocket(url) => {
            info!(url = %url, "Live notifications over WebSocket");
            Arc::new(WsNotifier::new(url.clone()))
        }
        NotifySource::Replay(path) => {
            info!(path = %path, "Replaying recorded notifications");
            Arc::new(ReplayNotifier::from_file(path.clone()))
        }
    };

    // ── Supervisor ────────────────────────────────────────────────────────────
    let (supervisor, handle) = Supervisor::new(
        bots,
        StrategyFactories::with_builtins(),
        notifier,
        BotLog::new(cfg.telemetry_buffer),
    );
    let supervisor = supervisor
        .with_dispatcher(Dispatcher::new(cfg.slow_handler_threshold))
        .with_event_buffer(cfg.event_buffer);

    tokio::spawn(forward_stdin(handle));

    tokio::select! {
        outcome = supervisor.run() => outcome,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting.");
            Ok(())
        }
    }
}

/// Operator control: one `disable <bot>` / `enable <bot>` per stdin line.
async fn forward_stdin(handle: SupervisorHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => match line.parse::<ControlCommand>() {
                Ok(cmd) => handle.send(cmd).await,
                Err(e) => warn!(error = %e, "Ignoring control input"),
            },
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "Control input unreadable, ignoring stdin");
                return;
            }
        }
    }
}
