use std::time::{Duration, Instant};

use tracing::debug;

use common::{Error, Event, EventKind};

use crate::registry::Registry;

/// Outcome of routing one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handler calls that returned successfully.
    pub delivered: usize,
    pub skipped_disabled: usize,
    /// Names of bots whose handler failed, in dispatch order.
    pub failed: Vec<String>,
}

/// Routes each event to the enabled bots whose binding matches it.
///
/// Handlers run synchronously, one bot after the other in configuration
/// order. A failing or panicking handler is reported against its bot and
/// dispatch moves on; the event is never redelivered.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    slow_handler_threshold: Duration,
}

impl Dispatcher {
    pub const DEFAULT_SLOW_HANDLER: Duration = Duration::from_millis(500);

    pub fn new(slow_handler_threshold: Duration) -> Self {
        Self {
            slow_handler_threshold,
        }
    }

    pub fn dispatch(&self, registry: &mut Registry, event: &Event) -> DispatchReport {
        let mut report = DispatchReport::default();

        if let Event::Market(m) = event {
            if m.deleted {
                debug!(market = %m.market, "Dropping deleted market entry");
                return report;
            }
        }

        let kind = event.kind();
        for handle in registry.handles_mut() {
            if handle.is_disabled() {
                report.skipped_disabled += 1;
                if kind == EventKind::AccountUpdate {
                    handle.logger().info("bot disabled");
                }
                continue;
            }

            let started = Instant::now();
            let outcome = match event {
                Event::Block(block) => handle.on_tick(block),
                Event::Market(m) if handle.config().market == m.market => {
                    handle.on_market_update(m)
                }
                Event::Account(a) if handle.config().account == a.account => {
                    handle.on_account_update(a)
                }
                _ => continue,
            };

            let elapsed = started.elapsed();
            if elapsed > self.slow_handler_threshold {
                handle.logger().warn(format!(
                    "{kind} took {}ms (threshold {}ms)",
                    elapsed.as_millis(),
                    self.slow_handler_threshold.as_millis()
                ));
            }

            match outcome {
                Ok(()) => report.delivered += 1,
                Err(source) => {
                    handle.report_error(kind, &source);
                    let err = Error::Handler {
                        bot: handle.name().to_string(),
                        kind,
                        source,
                    };
                    handle.logger().error(err.to_string());
                    report.failed.push(handle.name().to_string());
                }
            }
        }

        report
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SLOW_HANDLER)
    }
}
