pub mod notifier;
pub mod replay;
pub mod subscription;
pub mod supervisor;
pub mod ws;

pub use notifier::{EventSink, Feed, Notifier};
pub use replay::ReplayNotifier;
pub use subscription::{Listener, Subscription, SubscriptionAdapter};
pub use supervisor::{ControlCommand, Supervisor, SupervisorHandle, SupervisorState};
pub use ws::WsNotifier;
