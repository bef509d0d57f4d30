//! Webhook events from the quality server and the listeners that consume them

pub mod payload;
pub mod registry;

pub use payload::{parse_payload, TaskCompleted};
pub use registry::{DispatchReport, ListenerId, ListenerRegistry, Subscription, TaskListener};
