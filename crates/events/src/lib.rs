//! Listcast event bus and user notifications.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`WorkflowEvent`]: the event envelope emitted by the publishing
//!   workflow.
//! - [`Notification`]: the user-visible toast an event maps to, and
//!   [`NotificationFeed`] which turns a subscription into a stream of them.

pub mod bus;
pub mod event_types;
pub mod notification;

pub use bus::{EventBus, WorkflowEvent};
pub use notification::{Notification, NotificationFeed, NotificationLevel};
