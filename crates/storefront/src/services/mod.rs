//! Services used around checkout.
//!
//! # Services
//!
//! - `notifications` - Admin and customer notifications after an order is placed
pub mod notifications;

pub use notifications::{LogNotifier, NewOrderNotification, Notifier, NotifyError, WebhookNotifier};
