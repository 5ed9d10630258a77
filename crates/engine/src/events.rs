//! Domain events emitted after a write commits.
//!
//! Delivery is delegated to a [`Notifier`]; the engine never waits on it and
//! a failing notifier cannot undo a committed write.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A product reached zero units on hand.
    StockDepleted {
        user_id: String,
        product_id: Uuid,
        product: String,
    },
}

pub trait Notifier: Send + Sync + fmt::Debug {
    fn notify(&self, event: &DomainEvent);
}

/// Default notifier: writes events to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &DomainEvent) {
        match event {
            DomainEvent::StockDepleted {
                user_id,
                product_id,
                product,
            } => {
                tracing::warn!(%user_id, %product_id, %product, "product out of stock");
            }
        }
    }
}
