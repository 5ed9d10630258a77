use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{DomainEvent, LogNotifier, Notifier, ResultEngine};

mod access;
mod categories;
mod contacts;
mod expenses;
mod incomes;
mod ledger;
mod products;
mod purchases;
mod reports;
mod sales;
mod services;
mod stock;

pub use ledger::{MovementListFilter, MovementPage, ReconcileReport};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Hand committed events to the notifier.
    fn dispatch(&self, events: Vec<DomainEvent>) {
        for event in &events {
            self.notifier.notify(event);
        }
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    notifier: Option<Arc<dyn Notifier>>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Replace the default logging notifier.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> EngineBuilder {
        self.notifier = Some(notifier);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            notifier: self
                .notifier
                .unwrap_or_else(|| Arc::new(LogNotifier)),
        })
    }
}
