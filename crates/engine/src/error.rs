//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`Validation`] thrown when a command carries invalid fields.
//! - [`KeyNotFound`] thrown when an item is not found or not owned by the caller.
//! - [`ExistingKey`] thrown when a unique field collides with another record.
//! - [`StillReferenced`] thrown when a deletion would orphan dependent records.
//! - [`InsufficientStock`] thrown when a sale or purchase edit would drive stock negative.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`ExistingKey`]: EngineError::ExistingKey
//!  [`StillReferenced`]: EngineError::StillReferenced
//!  [`InsufficientStock`]: EngineError::InsufficientStock
use std::fmt;

use sea_orm::DbErr;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Field-level validation messages, keyed by field name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(Vec<FieldError>);

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Turn the collected messages into an error, or `Ok` when nothing was pushed.
    pub fn into_result(self) -> Result<(), EngineError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(EngineError::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// A product whose stock cannot cover the requested quantity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StockShortage {
    pub product_id: Uuid,
    pub product: String,
    pub available: i64,
    pub requested: i64,
}

fn shortages_message(shortages: &[StockShortage]) -> String {
    shortages
        .iter()
        .map(|s| {
            format!(
                "{} (available {}, requested {})",
                s.product, s.available, s.requested
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid fields: {0}")]
    Validation(FieldErrors),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("{entity} is still referenced by {count} record(s)")]
    StillReferenced { entity: String, count: u64 },
    #[error("Insufficient stock: {}", shortages_message(.0))]
    InsufficientStock(Vec<StockShortage>),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Shorthand for a single-field validation error.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::single(field, message))
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (
                Self::StillReferenced {
                    entity: a,
                    count: ca,
                },
                Self::StillReferenced {
                    entity: b,
                    count: cb,
                },
            ) => a == b && ca == cb,
            (Self::InsufficientStock(a), Self::InsufficientStock(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::InvalidCursor(a), Self::InvalidCursor(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_field_errors_are_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[test]
    fn field_errors_display_joins_messages() {
        let mut errors = FieldErrors::new();
        errors.push("name", "must not be empty");
        errors.push("price_minor", "must be >= 0");
        assert_eq!(
            errors.to_string(),
            "name: must not be empty; price_minor: must be >= 0"
        );
        assert!(matches!(
            errors.into_result(),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn insufficient_stock_message_lists_products() {
        let err = EngineError::InsufficientStock(vec![StockShortage {
            product_id: Uuid::nil(),
            product: "Widget".to_string(),
            available: 1,
            requested: 2,
        }]);
        assert_eq!(
            err.to_string(),
            "Insufficient stock: Widget (available 1, requested 2)"
        );
    }
}
