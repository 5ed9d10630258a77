//! The unified ledger.
//!
//! A `Movement` mirrors exactly one transactional record. The record it
//! mirrors is a `MovementSource`, stored as `(kind, source_id)` under a unique
//! index so no record can be mirrored twice.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementKind {
    #[serde(rename = "Ingreso")]
    Income,
    #[serde(rename = "Egreso")]
    Expense,
    #[serde(rename = "Venta")]
    Sale,
    #[serde(rename = "Compra")]
    Purchase,
}

impl MovementKind {
    pub const ALL: [MovementKind; 4] = [Self::Income, Self::Expense, Self::Sale, Self::Purchase];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "Ingreso",
            Self::Expense => "Egreso",
            Self::Sale => "Venta",
            Self::Purchase => "Compra",
        }
    }

    /// Income-like movements add to the balance, the rest subtract.
    pub fn is_income_like(self) -> bool {
        matches!(self, Self::Income | Self::Sale)
    }
}

impl TryFrom<&str> for MovementKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "Ingreso" => Ok(Self::Income),
            "Egreso" => Ok(Self::Expense),
            "Venta" => Ok(Self::Sale),
            "Compra" => Ok(Self::Purchase),
            other => Err(EngineError::invalid(
                "kind",
                format!("invalid movement kind: {other}"),
            )),
        }
    }
}

/// The transactional record a movement mirrors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum MovementSource {
    Income(Uuid),
    Expense(Uuid),
    Sale(Uuid),
    Purchase(Uuid),
}

impl MovementSource {
    pub fn kind(self) -> MovementKind {
        match self {
            Self::Income(_) => MovementKind::Income,
            Self::Expense(_) => MovementKind::Expense,
            Self::Sale(_) => MovementKind::Sale,
            Self::Purchase(_) => MovementKind::Purchase,
        }
    }

    pub fn id(self) -> Uuid {
        match self {
            Self::Income(id) | Self::Expense(id) | Self::Sale(id) | Self::Purchase(id) => id,
        }
    }

    pub fn from_parts(kind: MovementKind, id: Uuid) -> Self {
        match kind {
            MovementKind::Income => Self::Income(id),
            MovementKind::Expense => Self::Expense(id),
            MovementKind::Sale => Self::Sale(id),
            MovementKind::Purchase => Self::Purchase(id),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: Uuid,
    pub user_id: String,
    pub source: MovementSource,
    pub occurred_at: DateTime<Utc>,
    pub amount_minor: i64,
    pub description: Option<String>,
}

impl Movement {
    pub fn kind(&self) -> MovementKind {
        self.source.kind()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub occurred_at: DateTimeUtc,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub source_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Movement> for ActiveModel {
    fn from(movement: &Movement) -> Self {
        Self {
            id: ActiveValue::Set(movement.id.to_string()),
            user_id: ActiveValue::Set(movement.user_id.clone()),
            kind: ActiveValue::Set(movement.kind().as_str().to_string()),
            occurred_at: ActiveValue::Set(movement.occurred_at),
            amount_minor: ActiveValue::Set(movement.amount_minor),
            description: ActiveValue::Set(movement.description.clone()),
            source_id: ActiveValue::Set(movement.source.id().to_string()),
        }
    }
}

impl TryFrom<Model> for Movement {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let kind = MovementKind::try_from(model.kind.as_str())?;
        let source_id = parse_uuid(&model.source_id, "movement source")?;
        Ok(Self {
            id: parse_uuid(&model.id, "movement")?,
            user_id: model.user_id,
            source: MovementSource::from_parts(kind, source_id),
            occurred_at: model.occurred_at,
            amount_minor: model.amount_minor,
            description: model.description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_storage_labels() {
        for kind in MovementKind::ALL {
            assert_eq!(MovementKind::try_from(kind.as_str()), Ok(kind));
        }
        assert!(MovementKind::try_from("Transfer").is_err());
    }

    #[test]
    fn source_determines_kind() {
        let id = Uuid::new_v4();
        assert_eq!(MovementSource::Sale(id).kind(), MovementKind::Sale);
        assert_eq!(MovementSource::Purchase(id).id(), id);
        assert_eq!(
            MovementSource::from_parts(MovementKind::Expense, id),
            MovementSource::Expense(id)
        );
    }

    #[test]
    fn sales_and_incomes_are_income_like() {
        assert!(MovementKind::Sale.is_income_like());
        assert!(!MovementKind::Purchase.is_income_like());
        assert!(MovementKind::Income.is_income_like());
        assert!(!MovementKind::Expense.is_income_like());
    }
}
