//! Movement ledger synchronization.
//!
//! Every path that writes a movement goes through this module: the record
//! operations insert, resync and delete their own movement here, inside the
//! caller's transaction.

use std::collections::{HashMap, HashSet};

use base64::Engine as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, Condition, ConnectionTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Movement, MovementKind, MovementSource, ResultEngine, clients, expenses,
    income_categories, incomes, movements, purchases, sales, suppliers,
    util::{normalize_optional_text, parse_uuid},
};

use super::{Engine, with_tx};

pub const MAX_PAGE_SIZE: u64 = 500;

const NO_CATEGORY: &str = "Sin categoría";
const WALK_IN_CLIENT: &str = "Cliente general";
const NO_SUPPLIER: &str = "Sin proveedor";

/// Movement description: the record's own text when it has one, otherwise
/// `"<Kind> - <label>"` with a per-kind fallback label.
pub(super) fn describe(kind: MovementKind, explicit: Option<&str>, label: Option<&str>) -> String {
    if let Some(text) = normalize_optional_text(explicit) {
        return text;
    }
    let fallback = match kind {
        MovementKind::Income | MovementKind::Expense => NO_CATEGORY,
        MovementKind::Sale => WALK_IN_CLIENT,
        MovementKind::Purchase => NO_SUPPLIER,
    };
    format!("{} - {}", kind.as_str(), label.unwrap_or(fallback))
}

/// The ledger view of one transactional record.
#[derive(Clone, Debug)]
pub(super) struct MovementDraft {
    pub source: MovementSource,
    pub occurred_at: DateTime<Utc>,
    pub amount_minor: i64,
    pub description: String,
}

async fn find_by_source<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    source: MovementSource,
) -> ResultEngine<Option<movements::Model>> {
    movements::Entity::find()
        .filter(movements::Column::UserId.eq(user_id))
        .filter(movements::Column::Kind.eq(source.kind().as_str()))
        .filter(movements::Column::SourceId.eq(source.id().to_string()))
        .one(db)
        .await
        .map_err(Into::into)
}

pub(super) async fn insert_movement<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    draft: MovementDraft,
) -> ResultEngine<Movement> {
    let movement = Movement {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        source: draft.source,
        occurred_at: draft.occurred_at,
        amount_minor: draft.amount_minor,
        description: Some(draft.description),
    };
    movements::ActiveModel::from(&movement).insert(db).await?;
    tracing::debug!(
        movement_id = %movement.id,
        kind = movement.kind().as_str(),
        source_id = %movement.source.id(),
        "movement created"
    );
    Ok(movement)
}

/// Bring the record's movement in line with `draft`, creating it when the
/// record has none.
pub(super) async fn sync_movement<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    draft: MovementDraft,
) -> ResultEngine<Movement> {
    let Some(existing) = find_by_source(db, user_id, draft.source).await? else {
        tracing::warn!(
            kind = draft.source.kind().as_str(),
            source_id = %draft.source.id(),
            "record had no movement, creating it"
        );
        return insert_movement(db, user_id, draft).await;
    };

    let model = movements::ActiveModel {
        id: ActiveValue::Unchanged(existing.id),
        occurred_at: ActiveValue::Set(draft.occurred_at),
        amount_minor: ActiveValue::Set(draft.amount_minor),
        description: ActiveValue::Set(Some(draft.description)),
        ..Default::default()
    }
    .update(db)
    .await?;
    Movement::try_from(model)
}

/// Remove every movement mirroring `source`.
pub(super) async fn delete_movements<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    source: MovementSource,
) -> ResultEngine<u64> {
    let result = movements::Entity::delete_many()
        .filter(movements::Column::UserId.eq(user_id))
        .filter(movements::Column::Kind.eq(source.kind().as_str()))
        .filter(movements::Column::SourceId.eq(source.id().to_string()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Filters for listing movements.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct MovementListFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// If present, acts as an allow-list of kinds to return.
    pub kinds: Option<Vec<MovementKind>>,
}

fn validate_list_filter(filter: &MovementListFilter, limit: u64) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::invalid("to", "must be after from"));
    }
    if filter.kinds.as_ref().is_some_and(|k| k.is_empty()) {
        return Err(EngineError::invalid("kinds", "must not be empty"));
    }
    if limit == 0 || limit > MAX_PAGE_SIZE {
        return Err(EngineError::invalid(
            "limit",
            format!("must be between 1 and {MAX_PAGE_SIZE}"),
        ));
    }
    Ok(())
}

trait ApplyMovementFilters: QueryFilter + Sized {
    fn apply_movement_filters(self, filter: &MovementListFilter) -> Self;
}

impl<T> ApplyMovementFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_movement_filters(mut self, filter: &MovementListFilter) -> Self {
        if let Some(from) = filter.from {
            self = self.filter(movements::Column::OccurredAt.gte(from));
        }
        if let Some(to) = filter.to {
            self = self.filter(movements::Column::OccurredAt.lt(to));
        }
        if let Some(kinds) = &filter.kinds {
            let kinds: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
            self = self.filter(movements::Column::Kind.is_in(kinds));
        }
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct MovementsCursor {
    occurred_at: DateTime<Utc>,
    movement_id: String,
}

impl MovementsCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid movements cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidCursor("invalid movements cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid movements cursor".to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MovementPage {
    pub items: Vec<Movement>,
    pub next_cursor: Option<String>,
}

/// Counts of repairs made by [`Engine::reconcile_ledger`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub created: u64,
    pub updated: u64,
    pub removed: u64,
}

impl Engine {
    /// Lists movements with cursor-based pagination.
    ///
    /// Pagination is newest → older by `(occurred_at DESC, id DESC)`.
    pub async fn list_movements(
        &self,
        user_id: &str,
        filter: &MovementListFilter,
        cursor: Option<&str>,
        limit: u64,
    ) -> ResultEngine<MovementPage> {
        validate_list_filter(filter, limit)?;

        let mut query = movements::Entity::find()
            .filter(movements::Column::UserId.eq(user_id))
            .order_by_desc(movements::Column::OccurredAt)
            .order_by_desc(movements::Column::Id)
            .limit(limit.saturating_add(1));

        if let Some(cursor) = cursor {
            let cursor = MovementsCursor::decode(cursor)?;
            query = query.filter(
                Condition::any()
                    .add(movements::Column::OccurredAt.lt(cursor.occurred_at))
                    .add(
                        Condition::all()
                            .add(movements::Column::OccurredAt.eq(cursor.occurred_at))
                            .add(movements::Column::Id.lt(cursor.movement_id)),
                    ),
            );
        }
        query = query.apply_movement_filters(filter);

        let rows = query.all(&self.database).await?;
        let has_more = rows.len() > limit as usize;

        let items = rows
            .into_iter()
            .take(limit as usize)
            .map(Movement::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        let next_cursor = if has_more {
            items
                .last()
                .map(|m| MovementsCursor {
                    occurred_at: m.occurred_at,
                    movement_id: m.id.to_string(),
                })
                .map(|c| c.encode())
                .transpose()?
        } else {
            None
        };

        Ok(MovementPage { items, next_cursor })
    }

    /// Rebuild the one-movement-per-record mapping for a user.
    ///
    /// Creates missing movements, realigns drifted dates and amounts, and
    /// deletes movements whose record no longer exists.
    ///
    /// Purchase-linked expenses are the one exception: they never get a
    /// movement, and any movement pointing at one is removed, because the
    /// purchase movement already carries that amount.
    pub async fn reconcile_ledger(&self, user_id: &str) -> ResultEngine<ReconcileReport> {
        with_tx!(self, |db_tx| {
            let expected = expected_movements(&db_tx, user_id).await?;

            let mut report = ReconcileReport::default();
            let mut seen: HashSet<MovementSource> = HashSet::new();
            let existing = movements::Entity::find()
                .filter(movements::Column::UserId.eq(user_id))
                .all(&db_tx)
                .await?;

            for model in existing {
                let movement = Movement::try_from(model)?;
                match expected.get(&movement.source) {
                    Some(draft) if seen.insert(movement.source) => {
                        if movement.occurred_at != draft.occurred_at
                            || movement.amount_minor != draft.amount_minor
                        {
                            movements::ActiveModel {
                                id: ActiveValue::Unchanged(movement.id.to_string()),
                                occurred_at: ActiveValue::Set(draft.occurred_at),
                                amount_minor: ActiveValue::Set(draft.amount_minor),
                                ..Default::default()
                            }
                            .update(&db_tx)
                            .await?;
                            report.updated += 1;
                        }
                    }
                    _ => {
                        movements::Entity::delete_by_id(movement.id.to_string())
                            .exec(&db_tx)
                            .await?;
                        report.removed += 1;
                    }
                }
            }

            for (source, draft) in &expected {
                if !seen.contains(source) {
                    insert_movement(&db_tx, user_id, draft.clone()).await?;
                    report.created += 1;
                }
            }

            if report != ReconcileReport::default() {
                tracing::warn!(
                    %user_id,
                    created = report.created,
                    updated = report.updated,
                    removed = report.removed,
                    "ledger reconciled"
                );
            }
            Ok(report)
        })
    }
}

/// The movement every live record should have.
async fn expected_movements<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
) -> ResultEngine<HashMap<MovementSource, MovementDraft>> {
    let category_names: HashMap<String, String> = income_categories::Entity::find()
        .filter(income_categories::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();
    let client_names: HashMap<String, String> = clients::Entity::find()
        .filter(clients::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();
    let supplier_names: HashMap<String, String> = suppliers::Entity::find()
        .filter(suppliers::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();

    let mut expected = HashMap::new();

    for income in incomes::Entity::find()
        .filter(incomes::Column::UserId.eq(user_id))
        .all(db)
        .await?
    {
        let label = income
            .category_id
            .as_ref()
            .and_then(|id| category_names.get(id))
            .map(String::as_str);
        let source = MovementSource::Income(parse_uuid(&income.id, "income")?);
        expected.insert(
            source,
            MovementDraft {
                source,
                occurred_at: income.occurred_at,
                amount_minor: income.amount_minor,
                description: describe(MovementKind::Income, income.description.as_deref(), label),
            },
        );
    }

    for expense in expenses::Entity::find()
        .filter(expenses::Column::UserId.eq(user_id))
        .filter(expenses::Column::PurchaseId.is_null())
        .all(db)
        .await?
    {
        let source = MovementSource::Expense(parse_uuid(&expense.id, "expense")?);
        expected.insert(
            source,
            MovementDraft {
                source,
                occurred_at: expense.occurred_at,
                amount_minor: expense.amount_minor,
                description: describe(
                    MovementKind::Expense,
                    expense.description.as_deref(),
                    Some(&expense.category),
                ),
            },
        );
    }

    for sale in sales::Entity::find()
        .filter(sales::Column::UserId.eq(user_id))
        .all(db)
        .await?
    {
        let label = sale
            .client_id
            .as_ref()
            .and_then(|id| client_names.get(id))
            .map(String::as_str);
        let source = MovementSource::Sale(parse_uuid(&sale.id, "sale")?);
        expected.insert(
            source,
            MovementDraft {
                source,
                occurred_at: sale.occurred_at,
                amount_minor: sale.amount_minor,
                description: describe(MovementKind::Sale, None, label),
            },
        );
    }

    for purchase in purchases::Entity::find()
        .filter(purchases::Column::UserId.eq(user_id))
        .all(db)
        .await?
    {
        let label = purchase
            .supplier_id
            .as_ref()
            .and_then(|id| supplier_names.get(id))
            .map(String::as_str);
        let source = MovementSource::Purchase(parse_uuid(&purchase.id, "purchase")?);
        expected.insert(
            source,
            MovementDraft {
                source,
                occurred_at: purchase.occurred_at,
                amount_minor: purchase.amount_minor,
                description: describe(
                    MovementKind::Purchase,
                    purchase.description.as_deref(),
                    label,
                ),
            },
        );
    }

    Ok(expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_prefers_explicit_text() {
        assert_eq!(
            describe(MovementKind::Income, Some(" Pago factura 12 "), Some("Ventas")),
            "Pago factura 12"
        );
    }

    #[test]
    fn describe_builds_kind_label() {
        assert_eq!(
            describe(MovementKind::Income, None, Some("Consultoría")),
            "Ingreso - Consultoría"
        );
        assert_eq!(describe(MovementKind::Income, Some(""), None), "Ingreso - Sin categoría");
        assert_eq!(describe(MovementKind::Sale, None, None), "Venta - Cliente general");
        assert_eq!(describe(MovementKind::Purchase, None, None), "Compra - Sin proveedor");
    }

    #[test]
    fn cursor_round_trip_and_garbage() {
        let cursor = MovementsCursor {
            occurred_at: Utc::now(),
            movement_id: Uuid::new_v4().to_string(),
        };
        let decoded = MovementsCursor::decode(&cursor.encode().unwrap()).unwrap();
        assert_eq!(decoded.movement_id, cursor.movement_id);
        assert!(matches!(
            MovementsCursor::decode("not base64 !"),
            Err(EngineError::InvalidCursor(_))
        ));
    }
}
