use std::collections::BTreeMap;

use sea_orm::{ConnectionTrait, QueryFilter, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{DomainEvent, EngineError, ResultEngine, StockShortage, products};

use super::access::require_product;

/// Apply per-product stock deltas inside the caller's transaction.
///
/// Increments only fail when the new total would not fit in an `i64`.
/// Decrements only match rows that still hold
/// enough units, so concurrent writers can never drive stock negative. Every
/// short product is reported; the caller's transaction is then abandoned.
///
/// Returns a `StockDepleted` event for each product left at zero.
pub(super) async fn apply_stock_deltas<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    deltas: &BTreeMap<Uuid, i64>,
) -> ResultEngine<Vec<DomainEvent>> {
    let mut shortages = Vec::new();
    let mut depleted = Vec::new();

    for (&product_id, &delta) in deltas {
        if delta > 0 {
            let result = products::Entity::update_many()
                .col_expr(
                    products::Column::Quantity,
                    Expr::col(products::Column::Quantity).add(delta),
                )
                .filter(products::Column::Id.eq(product_id.to_string()))
                .filter(products::Column::UserId.eq(user_id))
                .filter(products::Column::Quantity.lte(i64::MAX - delta))
                .exec(db)
                .await?;
            if result.rows_affected == 0 {
                let product = require_product(db, user_id, product_id).await?;
                return Err(EngineError::invalid(
                    "quantity",
                    format!("stock of {} out of range", product.name),
                ));
            }
            continue;
        }

        let requested = -delta;
        let result = products::Entity::update_many()
            .col_expr(
                products::Column::Quantity,
                Expr::col(products::Column::Quantity).sub(requested),
            )
            .filter(products::Column::Id.eq(product_id.to_string()))
            .filter(products::Column::UserId.eq(user_id))
            .filter(products::Column::Quantity.gte(requested))
            .exec(db)
            .await?;

        let product = require_product(db, user_id, product_id).await?;
        if result.rows_affected == 0 {
            shortages.push(StockShortage {
                product_id,
                product: product.name,
                available: product.quantity,
                requested,
            });
        } else if product.quantity == 0 {
            depleted.push(DomainEvent::StockDepleted {
                user_id: user_id.to_string(),
                product_id,
                product: product.name,
            });
        }
    }

    if !shortages.is_empty() {
        return Err(EngineError::InsufficientStock(shortages));
    }
    if !deltas.is_empty() {
        tracing::debug!(products = deltas.len(), "stock adjusted");
    }
    Ok(depleted)
}

#[cfg(test)]
mod tests {
    use migration::MigratorTrait;
    use sea_orm::{Database, TransactionTrait};

    use super::*;
    use crate::{Engine, ProductCmd};

    async fn engine() -> Engine {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let engine = Engine::builder().database(db).build().await.unwrap();
        engine.create_user("alice", "password").await.unwrap();
        engine
    }

    async fn quantity(engine: &Engine, product_id: Uuid) -> i64 {
        engine.get_product("alice", product_id).await.unwrap().quantity
    }

    #[tokio::test]
    async fn conditional_decrement_reports_every_short_product() {
        let engine = engine().await;
        let widget = engine
            .create_product(ProductCmd::new("alice", "Widget", 10, 3))
            .await
            .unwrap();
        let gadget = engine
            .create_product(ProductCmd::new("alice", "Gadget", 10, 4))
            .await
            .unwrap();
        let deltas = BTreeMap::from([(widget.id, -5), (gadget.id, -1)]);

        let tx = engine.database.begin().await.unwrap();
        let err = apply_stock_deltas(&tx, "alice", &deltas).await.unwrap_err();
        tx.rollback().await.unwrap();

        let EngineError::InsufficientStock(shortages) = err else {
            panic!("expected insufficient stock, got {err:?}");
        };
        assert_eq!(shortages.len(), 1);
        assert_eq!(shortages[0].product_id, widget.id);
        assert_eq!(shortages[0].available, 3);
        assert_eq!(shortages[0].requested, 5);
        assert_eq!(quantity(&engine, widget.id).await, 3);
        assert_eq!(quantity(&engine, gadget.id).await, 4);
    }

    #[tokio::test]
    async fn decrement_to_zero_reports_depletion() {
        let engine = engine().await;
        let widget = engine
            .create_product(ProductCmd::new("alice", "Widget", 10, 2))
            .await
            .unwrap();

        let events = apply_stock_deltas(&engine.database, "alice", &BTreeMap::from([(widget.id, -2)]))
            .await
            .unwrap();

        assert_eq!(
            events,
            vec![DomainEvent::StockDepleted {
                user_id: "alice".to_string(),
                product_id: widget.id,
                product: "Widget".to_string(),
            }]
        );
        assert_eq!(quantity(&engine, widget.id).await, 0);
    }

    #[tokio::test]
    async fn increment_past_i64_is_rejected() {
        let engine = engine().await;
        let widget = engine
            .create_product(ProductCmd::new("alice", "Widget", 10, i64::MAX - 1))
            .await
            .unwrap();

        let err = apply_stock_deltas(&engine.database, "alice", &BTreeMap::from([(widget.id, 2)]))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(quantity(&engine, widget.id).await, i64::MAX - 1);

        let missing = apply_stock_deltas(&engine.database, "alice", &BTreeMap::from([(Uuid::new_v4(), 1)]))
            .await
            .unwrap_err();
        assert!(matches!(missing, EngineError::KeyNotFound(_)));
    }
}
