//! Purchases of stock and their mirrored expense.
//!
//! A purchase carries exactly one expense row (category `Compra`) tied to it
//! by `purchase_id`. That expense is kept in step with the purchase and has
//! no movement of its own; the purchase movement already accounts for it.

use std::collections::{BTreeMap, HashMap, HashSet};

use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    DateRange, EngineError, Expense, FieldErrors, MovementKind, MovementSource,
    PURCHASE_EXPENSE_CATEGORY, Purchase, PurchaseCmd, PurchaseLine, PurchaseLineCmd, ResultEngine,
    UpdatePurchaseCmd, expenses, purchase_lines, purchases,
    stock::{quantities_by_product, stock_deltas},
    suppliers,
    util::{apply_optional_id_patch, apply_optional_text_patch, normalize_optional_text, parse_uuid},
};

use super::{
    Engine,
    access::{require_product, require_purchase, require_supplier},
    ledger::{MovementDraft, delete_movements, describe, insert_movement, sync_movement},
    stock::apply_stock_deltas,
    with_tx,
};

fn lines_from(cmds: &[PurchaseLineCmd]) -> Vec<PurchaseLine> {
    cmds.iter()
        .map(|l| PurchaseLine {
            id: Uuid::new_v4(),
            product_id: l.product_id,
            quantity: l.quantity,
            unit_price_minor: l.unit_price_minor,
        })
        .collect()
}

fn check_lines(lines: &[PurchaseLine]) -> ResultEngine<()> {
    let mut errors = FieldErrors::new();
    if lines.iter().any(|l| l.quantity <= 0) {
        errors.push("lines", "quantity must be > 0");
    }
    if lines.iter().any(|l| l.unit_price_minor < 0) {
        errors.push("lines", "unit_price_minor must be >= 0");
    }
    errors.into_result()
}

/// Sum of quantity times unit price over all lines.
fn lines_total(lines: &[PurchaseLine]) -> ResultEngine<i64> {
    lines
        .iter()
        .try_fold(0i64, |acc, l| {
            l.quantity
                .checked_mul(l.unit_price_minor)
                .and_then(|v| acc.checked_add(v))
        })
        .ok_or_else(|| EngineError::invalid("lines", "total overflows"))
}

fn bought_quantities(lines: &[PurchaseLine]) -> ResultEngine<BTreeMap<Uuid, i64>> {
    quantities_by_product(lines.iter().map(|l| (l.product_id, l.quantity)))
        .ok_or_else(|| EngineError::invalid("lines", "quantity total out of range"))
}

async fn check_products<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    lines: &[PurchaseLine],
) -> ResultEngine<()> {
    let ids: HashSet<Uuid> = lines.iter().map(|l| l.product_id).collect();
    for product_id in ids {
        require_product(db, user_id, product_id).await?;
    }
    Ok(())
}

async fn supplier_name<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    supplier_id: Option<Uuid>,
) -> ResultEngine<Option<String>> {
    match supplier_id {
        Some(id) => Ok(Some(require_supplier(db, user_id, id).await?.name)),
        None => Ok(None),
    }
}

fn purchase_draft(purchase: &Purchase) -> MovementDraft {
    MovementDraft {
        source: MovementSource::Purchase(purchase.id),
        occurred_at: purchase.occurred_at,
        amount_minor: purchase.amount_minor,
        description: describe(
            MovementKind::Purchase,
            purchase.description.as_deref(),
            purchase.supplier_name.as_deref(),
        ),
    }
}

fn mirrored_expense(purchase: &Purchase, expense_id: Uuid) -> Expense {
    Expense {
        id: expense_id,
        user_id: purchase.user_id.clone(),
        occurred_at: purchase.occurred_at,
        amount_minor: purchase.amount_minor,
        category: PURCHASE_EXPENSE_CATEGORY.to_string(),
        description: purchase.description.clone(),
        category_id: None,
        purchase_id: Some(purchase.id),
    }
}

async fn insert_lines<C: ConnectionTrait>(
    db: &C,
    purchase_id: Uuid,
    lines: &[PurchaseLine],
) -> ResultEngine<()> {
    for line in lines {
        purchase_lines::active_model(purchase_id, line)
            .insert(db)
            .await?;
    }
    Ok(())
}

async fn find_expense_id<C: ConnectionTrait>(
    db: &C,
    purchase_id: Uuid,
) -> ResultEngine<Option<Uuid>> {
    expenses::Entity::find()
        .filter(expenses::Column::PurchaseId.eq(purchase_id.to_string()))
        .one(db)
        .await?
        .map(|e| parse_uuid(&e.id, "expense"))
        .transpose()
}

async fn load_purchase<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    purchase_id: Uuid,
) -> ResultEngine<Purchase> {
    let mut purchase = Purchase::try_from(require_purchase(db, user_id, purchase_id).await?)?;
    purchase.lines = purchase_lines::Entity::find()
        .filter(purchase_lines::Column::PurchaseId.eq(purchase_id.to_string()))
        .order_by_asc(purchase_lines::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(PurchaseLine::try_from)
        .collect::<ResultEngine<Vec<_>>>()?;
    purchase.supplier_name = supplier_name(db, user_id, purchase.supplier_id).await?;
    purchase.expense_id = find_expense_id(db, purchase_id).await?;
    Ok(purchase)
}

impl Engine {
    /// Record a purchase: lines, stock increments, the mirrored expense and
    /// the movement, all or nothing.
    pub async fn create_purchase(&self, cmd: PurchaseCmd) -> ResultEngine<Purchase> {
        let lines = lines_from(&cmd.lines);
        check_lines(&lines)?;
        // Purchases of services or supplies carry no lines, only an amount.
        let amount_minor = match cmd.amount_minor {
            Some(amount) => amount,
            None if lines.is_empty() => {
                return Err(EngineError::invalid(
                    "lines",
                    "at least one line is required without amount_minor",
                ));
            }
            None => lines_total(&lines)?,
        };
        if amount_minor <= 0 {
            return Err(EngineError::invalid("amount_minor", "must be > 0"));
        }

        with_tx!(self, |db_tx| {
            let user_id = cmd.user_id.as_str();
            let supplier_name = supplier_name(&db_tx, user_id, cmd.supplier_id).await?;
            check_products(&db_tx, user_id, &lines).await?;

            let expense_id = Uuid::new_v4();
            let purchase = Purchase {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                supplier_id: cmd.supplier_id,
                supplier_name,
                occurred_at: cmd.occurred_at,
                amount_minor,
                description: normalize_optional_text(cmd.description.as_deref()),
                lines,
                expense_id: Some(expense_id),
            };
            purchases::ActiveModel::from(&purchase)
                .insert(&db_tx)
                .await?;
            insert_lines(&db_tx, purchase.id, &purchase.lines).await?;
            apply_stock_deltas(&db_tx, user_id, &bought_quantities(&purchase.lines)?).await?;
            expenses::ActiveModel::from(&mirrored_expense(&purchase, expense_id))
                .insert(&db_tx)
                .await?;
            insert_movement(&db_tx, user_id, purchase_draft(&purchase)).await?;
            Ok(purchase)
        })
    }

    pub async fn get_purchase(&self, user_id: &str, purchase_id: Uuid) -> ResultEngine<Purchase> {
        load_purchase(&self.database, user_id, purchase_id).await
    }

    /// Purchases newest first, optionally restricted to `range`, with their lines.
    pub async fn list_purchases(
        &self,
        user_id: &str,
        range: Option<DateRange>,
    ) -> ResultEngine<Vec<Purchase>> {
        let mut query = purchases::Entity::find()
            .filter(purchases::Column::UserId.eq(user_id))
            .order_by_desc(purchases::Column::OccurredAt)
            .order_by_desc(purchases::Column::Id);
        if let Some(range) = range {
            query = query
                .filter(purchases::Column::OccurredAt.gte(range.from))
                .filter(purchases::Column::OccurredAt.lt(range.to));
        }
        let models = query.all(&self.database).await?;
        let ids: Vec<String> = models.iter().map(|p| p.id.clone()).collect();

        let mut lines: HashMap<String, Vec<PurchaseLine>> = HashMap::new();
        for line in purchase_lines::Entity::find()
            .filter(purchase_lines::Column::PurchaseId.is_in(ids.clone()))
            .all(&self.database)
            .await?
        {
            let purchase_id = line.purchase_id.clone();
            lines
                .entry(purchase_id)
                .or_default()
                .push(PurchaseLine::try_from(line)?);
        }
        let mut expense_ids: HashMap<String, Uuid> = HashMap::new();
        for expense in expenses::Entity::find()
            .filter(expenses::Column::PurchaseId.is_in(ids))
            .all(&self.database)
            .await?
        {
            if let Some(purchase_id) = expense.purchase_id {
                expense_ids.insert(purchase_id, parse_uuid(&expense.id, "expense")?);
            }
        }
        let supplier_names: HashMap<String, String> = suppliers::Entity::find()
            .filter(suppliers::Column::UserId.eq(user_id))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();

        let mut out = Vec::with_capacity(models.len());
        for model in models {
            let id = model.id.clone();
            let name = model
                .supplier_id
                .as_ref()
                .and_then(|s| supplier_names.get(s))
                .cloned();
            let mut purchase = Purchase::try_from(model)?;
            purchase.supplier_name = name;
            purchase.lines = lines.remove(&id).unwrap_or_default();
            purchase.expense_id = expense_ids.get(&id).copied();
            out.push(purchase);
        }
        Ok(out)
    }

    /// Patch a purchase.
    ///
    /// Replacing lines adjusts stock by the per-product difference. Units
    /// removed from a purchase must still be in stock. The mirrored expense
    /// and the movement follow the new values.
    pub async fn update_purchase(&self, cmd: UpdatePurchaseCmd) -> ResultEngine<Purchase> {
        let (purchase, events) = with_tx!(self, |db_tx| {
            let user_id = cmd.user_id.as_str();
            let mut purchase = load_purchase(&db_tx, user_id, cmd.purchase_id).await?;
            let old_quantities = bought_quantities(&purchase.lines)?;

            if let Some(occurred_at) = cmd.occurred_at {
                purchase.occurred_at = occurred_at;
            }
            purchase.description =
                apply_optional_text_patch(purchase.description, cmd.description.as_deref());
            let supplier_id = apply_optional_id_patch(purchase.supplier_id, cmd.supplier_id);
            if supplier_id != purchase.supplier_id {
                purchase.supplier_name = supplier_name(&db_tx, user_id, supplier_id).await?;
                purchase.supplier_id = supplier_id;
            }

            let replace_lines = cmd.lines.is_some();
            if let Some(lines) = &cmd.lines {
                let lines = lines_from(lines);
                check_lines(&lines)?;
                check_products(&db_tx, user_id, &lines).await?;
                purchase.lines = lines;
            }
            match cmd.amount_minor {
                Some(amount) => purchase.amount_minor = amount,
                None if replace_lines => purchase.amount_minor = lines_total(&purchase.lines)?,
                None => {}
            }
            if purchase.amount_minor <= 0 {
                return Err(EngineError::invalid("amount_minor", "must be > 0"));
            }

            let mut events = Vec::new();
            if replace_lines {
                let deltas = stock_deltas(&old_quantities, &bought_quantities(&purchase.lines)?);
                events = apply_stock_deltas(&db_tx, user_id, &deltas).await?;
                purchase_lines::Entity::delete_many()
                    .filter(purchase_lines::Column::PurchaseId.eq(purchase.id.to_string()))
                    .exec(&db_tx)
                    .await?;
                insert_lines(&db_tx, purchase.id, &purchase.lines).await?;
            }

            let mut model = purchases::ActiveModel::from(&purchase);
            model.id = ActiveValue::Unchanged(purchase.id.to_string());
            model.update(&db_tx).await?;

            match purchase.expense_id {
                Some(expense_id) => {
                    let mut expense =
                        expenses::ActiveModel::from(&mirrored_expense(&purchase, expense_id));
                    expense.id = ActiveValue::Unchanged(expense_id.to_string());
                    expense.update(&db_tx).await?;
                }
                None => {
                    tracing::warn!(purchase_id = %purchase.id, "purchase had no expense, creating it");
                    let expense_id = Uuid::new_v4();
                    expenses::ActiveModel::from(&mirrored_expense(&purchase, expense_id))
                        .insert(&db_tx)
                        .await?;
                    purchase.expense_id = Some(expense_id);
                }
            }
            sync_movement(&db_tx, user_id, purchase_draft(&purchase)).await?;
            Ok::<_, EngineError>((purchase, events))
        })?;

        self.dispatch(events);
        Ok(purchase)
    }

    /// Delete a purchase, taking its units back out of stock.
    ///
    /// Fails with `InsufficientStock` when some of those units were already
    /// sold.
    pub async fn delete_purchase(&self, user_id: &str, purchase_id: Uuid) -> ResultEngine<()> {
        let events = with_tx!(self, |db_tx| {
            let purchase = load_purchase(&db_tx, user_id, purchase_id).await?;
            let reversal = stock_deltas(&bought_quantities(&purchase.lines)?, &BTreeMap::new());
            let events = apply_stock_deltas(&db_tx, user_id, &reversal).await?;

            expenses::Entity::delete_many()
                .filter(expenses::Column::PurchaseId.eq(purchase_id.to_string()))
                .exec(&db_tx)
                .await?;
            if let Some(expense_id) = purchase.expense_id {
                delete_movements(&db_tx, user_id, MovementSource::Expense(expense_id)).await?;
            }
            purchase_lines::Entity::delete_many()
                .filter(purchase_lines::Column::PurchaseId.eq(purchase_id.to_string()))
                .exec(&db_tx)
                .await?;
            delete_movements(&db_tx, user_id, MovementSource::Purchase(purchase_id)).await?;
            purchases::Entity::delete_by_id(purchase_id.to_string())
                .exec(&db_tx)
                .await?;
            Ok::<_, EngineError>(events)
        })?;

        self.dispatch(events);
        Ok(())
    }
}
