use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    CategoryKind, DateRange, EngineError, Expense, ExpenseCmd, MovementKind, MovementSource,
    ResultEngine, UpdateExpenseCmd, expenses,
    util::{apply_optional_id_patch, apply_optional_text_patch, normalize_optional_text, require_positive},
};

use super::{
    Engine,
    access::category_name,
    ledger::{MovementDraft, delete_movements, describe, insert_movement, sync_movement},
    with_tx,
};

fn expense_draft(expense: &Expense) -> MovementDraft {
    MovementDraft {
        source: MovementSource::Expense(expense.id),
        occurred_at: expense.occurred_at,
        amount_minor: expense.amount_minor,
        description: describe(
            MovementKind::Expense,
            expense.description.as_deref(),
            Some(&expense.category),
        ),
    }
}

async fn load_expense<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    expense_id: Uuid,
) -> ResultEngine<Expense> {
    let model = expenses::Entity::find_by_id(expense_id.to_string())
        .filter(expenses::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;
    Expense::try_from(model)
}

fn ensure_standalone(expense: &Expense) -> ResultEngine<()> {
    if expense.is_purchase_linked() {
        return Err(EngineError::Conflict(
            "expense belongs to a purchase; edit the purchase instead".to_string(),
        ));
    }
    Ok(())
}

/// Free-text category: the given text, else the linked category's name.
async fn resolve_category_text<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    text: Option<&str>,
    category_id: Option<Uuid>,
) -> ResultEngine<String> {
    if let Some(text) = normalize_optional_text(text) {
        return Ok(text);
    }
    match category_id {
        Some(id) => category_name(db, user_id, CategoryKind::Expense, id).await,
        None => Err(EngineError::invalid("category", "must not be empty")),
    }
}

impl Engine {
    /// Record an expense and its movement.
    pub async fn create_expense(&self, cmd: ExpenseCmd) -> ResultEngine<Expense> {
        require_positive(cmd.amount_minor, "amount_minor")?;
        with_tx!(self, |db_tx| {
            if let Some(id) = cmd.category_id {
                category_name(&db_tx, &cmd.user_id, CategoryKind::Expense, id).await?;
            }
            let category =
                resolve_category_text(&db_tx, &cmd.user_id, cmd.category.as_deref(), cmd.category_id)
                    .await?;
            let expense = Expense {
                id: Uuid::new_v4(),
                user_id: cmd.user_id.clone(),
                occurred_at: cmd.occurred_at,
                amount_minor: cmd.amount_minor,
                category,
                description: normalize_optional_text(cmd.description.as_deref()),
                category_id: cmd.category_id,
                purchase_id: None,
            };
            expenses::ActiveModel::from(&expense).insert(&db_tx).await?;
            insert_movement(&db_tx, &expense.user_id, expense_draft(&expense)).await?;
            Ok(expense)
        })
    }

    pub async fn get_expense(&self, user_id: &str, expense_id: Uuid) -> ResultEngine<Expense> {
        load_expense(&self.database, user_id, expense_id).await
    }

    /// Expenses newest first, optionally restricted to `range`. Includes the
    /// expenses mirrored from purchases.
    pub async fn list_expenses(
        &self,
        user_id: &str,
        range: Option<DateRange>,
    ) -> ResultEngine<Vec<Expense>> {
        let mut query = expenses::Entity::find()
            .filter(expenses::Column::UserId.eq(user_id))
            .order_by_desc(expenses::Column::OccurredAt)
            .order_by_desc(expenses::Column::Id);
        if let Some(range) = range {
            query = query
                .filter(expenses::Column::OccurredAt.gte(range.from))
                .filter(expenses::Column::OccurredAt.lt(range.to));
        }
        query
            .all(&self.database)
            .await?
            .into_iter()
            .map(Expense::try_from)
            .collect()
    }

    /// Patch an expense and resynchronize its movement.
    pub async fn update_expense(&self, cmd: UpdateExpenseCmd) -> ResultEngine<Expense> {
        with_tx!(self, |db_tx| {
            let mut expense = load_expense(&db_tx, &cmd.user_id, cmd.expense_id).await?;
            ensure_standalone(&expense)?;

            if let Some(occurred_at) = cmd.occurred_at {
                expense.occurred_at = occurred_at;
            }
            if let Some(amount_minor) = cmd.amount_minor {
                require_positive(amount_minor, "amount_minor")?;
                expense.amount_minor = amount_minor;
            }
            expense.description =
                apply_optional_text_patch(expense.description, cmd.description.as_deref());

            let category_id = apply_optional_id_patch(expense.category_id, cmd.category_id);
            if category_id != expense.category_id
                && let Some(id) = category_id
            {
                category_name(&db_tx, &cmd.user_id, CategoryKind::Expense, id).await?;
            }
            expense.category_id = category_id;
            if cmd.category.is_some() {
                expense.category = resolve_category_text(
                    &db_tx,
                    &cmd.user_id,
                    cmd.category.as_deref(),
                    expense.category_id,
                )
                .await?;
            }

            let mut model = expenses::ActiveModel::from(&expense);
            model.id = ActiveValue::Unchanged(expense.id.to_string());
            model.update(&db_tx).await?;
            sync_movement(&db_tx, &expense.user_id, expense_draft(&expense)).await?;
            Ok(expense)
        })
    }

    /// Delete an expense together with its movement.
    pub async fn delete_expense(&self, user_id: &str, expense_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let expense = load_expense(&db_tx, user_id, expense_id).await?;
            ensure_standalone(&expense)?;
            delete_movements(&db_tx, user_id, MovementSource::Expense(expense_id)).await?;
            expenses::Entity::delete_by_id(expense_id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }
}
