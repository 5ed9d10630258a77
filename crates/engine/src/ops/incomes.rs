use std::collections::HashMap;

use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    CategoryKind, DateRange, EngineError, Income, IncomeCmd, MovementKind, MovementSource,
    ResultEngine, UpdateIncomeCmd, income_categories, incomes,
    util::{apply_optional_id_patch, apply_optional_text_patch, normalize_optional_text, require_positive},
};

use super::{
    Engine,
    access::category_name,
    ledger::{MovementDraft, delete_movements, describe, insert_movement, sync_movement},
    with_tx,
};

fn income_draft(income: &Income) -> MovementDraft {
    MovementDraft {
        source: MovementSource::Income(income.id),
        occurred_at: income.occurred_at,
        amount_minor: income.amount_minor,
        description: describe(
            MovementKind::Income,
            income.description.as_deref(),
            income.category_name.as_deref(),
        ),
    }
}

async fn load_income<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    income_id: Uuid,
) -> ResultEngine<Income> {
    let model = incomes::Entity::find_by_id(income_id.to_string())
        .filter(incomes::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("income not exists".to_string()))?;
    let mut income = Income::try_from(model)?;
    if let Some(category_id) = income.category_id {
        income.category_name =
            Some(category_name(db, user_id, CategoryKind::Income, category_id).await?);
    }
    Ok(income)
}

impl Engine {
    /// Record an income and its movement.
    pub async fn create_income(&self, cmd: IncomeCmd) -> ResultEngine<Income> {
        require_positive(cmd.amount_minor, "amount_minor")?;
        with_tx!(self, |db_tx| {
            let category_name = match cmd.category_id {
                Some(id) => Some(category_name(&db_tx, &cmd.user_id, CategoryKind::Income, id).await?),
                None => None,
            };
            let income = Income {
                id: Uuid::new_v4(),
                user_id: cmd.user_id.clone(),
                occurred_at: cmd.occurred_at,
                amount_minor: cmd.amount_minor,
                description: normalize_optional_text(cmd.description.as_deref()),
                category_id: cmd.category_id,
                category_name,
            };
            incomes::ActiveModel::from(&income).insert(&db_tx).await?;
            insert_movement(&db_tx, &income.user_id, income_draft(&income)).await?;
            Ok(income)
        })
    }

    pub async fn get_income(&self, user_id: &str, income_id: Uuid) -> ResultEngine<Income> {
        load_income(&self.database, user_id, income_id).await
    }

    /// Incomes newest first, optionally restricted to `range`.
    pub async fn list_incomes(
        &self,
        user_id: &str,
        range: Option<DateRange>,
    ) -> ResultEngine<Vec<Income>> {
        let mut query = incomes::Entity::find()
            .filter(incomes::Column::UserId.eq(user_id))
            .order_by_desc(incomes::Column::OccurredAt)
            .order_by_desc(incomes::Column::Id);
        if let Some(range) = range {
            query = query
                .filter(incomes::Column::OccurredAt.gte(range.from))
                .filter(incomes::Column::OccurredAt.lt(range.to));
        }
        let names: HashMap<String, String> = income_categories::Entity::find()
            .filter(income_categories::Column::UserId.eq(user_id))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        query
            .all(&self.database)
            .await?
            .into_iter()
            .map(|model| -> ResultEngine<Income> {
                let name = model.category_id.as_ref().and_then(|id| names.get(id)).cloned();
                let mut income = Income::try_from(model)?;
                income.category_name = name;
                Ok(income)
            })
            .collect()
    }

    /// Patch an income and resynchronize its movement.
    pub async fn update_income(&self, cmd: UpdateIncomeCmd) -> ResultEngine<Income> {
        with_tx!(self, |db_tx| {
            let mut income = load_income(&db_tx, &cmd.user_id, cmd.income_id).await?;

            if let Some(occurred_at) = cmd.occurred_at {
                income.occurred_at = occurred_at;
            }
            if let Some(amount_minor) = cmd.amount_minor {
                require_positive(amount_minor, "amount_minor")?;
                income.amount_minor = amount_minor;
            }
            income.description =
                apply_optional_text_patch(income.description, cmd.description.as_deref());
            let category_id = apply_optional_id_patch(income.category_id, cmd.category_id);
            if category_id != income.category_id {
                income.category_name = match category_id {
                    Some(id) => {
                        Some(category_name(&db_tx, &cmd.user_id, CategoryKind::Income, id).await?)
                    }
                    None => None,
                };
                income.category_id = category_id;
            }

            let mut model = incomes::ActiveModel::from(&income);
            model.id = ActiveValue::Unchanged(income.id.to_string());
            model.update(&db_tx).await?;
            sync_movement(&db_tx, &income.user_id, income_draft(&income)).await?;
            Ok(income)
        })
    }

    /// Delete an income together with its movement.
    pub async fn delete_income(&self, user_id: &str, income_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            load_income(&db_tx, user_id, income_id).await?;
            delete_movements(&db_tx, user_id, MovementSource::Income(income_id)).await?;
            incomes::Entity::delete_by_id(income_id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }
}
