//! Income and expense categories.
//!
//! The two kinds are separate tables; every operation dispatches on
//! `CategoryKind`. Names are unique per user and kind on their normalized key.

use chrono::Utc;
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Category, CategoryKind, EngineError, ResultEngine, expense_categories, expenses,
    income_categories, incomes,
    util::{normalize_key, normalize_required_name},
};

use super::{
    Engine,
    access::{require_expense_category, require_income_category},
    with_tx,
};

fn category_key(name: &str) -> ResultEngine<(String, String)> {
    let name = normalize_required_name(name, "name")?;
    let key = normalize_key(&name)
        .ok_or_else(|| EngineError::invalid("name", "must contain letters or digits"))?;
    Ok((name, key))
}

/// Fails when another category of the same kind already uses `key`.
async fn ensure_name_free<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    kind: CategoryKind,
    key: &str,
    except: Option<Uuid>,
) -> ResultEngine<()> {
    let except = except.map(|id| id.to_string());
    let clash = match kind {
        CategoryKind::Income => income_categories::Entity::find()
            .filter(income_categories::Column::UserId.eq(user_id))
            .filter(income_categories::Column::NameNorm.eq(key))
            .all(db)
            .await?
            .into_iter()
            .any(|c| Some(&c.id) != except.as_ref()),
        CategoryKind::Expense => expense_categories::Entity::find()
            .filter(expense_categories::Column::UserId.eq(user_id))
            .filter(expense_categories::Column::NameNorm.eq(key))
            .all(db)
            .await?
            .into_iter()
            .any(|c| Some(&c.id) != except.as_ref()),
    };
    if clash {
        return Err(EngineError::ExistingKey(key.to_string()));
    }
    Ok(())
}

impl Engine {
    pub async fn create_category(
        &self,
        user_id: &str,
        kind: CategoryKind,
        name: &str,
    ) -> ResultEngine<Category> {
        let (name, key) = category_key(name)?;
        with_tx!(self, |db_tx| {
            ensure_name_free(&db_tx, user_id, kind, &key, None).await?;
            let category = Category {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                kind,
                name,
                created_at: Utc::now(),
            };
            match kind {
                CategoryKind::Income => {
                    income_categories::active_model(&category, key)
                        .insert(&db_tx)
                        .await?;
                }
                CategoryKind::Expense => {
                    expense_categories::active_model(&category, key)
                        .insert(&db_tx)
                        .await?;
                }
            }
            Ok(category)
        })
    }

    pub async fn get_category(
        &self,
        user_id: &str,
        kind: CategoryKind,
        category_id: Uuid,
    ) -> ResultEngine<Category> {
        match kind {
            CategoryKind::Income => Category::try_from(
                require_income_category(&self.database, user_id, category_id).await?,
            ),
            CategoryKind::Expense => Category::try_from(
                require_expense_category(&self.database, user_id, category_id).await?,
            ),
        }
    }

    /// Categories of one kind, ordered by name.
    pub async fn list_categories(
        &self,
        user_id: &str,
        kind: CategoryKind,
    ) -> ResultEngine<Vec<Category>> {
        match kind {
            CategoryKind::Income => income_categories::Entity::find()
                .filter(income_categories::Column::UserId.eq(user_id))
                .order_by_asc(income_categories::Column::Name)
                .all(&self.database)
                .await?
                .into_iter()
                .map(Category::try_from)
                .collect(),
            CategoryKind::Expense => expense_categories::Entity::find()
                .filter(expense_categories::Column::UserId.eq(user_id))
                .order_by_asc(expense_categories::Column::Name)
                .all(&self.database)
                .await?
                .into_iter()
                .map(Category::try_from)
                .collect(),
        }
    }

    /// Rename a category. Linked records keep pointing at it.
    pub async fn rename_category(
        &self,
        user_id: &str,
        kind: CategoryKind,
        category_id: Uuid,
        name: &str,
    ) -> ResultEngine<Category> {
        let (name, key) = category_key(name)?;
        with_tx!(self, |db_tx| {
            let mut category = match kind {
                CategoryKind::Income => {
                    Category::try_from(require_income_category(&db_tx, user_id, category_id).await?)?
                }
                CategoryKind::Expense => Category::try_from(
                    require_expense_category(&db_tx, user_id, category_id).await?,
                )?,
            };
            ensure_name_free(&db_tx, user_id, kind, &key, Some(category_id)).await?;
            category.name = name;

            match kind {
                CategoryKind::Income => {
                    income_categories::ActiveModel {
                        id: ActiveValue::Unchanged(category_id.to_string()),
                        name: ActiveValue::Set(category.name.clone()),
                        name_norm: ActiveValue::Set(key),
                        ..Default::default()
                    }
                    .update(&db_tx)
                    .await?;
                }
                CategoryKind::Expense => {
                    expense_categories::ActiveModel {
                        id: ActiveValue::Unchanged(category_id.to_string()),
                        name: ActiveValue::Set(category.name.clone()),
                        name_norm: ActiveValue::Set(key),
                        ..Default::default()
                    }
                    .update(&db_tx)
                    .await?;
                }
            }
            Ok(category)
        })
    }

    /// Delete a category no income or expense refers to.
    pub async fn delete_category(
        &self,
        user_id: &str,
        kind: CategoryKind,
        category_id: Uuid,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let id = category_id.to_string();
            let count = match kind {
                CategoryKind::Income => {
                    require_income_category(&db_tx, user_id, category_id).await?;
                    incomes::Entity::find()
                        .filter(incomes::Column::CategoryId.eq(id.clone()))
                        .count(&db_tx)
                        .await?
                }
                CategoryKind::Expense => {
                    require_expense_category(&db_tx, user_id, category_id).await?;
                    expenses::Entity::find()
                        .filter(expenses::Column::CategoryId.eq(id.clone()))
                        .count(&db_tx)
                        .await?
                }
            };
            if count > 0 {
                return Err(EngineError::StillReferenced {
                    entity: format!("{} category", kind.as_str()),
                    count,
                });
            }

            match kind {
                CategoryKind::Income => {
                    income_categories::Entity::delete_by_id(id).exec(&db_tx).await?;
                }
                CategoryKind::Expense => {
                    expense_categories::Entity::delete_by_id(id).exec(&db_tx).await?;
                }
            }
            Ok(())
        })
    }
}
