use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{
    CategoryKind, EngineError, ResultEngine, clients, expense_categories, income_categories,
    products, purchases, sales, services, suppliers, users, util::normalize_required_name,
};

use super::Engine;

/// Generates a lookup that only returns rows owned by `user_id`.
///
/// Rows owned by someone else are reported exactly like missing rows.
macro_rules! impl_require_owned {
    ($fn_name:ident, $module:ident, $label:literal) => {
        pub(super) async fn $fn_name<C: ConnectionTrait>(
            db: &C,
            user_id: &str,
            id: Uuid,
        ) -> ResultEngine<$module::Model> {
            $module::Entity::find_by_id(id.to_string())
                .filter($module::Column::UserId.eq(user_id))
                .one(db)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(concat!($label, " not exists").to_string()))
        }
    };
}

impl_require_owned!(require_product, products, "product");
impl_require_owned!(require_service, services, "service");
impl_require_owned!(require_client, clients, "client");
impl_require_owned!(require_supplier, suppliers, "supplier");
impl_require_owned!(require_income_category, income_categories, "income category");
impl_require_owned!(require_expense_category, expense_categories, "expense category");
impl_require_owned!(require_sale, sales, "sale");
impl_require_owned!(require_purchase, purchases, "purchase");

/// Name of an owned category of the given kind.
pub(super) async fn category_name<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    kind: CategoryKind,
    id: Uuid,
) -> ResultEngine<String> {
    match kind {
        CategoryKind::Income => Ok(require_income_category(db, user_id, id).await?.name),
        CategoryKind::Expense => Ok(require_expense_category(db, user_id, id).await?.name),
    }
}

impl Engine {
    /// Create a login. Usernames are unique.
    pub async fn create_user(&self, username: &str, password: &str) -> ResultEngine<()> {
        let username = normalize_required_name(username, "username")?;
        if password.is_empty() {
            return Err(EngineError::invalid("password", "must not be empty"));
        }
        if users::Entity::find_by_id(username.clone())
            .one(&self.database)
            .await?
            .is_some()
        {
            return Err(EngineError::ExistingKey(username));
        }

        users::ActiveModel {
            username: ActiveValue::Set(username.clone()),
            password: ActiveValue::Set(users::hash_password(password)?),
        }
        .insert(&self.database)
        .await?;
        tracing::info!(%username, "user created");
        Ok(())
    }

    /// Check a username/password pair, returning the user id on success.
    pub async fn authenticate(&self, username: &str, password: &str) -> ResultEngine<Option<String>> {
        let user = users::Entity::find_by_id(username.to_string())
            .one(&self.database)
            .await?;
        Ok(user
            .filter(|u| users::verify_password(&u.password, password))
            .map(|u| u.username))
    }
}
