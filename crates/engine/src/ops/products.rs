use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, FieldErrors, Product, ProductCmd, ResultEngine, UpdateProductCmd,
    purchase_lines, sale_product_lines, products,
    util::{apply_optional_text_patch, normalize_optional_text},
};

use super::{Engine, access::require_product, with_tx};

fn check_product_fields(name: &str, price_minor: i64, quantity: i64) -> ResultEngine<()> {
    let mut errors = FieldErrors::new();
    if name.trim().is_empty() {
        errors.push("name", "must not be empty");
    }
    if price_minor < 0 {
        errors.push("price_minor", "must be >= 0");
    }
    if quantity < 0 {
        errors.push("quantity", "must be >= 0");
    }
    errors.into_result()
}

impl Engine {
    /// Create a product with its opening stock.
    pub async fn create_product(&self, cmd: ProductCmd) -> ResultEngine<Product> {
        check_product_fields(&cmd.name, cmd.price_minor, cmd.quantity)?;
        let product = Product {
            id: Uuid::new_v4(),
            user_id: cmd.user_id,
            name: cmd.name.trim().to_string(),
            description: normalize_optional_text(cmd.description.as_deref()),
            price_minor: cmd.price_minor,
            quantity: cmd.quantity,
            active: cmd.active,
            created_at: Utc::now(),
        };
        products::ActiveModel::from(&product)
            .insert(&self.database)
            .await?;
        Ok(product)
    }

    pub async fn get_product(&self, user_id: &str, product_id: Uuid) -> ResultEngine<Product> {
        Product::try_from(require_product(&self.database, user_id, product_id).await?)
    }

    /// Products ordered by name. Inactive ones are skipped unless asked for.
    pub async fn list_products(
        &self,
        user_id: &str,
        include_inactive: bool,
    ) -> ResultEngine<Vec<Product>> {
        let mut query = products::Entity::find()
            .filter(products::Column::UserId.eq(user_id))
            .order_by_asc(products::Column::Name);
        if !include_inactive {
            query = query.filter(products::Column::Active.eq(true));
        }
        query
            .all(&self.database)
            .await?
            .into_iter()
            .map(Product::try_from)
            .collect()
    }

    pub async fn update_product(&self, cmd: UpdateProductCmd) -> ResultEngine<Product> {
        with_tx!(self, |db_tx| {
            let model = require_product(&db_tx, &cmd.user_id, cmd.product_id).await?;
            let mut product = Product::try_from(model)?;

            if let Some(name) = cmd.name.as_deref() {
                product.name = name.trim().to_string();
            }
            product.description =
                apply_optional_text_patch(product.description, cmd.description.as_deref());
            if let Some(price_minor) = cmd.price_minor {
                product.price_minor = price_minor;
            }
            if let Some(quantity) = cmd.quantity {
                product.quantity = quantity;
            }
            if let Some(active) = cmd.active {
                product.active = active;
            }
            check_product_fields(&product.name, product.price_minor, product.quantity)?;

            let mut active_model = products::ActiveModel::from(&product);
            active_model.id = ActiveValue::Unchanged(product.id.to_string());
            active_model.user_id = ActiveValue::Unchanged(product.user_id.clone());
            active_model.created_at = ActiveValue::Unchanged(product.created_at);
            active_model.update(&db_tx).await?;
            Ok(product)
        })
    }

    /// Delete a product no sale or purchase line refers to.
    pub async fn delete_product(&self, user_id: &str, product_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            require_product(&db_tx, user_id, product_id).await?;

            let sold = sale_product_lines::Entity::find()
                .filter(sale_product_lines::Column::ProductId.eq(product_id.to_string()))
                .count(&db_tx)
                .await?;
            let purchased = purchase_lines::Entity::find()
                .filter(purchase_lines::Column::ProductId.eq(product_id.to_string()))
                .count(&db_tx)
                .await?;
            if sold + purchased > 0 {
                return Err(EngineError::StillReferenced {
                    entity: "product".to_string(),
                    count: sold + purchased,
                });
            }

            products::Entity::delete_by_id(product_id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }
}
