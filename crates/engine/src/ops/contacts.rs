//! Clients and suppliers.
//!
//! Both are plain contact records. Client emails are unique per user,
//! compared case-insensitively.

use chrono::Utc;
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Client, ContactCmd, EngineError, ResultEngine, Supplier, UpdateContactCmd, clients,
    purchases, sales, suppliers,
    util::{apply_optional_text_patch, normalize_email, normalize_optional_text, normalize_required_name},
};

use super::{
    Engine,
    access::{require_client, require_supplier},
    with_tx,
};

fn optional_email(value: Option<&str>) -> ResultEngine<Option<String>> {
    normalize_optional_text(value)
        .map(|email| normalize_email(&email))
        .transpose()
}

async fn ensure_email_free<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    email: &str,
    except: Option<Uuid>,
) -> ResultEngine<()> {
    let mut query = clients::Entity::find()
        .filter(clients::Column::UserId.eq(user_id))
        .filter(clients::Column::EmailNorm.eq(email));
    if let Some(id) = except {
        query = query.filter(clients::Column::Id.ne(id.to_string()));
    }
    if query.one(db).await?.is_some() {
        return Err(EngineError::ExistingKey(email.to_string()));
    }
    Ok(())
}

impl Engine {
    pub async fn create_client(&self, cmd: ContactCmd) -> ResultEngine<Client> {
        let name = normalize_required_name(&cmd.name, "name")?;
        let email = optional_email(cmd.email.as_deref())?;
        with_tx!(self, |db_tx| {
            if let Some(email) = email.as_deref() {
                ensure_email_free(&db_tx, &cmd.user_id, email, None).await?;
            }
            let client = Client {
                id: Uuid::new_v4(),
                user_id: cmd.user_id.clone(),
                name,
                phone: normalize_optional_text(cmd.phone.as_deref()),
                email,
                address: normalize_optional_text(cmd.address.as_deref()),
                created_at: Utc::now(),
            };
            clients::ActiveModel::from(&client).insert(&db_tx).await?;
            Ok(client)
        })
    }

    pub async fn get_client(&self, user_id: &str, client_id: Uuid) -> ResultEngine<Client> {
        Client::try_from(require_client(&self.database, user_id, client_id).await?)
    }

    pub async fn list_clients(&self, user_id: &str) -> ResultEngine<Vec<Client>> {
        clients::Entity::find()
            .filter(clients::Column::UserId.eq(user_id))
            .order_by_asc(clients::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Client::try_from)
            .collect()
    }

    pub async fn update_client(&self, cmd: UpdateContactCmd) -> ResultEngine<Client> {
        with_tx!(self, |db_tx| {
            let mut client =
                Client::try_from(require_client(&db_tx, &cmd.user_id, cmd.id).await?)?;

            if let Some(name) = cmd.name.as_deref() {
                client.name = normalize_required_name(name, "name")?;
            }
            if cmd.email.is_some() {
                client.email = optional_email(cmd.email.as_deref())?;
                if let Some(email) = client.email.as_deref() {
                    ensure_email_free(&db_tx, &cmd.user_id, email, Some(client.id)).await?;
                }
            }
            client.phone = apply_optional_text_patch(client.phone, cmd.phone.as_deref());
            client.address = apply_optional_text_patch(client.address, cmd.address.as_deref());

            let mut model = clients::ActiveModel::from(&client);
            model.id = ActiveValue::Unchanged(client.id.to_string());
            model.update(&db_tx).await?;
            Ok(client)
        })
    }

    /// Delete a client no sale refers to.
    pub async fn delete_client(&self, user_id: &str, client_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            require_client(&db_tx, user_id, client_id).await?;
            let count = sales::Entity::find()
                .filter(sales::Column::UserId.eq(user_id))
                .filter(sales::Column::ClientId.eq(client_id.to_string()))
                .count(&db_tx)
                .await?;
            if count > 0 {
                return Err(EngineError::StillReferenced {
                    entity: "client".to_string(),
                    count,
                });
            }
            clients::Entity::delete_by_id(client_id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    pub async fn create_supplier(&self, cmd: ContactCmd) -> ResultEngine<Supplier> {
        let supplier = Supplier {
            id: Uuid::new_v4(),
            name: normalize_required_name(&cmd.name, "name")?,
            phone: normalize_optional_text(cmd.phone.as_deref()),
            email: optional_email(cmd.email.as_deref())?,
            address: normalize_optional_text(cmd.address.as_deref()),
            user_id: cmd.user_id,
            created_at: Utc::now(),
        };
        suppliers::ActiveModel::from(&supplier)
            .insert(&self.database)
            .await?;
        Ok(supplier)
    }

    pub async fn get_supplier(&self, user_id: &str, supplier_id: Uuid) -> ResultEngine<Supplier> {
        Supplier::try_from(require_supplier(&self.database, user_id, supplier_id).await?)
    }

    pub async fn list_suppliers(&self, user_id: &str) -> ResultEngine<Vec<Supplier>> {
        suppliers::Entity::find()
            .filter(suppliers::Column::UserId.eq(user_id))
            .order_by_asc(suppliers::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Supplier::try_from)
            .collect()
    }

    pub async fn update_supplier(&self, cmd: UpdateContactCmd) -> ResultEngine<Supplier> {
        with_tx!(self, |db_tx| {
            let mut supplier =
                Supplier::try_from(require_supplier(&db_tx, &cmd.user_id, cmd.id).await?)?;

            if let Some(name) = cmd.name.as_deref() {
                supplier.name = normalize_required_name(name, "name")?;
            }
            if cmd.email.is_some() {
                supplier.email = optional_email(cmd.email.as_deref())?;
            }
            supplier.phone = apply_optional_text_patch(supplier.phone, cmd.phone.as_deref());
            supplier.address = apply_optional_text_patch(supplier.address, cmd.address.as_deref());

            let mut model = suppliers::ActiveModel::from(&supplier);
            model.id = ActiveValue::Unchanged(supplier.id.to_string());
            model.update(&db_tx).await?;
            Ok(supplier)
        })
    }

    /// Delete a supplier no purchase refers to.
    pub async fn delete_supplier(&self, user_id: &str, supplier_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            require_supplier(&db_tx, user_id, supplier_id).await?;
            let count = purchases::Entity::find()
                .filter(purchases::Column::UserId.eq(user_id))
                .filter(purchases::Column::SupplierId.eq(supplier_id.to_string()))
                .count(&db_tx)
                .await?;
            if count > 0 {
                return Err(EngineError::StillReferenced {
                    entity: "supplier".to_string(),
                    count,
                });
            }
            suppliers::Entity::delete_by_id(supplier_id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }
}
