//! Clients (customers) of the business.
//!
//! `email_norm` holds the normalized email and backs the per-user uniqueness
//! index; it is never exposed.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "clients")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub email_norm: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sales::Entity")]
    Sales,
}

impl Related<super::sales::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sales.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Client> for ActiveModel {
    fn from(client: &Client) -> Self {
        Self {
            id: ActiveValue::Set(client.id.to_string()),
            user_id: ActiveValue::Set(client.user_id.clone()),
            name: ActiveValue::Set(client.name.clone()),
            phone: ActiveValue::Set(client.phone.clone()),
            email: ActiveValue::Set(client.email.clone()),
            email_norm: ActiveValue::Set(client.email.as_deref().map(str::to_lowercase)),
            address: ActiveValue::Set(client.address.clone()),
            created_at: ActiveValue::Set(client.created_at),
        }
    }
}

impl TryFrom<Model> for Client {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "client")?,
            user_id: model.user_id,
            name: model.name,
            phone: model.phone,
            email: model.email,
            address: model.address,
            created_at: model.created_at,
        })
    }
}
