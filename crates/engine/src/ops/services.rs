use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, Service, ServiceCmd, UpdateServiceCmd, sale_service_lines,
    services,
    util::{apply_optional_text_patch, normalize_optional_text, normalize_required_name, require_non_negative},
};

use super::{Engine, access::require_service, with_tx};

impl Engine {
    pub async fn create_service(&self, cmd: ServiceCmd) -> ResultEngine<Service> {
        require_non_negative(cmd.price_minor, "price_minor")?;
        let service = Service {
            id: Uuid::new_v4(),
            name: normalize_required_name(&cmd.name, "name")?,
            description: normalize_optional_text(cmd.description.as_deref()),
            price_minor: cmd.price_minor,
            active: cmd.active,
            user_id: cmd.user_id,
            created_at: Utc::now(),
        };
        services::ActiveModel::from(&service)
            .insert(&self.database)
            .await?;
        Ok(service)
    }

    pub async fn get_service(&self, user_id: &str, service_id: Uuid) -> ResultEngine<Service> {
        Service::try_from(require_service(&self.database, user_id, service_id).await?)
    }

    pub async fn list_services(&self, user_id: &str) -> ResultEngine<Vec<Service>> {
        services::Entity::find()
            .filter(services::Column::UserId.eq(user_id))
            .order_by_asc(services::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Service::try_from)
            .collect()
    }

    pub async fn update_service(&self, cmd: UpdateServiceCmd) -> ResultEngine<Service> {
        with_tx!(self, |db_tx| {
            let mut service =
                Service::try_from(require_service(&db_tx, &cmd.user_id, cmd.service_id).await?)?;

            if let Some(name) = cmd.name.as_deref() {
                service.name = normalize_required_name(name, "name")?;
            }
            service.description =
                apply_optional_text_patch(service.description, cmd.description.as_deref());
            if let Some(price_minor) = cmd.price_minor {
                require_non_negative(price_minor, "price_minor")?;
                service.price_minor = price_minor;
            }
            if let Some(active) = cmd.active {
                service.active = active;
            }

            let mut model = services::ActiveModel::from(&service);
            model.id = ActiveValue::Unchanged(service.id.to_string());
            model.update(&db_tx).await?;
            Ok(service)
        })
    }

    /// Delete a service no sale line refers to.
    pub async fn delete_service(&self, user_id: &str, service_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            require_service(&db_tx, user_id, service_id).await?;
            let count = sale_service_lines::Entity::find()
                .filter(sale_service_lines::Column::ServiceId.eq(service_id.to_string()))
                .count(&db_tx)
                .await?;
            if count > 0 {
                return Err(EngineError::StillReferenced {
                    entity: "service".to_string(),
                    count,
                });
            }
            services::Entity::delete_by_id(service_id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }
}
