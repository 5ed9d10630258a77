use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::AuthUser, server::ServerState};
use api_types::service::{ServiceNew, ServiceUpdate, ServiceView};

fn map_service(service: engine::Service) -> ServiceView {
    ServiceView {
        id: service.id,
        name: service.name,
        description: service.description,
        price_minor: service.price_minor,
        active: service.active,
        created_at: service.created_at,
    }
}

pub async fn list(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<ServiceView>>, ServerError> {
    let services = state.engine.list_services(&user).await?;
    Ok(Json(services.into_iter().map(map_service).collect()))
}

pub async fn create(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Json(payload): Json<ServiceNew>,
) -> Result<(StatusCode, Json<ServiceView>), ServerError> {
    let mut cmd = engine::ServiceCmd::new(user, payload.name, payload.price_minor);
    cmd.description = payload.description;
    cmd.active = payload.active.unwrap_or(true);

    let service = state.engine.create_service(cmd).await?;
    Ok((StatusCode::CREATED, Json(map_service(service))))
}

pub async fn get(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ServiceView>, ServerError> {
    let service = state.engine.get_service(&user, id).await?;
    Ok(Json(map_service(service)))
}

pub async fn update(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ServiceUpdate>,
) -> Result<Json<ServiceView>, ServerError> {
    let mut cmd = engine::UpdateServiceCmd::new(user, id);
    cmd.name = payload.name;
    cmd.description = payload.description;
    cmd.price_minor = payload.price_minor;
    cmd.active = payload.active;

    let service = state.engine.update_service(cmd).await?;
    Ok(Json(map_service(service)))
}

pub async fn delete(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_service(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
