//! Clients and suppliers. Both use the contact DTOs.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::AuthUser, server::ServerState};
use api_types::contact::{ContactNew, ContactUpdate, ContactView};

fn map_client(client: engine::Client) -> ContactView {
    ContactView {
        id: client.id,
        name: client.name,
        phone: client.phone,
        email: client.email,
        address: client.address,
        created_at: client.created_at,
    }
}

fn map_supplier(supplier: engine::Supplier) -> ContactView {
    ContactView {
        id: supplier.id,
        name: supplier.name,
        phone: supplier.phone,
        email: supplier.email,
        address: supplier.address,
        created_at: supplier.created_at,
    }
}

fn contact_cmd(user: String, payload: ContactNew) -> engine::ContactCmd {
    let mut cmd = engine::ContactCmd::new(user, payload.name);
    cmd.phone = payload.phone;
    cmd.email = payload.email;
    cmd.address = payload.address;
    cmd
}

fn update_contact_cmd(user: String, id: Uuid, payload: ContactUpdate) -> engine::UpdateContactCmd {
    let mut cmd = engine::UpdateContactCmd::new(user, id);
    cmd.name = payload.name;
    cmd.phone = payload.phone;
    cmd.email = payload.email;
    cmd.address = payload.address;
    cmd
}

pub async fn list_clients(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<ContactView>>, ServerError> {
    let clients = state.engine.list_clients(&user).await?;
    Ok(Json(clients.into_iter().map(map_client).collect()))
}

pub async fn create_client(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Json(payload): Json<ContactNew>,
) -> Result<(StatusCode, Json<ContactView>), ServerError> {
    let client = state
        .engine
        .create_client(contact_cmd(user, payload))
        .await?;
    Ok((StatusCode::CREATED, Json(map_client(client))))
}

pub async fn get_client(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ContactView>, ServerError> {
    let client = state.engine.get_client(&user, id).await?;
    Ok(Json(map_client(client)))
}

pub async fn update_client(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ContactUpdate>,
) -> Result<Json<ContactView>, ServerError> {
    let client = state
        .engine
        .update_client(update_contact_cmd(user, id, payload))
        .await?;
    Ok(Json(map_client(client)))
}

pub async fn delete_client(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_client(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_suppliers(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<ContactView>>, ServerError> {
    let suppliers = state.engine.list_suppliers(&user).await?;
    Ok(Json(suppliers.into_iter().map(map_supplier).collect()))
}

pub async fn create_supplier(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Json(payload): Json<ContactNew>,
) -> Result<(StatusCode, Json<ContactView>), ServerError> {
    let supplier = state
        .engine
        .create_supplier(contact_cmd(user, payload))
        .await?;
    Ok((StatusCode::CREATED, Json(map_supplier(supplier))))
}

pub async fn get_supplier(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ContactView>, ServerError> {
    let supplier = state.engine.get_supplier(&user, id).await?;
    Ok(Json(map_supplier(supplier)))
}

pub async fn update_supplier(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ContactUpdate>,
) -> Result<Json<ContactView>, ServerError> {
    let supplier = state
        .engine
        .update_supplier(update_contact_cmd(user, id, payload))
        .await?;
    Ok(Json(map_supplier(supplier)))
}

pub async fn delete_supplier(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_supplier(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
