use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::AuthUser, server::ServerState};
use api_types::product::{ProductListQuery, ProductNew, ProductUpdate, ProductView};

fn map_product(product: engine::Product) -> ProductView {
    ProductView {
        id: product.id,
        name: product.name,
        description: product.description,
        price_minor: product.price_minor,
        quantity: product.quantity,
        active: product.active,
        created_at: product.created_at,
    }
}

pub async fn list(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Query(query): Query<ProductListQuery>,
) -> Result<Json<Vec<ProductView>>, ServerError> {
    let products = state
        .engine
        .list_products(&user, query.include_inactive.unwrap_or(false))
        .await?;
    Ok(Json(products.into_iter().map(map_product).collect()))
}

pub async fn create(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Json(payload): Json<ProductNew>,
) -> Result<(StatusCode, Json<ProductView>), ServerError> {
    let mut cmd = engine::ProductCmd::new(
        user,
        payload.name,
        payload.price_minor,
        payload.quantity,
    )
    .active(payload.active.unwrap_or(true));
    cmd.description = payload.description;

    let product = state.engine.create_product(cmd).await?;
    Ok((StatusCode::CREATED, Json(map_product(product))))
}

pub async fn get(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductView>, ServerError> {
    let product = state.engine.get_product(&user, id).await?;
    Ok(Json(map_product(product)))
}

pub async fn update(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductUpdate>,
) -> Result<Json<ProductView>, ServerError> {
    let mut cmd = engine::UpdateProductCmd::new(user, id);
    cmd.name = payload.name;
    cmd.description = payload.description;
    cmd.price_minor = payload.price_minor;
    cmd.quantity = payload.quantity;
    cmd.active = payload.active;

    let product = state.engine.update_product(cmd).await?;
    Ok(Json(map_product(product)))
}

pub async fn delete(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_product(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
