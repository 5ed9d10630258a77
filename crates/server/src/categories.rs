use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::AuthUser, server::ServerState};
use api_types::category::{CategoryKind, CategoryName, CategoryView};

fn map_kind(kind: CategoryKind) -> engine::CategoryKind {
    match kind {
        CategoryKind::Income => engine::CategoryKind::Income,
        CategoryKind::Expense => engine::CategoryKind::Expense,
    }
}

fn map_category(category: engine::Category) -> CategoryView {
    CategoryView {
        id: category.id,
        kind: match category.kind {
            engine::CategoryKind::Income => CategoryKind::Income,
            engine::CategoryKind::Expense => CategoryKind::Expense,
        },
        name: category.name,
        created_at: category.created_at,
    }
}

pub async fn list(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(kind): Path<CategoryKind>,
) -> Result<Json<Vec<CategoryView>>, ServerError> {
    let categories = state
        .engine
        .list_categories(&user, map_kind(kind))
        .await?;
    Ok(Json(categories.into_iter().map(map_category).collect()))
}

pub async fn create(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(kind): Path<CategoryKind>,
    Json(payload): Json<CategoryName>,
) -> Result<(StatusCode, Json<CategoryView>), ServerError> {
    let category = state
        .engine
        .create_category(&user, map_kind(kind), &payload.name)
        .await?;
    Ok((StatusCode::CREATED, Json(map_category(category))))
}

pub async fn get(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path((kind, id)): Path<(CategoryKind, Uuid)>,
) -> Result<Json<CategoryView>, ServerError> {
    let category = state
        .engine
        .get_category(&user, map_kind(kind), id)
        .await?;
    Ok(Json(map_category(category)))
}

pub async fn rename(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path((kind, id)): Path<(CategoryKind, Uuid)>,
    Json(payload): Json<CategoryName>,
) -> Result<Json<CategoryView>, ServerError> {
    let category = state
        .engine
        .rename_category(&user, map_kind(kind), id, &payload.name)
        .await?;
    Ok(Json(map_category(category)))
}

/// Rejected while any income or expense still points at the category.
pub async fn delete(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path((kind, id)): Path<(CategoryKind, Uuid)>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_category(&user, map_kind(kind), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
