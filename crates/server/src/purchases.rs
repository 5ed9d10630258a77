use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{ServerError, optional_range, server::AuthUser, server::ServerState};
use api_types::{
    RangeQuery,
    purchase::{PurchaseLine, PurchaseLineView, PurchaseNew, PurchaseUpdate, PurchaseView},
};

fn lines(lines: Vec<PurchaseLine>) -> Vec<engine::PurchaseLineCmd> {
    lines
        .into_iter()
        .map(|line| engine::PurchaseLineCmd {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price_minor: line.unit_price_minor,
        })
        .collect()
}

fn map_purchase(purchase: engine::Purchase) -> PurchaseView {
    PurchaseView {
        id: purchase.id,
        occurred_at: purchase.occurred_at,
        amount_minor: purchase.amount_minor,
        description: purchase.description,
        supplier_id: purchase.supplier_id,
        supplier_name: purchase.supplier_name,
        lines: purchase
            .lines
            .into_iter()
            .map(|line| PurchaseLineView {
                id: line.id,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price_minor: line.unit_price_minor,
            })
            .collect(),
        expense_id: purchase.expense_id,
    }
}

pub async fn list(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<PurchaseView>>, ServerError> {
    let range = optional_range(query.from, query.to)?;
    let purchases = state.engine.list_purchases(&user, range).await?;
    Ok(Json(purchases.into_iter().map(map_purchase).collect()))
}

pub async fn create(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Json(payload): Json<PurchaseNew>,
) -> Result<(StatusCode, Json<PurchaseView>), ServerError> {
    let mut cmd = engine::PurchaseCmd::new(user, payload.occurred_at.with_timezone(&Utc));
    cmd.amount_minor = payload.amount_minor;
    cmd.supplier_id = payload.supplier_id;
    cmd.description = payload.description;
    cmd.lines = lines(payload.lines);

    let purchase = state.engine.create_purchase(cmd).await?;
    Ok((StatusCode::CREATED, Json(map_purchase(purchase))))
}

pub async fn get(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PurchaseView>, ServerError> {
    let purchase = state.engine.get_purchase(&user, id).await?;
    Ok(Json(map_purchase(purchase)))
}

pub async fn update(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PurchaseUpdate>,
) -> Result<Json<PurchaseView>, ServerError> {
    let mut cmd = engine::UpdatePurchaseCmd::new(user, id);
    cmd.occurred_at = payload.occurred_at.map(|at| at.with_timezone(&Utc));
    cmd.amount_minor = payload.amount_minor;
    cmd.supplier_id = payload.supplier_id;
    cmd.description = payload.description;
    cmd.lines = payload.lines.map(lines);

    let purchase = state.engine.update_purchase(cmd).await?;
    Ok(Json(map_purchase(purchase)))
}

pub async fn delete(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_purchase(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
