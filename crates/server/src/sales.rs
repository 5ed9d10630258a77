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
    sale::{
        ProductLine, ProductLineView, SaleKind, SaleNew, SaleUpdate, SaleView, ServiceLine,
        ServiceLineView,
    },
};

fn map_kind(kind: SaleKind) -> engine::SaleKind {
    match kind {
        SaleKind::Product => engine::SaleKind::Product,
        SaleKind::Service => engine::SaleKind::Service,
        SaleKind::Mixed => engine::SaleKind::Mixed,
    }
}

fn map_kind_view(kind: engine::SaleKind) -> SaleKind {
    match kind {
        engine::SaleKind::Product => SaleKind::Product,
        engine::SaleKind::Service => SaleKind::Service,
        engine::SaleKind::Mixed => SaleKind::Mixed,
    }
}

fn product_lines(lines: Vec<ProductLine>) -> Vec<engine::ProductLineCmd> {
    lines
        .into_iter()
        .map(|line| engine::ProductLineCmd {
            product_id: line.product_id,
            quantity: line.quantity,
            price_minor: line.price_minor,
        })
        .collect()
}

fn service_lines(lines: Vec<ServiceLine>) -> Vec<engine::ServiceLineCmd> {
    lines
        .into_iter()
        .map(|line| engine::ServiceLineCmd {
            service_id: line.service_id,
            quantity: line.quantity,
            price_minor: line.price_minor,
        })
        .collect()
}

fn map_sale(sale: engine::Sale) -> SaleView {
    SaleView {
        id: sale.id,
        kind: map_kind_view(sale.kind),
        occurred_at: sale.occurred_at,
        amount_minor: sale.amount_minor,
        client_id: sale.client_id,
        client_name: sale.client_name,
        product_lines: sale
            .product_lines
            .into_iter()
            .map(|line| ProductLineView {
                id: line.id,
                product_id: line.product_id,
                quantity: line.quantity,
                price_minor: line.price_minor,
            })
            .collect(),
        service_lines: sale
            .service_lines
            .into_iter()
            .map(|line| ServiceLineView {
                id: line.id,
                service_id: line.service_id,
                quantity: line.quantity,
                price_minor: line.price_minor,
            })
            .collect(),
    }
}

pub async fn list(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<SaleView>>, ServerError> {
    let range = optional_range(query.from, query.to)?;
    let sales = state.engine.list_sales(&user, range).await?;
    Ok(Json(sales.into_iter().map(map_sale).collect()))
}

/// Records the sale, its movement and the stock decrements in one transaction.
pub async fn create(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Json(payload): Json<SaleNew>,
) -> Result<(StatusCode, Json<SaleView>), ServerError> {
    let mut cmd = engine::SaleCmd::new(
        user,
        map_kind(payload.kind),
        payload.amount_minor,
        payload.occurred_at.with_timezone(&Utc),
    );
    cmd.client_id = payload.client_id;
    cmd.product_lines = product_lines(payload.product_lines);
    cmd.service_lines = service_lines(payload.service_lines);

    let sale = state.engine.create_sale(cmd).await?;
    Ok((StatusCode::CREATED, Json(map_sale(sale))))
}

pub async fn get(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SaleView>, ServerError> {
    let sale = state.engine.get_sale(&user, id).await?;
    Ok(Json(map_sale(sale)))
}

pub async fn update(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SaleUpdate>,
) -> Result<Json<SaleView>, ServerError> {
    let mut cmd = engine::UpdateSaleCmd::new(user, id);
    cmd.occurred_at = payload.occurred_at.map(|at| at.with_timezone(&Utc));
    cmd.amount_minor = payload.amount_minor;
    cmd.kind = payload.kind.map(map_kind);
    cmd.client_id = payload.client_id;
    cmd.product_lines = payload.product_lines.map(product_lines);
    cmd.service_lines = payload.service_lines.map(service_lines);

    let sale = state.engine.update_sale(cmd).await?;
    Ok(Json(map_sale(sale)))
}

/// Deleting a sale puts its sold units back into stock.
pub async fn delete(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_sale(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
