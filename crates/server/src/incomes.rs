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
    income::{IncomeNew, IncomeUpdate, IncomeView},
};

fn map_income(income: engine::Income) -> IncomeView {
    IncomeView {
        id: income.id,
        occurred_at: income.occurred_at,
        amount_minor: income.amount_minor,
        description: income.description,
        category_id: income.category_id,
        category_name: income.category_name,
    }
}

pub async fn list(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<IncomeView>>, ServerError> {
    let range = optional_range(query.from, query.to)?;
    let incomes = state.engine.list_incomes(&user, range).await?;
    Ok(Json(incomes.into_iter().map(map_income).collect()))
}

pub async fn create(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Json(payload): Json<IncomeNew>,
) -> Result<(StatusCode, Json<IncomeView>), ServerError> {
    let mut cmd = engine::IncomeCmd::new(
        user,
        payload.amount_minor,
        payload.occurred_at.with_timezone(&Utc),
    );
    cmd.description = payload.description;
    cmd.category_id = payload.category_id;

    let income = state.engine.create_income(cmd).await?;
    Ok((StatusCode::CREATED, Json(map_income(income))))
}

pub async fn get(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<IncomeView>, ServerError> {
    let income = state.engine.get_income(&user, id).await?;
    Ok(Json(map_income(income)))
}

pub async fn update(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<IncomeUpdate>,
) -> Result<Json<IncomeView>, ServerError> {
    let mut cmd = engine::UpdateIncomeCmd::new(user, id);
    cmd.occurred_at = payload.occurred_at.map(|at| at.with_timezone(&Utc));
    cmd.amount_minor = payload.amount_minor;
    cmd.description = payload.description;
    cmd.category_id = payload.category_id;

    let income = state.engine.update_income(cmd).await?;
    Ok(Json(map_income(income)))
}

pub async fn delete(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_income(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
