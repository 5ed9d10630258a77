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
    expense::{ExpenseNew, ExpenseUpdate, ExpenseView},
};

fn map_expense(expense: engine::Expense) -> ExpenseView {
    ExpenseView {
        id: expense.id,
        occurred_at: expense.occurred_at,
        amount_minor: expense.amount_minor,
        category: expense.category,
        description: expense.description,
        category_id: expense.category_id,
        purchase_id: expense.purchase_id,
    }
}

/// Includes the expenses mirrored from purchases.
pub async fn list(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<ExpenseView>>, ServerError> {
    let range = optional_range(query.from, query.to)?;
    let expenses = state.engine.list_expenses(&user, range).await?;
    Ok(Json(expenses.into_iter().map(map_expense).collect()))
}

pub async fn create(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<ExpenseView>), ServerError> {
    let mut cmd = engine::ExpenseCmd::new(
        user,
        payload.amount_minor,
        payload.occurred_at.with_timezone(&Utc),
    );
    cmd.category = payload.category;
    cmd.description = payload.description;
    cmd.category_id = payload.category_id;

    let expense = state.engine.create_expense(cmd).await?;
    Ok((StatusCode::CREATED, Json(map_expense(expense))))
}

pub async fn get(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExpenseView>, ServerError> {
    let expense = state.engine.get_expense(&user, id).await?;
    Ok(Json(map_expense(expense)))
}

pub async fn update(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ExpenseUpdate>,
) -> Result<Json<ExpenseView>, ServerError> {
    let mut cmd = engine::UpdateExpenseCmd::new(user, id);
    cmd.occurred_at = payload.occurred_at.map(|at| at.with_timezone(&Utc));
    cmd.amount_minor = payload.amount_minor;
    cmd.category = payload.category;
    cmd.description = payload.description;
    cmd.category_id = payload.category_id;

    let expense = state.engine.update_expense(cmd).await?;
    Ok(Json(map_expense(expense)))
}

pub async fn delete(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_expense(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
