//! Read-only aggregation endpoints. The engine report types are serialized as is.

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use chrono::Utc;

use crate::{ServerError, optional_range, required_range, server::AuthUser, server::ServerState};
use api_types::report::{CompareQuery, Granularity, SummaryQuery, TopQuery, TrendQuery};
use engine::{
    ClientRanking, FinanceSummary, PeriodComparison, ProductRanking, ReportWindow,
    TrendGranularity, TrendPoint,
};

const DEFAULT_WINDOW_DAYS: u32 = 30;
const DEFAULT_TOP_LIMIT: usize = 10;

fn window(query: &SummaryQuery) -> Result<ReportWindow, ServerError> {
    if let Some(range) = optional_range(query.from, query.to)? {
        return Ok(ReportWindow::Range(range));
    }
    match (query.last_days, query.last_months) {
        (Some(_), Some(_)) => Err(ServerError::Generic(
            "last_days and last_months are mutually exclusive".to_string(),
        )),
        (_, Some(months)) => Ok(ReportWindow::LastMonths(months)),
        (days, None) => Ok(ReportWindow::LastDays(days.unwrap_or(DEFAULT_WINDOW_DAYS))),
    }
}

fn map_granularity(granularity: Granularity) -> TrendGranularity {
    match granularity {
        Granularity::Daily => TrendGranularity::Daily,
        Granularity::Weekly => TrendGranularity::Weekly,
        Granularity::Monthly => TrendGranularity::Monthly,
    }
}

pub async fn summary(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<FinanceSummary>, ServerError> {
    let summary = state
        .engine
        .finance_summary(&user, window(&query)?, Utc::now())
        .await?;
    Ok(Json(summary))
}

pub async fn trend(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<Vec<TrendPoint>>, ServerError> {
    let points = state
        .engine
        .trend(
            &user,
            map_granularity(query.granularity),
            query.periods,
            Utc::now(),
        )
        .await?;
    Ok(Json(points))
}

pub async fn compare(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Query(query): Query<CompareQuery>,
) -> Result<Json<PeriodComparison>, ServerError> {
    let range = required_range(query.from, query.to)?;
    let comparison = state.engine.compare_periods(&user, range).await?;
    Ok(Json(comparison))
}

pub async fn top_products(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Query(query): Query<TopQuery>,
) -> Result<Json<Vec<ProductRanking>>, ServerError> {
    let range = required_range(query.from, query.to)?;
    let ranking = state
        .engine
        .top_products(&user, range, query.limit.unwrap_or(DEFAULT_TOP_LIMIT))
        .await?;
    Ok(Json(ranking))
}

pub async fn top_clients(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Query(query): Query<TopQuery>,
) -> Result<Json<Vec<ClientRanking>>, ServerError> {
    let range = required_range(query.from, query.to)?;
    let ranking = state
        .engine
        .top_clients(&user, range, query.limit.unwrap_or(DEFAULT_TOP_LIMIT))
        .await?;
    Ok(Json(ranking))
}
