use axum::{
    Extension, Json,
    extract::{Query, State},
};
use chrono::Utc;

use crate::{ServerError, server::AuthUser, server::ServerState};
use api_types::movement::{MovementKind, MovementListQuery, MovementListResponse, MovementView};
use engine::{MovementListFilter, ReconcileReport};

const DEFAULT_PAGE_SIZE: u64 = 50;

fn map_kind(kind: engine::MovementKind) -> MovementKind {
    match kind {
        engine::MovementKind::Income => MovementKind::Ingreso,
        engine::MovementKind::Expense => MovementKind::Egreso,
        engine::MovementKind::Sale => MovementKind::Venta,
        engine::MovementKind::Purchase => MovementKind::Compra,
    }
}

/// `Ingreso,Venta` → kinds; blank entries are ignored.
fn parse_kinds(raw: &str) -> Result<Vec<engine::MovementKind>, ServerError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| engine::MovementKind::try_from(s).map_err(ServerError::from))
        .collect()
}

pub async fn list(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
    Query(query): Query<MovementListQuery>,
) -> Result<Json<MovementListResponse>, ServerError> {
    let filter = MovementListFilter {
        from: query.from.map(|at| at.with_timezone(&Utc)),
        to: query.to.map(|at| at.with_timezone(&Utc)),
        kinds: query.kinds.as_deref().map(parse_kinds).transpose()?,
    };

    let page = state
        .engine
        .list_movements(
            &user,
            &filter,
            query.cursor.as_deref(),
            query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;

    let movements = page
        .items
        .into_iter()
        .map(|movement| MovementView {
            id: movement.id,
            kind: map_kind(movement.kind()),
            occurred_at: movement.occurred_at,
            amount_minor: movement.amount_minor,
            description: movement.description,
            source_id: movement.source.id(),
        })
        .collect();

    Ok(Json(MovementListResponse {
        movements,
        next_cursor: page.next_cursor,
    }))
}

pub async fn reconcile(
    Extension(AuthUser(user)): Extension<AuthUser>,
    State(state): State<ServerState>,
) -> Result<Json<ReconcileReport>, ServerError> {
    let report = state.engine.reconcile_ledger(&user).await?;
    tracing::info!(
        %user,
        created = report.created,
        updated = report.updated,
        removed = report.removed,
        "ledger reconciled"
    );
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_comma_separated() {
        assert_eq!(
            parse_kinds("Ingreso, Venta,").unwrap(),
            vec![engine::MovementKind::Income, engine::MovementKind::Sale]
        );
        assert!(parse_kinds("Ingreso,Regalo").is_err());
    }
}
