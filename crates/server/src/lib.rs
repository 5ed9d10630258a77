use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::IntoResponse,
};
use chrono::{DateTime, FixedOffset, Utc};
use engine::{DateRange, EngineError};

use api_types::error::{ErrorBody, FieldErrorView, ShortageView};
pub use rate_limit::{KeyedRateLimiter, RateDecision, RateLimiter};
pub use server::{ServerConfig, ServerState, router, run, run_with_listener, spawn_with_listener};

mod categories;
mod contacts;
mod expenses;
mod incomes;
mod movements;
mod products;
mod purchases;
mod rate_limit;
mod reports;
mod sales;
mod server;
mod services;

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    Generic(String),
    RateLimited { retry_after_secs: u64 },
}

const INTERNAL_ERROR: &str = "internal server error";

/// Diagnostic text of a 500 response, attached as a response extension.
///
/// Only development deployments copy it into the body.
#[derive(Clone, Debug)]
pub struct InternalErrorDetail(pub String);

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_)
        | EngineError::StillReferenced { .. }
        | EngineError::InsufficientStock(_)
        | EngineError::Conflict(_) => StatusCode::CONFLICT,
        EngineError::InvalidCursor(_) => StatusCode::BAD_REQUEST,
        EngineError::InvalidId(_) | EngineError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn body_for_engine_error(err: EngineError) -> (ErrorBody, Option<InternalErrorDetail>) {
    let error = err.to_string();
    match err {
        EngineError::Validation(fields) => (
            ErrorBody {
                error,
                fields: Some(
                    fields
                        .iter()
                        .map(|f| FieldErrorView {
                            field: f.field.clone(),
                            message: f.message.clone(),
                        })
                        .collect(),
                ),
                ..Default::default()
            },
            None,
        ),
        EngineError::StillReferenced { count, .. } => (
            ErrorBody {
                error,
                count: Some(count),
                ..Default::default()
            },
            None,
        ),
        EngineError::InsufficientStock(shortages) => (
            ErrorBody {
                error,
                shortages: Some(
                    shortages
                        .into_iter()
                        .map(|s| ShortageView {
                            product_id: s.product_id,
                            product: s.product,
                            available: s.available,
                            requested: s.requested,
                        })
                        .collect(),
                ),
                ..Default::default()
            },
            None,
        ),
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            internal_body(db_err.to_string())
        }
        EngineError::InvalidId(id) => {
            tracing::error!("corrupted identifier in storage: {id}");
            internal_body(error)
        }
        _ => (
            ErrorBody {
                error,
                ..Default::default()
            },
            None,
        ),
    }
}

fn internal_body(detail: String) -> (ErrorBody, Option<InternalErrorDetail>) {
    (
        ErrorBody {
            error: INTERNAL_ERROR.to_string(),
            ..Default::default()
        },
        Some(InternalErrorDetail(detail)),
    )
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ServerError::Engine(err) => {
                let status = status_for_engine_error(&err);
                let (body, detail) = body_for_engine_error(err);
                let mut response = (status, Json(body)).into_response();
                if let Some(detail) = detail {
                    response.extensions_mut().insert(detail);
                }
                response
            }
            ServerError::Generic(error) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    error,
                    ..Default::default()
                }),
            )
                .into_response(),
            ServerError::RateLimited { retry_after_secs } => {
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(ErrorBody {
                        error: "too many requests".to_string(),
                        ..Default::default()
                    }),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));
                response
            }
        }
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

/// Optional `[from, to)` filter; both bounds or neither.
pub(crate) fn optional_range(
    from: Option<DateTime<FixedOffset>>,
    to: Option<DateTime<FixedOffset>>,
) -> Result<Option<DateRange>, ServerError> {
    match (from, to) {
        (None, None) => Ok(None),
        (Some(from), Some(to)) => Ok(Some(required_range(from, to)?)),
        _ => Err(ServerError::Generic(
            "from and to must be given together".to_string(),
        )),
    }
}

pub(crate) fn required_range(
    from: DateTime<FixedOffset>,
    to: DateTime<FixedOffset>,
) -> Result<DateRange, ServerError> {
    Ok(DateRange::new(
        from.with_timezone(&Utc),
        to.with_timezone(&Utc),
    )?)
}
