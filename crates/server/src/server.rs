use axum::{
    Json, Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};

use std::{net::SocketAddr, sync::Arc, time::Duration};

use crate::{
    InternalErrorDetail, KeyedRateLimiter, RateLimiter, categories, contacts, expenses, incomes,
    movements, products, purchases, rate_limit, reports, sales, services,
};
use api_types::error::ErrorBody;
use engine::Engine;

/// Runtime knobs of the HTTP surface.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub rate_limit_requests: u32,
    pub rate_limit_window: Duration,
    /// Rate-limit on the first `x-forwarded-for` hop instead of the peer
    /// address. Only safe behind a proxy that sets the header.
    pub trust_forwarded_for: bool,
    /// Copy internal error details into 500 bodies. Development only.
    pub expose_internal_errors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rate_limit_requests: 100,
            rate_limit_window: Duration::from_secs(60),
            trust_forwarded_for: false,
            expose_internal_errors: false,
        }
    }
}

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub trust_forwarded_for: bool,
    pub expose_internal_errors: bool,
}

impl ServerState {
    pub fn new(engine: Engine, config: &ServerConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            rate_limiter: Arc::new(KeyedRateLimiter::new(
                config.rate_limit_requests,
                config.rate_limit_window,
            )),
            trust_forwarded_for: config.trust_forwarded_for,
            expose_internal_errors: config.expose_internal_errors,
        }
    }
}

/// The authenticated caller, inserted by the auth middleware.
#[derive(Clone, Debug)]
pub(crate) struct AuthUser(pub String);

async fn auth(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(TypedHeader(auth_header)) = auth_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user = state
        .engine
        .authenticate(auth_header.username(), auth_header.password())
        .await
        .map_err(|err| {
            tracing::error!("authentication lookup failed: {err}");
            StatusCode::UNAUTHORIZED
        })?;

    let Some(user) = user else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(AuthUser(user));
    Ok(next.run(request).await)
}

/// Rewrite 500 bodies to include their diagnostic detail when enabled.
async fn internal_error_detail(State(state): State<ServerState>, response: Response) -> Response {
    if !state.expose_internal_errors {
        return response;
    }
    let Some(InternalErrorDetail(detail)) = response.extensions().get::<InternalErrorDetail>()
    else {
        return response;
    };
    let body = ErrorBody {
        error: "internal server error".to_string(),
        detail: Some(detail.clone()),
        ..Default::default()
    };
    (response.status(), Json(body)).into_response()
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{id}",
            get(products::get).patch(products::update).delete(products::delete),
        )
        .route("/services", get(services::list).post(services::create))
        .route(
            "/services/{id}",
            get(services::get).patch(services::update).delete(services::delete),
        )
        .route("/clients", get(contacts::list_clients).post(contacts::create_client))
        .route(
            "/clients/{id}",
            get(contacts::get_client)
                .patch(contacts::update_client)
                .delete(contacts::delete_client),
        )
        .route(
            "/suppliers",
            get(contacts::list_suppliers).post(contacts::create_supplier),
        )
        .route(
            "/suppliers/{id}",
            get(contacts::get_supplier)
                .patch(contacts::update_supplier)
                .delete(contacts::delete_supplier),
        )
        .route(
            "/categories/{kind}",
            get(categories::list).post(categories::create),
        )
        .route(
            "/categories/{kind}/{id}",
            get(categories::get)
                .patch(categories::rename)
                .delete(categories::delete),
        )
        .route("/incomes", get(incomes::list).post(incomes::create))
        .route(
            "/incomes/{id}",
            get(incomes::get).patch(incomes::update).delete(incomes::delete),
        )
        .route("/expenses", get(expenses::list).post(expenses::create))
        .route(
            "/expenses/{id}",
            get(expenses::get).patch(expenses::update).delete(expenses::delete),
        )
        .route("/sales", get(sales::list).post(sales::create))
        .route(
            "/sales/{id}",
            get(sales::get).patch(sales::update).delete(sales::delete),
        )
        .route("/purchases", get(purchases::list).post(purchases::create))
        .route(
            "/purchases/{id}",
            get(purchases::get)
                .patch(purchases::update)
                .delete(purchases::delete),
        )
        .route("/movements", get(movements::list))
        .route("/ledger/reconcile", post(movements::reconcile))
        .route("/finance/summary", get(reports::summary))
        .route("/reports/trend", get(reports::trend))
        .route("/reports/compare", get(reports::compare))
        .route("/reports/top-products", get(reports::top_products))
        .route("/reports/top-clients", get(reports::top_clients))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit,
        ))
        .layer(middleware::map_response_with_state(
            state.clone(),
            internal_error_detail,
        ))
        .with_state(state)
}

pub async fn run(engine: Engine, addr: SocketAddr, config: ServerConfig) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener, config).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
    config: ServerConfig,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState::new(engine, &config);

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
    config: ServerConfig,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener, config).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
