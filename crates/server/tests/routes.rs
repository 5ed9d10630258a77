use std::{net::SocketAddr, time::Duration};

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode, header},
};
use base64::Engine as _;
use http_body_util::BodyExt;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};
use serde_json::{Value, json};
use tower::util::ServiceExt;

use engine::Engine;
use migration::MigratorTrait;
use server::{ServerConfig, ServerState, router};

const USER: &str = "alice";
const PASSWORD: &str = "s3cret";

async fn app_with(config: ServerConfig) -> (Router, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db.clone()).build().await.unwrap();
    engine.create_user(USER, PASSWORD).await.unwrap();
    (router(ServerState::new(engine, &config)), db)
}

async fn app() -> Router {
    app_with(ServerConfig::default()).await.0
}

fn basic(user: &str, password: &str) -> String {
    let token = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{password}"));
    format!("Basic {token}")
}

fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, basic(USER, PASSWORD));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn create_product(app: &Router, name: &str, quantity: i64) -> String {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/products",
            Some(json!({"name": name, "price_minor": 10, "quantity": quantity})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn requests_without_valid_credentials_are_rejected() {
    let app = app().await;

    let anonymous = Request::builder()
        .uri("/products")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, anonymous).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong = Request::builder()
        .uri("/products")
        .header(header::AUTHORIZATION, basic(USER, "nope"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, request("GET", "/products", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn sale_decrements_stock_and_reports_shortages() {
    let app = app().await;
    let widget = create_product(&app, "Widget", 10).await;

    let (status, sale) = send(
        &app,
        request(
            "POST",
            "/sales",
            Some(json!({
                "kind": "producto",
                "amount_minor": 30,
                "occurred_at": "2026-03-05T10:00:00Z",
                "product_lines": [{"product_id": widget, "quantity": 3, "price_minor": 10}],
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sale["product_lines"].as_array().unwrap().len(), 1);

    let (_, product) = send(&app, request("GET", &format!("/products/{widget}"), None)).await;
    assert_eq!(product["quantity"], 7);

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/sales",
            Some(json!({
                "kind": "producto",
                "amount_minor": 80,
                "occurred_at": "2026-03-06T10:00:00Z",
                "product_lines": [{"product_id": widget, "quantity": 8, "price_minor": 10}],
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["shortages"][0]["product"], "Widget");
    assert_eq!(body["shortages"][0]["available"], 7);
    assert_eq!(body["shortages"][0]["requested"], 8);

    let (_, movements) = send(&app, request("GET", "/movements", None)).await;
    assert_eq!(movements["movements"].as_array().unwrap().len(), 1);
    assert_eq!(movements["movements"][0]["kind"], "Venta");
    assert_eq!(movements["movements"][0]["source_id"], sale["id"]);
}

#[tokio::test]
async fn validation_errors_list_each_field() {
    let app = app().await;
    let (status, body) = send(
        &app,
        request(
            "POST",
            "/products",
            Some(json!({"name": " ", "price_minor": -1, "quantity": 0})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"name"));
    assert!(fields.contains(&"price_minor"));
}

#[tokio::test]
async fn referenced_category_delete_reports_count() {
    let app = app().await;
    let (status, category) = send(
        &app,
        request("POST", "/categories/income", Some(json!({"name": "Salario"}))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = category["id"].as_str().unwrap();

    for day in ["01", "02"] {
        let (status, _) = send(
            &app,
            request(
                "POST",
                "/incomes",
                Some(json!({
                    "amount_minor": 1000,
                    "occurred_at": format!("2026-03-{day}T09:00:00Z"),
                    "category_id": id,
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(
        &app,
        request("DELETE", &format!("/categories/income/{id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["count"], 2);

    let (status, _) = send(
        &app,
        request("GET", &format!("/categories/expense/{id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn movements_paginate_and_filter_by_kind() {
    let app = app().await;
    for day in 1..=3 {
        send(
            &app,
            request(
                "POST",
                "/incomes",
                Some(json!({
                    "amount_minor": day * 100,
                    "occurred_at": format!("2026-03-0{day}T09:00:00Z"),
                })),
            ),
        )
        .await;
    }
    send(
        &app,
        request(
            "POST",
            "/expenses",
            Some(json!({
                "amount_minor": 50,
                "occurred_at": "2026-03-04T09:00:00Z",
                "category": "Luz",
            })),
        ),
    )
    .await;

    let (status, page) = send(&app, request("GET", "/movements?limit=2", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["movements"][0]["kind"], "Egreso");
    let cursor = page["next_cursor"].as_str().unwrap();

    let (_, rest) = send(
        &app,
        request("GET", &format!("/movements?limit=2&cursor={cursor}"), None),
    )
    .await;
    assert_eq!(rest["movements"].as_array().unwrap().len(), 2);
    assert!(rest["next_cursor"].is_null());

    let (_, incomes) = send(&app, request("GET", "/movements?kinds=Ingreso", None)).await;
    assert_eq!(incomes["movements"].as_array().unwrap().len(), 3);

    let (status, _) = send(&app, request("GET", "/movements?cursor=garbage", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn finance_summary_over_an_explicit_range() {
    let app = app().await;
    send(
        &app,
        request(
            "POST",
            "/incomes",
            Some(json!({"amount_minor": 900, "occurred_at": "2026-03-02T09:00:00Z"})),
        ),
    )
    .await;
    send(
        &app,
        request(
            "POST",
            "/expenses",
            Some(json!({
                "amount_minor": 400,
                "occurred_at": "2026-03-03T09:00:00Z",
                "category": "Alquiler",
            })),
        ),
    )
    .await;

    let (status, summary) = send(
        &app,
        request(
            "GET",
            "/finance/summary?from=2026-03-01T00:00:00Z&to=2026-04-01T00:00:00Z",
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_income_minor"], 900);
    assert_eq!(summary["total_expense_minor"], 400);
    assert_eq!(summary["balance_minor"], 500);

    let (status, _) = send(
        &app,
        request("GET", "/finance/summary?from=2026-03-01T00:00:00Z", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn linked_purchase_expense_is_read_only() {
    let app = app().await;
    let widget = create_product(&app, "Widget", 0).await;
    let (status, purchase) = send(
        &app,
        request(
            "POST",
            "/purchases",
            Some(json!({
                "occurred_at": "2026-03-05T10:00:00Z",
                "lines": [{"product_id": widget, "quantity": 4, "unit_price_minor": 25}],
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(purchase["amount_minor"], 100);
    let expense_id = purchase["expense_id"].as_str().unwrap();

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/expenses/{expense_id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let purchase_id = purchase["id"].as_str().unwrap();
    let (status, _) = send(
        &app,
        request("DELETE", &format!("/purchases/{purchase_id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        request("GET", &format!("/expenses/{expense_id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn clients_are_limited_by_forwarded_address() {
    let (app, _db) = app_with(ServerConfig {
        rate_limit_requests: 2,
        rate_limit_window: Duration::from_secs(60),
        trust_forwarded_for: true,
        expose_internal_errors: false,
    })
    .await;

    let from = |ip: &str| {
        let mut req = request("GET", "/products", None);
        req.headers_mut()
            .insert("x-forwarded-for", ip.parse().unwrap());
        req
    };

    for _ in 0..2 {
        let (status, _) = send(&app, from("10.0.0.1")).await;
        assert_eq!(status, StatusCode::OK);
    }
    let res = app.clone().oneshot(from("10.0.0.1")).await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(res.headers().contains_key(header::RETRY_AFTER));

    let (status, _) = send(&app, from("10.0.0.2")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn forwarded_address_is_ignored_without_a_trusted_proxy() {
    let (app, _db) = app_with(ServerConfig {
        rate_limit_requests: 2,
        rate_limit_window: Duration::from_secs(60),
        ..ServerConfig::default()
    })
    .await;

    let rotating = |n: u8| {
        let mut req = request("GET", "/products", None);
        req.headers_mut()
            .insert("x-forwarded-for", format!("198.51.100.{n}").parse().unwrap());
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 7], 5000))));
        req
    };

    for n in 0..2 {
        let (status, _) = send(&app, rotating(n)).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = send(&app, rotating(2)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn internal_error_detail_only_in_development() {
    for expose in [false, true] {
        let (app, db) = app_with(ServerConfig {
            expose_internal_errors: expose,
            ..ServerConfig::default()
        })
        .await;
        db.execute_unprepared("DROP TABLE services").await.unwrap();

        let (status, body) = send(&app, request("GET", "/services", None)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal server error");
        assert_eq!(body.get("detail").is_some(), expose);
    }
}
