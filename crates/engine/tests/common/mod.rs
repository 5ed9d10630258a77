#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{DomainEvent, Engine, Movement, MovementListFilter, Notifier, Product, ProductCmd};
use migration::MigratorTrait;

pub const USER: &str = "alice";

/// Collects every event it is handed.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<DomainEvent>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: &DomainEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let (engine, db, _) = engine_with_notifier().await;
    (engine, db)
}

pub async fn engine_with_notifier() -> (Engine, DatabaseConnection, Arc<RecordingNotifier>) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = Engine::builder()
        .database(db.clone())
        .notifier(notifier.clone())
        .build()
        .await
        .unwrap();
    engine.create_user(USER, "password").await.unwrap();
    engine.create_user("bob", "password").await.unwrap();
    (engine, db, notifier)
}

pub fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()
}

pub async fn product(engine: &Engine, name: &str, quantity: i64) -> Product {
    engine
        .create_product(ProductCmd::new(USER, name, 10, quantity))
        .await
        .unwrap()
}

pub async fn stock(engine: &Engine, product: &Product) -> i64 {
    engine.get_product(USER, product.id).await.unwrap().quantity
}

pub async fn all_movements(engine: &Engine, user_id: &str) -> Vec<Movement> {
    engine
        .list_movements(user_id, &MovementListFilter::default(), None, 500)
        .await
        .unwrap()
        .items
}

pub async fn execute(db: &DatabaseConnection, sql: &str, values: Vec<sea_orm::Value>) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(backend, sql, values))
        .await
        .unwrap();
}
