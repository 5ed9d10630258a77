use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Deserialize a patch field where an absent key means "keep", `null` means
/// "clear" and a value means "set".
///
/// Use together with `#[serde(default)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Created {
    pub id: Uuid,
}

/// Optional `[from, to)` filter for list endpoints.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RangeQuery {
    /// RFC3339 timestamp, including timezone offset.
    pub from: Option<DateTime<FixedOffset>>,
    /// RFC3339 timestamp, including timezone offset.
    pub to: Option<DateTime<FixedOffset>>,
}

pub mod error {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FieldErrorView {
        pub field: String,
        pub message: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ShortageView {
        pub product_id: Uuid,
        pub product: String,
        pub available: i64,
        pub requested: i64,
    }

    /// Body of every error response. Only `error` is always present.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ErrorBody {
        pub error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub fields: Option<Vec<FieldErrorView>>,
        /// Number of records blocking a delete.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub count: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub shortages: Option<Vec<ShortageView>>,
        /// Diagnostic detail, development environments only.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub detail: Option<String>,
    }
}

pub mod product {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProductNew {
        pub name: String,
        pub description: Option<String>,
        pub price_minor: i64,
        pub quantity: i64,
        pub active: Option<bool>,
    }

    /// Absent fields are kept; an empty `description` clears it.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ProductUpdate {
        pub name: Option<String>,
        pub description: Option<String>,
        pub price_minor: Option<i64>,
        pub quantity: Option<i64>,
        pub active: Option<bool>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ProductListQuery {
        pub include_inactive: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProductView {
        pub id: Uuid,
        pub name: String,
        pub description: Option<String>,
        pub price_minor: i64,
        pub quantity: i64,
        pub active: bool,
        pub created_at: DateTime<Utc>,
    }
}

pub mod service {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ServiceNew {
        pub name: String,
        pub description: Option<String>,
        pub price_minor: i64,
        pub active: Option<bool>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ServiceUpdate {
        pub name: Option<String>,
        pub description: Option<String>,
        pub price_minor: Option<i64>,
        pub active: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ServiceView {
        pub id: Uuid,
        pub name: String,
        pub description: Option<String>,
        pub price_minor: i64,
        pub active: bool,
        pub created_at: DateTime<Utc>,
    }
}

/// Clients and suppliers share the same shape.
pub mod contact {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ContactNew {
        pub name: String,
        pub phone: Option<String>,
        pub email: Option<String>,
        pub address: Option<String>,
    }

    /// Absent fields are kept; empty strings clear the optional ones.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ContactUpdate {
        pub name: Option<String>,
        pub phone: Option<String>,
        pub email: Option<String>,
        pub address: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ContactView {
        pub id: Uuid,
        pub name: String,
        pub phone: Option<String>,
        pub email: Option<String>,
        pub address: Option<String>,
        pub created_at: DateTime<Utc>,
    }
}

pub mod category {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum CategoryKind {
        Income,
        Expense,
    }

    /// Body for both create and rename.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryName {
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryView {
        pub id: Uuid,
        pub kind: CategoryKind,
        pub name: String,
        pub created_at: DateTime<Utc>,
    }
}

pub mod income {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct IncomeNew {
        pub amount_minor: i64,
        /// RFC3339 timestamp, including timezone offset.
        pub occurred_at: DateTime<FixedOffset>,
        pub description: Option<String>,
        pub category_id: Option<Uuid>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct IncomeUpdate {
        pub amount_minor: Option<i64>,
        pub occurred_at: Option<DateTime<FixedOffset>>,
        pub description: Option<String>,
        /// `null` unlinks the category.
        #[serde(default, deserialize_with = "double_option")]
        pub category_id: Option<Option<Uuid>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct IncomeView {
        pub id: Uuid,
        pub occurred_at: DateTime<Utc>,
        pub amount_minor: i64,
        pub description: Option<String>,
        pub category_id: Option<Uuid>,
        pub category_name: Option<String>,
    }
}

pub mod expense {
    use super::*;

    /// Either `category` text or `category_id` must be given.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub amount_minor: i64,
        /// RFC3339 timestamp, including timezone offset.
        pub occurred_at: DateTime<FixedOffset>,
        pub category: Option<String>,
        pub description: Option<String>,
        pub category_id: Option<Uuid>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExpenseUpdate {
        pub amount_minor: Option<i64>,
        pub occurred_at: Option<DateTime<FixedOffset>>,
        pub category: Option<String>,
        pub description: Option<String>,
        #[serde(default, deserialize_with = "double_option")]
        pub category_id: Option<Option<Uuid>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub id: Uuid,
        pub occurred_at: DateTime<Utc>,
        pub amount_minor: i64,
        pub category: String,
        pub description: Option<String>,
        pub category_id: Option<Uuid>,
        /// Set when the expense mirrors a purchase.
        pub purchase_id: Option<Uuid>,
    }
}

pub mod sale {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub enum SaleKind {
        #[serde(rename = "producto")]
        Product,
        #[serde(rename = "servicio")]
        Service,
        #[serde(rename = "mixta")]
        Mixed,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProductLine {
        pub product_id: Uuid,
        pub quantity: i64,
        pub price_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ServiceLine {
        pub service_id: Uuid,
        pub quantity: i64,
        pub price_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SaleNew {
        pub kind: SaleKind,
        pub amount_minor: i64,
        /// RFC3339 timestamp, including timezone offset.
        pub occurred_at: DateTime<FixedOffset>,
        pub client_id: Option<Uuid>,
        #[serde(default)]
        pub product_lines: Vec<ProductLine>,
        #[serde(default)]
        pub service_lines: Vec<ServiceLine>,
    }

    /// Submitting a line list replaces all lines of that type.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct SaleUpdate {
        pub kind: Option<SaleKind>,
        pub amount_minor: Option<i64>,
        pub occurred_at: Option<DateTime<FixedOffset>>,
        #[serde(default, deserialize_with = "double_option")]
        pub client_id: Option<Option<Uuid>>,
        pub product_lines: Option<Vec<ProductLine>>,
        pub service_lines: Option<Vec<ServiceLine>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ProductLineView {
        pub id: Uuid,
        pub product_id: Uuid,
        pub quantity: i64,
        pub price_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ServiceLineView {
        pub id: Uuid,
        pub service_id: Uuid,
        pub quantity: i64,
        pub price_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SaleView {
        pub id: Uuid,
        pub kind: SaleKind,
        pub occurred_at: DateTime<Utc>,
        pub amount_minor: i64,
        pub client_id: Option<Uuid>,
        pub client_name: Option<String>,
        pub product_lines: Vec<ProductLineView>,
        pub service_lines: Vec<ServiceLineView>,
    }
}

pub mod purchase {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PurchaseLine {
        pub product_id: Uuid,
        pub quantity: i64,
        pub unit_price_minor: i64,
    }

    /// Without `amount_minor` the total is derived from the lines.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct PurchaseNew {
        /// RFC3339 timestamp, including timezone offset.
        pub occurred_at: DateTime<FixedOffset>,
        pub amount_minor: Option<i64>,
        pub supplier_id: Option<Uuid>,
        pub description: Option<String>,
        /// Empty for purchases without stock; `amount_minor` is then required.
        #[serde(default)]
        pub lines: Vec<PurchaseLine>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct PurchaseUpdate {
        pub occurred_at: Option<DateTime<FixedOffset>>,
        pub amount_minor: Option<i64>,
        #[serde(default, deserialize_with = "double_option")]
        pub supplier_id: Option<Option<Uuid>>,
        pub description: Option<String>,
        pub lines: Option<Vec<PurchaseLine>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PurchaseLineView {
        pub id: Uuid,
        pub product_id: Uuid,
        pub quantity: i64,
        pub unit_price_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PurchaseView {
        pub id: Uuid,
        pub occurred_at: DateTime<Utc>,
        pub amount_minor: i64,
        pub description: Option<String>,
        pub supplier_id: Option<Uuid>,
        pub supplier_name: Option<String>,
        pub lines: Vec<PurchaseLineView>,
        pub expense_id: Option<Uuid>,
    }
}

pub mod movement {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub enum MovementKind {
        Ingreso,
        Egreso,
        Venta,
        Compra,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct MovementListQuery {
        pub from: Option<DateTime<FixedOffset>>,
        pub to: Option<DateTime<FixedOffset>>,
        /// Comma separated kinds, e.g. `Ingreso,Venta`.
        pub kinds: Option<String>,
        pub limit: Option<u64>,
        /// Opaque pagination cursor (base64), from `next_cursor`.
        pub cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MovementView {
        pub id: Uuid,
        pub kind: MovementKind,
        pub occurred_at: DateTime<Utc>,
        pub amount_minor: i64,
        pub description: Option<String>,
        /// Id of the income, expense, sale or purchase behind the movement.
        pub source_id: Uuid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MovementListResponse {
        pub movements: Vec<MovementView>,
        /// Opaque cursor for fetching the next page (older items).
        pub next_cursor: Option<String>,
    }
}

pub mod report {
    use super::*;

    /// Either an explicit `from`/`to` pair, or one trailing window.
    /// Defaults to `last_days = 30`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct SummaryQuery {
        pub from: Option<DateTime<FixedOffset>>,
        pub to: Option<DateTime<FixedOffset>>,
        pub last_days: Option<u32>,
        pub last_months: Option<u32>,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Granularity {
        Daily,
        Weekly,
        Monthly,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TrendQuery {
        pub granularity: Granularity,
        pub periods: u32,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CompareQuery {
        pub from: DateTime<FixedOffset>,
        pub to: DateTime<FixedOffset>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TopQuery {
        pub from: DateTime<FixedOffset>,
        pub to: DateTime<FixedOffset>,
        pub limit: Option<usize>,
    }
}
