//! Ledger consistency core for MonoGestión.
//!
//! Four transactional record types (incomes, expenses, sales, purchases) are
//! mirrored one-to-one into a unified movement ledger, and sale/purchase line
//! items are coupled to product stock. Every write runs inside a single
//! database transaction.

pub use categories::{Category, CategoryKind};
pub use clients::Client;
pub use commands::{
    ContactCmd, ExpenseCmd, IncomeCmd, ProductCmd, ProductLineCmd, PurchaseCmd,
    PurchaseLineCmd, SaleCmd, ServiceCmd, ServiceLineCmd, UpdateContactCmd, UpdateExpenseCmd,
    UpdateIncomeCmd, UpdateProductCmd, UpdatePurchaseCmd, UpdateSaleCmd, UpdateServiceCmd,
};
pub use error::{EngineError, FieldError, FieldErrors, StockShortage};
pub use events::{DomainEvent, LogNotifier, Notifier};
pub use expenses::{Expense, PURCHASE_EXPENSE_CATEGORY};
pub use incomes::Income;
pub use movements::{Movement, MovementKind, MovementSource};
pub use ops::{
    Engine, EngineBuilder, MovementListFilter, MovementPage, ReconcileReport,
};
pub use products::Product;
pub use purchase_lines::PurchaseLine;
pub use purchases::Purchase;
pub use reports::{
    CategoryTotal, ClientRanking, DateRange, FinanceSummary, PeriodComparison, ProductRanking,
    ReportWindow, TrendGranularity, TrendPoint,
};
pub use sale_product_lines::SaleProductLine;
pub use sale_service_lines::SaleServiceLine;
pub use sales::{Sale, SaleKind};
pub use services::Service;
pub use suppliers::Supplier;

mod categories;
mod clients;
mod commands;
mod error;
mod events;
mod expense_categories;
mod expenses;
mod income_categories;
mod incomes;
mod movements;
mod ops;
mod products;
mod purchase_lines;
mod purchases;
pub mod reports;
mod sale_product_lines;
mod sale_service_lines;
mod sales;
mod services;
pub mod stock;
mod suppliers;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
