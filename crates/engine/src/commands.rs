//! Command structs for engine operations.
//!
//! These types group parameters for write operations, keeping call sites
//! readable and avoiding long argument lists.
//!
//! Update commands are patches: `None` keeps the stored value. For optional
//! text, `Some("")` clears it; for optional links, `Some(None)` clears it.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::SaleKind;

/// Create a product.
#[derive(Clone, Debug)]
pub struct ProductCmd {
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price_minor: i64,
    pub quantity: i64,
    pub active: bool,
}

impl ProductCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        price_minor: i64,
        quantity: i64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            description: None,
            price_minor,
            quantity,
            active: true,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

/// Patch a product.
#[derive(Clone, Debug)]
pub struct UpdateProductCmd {
    pub user_id: String,
    pub product_id: Uuid,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_minor: Option<i64>,
    pub quantity: Option<i64>,
    pub active: Option<bool>,
}

impl UpdateProductCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, product_id: Uuid) -> Self {
        Self {
            user_id: user_id.into(),
            product_id,
            name: None,
            description: None,
            price_minor: None,
            quantity: None,
            active: None,
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn price_minor(mut self, price_minor: i64) -> Self {
        self.price_minor = Some(price_minor);
        self
    }

    #[must_use]
    pub fn quantity(mut self, quantity: i64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }
}

/// Create a service.
#[derive(Clone, Debug)]
pub struct ServiceCmd {
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price_minor: i64,
    pub active: bool,
}

impl ServiceCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, price_minor: i64) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            description: None,
            price_minor,
            active: true,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Patch a service.
#[derive(Clone, Debug)]
pub struct UpdateServiceCmd {
    pub user_id: String,
    pub service_id: Uuid,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_minor: Option<i64>,
    pub active: Option<bool>,
}

impl UpdateServiceCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, service_id: Uuid) -> Self {
        Self {
            user_id: user_id.into(),
            service_id,
            name: None,
            description: None,
            price_minor: None,
            active: None,
        }
    }
}

/// Create a client or a supplier.
#[derive(Clone, Debug)]
pub struct ContactCmd {
    pub user_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl ContactCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            phone: None,
            email: None,
            address: None,
        }
    }

    #[must_use]
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

/// Patch a client or a supplier.
#[derive(Clone, Debug)]
pub struct UpdateContactCmd {
    pub user_id: String,
    pub id: Uuid,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl UpdateContactCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, id: Uuid) -> Self {
        Self {
            user_id: user_id.into(),
            id,
            name: None,
            phone: None,
            email: None,
            address: None,
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Create an income.
#[derive(Clone, Debug)]
pub struct IncomeCmd {
    pub user_id: String,
    pub occurred_at: DateTime<Utc>,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
}

impl IncomeCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, amount_minor: i64, occurred_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            occurred_at,
            amount_minor,
            description: None,
            category_id: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn category_id(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }
}

/// Patch an income.
#[derive(Clone, Debug)]
pub struct UpdateIncomeCmd {
    pub user_id: String,
    pub income_id: Uuid,
    pub occurred_at: Option<DateTime<Utc>>,
    pub amount_minor: Option<i64>,
    pub description: Option<String>,
    pub category_id: Option<Option<Uuid>>,
}

impl UpdateIncomeCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, income_id: Uuid) -> Self {
        Self {
            user_id: user_id.into(),
            income_id,
            occurred_at: None,
            amount_minor: None,
            description: None,
            category_id: None,
        }
    }

    #[must_use]
    pub fn amount_minor(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn category_id(mut self, category_id: Option<Uuid>) -> Self {
        self.category_id = Some(category_id);
        self
    }
}

/// Create an expense.
///
/// `category` is the free-text label; when omitted, the linked category's
/// name is used.
#[derive(Clone, Debug)]
pub struct ExpenseCmd {
    pub user_id: String,
    pub occurred_at: DateTime<Utc>,
    pub amount_minor: i64,
    pub category: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
}

impl ExpenseCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, amount_minor: i64, occurred_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            occurred_at,
            amount_minor,
            category: None,
            description: None,
            category_id: None,
        }
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn category_id(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }
}

/// Patch an expense.
#[derive(Clone, Debug)]
pub struct UpdateExpenseCmd {
    pub user_id: String,
    pub expense_id: Uuid,
    pub occurred_at: Option<DateTime<Utc>>,
    pub amount_minor: Option<i64>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Option<Uuid>>,
}

impl UpdateExpenseCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, expense_id: Uuid) -> Self {
        Self {
            user_id: user_id.into(),
            expense_id,
            occurred_at: None,
            amount_minor: None,
            category: None,
            description: None,
            category_id: None,
        }
    }

    #[must_use]
    pub fn amount_minor(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// A product line of a sale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProductLineCmd {
    pub product_id: Uuid,
    pub quantity: i64,
    pub price_minor: i64,
}

/// A service line of a sale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceLineCmd {
    pub service_id: Uuid,
    pub quantity: i64,
    pub price_minor: i64,
}

/// Create a sale.
#[derive(Clone, Debug)]
pub struct SaleCmd {
    pub user_id: String,
    pub occurred_at: DateTime<Utc>,
    pub amount_minor: i64,
    pub kind: SaleKind,
    pub client_id: Option<Uuid>,
    pub product_lines: Vec<ProductLineCmd>,
    pub service_lines: Vec<ServiceLineCmd>,
}

impl SaleCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        kind: SaleKind,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            occurred_at,
            amount_minor,
            kind,
            client_id: None,
            product_lines: Vec::new(),
            service_lines: Vec::new(),
        }
    }

    #[must_use]
    pub fn client_id(mut self, client_id: Uuid) -> Self {
        self.client_id = Some(client_id);
        self
    }

    #[must_use]
    pub fn product_line(mut self, product_id: Uuid, quantity: i64, price_minor: i64) -> Self {
        self.product_lines.push(ProductLineCmd {
            product_id,
            quantity,
            price_minor,
        });
        self
    }

    #[must_use]
    pub fn service_line(mut self, service_id: Uuid, quantity: i64, price_minor: i64) -> Self {
        self.service_lines.push(ServiceLineCmd {
            service_id,
            quantity,
            price_minor,
        });
        self
    }
}

/// Patch a sale. Submitting a line list replaces all lines of that type.
#[derive(Clone, Debug)]
pub struct UpdateSaleCmd {
    pub user_id: String,
    pub sale_id: Uuid,
    pub occurred_at: Option<DateTime<Utc>>,
    pub amount_minor: Option<i64>,
    pub kind: Option<SaleKind>,
    pub client_id: Option<Option<Uuid>>,
    pub product_lines: Option<Vec<ProductLineCmd>>,
    pub service_lines: Option<Vec<ServiceLineCmd>>,
}

impl UpdateSaleCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, sale_id: Uuid) -> Self {
        Self {
            user_id: user_id.into(),
            sale_id,
            occurred_at: None,
            amount_minor: None,
            kind: None,
            client_id: None,
            product_lines: None,
            service_lines: None,
        }
    }

    #[must_use]
    pub fn amount_minor(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn product_lines(mut self, lines: Vec<ProductLineCmd>) -> Self {
        self.product_lines = Some(lines);
        self
    }
}

/// A product line of a purchase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PurchaseLineCmd {
    pub product_id: Uuid,
    pub quantity: i64,
    pub unit_price_minor: i64,
}

/// Create a purchase. Without `amount_minor` the total is derived from the lines.
#[derive(Clone, Debug)]
pub struct PurchaseCmd {
    pub user_id: String,
    pub occurred_at: DateTime<Utc>,
    pub amount_minor: Option<i64>,
    pub supplier_id: Option<Uuid>,
    pub description: Option<String>,
    pub lines: Vec<PurchaseLineCmd>,
}

impl PurchaseCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            occurred_at,
            amount_minor: None,
            supplier_id: None,
            description: None,
            lines: Vec::new(),
        }
    }

    #[must_use]
    pub fn amount_minor(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn supplier_id(mut self, supplier_id: Uuid) -> Self {
        self.supplier_id = Some(supplier_id);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn line(mut self, product_id: Uuid, quantity: i64, unit_price_minor: i64) -> Self {
        self.lines.push(PurchaseLineCmd {
            product_id,
            quantity,
            unit_price_minor,
        });
        self
    }
}

/// Patch a purchase. Submitting `lines` replaces all lines; the total is then
/// re-derived from them unless `amount_minor` is also given.
#[derive(Clone, Debug)]
pub struct UpdatePurchaseCmd {
    pub user_id: String,
    pub purchase_id: Uuid,
    pub occurred_at: Option<DateTime<Utc>>,
    pub amount_minor: Option<i64>,
    pub supplier_id: Option<Option<Uuid>>,
    pub description: Option<String>,
    pub lines: Option<Vec<PurchaseLineCmd>>,
}

impl UpdatePurchaseCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, purchase_id: Uuid) -> Self {
        Self {
            user_id: user_id.into(),
            purchase_id,
            occurred_at: None,
            amount_minor: None,
            supplier_id: None,
            description: None,
            lines: None,
        }
    }

    #[must_use]
    pub fn lines(mut self, lines: Vec<PurchaseLineCmd>) -> Self {
        self.lines = Some(lines);
        self
    }

    #[must_use]
    pub fn amount_minor(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
