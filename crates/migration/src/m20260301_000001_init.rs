//! Initial schema migration.
//!
//! Creates the complete schema for MonoGestión:
//!
//! - `users`: authentication, every other table is scoped by `user_id`
//! - `products`, `services`, `clients`, `suppliers`: the record store
//! - `income_categories`, `expense_categories`: two disjoint category stores
//! - `incomes`, `expenses`, `sales`, `purchases`: transactional records
//! - `sale_product_lines`, `sale_service_lines`, `purchase_lines`: line items
//! - `movements`: the unified ledger, one row per transactional record

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    Password,
}

#[derive(Iden)]
enum Products {
    Table,
    Id,
    UserId,
    Name,
    Description,
    PriceMinor,
    Quantity,
    Active,
    CreatedAt,
}

#[derive(Iden)]
enum Services {
    Table,
    Id,
    UserId,
    Name,
    Description,
    PriceMinor,
    Active,
    CreatedAt,
}

#[derive(Iden)]
enum Clients {
    Table,
    Id,
    UserId,
    Name,
    Phone,
    Email,
    EmailNorm,
    Address,
    CreatedAt,
}

#[derive(Iden)]
enum Suppliers {
    Table,
    Id,
    UserId,
    Name,
    Phone,
    Email,
    Address,
    CreatedAt,
}

#[derive(Iden)]
enum IncomeCategories {
    Table,
    Id,
    UserId,
    Name,
    NameNorm,
    CreatedAt,
}

#[derive(Iden)]
enum ExpenseCategories {
    Table,
    Id,
    UserId,
    Name,
    NameNorm,
    CreatedAt,
}

#[derive(Iden)]
enum Incomes {
    Table,
    Id,
    UserId,
    OccurredAt,
    AmountMinor,
    Description,
    CategoryId,
}

#[derive(Iden)]
enum Purchases {
    Table,
    Id,
    UserId,
    SupplierId,
    OccurredAt,
    AmountMinor,
    Description,
}

#[derive(Iden)]
enum PurchaseLines {
    Table,
    Id,
    PurchaseId,
    ProductId,
    Quantity,
    UnitPriceMinor,
}

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    UserId,
    OccurredAt,
    AmountMinor,
    Category,
    Description,
    CategoryId,
    PurchaseId,
}

#[derive(Iden)]
enum Sales {
    Table,
    Id,
    UserId,
    ClientId,
    OccurredAt,
    AmountMinor,
    Kind,
}

#[derive(Iden)]
enum SaleProductLines {
    Table,
    Id,
    SaleId,
    ProductId,
    Quantity,
    PriceMinor,
}

#[derive(Iden)]
enum SaleServiceLines {
    Table,
    Id,
    SaleId,
    ServiceId,
    Quantity,
    PriceMinor,
}

#[derive(Iden)]
enum Movements {
    Table,
    Id,
    UserId,
    Kind,
    OccurredAt,
    AmountMinor,
    Description,
    SourceId,
}

fn user_fk<T, C>(name: &str, table: T, column: C) -> ForeignKeyCreateStatement
where
    T: IntoIden + 'static,
    C: IntoIden,
{
    ForeignKey::create()
        .name(name)
        .from(table, column)
        .to(Users::Table, Users::Username)
        .on_delete(ForeignKeyAction::Cascade)
        .to_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Record store
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Products::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Products::UserId).string().not_null())
                    .col(ColumnDef::new(Products::Name).string().not_null())
                    .col(ColumnDef::new(Products::Description).string())
                    .col(ColumnDef::new(Products::PriceMinor).big_integer().not_null())
                    .col(
                        ColumnDef::new(Products::Quantity)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(Products::Quantity).gte(0)),
                    )
                    .col(ColumnDef::new(Products::Active).boolean().not_null())
                    .col(ColumnDef::new(Products::CreatedAt).timestamp().not_null())
                    .foreign_key(&mut user_fk(
                        "fk-products-user_id",
                        Products::Table,
                        Products::UserId,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Services::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Services::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Services::UserId).string().not_null())
                    .col(ColumnDef::new(Services::Name).string().not_null())
                    .col(ColumnDef::new(Services::Description).string())
                    .col(ColumnDef::new(Services::PriceMinor).big_integer().not_null())
                    .col(ColumnDef::new(Services::Active).boolean().not_null())
                    .col(ColumnDef::new(Services::CreatedAt).timestamp().not_null())
                    .foreign_key(&mut user_fk(
                        "fk-services-user_id",
                        Services::Table,
                        Services::UserId,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Clients::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Clients::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Clients::UserId).string().not_null())
                    .col(ColumnDef::new(Clients::Name).string().not_null())
                    .col(ColumnDef::new(Clients::Phone).string())
                    .col(ColumnDef::new(Clients::Email).string())
                    .col(ColumnDef::new(Clients::EmailNorm).string())
                    .col(ColumnDef::new(Clients::Address).string())
                    .col(ColumnDef::new(Clients::CreatedAt).timestamp().not_null())
                    .foreign_key(&mut user_fk(
                        "fk-clients-user_id",
                        Clients::Table,
                        Clients::UserId,
                    ))
                    .to_owned(),
            )
            .await?;

        // NULL emails never collide in a unique index.
        manager
            .create_index(
                Index::create()
                    .name("idx-clients-user_id-email_norm-unique")
                    .table(Clients::Table)
                    .col(Clients::UserId)
                    .col(Clients::EmailNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Suppliers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Suppliers::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Suppliers::UserId).string().not_null())
                    .col(ColumnDef::new(Suppliers::Name).string().not_null())
                    .col(ColumnDef::new(Suppliers::Phone).string())
                    .col(ColumnDef::new(Suppliers::Email).string())
                    .col(ColumnDef::new(Suppliers::Address).string())
                    .col(ColumnDef::new(Suppliers::CreatedAt).timestamp().not_null())
                    .foreign_key(&mut user_fk(
                        "fk-suppliers-user_id",
                        Suppliers::Table,
                        Suppliers::UserId,
                    ))
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Categories
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(IncomeCategories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IncomeCategories::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(IncomeCategories::UserId).string().not_null())
                    .col(ColumnDef::new(IncomeCategories::Name).string().not_null())
                    .col(ColumnDef::new(IncomeCategories::NameNorm).string().not_null())
                    .col(
                        ColumnDef::new(IncomeCategories::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(&mut user_fk(
                        "fk-income_categories-user_id",
                        IncomeCategories::Table,
                        IncomeCategories::UserId,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-income_categories-user_id-name_norm-unique")
                    .table(IncomeCategories::Table)
                    .col(IncomeCategories::UserId)
                    .col(IncomeCategories::NameNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ExpenseCategories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExpenseCategories::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ExpenseCategories::UserId).string().not_null())
                    .col(ColumnDef::new(ExpenseCategories::Name).string().not_null())
                    .col(ColumnDef::new(ExpenseCategories::NameNorm).string().not_null())
                    .col(
                        ColumnDef::new(ExpenseCategories::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(&mut user_fk(
                        "fk-expense_categories-user_id",
                        ExpenseCategories::Table,
                        ExpenseCategories::UserId,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expense_categories-user_id-name_norm-unique")
                    .table(ExpenseCategories::Table)
                    .col(ExpenseCategories::UserId)
                    .col(ExpenseCategories::NameNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Incomes
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Incomes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Incomes::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Incomes::UserId).string().not_null())
                    .col(ColumnDef::new(Incomes::OccurredAt).timestamp().not_null())
                    .col(ColumnDef::new(Incomes::AmountMinor).big_integer().not_null())
                    .col(ColumnDef::new(Incomes::Description).string())
                    .col(ColumnDef::new(Incomes::CategoryId).string())
                    .foreign_key(&mut user_fk(
                        "fk-incomes-user_id",
                        Incomes::Table,
                        Incomes::UserId,
                    ))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-incomes-category_id")
                            .from(Incomes::Table, Incomes::CategoryId)
                            .to(IncomeCategories::Table, IncomeCategories::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-incomes-user_id-occurred_at")
                    .table(Incomes::Table)
                    .col(Incomes::UserId)
                    .col(Incomes::OccurredAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Purchases (before expenses: linked expenses reference them)
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Purchases::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Purchases::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Purchases::UserId).string().not_null())
                    .col(ColumnDef::new(Purchases::SupplierId).string())
                    .col(ColumnDef::new(Purchases::OccurredAt).timestamp().not_null())
                    .col(
                        ColumnDef::new(Purchases::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Purchases::Description).string())
                    .foreign_key(&mut user_fk(
                        "fk-purchases-user_id",
                        Purchases::Table,
                        Purchases::UserId,
                    ))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-purchases-supplier_id")
                            .from(Purchases::Table, Purchases::SupplierId)
                            .to(Suppliers::Table, Suppliers::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PurchaseLines::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseLines::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PurchaseLines::PurchaseId).string().not_null())
                    .col(ColumnDef::new(PurchaseLines::ProductId).string().not_null())
                    .col(
                        ColumnDef::new(PurchaseLines::Quantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseLines::UnitPriceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-purchase_lines-purchase_id")
                            .from(PurchaseLines::Table, PurchaseLines::PurchaseId)
                            .to(Purchases::Table, Purchases::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-purchase_lines-product_id")
                            .from(PurchaseLines::Table, PurchaseLines::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-purchase_lines-purchase_id")
                    .table(PurchaseLines::Table)
                    .col(PurchaseLines::PurchaseId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Expenses
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Expenses::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Expenses::UserId).string().not_null())
                    .col(ColumnDef::new(Expenses::OccurredAt).timestamp().not_null())
                    .col(ColumnDef::new(Expenses::AmountMinor).big_integer().not_null())
                    .col(ColumnDef::new(Expenses::Category).string().not_null())
                    .col(ColumnDef::new(Expenses::Description).string())
                    .col(ColumnDef::new(Expenses::CategoryId).string())
                    .col(ColumnDef::new(Expenses::PurchaseId).string())
                    .foreign_key(&mut user_fk(
                        "fk-expenses-user_id",
                        Expenses::Table,
                        Expenses::UserId,
                    ))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expenses-category_id")
                            .from(Expenses::Table, Expenses::CategoryId)
                            .to(ExpenseCategories::Table, ExpenseCategories::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expenses-purchase_id")
                            .from(Expenses::Table, Expenses::PurchaseId)
                            .to(Purchases::Table, Purchases::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-user_id-occurred_at")
                    .table(Expenses::Table)
                    .col(Expenses::UserId)
                    .col(Expenses::OccurredAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-purchase_id-unique")
                    .table(Expenses::Table)
                    .col(Expenses::PurchaseId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Sales
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Sales::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sales::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Sales::UserId).string().not_null())
                    .col(ColumnDef::new(Sales::ClientId).string())
                    .col(ColumnDef::new(Sales::OccurredAt).timestamp().not_null())
                    .col(ColumnDef::new(Sales::AmountMinor).big_integer().not_null())
                    .col(ColumnDef::new(Sales::Kind).string().not_null())
                    .foreign_key(&mut user_fk(
                        "fk-sales-user_id",
                        Sales::Table,
                        Sales::UserId,
                    ))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sales-client_id")
                            .from(Sales::Table, Sales::ClientId)
                            .to(Clients::Table, Clients::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-sales-user_id-occurred_at")
                    .table(Sales::Table)
                    .col(Sales::UserId)
                    .col(Sales::OccurredAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SaleProductLines::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SaleProductLines::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SaleProductLines::SaleId).string().not_null())
                    .col(ColumnDef::new(SaleProductLines::ProductId).string().not_null())
                    .col(
                        ColumnDef::new(SaleProductLines::Quantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SaleProductLines::PriceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sale_product_lines-sale_id")
                            .from(SaleProductLines::Table, SaleProductLines::SaleId)
                            .to(Sales::Table, Sales::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sale_product_lines-product_id")
                            .from(SaleProductLines::Table, SaleProductLines::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-sale_product_lines-sale_id")
                    .table(SaleProductLines::Table)
                    .col(SaleProductLines::SaleId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SaleServiceLines::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SaleServiceLines::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SaleServiceLines::SaleId).string().not_null())
                    .col(ColumnDef::new(SaleServiceLines::ServiceId).string().not_null())
                    .col(
                        ColumnDef::new(SaleServiceLines::Quantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SaleServiceLines::PriceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sale_service_lines-sale_id")
                            .from(SaleServiceLines::Table, SaleServiceLines::SaleId)
                            .to(Sales::Table, Sales::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sale_service_lines-service_id")
                            .from(SaleServiceLines::Table, SaleServiceLines::ServiceId)
                            .to(Services::Table, Services::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-sale_service_lines-sale_id")
                    .table(SaleServiceLines::Table)
                    .col(SaleServiceLines::SaleId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 8. Movements
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Movements::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Movements::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Movements::UserId).string().not_null())
                    .col(ColumnDef::new(Movements::Kind).string().not_null())
                    .col(ColumnDef::new(Movements::OccurredAt).timestamp().not_null())
                    .col(
                        ColumnDef::new(Movements::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Movements::Description).string())
                    .col(ColumnDef::new(Movements::SourceId).string().not_null())
                    .foreign_key(&mut user_fk(
                        "fk-movements-user_id",
                        Movements::Table,
                        Movements::UserId,
                    ))
                    .to_owned(),
            )
            .await?;

        // At most one movement per source record.
        manager
            .create_index(
                Index::create()
                    .name("idx-movements-kind-source_id-unique")
                    .table(Movements::Table)
                    .col(Movements::Kind)
                    .col(Movements::SourceId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-movements-user_id-occurred_at")
                    .table(Movements::Table)
                    .col(Movements::UserId)
                    .col(Movements::OccurredAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(Movements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SaleServiceLines::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SaleProductLines::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sales::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseLines::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Purchases::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Incomes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ExpenseCategories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(IncomeCategories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Suppliers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Clients::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Services::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
