//! Read-only reports over a user's ledger.
//!
//! Totals come from the movement ledger itself. Source records are only read
//! to attach category names to income and expense movements.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, QueryFilter, prelude::*};

use crate::{
    ClientRanking, DateRange, EngineError, FinanceSummary, MovementKind, PeriodComparison,
    ProductRanking, ReportWindow, ResultEngine, TrendGranularity, TrendPoint, clients, expenses,
    income_categories, incomes, movements, products, reports, sale_product_lines, sales,
    util::parse_uuid,
};

use super::Engine;

const MAX_TOP_LIMIT: usize = 100;

fn check_limit(limit: usize) -> ResultEngine<()> {
    if limit == 0 || limit > MAX_TOP_LIMIT {
        return Err(EngineError::invalid(
            "limit",
            format!("must be between 1 and {MAX_TOP_LIMIT}"),
        ));
    }
    Ok(())
}

/// Ledger entries inside `range`, with income and expense categories attached.
async fn ledger_entries<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    range: DateRange,
) -> ResultEngine<Vec<reports::LedgerEntry>> {
    let rows = movements::Entity::find()
        .filter(movements::Column::UserId.eq(user_id))
        .filter(movements::Column::OccurredAt.gte(range.from))
        .filter(movements::Column::OccurredAt.lt(range.to))
        .all(db)
        .await?;

    let source_ids = |kind: MovementKind| -> Vec<String> {
        rows.iter()
            .filter(|m| m.kind == kind.as_str())
            .map(|m| m.source_id.clone())
            .collect()
    };

    let income_category_names: HashMap<String, String> = income_categories::Entity::find()
        .filter(income_categories::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();
    let income_labels: HashMap<String, String> = incomes::Entity::find()
        .filter(incomes::Column::UserId.eq(user_id))
        .filter(incomes::Column::Id.is_in(source_ids(MovementKind::Income)))
        .all(db)
        .await?
        .into_iter()
        .filter_map(|i| {
            let name = i
                .category_id
                .as_ref()
                .and_then(|c| income_category_names.get(c))?
                .clone();
            Some((i.id, name))
        })
        .collect();
    let expense_labels: HashMap<String, String> = expenses::Entity::find()
        .filter(expenses::Column::UserId.eq(user_id))
        .filter(expenses::Column::Id.is_in(source_ids(MovementKind::Expense)))
        .all(db)
        .await?
        .into_iter()
        .map(|e| (e.id, e.category))
        .collect();

    rows.into_iter()
        .map(|row| -> ResultEngine<reports::LedgerEntry> {
            let kind = MovementKind::try_from(row.kind.as_str())?;
            let category = match kind {
                MovementKind::Income => income_labels.get(&row.source_id).cloned(),
                MovementKind::Expense => expense_labels.get(&row.source_id).cloned(),
                MovementKind::Sale | MovementKind::Purchase => None,
            };
            Ok(reports::LedgerEntry {
                kind,
                occurred_at: row.occurred_at,
                amount_minor: row.amount_minor,
                category,
            })
        })
        .collect()
}

async fn sales_in<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    range: DateRange,
) -> ResultEngine<Vec<sales::Model>> {
    Ok(sales::Entity::find()
        .filter(sales::Column::UserId.eq(user_id))
        .filter(sales::Column::OccurredAt.gte(range.from))
        .filter(sales::Column::OccurredAt.lt(range.to))
        .all(db)
        .await?)
}

impl Engine {
    /// Totals, balance and category breakdown over `window`.
    pub async fn finance_summary(
        &self,
        user_id: &str,
        window: ReportWindow,
        now: DateTime<Utc>,
    ) -> ResultEngine<FinanceSummary> {
        let range = window.resolve(now)?;
        let entries = ledger_entries(&self.database, user_id, range).await?;
        reports::summarize(&entries, range)
    }

    /// `periods` consecutive buckets of income and expense, ending with the
    /// bucket that contains `now`.
    pub async fn trend(
        &self,
        user_id: &str,
        granularity: TrendGranularity,
        periods: u32,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<TrendPoint>> {
        let buckets = reports::trend_buckets(granularity, periods, now)?;
        let (Some(first), Some(last)) = (buckets.first(), buckets.last()) else {
            return Ok(Vec::new());
        };
        let span = DateRange {
            from: first.from,
            to: last.to,
        };
        let entries = ledger_entries(&self.database, user_id, span).await?;
        reports::trend(&entries, &buckets)
    }

    /// `range` against the window of equal length right before it.
    pub async fn compare_periods(
        &self,
        user_id: &str,
        range: DateRange,
    ) -> ResultEngine<PeriodComparison> {
        let span = DateRange {
            from: range.previous().from,
            to: range.to,
        };
        let entries = ledger_entries(&self.database, user_id, span).await?;
        reports::compare_periods(&entries, range)
    }

    /// Best-selling products inside `range`.
    pub async fn top_products(
        &self,
        user_id: &str,
        range: DateRange,
        limit: usize,
    ) -> ResultEngine<Vec<ProductRanking>> {
        check_limit(limit)?;
        let sale_ids: Vec<String> = sales_in(&self.database, user_id, range)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();
        let names: HashMap<String, String> = products::Entity::find()
            .filter(products::Column::UserId.eq(user_id))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        let lines = sale_product_lines::Entity::find()
            .filter(sale_product_lines::Column::SaleId.is_in(sale_ids))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|line| -> ResultEngine<reports::SoldLine> {
                Ok(reports::SoldLine {
                    product_id: parse_uuid(&line.product_id, "product")?,
                    product: names.get(&line.product_id).cloned().unwrap_or_default(),
                    quantity: line.quantity,
                    price_minor: line.price_minor,
                })
            })
            .collect::<ResultEngine<Vec<_>>>()?;
        reports::rank_products(&lines, limit)
    }

    /// Clients with the highest sales amount inside `range`. Sales without a
    /// client are left out.
    pub async fn top_clients(
        &self,
        user_id: &str,
        range: DateRange,
        limit: usize,
    ) -> ResultEngine<Vec<ClientRanking>> {
        check_limit(limit)?;
        let names: HashMap<String, String> = clients::Entity::find()
            .filter(clients::Column::UserId.eq(user_id))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        let mut client_sales = Vec::new();
        for sale in sales_in(&self.database, user_id, range).await? {
            let Some(client_id) = sale.client_id else {
                continue;
            };
            client_sales.push(reports::ClientSale {
                client_id: parse_uuid(&client_id, "client")?,
                client: names.get(&client_id).cloned().unwrap_or_default(),
                amount_minor: sale.amount_minor,
            });
        }
        reports::rank_clients(&client_sales, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_bounds() {
        assert!(check_limit(1).is_ok());
        assert!(check_limit(MAX_TOP_LIMIT).is_ok());
        assert!(check_limit(0).is_err());
        assert!(check_limit(MAX_TOP_LIMIT + 1).is_err());
    }
}
