//! Financial aggregation over the ledger.
//!
//! Everything here is a pure function of ledger entries and a time window, so
//! the same inputs always produce the same figures. Windows are half-open:
//! `[from, to)`. Sums that leave the `i64` range fail with a validation error
//! instead of wrapping.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, Months, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CategoryKind, EngineError, MovementKind, ResultEngine};

/// Synthetic breakdown name for incomes without a category.
pub const UNCATEGORIZED: &str = "Uncategorized";
/// Synthetic breakdown name for sale movements.
pub const SALES_CATEGORY: &str = "Sales";
/// Synthetic breakdown name for purchase movements.
pub const PURCHASES_CATEGORY: &str = "Purchases";

pub const MAX_PERIODS: u32 = 366;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> ResultEngine<Self> {
        if from >= to {
            return Err(EngineError::invalid("to", "must be after from"));
        }
        Ok(Self { from, to })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at < self.to
    }

    /// The window of equal length ending where this one starts.
    pub fn previous(&self) -> Self {
        let length = self.to - self.from;
        Self {
            from: self.from - length,
            to: self.from,
        }
    }
}

/// A reporting window, either explicit or trailing from "now".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportWindow {
    Range(DateRange),
    /// Today plus the `n - 1` preceding days.
    LastDays(u32),
    /// The current month plus the `n - 1` preceding months.
    LastMonths(u32),
}

impl ReportWindow {
    pub fn resolve(self, now: DateTime<Utc>) -> ResultEngine<DateRange> {
        match self {
            Self::Range(range) => Ok(range),
            Self::LastDays(days) => {
                let buckets = trend_buckets(TrendGranularity::Daily, days, now)?;
                span(&buckets)
            }
            Self::LastMonths(months) => {
                let buckets = trend_buckets(TrendGranularity::Monthly, months, now)?;
                span(&buckets)
            }
        }
    }
}

fn span(buckets: &[DateRange]) -> ResultEngine<DateRange> {
    match (buckets.first(), buckets.last()) {
        (Some(first), Some(last)) => Ok(DateRange {
            from: first.from,
            to: last.to,
        }),
        _ => Err(EngineError::invalid("periods", "must be > 0")),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendGranularity {
    Daily,
    Weekly,
    Monthly,
}

fn start_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive().and_time(NaiveTime::MIN).and_utc()
}

fn start_of_month(at: DateTime<Utc>) -> ResultEngine<DateTime<Utc>> {
    at.date_naive()
        .with_day(1)
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .ok_or_else(|| EngineError::invalid("now", "date out of range"))
}

/// `periods` consecutive buckets, oldest first, the last one containing `now`.
pub fn trend_buckets(
    granularity: TrendGranularity,
    periods: u32,
    now: DateTime<Utc>,
) -> ResultEngine<Vec<DateRange>> {
    if periods == 0 || periods > MAX_PERIODS {
        return Err(EngineError::invalid(
            "periods",
            format!("must be between 1 and {MAX_PERIODS}"),
        ));
    }

    let out_of_range = || EngineError::invalid("periods", "window out of range");
    let mut buckets = Vec::with_capacity(periods as usize);
    match granularity {
        TrendGranularity::Daily | TrendGranularity::Weekly => {
            let step = match granularity {
                TrendGranularity::Daily => Duration::days(1),
                _ => Duration::weeks(1),
            };
            let end = start_of_day(now) + Duration::days(1);
            for back in (1..=i32::try_from(periods).map_err(|_| out_of_range())?).rev() {
                let to = end - step * (back - 1);
                buckets.push(DateRange {
                    from: to - step,
                    to,
                });
            }
        }
        TrendGranularity::Monthly => {
            let current = start_of_month(now)?;
            for back in (0..periods).rev() {
                let from = current
                    .checked_sub_months(Months::new(back))
                    .ok_or_else(out_of_range)?;
                let to = from
                    .checked_add_months(Months::new(1))
                    .ok_or_else(out_of_range)?;
                buckets.push(DateRange { from, to });
            }
        }
    }
    Ok(buckets)
}

/// One ledger movement as seen by the aggregations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerEntry {
    pub kind: MovementKind,
    pub occurred_at: DateTime<Utc>,
    pub amount_minor: i64,
    /// Category of the source record, if it has one.
    pub category: Option<String>,
}

impl LedgerEntry {
    fn breakdown_key(&self) -> (String, CategoryKind) {
        let kind = if self.kind.is_income_like() {
            CategoryKind::Income
        } else {
            CategoryKind::Expense
        };
        let name = match self.kind {
            MovementKind::Sale => SALES_CATEGORY.to_string(),
            MovementKind::Purchase => PURCHASES_CATEGORY.to_string(),
            MovementKind::Income | MovementKind::Expense => self
                .category
                .clone()
                .unwrap_or_else(|| UNCATEGORIZED.to_string()),
        };
        (name, kind)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub name: String,
    pub kind: CategoryKind,
    pub total_minor: i64,
    pub percentage: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinanceSummary {
    pub range: DateRange,
    pub total_income_minor: i64,
    pub total_expense_minor: i64,
    pub balance_minor: i64,
    pub movement_count: u64,
    pub sales_count: u64,
    pub sales_total_minor: i64,
    pub average_sale_minor: i64,
    pub categories: Vec<CategoryTotal>,
}

fn out_of_range() -> EngineError {
    EngineError::invalid("range", "totals out of range")
}

fn add(total: i64, amount: i64) -> ResultEngine<i64> {
    total.checked_add(amount).ok_or_else(out_of_range)
}

fn percentage(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Totals, balance and category breakdown of the entries inside `range`.
pub fn summarize(entries: &[LedgerEntry], range: DateRange) -> ResultEngine<FinanceSummary> {
    let mut total_income_minor = 0;
    let mut total_expense_minor = 0;
    let mut movement_count = 0;
    let mut sales_count = 0;
    let mut sales_total_minor = 0;
    let mut groups: HashMap<(String, CategoryKind), i64> = HashMap::new();

    for entry in entries.iter().filter(|e| range.contains(e.occurred_at)) {
        movement_count += 1;
        if entry.kind.is_income_like() {
            total_income_minor = add(total_income_minor, entry.amount_minor)?;
        } else {
            total_expense_minor = add(total_expense_minor, entry.amount_minor)?;
        }
        if entry.kind == MovementKind::Sale {
            sales_count += 1;
            sales_total_minor = add(sales_total_minor, entry.amount_minor)?;
        }
        let group = groups.entry(entry.breakdown_key()).or_insert(0);
        *group = add(*group, entry.amount_minor)?;
    }

    let whole = add(total_income_minor, total_expense_minor)?;
    let mut categories: Vec<CategoryTotal> = groups
        .into_iter()
        .map(|((name, kind), total_minor)| CategoryTotal {
            percentage: percentage(total_minor, whole),
            name,
            kind,
            total_minor,
        })
        .collect();
    categories.sort_by(|a, b| {
        b.total_minor
            .cmp(&a.total_minor)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.kind.as_str().cmp(b.kind.as_str()))
    });

    let average_sale_minor = if sales_count == 0 {
        0
    } else {
        sales_total_minor / sales_count as i64
    };

    Ok(FinanceSummary {
        range,
        total_income_minor,
        total_expense_minor,
        balance_minor: total_income_minor - total_expense_minor,
        movement_count,
        sales_count,
        sales_total_minor,
        average_sale_minor,
        categories,
    })
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub range: DateRange,
    pub income_minor: i64,
    pub expense_minor: i64,
    pub balance_minor: i64,
}

/// Income, expense and balance per bucket.
pub fn trend(entries: &[LedgerEntry], buckets: &[DateRange]) -> ResultEngine<Vec<TrendPoint>> {
    buckets
        .iter()
        .map(|bucket| {
            let (income_minor, expense_minor) = entries
                .iter()
                .filter(|e| bucket.contains(e.occurred_at))
                .try_fold((0, 0), |(income, expense), e| -> ResultEngine<(i64, i64)> {
                    if e.kind.is_income_like() {
                        Ok((add(income, e.amount_minor)?, expense))
                    } else {
                        Ok((income, add(expense, e.amount_minor)?))
                    }
                })?;
            Ok(TrendPoint {
                range: *bucket,
                income_minor,
                expense_minor,
                balance_minor: income_minor - expense_minor,
            })
        })
        .collect()
}

/// Percent change from `previous` to `current`; 0 when there is no baseline.
pub fn growth_rate(current: i64, previous: i64) -> f64 {
    if previous == 0 {
        0.0
    } else {
        (current as f64 - previous as f64) / previous.unsigned_abs() as f64 * 100.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeriodComparison {
    pub current: FinanceSummary,
    pub previous: FinanceSummary,
    pub income_growth: f64,
    pub expense_growth: f64,
    pub balance_growth: f64,
    pub sales_growth: f64,
}

/// Compare `range` with the preceding window of equal length.
pub fn compare_periods(entries: &[LedgerEntry], range: DateRange) -> ResultEngine<PeriodComparison> {
    let current = summarize(entries, range)?;
    let previous = summarize(entries, range.previous())?;
    Ok(PeriodComparison {
        income_growth: growth_rate(current.total_income_minor, previous.total_income_minor),
        expense_growth: growth_rate(current.total_expense_minor, previous.total_expense_minor),
        balance_growth: growth_rate(current.balance_minor, previous.balance_minor),
        sales_growth: growth_rate(current.sales_total_minor, previous.sales_total_minor),
        current,
        previous,
    })
}

/// A sold product line as seen by the rankings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SoldLine {
    pub product_id: Uuid,
    pub product: String,
    pub quantity: i64,
    pub price_minor: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRanking {
    pub product_id: Uuid,
    pub product: String,
    pub quantity: i64,
    pub revenue_minor: i64,
}

/// Best sellers by units, then revenue, then name.
pub fn rank_products(lines: &[SoldLine], limit: usize) -> ResultEngine<Vec<ProductRanking>> {
    let mut totals: HashMap<Uuid, ProductRanking> = HashMap::new();
    for line in lines {
        let entry = totals
            .entry(line.product_id)
            .or_insert_with(|| ProductRanking {
                product_id: line.product_id,
                product: line.product.clone(),
                quantity: 0,
                revenue_minor: 0,
            });
        entry.quantity = add(entry.quantity, line.quantity)?;
        let revenue = line
            .quantity
            .checked_mul(line.price_minor)
            .ok_or_else(out_of_range)?;
        entry.revenue_minor = add(entry.revenue_minor, revenue)?;
    }
    let mut ranking: Vec<ProductRanking> = totals.into_values().collect();
    ranking.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then_with(|| b.revenue_minor.cmp(&a.revenue_minor))
            .then_with(|| a.product.cmp(&b.product))
    });
    ranking.truncate(limit);
    Ok(ranking)
}

/// A sale attributed to a client, as seen by the rankings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientSale {
    pub client_id: Uuid,
    pub client: String,
    pub amount_minor: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRanking {
    pub client_id: Uuid,
    pub client: String,
    pub sales_count: u64,
    pub total_minor: i64,
}

/// Best clients by amount, then number of sales, then name.
pub fn rank_clients(sales: &[ClientSale], limit: usize) -> ResultEngine<Vec<ClientRanking>> {
    let mut totals: HashMap<Uuid, ClientRanking> = HashMap::new();
    for sale in sales {
        let entry = totals.entry(sale.client_id).or_insert_with(|| ClientRanking {
            client_id: sale.client_id,
            client: sale.client.clone(),
            sales_count: 0,
            total_minor: 0,
        });
        entry.sales_count += 1;
        entry.total_minor = add(entry.total_minor, sale.amount_minor)?;
    }
    let mut ranking: Vec<ClientRanking> = totals.into_values().collect();
    ranking.sort_by(|a, b| {
        b.total_minor
            .cmp(&a.total_minor)
            .then_with(|| b.sales_count.cmp(&a.sales_count))
            .then_with(|| a.client.cmp(&b.client))
    });
    ranking.truncate(limit);
    Ok(ranking)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).single().unwrap()
    }

    fn entry(kind: MovementKind, when: DateTime<Utc>, amount: i64, cat: Option<&str>) -> LedgerEntry {
        LedgerEntry {
            kind,
            occurred_at: when,
            amount_minor: amount,
            category: cat.map(str::to_string),
        }
    }

    fn march() -> DateRange {
        DateRange::new(at(2026, 3, 1), at(2026, 4, 1)).unwrap()
    }

    #[test]
    fn summary_buckets_and_breakdown() {
        let entries = vec![
            entry(MovementKind::Income, at(2026, 3, 2), 200, Some("Consultoría")),
            entry(MovementKind::Income, at(2026, 3, 3), 100, None),
            entry(MovementKind::Sale, at(2026, 3, 4), 300, None),
            entry(MovementKind::Sale, at(2026, 3, 5), 100, None),
            entry(MovementKind::Expense, at(2026, 3, 6), 150, Some("Alquiler")),
            entry(MovementKind::Purchase, at(2026, 3, 7), 150, None),
            // Outside the window.
            entry(MovementKind::Income, at(2026, 4, 1), 999, None),
        ];

        let summary = summarize(&entries, march()).unwrap();

        assert_eq!(summary.total_income_minor, 700);
        assert_eq!(summary.total_expense_minor, 300);
        assert_eq!(summary.balance_minor, 400);
        assert_eq!(summary.movement_count, 6);
        assert_eq!(summary.sales_count, 2);
        assert_eq!(summary.average_sale_minor, 200);

        let names: Vec<(&str, CategoryKind)> = summary
            .categories
            .iter()
            .map(|c| (c.name.as_str(), c.kind))
            .collect();
        assert_eq!(
            names,
            vec![
                (SALES_CATEGORY, CategoryKind::Income),
                ("Consultoría", CategoryKind::Income),
                ("Alquiler", CategoryKind::Expense),
                (PURCHASES_CATEGORY, CategoryKind::Expense),
                (UNCATEGORIZED, CategoryKind::Income),
            ]
        );
        assert!((summary.categories[0].percentage - 40.0).abs() < f64::EPSILON);
        let total: f64 = summary.categories.iter().map(|c| c.percentage).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn empty_summary_has_zero_percentages() {
        let summary = summarize(&[], march()).unwrap();
        assert_eq!(summary.balance_minor, 0);
        assert!(summary.categories.is_empty());
        assert_eq!(summary.average_sale_minor, 0);
    }

    #[test]
    fn growth_rate_handles_zero_and_negative_baselines() {
        assert_eq!(growth_rate(150, 100), 50.0);
        assert_eq!(growth_rate(50, 100), -50.0);
        assert_eq!(growth_rate(100, 0), 0.0);
        assert_eq!(growth_rate(0, -100), 100.0);
        assert!(growth_rate(i64::MAX, i64::MIN).is_finite());
    }

    #[test]
    fn oversized_totals_are_rejected() {
        let entries = vec![
            entry(MovementKind::Income, at(2026, 3, 2), i64::MAX, None),
            entry(MovementKind::Income, at(2026, 3, 3), 1, None),
        ];
        assert!(matches!(
            summarize(&entries, march()),
            Err(EngineError::Validation(_))
        ));

        let buckets = trend_buckets(TrendGranularity::Monthly, 1, at(2026, 3, 15)).unwrap();
        assert!(trend(&entries, &buckets).is_err());

        // Income and expense fit separately but not together.
        let split = vec![
            entry(MovementKind::Income, at(2026, 3, 2), i64::MAX, None),
            entry(MovementKind::Expense, at(2026, 3, 3), 1, Some("Luz")),
        ];
        assert!(summarize(&split, march()).is_err());

        let a = Uuid::new_v4();
        let lines = vec![SoldLine { product_id: a, product: "Widget".into(), quantity: 2, price_minor: i64::MAX }];
        assert!(rank_products(&lines, 10).is_err());

        let sales = vec![
            ClientSale { client_id: a, client: "Ana".into(), amount_minor: i64::MAX },
            ClientSale { client_id: a, client: "Ana".into(), amount_minor: 1 },
        ];
        assert!(rank_clients(&sales, 10).is_err());
    }

    #[test]
    fn comparison_uses_preceding_window() {
        let range = DateRange::new(at(2026, 3, 10), at(2026, 3, 20)).unwrap();
        let entries = vec![
            entry(MovementKind::Income, at(2026, 3, 5), 100, None),
            entry(MovementKind::Income, at(2026, 3, 15), 300, None),
            entry(MovementKind::Expense, at(2026, 3, 15), 50, Some("Luz")),
        ];

        let comparison = compare_periods(&entries, range).unwrap();

        assert_eq!(comparison.previous.range.from, at(2026, 2, 28));
        assert_eq!(comparison.previous.total_income_minor, 100);
        assert_eq!(comparison.current.total_income_minor, 300);
        assert_eq!(comparison.income_growth, 200.0);
        assert_eq!(comparison.expense_growth, 0.0);
    }

    #[test]
    fn monthly_buckets_end_with_current_month() {
        let buckets = trend_buckets(TrendGranularity::Monthly, 3, at(2026, 3, 15)).unwrap();
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].from, Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(buckets[2].to, Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap());
        assert!(buckets.windows(2).all(|w| w[0].to == w[1].from));
    }

    #[test]
    fn weekly_buckets_are_contiguous_and_contain_now() {
        let now = at(2026, 3, 15);
        let buckets = trend_buckets(TrendGranularity::Weekly, 4, now).unwrap();
        assert_eq!(buckets.len(), 4);
        assert!(buckets[3].contains(now));
        assert!(buckets.windows(2).all(|w| w[0].to == w[1].from));
        assert_eq!(buckets[3].to - buckets[0].from, Duration::weeks(4));
    }

    #[test]
    fn bucket_count_is_bounded() {
        assert!(trend_buckets(TrendGranularity::Daily, 0, at(2026, 3, 1)).is_err());
        assert!(trend_buckets(TrendGranularity::Daily, MAX_PERIODS + 1, at(2026, 3, 1)).is_err());
    }

    #[test]
    fn trailing_days_window_includes_today() {
        let now = at(2026, 3, 15);
        let range = ReportWindow::LastDays(7).resolve(now).unwrap();
        assert_eq!(range.from, Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap());
        assert_eq!(range.to, Utc.with_ymd_and_hms(2026, 3, 16, 0, 0, 0).unwrap());
    }

    #[test]
    fn trend_sums_per_bucket() {
        let buckets = trend_buckets(TrendGranularity::Monthly, 2, at(2026, 3, 15)).unwrap();
        let entries = vec![
            entry(MovementKind::Sale, at(2026, 2, 10), 100, None),
            entry(MovementKind::Purchase, at(2026, 3, 10), 40, None),
            entry(MovementKind::Income, at(2026, 3, 11), 10, None),
        ];
        let points = trend(&entries, &buckets).unwrap();
        assert_eq!(points[0].balance_minor, 100);
        assert_eq!(points[1].income_minor, 10);
        assert_eq!(points[1].expense_minor, 40);
        assert_eq!(points[1].balance_minor, -30);
    }

    #[test]
    fn product_ranking_orders_by_units() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let lines = vec![
            SoldLine { product_id: a, product: "Widget".into(), quantity: 2, price_minor: 10 },
            SoldLine { product_id: b, product: "Gadget".into(), quantity: 3, price_minor: 5 },
            SoldLine { product_id: a, product: "Widget".into(), quantity: 2, price_minor: 10 },
        ];
        let ranking = rank_products(&lines, 10).unwrap();
        assert_eq!(ranking[0].product_id, a);
        assert_eq!(ranking[0].quantity, 4);
        assert_eq!(ranking[0].revenue_minor, 40);
        assert_eq!(rank_products(&lines, 1).unwrap().len(), 1);
    }

    #[test]
    fn client_ranking_orders_by_amount() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let sales = vec![
            ClientSale { client_id: a, client: "Ana".into(), amount_minor: 50 },
            ClientSale { client_id: b, client: "Bruno".into(), amount_minor: 80 },
            ClientSale { client_id: a, client: "Ana".into(), amount_minor: 20 },
        ];
        let ranking = rank_clients(&sales, 10).unwrap();
        assert_eq!(ranking[0].client_id, b);
        assert_eq!(ranking[1].sales_count, 2);
        assert_eq!(ranking[1].total_minor, 70);
    }
}
