//! Stock arithmetic for line-item edits.
//!
//! Sales and purchases move product stock in opposite directions. Both reduce
//! an edit to a per-product delta map, computed here without touching the
//! database.

use std::collections::BTreeMap;

use uuid::Uuid;

/// Units per product, with duplicate lines summed. `None` when a total
/// does not fit in an `i64`.
pub fn quantities_by_product<I>(lines: I) -> Option<BTreeMap<Uuid, i64>>
where
    I: IntoIterator<Item = (Uuid, i64)>,
{
    let mut totals = BTreeMap::new();
    for (product_id, quantity) in lines {
        let total = totals.entry(product_id).or_insert(0i64);
        *total = total.checked_add(quantity)?;
    }
    Some(totals)
}

/// Per-product `after - before`, omitting products whose net change is zero.
/// Both maps hold non-negative totals, so the difference always fits.
///
/// A purchase edit applies `stock_deltas(old, new)`; a sale edit applies
/// `stock_deltas(new, old)` since sold units leave stock.
pub fn stock_deltas(
    before: &BTreeMap<Uuid, i64>,
    after: &BTreeMap<Uuid, i64>,
) -> BTreeMap<Uuid, i64> {
    let mut deltas = BTreeMap::new();
    for (product_id, quantity) in after {
        let previous = before.get(product_id).copied().unwrap_or(0);
        if let Some(delta) = quantity.checked_sub(previous).filter(|d| *d != 0) {
            deltas.insert(*product_id, delta);
        }
    }
    for (product_id, quantity) in before {
        if !after.contains_key(product_id) && *quantity != 0 {
            deltas.insert(*product_id, -quantity);
        }
    }
    deltas
}
