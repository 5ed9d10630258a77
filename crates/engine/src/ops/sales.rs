//! Sales and their coupling to product stock.
//!
//! Every sale operation validates in a read phase (fields, client, products,
//! services, available stock) before writing anything. The write phase then
//! persists the sale, its lines, the stock deltas and the movement in one
//! transaction. Stock decrements stay conditional in the write phase too, so
//! a concurrent sale that wins the race still cannot overdraw a product.

use std::collections::{BTreeMap, HashMap, HashSet};

use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    DateRange, EngineError, FieldErrors, MovementKind, MovementSource,
    ProductLineCmd, ResultEngine, Sale, SaleCmd, SaleKind, SaleProductLine, SaleServiceLine,
    ServiceLineCmd, StockShortage, UpdateSaleCmd, clients, products, sale_product_lines,
    sale_service_lines, sales,
    stock::{quantities_by_product, stock_deltas},
    util::apply_optional_id_patch,
};

use super::{
    Engine,
    access::{require_client, require_sale, require_service},
    ledger::{MovementDraft, delete_movements, describe, insert_movement, sync_movement},
    stock::apply_stock_deltas,
    with_tx,
};

fn check_sale_fields(
    kind: SaleKind,
    amount_minor: i64,
    product_lines: &[SaleProductLine],
    service_lines: &[SaleServiceLine],
) -> ResultEngine<()> {
    let mut errors = FieldErrors::new();
    if amount_minor <= 0 {
        errors.push("amount_minor", "must be > 0");
    }
    let has_products = !product_lines.is_empty();
    let has_services = !service_lines.is_empty();
    match kind {
        SaleKind::Product if !has_products || has_services => {
            errors.push("product_lines", "a product sale needs product lines only");
        }
        SaleKind::Service if !has_services || has_products => {
            errors.push("service_lines", "a service sale needs service lines only");
        }
        SaleKind::Mixed if !has_products || !has_services => {
            errors.push("kind", "a mixed sale needs product and service lines");
        }
        _ => {}
    }
    if product_lines.iter().any(|l| l.quantity <= 0) {
        errors.push("product_lines", "quantity must be > 0");
    }
    if product_lines.iter().any(|l| l.price_minor < 0) {
        errors.push("product_lines", "price_minor must be >= 0");
    }
    if service_lines.iter().any(|l| l.quantity <= 0) {
        errors.push("service_lines", "quantity must be > 0");
    }
    if service_lines.iter().any(|l| l.price_minor < 0) {
        errors.push("service_lines", "price_minor must be >= 0");
    }
    errors.into_result()
}

fn product_lines_from(cmds: &[ProductLineCmd]) -> Vec<SaleProductLine> {
    cmds.iter()
        .map(|l| SaleProductLine {
            id: Uuid::new_v4(),
            product_id: l.product_id,
            quantity: l.quantity,
            price_minor: l.price_minor,
        })
        .collect()
}

fn service_lines_from(cmds: &[ServiceLineCmd]) -> Vec<SaleServiceLine> {
    cmds.iter()
        .map(|l| SaleServiceLine {
            id: Uuid::new_v4(),
            service_id: l.service_id,
            quantity: l.quantity,
            price_minor: l.price_minor,
        })
        .collect()
}

fn sold_quantities(lines: &[SaleProductLine]) -> ResultEngine<BTreeMap<Uuid, i64>> {
    quantities_by_product(lines.iter().map(|l| (l.product_id, l.quantity)))
        .ok_or_else(|| EngineError::invalid("product_lines", "quantity total out of range"))
}

/// Read phase for product lines.
///
/// `deltas` are the stock changes the write would apply. Every product the
/// sale touches must exist and belong to the user; products whose stock
/// would drop must be active and hold enough units.
async fn check_products<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    product_ids: &HashSet<Uuid>,
    deltas: &BTreeMap<Uuid, i64>,
) -> ResultEngine<()> {
    if product_ids.is_empty() {
        return Ok(());
    }
    let found: HashMap<String, products::Model> = products::Entity::find()
        .filter(products::Column::UserId.eq(user_id))
        .filter(products::Column::Id.is_in(product_ids.iter().map(ToString::to_string)))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id.clone(), p))
        .collect();

    let mut shortages = Vec::new();
    for product_id in product_ids {
        let product = found
            .get(&product_id.to_string())
            .ok_or_else(|| EngineError::KeyNotFound("product not exists".to_string()))?;
        let Some(&delta) = deltas.get(product_id) else {
            continue;
        };
        if delta >= 0 {
            continue;
        }
        if !product.active {
            return Err(EngineError::invalid(
                "product_lines",
                format!("product {} is inactive", product.name),
            ));
        }
        if product.quantity < -delta {
            shortages.push(StockShortage {
                product_id: *product_id,
                product: product.name.clone(),
                available: product.quantity,
                requested: -delta,
            });
        }
    }
    if !shortages.is_empty() {
        shortages.sort_by(|a, b| a.product.cmp(&b.product));
        return Err(EngineError::InsufficientStock(shortages));
    }
    Ok(())
}

async fn check_services<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    lines: &[SaleServiceLine],
    already_sold: &HashSet<Uuid>,
) -> ResultEngine<()> {
    let ids: HashSet<Uuid> = lines.iter().map(|l| l.service_id).collect();
    for service_id in ids {
        let service = require_service(db, user_id, service_id).await?;
        if !service.active && !already_sold.contains(&service_id) {
            return Err(EngineError::invalid(
                "service_lines",
                format!("service {} is inactive", service.name),
            ));
        }
    }
    Ok(())
}

async fn client_name<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    client_id: Option<Uuid>,
) -> ResultEngine<Option<String>> {
    match client_id {
        Some(id) => Ok(Some(require_client(db, user_id, id).await?.name)),
        None => Ok(None),
    }
}

fn sale_draft(sale: &Sale) -> MovementDraft {
    MovementDraft {
        source: MovementSource::Sale(sale.id),
        occurred_at: sale.occurred_at,
        amount_minor: sale.amount_minor,
        description: describe(MovementKind::Sale, None, sale.client_name.as_deref()),
    }
}

async fn insert_lines<C: ConnectionTrait>(
    db: &C,
    sale_id: Uuid,
    product_lines: &[SaleProductLine],
    service_lines: &[SaleServiceLine],
) -> ResultEngine<()> {
    for line in product_lines {
        sale_product_lines::active_model(sale_id, line)
            .insert(db)
            .await?;
    }
    for line in service_lines {
        sale_service_lines::active_model(sale_id, line)
            .insert(db)
            .await?;
    }
    Ok(())
}

async fn load_lines<C: ConnectionTrait>(
    db: &C,
    sale_id: Uuid,
) -> ResultEngine<(Vec<SaleProductLine>, Vec<SaleServiceLine>)> {
    let product_lines = sale_product_lines::Entity::find()
        .filter(sale_product_lines::Column::SaleId.eq(sale_id.to_string()))
        .order_by_asc(sale_product_lines::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(SaleProductLine::try_from)
        .collect::<ResultEngine<Vec<_>>>()?;
    let service_lines = sale_service_lines::Entity::find()
        .filter(sale_service_lines::Column::SaleId.eq(sale_id.to_string()))
        .order_by_asc(sale_service_lines::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(SaleServiceLine::try_from)
        .collect::<ResultEngine<Vec<_>>>()?;
    Ok((product_lines, service_lines))
}

async fn load_sale<C: ConnectionTrait>(db: &C, user_id: &str, sale_id: Uuid) -> ResultEngine<Sale> {
    let mut sale = Sale::try_from(require_sale(db, user_id, sale_id).await?)?;
    let (product_lines, service_lines) = load_lines(db, sale_id).await?;
    sale.product_lines = product_lines;
    sale.service_lines = service_lines;
    sale.client_name = client_name(db, user_id, sale.client_id).await?;
    Ok(sale)
}

impl Engine {
    /// Record a sale: lines, stock decrements and movement, all or nothing.
    pub async fn create_sale(&self, cmd: SaleCmd) -> ResultEngine<Sale> {
        let product_lines = product_lines_from(&cmd.product_lines);
        let service_lines = service_lines_from(&cmd.service_lines);
        check_sale_fields(cmd.kind, cmd.amount_minor, &product_lines, &service_lines)?;

        let (sale, events) = with_tx!(self, |db_tx| {
            let user_id = cmd.user_id.as_str();
            let client_name = client_name(&db_tx, user_id, cmd.client_id).await?;
            let deltas = stock_deltas(&sold_quantities(&product_lines)?, &BTreeMap::new());
            let product_ids: HashSet<Uuid> = product_lines.iter().map(|l| l.product_id).collect();
            check_products(&db_tx, user_id, &product_ids, &deltas).await?;
            check_services(&db_tx, user_id, &service_lines, &HashSet::new()).await?;

            let sale = Sale {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                client_id: cmd.client_id,
                client_name,
                occurred_at: cmd.occurred_at,
                amount_minor: cmd.amount_minor,
                kind: cmd.kind,
                product_lines,
                service_lines,
            };
            sales::ActiveModel::from(&sale).insert(&db_tx).await?;
            insert_lines(&db_tx, sale.id, &sale.product_lines, &sale.service_lines).await?;
            let events = apply_stock_deltas(&db_tx, user_id, &deltas).await?;
            insert_movement(&db_tx, user_id, sale_draft(&sale)).await?;
            Ok::<_, EngineError>((sale, events))
        })?;

        self.dispatch(events);
        Ok(sale)
    }

    pub async fn get_sale(&self, user_id: &str, sale_id: Uuid) -> ResultEngine<Sale> {
        load_sale(&self.database, user_id, sale_id).await
    }

    /// Sales newest first, optionally restricted to `range`, with their lines.
    pub async fn list_sales(&self, user_id: &str, range: Option<DateRange>) -> ResultEngine<Vec<Sale>> {
        let mut query = sales::Entity::find()
            .filter(sales::Column::UserId.eq(user_id))
            .order_by_desc(sales::Column::OccurredAt)
            .order_by_desc(sales::Column::Id);
        if let Some(range) = range {
            query = query
                .filter(sales::Column::OccurredAt.gte(range.from))
                .filter(sales::Column::OccurredAt.lt(range.to));
        }
        let models = query.all(&self.database).await?;
        let ids: Vec<String> = models.iter().map(|s| s.id.clone()).collect();

        let mut product_lines: HashMap<String, Vec<SaleProductLine>> = HashMap::new();
        for line in sale_product_lines::Entity::find()
            .filter(sale_product_lines::Column::SaleId.is_in(ids.clone()))
            .all(&self.database)
            .await?
        {
            let sale_id = line.sale_id.clone();
            product_lines
                .entry(sale_id)
                .or_default()
                .push(SaleProductLine::try_from(line)?);
        }
        let mut service_lines: HashMap<String, Vec<SaleServiceLine>> = HashMap::new();
        for line in sale_service_lines::Entity::find()
            .filter(sale_service_lines::Column::SaleId.is_in(ids))
            .all(&self.database)
            .await?
        {
            let sale_id = line.sale_id.clone();
            service_lines
                .entry(sale_id)
                .or_default()
                .push(SaleServiceLine::try_from(line)?);
        }
        let client_names: HashMap<String, String> = clients::Entity::find()
            .filter(clients::Column::UserId.eq(user_id))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        let mut out = Vec::with_capacity(models.len());
        for model in models {
            let id = model.id.clone();
            let name = model
                .client_id
                .as_ref()
                .and_then(|c| client_names.get(c))
                .cloned();
            let mut sale = Sale::try_from(model)?;
            sale.client_name = name;
            sale.product_lines = product_lines.remove(&id).unwrap_or_default();
            sale.service_lines = service_lines.remove(&id).unwrap_or_default();
            out.push(sale);
        }
        Ok(out)
    }

    /// Patch a sale.
    ///
    /// Resubmitted product lines move stock by the per-product difference
    /// between the old and new lines only.
    pub async fn update_sale(&self, cmd: UpdateSaleCmd) -> ResultEngine<Sale> {
        let (sale, events) = with_tx!(self, |db_tx| {
            let user_id = cmd.user_id.as_str();
            let mut sale = load_sale(&db_tx, user_id, cmd.sale_id).await?;
            let old_products = sold_quantities(&sale.product_lines)?;
            let old_services: HashSet<Uuid> =
                sale.service_lines.iter().map(|l| l.service_id).collect();

            if let Some(occurred_at) = cmd.occurred_at {
                sale.occurred_at = occurred_at;
            }
            if let Some(amount_minor) = cmd.amount_minor {
                sale.amount_minor = amount_minor;
            }
            if let Some(kind) = cmd.kind {
                sale.kind = kind;
            }
            let client_id = apply_optional_id_patch(sale.client_id, cmd.client_id);
            if client_id != sale.client_id {
                sale.client_name = client_name(&db_tx, user_id, client_id).await?;
                sale.client_id = client_id;
            }
            let replace_products = cmd.product_lines.is_some();
            if let Some(lines) = &cmd.product_lines {
                sale.product_lines = product_lines_from(lines);
            }
            let replace_services = cmd.service_lines.is_some();
            if let Some(lines) = &cmd.service_lines {
                sale.service_lines = service_lines_from(lines);
            }
            check_sale_fields(sale.kind, sale.amount_minor, &sale.product_lines, &sale.service_lines)?;

            let new_products = sold_quantities(&sale.product_lines)?;
            let deltas = stock_deltas(&new_products, &old_products);
            let product_ids: HashSet<Uuid> = new_products.keys().copied().collect();
            check_products(&db_tx, user_id, &product_ids, &deltas).await?;
            if replace_services {
                check_services(&db_tx, user_id, &sale.service_lines, &old_services).await?;
            }

            if replace_products {
                sale_product_lines::Entity::delete_many()
                    .filter(sale_product_lines::Column::SaleId.eq(sale.id.to_string()))
                    .exec(&db_tx)
                    .await?;
                insert_lines(&db_tx, sale.id, &sale.product_lines, &[]).await?;
            }
            if replace_services {
                sale_service_lines::Entity::delete_many()
                    .filter(sale_service_lines::Column::SaleId.eq(sale.id.to_string()))
                    .exec(&db_tx)
                    .await?;
                insert_lines(&db_tx, sale.id, &[], &sale.service_lines).await?;
            }
            let events = apply_stock_deltas(&db_tx, user_id, &deltas).await?;

            let mut model = sales::ActiveModel::from(&sale);
            model.id = ActiveValue::Unchanged(sale.id.to_string());
            model.update(&db_tx).await?;
            sync_movement(&db_tx, user_id, sale_draft(&sale)).await?;
            Ok::<_, EngineError>((sale, events))
        })?;

        self.dispatch(events);
        Ok(sale)
    }

    /// Delete a sale, returning its sold units to stock.
    pub async fn delete_sale(&self, user_id: &str, sale_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let sale = load_sale(&db_tx, user_id, sale_id).await?;
            let returned = sold_quantities(&sale.product_lines)?;
            apply_stock_deltas(&db_tx, user_id, &returned).await?;

            sale_product_lines::Entity::delete_many()
                .filter(sale_product_lines::Column::SaleId.eq(sale_id.to_string()))
                .exec(&db_tx)
                .await?;
            sale_service_lines::Entity::delete_many()
                .filter(sale_service_lines::Column::SaleId.eq(sale_id.to_string()))
                .exec(&db_tx)
                .await?;
            delete_movements(&db_tx, user_id, MovementSource::Sale(sale_id)).await?;
            sales::Entity::delete_by_id(sale_id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_line(quantity: i64) -> SaleProductLine {
        SaleProductLine {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity,
            price_minor: 10,
        }
    }

    fn service_line() -> SaleServiceLine {
        SaleServiceLine {
            id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            quantity: 1,
            price_minor: 50,
        }
    }

    #[test]
    fn kind_must_match_lines() {
        assert!(check_sale_fields(SaleKind::Product, 30, &[product_line(3)], &[]).is_ok());
        assert!(check_sale_fields(SaleKind::Service, 50, &[], &[service_line()]).is_ok());
        assert!(
            check_sale_fields(SaleKind::Mixed, 80, &[product_line(1)], &[service_line()]).is_ok()
        );

        assert!(check_sale_fields(SaleKind::Product, 30, &[], &[]).is_err());
        assert!(check_sale_fields(SaleKind::Product, 30, &[product_line(1)], &[service_line()]).is_err());
        assert!(check_sale_fields(SaleKind::Mixed, 30, &[product_line(1)], &[]).is_err());
    }

    #[test]
    fn invalid_amount_and_quantity_are_reported_together() {
        let Err(EngineError::Validation(errors)) =
            check_sale_fields(SaleKind::Product, 0, &[product_line(0)], &[])
        else {
            panic!("expected validation error");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["amount_minor", "product_lines"]);
    }
}
