mod common;

use common::{USER, at, engine_with_db, engine_with_notifier, product, stock};
use engine::{
    DomainEvent, EngineError, MovementKind, ProductLineCmd, PurchaseCmd, PurchaseLineCmd, SaleCmd,
    SaleKind, UpdateProductCmd, UpdatePurchaseCmd, UpdateSaleCmd,
};

#[tokio::test]
async fn widget_sale_decrements_and_delete_restores() {
    let (engine, _db) = engine_with_db().await;
    let widget = product(&engine, "Widget", 5).await;

    let sale = engine
        .create_sale(SaleCmd::new(USER, SaleKind::Product, 30, at(10)).product_line(widget.id, 3, 10))
        .await
        .unwrap();
    assert_eq!(stock(&engine, &widget).await, 2);

    let movements = common::all_movements(&engine, USER).await;
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].kind(), MovementKind::Sale);
    assert_eq!(movements[0].amount_minor, 30);
    assert_eq!(movements[0].source.id(), sale.id);

    engine.delete_sale(USER, sale.id).await.unwrap();
    assert_eq!(stock(&engine, &widget).await, 5);
    assert!(common::all_movements(&engine, USER).await.is_empty());
}

#[tokio::test]
async fn insufficient_stock_rejects_whole_sale() {
    let (engine, _db) = engine_with_db().await;
    let widget = product(&engine, "Widget", 1).await;
    let gadget = product(&engine, "Gadget", 10).await;

    let err = engine
        .create_sale(
            SaleCmd::new(USER, SaleKind::Product, 50, at(10))
                .product_line(gadget.id, 2, 10)
                .product_line(widget.id, 2, 10),
        )
        .await
        .unwrap_err();

    let EngineError::InsufficientStock(shortages) = err else {
        panic!("expected insufficient stock, got {err:?}");
    };
    assert_eq!(shortages.len(), 1);
    assert_eq!(shortages[0].product, "Widget");
    assert_eq!(shortages[0].available, 1);
    assert_eq!(shortages[0].requested, 2);

    assert_eq!(stock(&engine, &widget).await, 1);
    assert_eq!(stock(&engine, &gadget).await, 10);
    assert!(engine.list_sales(USER, None).await.unwrap().is_empty());
    assert!(common::all_movements(&engine, USER).await.is_empty());
}

#[tokio::test]
async fn duplicate_lines_are_checked_against_their_sum() {
    let (engine, _db) = engine_with_db().await;
    let widget = product(&engine, "Widget", 4).await;

    let err = engine
        .create_sale(
            SaleCmd::new(USER, SaleKind::Product, 60, at(10))
                .product_line(widget.id, 3, 10)
                .product_line(widget.id, 3, 10),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientStock(_)));
    assert_eq!(stock(&engine, &widget).await, 4);
}

#[tokio::test]
async fn duplicate_lines_beyond_i64_are_rejected() {
    let (engine, _db) = engine_with_db().await;
    let widget = product(&engine, "Widget", 4).await;

    let err = engine
        .create_sale(
            SaleCmd::new(USER, SaleKind::Product, 60, at(10))
                .product_line(widget.id, i64::MAX, 0)
                .product_line(widget.id, 2, 0),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(stock(&engine, &widget).await, 4);
    assert!(engine.list_sales(USER, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn inactive_product_cannot_be_sold() {
    let (engine, _db) = engine_with_db().await;
    let widget = product(&engine, "Widget", 4).await;
    engine
        .update_product(UpdateProductCmd::new(USER, widget.id).active(false))
        .await
        .unwrap();

    let err = engine
        .create_sale(SaleCmd::new(USER, SaleKind::Product, 10, at(10)).product_line(widget.id, 1, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(stock(&engine, &widget).await, 4);
}

#[tokio::test]
async fn other_users_products_are_not_found() {
    let (engine, _db) = engine_with_db().await;
    let widget = product(&engine, "Widget", 4).await;

    let err = engine
        .create_sale(SaleCmd::new("bob", SaleKind::Product, 10, at(10)).product_line(widget.id, 1, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    assert_eq!(stock(&engine, &widget).await, 4);
}

#[tokio::test]
async fn sale_update_applies_only_the_difference() {
    let (engine, _db) = engine_with_db().await;
    let widget = product(&engine, "Widget", 10).await;
    let gadget = product(&engine, "Gadget", 10).await;

    let sale = engine
        .create_sale(SaleCmd::new(USER, SaleKind::Product, 40, at(10)).product_line(widget.id, 4, 10))
        .await
        .unwrap();
    assert_eq!(stock(&engine, &widget).await, 6);

    let updated = engine
        .update_sale(
            UpdateSaleCmd::new(USER, sale.id)
                .amount_minor(50)
                .product_lines(vec![
                    ProductLineCmd {
                        product_id: widget.id,
                        quantity: 1,
                        price_minor: 10,
                    },
                    ProductLineCmd {
                        product_id: gadget.id,
                        quantity: 4,
                        price_minor: 10,
                    },
                ]),
        )
        .await
        .unwrap();
    assert_eq!(updated.product_lines.len(), 2);
    assert_eq!(stock(&engine, &widget).await, 9);
    assert_eq!(stock(&engine, &gadget).await, 6);

    let movements = common::all_movements(&engine, USER).await;
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].amount_minor, 50);
}

#[tokio::test]
async fn sale_update_beyond_stock_keeps_old_lines() {
    let (engine, _db) = engine_with_db().await;
    let widget = product(&engine, "Widget", 5).await;

    let sale = engine
        .create_sale(SaleCmd::new(USER, SaleKind::Product, 20, at(10)).product_line(widget.id, 2, 10))
        .await
        .unwrap();

    // 2 already sold plus 3 on hand: asking for 6 is one too many.
    let err = engine
        .update_sale(UpdateSaleCmd::new(USER, sale.id).product_lines(vec![ProductLineCmd {
            product_id: widget.id,
            quantity: 6,
            price_minor: 10,
        }]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientStock(_)));
    assert_eq!(stock(&engine, &widget).await, 3);
    let sale = engine.get_sale(USER, sale.id).await.unwrap();
    assert_eq!(sale.product_lines[0].quantity, 2);
}

#[tokio::test]
async fn purchase_update_applies_per_product_delta() {
    let (engine, _db) = engine_with_db().await;
    let a = product(&engine, "A", 10).await;
    let b = product(&engine, "B", 10).await;
    let c = product(&engine, "C", 10).await;
    let untouched = product(&engine, "D", 10).await;

    let purchase = engine
        .create_purchase(PurchaseCmd::new(USER, at(5)).line(a.id, 3, 100).line(b.id, 5, 100))
        .await
        .unwrap();
    assert_eq!(purchase.amount_minor, 800);
    assert_eq!(stock(&engine, &a).await, 13);
    assert_eq!(stock(&engine, &b).await, 15);

    let updated = engine
        .update_purchase(UpdatePurchaseCmd::new(USER, purchase.id).lines(vec![
            PurchaseLineCmd {
                product_id: a.id,
                quantity: 5,
                unit_price_minor: 100,
            },
            PurchaseLineCmd {
                product_id: c.id,
                quantity: 2,
                unit_price_minor: 100,
            },
        ]))
        .await
        .unwrap();
    assert_eq!(updated.amount_minor, 700);

    assert_eq!(stock(&engine, &a).await, 15);
    assert_eq!(stock(&engine, &b).await, 10);
    assert_eq!(stock(&engine, &c).await, 12);
    assert_eq!(stock(&engine, &untouched).await, 10);
}

#[tokio::test]
async fn purchase_delete_reverses_stock() {
    let (engine, _db) = engine_with_db().await;
    let widget = product(&engine, "Widget", 0).await;

    let purchase = engine
        .create_purchase(PurchaseCmd::new(USER, at(5)).line(widget.id, 4, 250))
        .await
        .unwrap();
    assert_eq!(stock(&engine, &widget).await, 4);

    engine.delete_purchase(USER, purchase.id).await.unwrap();
    assert_eq!(stock(&engine, &widget).await, 0);
    assert!(engine.list_purchases(USER, None).await.unwrap().is_empty());
    assert!(engine.list_expenses(USER, None).await.unwrap().is_empty());
    assert!(common::all_movements(&engine, USER).await.is_empty());
}

#[tokio::test]
async fn purchase_delete_fails_once_units_are_sold() {
    let (engine, _db) = engine_with_db().await;
    let widget = product(&engine, "Widget", 0).await;

    let purchase = engine
        .create_purchase(PurchaseCmd::new(USER, at(5)).line(widget.id, 4, 250))
        .await
        .unwrap();
    engine
        .create_sale(SaleCmd::new(USER, SaleKind::Product, 30, at(6)).product_line(widget.id, 3, 10))
        .await
        .unwrap();

    let err = engine.delete_purchase(USER, purchase.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InsufficientStock(_)));
    assert_eq!(stock(&engine, &widget).await, 1);
    assert!(engine.get_purchase(USER, purchase.id).await.is_ok());
    assert_eq!(common::all_movements(&engine, USER).await.len(), 2);
}

#[tokio::test]
async fn selling_the_last_unit_notifies() {
    let (engine, _db, notifier) = engine_with_notifier().await;
    let widget = product(&engine, "Widget", 2).await;

    engine
        .create_sale(SaleCmd::new(USER, SaleKind::Product, 10, at(10)).product_line(widget.id, 1, 10))
        .await
        .unwrap();
    assert!(notifier.events.lock().unwrap().is_empty());

    engine
        .create_sale(SaleCmd::new(USER, SaleKind::Product, 10, at(11)).product_line(widget.id, 1, 10))
        .await
        .unwrap();
    let events = notifier.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![DomainEvent::StockDepleted {
            user_id: USER.to_string(),
            product_id: widget.id,
            product: "Widget".to_string(),
        }]
    );
}

#[tokio::test]
async fn failed_sale_does_not_notify() {
    let (engine, _db, notifier) = engine_with_notifier().await;
    let widget = product(&engine, "Widget", 1).await;

    engine
        .create_sale(SaleCmd::new(USER, SaleKind::Product, 10, at(10)).product_line(widget.id, 2, 10))
        .await
        .unwrap_err();
    assert!(notifier.events.lock().unwrap().is_empty());
}
