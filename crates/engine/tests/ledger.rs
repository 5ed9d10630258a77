mod common;

use std::collections::HashSet;

use common::{USER, all_movements, at, engine_with_db, execute, product};
use engine::{
    CategoryKind, ContactCmd, EngineError, ExpenseCmd, IncomeCmd, MovementKind,
    MovementListFilter, MovementSource, PurchaseCmd, SaleCmd, SaleKind, UpdateExpenseCmd,
    UpdateIncomeCmd, UpdatePurchaseCmd,
};

#[tokio::test]
async fn every_record_has_exactly_one_movement() {
    let (engine, _db) = engine_with_db().await;
    let widget = product(&engine, "Widget", 10).await;

    let income = engine
        .create_income(IncomeCmd::new(USER, 1000, at(1)))
        .await
        .unwrap();
    let expense = engine
        .create_expense(ExpenseCmd::new(USER, 300, at(2)).category("Alquiler"))
        .await
        .unwrap();
    let sale = engine
        .create_sale(SaleCmd::new(USER, SaleKind::Product, 20, at(3)).product_line(widget.id, 2, 10))
        .await
        .unwrap();
    let purchase = engine
        .create_purchase(PurchaseCmd::new(USER, at(4)).line(widget.id, 5, 40))
        .await
        .unwrap();

    let movements = all_movements(&engine, USER).await;
    let sources: HashSet<MovementSource> = movements.iter().map(|m| m.source).collect();
    assert_eq!(movements.len(), 4);
    assert_eq!(
        sources,
        HashSet::from([
            MovementSource::Income(income.id),
            MovementSource::Expense(expense.id),
            MovementSource::Sale(sale.id),
            MovementSource::Purchase(purchase.id),
        ])
    );
    // The purchase's own expense is represented by the purchase movement.
    assert_eq!(engine.list_expenses(USER, None).await.unwrap().len(), 2);

    engine
        .update_income(UpdateIncomeCmd::new(USER, income.id).amount_minor(1500).occurred_at(at(9)))
        .await
        .unwrap();
    let movement = all_movements(&engine, USER)
        .await
        .into_iter()
        .find(|m| m.source == MovementSource::Income(income.id))
        .unwrap();
    assert_eq!(movement.amount_minor, 1500);
    assert_eq!(movement.occurred_at, at(9));

    engine.delete_income(USER, income.id).await.unwrap();
    engine.delete_expense(USER, expense.id).await.unwrap();
    engine.delete_sale(USER, sale.id).await.unwrap();
    let movements = all_movements(&engine, USER).await;
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].source, MovementSource::Purchase(purchase.id));
}

#[tokio::test]
async fn descriptions_default_to_kind_and_label() {
    let (engine, _db) = engine_with_db().await;
    let salary = engine
        .create_category(USER, CategoryKind::Income, "Salario")
        .await
        .unwrap();
    let client = engine
        .create_client(ContactCmd::new(USER, "Ana"))
        .await
        .unwrap();
    let widget = product(&engine, "Widget", 10).await;

    engine
        .create_income(IncomeCmd::new(USER, 100, at(1)).category_id(salary.id))
        .await
        .unwrap();
    engine
        .create_income(IncomeCmd::new(USER, 100, at(2)).description("Propina"))
        .await
        .unwrap();
    engine
        .create_sale(
            SaleCmd::new(USER, SaleKind::Product, 10, at(3))
                .client_id(client.id)
                .product_line(widget.id, 1, 10),
        )
        .await
        .unwrap();
    engine
        .create_sale(SaleCmd::new(USER, SaleKind::Product, 10, at(4)).product_line(widget.id, 1, 10))
        .await
        .unwrap();

    let descriptions: Vec<String> = all_movements(&engine, USER)
        .await
        .into_iter()
        .filter_map(|m| m.description)
        .collect();
    assert_eq!(
        descriptions,
        vec![
            "Venta - Cliente general".to_string(),
            "Venta - Ana".to_string(),
            "Propina".to_string(),
            "Ingreso - Salario".to_string(),
        ]
    );
}

#[tokio::test]
async fn update_recreates_a_missing_movement() {
    let (engine, db) = engine_with_db().await;
    let income = engine
        .create_income(IncomeCmd::new(USER, 1000, at(1)))
        .await
        .unwrap();
    execute(
        &db,
        "DELETE FROM movements WHERE source_id = ?",
        vec![income.id.to_string().into()],
    )
    .await;
    assert!(all_movements(&engine, USER).await.is_empty());

    engine
        .update_income(UpdateIncomeCmd::new(USER, income.id).amount_minor(1200))
        .await
        .unwrap();
    let movements = all_movements(&engine, USER).await;
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].source, MovementSource::Income(income.id));
    assert_eq!(movements[0].amount_minor, 1200);
}

#[tokio::test]
async fn reconcile_repairs_drift() {
    let (engine, db) = engine_with_db().await;
    let kept = engine
        .create_income(IncomeCmd::new(USER, 1000, at(1)))
        .await
        .unwrap();
    let lost = engine
        .create_expense(ExpenseCmd::new(USER, 200, at(2)).category("Luz"))
        .await
        .unwrap();
    let orphan = engine
        .create_income(IncomeCmd::new(USER, 50, at(3)))
        .await
        .unwrap();

    execute(
        &db,
        "UPDATE movements SET amount_minor = 1 WHERE source_id = ?",
        vec![kept.id.to_string().into()],
    )
    .await;
    execute(
        &db,
        "DELETE FROM movements WHERE source_id = ?",
        vec![lost.id.to_string().into()],
    )
    .await;
    execute(
        &db,
        "DELETE FROM incomes WHERE id = ?",
        vec![orphan.id.to_string().into()],
    )
    .await;

    let report = engine.reconcile_ledger(USER).await.unwrap();
    assert_eq!((report.created, report.updated, report.removed), (1, 1, 1));

    let movements = all_movements(&engine, USER).await;
    assert_eq!(movements.len(), 2);
    let kept_movement = movements
        .iter()
        .find(|m| m.source == MovementSource::Income(kept.id))
        .unwrap();
    assert_eq!(kept_movement.amount_minor, 1000);

    let again = engine.reconcile_ledger(USER).await.unwrap();
    assert_eq!((again.created, again.updated, again.removed), (0, 0, 0));
}

#[tokio::test]
async fn linked_expense_is_managed_through_its_purchase() {
    let (engine, _db) = engine_with_db().await;
    let widget = product(&engine, "Widget", 0).await;
    let purchase = engine
        .create_purchase(
            PurchaseCmd::new(USER, at(5))
                .description("Reposición")
                .line(widget.id, 2, 150),
        )
        .await
        .unwrap();
    let expense_id = purchase.expense_id.unwrap();
    let expense = engine.get_expense(USER, expense_id).await.unwrap();
    assert_eq!(expense.category, "Compra");
    assert_eq!(expense.amount_minor, 300);
    assert_eq!(expense.purchase_id, Some(purchase.id));

    let err = engine
        .update_expense(UpdateExpenseCmd::new(USER, expense_id).amount_minor(1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
    let err = engine.delete_expense(USER, expense_id).await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    let mut cmd = UpdatePurchaseCmd::new(USER, purchase.id).amount_minor(450);
    cmd.occurred_at = Some(at(7));
    engine.update_purchase(cmd).await.unwrap();
    let expense = engine.get_expense(USER, expense_id).await.unwrap();
    assert_eq!(expense.amount_minor, 450);
    assert_eq!(expense.occurred_at, at(7));

    let movements = all_movements(&engine, USER).await;
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].kind(), MovementKind::Purchase);
    assert_eq!(movements[0].amount_minor, 450);
    assert_eq!(movements[0].description.as_deref(), Some("Reposición"));
}

#[tokio::test]
async fn movements_paginate_newest_first() {
    let (engine, _db) = engine_with_db().await;
    for day in 1..=5 {
        engine
            .create_income(IncomeCmd::new(USER, i64::from(day) * 100, at(day)))
            .await
            .unwrap();
    }
    engine
        .create_expense(ExpenseCmd::new(USER, 10, at(3)).category("Otros"))
        .await
        .unwrap();

    let filter = MovementListFilter::default();
    let first = engine.list_movements(USER, &filter, None, 4).await.unwrap();
    assert_eq!(first.items.len(), 4);
    let cursor = first.next_cursor.clone().unwrap();
    let second = engine
        .list_movements(USER, &filter, Some(&cursor), 4)
        .await
        .unwrap();
    assert_eq!(second.items.len(), 2);
    assert!(second.next_cursor.is_none());

    let dates: Vec<_> = first
        .items
        .iter()
        .chain(second.items.iter())
        .map(|m| m.occurred_at)
        .collect();
    let mut sorted = dates.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(dates, sorted);

    let incomes_only = MovementListFilter {
        from: Some(at(2)),
        to: Some(at(4)),
        kinds: Some(vec![MovementKind::Income]),
    };
    let page = engine
        .list_movements(USER, &incomes_only, None, 10)
        .await
        .unwrap();
    let amounts: Vec<i64> = page.items.iter().map(|m| m.amount_minor).collect();
    assert_eq!(amounts, vec![300, 200]);
}

#[tokio::test]
async fn bad_cursor_and_limit_are_rejected() {
    let (engine, _db) = engine_with_db().await;
    let filter = MovementListFilter::default();

    let err = engine
        .list_movements(USER, &filter, Some("not-a-cursor"), 10)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidCursor(_)));

    let err = engine.list_movements(USER, &filter, None, 0).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn ledgers_are_scoped_per_user() {
    let (engine, _db) = engine_with_db().await;
    let income = engine
        .create_income(IncomeCmd::new(USER, 1000, at(1)))
        .await
        .unwrap();

    assert!(all_movements(&engine, "bob").await.is_empty());
    let err = engine.delete_income("bob", income.id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    assert_eq!(all_movements(&engine, USER).await.len(), 1);
}

#[tokio::test]
async fn purchase_without_lines_needs_an_amount() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .create_purchase(PurchaseCmd::new(USER, at(4)).description("Limpieza"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let purchase = engine
        .create_purchase(
            PurchaseCmd::new(USER, at(4))
                .description("Limpieza")
                .amount_minor(1200),
        )
        .await
        .unwrap();
    assert!(purchase.lines.is_empty());
    let expense = engine
        .get_expense(USER, purchase.expense_id.unwrap())
        .await
        .unwrap();
    assert_eq!(expense.amount_minor, 1200);

    let movements = all_movements(&engine, USER).await;
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].source, MovementSource::Purchase(purchase.id));

    let report = engine.reconcile_ledger(USER).await.unwrap();
    assert_eq!((report.created, report.updated, report.removed), (0, 0, 0));
    assert_eq!(all_movements(&engine, USER).await.len(), 1);
}
