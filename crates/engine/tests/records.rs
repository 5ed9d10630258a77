mod common;

use common::{USER, at, engine_with_db, product};
use engine::{
    CategoryKind, ContactCmd, EngineError, ExpenseCmd, IncomeCmd, PurchaseCmd, SaleCmd, SaleKind,
    ServiceCmd, UpdateContactCmd, UpdateIncomeCmd, UpdateProductCmd, UpdateServiceCmd,
};

#[tokio::test]
async fn referenced_category_cannot_be_deleted() {
    let (engine, _db) = engine_with_db().await;
    let rent = engine
        .create_category(USER, CategoryKind::Expense, "Alquiler")
        .await
        .unwrap();
    let expense = engine
        .create_expense(ExpenseCmd::new(USER, 500, at(1)).category_id(rent.id))
        .await
        .unwrap();
    assert_eq!(expense.category, "Alquiler");

    let err = engine
        .delete_category(USER, CategoryKind::Expense, rent.id)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::StillReferenced {
            entity: "expense category".to_string(),
            count: 1,
        }
    );
    assert!(engine.get_category(USER, CategoryKind::Expense, rent.id).await.is_ok());
    assert!(engine.get_expense(USER, expense.id).await.is_ok());

    engine.delete_expense(USER, expense.id).await.unwrap();
    engine
        .delete_category(USER, CategoryKind::Expense, rent.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn category_names_are_unique_per_kind() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_category(USER, CategoryKind::Income, "Café")
        .await
        .unwrap();

    let err = engine
        .create_category(USER, CategoryKind::Income, "  cafe ")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    engine
        .create_category(USER, CategoryKind::Expense, "Café")
        .await
        .unwrap();
    engine
        .create_category("bob", CategoryKind::Income, "Café")
        .await
        .unwrap();
    assert_eq!(
        engine.list_categories(USER, CategoryKind::Income).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn renamed_income_category_shows_on_reads() {
    let (engine, _db) = engine_with_db().await;
    let category = engine
        .create_category(USER, CategoryKind::Income, "Ventas online")
        .await
        .unwrap();
    let income = engine
        .create_income(IncomeCmd::new(USER, 100, at(1)).category_id(category.id))
        .await
        .unwrap();
    engine
        .rename_category(USER, CategoryKind::Income, category.id, "Tienda online")
        .await
        .unwrap();

    let income = engine.get_income(USER, income.id).await.unwrap();
    assert_eq!(income.category_name.as_deref(), Some("Tienda online"));

    let cleared = engine
        .update_income(UpdateIncomeCmd::new(USER, income.id).category_id(None))
        .await
        .unwrap();
    assert_eq!(cleared.category_id, None);
    assert_eq!(cleared.category_name, None);
}

#[tokio::test]
async fn client_email_is_unique_case_insensitively() {
    let (engine, _db) = engine_with_db().await;
    let ana = engine
        .create_client(ContactCmd::new(USER, "Ana").email("ana@example.com"))
        .await
        .unwrap();

    let err = engine
        .create_client(ContactCmd::new(USER, "Otra Ana").email(" ANA@Example.com "))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    let luis = engine
        .create_client(ContactCmd::new(USER, "Luis").email("luis@example.com"))
        .await
        .unwrap();
    let err = engine
        .update_client(UpdateContactCmd::new(USER, luis.id).email("Ana@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    // Another tenant may reuse the address.
    engine
        .create_client(ContactCmd::new("bob", "Ana").email("ana@example.com"))
        .await
        .unwrap();
    assert_eq!(ana.email.as_deref(), Some("ana@example.com"));
}

#[tokio::test]
async fn invalid_fields_are_reported_per_field() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .create_client(ContactCmd::new(USER, "Ana").email("not-an-email"))
        .await
        .unwrap_err();
    let EngineError::Validation(fields) = err else {
        panic!("expected validation error");
    };
    assert_eq!(fields.iter().next().unwrap().field, "email");

    let err = engine
        .create_product(engine::ProductCmd::new(USER, " ", -1, -2))
        .await
        .unwrap_err();
    let EngineError::Validation(fields) = err else {
        panic!("expected validation error");
    };
    assert_eq!(fields.iter().count(), 3);

    let err = engine
        .create_income(IncomeCmd::new(USER, 0, at(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn sold_or_purchased_product_cannot_be_deleted() {
    let (engine, _db) = engine_with_db().await;
    let sold = product(&engine, "Widget", 5).await;
    let bought = product(&engine, "Gadget", 0).await;
    let unused = product(&engine, "Spare", 0).await;

    engine
        .create_sale(SaleCmd::new(USER, SaleKind::Product, 10, at(1)).product_line(sold.id, 1, 10))
        .await
        .unwrap();
    engine
        .create_purchase(PurchaseCmd::new(USER, at(2)).line(bought.id, 1, 10))
        .await
        .unwrap();

    for product in [&sold, &bought] {
        let err = engine.delete_product(USER, product.id).await.unwrap_err();
        assert!(matches!(err, EngineError::StillReferenced { count: 1, .. }));
    }
    engine.delete_product(USER, unused.id).await.unwrap();
}

#[tokio::test]
async fn client_service_and_supplier_guards() {
    let (engine, _db) = engine_with_db().await;
    let client = engine
        .create_client(ContactCmd::new(USER, "Ana"))
        .await
        .unwrap();
    let supplier = engine
        .create_supplier(ContactCmd::new(USER, "Mayorista"))
        .await
        .unwrap();
    let service = engine
        .create_service(ServiceCmd::new(USER, "Instalación", 200))
        .await
        .unwrap();
    let widget = product(&engine, "Widget", 0).await;

    engine
        .create_sale(
            SaleCmd::new(USER, SaleKind::Service, 200, at(1))
                .client_id(client.id)
                .service_line(service.id, 1, 200),
        )
        .await
        .unwrap();
    engine
        .create_purchase(
            PurchaseCmd::new(USER, at(2))
                .supplier_id(supplier.id)
                .line(widget.id, 1, 10),
        )
        .await
        .unwrap();

    let err = engine.delete_client(USER, client.id).await.unwrap_err();
    assert!(matches!(err, EngineError::StillReferenced { count: 1, .. }));
    let err = engine.delete_service(USER, service.id).await.unwrap_err();
    assert!(matches!(err, EngineError::StillReferenced { count: 1, .. }));
    let err = engine.delete_supplier(USER, supplier.id).await.unwrap_err();
    assert!(matches!(err, EngineError::StillReferenced { count: 1, .. }));
}

#[tokio::test]
async fn patches_keep_unset_fields() {
    let (engine, _db) = engine_with_db().await;
    let widget = engine
        .create_product(engine::ProductCmd::new(USER, "Widget", 10, 5).description("Azul"))
        .await
        .unwrap();

    let updated = engine
        .update_product(UpdateProductCmd::new(USER, widget.id).price_minor(12))
        .await
        .unwrap();
    assert_eq!(updated.name, "Widget");
    assert_eq!(updated.description.as_deref(), Some("Azul"));
    assert_eq!(updated.quantity, 5);
    assert_eq!(updated.price_minor, 12);

    let err = engine
        .update_product(UpdateProductCmd::new(USER, widget.id).quantity(-1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let service = engine
        .create_service(ServiceCmd::new(USER, "Corte", 100).description("30 min"))
        .await
        .unwrap();
    let mut cmd = UpdateServiceCmd::new(USER, service.id);
    cmd.description = Some(String::new());
    let service = engine.update_service(cmd).await.unwrap();
    assert_eq!(service.description, None);
    assert_eq!(service.price_minor, 100);
}

#[tokio::test]
async fn sale_kind_must_match_lines() {
    let (engine, _db) = engine_with_db().await;
    let widget = product(&engine, "Widget", 5).await;
    let service = engine
        .create_service(ServiceCmd::new(USER, "Instalación", 200))
        .await
        .unwrap();

    let err = engine
        .create_sale(
            SaleCmd::new(USER, SaleKind::Product, 210, at(1))
                .product_line(widget.id, 1, 10)
                .service_line(service.id, 1, 200),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let sale = engine
        .create_sale(
            SaleCmd::new(USER, SaleKind::Mixed, 210, at(1))
                .product_line(widget.id, 1, 10)
                .service_line(service.id, 1, 200),
        )
        .await
        .unwrap();
    let sale = engine.get_sale(USER, sale.id).await.unwrap();
    assert_eq!(sale.product_lines.len(), 1);
    assert_eq!(sale.service_lines.len(), 1);
    assert_eq!(sale.kind, SaleKind::Mixed);
}
