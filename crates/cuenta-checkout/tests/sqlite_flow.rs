//! End-to-end register flows over an in-memory SQLite database.

use cuenta_checkout::{Checkout, CheckoutConfig, CheckoutError, Stores};
use cuenta_core::{AccountFilter, Customer, Money, PaymentMethod, Product};
use cuenta_db::Database;

async fn connect() -> (Checkout, Database) {
    let (checkout, db) = Checkout::connect(CheckoutConfig::default()).await.unwrap();

    let products = db.products();
    products
        .insert(&Product {
            id: "CAFE-OLLA".to_string(),
            name: "Café de olla".to_string(),
            sale_price: Money::from_cents(3850),
            applies_tax: true,
            available_stock: Some(100),
            is_active: true,
        })
        .await
        .unwrap();
    products
        .insert(&Product {
            id: "BOLILLO".to_string(),
            name: "Bolillo".to_string(),
            sale_price: Money::from_cents(350),
            applies_tax: false,
            available_stock: None,
            is_active: true,
        })
        .await
        .unwrap();
    db.customers()
        .insert(&Customer {
            id: "cli-7".to_string(),
            name: "Familia Pérez".to_string(),
            email: None,
            phone: None,
            tax_id: None,
        })
        .await
        .unwrap();

    (checkout, db)
}

#[tokio::test]
async fn test_account_lifecycle_to_receipt() {
    let (checkout, db) = connect().await;

    // Open a tab
    checkout.add_product("CAFE-OLLA", 2).await.unwrap();
    checkout.set_customer(Some("cli-7")).await.unwrap();
    let account = checkout.save_as_account("Mesa 5").await.unwrap();
    assert_eq!(account.version, 1);

    // Second round merged into the tab
    checkout.add_product("CAFE-OLLA", 1).await.unwrap();
    checkout.add_product("BOLILLO", 4).await.unwrap();
    let merged = checkout.add_to_account(&account.id).await.unwrap();
    assert_eq!(merged.version, 2);
    assert_eq!(merged.lines[0].quantity, 3);

    let open = checkout
        .list_open_accounts(&AccountFilter::named("mesa"))
        .await
        .unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].customer.as_ref().map(|c| c.id.as_str()), Some("cli-7"));

    // Pay the tab: 3 × 38.50 = 115.50 + 18.48 IVA + 4 × 3.50 = 147.98
    let cart = checkout.load_account_for_editing(&account.id).await.unwrap();
    assert_eq!(cart.total().to_fixed_string(), "147.98");

    checkout
        .add_payment(PaymentMethod::Card, Money::from_major(100), None)
        .unwrap();
    checkout
        .add_payment(PaymentMethod::Cash, Money::from_major(50), None)
        .unwrap();

    let finalized = checkout.finalize_sale().await.unwrap();
    assert_eq!(finalized.change.to_fixed_string(), "2.02");
    assert_eq!(finalized.closed_account.as_deref(), Some(account.id.as_str()));

    // Stored sale matches the receipt
    let stored = db.sales().get_by_id(&finalized.sale.id).await.unwrap().unwrap();
    assert_eq!(stored.receipt_number, finalized.sale.receipt_number);
    assert_eq!(stored.total.to_fixed_string(), "147.98");
    assert_eq!(stored.customer_id.as_deref(), Some("cli-7"));
    assert_eq!(stored.lines.len(), 2);

    // Account left the open set
    assert!(db.accounts().get_by_id(&account.id).await.unwrap().is_none());
    assert!(checkout.cart().is_empty());
}

#[tokio::test]
async fn test_stale_edit_rejected_across_sessions() {
    let (register_a, db) = connect().await;
    let register_b = Checkout::new(Stores::from_database(&db), CheckoutConfig::default());

    register_a.add_product("BOLILLO", 2).await.unwrap();
    let account = register_a.save_as_account("Barra").await.unwrap();

    // A loads the tab for editing while B adds a round to it
    register_a.load_account_for_editing(&account.id).await.unwrap();
    register_a.update_quantity("BOLILLO", 1).unwrap();

    register_b.add_product("CAFE-OLLA", 1).await.unwrap();
    register_b.add_to_account(&account.id).await.unwrap();

    let err = register_a.commit_account_edit().await.unwrap_err();
    assert_eq!(
        err,
        CheckoutError::ConcurrentModification {
            account_id: account.id.clone()
        }
    );

    // B's round survives
    let stored = db.accounts().get_by_id(&account.id).await.unwrap().unwrap();
    assert_eq!(stored.version, 2);
    assert_eq!(stored.lines.len(), 2);

    // A backs out; storage is not touched
    register_a.cancel_account_editing().unwrap();
    let stored = db.accounts().get_by_id(&account.id).await.unwrap().unwrap();
    assert_eq!(stored.version, 2);
}

#[tokio::test]
async fn test_cancel_account_removes_it() {
    let (checkout, db) = connect().await;

    checkout.add_product("BOLILLO", 10).await.unwrap();
    let account = checkout.save_as_account("Pedido pan").await.unwrap();
    assert_eq!(db.accounts().count_open().await.unwrap(), 1);

    checkout.cancel_account(&account.id).await.unwrap();

    assert_eq!(db.accounts().count_open().await.unwrap(), 0);
    assert!(matches!(
        checkout.cancel_account(&account.id).await,
        Err(CheckoutError::Core(cuenta_core::CoreError::AccountNotFound(_)))
    ));
}
