//! # Cart Workflows
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐       │
//! │  │  Empty   │────►│ In Cart  │────►│  Tender  │────►│ Finalized│       │
//! │  │  Cart    │     │          │     │          │     │   Sale   │       │
//! │  └──────────┘     └──────────┘     └──────────┘     └──────────┘       │
//! │        ▲               │                                                │
//! │        │          add_product / update_quantity / remove_item           │
//! │        │          apply_discount / set_customer / set_notes             │
//! │        │               │                                                │
//! │        └── cancel_sale ┘   (also after save_as_account, add_to_account) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::{debug, info, warn};

use cuenta_core::{Cart, CoreError, Money};

use super::Checkout;
use crate::error::CheckoutResult;

impl Checkout {
    /// Looks a product up and adds `quantity` units to the cart.
    ///
    /// ## Errors
    /// - `InvalidQuantity` for `quantity <= 0`
    /// - `ProductNotFound` for unknown or inactive products
    /// - `InsufficientStock` when stock enforcement is on and the cart
    ///   would hold more units than are tracked
    pub async fn add_product(&self, product_id: &str, quantity: i64) -> CheckoutResult<Cart> {
        debug!(product_id = %product_id, quantity = %quantity, "add_product");

        if quantity <= 0 {
            return Err(CoreError::InvalidQuantity(quantity).into());
        }
        self.ensure_idle()?;

        let product = self
            .stores
            .products
            .get(product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        let enforce_stock = self.config.enforce_stock;
        self.session.with_session_mut(|s| {
            if enforce_stock {
                let requested = s.cart.line(&product.id).map_or(0, |l| l.quantity) + quantity;
                if !product.can_sell(requested) {
                    warn!(product_id = %product.id, requested, "Insufficient stock");
                    return Err(CoreError::InsufficientStock {
                        product_id: product.id.clone(),
                        available: product.available_stock.unwrap_or(0),
                        requested,
                    }
                    .into());
                }
            }

            s.cart.add_product(&product, quantity)?;
            debug!(total = %s.cart.total(), items = s.cart.item_count(), "Product added");
            Ok(s.cart.clone())
        })
    }

    /// Sets a line's quantity; `quantity <= 0` removes the line.
    pub fn update_quantity(&self, product_id: &str, quantity: i64) -> CheckoutResult<Cart> {
        debug!(product_id = %product_id, quantity = %quantity, "update_quantity");

        self.session.with_session_mut(|s| {
            s.cart.update_quantity(product_id, quantity)?;
            Ok(s.cart.clone())
        })
    }

    pub fn remove_item(&self, product_id: &str) -> CheckoutResult<Cart> {
        debug!(product_id = %product_id, "remove_item");

        self.session.with_session_mut(|s| {
            s.cart.remove_item(product_id)?;
            Ok(s.cart.clone())
        })
    }

    /// Sets the flat discount. Negative amounts are rejected.
    pub fn apply_discount(&self, discount: Money) -> CheckoutResult<Cart> {
        debug!(discount = %discount, "apply_discount");

        self.session.with_session_mut(|s| {
            s.cart.apply_discount(discount)?;
            Ok(s.cart.clone())
        })
    }

    /// Attaches a customer from the directory, or detaches with `None`.
    pub async fn set_customer(&self, customer_id: Option<&str>) -> CheckoutResult<Cart> {
        debug!(customer_id = ?customer_id, "set_customer");
        self.ensure_idle()?;

        let snapshot = match customer_id {
            Some(id) => {
                let customer = self
                    .stores
                    .customers
                    .get(id)
                    .await?
                    .ok_or_else(|| CoreError::CustomerNotFound(id.to_string()))?;
                Some(customer.snapshot())
            }
            None => None,
        };

        self.session.with_session_mut(|s| {
            s.cart.set_customer(snapshot);
            Ok(s.cart.clone())
        })
    }

    /// Sets or clears (blank text) the cart notes.
    pub fn set_notes(&self, notes: Option<&str>) -> CheckoutResult<Cart> {
        self.session.with_session_mut(|s| {
            s.cart.set_notes(notes)?;
            Ok(s.cart.clone())
        })
    }

    /// Abandons the current sale: empty cart, no payments, fresh mode.
    ///
    /// When an account was being edited it stays in storage exactly as it
    /// was loaded.
    pub fn cancel_sale(&self) -> CheckoutResult<()> {
        self.session.with_session_mut(|s| {
            let lines = s.cart.item_count();
            s.reset();
            info!(lines, "Sale cancelled");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckoutConfig;
    use crate::error::CheckoutError;
    use crate::memory::MemoryStore;
    use crate::stores::Stores;
    use cuenta_core::{Customer, Product, ValidationError};

    async fn checkout(config: CheckoutConfig) -> Checkout {
        let store = MemoryStore::new();
        store
            .insert_product(Product {
                id: "TACO".to_string(),
                name: "Taco al pastor".to_string(),
                sale_price: Money::from_major(25),
                applies_tax: true,
                available_stock: Some(5),
                is_active: true,
            })
            .await;
        store
            .insert_product(Product {
                id: "OLD".to_string(),
                name: "Discontinued".to_string(),
                sale_price: Money::from_major(10),
                applies_tax: true,
                available_stock: None,
                is_active: false,
            })
            .await;
        store
            .insert_customer(Customer {
                id: "c-1".to_string(),
                name: "Don Ramón".to_string(),
                email: None,
                phone: None,
                tax_id: None,
            })
            .await;
        Checkout::new(Stores::in_memory(store), config)
    }

    #[tokio::test]
    async fn test_add_product_merges_lines() {
        let checkout = checkout(CheckoutConfig::default()).await;

        checkout.add_product("TACO", 2).await.unwrap();
        let cart = checkout.add_product("TACO", 1).await.unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 3);
        // 75 + 16% IVA
        assert_eq!(cart.total().to_fixed_string(), "87.00");
    }

    #[tokio::test]
    async fn test_add_product_rejections() {
        let checkout = checkout(CheckoutConfig::default()).await;

        assert_eq!(
            checkout.add_product("TACO", 0).await.unwrap_err(),
            CheckoutError::Core(CoreError::InvalidQuantity(0))
        );
        assert_eq!(
            checkout.add_product("NOPE", 1).await.unwrap_err(),
            CheckoutError::Core(CoreError::ProductNotFound("NOPE".to_string()))
        );
        assert_eq!(
            checkout.add_product("OLD", 1).await.unwrap_err(),
            CheckoutError::Core(CoreError::ProductNotFound("OLD".to_string()))
        );
        assert!(checkout.cart().is_empty());
    }

    #[tokio::test]
    async fn test_stock_enforcement_is_opt_in() {
        let relaxed = checkout(CheckoutConfig::default()).await;
        assert!(relaxed.add_product("TACO", 8).await.is_ok());

        let strict = checkout(CheckoutConfig {
            enforce_stock: true,
            ..CheckoutConfig::default()
        })
        .await;
        strict.add_product("TACO", 4).await.unwrap();
        let err = strict.add_product("TACO", 2).await.unwrap_err();
        assert_eq!(
            err,
            CheckoutError::Core(CoreError::InsufficientStock {
                product_id: "TACO".to_string(),
                available: 5,
                requested: 6,
            })
        );
        assert_eq!(strict.cart().total_quantity(), 4);
    }

    #[tokio::test]
    async fn test_update_remove_and_discount() {
        let checkout = checkout(CheckoutConfig::default()).await;
        checkout.add_product("TACO", 4).await.unwrap();

        let cart = checkout.update_quantity("TACO", 2).unwrap();
        assert_eq!(cart.subtotal(), Money::from_major(50));

        let cart = checkout.apply_discount(Money::from_major(10)).unwrap();
        // (50 - 10) * 1.16
        assert_eq!(cart.total().to_fixed_string(), "46.40");

        let err = checkout.apply_discount(Money::from_major(-1)).unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Core(CoreError::Validation(ValidationError::Negative { .. }))
        ));
        assert_eq!(checkout.cart().discount(), Money::from_major(10));

        let cart = checkout.update_quantity("TACO", 0).unwrap();
        assert!(cart.is_empty());
        assert!(checkout.remove_item("TACO").is_err());
    }

    #[tokio::test]
    async fn test_customer_and_notes() {
        let checkout = checkout(CheckoutConfig::default()).await;

        let cart = checkout.set_customer(Some("c-1")).await.unwrap();
        assert_eq!(cart.customer().map(|c| c.name.as_str()), Some("Don Ramón"));

        assert_eq!(
            checkout.set_customer(Some("c-9")).await.unwrap_err(),
            CheckoutError::Core(CoreError::CustomerNotFound("c-9".to_string()))
        );
        // Unchanged by the failed lookup
        assert!(checkout.cart().customer().is_some());

        let cart = checkout.set_notes(Some("sin cebolla")).unwrap();
        assert_eq!(cart.notes(), Some("sin cebolla"));

        let cart = checkout.set_customer(None).await.unwrap();
        assert!(cart.customer().is_none());
    }

    #[tokio::test]
    async fn test_cancel_sale_resets_everything() {
        let checkout = checkout(CheckoutConfig::default()).await;
        checkout.add_product("TACO", 1).await.unwrap();
        checkout.set_notes(Some("para llevar")).unwrap();

        checkout.cancel_sale().unwrap();

        let state = checkout.state();
        assert!(state.cart.is_empty());
        assert!(state.cart.notes().is_none());
        assert!(state.payments.is_empty());
        assert_eq!(state.cart.total(), Money::ZERO);
    }
}
