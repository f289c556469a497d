//! # Settlement and Finalization
//!
//! ## Finalize Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    finalize_sale()                                      │
//! │                                                                         │
//! │  1. Guard      write pending? empty cart? payments short? ──► reject   │
//! │  2. Verify     edited account still at the loaded version               │
//! │                   └─ changed ──► ConcurrentModification, nothing sold   │
//! │  3. Record     SaleStore::create(NewSale)                               │
//! │                   └─ fails ──► PersistenceFailure, session untouched    │
//! │  4. Close      AccountStore::delete(edited account, loaded version)     │
//! │                   └─ fails ──► AccountCloseFailed, sale stays recorded  │
//! │  5. Reset      empty cart, no payments, fresh mode                      │
//! │  6. Return     FinalizedSale (receipt data)                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no compensation for a failure in step 4: the account has to be
//! closed by hand. A change that lands between steps 2 and 4 makes the close
//! fail with a conflict, so items added elsewhere stay on the open account.

use serde::Serialize;
use tracing::{debug, error, info, warn};

use cuenta_core::settlement::{self, SettlementSummary};
use cuenta_core::{CartMode, CoreError, Money, NewSale, PaymentMethod, Sale};

use super::Checkout;
use crate::error::{CheckoutError, CheckoutResult};
use crate::session::PendingWrite;

/// What the receipt needs after a successful finalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedSale {
    pub sale: Sale,
    /// Change to hand back.
    pub change: Money,
    /// The account this sale settled and removed from the open set.
    pub closed_account: Option<String>,
    pub store_name: String,
}

impl Checkout {
    /// Tenders a payment against the current cart total.
    ///
    /// ## Errors
    /// - `EmptyCart`
    /// - `Validation` for amounts that are not positive
    pub fn add_payment(
        &self,
        method: PaymentMethod,
        amount: Money,
        reference: Option<String>,
    ) -> CheckoutResult<SettlementSummary> {
        debug!(method = %method.as_str(), amount = %amount, "add_payment");

        self.session.with_session_mut(|s| {
            if s.cart.is_empty() {
                return Err(CoreError::EmptyCart.into());
            }
            s.payments = settlement::add_payment(&s.payments, method, amount, reference)?;

            let summary = settlement::summarize(s.cart.total(), &s.payments);
            info!(
                tendered = %summary.tendered,
                remaining = %summary.display_remaining(),
                change = %summary.change,
                "Payment added"
            );
            Ok(summary)
        })
    }

    /// Drops every tendered payment.
    pub fn clear_payments(&self) -> CheckoutResult<SettlementSummary> {
        self.session.with_session_mut(|s| {
            s.payments.clear();
            Ok(settlement::summarize(s.cart.total(), &s.payments))
        })
    }

    /// Current settlement figures for the tender dialog.
    pub fn settlement(&self) -> SettlementSummary {
        self.session
            .with_session(|s| settlement::summarize(s.cart.total(), &s.payments))
    }

    /// Records the sale, closes the edited account and starts a new sale.
    ///
    /// Single flight per session: a second call while the first is awaiting
    /// the store fails with `FinalizationInProgress`.
    ///
    /// ## Errors
    /// - `FinalizationInProgress` / `AccountWriteInProgress`
    /// - `EmptyCart`
    /// - `InsufficientPayment { remaining }`
    /// - `ConcurrentModification`: the edited account changed since it was
    ///   loaded, nothing recorded, session unchanged
    /// - `AccountNotFound`: the edited account was closed elsewhere
    /// - `PersistenceFailure`: nothing recorded, session unchanged, retry is safe
    /// - `AccountCloseFailed`: sale recorded, session reset, account still open
    pub async fn finalize_sale(&self) -> CheckoutResult<FinalizedSale> {
        let guard = self.session.begin_write(PendingWrite::Finalization, |s| {
            if s.cart.is_empty() {
                return Err(CoreError::EmptyCart.into());
            }
            settlement::ensure_complete(s.cart.total(), &s.payments)?;
            Ok(())
        })?;

        let state = guard.snapshot();
        // The edited account and the version it was loaded at
        let edited = match &state.mode {
            CartMode::EditingAccount { original, .. } => Some((original.id.clone(), original.version)),
            CartMode::Fresh => None,
        };
        let account_id = edited.as_ref().map(|(id, _)| id.clone());
        let new_sale = NewSale::from_cart(&state.cart, &state.payments, account_id.clone());

        debug!(
            total = %new_sale.total,
            lines = new_sale.lines.len(),
            payments = new_sale.payments.len(),
            account_id = ?account_id,
            "finalize_sale"
        );

        // Dropping the guard on these early returns keeps the session as is
        if let Some((account_id, version)) = &edited {
            self.ensure_account_unchanged(account_id, *version).await?;
        }

        let sale = match self.stores.sales.create(&new_sale).await {
            Ok(sale) => sale,
            Err(e) => {
                warn!(error = %e, "Sale not recorded");
                return Err(CheckoutError::PersistenceFailure(e));
            }
        };

        if let Some((account_id, version)) = &edited {
            if let Err(e) = self.stores.accounts.delete(account_id, *version).await {
                error!(
                    sale_id = %sale.id,
                    account_id = %account_id,
                    error = %e,
                    "Sale recorded but account left open"
                );
                guard.complete();
                return Err(CheckoutError::AccountCloseFailed {
                    sale_id: sale.id,
                    account_id: account_id.clone(),
                    source: e,
                });
            }
        }

        guard.complete();

        info!(
            sale_id = %sale.id,
            receipt_number = %sale.receipt_number,
            total = %sale.total,
            change = %sale.change,
            "Sale finalized"
        );

        Ok(FinalizedSale {
            change: sale.change,
            closed_account: account_id,
            store_name: self.config.store_name.clone(),
            sale,
        })
    }

    /// Fails unless the stored account is still at `loaded_version`.
    async fn ensure_account_unchanged(
        &self,
        account_id: &str,
        loaded_version: i64,
    ) -> CheckoutResult<()> {
        match self.stores.accounts.get(account_id).await? {
            None => Err(CoreError::AccountNotFound(account_id.to_string()).into()),
            Some(stored) if stored.version != loaded_version => {
                warn!(
                    account_id = %account_id,
                    loaded = loaded_version,
                    stored = stored.version,
                    "Edited account changed elsewhere, sale not recorded"
                );
                Err(CheckoutError::ConcurrentModification {
                    account_id: account_id.to_string(),
                })
            }
            Some(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckoutConfig;
    use crate::memory::MemoryStore;
    use crate::stores::Stores;
    use cuenta_core::Product;

    async fn setup() -> (Checkout, MemoryStore) {
        let store = MemoryStore::new();
        store
            .insert_product(Product {
                id: "COMBO".to_string(),
                name: "Combo comida".to_string(),
                sale_price: Money::from_major(100),
                applies_tax: true,
                available_stock: None,
                is_active: true,
            })
            .await;
        let checkout = Checkout::new(Stores::in_memory(store.clone()), CheckoutConfig::default());
        (checkout, store)
    }

    #[tokio::test]
    async fn test_payments_on_empty_cart_rejected() {
        let (checkout, _) = setup().await;
        assert_eq!(
            checkout
                .add_payment(PaymentMethod::Cash, Money::from_major(10), None)
                .unwrap_err(),
            CheckoutError::Core(CoreError::EmptyCart)
        );
    }

    #[tokio::test]
    async fn test_settlement_progress() {
        let (checkout, _) = setup().await;
        checkout.add_product("COMBO", 1).await.unwrap();

        // Total 116.00
        let summary = checkout
            .add_payment(PaymentMethod::Card, Money::from_major(100), None)
            .unwrap();
        assert!(!summary.is_complete);
        assert_eq!(summary.remaining, Money::from_major(16));

        let summary = checkout
            .add_payment(PaymentMethod::Cash, Money::from_major(20), None)
            .unwrap();
        assert!(summary.is_complete);
        assert_eq!(summary.change, Money::from_major(4));
        assert_eq!(checkout.settlement(), summary);

        let card = &checkout.payments()[0];
        assert!(card.reference.as_deref().is_some_and(|r| r.starts_with("CARD-")));

        let summary = checkout.clear_payments().unwrap();
        assert_eq!(summary.payment_count, 0);
        assert_eq!(summary.remaining, Money::from_major(116));
    }

    #[tokio::test]
    async fn test_finalize_requires_full_payment() {
        let (checkout, store) = setup().await;

        assert_eq!(
            checkout.finalize_sale().await.unwrap_err(),
            CheckoutError::Core(CoreError::EmptyCart)
        );

        checkout.add_product("COMBO", 1).await.unwrap();
        checkout
            .add_payment(PaymentMethod::Cash, Money::from_major(100), None)
            .unwrap();

        let err = checkout.finalize_sale().await.unwrap_err();
        assert_eq!(
            err,
            CheckoutError::Core(CoreError::InsufficientPayment {
                remaining: Money::from_major(16)
            })
        );
        assert!(store.sales().await.is_empty());
        assert_eq!(checkout.state().pending, None);
    }

    #[tokio::test]
    async fn test_finalize_clears_cart() {
        let (checkout, store) = setup().await;
        checkout.add_product("COMBO", 1).await.unwrap();
        checkout
            .add_payment(PaymentMethod::Cash, Money::from_major(200), None)
            .unwrap();

        let finalized = checkout.finalize_sale().await.unwrap();

        assert_eq!(finalized.change, Money::from_major(84));
        assert_eq!(finalized.sale.total, Money::from_major(116));
        assert!(finalized.closed_account.is_none());
        assert_eq!(finalized.store_name, "Cuenta POS");

        let cart = checkout.cart();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Money::ZERO);
        assert!(checkout.payments().is_empty());
        assert_eq!(store.sales().await.len(), 1);
    }
}
