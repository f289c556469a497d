//! # Account Workflows
//!
//! Open accounts ("cuentas") are named tabs kept in the account store.
//!
//! ## Merge vs Replace
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Fresh cart ──────── add_to_account(id) ──────► merge  (quantities sum) │
//! │                                                                         │
//! │  load_account_for_editing(id)                                           │
//! │       │   cart := account content, mode := EditingAccount { id, orig }  │
//! │       ▼                                                                 │
//! │  edit the cart ─── commit_account_edit() ─────► replace (cart wins)     │
//! │       │                                                                 │
//! │       └─────────── cancel_account_editing() ──► nothing stored changes  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes carry the version that was read; a concurrent change in between
//! surfaces as `ConcurrentModification`.
//!
//! Every workflow that writes an account holds the session's write guard
//! until the store answers. The cart it saved is cleared through the guard,
//! so the same cart can never also be finalized or saved twice.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use cuenta_core::reconcile::{merge_cart_into_account, replace_account_with_cart};
use cuenta_core::{Account, AccountFilter, AccountStatus, Cart, CartMode, CoreError};

use super::Checkout;
use crate::error::CheckoutResult;
use crate::session::{PendingWrite, SessionState};

/// Merging and saving a new account need a cart that was not loaded from an
/// account.
fn ensure_fresh(state: &SessionState, operation: &'static str) -> CheckoutResult<()> {
    if state.mode.is_editing() {
        return Err(CoreError::ModeMismatch {
            operation,
            mode: state.mode.to_string(),
        }
        .into());
    }
    Ok(())
}

impl Checkout {
    /// Saves the cart as a new open account and starts a new sale.
    ///
    /// ## Errors
    /// - `EmptyCart`
    /// - `Validation` for a blank or too long name
    /// - `ModeMismatch` while editing an account (commit or cancel first)
    /// - `FinalizationInProgress` / `AccountWriteInProgress`
    pub async fn save_as_account(&self, name: &str) -> CheckoutResult<Account> {
        debug!(name = %name, "save_as_account");

        let guard = self.session.begin_write(PendingWrite::AccountWrite, |s| {
            ensure_fresh(s, "save as a new account")
        })?;
        let account = Account::open(
            Uuid::new_v4().to_string(),
            name,
            &guard.snapshot().cart,
            Utc::now(),
        )?;

        let saved = self.stores.accounts.save(&account).await?;
        guard.complete();

        info!(
            account_id = %saved.id,
            name = %saved.name,
            total = %saved.totals().total,
            "Account opened"
        );
        Ok(saved)
    }

    /// Merges the fresh cart into an open account and starts a new sale.
    ///
    /// An empty cart leaves the account untouched and nothing is written.
    pub async fn add_to_account(&self, account_id: &str) -> CheckoutResult<Account> {
        debug!(account_id = %account_id, "add_to_account");

        let guard = self.session.begin_write(PendingWrite::AccountWrite, |s| {
            ensure_fresh(s, "add to an account")
        })?;
        let cart = &guard.snapshot().cart;

        let account = self.fetch_account(account_id).await?;
        if cart.is_empty() {
            return Ok(account);
        }

        let merged = merge_cart_into_account(&account, cart)?;
        let saved = self.stores.accounts.save(&merged).await?;
        guard.complete();

        info!(
            account_id = %saved.id,
            version = saved.version,
            total = %saved.totals().total,
            "Cart merged into account"
        );
        Ok(saved)
    }

    /// Copies an open account into the cart for editing.
    ///
    /// Whatever the cart held before is discarded, as are any payments.
    pub async fn load_account_for_editing(&self, account_id: &str) -> CheckoutResult<Cart> {
        debug!(account_id = %account_id, "load_account_for_editing");
        self.ensure_idle()?;

        let account = self.fetch_account(account_id).await?;
        account.ensure_open()?;

        self.session.with_session_mut(|s| {
            if !s.cart.is_empty() {
                warn!(
                    discarded_lines = s.cart.item_count(),
                    "Loading account over a non-empty cart"
                );
            }
            s.cart = Cart::from_account(&account);
            s.payments.clear();
            s.mode = CartMode::editing(account);
            Ok(s.cart.clone())
        })
    }

    /// Writes the edited cart back over the account it was loaded from.
    ///
    /// The write is checked against the version that was loaded, so edits
    /// made elsewhere in the meantime are never overwritten silently.
    ///
    /// ## Errors
    /// - `ModeMismatch` when no account is being edited
    /// - `EmptyCart` (use `cancel_account` to drop an account)
    /// - `ConcurrentModification` if the account changed since loading
    pub async fn commit_account_edit(&self) -> CheckoutResult<Account> {
        let guard = self
            .session
            .begin_write(PendingWrite::AccountWrite, |_| Ok(()))?;

        let state = guard.snapshot();
        let replaced = match &state.mode {
            CartMode::EditingAccount { original, .. } => {
                if state.cart.is_empty() {
                    return Err(CoreError::EmptyCart.into());
                }
                replace_account_with_cart(original, &state.cart)?
            }
            CartMode::Fresh => {
                return Err(CoreError::ModeMismatch {
                    operation: "commit an account edit",
                    mode: state.mode.to_string(),
                }
                .into())
            }
        };
        debug!(account_id = %replaced.id, version = replaced.version, "commit_account_edit");

        let saved = match self.stores.accounts.save(&replaced).await {
            Ok(saved) => saved,
            Err(e) => {
                warn!(account_id = %replaced.id, error = %e, "Account edit not saved");
                return Err(e.into());
            }
        };
        guard.complete();

        info!(account_id = %saved.id, version = saved.version, "Account edit committed");
        Ok(saved)
    }

    /// Leaves edit mode without touching storage.
    ///
    /// Returns the account as it was loaded.
    pub fn cancel_account_editing(&self) -> CheckoutResult<Account> {
        self.session.with_session_mut(|s| {
            let mode = std::mem::take(&mut s.mode);
            match mode {
                CartMode::EditingAccount { original, .. } => {
                    s.reset();
                    info!(account_id = %original.id, "Account editing cancelled");
                    Ok(*original)
                }
                CartMode::Fresh => Err(CoreError::ModeMismatch {
                    operation: "cancel account editing",
                    mode: CartMode::Fresh.to_string(),
                }
                .into()),
            }
        })
    }

    /// Open accounts matching `filter`, most recently updated first.
    pub async fn list_open_accounts(&self, filter: &AccountFilter) -> CheckoutResult<Vec<Account>> {
        let accounts = self.stores.accounts.list(filter).await?;
        debug!(count = accounts.len(), "list_open_accounts");
        Ok(accounts)
    }

    /// Cancels an open account and removes it from the open set.
    ///
    /// If this session was editing it, the session starts a new sale.
    pub async fn cancel_account(&self, account_id: &str) -> CheckoutResult<Account> {
        debug!(account_id = %account_id, "cancel_account");

        let guard = self
            .session
            .begin_write(PendingWrite::AccountWrite, |_| Ok(()))?;

        let mut account = self.fetch_account(account_id).await?;
        account.close(AccountStatus::Cancelled, Utc::now())?;

        // Removed only if nobody changed it since the read above
        self.stores.accounts.delete(account_id, account.version).await?;

        if guard.snapshot().mode.editing_account_id() == Some(account_id) {
            guard.complete();
        }

        info!(account_id = %account.id, name = %account.name, "Account cancelled");
        Ok(account)
    }

    async fn fetch_account(&self, account_id: &str) -> CheckoutResult<Account> {
        let account = self
            .stores
            .accounts
            .get(account_id)
            .await?
            .ok_or_else(|| CoreError::AccountNotFound(account_id.to_string()))?;
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckoutConfig;
    use crate::error::CheckoutError;
    use crate::memory::MemoryStore;
    use crate::stores::Stores;
    use cuenta_core::{AccountStore, Money, Product};

    async fn setup() -> (Checkout, MemoryStore) {
        let store = MemoryStore::new();
        for (id, price) in [("CAFE", 35), ("PAN", 12)] {
            store
                .insert_product(Product {
                    id: id.to_string(),
                    name: id.to_lowercase(),
                    sale_price: Money::from_major(price),
                    applies_tax: false,
                    available_stock: None,
                    is_active: true,
                })
                .await;
        }
        let checkout = Checkout::new(Stores::in_memory(store.clone()), CheckoutConfig::default());
        (checkout, store)
    }

    #[tokio::test]
    async fn test_save_as_account_clears_cart() {
        let (checkout, store) = setup().await;

        assert_eq!(
            checkout.save_as_account("Mesa 4").await.unwrap_err(),
            CheckoutError::Core(CoreError::EmptyCart)
        );

        checkout.add_product("CAFE", 2).await.unwrap();
        assert!(checkout.save_as_account("   ").await.is_err());
        assert_eq!(checkout.cart().total_quantity(), 2);

        let account = checkout.save_as_account("Mesa 4").await.unwrap();
        assert_eq!(account.version, 1);
        assert_eq!(account.totals().total, Money::from_major(70));
        assert!(checkout.cart().is_empty());
        assert_eq!(store.account_count().await, 1);
    }

    #[tokio::test]
    async fn test_add_to_account_merges() {
        let (checkout, _store) = setup().await;
        checkout.add_product("CAFE", 1).await.unwrap();
        let account = checkout.save_as_account("Barra").await.unwrap();

        checkout.add_product("CAFE", 2).await.unwrap();
        checkout.add_product("PAN", 1).await.unwrap();
        let merged = checkout.add_to_account(&account.id).await.unwrap();

        assert_eq!(merged.version, 2);
        assert_eq!(merged.lines.len(), 2);
        assert_eq!(merged.lines[0].quantity, 3);
        assert_eq!(merged.totals().total, Money::from_major(117));
        assert!(checkout.cart().is_empty());

        // Empty cart: nothing written
        let same = checkout.add_to_account(&account.id).await.unwrap();
        assert_eq!(same.version, 2);

        assert_eq!(
            checkout.add_to_account("missing").await.unwrap_err(),
            CheckoutError::Core(CoreError::AccountNotFound("missing".to_string()))
        );
    }

    #[tokio::test]
    async fn test_edit_commit_replaces() {
        let (checkout, _store) = setup().await;
        checkout.add_product("CAFE", 3).await.unwrap();
        let account = checkout.save_as_account("Mesa 2").await.unwrap();

        let cart = checkout.load_account_for_editing(&account.id).await.unwrap();
        assert_eq!(cart.total_quantity(), 3);
        assert!(checkout.mode().is_editing());

        checkout.remove_item("CAFE").unwrap();
        checkout.add_product("PAN", 2).await.unwrap();

        // Merge is not allowed while editing
        assert!(matches!(
            checkout.add_to_account(&account.id).await,
            Err(CheckoutError::Core(CoreError::ModeMismatch { .. }))
        ));

        let saved = checkout.commit_account_edit().await.unwrap();
        assert_eq!(saved.lines.len(), 1);
        assert_eq!(saved.lines[0].product_id, "PAN");
        assert_eq!(saved.version, 2);
        assert_eq!(checkout.mode(), CartMode::Fresh);
    }

    #[tokio::test]
    async fn test_commit_detects_concurrent_change() {
        let (checkout, store) = setup().await;
        checkout.add_product("CAFE", 1).await.unwrap();
        let account = checkout.save_as_account("Mesa 7").await.unwrap();

        checkout.load_account_for_editing(&account.id).await.unwrap();
        checkout.add_product("PAN", 1).await.unwrap();

        // Another register adds to the same account
        let mut other = store.get(&account.id).await.unwrap().unwrap();
        other.notes = Some("otra terminal".to_string());
        store.save(&other).await.unwrap();

        let err = checkout.commit_account_edit().await.unwrap_err();
        assert_eq!(
            err,
            CheckoutError::ConcurrentModification {
                account_id: account.id.clone()
            }
        );
        // Still editing, cart intact
        assert!(checkout.mode().is_editing());
        assert_eq!(checkout.cart().item_count(), 2);
    }

    #[tokio::test]
    async fn test_cancel_editing_touches_nothing() {
        let (checkout, store) = setup().await;
        checkout.add_product("CAFE", 1).await.unwrap();
        let account = checkout.save_as_account("Mesa 1").await.unwrap();

        checkout.load_account_for_editing(&account.id).await.unwrap();
        checkout.add_product("PAN", 5).await.unwrap();

        let original = checkout.cancel_account_editing().unwrap();
        assert_eq!(original, account);
        assert_eq!(checkout.mode(), CartMode::Fresh);
        assert!(checkout.cart().is_empty());

        let stored = store.get(&account.id).await.unwrap().unwrap();
        assert_eq!(stored, account);

        assert!(matches!(
            checkout.cancel_account_editing(),
            Err(CheckoutError::Core(CoreError::ModeMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn test_cancel_account() {
        let (checkout, store) = setup().await;
        checkout.add_product("PAN", 1).await.unwrap();
        let account = checkout.save_as_account("Para llevar").await.unwrap();
        checkout.load_account_for_editing(&account.id).await.unwrap();

        let cancelled = checkout.cancel_account(&account.id).await.unwrap();
        assert_eq!(cancelled.status, AccountStatus::Cancelled);
        assert_eq!(store.account_count().await, 0);
        assert_eq!(checkout.mode(), CartMode::Fresh);
        assert!(checkout.cart().is_empty());

        assert!(checkout
            .list_open_accounts(&AccountFilter::all())
            .await
            .unwrap()
            .is_empty());
    }
}
