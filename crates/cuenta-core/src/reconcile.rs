//! # Account Reconciler
//!
//! Combines the working cart with a saved account. Both strategies are pure:
//! they take the current account and cart and return the account to save.
//! Neither touches the cart.
//!
//! ## Strategies
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  MERGE  ("add to account", cart started fresh)                         │
//! │                                                                         │
//! │   account: [A×2, B×1]     cart: [A×3, C×1]                              │
//! │                    └──────┬──────┘                                      │
//! │                           ▼                                             │
//! │   result:  [A×5, B×1, C×1]   (A keeps the account's captured price)    │
//! │                                                                         │
//! │  REPLACE ("save changes", cart was loaded from this account)           │
//! │                                                                         │
//! │   account: [A×2, B×1]     cart: [A×1, C×4]                              │
//! │                           ▼                                             │
//! │   result:  [A×1, C×4]        (prior lines discarded)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Mode
//! Which strategy applies depends on where the cart came from, so the cart's
//! origin is tracked explicitly as a [`CartMode`]. Merging a cart that was
//! loaded from an account would double every quantity, and replacing from a
//! fresh cart would wipe the account. Both are rejected with `ModeMismatch`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::account::Account;
use crate::cart::Cart;
use crate::error::{CoreError, CoreResult};
use crate::line::combined_quantity;

// =============================================================================
// Cart Mode
// =============================================================================

/// Where the session cart came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum CartMode {
    /// New sale. The cart may be merged into any open account.
    Fresh,
    /// The cart was loaded from an account. `original` is the account as it
    /// was loaded, kept so cancelling the edit can restore the view.
    EditingAccount {
        account_id: String,
        original: Box<Account>,
    },
}

impl CartMode {
    /// Starts editing `account`.
    pub fn editing(account: Account) -> Self {
        CartMode::EditingAccount {
            account_id: account.id.clone(),
            original: Box::new(account),
        }
    }

    #[inline]
    pub fn is_editing(&self) -> bool {
        matches!(self, CartMode::EditingAccount { .. })
    }

    /// The id of the account being edited, if any.
    pub fn editing_account_id(&self) -> Option<&str> {
        match self {
            CartMode::Fresh => None,
            CartMode::EditingAccount { account_id, .. } => Some(account_id),
        }
    }
}

impl Default for CartMode {
    fn default() -> Self {
        CartMode::Fresh
    }
}

impl fmt::Display for CartMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CartMode::Fresh => f.write_str("fresh"),
            CartMode::EditingAccount { account_id, .. } => {
                write!(f, "editing account {account_id}")
            }
        }
    }
}

// =============================================================================
// Strategies
// =============================================================================

/// Merges the cart into the account, summing quantities by product id.
///
/// ## Rules
/// - Existing line: quantities summed, the account's unit price is kept
/// - New line: appended after the account's lines, in cart order
/// - Discount and customer come from the cart only when the account has
///   none (zero discount, no customer)
/// - Notes are kept from the account, or taken from the cart if it has none
/// - Empty cart: the account is returned unchanged
///
/// ## Errors
/// - `InvalidAccountStatus` if the account is not open
/// - `Validation` if a summed quantity goes above `MAX_LINE_QUANTITY`
pub fn merge_cart_into_account(account: &Account, cart: &Cart) -> CoreResult<Account> {
    account.ensure_open()?;

    let mut merged = account.clone();
    if cart.is_empty() {
        return Ok(merged);
    }

    for line in cart.lines() {
        match merged
            .lines
            .iter_mut()
            .find(|l| l.product_id == line.product_id)
        {
            Some(existing) => {
                existing.quantity = combined_quantity(existing.quantity, line.quantity)?
            }
            None => merged.lines.push(line.clone()),
        }
    }

    if merged.discount.is_zero() && !cart.discount().is_zero() {
        merged.discount = cart.discount();
    }
    if merged.customer.is_none() {
        merged.customer = cart.customer().cloned();
    }
    if merged.notes.is_none() {
        merged.notes = cart.notes().map(str::to_string);
    }

    Ok(merged)
}

/// Overwrites the account's content with the cart.
///
/// ## Rules
/// - Lines: exactly the cart's lines, prior lines discarded
/// - Discount, customer, notes: the cart's when present (non-zero, `Some`),
///   otherwise the account's prior value
/// - Identity, name, status and version are kept
///
/// ## Errors
/// `InvalidAccountStatus` if the account is not open.
pub fn replace_account_with_cart(account: &Account, cart: &Cart) -> CoreResult<Account> {
    account.ensure_open()?;

    let mut replaced = account.clone();
    replaced.lines = cart.lines().to_vec();

    if !cart.discount().is_zero() {
        replaced.discount = cart.discount();
    }
    if let Some(customer) = cart.customer() {
        replaced.customer = Some(customer.clone());
    }
    if let Some(notes) = cart.notes() {
        replaced.notes = Some(notes.to_string());
    }

    Ok(replaced)
}

/// Applies the strategy the cart's mode allows.
///
/// | Mode                        | Strategy                          |
/// |-----------------------------|-----------------------------------|
/// | `Fresh`                     | merge into `account`              |
/// | `EditingAccount` (same id)  | replace `account`                 |
/// | `EditingAccount` (other id) | `ModeMismatch`                    |
pub fn reconcile(mode: &CartMode, account: &Account, cart: &Cart) -> CoreResult<Account> {
    match mode {
        CartMode::Fresh => merge_cart_into_account(account, cart),
        CartMode::EditingAccount { account_id, .. } if *account_id == account.id => {
            replace_account_with_cart(account, cart)
        }
        CartMode::EditingAccount { .. } => Err(CoreError::ModeMismatch {
            operation: "reconcile with another account",
            mode: mode.to_string(),
        }),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountStatus;
    use crate::money::Money;
    use crate::types::{CustomerSnapshot, Product};
    use chrono::Utc;

    fn product(id: &str, price: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {id}"),
            sale_price: Money::from_major(price),
            applies_tax: false,
            available_stock: None,
            is_active: true,
        }
    }

    fn account_with(items: &[(&str, i64, i64)]) -> Account {
        let mut cart = Cart::new();
        for (id, price, qty) in items {
            cart.add_product(&product(id, *price), *qty).unwrap();
        }
        Account::open("acc-1".to_string(), "Mesa 4", &cart, Utc::now()).unwrap()
    }

    fn customer(id: &str) -> CustomerSnapshot {
        CustomerSnapshot {
            id: id.to_string(),
            name: format!("Customer {id}"),
        }
    }

    #[test]
    fn test_merge_sums_quantities() {
        let account = account_with(&[("p", 10, 2)]);
        let mut cart = Cart::new();
        cart.add_product(&product("p", 10), 3).unwrap();

        let merged = merge_cart_into_account(&account, &cart).unwrap();

        assert_eq!(merged.lines.len(), 1);
        assert_eq!(merged.lines[0].quantity, 5);
        assert_eq!(merged.totals().subtotal, Money::from_major(50));
        // Cart untouched
        assert_eq!(cart.line("p").unwrap().quantity, 3);
    }

    #[test]
    fn test_merge_keeps_account_price_and_appends_new_lines() {
        let account = account_with(&[("a", 10, 1), ("b", 5, 1)]);
        let mut cart = Cart::new();
        cart.add_product(&product("a", 12), 1).unwrap();
        cart.add_product(&product("c", 7), 2).unwrap();

        let merged = merge_cart_into_account(&account, &cart).unwrap();

        let ids: Vec<&str> = merged.lines.iter().map(|l| l.product_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(merged.lines[0].unit_price, Money::from_major(10));
        assert_eq!(merged.totals().subtotal, Money::from_major(20 + 5 + 14));
    }

    #[test]
    fn test_merge_taxes_only_taxable_lines() {
        // Tortillas are exempt, the account already holds them
        let mut account = account_with(&[("tortillas", 50, 1)]);
        account.discount = Money::from_major(20);

        let mut taxed = product("enchiladas", 100);
        taxed.applies_tax = true;
        let mut cart = Cart::new();
        cart.add_product(&taxed, 1).unwrap();

        let merged = merge_cart_into_account(&account, &cart).unwrap();
        let totals = merged.totals();

        // IVA on (100 − 20), not on (150 − 20): same rule as the cart
        assert_eq!(totals.subtotal, Money::from_major(150));
        assert_eq!(totals.taxable_subtotal, Money::from_major(100));
        assert_eq!(totals.tax.to_fixed_string(), "12.80");
        assert_eq!(totals.total.to_fixed_string(), "142.80");

        assert_eq!(*Cart::from_account(&merged).totals(), totals);
    }

    #[test]
    fn test_merge_rejects_quantity_past_limit() {
        let account = account_with(&[("p", 10, crate::MAX_LINE_QUANTITY)]);
        let mut cart = Cart::new();
        cart.add_product(&product("p", 10), 1).unwrap();

        assert!(matches!(
            merge_cart_into_account(&account, &cart),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_merge_empty_cart_is_noop() {
        let account = account_with(&[("p", 10, 2)]);
        let merged = merge_cart_into_account(&account, &Cart::new()).unwrap();
        assert_eq!(merged, account);
    }

    #[test]
    fn test_merge_only_fills_missing_discount_and_customer() {
        let mut account = account_with(&[("p", 100, 1)]);
        account.discount = Money::from_major(5);
        account.customer = Some(customer("c1"));

        let mut cart = Cart::new();
        cart.add_product(&product("p", 100), 1).unwrap();
        cart.apply_discount(Money::from_major(30)).unwrap();
        cart.set_customer(Some(customer("c2")));

        let merged = merge_cart_into_account(&account, &cart).unwrap();
        assert_eq!(merged.discount, Money::from_major(5));
        assert_eq!(merged.customer, Some(customer("c1")));

        account.discount = Money::ZERO;
        account.customer = None;
        let merged = merge_cart_into_account(&account, &cart).unwrap();
        assert_eq!(merged.discount, Money::from_major(30));
        assert_eq!(merged.customer, Some(customer("c2")));
    }

    #[test]
    fn test_replace_discards_prior_lines() {
        let account = account_with(&[("p", 10, 1), ("q", 20, 1)]);
        let mut cart = Cart::new();
        cart.add_product(&product("r", 30), 2).unwrap();

        let replaced = replace_account_with_cart(&account, &cart).unwrap();

        assert_eq!(replaced.lines.len(), 1);
        assert_eq!(replaced.lines[0].product_id, "r");
        assert_eq!(replaced.totals().subtotal, Money::from_major(60));
        assert_eq!(replaced.id, account.id);
        assert_eq!(replaced.name, account.name);
        assert_eq!(replaced.version, account.version);
    }

    #[test]
    fn test_replace_falls_back_to_prior_discount_and_customer() {
        let mut account = account_with(&[("p", 10, 1)]);
        account.discount = Money::from_major(2);
        account.customer = Some(customer("c1"));

        let mut cart = Cart::new();
        cart.add_product(&product("p", 10), 3).unwrap();

        let replaced = replace_account_with_cart(&account, &cart).unwrap();
        assert_eq!(replaced.discount, Money::from_major(2));
        assert_eq!(replaced.customer, Some(customer("c1")));

        cart.apply_discount(Money::from_major(4)).unwrap();
        cart.set_customer(Some(customer("c9")));
        let replaced = replace_account_with_cart(&account, &cart).unwrap();
        assert_eq!(replaced.discount, Money::from_major(4));
        assert_eq!(replaced.customer, Some(customer("c9")));
    }

    #[test]
    fn test_closed_account_rejected() {
        let mut account = account_with(&[("p", 10, 1)]);
        account.status = AccountStatus::Paid;
        let cart = Cart::new();

        assert!(matches!(
            merge_cart_into_account(&account, &cart),
            Err(CoreError::InvalidAccountStatus { .. })
        ));
        assert!(replace_account_with_cart(&account, &cart).is_err());
    }

    #[test]
    fn test_reconcile_dispatches_on_mode() {
        let account = account_with(&[("p", 10, 2)]);
        let cart = Cart::from_account(&account);

        // Editing the same account: replace, quantities are not doubled
        let mode = CartMode::editing(account.clone());
        let result = reconcile(&mode, &account, &cart).unwrap();
        assert_eq!(result.lines[0].quantity, 2);

        // Fresh: merge
        let result = reconcile(&CartMode::Fresh, &account, &cart).unwrap();
        assert_eq!(result.lines[0].quantity, 4);

        // Editing a different account
        let mut other = account.clone();
        other.id = "acc-2".to_string();
        assert!(matches!(
            reconcile(&mode, &other, &cart),
            Err(CoreError::ModeMismatch { .. })
        ));
    }

    #[test]
    fn test_cart_mode_accessors() {
        let account = account_with(&[("p", 1, 1)]);
        let mode = CartMode::editing(account);
        assert!(mode.is_editing());
        assert_eq!(mode.editing_account_id(), Some("acc-1"));
        assert_eq!(CartMode::default().editing_account_id(), None);
        assert_eq!(mode.to_string(), "editing account acc-1");
    }
}
