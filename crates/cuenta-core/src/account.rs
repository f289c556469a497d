//! # Open Accounts (Cuentas)
//!
//! A persisted, named cart awaiting settlement: a restaurant table, a tab at
//! the counter, a customer who pays at the end of the week.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Account Lifecycle                                 │
//! │                                                                         │
//! │   Cart ──save as account──► ┌──────┐ ──finalize sale──► ┌──────┐        │
//! │                             │ Open │                    │ Paid │        │
//! │   merge / replace ────────► └──────┘ ──cancel─────────► ┌───────────┐   │
//! │   (version += 1 per save)      │                        │ Cancelled │   │
//! │                                │                        └───────────┘   │
//! │                                ▼                                        │
//! │                   load for editing ──► Cart (EditingAccount mode)       │
//! │                                                                         │
//! │   Paid and Cancelled accounts leave the open-accounts store.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Versioning
//! `version` is 0 until the first save. Each successful save bumps it by one.
//! A save carrying a stale version is rejected by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult};
use crate::line::{LineItem, Totals};
use crate::money::Money;
use crate::types::{CustomerSnapshot, TaxRate};
use crate::validation::validate_account_name;

// =============================================================================
// Account Status
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Accepting merges and edits.
    Open,
    /// Settled by a finalized sale.
    Paid,
    /// Abandoned without a sale.
    Cancelled,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Open => "open",
            AccountStatus::Paid => "paid",
            AccountStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for AccountStatus {
    fn default() -> Self {
        AccountStatus::Open
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Account
// =============================================================================

/// A saved cart with a name, waiting to be paid.
///
/// Totals are not stored: `totals()` derives them from the lines with the
/// same rule the cart uses, so they can never drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    /// Display name ("Mesa 4", "Don Ramón").
    pub name: String,
    pub customer: Option<CustomerSnapshot>,
    pub lines: Vec<LineItem>,
    pub discount: Money,
    pub tax_rate: TaxRate,
    pub notes: Option<String>,
    pub status: AccountStatus,
    /// Optimistic concurrency counter. 0 = never persisted.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Opens a new account holding a copy of the cart's content.
    ///
    /// The caller supplies id and clock so this stays deterministic.
    ///
    /// ## Errors
    /// - `EmptyCart` if the cart has no lines
    /// - `Validation` if the name is blank or too long
    pub fn open(id: String, name: &str, cart: &Cart, now: DateTime<Utc>) -> CoreResult<Self> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        let name = validate_account_name(name)?;

        Ok(Account {
            id,
            name,
            customer: cart.customer().cloned(),
            lines: cart.lines().to_vec(),
            discount: cart.discount(),
            tax_rate: cart.tax_rate(),
            notes: cart.notes().map(str::to_string),
            status: AccountStatus::Open,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Derived totals (subtotal, IVA, total).
    pub fn totals(&self) -> Totals {
        Totals::compute(&self.lines, self.discount, self.tax_rate)
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == AccountStatus::Open
    }

    /// Fails with `InvalidAccountStatus` unless the account is open.
    pub fn ensure_open(&self) -> CoreResult<()> {
        if !self.is_open() {
            return Err(CoreError::InvalidAccountStatus {
                account_id: self.id.clone(),
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    /// Moves an open account to `Paid` or `Cancelled`.
    pub fn close(&mut self, status: AccountStatus, now: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_open()?;
        if status == AccountStatus::Open {
            return Err(CoreError::InvalidAccountStatus {
                account_id: self.id.clone(),
                status: status.to_string(),
            });
        }

        self.status = status;
        self.updated_at = now;
        Ok(())
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.lines.len()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
