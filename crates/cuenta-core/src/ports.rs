//! # Store Ports
//!
//! The collaborators the checkout layer talks to. Declarations only: this
//! crate never performs I/O, the implementations live elsewhere.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Port                Implementations                                    │
//! │  ────                ───────────────                                    │
//! │  ProductCatalog      cuenta_db::ProductRepository,  MemoryStore         │
//! │  CustomerDirectory   cuenta_db::CustomerRepository, MemoryStore         │
//! │  AccountStore        cuenta_db::AccountRepository,  MemoryStore         │
//! │  SaleStore           cuenta_db::SaleRepository,     MemoryStore         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All ports are `Send + Sync` so they can sit behind an `Arc<dyn _>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::error::StoreResult;
use crate::types::{Customer, NewSale, Product, Sale};

/// Product lookup by id.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn get(&self, product_id: &str) -> StoreResult<Option<Product>>;
}

/// Customer lookup by id.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn get(&self, customer_id: &str) -> StoreResult<Option<Customer>>;
}

/// Persistence for open accounts.
///
/// ## Versioning Contract
/// `save` compares `account.version` with the stored version:
/// - no stored row and version 0: insert, returned with version 1
/// - versions equal: overwrite, returned with version + 1
/// - anything else: `StoreError::Conflict`, nothing written
///
/// `delete` follows the same rule: it only removes the account if the stored
/// version still equals `expected_version`.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get(&self, account_id: &str) -> StoreResult<Option<Account>>;

    /// Open accounts matching the filter, most recently updated first.
    async fn list(&self, filter: &AccountFilter) -> StoreResult<Vec<Account>>;

    async fn save(&self, account: &Account) -> StoreResult<Account>;

    /// Removes an account at `expected_version`.
    ///
    /// `NotFound` if it does not exist, `Conflict` if it changed since it was
    /// read.
    async fn delete(&self, account_id: &str, expected_version: i64) -> StoreResult<()>;
}

/// Persistence for completed sales.
#[async_trait]
pub trait SaleStore: Send + Sync {
    /// Records the sale with its lines and payments in one unit of work,
    /// decrementing the tracked stock (`available_stock` not `None`) of
    /// every product sold. The store assigns id, receipt number and
    /// timestamp.
    async fn create(&self, sale: &NewSale) -> StoreResult<Sale>;
}

// =============================================================================
// Account Filter
// =============================================================================

/// Query for the open-accounts list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountFilter {
    /// Case-insensitive substring of the account name.
    pub name_contains: Option<String>,
    pub customer_id: Option<String>,
    pub limit: Option<u32>,
}

impl AccountFilter {
    /// All open accounts.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn named(text: impl Into<String>) -> Self {
        AccountFilter {
            name_contains: Some(text.into()),
            ..Self::default()
        }
    }

    /// Whether an account passes the name and customer conditions.
    /// `limit` is applied by the caller.
    pub fn matches(&self, account: &Account) -> bool {
        let name_ok = match &self.name_contains {
            Some(text) => account
                .name
                .to_lowercase()
                .contains(&text.trim().to_lowercase()),
            None => true,
        };
        let customer_ok = match &self.customer_id {
            Some(id) => account.customer.as_ref().is_some_and(|c| &c.id == id),
            None => true,
        };
        account.is_open() && name_ok && customer_ok
    }
}
