//! # Store Handles
//!
//! The four ports a checkout talks to, as shared trait objects.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Stores                                                          │
//! │   products:  Arc<dyn ProductCatalog>    ─┐                      │
//! │   customers: Arc<dyn CustomerDirectory> ─┼─► MemoryStore        │
//! │   accounts:  Arc<dyn AccountStore>      ─┤      or               │
//! │   sales:     Arc<dyn SaleStore>         ─┘   cuenta-db repos    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use cuenta_core::{AccountStore, CustomerDirectory, ProductCatalog, SaleStore};
use cuenta_db::Database;

use crate::memory::MemoryStore;

#[derive(Clone)]
pub struct Stores {
    pub products: Arc<dyn ProductCatalog>,
    pub customers: Arc<dyn CustomerDirectory>,
    pub accounts: Arc<dyn AccountStore>,
    pub sales: Arc<dyn SaleStore>,
}

impl Stores {
    /// Every port served by one in-memory store.
    pub fn in_memory(store: MemoryStore) -> Self {
        Stores {
            products: Arc::new(store.clone()),
            customers: Arc::new(store.clone()),
            accounts: Arc::new(store.clone()),
            sales: Arc::new(store),
        }
    }

    /// Every port served by the SQLite repositories of `db`.
    pub fn from_database(db: &Database) -> Self {
        Stores {
            products: Arc::new(db.products()),
            customers: Arc::new(db.customers()),
            accounts: Arc::new(db.accounts()),
            sales: Arc::new(db.sales()),
        }
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}
