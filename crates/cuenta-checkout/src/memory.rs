//! # In-Memory Store
//!
//! Process-local implementation of every store port, for tests, demos and
//! single-register setups that do not need a database file.
//!
//! Behaves like the SQLite repositories where it matters to the workflows:
//! - account saves and deletes are version checked (insert at 0 → 1,
//!   update n → n+1)
//! - recording a sale decrements tracked stock
//! - `list` returns open accounts, most recently updated first
//! - receipt numbers follow `YYYYMMDD-NNNN`
//!
//! State lives in a `HashMap` per entity behind one `tokio::sync::Mutex`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use cuenta_core::{
    Account, AccountFilter, AccountStore, Customer, CustomerDirectory, NewSale, Product,
    ProductCatalog, Sale, SaleStore, StoreError, StoreResult,
};

#[derive(Debug, Default)]
struct MemoryData {
    products: HashMap<String, Product>,
    customers: HashMap<String, Customer>,
    accounts: HashMap<String, Account>,
    sales: Vec<Sale>,
}

/// Cloneable handle; clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<MemoryData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a catalog product.
    pub async fn insert_product(&self, product: Product) {
        self.data
            .lock()
            .await
            .products
            .insert(product.id.clone(), product);
    }

    /// Adds or replaces a customer.
    pub async fn insert_customer(&self, customer: Customer) {
        self.data
            .lock()
            .await
            .customers
            .insert(customer.id.clone(), customer);
    }

    /// Recorded sales, oldest first.
    pub async fn sales(&self) -> Vec<Sale> {
        self.data.lock().await.sales.clone()
    }

    /// Number of stored accounts, open or not.
    pub async fn account_count(&self) -> usize {
        self.data.lock().await.accounts.len()
    }
}

#[async_trait]
impl ProductCatalog for MemoryStore {
    async fn get(&self, product_id: &str) -> StoreResult<Option<Product>> {
        Ok(self.data.lock().await.products.get(product_id).cloned())
    }
}

#[async_trait]
impl CustomerDirectory for MemoryStore {
    async fn get(&self, customer_id: &str) -> StoreResult<Option<Customer>> {
        Ok(self.data.lock().await.customers.get(customer_id).cloned())
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn get(&self, account_id: &str) -> StoreResult<Option<Account>> {
        Ok(self.data.lock().await.accounts.get(account_id).cloned())
    }

    async fn list(&self, filter: &AccountFilter) -> StoreResult<Vec<Account>> {
        let data = self.data.lock().await;

        let mut accounts: Vec<Account> = data
            .accounts
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        accounts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        if let Some(limit) = filter.limit {
            accounts.truncate(limit as usize);
        }
        Ok(accounts)
    }

    async fn save(&self, account: &Account) -> StoreResult<Account> {
        let mut data = self.data.lock().await;
        let stored = data.accounts.get(&account.id).map(|a| a.version);

        let version = match stored {
            None if account.version == 0 => 1,
            Some(version) if version == account.version => version + 1,
            found => {
                return Err(StoreError::Conflict {
                    id: account.id.clone(),
                    expected: account.version,
                    found,
                })
            }
        };

        let mut saved = account.clone();
        saved.version = version;
        saved.updated_at = Utc::now();
        data.accounts.insert(saved.id.clone(), saved.clone());

        debug!(id = %saved.id, version, "Account saved (memory)");
        Ok(saved)
    }

    async fn delete(&self, account_id: &str, expected_version: i64) -> StoreResult<()> {
        let mut data = self.data.lock().await;
        match data.accounts.get(account_id).map(|a| a.version) {
            None => Err(StoreError::not_found("Account", account_id)),
            Some(version) if version == expected_version => {
                data.accounts.remove(account_id);
                Ok(())
            }
            found => Err(StoreError::Conflict {
                id: account_id.to_string(),
                expected: expected_version,
                found,
            }),
        }
    }
}

#[async_trait]
impl SaleStore for MemoryStore {
    async fn create(&self, sale: &NewSale) -> StoreResult<Sale> {
        let mut data = self.data.lock().await;
        let now = Utc::now();

        let date_part = now.format("%Y%m%d").to_string();
        let prefix = format!("{date_part}-");
        let issued = data
            .sales
            .iter()
            .filter(|s| s.receipt_number.starts_with(&prefix))
            .count();
        let receipt_number = format!("{}-{:04}", date_part, issued + 1);

        let recorded = Sale::from_new(
            sale.clone(),
            Uuid::new_v4().to_string(),
            receipt_number,
            now,
        );
        data.sales.push(recorded.clone());

        for line in &sale.lines {
            if let Some(stock) = data
                .products
                .get_mut(&line.product_id)
                .and_then(|p| p.available_stock.as_mut())
            {
                *stock -= line.quantity;
            }
        }

        debug!(id = %recorded.id, receipt_number = %recorded.receipt_number, "Sale recorded (memory)");
        Ok(recorded)
    }
}
