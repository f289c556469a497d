//! # Repository Module
//!
//! SQLite implementations of the cuenta-core store ports.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  cuenta-checkout                                                       │
//! │       │                                                                 │
//! │       │  stores.accounts.save(&account)   (Arc<dyn AccountStore>)      │
//! │       ▼                                                                 │
//! │  AccountRepository                                                     │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── list(&self, filter)                                               │
//! │  ├── save(&self, account)      version check + lines, one transaction  │
//! │  └── delete(&self, id)                                                 │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Catalog lookups, stock
//! - [`CustomerRepository`] - Customer directory
//! - [`AccountRepository`] - Open accounts with optimistic versioning
//! - [`SaleRepository`] - Sales with items and payments
//!
//! Money columns are TEXT. The helpers below turn them back into `Money`
//! and report unreadable values as `DbError::CorruptValue`.

pub mod account;
pub mod customer;
pub mod product;
pub mod sale;

pub use account::AccountRepository;
pub use customer::CustomerRepository;
pub use product::ProductRepository;
pub use sale::SaleRepository;

use cuenta_core::{LineItem, Money, TaxRate};

use crate::error::{DbError, DbResult};

/// Writes a money column: the exact decimal, no rounding, no symbol.
pub(crate) fn money_text(money: Money) -> String {
    money.amount().to_string()
}

/// Reads a money column.
pub(crate) fn parse_money(column: &str, value: &str) -> DbResult<Money> {
    value
        .parse::<Money>()
        .map_err(|_| DbError::corrupt(column, value))
}

/// Reads a tax rate column (percent).
pub(crate) fn parse_tax_rate(column: &str, value: &str) -> DbResult<TaxRate> {
    value
        .parse::<TaxRate>()
        .map_err(|_| DbError::corrupt(column, value))
}

/// Row shape shared by `account_lines` and `sale_items`.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct LineRow {
    pub product_id: String,
    pub name: String,
    pub unit_price: String,
    pub applies_tax: bool,
    pub quantity: i64,
}

impl LineRow {
    pub(crate) fn into_line(self) -> DbResult<LineItem> {
        Ok(LineItem {
            unit_price: parse_money("unit_price", &self.unit_price)?,
            product_id: self.product_id,
            name: self.name,
            applies_tax: self.applies_tax,
            quantity: self.quantity,
        })
    }
}
