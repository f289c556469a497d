//! # cuenta-core: Pure Business Logic for Cuenta POS
//!
//! The cart, open-account and money engine. Every function here is pure:
//! the crate declares the store ports but never implements them.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cuenta POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              cuenta-checkout (session + workflows)              │   │
//! │  │   add_product, save_as_account, add_to_account, finalize_sale  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ cuenta-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌───────────┐ ┌────────┐ │   │
//! │  │   │  money  │ │  cart   │ │ account │ │ reconcile │ │ settle │ │   │
//! │  │   │  Money  │ │  Cart   │ │ Account │ │  merge    │ │ change │ │   │
//! │  │   │  IVA    │ │ Totals  │ │ status  │ │  replace  │ │ remain │ │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └───────────┘ └────────┘ │   │
//! │  │                                                                 │   │
//! │  │   ports: ProductCatalog • CustomerDirectory • AccountStore •   │   │
//! │  │          SaleStore  (traits only)                               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │ implemented by                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 cuenta-db (SQLite repositories)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Exact decimal Money, half-up rounding to cents
//! - [`line`] - Line items and the totals rule shared by carts and accounts
//! - [`cart`] - The in-progress sale
//! - [`account`] - Open accounts (cuentas) and their status
//! - [`reconcile`] - Merge/replace a cart into an account, `CartMode`
//! - [`settlement`] - Split payments, remaining balance, change
//! - [`types`] - Product, Customer, Payment, Sale, TaxRate
//! - [`ports`] - Async store traits
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input, same output; ids and clocks are passed in
//! 2. **No I/O**: database and network access live behind [`ports`]
//! 3. **Decimal Money**: `rust_decimal`, never `f64`, for every amount
//! 4. **Explicit Errors**: all errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use cuenta_core::{Cart, Money, Product};
//!
//! let torta = Product {
//!     id: "torta".into(),
//!     name: "Torta de milanesa".into(),
//!     sale_price: Money::from_major(100),
//!     applies_tax: true,
//!     available_stock: None,
//!     is_active: true,
//! };
//!
//! let mut cart = Cart::new();
//! cart.add_product(&torta, 1).unwrap();
//! cart.apply_discount(Money::from_major(20)).unwrap();
//!
//! // IVA is charged on the discounted taxable base: (100 - 20) × 16%
//! assert_eq!(cart.tax().to_fixed_string(), "12.80");
//! assert_eq!(cart.total().to_display_string(), "$92.80");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod account;
pub mod cart;
pub mod error;
pub mod line;
pub mod money;
pub mod ports;
pub mod reconcile;
pub mod settlement;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use cuenta_core::Money` instead of
// `use cuenta_core::money::Money`

pub use account::{Account, AccountStatus};
pub use cart::Cart;
pub use error::{CoreError, CoreResult, StoreError, StoreResult, ValidationError};
pub use line::{LineItem, Totals};
pub use money::Money;
pub use ports::{AccountFilter, AccountStore, CustomerDirectory, ProductCatalog, SaleStore};
pub use reconcile::CartMode;
pub use settlement::SettlementSummary;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// ISO 4217 code of the only currency handled.
pub const CURRENCY_CODE: &str = "MXN";

/// Maximum characters in an account name.
///
/// ## Business Reason
/// The name is printed on the open-accounts board and on kitchen tickets.
pub const MAX_ACCOUNT_NAME_LEN: usize = 80;

/// Maximum characters in cart/account notes.
pub const MAX_NOTES_LEN: usize = 500;

/// Largest quantity one line may hold.
pub const MAX_LINE_QUANTITY: i64 = 100_000;

/// Largest amount, in whole pesos, accepted as a price, discount or payment.
///
/// With [`MAX_LINE_QUANTITY`] this keeps every derived figure many orders of
/// magnitude below the `Decimal` range, so `Money` arithmetic cannot overflow
/// on validated input.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;
