//! # cuenta-checkout: Register Sessions for Cuenta POS
//!
//! Sequences the pure cart, account and settlement logic of cuenta-core with
//! the store ports, one register session at a time.
//!
//! ## Module Organization
//! ```text
//! cuenta_checkout/
//! ├── lib.rs          ◄─── You are here (exports, logging setup)
//! ├── config.rs       ◄─── CheckoutConfig from CUENTA_* variables
//! ├── error.rs        ◄─── CheckoutError, ErrorCode, ErrorResponse
//! ├── session.rs      ◄─── Session cart + mode + payments, write guard
//! ├── stores.rs       ◄─── Arc<dyn Port> handles
//! ├── memory.rs       ◄─── In-memory implementation of every port
//! └── checkout/
//!     ├── mod.rs      ◄─── Checkout (one session)
//!     ├── cart.rs     ◄─── Cart workflows
//!     ├── account.rs  ◄─── Open-account workflows (merge / replace)
//!     └── sale.rs     ◄─── Payments and finalize_sale
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use cuenta_checkout::{init_tracing, Checkout, CheckoutConfig};
//! use cuenta_core::{Money, PaymentMethod};
//!
//! init_tracing();
//! let (checkout, _db) = Checkout::connect(CheckoutConfig::from_env()).await?;
//!
//! checkout.add_product("COCA-600", 2).await?;
//! checkout.add_payment(PaymentMethod::Cash, Money::from_major(50), None)?;
//! let finalized = checkout.finalize_sale().await?;
//! println!("Folio {} cambio {}", finalized.sale.receipt_number, finalized.change);
//! ```

pub mod checkout;
pub mod config;
pub mod error;
pub mod memory;
pub mod session;
pub mod stores;

pub use checkout::{Checkout, FinalizedSale};
pub use config::CheckoutConfig;
pub use error::{CheckoutError, CheckoutResult, ErrorCode, ErrorResponse};
pub use memory::MemoryStore;
pub use session::{PendingWrite, SessionHandle, SessionState, WriteGuard};
pub use stores::Stores;

use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=cuenta_checkout=trace` - Trace this crate only
/// - Default: INFO, with debug for the cuenta crates
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cuenta=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
