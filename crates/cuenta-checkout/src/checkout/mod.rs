//! # Checkout Workflows
//!
//! `Checkout` is one register session: the session cart plus handles to the
//! stores. Each workflow validates, calls the pure functions of
//! cuenta-core, and persists through the ports.
//!
//! ## Workflow Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Register Session                                     │
//! │                                                                         │
//! │   cart.rs                account.rs                 sale.rs             │
//! │   ───────                ──────────                 ───────             │
//! │   add_product            save_as_account ─► new     add_payment         │
//! │   update_quantity        add_to_account  ─► merge   clear_payments      │
//! │   remove_item            load_account_for_editing   settlement          │
//! │   apply_discount         commit_account_edit ─► replace                 │
//! │   set_customer           cancel_account_editing     finalize_sale       │
//! │   set_notes              list_open_accounts                             │
//! │   cancel_sale            cancel_account                                 │
//! │                                                                         │
//! │  Every workflow that changes the session is refused while a store      │
//! │  write is pending: finalize_sale, or an account save, merge, commit   │
//! │  or cancel. The error names the pending write.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod account;
mod cart;
mod sale;

pub use sale::FinalizedSale;

use std::sync::Arc;

use tracing::info;

use cuenta_core::{Cart, CartMode, Payment, StoreError};
use cuenta_db::Database;

use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, CheckoutResult};
use crate::session::{SessionHandle, SessionState};
use crate::stores::Stores;

/// One register session.
///
/// Cloning gives another handle to the same session.
#[derive(Debug, Clone)]
pub struct Checkout {
    session: SessionHandle,
    stores: Stores,
    config: Arc<CheckoutConfig>,
}

impl Checkout {
    /// Creates a session over the given stores.
    pub fn new(stores: Stores, config: CheckoutConfig) -> Self {
        Checkout {
            session: SessionHandle::new(config.tax_rate),
            stores,
            config: Arc::new(config),
        }
    }

    /// Opens the configured SQLite database and creates a session over it.
    ///
    /// ## Startup Sequence
    /// 1. Connect (file from `db_path`, in memory otherwise)
    /// 2. Run pending migrations
    /// 3. Wire the repositories as stores
    pub async fn connect(config: CheckoutConfig) -> CheckoutResult<(Self, Database)> {
        let db = Database::new(config.db_config())
            .await
            .map_err(|e| CheckoutError::PersistenceFailure(StoreError::from(e)))?;

        info!(store = %config.store_name, tax_rate = %config.tax_rate, "Checkout connected");

        let stores = Stores::from_database(&db);
        Ok((Checkout::new(stores, config), db))
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Copy of the whole session state.
    pub fn state(&self) -> SessionState {
        self.session.with_session(SessionState::clone)
    }

    /// Copy of the current cart.
    pub fn cart(&self) -> Cart {
        self.session.with_session(|s| s.cart.clone())
    }

    pub fn mode(&self) -> CartMode {
        self.session.with_session(|s| s.mode.clone())
    }

    pub fn payments(&self) -> Vec<Payment> {
        self.session.with_session(|s| s.payments.clone())
    }

    /// Fails fast before store I/O when a write is pending.
    fn ensure_idle(&self) -> CheckoutResult<()> {
        self.session.with_session(SessionState::ensure_idle)
    }
}
