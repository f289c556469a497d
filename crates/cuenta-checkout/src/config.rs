//! # Checkout Configuration
//!
//! Settings loaded once at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`CUENTA_*`)
//! 2. Defaults (this file)
//!
//! ## Thread Safety
//! Configuration is read-only after initialization and shared behind an
//! `Arc`, so no mutex is needed.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use cuenta_core::{TaxRate, CURRENCY_CODE};
use cuenta_db::DbConfig;

/// Checkout configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutConfig {
    /// Store name (printed on receipts)
    pub store_name: String,

    /// Currency code (ISO 4217)
    pub currency_code: String,

    /// Rate applied to taxable lines of new carts.
    pub tax_rate: TaxRate,

    /// Reject adds that exceed tracked stock.
    /// Default: false (the counter sells what is physically there)
    pub enforce_stock: bool,

    /// SQLite file. `None` means an in-memory database.
    pub db_path: Option<PathBuf>,
}

impl Default for CheckoutConfig {
    /// ## Default Values
    /// - Store: "Cuenta POS"
    /// - Currency: MXN
    /// - Tax: IVA 16%
    /// - Stock: not enforced
    /// - Database: in memory
    fn default() -> Self {
        CheckoutConfig {
            store_name: "Cuenta POS".to_string(),
            currency_code: CURRENCY_CODE.to_string(),
            tax_rate: TaxRate::IVA,
            enforce_stock: false,
            db_path: None,
        }
    }
}

impl CheckoutConfig {
    /// Creates a config from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `CUENTA_STORE_NAME`: Override store name
    /// - `CUENTA_TAX_RATE`: Override tax rate in percent (e.g., "8" or "16")
    /// - `CUENTA_ENFORCE_STOCK`: `true`/`1`/`yes` to enforce tracked stock
    /// - `CUENTA_DB_PATH`: SQLite database file
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary key lookup.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = CheckoutConfig::default();

        if let Some(store_name) = lookup("CUENTA_STORE_NAME") {
            config.store_name = store_name;
        }

        if let Some(raw) = lookup("CUENTA_TAX_RATE") {
            match raw.parse::<TaxRate>() {
                Ok(rate) => config.tax_rate = rate,
                Err(e) => warn!(value = %raw, error = %e, "Ignoring invalid CUENTA_TAX_RATE"),
            }
        }

        if let Some(raw) = lookup("CUENTA_ENFORCE_STOCK") {
            match parse_flag(&raw) {
                Some(flag) => config.enforce_stock = flag,
                None => warn!(value = %raw, "Ignoring invalid CUENTA_ENFORCE_STOCK"),
            }
        }

        if let Some(path) = lookup("CUENTA_DB_PATH").filter(|p| !p.trim().is_empty()) {
            config.db_path = Some(PathBuf::from(path));
        }

        config
    }

    /// Pool configuration for the configured database.
    pub fn db_config(&self) -> DbConfig {
        match &self.db_path {
            Some(path) => DbConfig::new(path.clone()),
            None => DbConfig::in_memory(),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
