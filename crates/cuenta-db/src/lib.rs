//! # cuenta-db: Database Layer for Cuenta POS
//!
//! SQLite implementations of the store ports declared in cuenta-core.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cuenta POS Data Flow                             │
//! │                                                                         │
//! │  Checkout workflow (finalize_sale)                                     │
//! │       │  Arc<dyn SaleStore>, Arc<dyn AccountStore>, ...                │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     cuenta-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo    │    │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │◄───│ CustomerRepo   │    │ _schema.sql  │  │   │
//! │  │   │ WAL, FK on    │    │ AccountRepo    │    │              │  │   │
//! │  │   │               │    │ SaleRepo       │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (CUENTA_DB_PATH)                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types, mapping into `StoreError`
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cuenta_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("cuenta.db")).await?;
//!
//! let accounts = db.accounts().list(&AccountFilter::all()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{AccountRepository, CustomerRepository, ProductRepository, SaleRepository};
