//! # Error Types
//!
//! Domain-specific error types for cuenta-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cuenta-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── StoreError       - What a store port reports back                 │
//! │                                                                         │
//! │  cuenta-db errors (separate crate)                                     │
//! │  └── DbError          - SQLite failures, converted into StoreError     │
//! │                                                                         │
//! │  cuenta-checkout errors                                                │
//! │  └── CheckoutError    - What a request handler sees (with ErrorCode)   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                  │
//! │        DbError → StoreError ────────┴──► CheckoutError                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product id, remaining balance)
//! 3. A validation error never leaves a cart or account half-modified

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Quantity ≤ 0 passed to an operation that requires a positive quantity.
    #[error("Quantity must be greater than zero, got {0}")]
    InvalidQuantity(i64),

    /// Product id does not resolve (catalog lookup or cart line).
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Account id does not resolve through the account store.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Customer id does not resolve through the customer directory.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Finalization attempted while a balance is still due.
    ///
    /// ## User Workflow
    /// ```text
    /// Total $100.00, tendered $90.00
    ///      │
    ///      ▼
    /// finalize ──► InsufficientPayment { remaining: $10.00 }
    ///      │
    ///      ▼
    /// UI keeps the tender dialog open and asks for another payment
    /// ```
    #[error("Insufficient payment: {remaining} still due")]
    InsufficientPayment { remaining: Money },

    /// Operation requires at least one line item.
    #[error("Cart is empty")]
    EmptyCart,

    /// Money division by zero.
    #[error("Division by zero")]
    DivisionByZero,

    /// Text or float that cannot become a Money value.
    #[error("Invalid amount '{input}': {reason}")]
    InvalidAmount { input: String, reason: String },

    /// Stock check failed (only when the caller opts into stock enforcement).
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Merge requested while editing an account, or replace requested for a
    /// cart that was not loaded from that account.
    #[error("Cannot {operation} while the cart is {mode}")]
    ModeMismatch {
        operation: &'static str,
        mode: String,
    },

    /// Account status transition not allowed (only open accounts change).
    #[error("Account {account_id} is {status}, expected open")]
    InvalidAccountStatus { account_id: String, status: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidAmount error.
    pub fn invalid_amount(input: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::InvalidAmount {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    Negative { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
    },
}

// =============================================================================
// Store Error
// =============================================================================

/// Failure reported by a store port implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The entity vanished between read and write.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Optimistic concurrency check failed.
    ///
    /// ## When This Occurs
    /// ```text
    /// Session A loads account v3 ─┐
    /// Session B loads account v3 ─┤
    /// Session B saves   → v4      │
    /// Session A saves v3 → Conflict { expected: 3, found: Some(4) }
    /// ```
    #[error("Account {id} was modified concurrently (expected version {expected}, found {found:?})")]
    Conflict {
        id: String,
        expected: i64,
        found: Option<i64>,
    },

    /// Anything else the backend reports (connection, query, corruption).
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type for store port calls.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
