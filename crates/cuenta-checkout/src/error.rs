//! # Checkout Error Type
//!
//! Unified error type for the checkout workflows, plus the serializable
//! `ErrorResponse` a request-handler layer sends to the register UI.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Cuenta POS                             │
//! │                                                                         │
//! │  Workflow (Checkout::*)                                                 │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Business rule? ─── CoreError::EmptyCart ────────► CheckoutError::Core  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Store call?  ───── StoreError::Conflict ───────► ConcurrentModification│
//! │               ───── StoreError::Backend ────────► PersistenceFailure    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ErrorResponse { code: "CART_ERROR", message: "Cart is empty" }         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use thiserror::Error;

use cuenta_core::{CoreError, StoreError};

/// Errors returned by checkout workflows.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckoutError {
    /// A business rule rejected the operation. Nothing was changed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A store call failed. Session state is as it was before the call.
    #[error("Persistence failed: {0}")]
    PersistenceFailure(StoreError),

    /// The account changed in storage after it was read.
    ///
    /// ## Recovery
    /// Reload the account (or the open-accounts list) and redo the change.
    #[error("Account {account_id} was modified by another session")]
    ConcurrentModification { account_id: String },

    /// A finalization is running for this session.
    #[error("A sale is being finalized, try again when it completes")]
    FinalizationInProgress,

    /// An account write (save, merge, commit, cancel) is running for this
    /// session.
    #[error("An account is being saved, try again when it completes")]
    AccountWriteInProgress,

    /// The sale was recorded but the account it settled could not be
    /// closed. The account must be closed by hand.
    #[error("Sale {sale_id} was recorded but account {account_id} could not be closed: {source}")]
    AccountCloseFailed {
        sale_id: String,
        account_id: String,
        #[source]
        source: StoreError,
    },
}

impl From<StoreError> for CheckoutError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { id, .. } => CheckoutError::ConcurrentModification { account_id: id },
            other => CheckoutError::PersistenceFailure(other),
        }
    }
}

/// Convenience type alias for checkout Results.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

// =============================================================================
// Error Codes
// =============================================================================

/// Machine-readable error codes.
///
/// ## Usage in the register UI
/// ```typescript
/// switch (e.code) {
///   case 'PAYMENT_ERROR':
///     keepTenderDialogOpen(e.message);
///     break;
///   case 'CONFLICT':
///     reloadAccounts();
///     break;
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Product, customer or account not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Operation not allowed in the current state (422)
    BusinessLogic,

    /// Cart operation failed (empty cart)
    CartError,

    /// Insufficient stock
    InsufficientStock,

    /// Payments do not cover the total
    PaymentError,

    /// Account version mismatch (409)
    Conflict,

    /// Another finalization is running (409)
    FinalizationInProgress,

    /// An account write is running (409)
    AccountWriteInProgress,

    /// Sale recorded, account left open
    AccountCloseFailed,

    /// Store backend failed (500)
    DatabaseError,
}

impl CheckoutError {
    /// The code sent alongside the message.
    pub fn code(&self) -> ErrorCode {
        match self {
            CheckoutError::Core(err) => match err {
                CoreError::ProductNotFound(_)
                | CoreError::AccountNotFound(_)
                | CoreError::CustomerNotFound(_) => ErrorCode::NotFound,
                CoreError::InvalidQuantity(_)
                | CoreError::InvalidAmount { .. }
                | CoreError::DivisionByZero
                | CoreError::Validation(_) => ErrorCode::ValidationError,
                CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
                CoreError::InsufficientPayment { .. } => ErrorCode::PaymentError,
                CoreError::EmptyCart => ErrorCode::CartError,
                CoreError::ModeMismatch { .. } | CoreError::InvalidAccountStatus { .. } => {
                    ErrorCode::BusinessLogic
                }
            },
            CheckoutError::PersistenceFailure(StoreError::NotFound { .. }) => ErrorCode::NotFound,
            CheckoutError::PersistenceFailure(_) => ErrorCode::DatabaseError,
            CheckoutError::ConcurrentModification { .. } => ErrorCode::Conflict,
            CheckoutError::FinalizationInProgress => ErrorCode::FinalizationInProgress,
            CheckoutError::AccountWriteInProgress => ErrorCode::AccountWriteInProgress,
            CheckoutError::AccountCloseFailed { .. } => ErrorCode::AccountCloseFailed,
        }
    }
}

// =============================================================================
// Error Response
// =============================================================================

/// What the UI receives when a workflow fails:
/// ```json
/// {
///   "code": "NOT_FOUND",
///   "message": "Product not found: COCA-600"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&CheckoutError> for ErrorResponse {
    fn from(err: &CheckoutError) -> Self {
        let message = match err {
            // Backend details go to the log, not to the register screen
            CheckoutError::PersistenceFailure(StoreError::Backend(detail)) => {
                tracing::error!("Store backend failed: {}", detail);
                "Database operation failed".to_string()
            }
            other => other.to_string(),
        };

        ErrorResponse {
            code: err.code(),
            message,
        }
    }
}

impl From<CheckoutError> for ErrorResponse {
    fn from(err: CheckoutError) -> Self {
        ErrorResponse::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuenta_core::{Money, ValidationError};

    #[test]
    fn test_store_conflict_becomes_concurrent_modification() {
        let err = CheckoutError::from(StoreError::Conflict {
            id: "acc-1".to_string(),
            expected: 2,
            found: Some(3),
        });
        assert_eq!(
            err,
            CheckoutError::ConcurrentModification {
                account_id: "acc-1".to_string()
            }
        );
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[test]
    fn test_codes() {
        assert_eq!(
            CheckoutError::from(CoreError::EmptyCart).code(),
            ErrorCode::CartError
        );
        assert_eq!(
            CheckoutError::from(CoreError::InsufficientPayment {
                remaining: Money::from_major(10)
            })
            .code(),
            ErrorCode::PaymentError
        );
        assert_eq!(
            CheckoutError::from(CoreError::Validation(ValidationError::Required {
                field: "name".to_string()
            }))
            .code(),
            ErrorCode::ValidationError
        );
        assert_eq!(
            CheckoutError::from(StoreError::not_found("Account", "x")).code(),
            ErrorCode::NotFound
        );
    }

    #[test]
    fn test_response_serialization() {
        let response = ErrorResponse::from(CheckoutError::FinalizationInProgress);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["code"], "FINALIZATION_IN_PROGRESS");

        let json =
            serde_json::to_value(ErrorResponse::from(CheckoutError::AccountWriteInProgress))
                .unwrap();
        assert_eq!(json["code"], "ACCOUNT_WRITE_IN_PROGRESS");

        let response =
            ErrorResponse::from(CheckoutError::PersistenceFailure(StoreError::Backend(
                "disk I/O error".to_string(),
            )));
        assert_eq!(response.code, ErrorCode::DatabaseError);
        assert_eq!(response.message, "Database operation failed");
    }
}
