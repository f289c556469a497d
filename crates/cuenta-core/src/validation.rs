//! # Validation Module
//!
//! Input validation for values that enter the cart, accounts and settlement.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request handler                                              │
//! │  └── Deserialization (types, required JSON fields)                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Business rule validation, before any state is touched             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  └── NOT NULL / CHECK / foreign key constraints                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_ACCOUNT_NAME_LEN, MAX_AMOUNT, MAX_LINE_QUANTITY, MAX_NOTES_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates the display name of an open account.
///
/// ## Returns
/// The trimmed name.
///
/// ```rust
/// use cuenta_core::validation::validate_account_name;
///
/// assert_eq!(validate_account_name("  Mesa 4 ").unwrap(), "Mesa 4");
/// assert!(validate_account_name("   ").is_err());
/// ```
pub fn validate_account_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "account name".to_string(),
        });
    }

    if name.chars().count() > MAX_ACCOUNT_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "account name".to_string(),
            max: MAX_ACCOUNT_NAME_LEN,
        });
    }

    Ok(name.to_string())
}

/// Validates free-text notes. Blank notes become `None`.
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    if notes.chars().count() > MAX_NOTES_LEN {
        return Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LEN,
        });
    }

    Ok(Some(notes.to_string()))
}

// =============================================================================
// Money Validators
// =============================================================================

/// Rejects amounts whose magnitude exceeds [`MAX_AMOUNT`] pesos.
pub fn validate_amount_limit(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.abs() > Money::from_major(MAX_AMOUNT) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: format!("-{MAX_AMOUNT}"),
            max: MAX_AMOUNT.to_string(),
        });
    }

    Ok(())
}

/// Validates a flat discount.
///
/// ## Rules
/// - Must not be negative
/// - At most [`MAX_AMOUNT`]
/// - NOT checked against the subtotal (caller responsibility)
pub fn validate_discount(discount: Money) -> ValidationResult<()> {
    if discount.is_negative() {
        return Err(ValidationError::Negative {
            field: "discount".to_string(),
        });
    }

    validate_amount_limit("discount", discount)
}

/// Validates a tendered payment amount.
///
/// ## Rules
/// - Must be positive (> 0)
/// - At most [`MAX_AMOUNT`]
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    validate_amount_limit("payment amount", amount)
}

/// Upper bound for a line quantity. Positivity is checked by the caller,
/// which reports it as `InvalidQuantity`.
pub fn validate_quantity_limit(quantity: i64) -> ValidationResult<()> {
    if quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: "1".to_string(),
            max: MAX_LINE_QUANTITY.to_string(),
        });
    }

    Ok(())
}

/// Validates a tax rate percentage (0 to 100 inclusive).
pub fn validate_tax_rate(percent: Decimal) -> ValidationResult<()> {
    if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: "tax rate".to_string(),
            min: "0".to_string(),
            max: "100".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
