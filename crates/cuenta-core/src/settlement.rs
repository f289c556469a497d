//! # Payment Settlement
//!
//! Tracks tendered payments against a target total. Supports split payments
//! (part cash, part card) and computes change.
//!
//! ## Settlement Math
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  tendered  = Σ payment.amount                                           │
//! │  remaining = target − tendered          (negative when overpaid)        │
//! │  change    = max(0, tendered − target)                                  │
//! │  complete  ⇔ remaining ≤ 0                                              │
//! │                                                                         │
//! │  Example: target $100.00                                                │
//! │    [cash $60, card $30]        → remaining $10.00, not complete         │
//! │    [cash $60, card $30, $10]   → remaining $0.00, change $0.00          │
//! │    [cash $150]                 → change $50.00                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Change is only meaningful for cash, but it is computed over the whole
//! tendered amount: the UI decides how to hand it back.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::validation::validate_payment_amount;

pub use crate::types::{Payment, PaymentMethod};

/// Appends a payment, returning the new list.
///
/// ## Reference
/// Non-cash payments without a reference get one generated as
/// `<METHOD>-<8 hex chars>` (e.g. `CARD-9f1c2a7b`). Cash keeps whatever the
/// caller passed, usually nothing.
///
/// ## Errors
/// `Validation` if `amount <= 0`. The input list is never modified.
pub fn add_payment(
    payments: &[Payment],
    method: PaymentMethod,
    amount: Money,
    reference: Option<String>,
) -> CoreResult<Vec<Payment>> {
    validate_payment_amount(amount)?;

    let reference = reference
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .or_else(|| (!method.is_cash()).then(|| generate_reference(&method)));

    let mut next = payments.to_vec();
    next.push(Payment {
        method,
        amount,
        reference,
    });
    Ok(next)
}

/// Generates a short reference for a non-cash payment.
pub fn generate_reference(method: &PaymentMethod) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}-{}", method.as_str().to_uppercase(), &id[..8])
}

/// Sum of all tendered amounts.
pub fn total_tendered(payments: &[Payment]) -> Money {
    payments.iter().map(|p| p.amount).sum()
}

/// Amount still due. Negative when overpaid.
pub fn remaining(target: Money, payments: &[Payment]) -> Money {
    target - total_tendered(payments)
}

/// Change owed back to the customer, never negative.
pub fn change(target: Money, payments: &[Payment]) -> Money {
    (total_tendered(payments) - target).floor_at_zero()
}

/// True once the tendered amount covers the target.
pub fn is_complete(target: Money, payments: &[Payment]) -> bool {
    !remaining(target, payments).is_positive()
}

/// Fails with `InsufficientPayment` while a balance is still due.
pub fn ensure_complete(target: Money, payments: &[Payment]) -> CoreResult<()> {
    let remaining = remaining(target, payments);
    if remaining.is_positive() {
        return Err(CoreError::InsufficientPayment {
            remaining: remaining.round_currency(),
        });
    }
    Ok(())
}

// =============================================================================
// Summary
// =============================================================================

/// Snapshot of a settlement, for the tender dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementSummary {
    pub target: Money,
    pub tendered: Money,
    /// Signed: negative when overpaid.
    pub remaining: Money,
    pub change: Money,
    pub is_complete: bool,
    pub payment_count: usize,
}

impl SettlementSummary {
    /// Remaining balance floored at zero.
    #[inline]
    pub fn display_remaining(&self) -> Money {
        self.remaining.floor_at_zero()
    }
}

/// Computes every settlement figure at once.
pub fn summarize(target: Money, payments: &[Payment]) -> SettlementSummary {
    let tendered = total_tendered(payments);
    let remaining = target - tendered;
    SettlementSummary {
        target,
        tendered,
        remaining,
        change: (tendered - target).floor_at_zero(),
        is_complete: !remaining.is_positive(),
        payment_count: payments.len(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
