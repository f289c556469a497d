//! # Line Items and Totals
//!
//! The line item is shared by carts, accounts and sales. `Totals::compute`
//! is the single place where subtotal, IVA and total are derived.
//!
//! ## Derivation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  subtotal          = Σ line.subtotal                                    │
//! │  taxable_subtotal  = Σ line.subtotal  where line.applies_tax            │
//! │  tax               = round2( max(0, taxable_subtotal − discount) × 16%) │
//! │  total             = subtotal − discount + tax                          │
//! │                                                                         │
//! │  The discount is charged against the taxable base only, even when the  │
//! │  cart also holds exempt lines.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Product, TaxRate};
use crate::validation::{validate_amount_limit, validate_quantity_limit};

// =============================================================================
// Line Item
// =============================================================================

/// One product line in a cart, account or sale.
///
/// ## Price Freezing
/// `unit_price` is captured when the product is added. Later catalog price
/// changes do not touch open carts or accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: String,
    pub name: String,
    pub unit_price: Money,
    pub applies_tax: bool,
    pub quantity: i64,
}

impl LineItem {
    /// Creates a line from a product at its current sale price.
    ///
    /// ## Errors
    /// - `InvalidQuantity` when `quantity <= 0`
    /// - `Validation` when the quantity or the price is above the limits
    pub fn from_product(product: &Product, quantity: i64) -> CoreResult<Self> {
        ensure_valid_quantity(quantity)?;
        validate_amount_limit("sale price", product.sale_price)?;
        Ok(LineItem {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price: product.sale_price,
            applies_tax: product.applies_tax,
            quantity,
        })
    }

    /// `unit_price × quantity`, always derived.
    #[inline]
    pub fn subtotal(&self) -> Money {
        self.unit_price * self.quantity
    }
}

/// Rejects zero, negative and oversized quantities.
pub(crate) fn ensure_valid_quantity(quantity: i64) -> CoreResult<()> {
    if quantity <= 0 {
        return Err(CoreError::InvalidQuantity(quantity));
    }
    validate_quantity_limit(quantity)?;
    Ok(())
}

/// Quantity of a line after adding `added` units to it.
pub(crate) fn combined_quantity(current: i64, added: i64) -> CoreResult<i64> {
    let combined = current.checked_add(added).unwrap_or(i64::MAX);
    ensure_valid_quantity(combined)?;
    Ok(combined)
}

// =============================================================================
// Totals
// =============================================================================

/// Derived money figures for a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: Money,
    pub taxable_subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
}

impl Totals {
    /// Computes totals for `lines` with a flat `discount` applied before tax.
    ///
    /// ```rust
    /// use cuenta_core::line::{LineItem, Totals};
    /// use cuenta_core::money::Money;
    /// use cuenta_core::types::TaxRate;
    ///
    /// let lines = vec![LineItem {
    ///     product_id: "p1".into(),
    ///     name: "Torta".into(),
    ///     unit_price: Money::from_major(100),
    ///     applies_tax: true,
    ///     quantity: 1,
    /// }];
    /// let totals = Totals::compute(&lines, Money::from_major(20), TaxRate::IVA);
    /// assert_eq!(totals.tax.to_fixed_string(), "12.80");
    /// assert_eq!(totals.total.to_fixed_string(), "92.80");
    /// ```
    pub fn compute(lines: &[LineItem], discount: Money, rate: TaxRate) -> Totals {
        let subtotal: Money = lines.iter().map(LineItem::subtotal).sum();
        let taxable_subtotal: Money = lines
            .iter()
            .filter(|line| line.applies_tax)
            .map(LineItem::subtotal)
            .sum();

        let taxable_base = (taxable_subtotal - discount).floor_at_zero();
        let tax = taxable_base.calculate_tax(rate);

        Totals {
            subtotal,
            taxable_subtotal,
            discount,
            tax,
            total: subtotal - discount + tax,
        }
    }

    /// Total floored at zero for presentation. The raw `total` is left
    /// signed when a discount exceeds the subtotal.
    #[inline]
    pub fn display_total(&self) -> Money {
        self.total.floor_at_zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
