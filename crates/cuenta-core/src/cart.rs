//! # Cart Engine
//!
//! The mutable, in-progress sale.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Operation              State Change                 Recalculate?       │
//! │  ─────────              ────────────                 ────────────       │
//! │  add_product()    ────► line.qty += n | push line    yes                │
//! │  update_quantity()────► line.qty = n | remove        yes                │
//! │  remove_item()    ────► lines.retain(..)             yes                │
//! │  apply_discount() ────► discount = d                 yes                │
//! │  clear()          ────► empty cart                   yes                │
//! │  set_customer()   ────► customer = c                 no                 │
//! │  set_notes()      ────► notes = n                    no                 │
//! │                                                                         │
//! │  Every failed operation leaves the cart exactly as it was.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Lines keep insertion order, one line per product id
//! - Every quantity is > 0
//! - `totals()` always matches the current lines and discount

use serde::Serialize;

use crate::account::Account;
use crate::error::{CoreError, CoreResult};
use crate::line::{combined_quantity, ensure_valid_quantity, LineItem, Totals};
use crate::money::Money;
use crate::types::{CustomerSnapshot, Product, TaxRate};
use crate::validation::{validate_discount, validate_notes};

/// The shopping cart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    lines: Vec<LineItem>,
    discount: Money,
    customer: Option<CustomerSnapshot>,
    notes: Option<String>,
    tax_rate: TaxRate,
    totals: Totals,
}

impl Cart {
    /// Creates a new empty cart taxed at IVA.
    pub fn new() -> Self {
        Cart {
            lines: Vec::new(),
            discount: Money::ZERO,
            customer: None,
            notes: None,
            tax_rate: TaxRate::IVA,
            totals: Totals::default(),
        }
    }

    /// Switches the tax rate used by `recalculate`.
    pub fn with_tax_rate(mut self, rate: TaxRate) -> Self {
        self.tax_rate = rate;
        self.recalculate();
        self
    }

    /// Copies an account's content into a fresh cart (load for editing).
    pub fn from_account(account: &Account) -> Self {
        let mut cart = Cart {
            lines: account.lines.clone(),
            discount: account.discount,
            customer: account.customer.clone(),
            notes: account.notes.clone(),
            tax_rate: account.tax_rate,
            totals: Totals::default(),
        };
        cart.recalculate();
        cart
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Adds a product or increases its quantity if already present.
    ///
    /// ## Behavior
    /// - Product already in cart: quantity increases, captured price is kept
    /// - Product not in cart: appended at the product's current sale price
    ///
    /// Stock is NOT checked here.
    pub fn add_product(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        ensure_valid_quantity(quantity)?;

        match self.lines.iter_mut().find(|l| l.product_id == product.id) {
            Some(line) => line.quantity = combined_quantity(line.quantity, quantity)?,
            None => self.lines.push(LineItem::from_product(product, quantity)?),
        }

        self.recalculate();
        Ok(())
    }

    /// Sets the quantity of a line. `quantity <= 0` removes it.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity <= 0 {
            return self.remove_item(product_id);
        }
        ensure_valid_quantity(quantity)?;

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;
        line.quantity = quantity;

        self.recalculate();
        Ok(())
    }

    /// Removes a line by product id.
    pub fn remove_item(&mut self, product_id: &str) -> CoreResult<()> {
        let initial_len = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);

        if self.lines.len() == initial_len {
            return Err(CoreError::ProductNotFound(product_id.to_string()));
        }

        self.recalculate();
        Ok(())
    }

    /// Resets to the empty-cart state. The tax rate is kept.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.discount = Money::ZERO;
        self.customer = None;
        self.notes = None;
        self.recalculate();
    }

    /// Sets a flat discount, applied before tax.
    ///
    /// Not checked against the subtotal: a discount larger than the
    /// subtotal produces a negative raw total.
    pub fn apply_discount(&mut self, discount: Money) -> CoreResult<()> {
        validate_discount(discount)?;
        self.discount = discount;
        self.recalculate();
        Ok(())
    }

    pub fn set_customer(&mut self, customer: Option<CustomerSnapshot>) {
        self.customer = customer;
    }

    /// Sets free-text notes. Blank text clears them.
    pub fn set_notes(&mut self, notes: Option<&str>) -> CoreResult<()> {
        self.notes = validate_notes(notes)?;
        Ok(())
    }

    /// Recomputes derived totals from lines, discount and tax rate.
    pub fn recalculate(&mut self) {
        self.totals = Totals::compute(&self.lines, self.discount, self.tax_rate);
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    #[inline]
    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    /// Finds the line for a product.
    pub fn line(&self, product_id: &str) -> Option<&LineItem> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        self.discount
    }

    #[inline]
    pub fn customer(&self) -> Option<&CustomerSnapshot> {
        self.customer.as_ref()
    }

    #[inline]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    #[inline]
    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        self.totals.subtotal
    }

    #[inline]
    pub fn tax(&self) -> Money {
        self.totals.tax
    }

    #[inline]
    pub fn total(&self) -> Money {
        self.totals.total
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    #[inline]
    pub fn item_count(&self) -> usize {
        self.lines.len()
    }

    /// Sum of all quantities.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
