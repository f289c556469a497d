//! # Domain Types
//!
//! Types shared by the cart engine, the reconciler, settlement and the
//! store ports.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Customer     │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  method         │       │
//! │  │  name           │   │  name           │   │  amount (Money) │       │
//! │  │  sale_price     │   │  email, phone   │   │  reference      │       │
//! │  │  applies_tax    │   │  tax_id (RFC)   │   └─────────────────┘       │
//! │  │  available_stock│   └─────────────────┘                              │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │    NewSale      │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  percent        │   │  lines, totals  │   │  Cash           │       │
//! │  │  IVA = 16       │   │  payments       │   │  Card           │       │
//! │  └─────────────────┘   │  → Sale (+id)   │   │  Transfer       │       │
//! │                        └─────────────────┘   │  Other(..)      │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult};
use crate::line::LineItem;
use crate::money::Money;
use crate::settlement;
use crate::validation::validate_tax_rate;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate expressed as a percentage (`16` = 16%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxRate(Decimal);

impl TaxRate {
    /// Mexican IVA, 16%.
    pub const IVA: TaxRate = TaxRate(Decimal::from_parts(16, 0, 0, false, 0));

    /// Creates a tax rate from a percentage between 0 and 100.
    pub fn from_percent(percent: Decimal) -> CoreResult<Self> {
        validate_tax_rate(percent)?;
        Ok(TaxRate(percent))
    }

    /// Returns the rate as a percentage.
    #[inline]
    pub const fn percent(&self) -> Decimal {
        self.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(Decimal::ZERO)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::IVA
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// Parses a percentage such as `"16"` or `"8.5"`.
impl FromStr for TaxRate {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let percent = Decimal::from_str(s.trim())
            .map_err(|e| CoreError::invalid_amount(s, e.to_string()))?;
        TaxRate::from_percent(percent)
    }
}

// =============================================================================
// Product
// =============================================================================

/// Catalog view of a product, as returned by the product lookup port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Current sale price. Captured into a line item when added to a cart.
    pub sale_price: Money,

    /// Whether IVA applies to this product.
    pub applies_tax: bool,

    /// Units on hand. `None` means stock is not tracked.
    pub available_stock: Option<i64>,

    /// Whether product is active (soft delete).
    pub is_active: bool,
}

impl Product {
    /// Checks if `quantity` units can be sold.
    pub fn can_sell(&self, quantity: i64) -> bool {
        match self.available_stock {
            Some(stock) => stock >= quantity,
            None => true,
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer record from the customer directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// RFC (Mexican taxpayer id), used for invoicing.
    pub tax_id: Option<String>,
}

impl Customer {
    /// The display snapshot attached to carts and accounts.
    pub fn snapshot(&self) -> CustomerSnapshot {
        CustomerSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Frozen display copy of a customer. The core never mutates customers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSnapshot {
    pub id: String,
    pub name: String,
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a payment was tendered. Open enumeration: unknown methods are kept
/// verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Other(String),
}

impl PaymentMethod {
    /// Lowercase wire/storage name.
    pub fn as_str(&self) -> &str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Other(name) => name,
        }
    }

    #[inline]
    pub fn is_cash(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Ok(match normalized.as_str() {
            "cash" | "efectivo" => PaymentMethod::Cash,
            "card" | "credit" | "debit" | "tarjeta" => PaymentMethod::Card,
            "transfer" | "transferencia" => PaymentMethod::Transfer,
            _ => PaymentMethod::Other(normalized),
        })
    }
}

impl From<String> for PaymentMethod {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(method) => method,
            Err(never) => match never {},
        }
    }
}

impl From<PaymentMethod> for String {
    fn from(method: PaymentMethod) -> Self {
        method.as_str().to_string()
    }
}

// =============================================================================
// Payment
// =============================================================================

/// One tendered amount during settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub method: PaymentMethod,
    pub amount: Money,
    /// Terminal auth code or transfer id. Generated for non-cash methods.
    pub reference: Option<String>,
}

// =============================================================================
// Sale
// =============================================================================

/// A sale ready to be persisted. The store assigns id, receipt number and
/// timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSale {
    pub customer_id: Option<String>,
    /// The open account this sale settles, when the cart was loaded from one.
    pub account_id: Option<String>,
    pub lines: Vec<LineItem>,
    pub payments: Vec<Payment>,
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
    pub tendered: Money,
    pub change: Money,
    pub notes: Option<String>,
}

impl NewSale {
    /// Copies a cart and its payments into a sale record.
    pub fn from_cart(cart: &Cart, payments: &[Payment], account_id: Option<String>) -> Self {
        let totals = cart.totals();
        NewSale {
            customer_id: cart.customer().map(|c| c.id.clone()),
            account_id,
            lines: cart.lines().to_vec(),
            payments: payments.to_vec(),
            subtotal: totals.subtotal,
            discount: totals.discount,
            tax: totals.tax,
            total: totals.total,
            tendered: settlement::total_tendered(payments),
            change: settlement::change(totals.total, payments),
            notes: cart.notes().map(str::to_string),
        }
    }
}

/// A persisted sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    /// Human-readable folio printed on the receipt (`YYYYMMDD-NNNN`).
    pub receipt_number: String,
    pub customer_id: Option<String>,
    pub account_id: Option<String>,
    pub lines: Vec<LineItem>,
    pub payments: Vec<Payment>,
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
    pub tendered: Money,
    pub change: Money,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Builds the persisted form from a `NewSale` and store-assigned fields.
    pub fn from_new(
        sale: NewSale,
        id: String,
        receipt_number: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Sale {
            id,
            receipt_number,
            customer_id: sale.customer_id,
            account_id: sale.account_id,
            lines: sale.lines,
            payments: sale.payments,
            subtotal: sale.subtotal,
            discount: sale.discount,
            tax: sale.tax,
            total: sale.total,
            tendered: sale.tendered,
            change: sale.change,
            notes: sale.notes,
            created_at,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
