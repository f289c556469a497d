//! # Sale Repository
//!
//! Records finalized sales. A sale is written once and never updated.
//!
//! ## Create Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    create(NewSale)  (one transaction)                   │
//! │                                                                         │
//! │  1. Next receipt number for today   YYYYMMDD-NNNN                      │
//! │  2. INSERT sales                    totals, tendered, change           │
//! │  3. INSERT sale_items               lines copied from the cart         │
//! │  4. INSERT sale_payments            tendered payments in order         │
//! │  5. UPDATE products                 tracked stock -= quantity sold     │
//! │  6. COMMIT                          all or nothing                     │
//! │                                                                         │
//! │  Closing the source account is NOT part of this transaction: the       │
//! │  checkout layer deletes it afterwards through the AccountStore port.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::{money_text, parse_money, LineRow};
use cuenta_core::{NewSale, Payment, Sale, SaleStore, StoreResult};

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    receipt_number: String,
    customer_id: Option<String>,
    account_id: Option<String>,
    subtotal: String,
    discount: String,
    tax: String,
    total: String,
    tendered: String,
    change_due: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    method: String,
    amount: String,
    reference: Option<String>,
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Persists a sale with its items and payments.
    pub async fn create(&self, sale: &NewSale) -> DbResult<Sale> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let receipt_number = next_receipt_number(&mut tx, now).await?;
        debug!(id = %id, receipt_number = %receipt_number, "Creating sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, receipt_number, customer_id, account_id,
                subtotal, discount, tax, total, tendered, change_due,
                notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&id)
        .bind(&receipt_number)
        .bind(&sale.customer_id)
        .bind(&sale.account_id)
        .bind(money_text(sale.subtotal))
        .bind(money_text(sale.discount))
        .bind(money_text(sale.tax))
        .bind(money_text(sale.total))
        .bind(money_text(sale.tendered))
        .bind(money_text(sale.change))
        .bind(&sale.notes)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // Snapshot pattern: name and price are copied so the receipt never
        // changes when the catalog does.
        for (position, line) in sale.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, position, product_id, name,
                    unit_price, applies_tax, quantity, line_total
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&id)
            .bind(position as i64)
            .bind(&line.product_id)
            .bind(&line.name)
            .bind(money_text(line.unit_price))
            .bind(line.applies_tax)
            .bind(line.quantity)
            .bind(money_text(line.subtotal()))
            .execute(&mut *tx)
            .await?;
        }

        for (position, payment) in sale.payments.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO sale_payments (id, sale_id, position, method, amount, reference)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&id)
            .bind(position as i64)
            .bind(payment.method.as_str())
            .bind(money_text(payment.amount))
            .bind(&payment.reference)
            .execute(&mut *tx)
            .await?;
        }

        // Untracked products (NULL stock) stay untracked
        for line in &sale.lines {
            sqlx::query(
                r#"
                UPDATE products
                SET available_stock = available_stock - ?2, updated_at = ?3
                WHERE id = ?1 AND available_stock IS NOT NULL
                "#,
            )
            .bind(&line.product_id)
            .bind(line.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            id = %id,
            receipt_number = %receipt_number,
            total = %sale.total,
            "Sale recorded"
        );

        Ok(Sale::from_new(sale.clone(), id, receipt_number, now))
    }

    /// Gets a sale with its items and payments.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let row: Option<SaleRow> = sqlx::query_as(
            r#"
            SELECT id, receipt_number, customer_id, account_id,
                   subtotal, discount, tax, total, tendered, change_due,
                   notes, created_at
            FROM sales
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let lines: Vec<LineRow> = sqlx::query_as(
            r#"
            SELECT product_id, name, unit_price, applies_tax, quantity
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let payments: Vec<PaymentRow> = sqlx::query_as(
            r#"
            SELECT method, amount, reference
            FROM sale_payments
            WHERE sale_id = ?1
            ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(Sale {
            subtotal: parse_money("sales.subtotal", &row.subtotal)?,
            discount: parse_money("sales.discount", &row.discount)?,
            tax: parse_money("sales.tax", &row.tax)?,
            total: parse_money("sales.total", &row.total)?,
            tendered: parse_money("sales.tendered", &row.tendered)?,
            change: parse_money("sales.change_due", &row.change_due)?,
            lines: lines
                .into_iter()
                .map(LineRow::into_line)
                .collect::<DbResult<_>>()?,
            payments: payments
                .into_iter()
                .map(|p| -> DbResult<Payment> {
                    Ok(Payment {
                        amount: parse_money("sale_payments.amount", &p.amount)?,
                        method: p.method.into(),
                        reference: p.reference,
                    })
                })
                .collect::<DbResult<_>>()?,
            id: row.id,
            receipt_number: row.receipt_number,
            customer_id: row.customer_id,
            account_id: row.account_id,
            notes: row.notes,
            created_at: row.created_at,
        }))
    }

    /// Counts sales recorded today (UTC), for diagnostics.
    pub async fn count_today(&self) -> DbResult<i64> {
        let prefix = format!("{}-%", Utc::now().format("%Y%m%d"));
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE receipt_number LIKE ?1")
            .bind(prefix)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Next receipt number in format `YYYYMMDD-NNNN`.
///
/// ## Format
/// - YYYYMMDD: Date (UTC)
/// - NNNN: daily sequence, padded to 4 digits, restarting at 0001
///
/// Computed inside the create transaction so concurrent writers, which
/// SQLite serializes, never see the same sequence.
async fn next_receipt_number(
    tx: &mut Transaction<'_, Sqlite>,
    now: DateTime<Utc>,
) -> DbResult<String> {
    let date_part = now.format("%Y%m%d").to_string();

    let issued: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE receipt_number LIKE ?1")
        .bind(format!("{date_part}-%"))
        .fetch_one(&mut **tx)
        .await?;

    Ok(format!("{}-{:04}", date_part, issued + 1))
}

#[async_trait]
impl SaleStore for SaleRepository {
    async fn create(&self, sale: &NewSale) -> StoreResult<Sale> {
        Ok(SaleRepository::create(self, sale).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
