//! # Account Repository
//!
//! Persistence for open accounts (cuentas) and their lines.
//!
//! ## Save Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    save(account)  (one transaction)                     │
//! │                                                                         │
//! │  account.version == 0 ──► INSERT (version 1)                           │
//! │                              └─ id taken ──► VersionConflict, ROLLBACK │
//! │  otherwise ─────────────► UPDATE ... WHERE version = account.version   │
//! │                              └─ 0 rows ────► VersionConflict, ROLLBACK │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DELETE account_lines; INSERT lines in order                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The first statement of the transaction is the write itself, so SQLite
//! takes the write lock up front and a competing writer waits on
//! `busy_timeout` instead of failing a read-to-write upgrade.
//!
//! The derived totals are written alongside for listing screens but never
//! read back: `Account::totals()` recomputes them from the lines.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::{money_text, parse_money, parse_tax_rate, LineRow};
use cuenta_core::{
    Account, AccountFilter, AccountStatus, AccountStore, CustomerSnapshot, StoreResult,
};

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: String,
    name: String,
    customer_id: Option<String>,
    customer_name: Option<String>,
    discount: String,
    tax_rate: String,
    notes: Option<String>,
    status: AccountStatus,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const SELECT_ACCOUNT: &str = r#"
    SELECT id, name, customer_id, customer_name, discount, tax_rate, notes,
           status, version, created_at, updated_at
    FROM accounts
"#;

/// Repository for open-account database operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AccountRepository { pool }
    }

    /// Gets an account with its lines.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Account>> {
        let row: Option<AccountRow> = sqlx::query_as(&format!("{SELECT_ACCOUNT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// Lists open accounts matching the filter, most recently updated first.
    pub async fn list(&self, filter: &AccountFilter) -> DbResult<Vec<Account>> {
        let name = filter
            .name_contains
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_lowercase);
        // LIMIT -1 means no limit in SQLite
        let limit = filter.limit.map(i64::from).unwrap_or(-1);

        let rows: Vec<AccountRow> = sqlx::query_as(&format!(
            r#"{SELECT_ACCOUNT}
            WHERE status = 'open'
              AND (?1 IS NULL OR instr(lower(name), ?1) > 0)
              AND (?2 IS NULL OR customer_id = ?2)
            ORDER BY updated_at DESC, id
            LIMIT ?3"#
        ))
        .bind(name)
        .bind(&filter.customer_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut accounts = Vec::with_capacity(rows.len());
        for row in rows {
            accounts.push(self.hydrate(row).await?);
        }
        Ok(accounts)
    }

    /// Inserts or updates an account, checking its version.
    ///
    /// ## Returns
    /// The account as stored: version bumped, `updated_at` set to now.
    ///
    /// ## Errors
    /// * `DbError::VersionConflict` - stale or unexpected version, nothing written
    pub async fn save(&self, account: &Account) -> DbResult<Account> {
        debug!(id = %account.id, version = account.version, "Saving account");

        let mut tx = self.pool.begin().await?;

        let now = Utc::now();
        let totals = account.totals();

        let new_version = if account.version == 0 {
            let inserted = sqlx::query(
                r#"
                INSERT INTO accounts (
                    id, name, customer_id, customer_name, discount, tax_rate, notes,
                    status, version, subtotal, tax, total, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?10, ?11, ?12, ?13)
                "#,
            )
            .bind(&account.id)
            .bind(&account.name)
            .bind(account.customer.as_ref().map(|c| c.id.as_str()))
            .bind(account.customer.as_ref().map(|c| c.name.as_str()))
            .bind(money_text(account.discount))
            .bind(account.tax_rate.to_string())
            .bind(&account.notes)
            .bind(account.status)
            .bind(money_text(totals.subtotal))
            .bind(money_text(totals.tax))
            .bind(money_text(totals.total))
            .bind(account.created_at)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from);

            match inserted {
                Ok(_) => 1,
                Err(DbError::UniqueViolation { .. }) => {
                    return Err(version_conflict(&mut tx, account).await);
                }
                Err(e) => return Err(e),
            }
        } else {
            let updated = sqlx::query(
                r#"
                UPDATE accounts SET
                    name = ?2,
                    customer_id = ?3,
                    customer_name = ?4,
                    discount = ?5,
                    tax_rate = ?6,
                    notes = ?7,
                    status = ?8,
                    version = version + 1,
                    subtotal = ?9,
                    tax = ?10,
                    total = ?11,
                    updated_at = ?12
                WHERE id = ?1 AND version = ?13
                "#,
            )
            .bind(&account.id)
            .bind(&account.name)
            .bind(account.customer.as_ref().map(|c| c.id.as_str()))
            .bind(account.customer.as_ref().map(|c| c.name.as_str()))
            .bind(money_text(account.discount))
            .bind(account.tax_rate.to_string())
            .bind(&account.notes)
            .bind(account.status)
            .bind(money_text(totals.subtotal))
            .bind(money_text(totals.tax))
            .bind(money_text(totals.total))
            .bind(now)
            .bind(account.version)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() != 1 {
                return Err(version_conflict(&mut tx, account).await);
            }
            account.version + 1
        };

        replace_lines(&mut tx, account).await?;
        tx.commit().await?;

        info!(id = %account.id, version = new_version, lines = account.lines.len(), "Account saved");

        Ok(Account {
            version: new_version,
            updated_at: now,
            ..account.clone()
        })
    }

    /// Deletes an account and (by cascade) its lines, if it is still at
    /// `expected_version`.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no such account
    /// * `DbError::VersionConflict` - the account changed since it was read
    pub async fn delete(&self, id: &str, expected_version: i64) -> DbResult<()> {
        debug!(id = %id, version = expected_version, "Deleting account");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM accounts WHERE id = ?1 AND version = ?2")
            .bind(id)
            .bind(expected_version)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            let found = stored_version(&mut tx, id).await?;
            return Err(match found {
                None => DbError::not_found("Account", id),
                Some(_) => DbError::VersionConflict {
                    id: id.to_string(),
                    expected: expected_version,
                    found,
                },
            });
        }

        tx.commit().await?;
        Ok(())
    }

    /// Counts open accounts (for diagnostics).
    pub async fn count_open(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE status = 'open'")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn hydrate(&self, row: AccountRow) -> DbResult<Account> {
        let lines: Vec<LineRow> = sqlx::query_as(
            r#"
            SELECT product_id, name, unit_price, applies_tax, quantity
            FROM account_lines
            WHERE account_id = ?1
            ORDER BY position
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        let customer = match (row.customer_id, row.customer_name) {
            (Some(id), name) => Some(CustomerSnapshot {
                name: name.unwrap_or_default(),
                id,
            }),
            (None, _) => None,
        };

        Ok(Account {
            discount: parse_money("accounts.discount", &row.discount)?,
            tax_rate: parse_tax_rate("accounts.tax_rate", &row.tax_rate)?,
            lines: lines
                .into_iter()
                .map(LineRow::into_line)
                .collect::<DbResult<_>>()?,
            id: row.id,
            name: row.name,
            customer,
            notes: row.notes,
            status: row.status,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

async fn stored_version(tx: &mut Transaction<'_, Sqlite>, id: &str) -> DbResult<Option<i64>> {
    let version = sqlx::query_scalar("SELECT version FROM accounts WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(version)
}

/// The conflict to report when a save matched no row at the expected version.
async fn version_conflict(tx: &mut Transaction<'_, Sqlite>, account: &Account) -> DbError {
    match stored_version(tx, &account.id).await {
        Ok(found) => DbError::VersionConflict {
            id: account.id.clone(),
            expected: account.version,
            found,
        },
        Err(e) => e,
    }
}

/// Rewrites the account's lines inside the save transaction.
async fn replace_lines(tx: &mut Transaction<'_, Sqlite>, account: &Account) -> DbResult<()> {
    sqlx::query("DELETE FROM account_lines WHERE account_id = ?1")
        .bind(&account.id)
        .execute(&mut **tx)
        .await?;

    for (position, line) in account.lines.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO account_lines (
                account_id, position, product_id, name, unit_price, applies_tax, quantity
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&account.id)
        .bind(position as i64)
        .bind(&line.product_id)
        .bind(&line.name)
        .bind(money_text(line.unit_price))
        .bind(line.applies_tax)
        .bind(line.quantity)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

#[async_trait]
impl AccountStore for AccountRepository {
    async fn get(&self, account_id: &str) -> StoreResult<Option<Account>> {
        Ok(self.get_by_id(account_id).await?)
    }

    async fn list(&self, filter: &AccountFilter) -> StoreResult<Vec<Account>> {
        Ok(AccountRepository::list(self, filter).await?)
    }

    async fn save(&self, account: &Account) -> StoreResult<Account> {
        Ok(AccountRepository::save(self, account).await?)
    }

    async fn delete(&self, account_id: &str, expected_version: i64) -> StoreResult<()> {
        Ok(AccountRepository::delete(self, account_id, expected_version).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use cuenta_core::{Cart, Money, Product, StoreError};

    fn product(id: &str, cents: i64, applies_tax: bool) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {id}"),
            sale_price: Money::from_cents(cents),
            applies_tax,
            available_stock: None,
            is_active: true,
        }
    }

    fn new_account(id: &str, name: &str) -> Account {
        let mut cart = Cart::new();
        cart.add_product(&product("tacos", 4500, true), 2).unwrap();
        cart.add_product(&product("agua", 2000, false), 1).unwrap();
        cart.apply_discount(Money::from_cents(550)).unwrap();
        Account::open(id.to_string(), name, &cart, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_save_and_get_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.accounts();

        let account = new_account("acc-1", "Mesa 4");
        let saved = repo.save(&account).await.unwrap();
        assert_eq!(saved.version, 1);

        let loaded = repo.get_by_id("acc-1").await.unwrap().unwrap();
        assert_eq!(loaded.lines, account.lines);
        assert_eq!(loaded.discount, account.discount);
        assert_eq!(loaded.totals(), account.totals());
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.status, AccountStatus::Open);
    }

    #[tokio::test]
    async fn test_save_bumps_version_and_rejects_stale() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.accounts();

        let v1 = repo.save(&new_account("acc-1", "Mesa 4")).await.unwrap();

        let mut edit = v1.clone();
        edit.lines.truncate(1);
        let v2 = repo.save(&edit).await.unwrap();
        assert_eq!(v2.version, 2);

        // Second writer still holds v1
        let err = repo.save(&v1).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::VersionConflict { expected: 1, found: Some(2), .. }
        ));

        let loaded = repo.get_by_id("acc-1").await.unwrap().unwrap();
        assert_eq!(loaded.lines.len(), 1);
    }

    #[tokio::test]
    async fn test_insert_with_nonzero_version_conflicts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut account = new_account("ghost", "Barra");
        account.version = 3;

        let err: StoreError = AccountStore::save(&db.accounts(), &account).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::Conflict {
                id: "ghost".to_string(),
                expected: 3,
                found: None
            }
        );
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.accounts();

        let mesa1 = repo.save(&new_account("a", "Mesa 1")).await.unwrap();
        repo.save(&new_account("b", "Barra")).await.unwrap();
        repo.save(&new_account("c", "Mesa 2")).await.unwrap();
        // Touch Mesa 1 so it becomes the most recent
        repo.save(&mesa1).await.unwrap();

        let all = repo.list(&AccountFilter::all()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, "a");

        let mesas = repo.list(&AccountFilter::named("MESA")).await.unwrap();
        assert_eq!(mesas.len(), 2);

        let limited = AccountFilter {
            limit: Some(1),
            ..AccountFilter::all()
        };
        assert_eq!(repo.list(&limited).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_cascades_lines() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.accounts();
        let saved = repo.save(&new_account("acc-1", "Mesa 4")).await.unwrap();

        repo.delete("acc-1", saved.version).await.unwrap();
        assert!(repo.get_by_id("acc-1").await.unwrap().is_none());
        assert_eq!(repo.count_open().await.unwrap(), 0);

        let lines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account_lines")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(lines, 0);

        assert!(matches!(
            repo.delete("acc-1", saved.version).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_with_stale_version_keeps_account() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.accounts();

        let v1 = repo.save(&new_account("acc-1", "Mesa 4")).await.unwrap();
        // Another register adds a round
        repo.save(&v1).await.unwrap();

        let err = repo.delete("acc-1", v1.version).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::VersionConflict { expected: 1, found: Some(2), .. }
        ));
        assert_eq!(repo.count_open().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_second_insert_of_same_id_conflicts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.accounts();
        let account = new_account("acc-1", "Mesa 4");

        repo.save(&account).await.unwrap();
        let err = repo.save(&account).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::VersionConflict { expected: 0, found: Some(1), .. }
        ));

        let loaded = repo.get_by_id("acc-1").await.unwrap().unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.lines.len(), 2);
    }
}
