//! # Product Repository
//!
//! Catalog lookups for the cart, plus `insert` for seeding the catalog.
//! Tracked stock is decremented by the sale repository when a sale is
//! recorded.
//!
//! The cart captures `sale_price` when a product is added, so price edits
//! here never reach open carts or accounts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::{money_text, parse_money};
use cuenta_core::{Product, ProductCatalog, StoreResult};

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    sale_price: String,
    applies_tax: bool,
    available_stock: Option<i64>,
    is_active: bool,
}

impl ProductRow {
    fn into_product(self) -> DbResult<Product> {
        Ok(Product {
            sale_price: parse_money("products.sale_price", &self.sale_price)?,
            id: self.id,
            name: self.name,
            applies_tax: self.applies_tax,
            available_stock: self.available_stock,
            is_active: self.is_active,
        })
    }
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(
            r#"
            SELECT id, name, sale_price, applies_tax, available_stock, is_active
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProductRow::into_product).transpose()
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - id already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, "Inserting product");

        let now: DateTime<Utc> = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, sale_price, applies_tax, available_stock, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(money_text(product.sale_price))
        .bind(product.applies_tax)
        .bind(product.available_stock)
        .bind(product.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }
}

#[async_trait]
impl ProductCatalog for ProductRepository {
    async fn get(&self, product_id: &str) -> StoreResult<Option<Product>> {
        Ok(self.get_by_id(product_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::{Database, DbConfig};
    use cuenta_core::Money;

    fn refresco() -> Product {
        Product {
            id: "COCA-600".to_string(),
            name: "Coca-Cola 600ml".to_string(),
            sale_price: Money::from_cents(1850),
            applies_tax: true,
            available_stock: Some(24),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&refresco()).await.unwrap();

        let found = repo.get_by_id("COCA-600").await.unwrap().unwrap();
        assert_eq!(found, refresco());
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&refresco()).await.unwrap();
        let err = repo.insert(&refresco()).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_catalog_port() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        repo.insert(&refresco()).await.unwrap();

        let catalog: &dyn ProductCatalog = &repo;
        let product = catalog.get("COCA-600").await.unwrap().unwrap();
        assert_eq!(product.sale_price.to_fixed_string(), "18.50");
    }
}
