//! # Customer Repository
//!
//! The customer directory. Carts and accounts only keep a
//! `CustomerSnapshot { id, name }` of what is stored here.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use cuenta_core::{Customer, CustomerDirectory, StoreResult};

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, (String, String, Option<String>, Option<String>, Option<String>)>(
            "SELECT id, name, email, phone, tax_id FROM customers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(|(id, name, email, phone, tax_id)| Customer {
            id,
            name,
            email,
            phone,
            tax_id,
        });

        Ok(customer)
    }

    pub async fn insert(&self, customer: &Customer) -> DbResult<Customer> {
        debug!(id = %customer.id, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (id, name, email, phone, tax_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.tax_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(customer.clone())
    }
}

#[async_trait]
impl CustomerDirectory for CustomerRepository {
    async fn get(&self, customer_id: &str) -> StoreResult<Option<Customer>> {
        Ok(self.get_by_id(customer_id).await?)
    }
}
