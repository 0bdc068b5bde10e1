use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::Row;
use techstore_core::domain::product::{Product, ProductId, ProductType};
use tracing::debug;

use super::{ProductRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let product_type_str: String =
        row.try_get("product_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let brand: String = row.try_get("brand").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let model: String = row.try_get("model").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let price_str: String =
        row.try_get("price").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let year: i32 = row.try_get("year").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let product_type = ProductType::from_str(&product_type_str)
        .map_err(|e| RepositoryError::Decode(format!("product {id}: {e}")))?;
    let price = Decimal::from_str(&price_str).map_err(|e| {
        RepositoryError::Decode(format!("product {id}: invalid price `{price_str}`: {e}"))
    })?;

    Ok(Product { id: Some(ProductId(id)), product_type, brand, model, price, year })
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, product_type, brand, model, price, year
             FROM product ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_product).collect::<Result<Vec<_>, _>>()
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, product_type, brand, model, price, year
             FROM product WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_product(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, product: Product) -> Result<Product, RepositoryError> {
        let price_str = product.price.to_string();

        match product.id {
            None => {
                let result = sqlx::query(
                    "INSERT INTO product (product_type, brand, model, price, year)
                     VALUES (?, ?, ?, ?, ?)",
                )
                .bind(product.product_type.as_str())
                .bind(&product.brand)
                .bind(&product.model)
                .bind(&price_str)
                .bind(product.year)
                .execute(&self.pool)
                .await?;

                let id = ProductId(result.last_insert_rowid());
                debug!(product_id = %id, "inserted product row");
                Ok(Product { id: Some(id), ..product })
            }
            Some(id) => {
                let result = sqlx::query(
                    "UPDATE product
                     SET product_type = ?, brand = ?, model = ?, price = ?, year = ?
                     WHERE id = ?",
                )
                .bind(product.product_type.as_str())
                .bind(&product.brand)
                .bind(&product.model)
                .bind(&price_str)
                .bind(product.year)
                .bind(id.0)
                .execute(&self.pool)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(RepositoryError::NotFound(id));
                }
                debug!(product_id = %id, "updated product row");
                Ok(product)
            }
        }
    }

    async fn delete_by_id(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM product WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        debug!(product_id = %id, rows = result.rows_affected(), "deleted product rows");
        Ok(())
    }

    async fn count(&self) -> Result<usize, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product")
            .fetch_one(&self.pool)
            .await?;
        usize::try_from(count).map_err(|e| RepositoryError::Decode(e.to_string()))
    }
}
