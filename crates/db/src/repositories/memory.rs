use std::collections::BTreeMap;

use tokio::sync::RwLock;

use techstore_core::domain::product::{Product, ProductId};

use super::{ProductRepository, RepositoryError};

#[derive(Default)]
struct ProductTable {
    rows: BTreeMap<i64, Product>,
    last_id: i64,
}

/// Map-backed store with the same identity rules as the SQL table: ids are
/// handed out in increasing order and never reused.
#[derive(Default)]
pub struct InMemoryProductRepository {
    table: RwLock<ProductTable>,
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table.rows.values().cloned().collect())
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id.0).cloned())
    }

    async fn save(&self, product: Product) -> Result<Product, RepositoryError> {
        let mut table = self.table.write().await;
        let id = match product.id {
            None => {
                table.last_id += 1;
                ProductId(table.last_id)
            }
            Some(id) if table.rows.contains_key(&id.0) => id,
            Some(id) => return Err(RepositoryError::NotFound(id)),
        };

        let stored = Product { id: Some(id), ..product };
        table.rows.insert(id.0, stored.clone());
        Ok(stored)
    }

    async fn delete_by_id(&self, id: ProductId) -> Result<(), RepositoryError> {
        let mut table = self.table.write().await;
        table.rows.remove(&id.0);
        Ok(())
    }

    async fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.table.read().await.rows.len())
    }
}
