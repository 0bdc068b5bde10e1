use async_trait::async_trait;
use thiserror::Error;

use techstore_core::domain::product::{Product, ProductId};
use techstore_core::errors::ApplicationError;

pub mod memory;
pub mod product;

pub use memory::InMemoryProductRepository;
pub use product::SqlProductRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("product `{0}` does not exist")]
    NotFound(ProductId),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound(id) => ApplicationError::not_found("product", id),
            other => ApplicationError::Persistence(other.to_string()),
        }
    }
}

/// Persistence contract for catalog products.
///
/// `save` inserts when the product has no id and assigns one; otherwise it
/// replaces every field of the existing row and fails with
/// [`RepositoryError::NotFound`] if that row is gone. `delete_by_id` on an
/// unknown id succeeds without effect.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Product>, RepositoryError>;
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;
    async fn save(&self, product: Product) -> Result<Product, RepositoryError>;
    async fn delete_by_id(&self, id: ProductId) -> Result<(), RepositoryError>;

    async fn count(&self) -> Result<usize, RepositoryError> {
        Ok(self.find_all().await?.len())
    }
}
