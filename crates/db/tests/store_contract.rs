//! Behavioural contract shared by every `ProductRepository` implementation.

use rust_decimal::Decimal;
use techstore_core::domain::product::{Product, ProductId, ProductType};
use techstore_db::repositories::{
    InMemoryProductRepository, ProductRepository, RepositoryError, SqlProductRepository,
};
use techstore_db::{connect_with_settings, migrations};

type ContractResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
}

fn product(product_type: ProductType, brand: &str, model: &str, price: i64, year: i32) -> Product {
    Product {
        id: None,
        product_type,
        brand: brand.to_string(),
        model: model.to_string(),
        price: Decimal::new(price, 2),
        year,
    }
}

async fn sql_store() -> ContractResult<SqlProductRepository> {
    let pool = connect_with_settings("sqlite::memory:", 1, 30)
        .await
        .map_err(|error| format!("connect: {error}"))?;
    migrations::run_pending(&pool).await.map_err(|error| format!("migrate: {error}"))?;
    Ok(SqlProductRepository::new(pool))
}

async fn run_contract(store: &dyn ProductRepository) -> ContractResult {
    let err = |error: RepositoryError| error.to_string();

    require!(store.find_all().await.map_err(err)?.is_empty(), "store should start empty");

    let laptop = store
        .save(product(ProductType::Laptop, "Acme", "X1", 99_999, 2023))
        .await
        .map_err(err)?;
    let laptop_id = laptop.id.ok_or("insert should assign an id")?;
    let phone = store
        .save(product(ProductType::Phone, "Globex", "G7", 64_950, 2022))
        .await
        .map_err(err)?;
    let phone_id = phone.id.ok_or("insert should assign an id")?;
    require!(laptop_id != phone_id, "ids must be unique");

    let listed = store.find_all().await.map_err(err)?;
    require_eq!(listed, vec![laptop.clone(), phone.clone()]);

    let repriced = Product { price: Decimal::new(109_999, 2), ..laptop.clone() };
    let stored = store.save(repriced.clone()).await.map_err(err)?;
    require_eq!(stored, repriced);
    let reloaded = store.find_by_id(laptop_id).await.map_err(err)?;
    require_eq!(reloaded.as_ref(), Some(&repriced));
    let unchanged = reloaded.map(|p| (p.product_type, p.brand, p.model, p.year));
    require_eq!(unchanged, Some((ProductType::Laptop, "Acme".to_string(), "X1".to_string(), 2023)));

    let missing = ProductId(laptop_id.0 + phone_id.0 + 100);
    require!(store.find_by_id(missing).await.map_err(err)?.is_none());
    let upsert = store.save(Product { id: Some(missing), ..repriced.clone() }).await;
    require!(
        matches!(upsert, Err(RepositoryError::NotFound(id)) if id == missing),
        "update of a missing id must be NotFound, got {upsert:?}"
    );
    require_eq!(store.count().await.map_err(err)?, 2);

    store.delete_by_id(missing).await.map_err(err)?;
    require_eq!(store.count().await.map_err(err)?, 2);

    store.delete_by_id(laptop_id).await.map_err(err)?;
    require_eq!(store.find_all().await.map_err(err)?, vec![phone.clone()]);

    Ok(())
}

#[tokio::test]
async fn sql_store_honours_contract() -> ContractResult {
    let store = sql_store().await?;
    run_contract(&store).await
}

#[tokio::test]
async fn in_memory_store_honours_contract() -> ContractResult {
    let store = InMemoryProductRepository::default();
    run_contract(&store).await
}
