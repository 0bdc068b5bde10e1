use std::str::FromStr;

use rust_decimal::Decimal;
use techstore_core::domain::product::{Product, ProductType};
use tracing::info;

use crate::connection::DbPool;
use crate::repositories::{ProductRepository, RepositoryError, SqlProductRepository};

struct DemoProduct {
    product_type: ProductType,
    brand: &'static str,
    model: &'static str,
    price: &'static str,
    year: i32,
}

/// Canonical demo catalog, one entry per product type plus a second laptop.
const DEMO_PRODUCTS: &[DemoProduct] = &[
    DemoProduct {
        product_type: ProductType::Laptop,
        brand: "Acme",
        model: "X1",
        price: "999.99",
        year: 2023,
    },
    DemoProduct {
        product_type: ProductType::Laptop,
        brand: "Northwind",
        model: "Aero 14",
        price: "1299.00",
        year: 2024,
    },
    DemoProduct {
        product_type: ProductType::Phone,
        brand: "Globex",
        model: "G7",
        price: "649.50",
        year: 2023,
    },
    DemoProduct {
        product_type: ProductType::Tablet,
        brand: "Initech",
        model: "Slate 10",
        price: "429.00",
        year: 2022,
    },
    DemoProduct {
        product_type: ProductType::Monitor,
        brand: "Umbrella",
        model: "UltraView 27",
        price: "319.99",
        year: 2021,
    },
    DemoProduct {
        product_type: ProductType::Accessory,
        brand: "Acme",
        model: "Travel Dock",
        price: "89.90",
        year: 2024,
    },
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub inserted: usize,
    pub already_present: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}

impl VerificationResult {
    pub fn failed_checks(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter_map(|(check, passed)| (!passed).then_some(check.as_str()))
            .collect()
    }
}

/// Deterministic demo catalog used by `techstore seed` and smoke tests.
///
/// Entries are keyed by brand and model, so loading twice inserts nothing new.
pub struct DemoCatalog;

impl DemoCatalog {
    pub fn len() -> usize {
        DEMO_PRODUCTS.len()
    }

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let repository = SqlProductRepository::new(pool.clone());
        let existing = repository.find_all().await?;
        let mut result = SeedResult { inserted: 0, already_present: 0 };

        for demo in DEMO_PRODUCTS {
            if existing.iter().any(|product| matches_demo(product, demo)) {
                result.already_present += 1;
                continue;
            }
            repository.save(demo_to_product(demo)?).await?;
            result.inserted += 1;
        }

        info!(
            event_name = "db.seed.demo_catalog_loaded",
            inserted = result.inserted,
            already_present = result.already_present,
            "demo catalog loaded"
        );
        Ok(result)
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let repository = SqlProductRepository::new(pool.clone());
        let products = repository.find_all().await?;

        let checks = DEMO_PRODUCTS
            .iter()
            .map(|demo| {
                let present = products.iter().any(|product| {
                    matches_demo(product, demo)
                        && product.product_type == demo.product_type
                        && product.year == demo.year
                        && Decimal::from_str(demo.price).is_ok_and(|price| price == product.price)
                });
                (format!("{} {}", demo.brand, demo.model), present)
            })
            .collect::<Vec<_>>();

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }
}

fn matches_demo(product: &Product, demo: &DemoProduct) -> bool {
    product.brand == demo.brand && product.model == demo.model
}

fn demo_to_product(demo: &DemoProduct) -> Result<Product, RepositoryError> {
    let price = Decimal::from_str(demo.price)
        .map_err(|e| RepositoryError::Decode(format!("demo price `{}`: {e}", demo.price)))?;
    Ok(Product {
        id: None,
        product_type: demo.product_type,
        brand: demo.brand.to_string(),
        model: demo.model.to_string(),
        price,
        year: demo.year,
    })
}
