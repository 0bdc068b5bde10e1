use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::DomainError;

pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 9999;
pub const MAX_PRICE_SCALE: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(pub i64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    Laptop,
    Phone,
    Tablet,
    Monitor,
    Accessory,
}

impl ProductType {
    pub const ALL: [ProductType; 5] =
        [Self::Laptop, Self::Phone, Self::Tablet, Self::Monitor, Self::Accessory];

    /// Symbolic name, used both on the wire and in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Laptop => "LAPTOP",
            Self::Phone => "PHONE",
            Self::Tablet => "TABLET",
            Self::Monitor => "MONITOR",
            Self::Accessory => "ACCESSORY",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Laptop => "Laptop",
            Self::Phone => "Phone",
            Self::Tablet => "Tablet",
            Self::Monitor => "Monitor",
            Self::Accessory => "Accessory",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == normalized)
            .ok_or_else(|| DomainError::UnknownProductType(normalized.to_string()))
    }
}

/// A catalog item. `id` is `None` until the store assigns one on first save.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: Option<ProductId>,
    pub product_type: ProductType,
    pub brand: String,
    pub model: String,
    pub price: Decimal,
    pub year: i32,
}

impl Product {
    pub fn from_draft(draft: ProductDraft) -> Self {
        Self {
            id: None,
            product_type: draft.product_type,
            brand: draft.brand,
            model: draft.model,
            price: draft.price,
            year: draft.year,
        }
    }

    /// Replaces every business field with the draft's values, keeping identity.
    pub fn overlay(&mut self, draft: ProductDraft) {
        self.product_type = draft.product_type;
        self.brand = draft.brand;
        self.model = draft.model;
        self.price = draft.price;
        self.year = draft.year;
    }
}

/// Field values that passed validation but have not been bound to an identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductDraft {
    pub product_type: ProductType,
    pub brand: String,
    pub model: String,
    pub price: Decimal,
    pub year: i32,
}

/// Raw values as submitted by the product form.
///
/// Every field is kept as text so that a missing or malformed value surfaces
/// as a field violation instead of a decoding failure, and so the form can be
/// re-rendered with exactly what the user typed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductForm {
    pub product_type: String,
    pub brand: String,
    pub model: String,
    pub price: String,
    pub year: String,
}

impl From<&Product> for ProductForm {
    fn from(product: &Product) -> Self {
        Self {
            product_type: product.product_type.as_str().to_string(),
            brand: product.brand.clone(),
            model: product.model.clone(),
            price: product.price.to_string(),
            year: product.year.to_string(),
        }
    }
}

/// Folds raw `(name, value)` pairs into a form. Unknown names are ignored and
/// a repeated name keeps its last value.
impl FromIterator<(String, String)> for ProductForm {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(pairs: I) -> Self {
        let mut form = Self::default();
        for (name, value) in pairs {
            let slot = match name.as_str() {
                "productType" => &mut form.product_type,
                "brand" => &mut form.brand,
                "model" => &mut form.model,
                "price" => &mut form.price,
                "year" => &mut form.year,
                _ => continue,
            };
            *slot = value;
        }
        form
    }
}

impl ProductForm {
    /// Submitted field names, in form order.
    pub const FIELDS: [&'static str; 5] = ["productType", "brand", "model", "price", "year"];

    /// Checks every field and reports all violations at once.
    pub fn validate(&self) -> Result<ProductDraft, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let product_type = match self.product_type.trim() {
            "" => {
                errors.push("productType", "Product Type can not be null");
                None
            }
            raw => match raw.parse::<ProductType>() {
                Ok(product_type) => Some(product_type),
                Err(_) => {
                    errors.push("productType", product_type_choices_message());
                    None
                }
            },
        };

        let brand = self.brand.trim();
        if brand.is_empty() {
            errors.push("brand", "Brand can not be null");
        }

        let model = self.model.trim();
        if model.is_empty() {
            errors.push("model", "Model can not be null");
        }

        let price = match self.price.trim() {
            "" => {
                errors.push("price", "Price can not be null");
                None
            }
            raw => match Decimal::from_str(raw) {
                Ok(price) if price <= Decimal::ZERO => {
                    errors.push("price", "Price must be greater than 0");
                    None
                }
                Ok(price) if price.normalize().scale() > MAX_PRICE_SCALE => {
                    errors.push("price", "Price must have at most 2 decimal places");
                    None
                }
                Ok(price) => Some(price),
                Err(_) => {
                    errors.push("price", "Price must be a number");
                    None
                }
            },
        };

        let year = match self.year.trim() {
            "" => {
                errors.push("year", "Year can not be null");
                None
            }
            raw => match raw.parse::<i32>() {
                Ok(year) if (MIN_YEAR..=MAX_YEAR).contains(&year) => Some(year),
                _ => {
                    errors.push("year", "Year must be a valid calendar year");
                    None
                }
            },
        };

        match (product_type, price, year) {
            (Some(product_type), Some(price), Some(year)) if errors.is_empty() => {
                Ok(ProductDraft {
                    product_type,
                    brand: brand.to_string(),
                    model: model.to_string(),
                    price,
                    year,
                })
            }
            _ => Err(errors),
        }
    }
}

fn product_type_choices_message() -> String {
    let names = ProductType::ALL.iter().map(ProductType::as_str).collect::<Vec<_>>();
    format!("Product Type must be one of {}", names.join(", "))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Error, Serialize)]
#[error("{} field(s) failed validation", .violations.len())]
pub struct ValidationErrors {
    violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.violations.push(FieldViolation { field, message: message.into() });
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn fields(&self) -> Vec<&'static str> {
        self.violations.iter().map(|violation| violation.field).collect()
    }

    /// Messages grouped per field, in the shape the form template consumes.
    pub fn by_field(&self) -> BTreeMap<&'static str, Vec<&str>> {
        let mut grouped: BTreeMap<&'static str, Vec<&str>> = BTreeMap::new();
        for violation in &self.violations {
            grouped.entry(violation.field).or_default().push(violation.message.as_str());
        }
        grouped
    }
}
