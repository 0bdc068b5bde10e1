pub mod config;
pub mod domain;
pub mod errors;

pub use domain::product::{
    FieldViolation, Product, ProductDraft, ProductForm, ProductId, ProductType, ValidationErrors,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
