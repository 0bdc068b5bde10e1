//! Catalog routes: server-rendered product listing and CRUD forms.
//!
//! HTML Endpoints:
//! - `GET  /`                     — product listing
//! - `GET  /product/new`          — empty create form
//! - `POST /product`              — create; redirects to `/` or re-renders the form
//! - `GET  /product/edit/{id}`    — edit form pre-populated from the store
//! - `POST /product/{id}`         — full replace of an existing product
//! - `GET  /product/delete/{id}`  — delete (no-op when absent), redirects to `/`
//!
//! Validation failures are answered with `200` and the same form, carrying
//! the submitted values and one message list per offending field.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Serialize;
use techstore_core::domain::product::{
    Product, ProductForm, ProductId, ProductType, ValidationErrors,
};
use techstore_core::errors::{ApplicationError, InterfaceError};
use techstore_db::repositories::{ProductRepository, RepositoryError};
use tera::{Context, Tera};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct CatalogState {
    repository: Arc<dyn ProductRepository>,
    templates: Arc<Tera>,
}

impl CatalogState {
    pub fn new(repository: Arc<dyn ProductRepository>, templates: Arc<Tera>) -> Self {
        Self { repository, templates }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Application(#[from] ApplicationError),
    #[error("template rendering failed: {0}")]
    Template(#[from] tera::Error),
}

impl From<RepositoryError> for CatalogError {
    fn from(error: RepositoryError) -> Self {
        Self::Application(error.into())
    }
}

type PageResult = Result<Response, (StatusCode, Html<String>)>;

// ---------------------------------------------------------------------------
// Templates and router
// ---------------------------------------------------------------------------

/// Builds the template set from the copies embedded at compile time.
pub fn init_templates() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("base.html", include_str!("../../../templates/catalog/base.html")),
        ("index.html", include_str!("../../../templates/catalog/index.html")),
        ("product_form.html", include_str!("../../../templates/catalog/product_form.html")),
        ("error.html", include_str!("../../../templates/catalog/error.html")),
    ])?;
    Ok(tera)
}

pub fn router(state: CatalogState) -> Router {
    Router::new()
        .route("/", get(list_products))
        .route("/product/new", get(new_product_form))
        .route("/product", post(create_product))
        .route("/product/edit/{id}", get(edit_product_form))
        .route("/product/{id}", post(update_product))
        .route("/product/delete/{id}", get(delete_product))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// View models
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ProductRow {
    id: Option<i64>,
    product_type: &'static str,
    type_label: &'static str,
    brand: String,
    model: String,
    price: String,
    year: i32,
}

impl From<&Product> for ProductRow {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.map(|id| id.0),
            product_type: product.product_type.as_str(),
            type_label: product.product_type.label(),
            brand: product.brand.clone(),
            model: product.model.clone(),
            price: format!("{:.2}", product.price),
            year: product.year,
        }
    }
}

#[derive(Debug, Serialize)]
struct TypeChoice {
    value: &'static str,
    label: &'static str,
}

fn type_choices() -> Vec<TypeChoice> {
    ProductType::ALL
        .iter()
        .map(|product_type| TypeChoice { value: product_type.as_str(), label: product_type.label() })
        .collect()
}

#[derive(Clone, Copy, Debug)]
enum FormMode {
    Create,
    Edit(ProductId),
}

impl FormMode {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Edit(_) => "edit",
        }
    }

    fn action(&self) -> String {
        match self {
            Self::Create => "/product".to_string(),
            Self::Edit(id) => format!("/product/{id}"),
        }
    }

    fn product_id(&self) -> Option<i64> {
        match self {
            Self::Create => None,
            Self::Edit(id) => Some(id.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

impl CatalogState {
    fn render_page(&self, template: &str, context: &Context) -> PageResult {
        self.templates
            .render(template, context)
            .map(|html| (StatusCode::OK, Html(html)).into_response())
            .map_err(|e| self.error_page(e))
    }

    /// Renders the product form. The type choices are supplied on every
    /// render, including re-renders after a failed submission.
    fn render_form(
        &self,
        mode: FormMode,
        form: &ProductForm,
        errors: &ValidationErrors,
    ) -> PageResult {
        let mut field_errors: BTreeMap<&str, Vec<&str>> =
            ProductForm::FIELDS.iter().map(|field| (*field, Vec::new())).collect();
        field_errors.extend(errors.by_field());

        let mut context = Context::new();
        context.insert("mode", mode.as_str());
        context.insert("action", &mode.action());
        context.insert("product_id", &mode.product_id());
        context.insert("product", form);
        context.insert("types", &type_choices());
        context.insert("errors", &field_errors);
        context.insert("error_count", &errors.len());

        self.render_page("product_form.html", &context)
    }

    fn error_page(&self, error: impl Into<CatalogError>) -> (StatusCode, Html<String>) {
        let correlation_id = Uuid::new_v4().to_string();
        let interface = match error.into() {
            CatalogError::Application(error) => error.into_interface(correlation_id.as_str()),
            CatalogError::Template(error) => {
                ApplicationError::Configuration(format!("template rendering failed: {error:?}"))
                    .into_interface(correlation_id.as_str())
            }
        };

        let status = match interface {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(
                event_name = "catalog.request.failed",
                correlation_id = %correlation_id,
                status = status.as_u16(),
                error = %interface,
                "catalog request failed"
            );
        } else {
            warn!(
                event_name = "catalog.request.rejected",
                correlation_id = %correlation_id,
                status = status.as_u16(),
                error = %interface,
                "catalog request rejected"
            );
        }

        let mut context = Context::new();
        context.insert("status", &status.as_u16());
        context.insert("reason", status.canonical_reason().unwrap_or("Error"));
        context.insert("message", interface.user_message());
        context.insert("correlation_id", &correlation_id);

        let body = self.templates.render("error.html", &context).unwrap_or_else(|render_error| {
            error!(
                event_name = "catalog.error_page.render_failed",
                correlation_id = %correlation_id,
                error = %render_error,
                "error page template failed to render"
            );
            format!("<h1>{}</h1><p>{}</p>", status, interface.user_message())
        });

        (status, Html(body))
    }
}

fn parse_product_id(raw: &str) -> Result<ProductId, ApplicationError> {
    raw.trim().parse::<i64>().map(ProductId).map_err(|_| ApplicationError::not_found("product", raw))
}

fn redirect_to_listing() -> Response {
    Redirect::to("/").into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn list_products(State(state): State<CatalogState>) -> PageResult {
    let products = state.repository.find_all().await.map_err(|e| state.error_page(e))?;
    let rows = products.iter().map(ProductRow::from).collect::<Vec<_>>();

    let mut context = Context::new();
    context.insert("products", &rows);
    state.render_page("index.html", &context)
}

async fn new_product_form(State(state): State<CatalogState>) -> PageResult {
    state.render_form(FormMode::Create, &ProductForm::default(), &ValidationErrors::default())
}

async fn create_product(
    State(state): State<CatalogState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> PageResult {
    let form = ProductForm::from_iter(pairs);
    let draft = match form.validate() {
        Ok(draft) => draft,
        Err(errors) => {
            warn!(
                event_name = "catalog.product.validation_failed",
                operation = "create",
                fields = ?errors.fields(),
                "product submission rejected"
            );
            return state.render_form(FormMode::Create, &form, &errors);
        }
    };

    let saved = state
        .repository
        .save(Product::from_draft(draft))
        .await
        .map_err(|e| state.error_page(e))?;

    info!(
        event_name = "catalog.product.created",
        product_id = saved.id.map_or(0, |id| id.0),
        product_type = %saved.product_type,
        "product created"
    );
    Ok(redirect_to_listing())
}

async fn edit_product_form(
    State(state): State<CatalogState>,
    Path(raw_id): Path<String>,
) -> PageResult {
    let id = parse_product_id(&raw_id).map_err(|e| state.error_page(e))?;
    let product = state
        .repository
        .find_by_id(id)
        .await
        .map_err(|e| state.error_page(e))?
        .ok_or_else(|| state.error_page(ApplicationError::not_found("product", id)))?;

    state.render_form(FormMode::Edit(id), &ProductForm::from(&product), &ValidationErrors::default())
}

async fn update_product(
    State(state): State<CatalogState>,
    Path(raw_id): Path<String>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> PageResult {
    let form = ProductForm::from_iter(pairs);
    let id = parse_product_id(&raw_id).map_err(|e| state.error_page(e))?;

    let draft = match form.validate() {
        Ok(draft) => draft,
        Err(errors) => {
            warn!(
                event_name = "catalog.product.validation_failed",
                operation = "update",
                product_id = id.0,
                fields = ?errors.fields(),
                "product submission rejected"
            );
            return state.render_form(FormMode::Edit(id), &form, &errors);
        }
    };

    let mut product = state
        .repository
        .find_by_id(id)
        .await
        .map_err(|e| state.error_page(e))?
        .ok_or_else(|| state.error_page(ApplicationError::not_found("product", id)))?;
    product.overlay(draft);

    let saved = state.repository.save(product).await.map_err(|e| state.error_page(e))?;

    info!(
        event_name = "catalog.product.updated",
        product_id = id.0,
        product_type = %saved.product_type,
        "product updated"
    );
    Ok(redirect_to_listing())
}

async fn delete_product(
    State(state): State<CatalogState>,
    Path(raw_id): Path<String>,
) -> PageResult {
    let Ok(id) = parse_product_id(&raw_id) else {
        debug!(raw_id = %raw_id, "ignoring delete for malformed product id");
        return Ok(redirect_to_listing());
    };

    state.repository.delete_by_id(id).await.map_err(|e| state.error_page(e))?;

    info!(event_name = "catalog.product.deleted", product_id = id.0, "product deleted");
    Ok(redirect_to_listing())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use rust_decimal::Decimal;
    use techstore_core::domain::product::{Product, ProductId, ProductType};
    use techstore_db::repositories::{
        InMemoryProductRepository, ProductRepository, SqlProductRepository,
    };
    use techstore_db::{connect_with_settings, migrations};
    use tower::ServiceExt;

    use super::{init_templates, router, CatalogState};

    const VALID_LAPTOP: &str = "productType=LAPTOP&brand=Acme&model=X1&price=999.99&year=2023";

    fn app(repository: Arc<dyn ProductRepository>) -> Router {
        let templates = Arc::new(init_templates().expect("embedded templates should parse"));
        router(CatalogState::new(repository, templates))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).expect("request")
    }

    fn form_post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    struct Reply {
        status: StatusCode,
        location: Option<String>,
        body: String,
    }

    async fn send(app: &Router, request: Request<Body>) -> Reply {
        let response = app.clone().oneshot(request).await.expect("router is infallible");
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes =
            axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("read body");
        Reply { status, location, body: String::from_utf8_lossy(&bytes).into_owned() }
    }

    async fn seeded_laptop(repository: &InMemoryProductRepository) -> Product {
        repository
            .save(Product {
                id: None,
                product_type: ProductType::Laptop,
                brand: "Acme".to_string(),
                model: "X1".to_string(),
                price: Decimal::new(99_999, 2),
                year: 2023,
            })
            .await
            .expect("seed product")
    }

    #[tokio::test]
    async fn listing_renders_empty_catalog() {
        let app = app(Arc::new(InMemoryProductRepository::default()));

        let reply = send(&app, get("/")).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.body.contains("No products in the catalog yet."));
    }

    #[tokio::test]
    async fn create_form_offers_every_product_type() {
        let app = app(Arc::new(InMemoryProductRepository::default()));

        let reply = send(&app, get("/product/new")).await;

        assert_eq!(reply.status, StatusCode::OK);
        for product_type in ProductType::ALL {
            assert!(
                reply.body.contains(&format!("value=\"{}\"", product_type.as_str())),
                "create form should offer {product_type}"
            );
        }
        assert!(reply.body.contains("action=\"/product\""));
    }

    #[tokio::test]
    async fn valid_create_persists_and_redirects_to_listing() {
        let repository = Arc::new(InMemoryProductRepository::default());
        let app = app(repository.clone());

        let reply = send(&app, form_post("/product", VALID_LAPTOP)).await;

        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(reply.location.as_deref(), Some("/"));

        let products = repository.find_all().await.expect("find all");
        assert_eq!(products.len(), 1);
        let product = &products[0];
        assert!(product.id.is_some());
        assert_eq!(product.product_type, ProductType::Laptop);
        assert_eq!(product.brand, "Acme");
        assert_eq!(product.model, "X1");
        assert_eq!(product.price, Decimal::new(99_999, 2));
        assert_eq!(product.year, 2023);

        let listing = send(&app, get("/")).await;
        assert!(listing.body.contains("Acme"));
        assert!(listing.body.contains("999.99"));
        assert!(listing.body.contains("1 product(s)"));
    }

    #[tokio::test]
    async fn negative_price_rerenders_form_with_submitted_values() {
        let repository = Arc::new(InMemoryProductRepository::default());
        let app = app(repository.clone());

        let reply = send(
            &app,
            form_post("/product", "productType=LAPTOP&brand=Acme&model=X1&price=-5&year=2023"),
        )
        .await;

        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.location.is_none(), "validation failure must not redirect");
        assert_eq!(repository.count().await.expect("count"), 0);
        assert!(reply.body.contains("value=\"Acme\""));
        assert!(reply.body.contains("value=\"X1\""));
        assert!(reply.body.contains("value=\"-5\""));
        assert!(reply.body.contains("Price must be greater than 0"));
        assert!(reply.body.contains("value=\"LAPTOP\" selected"));
        assert!(reply.body.contains("value=\"ACCESSORY\""), "type choices must be re-supplied");
    }

    #[tokio::test]
    async fn empty_submission_annotates_every_field() {
        let repository = Arc::new(InMemoryProductRepository::default());
        let app = app(repository.clone());

        let reply = send(&app, form_post("/product", "")).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body.matches("class=\"field-error\"").count(), 5);
        for message in [
            "Product Type can not be null",
            "Brand can not be null",
            "Model can not be null",
            "Price can not be null",
            "Year can not be null",
        ] {
            assert!(reply.body.contains(message), "missing message: {message}");
        }
        assert_eq!(repository.count().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn repeated_field_keeps_last_value_instead_of_rejecting_body() {
        let repository = Arc::new(InMemoryProductRepository::default());
        let app = app(repository.clone());

        let invalid = send(
            &app,
            form_post("/product", "productType=PHONE&brand=A&brand=C&model=P9&price=0&year=2021"),
        )
        .await;
        assert_eq!(invalid.status, StatusCode::OK);
        assert!(invalid.body.contains("value=\"C\""));
        assert!(invalid.body.contains("Price must be greater than 0"));

        let valid = send(
            &app,
            form_post("/product", "productType=PHONE&brand=A&brand=C&model=P9&price=10&year=2021"),
        )
        .await;
        assert_eq!(valid.status, StatusCode::SEE_OTHER);
        let products = repository.find_all().await.expect("find all");
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].brand, "C");
    }

    #[tokio::test]
    async fn sub_cent_price_is_rejected_with_form_rerender() {
        let repository = Arc::new(InMemoryProductRepository::default());
        let app = app(repository.clone());

        let reply = send(
            &app,
            form_post("/product", "productType=TABLET&brand=Acme&model=S1&price=0.001&year=2022"),
        )
        .await;

        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.body.contains("Price must have at most 2 decimal places"));
        assert!(reply.body.contains("value=\"0.001\""));
        assert_eq!(repository.count().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn submitted_text_is_html_escaped() {
        let app = app(Arc::new(InMemoryProductRepository::default()));

        let reply = send(
            &app,
            form_post(
                "/product",
                "productType=PHONE&brand=%3Cscript%3Ealert(1)%3C%2Fscript%3E&model=P&price=&year=2020",
            ),
        )
        .await;

        assert_eq!(reply.status, StatusCode::OK);
        assert!(!reply.body.contains("<script>alert(1)"));
        assert!(reply.body.contains("&lt;script&gt;"));
    }

    #[tokio::test]
    async fn edit_form_is_prepopulated_from_store() {
        let repository = Arc::new(InMemoryProductRepository::default());
        let saved = seeded_laptop(&repository).await;
        let id = saved.id.expect("id");
        let app = app(repository.clone());

        let reply = send(&app, get(&format!("/product/edit/{id}"))).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.body.contains(&format!("action=\"/product/{id}\"")));
        assert!(reply.body.contains("value=\"Acme\""));
        assert!(reply.body.contains("value=\"999.99\""));
        assert!(reply.body.contains("value=\"2023\""));
        assert!(reply.body.contains("value=\"LAPTOP\" selected"));
    }

    #[tokio::test]
    async fn edit_form_for_unknown_or_malformed_id_is_not_found() {
        let app = app(Arc::new(InMemoryProductRepository::default()));

        let missing = send(&app, get("/product/edit/41")).await;
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert!(missing.body.contains("The requested product does not exist."));

        let malformed = send(&app, get("/product/edit/abc")).await;
        assert_eq!(malformed.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn valid_update_replaces_fields_and_keeps_identity() {
        let repository = Arc::new(InMemoryProductRepository::default());
        let saved = seeded_laptop(&repository).await;
        let id = saved.id.expect("id");
        let app = app(repository.clone());

        let reply = send(
            &app,
            form_post(
                &format!("/product/{id}"),
                "productType=LAPTOP&brand=Acme&model=X1&price=1099.99&year=2023",
            ),
        )
        .await;

        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(reply.location.as_deref(), Some("/"));
        let reloaded = repository.find_by_id(id).await.expect("find").expect("still present");
        assert_eq!(reloaded, Product { price: Decimal::new(109_999, 2), ..saved });
        assert_eq!(repository.count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn invalid_update_rerenders_edit_form_and_leaves_record() {
        let repository = Arc::new(InMemoryProductRepository::default());
        let saved = seeded_laptop(&repository).await;
        let id = saved.id.expect("id");
        let app = app(repository.clone());

        let reply = send(
            &app,
            form_post(
                &format!("/product/{id}"),
                "productType=LAPTOP&brand=&model=X2&price=1099.99&year=2023",
            ),
        )
        .await;

        assert_eq!(reply.status, StatusCode::OK);
        assert!(reply.body.contains("Brand can not be null"));
        assert!(reply.body.contains("value=\"X2\""));
        assert!(reply.body.contains(&format!("action=\"/product/{id}\"")));
        assert!(reply.body.contains("value=\"TABLET\""), "type choices must be re-supplied");
        assert_eq!(repository.find_by_id(id).await.expect("find"), Some(saved));
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_not_found_and_inserts_nothing() {
        let repository = Arc::new(InMemoryProductRepository::default());
        let app = app(repository.clone());

        let reply = send(&app, form_post("/product/77", VALID_LAPTOP)).await;

        assert_eq!(reply.status, StatusCode::NOT_FOUND);
        assert_eq!(repository.count().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn delete_removes_only_the_requested_record() {
        let repository = Arc::new(InMemoryProductRepository::default());
        let first = seeded_laptop(&repository).await;
        let second = seeded_laptop(&repository).await;
        let app = app(repository.clone());

        let reply =
            send(&app, get(&format!("/product/delete/{}", first.id.expect("id")))).await;

        assert_eq!(reply.status, StatusCode::SEE_OTHER);
        assert_eq!(repository.find_all().await.expect("find all"), vec![second]);
    }

    #[tokio::test]
    async fn delete_of_unknown_id_is_a_no_op_redirect() {
        let repository = Arc::new(InMemoryProductRepository::default());
        seeded_laptop(&repository).await;
        let app = app(repository.clone());

        for uri in ["/product/delete/999", "/product/delete/not-a-number"] {
            let reply = send(&app, get(uri)).await;
            assert_eq!(reply.status, StatusCode::SEE_OTHER, "{uri} should redirect");
        }
        assert_eq!(repository.count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn create_then_update_round_trip_against_sqlite() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repository = Arc::new(SqlProductRepository::new(pool.clone()));
        let app = app(repository.clone());

        let created = send(&app, form_post("/product", VALID_LAPTOP)).await;
        assert_eq!(created.status, StatusCode::SEE_OTHER);

        let products = repository.find_all().await.expect("find all");
        assert_eq!(products.len(), 1);
        let id = products[0].id.expect("assigned id");

        let updated = send(
            &app,
            form_post(
                &format!("/product/{id}"),
                "productType=LAPTOP&brand=Acme&model=X1&price=1099.99&year=2023",
            ),
        )
        .await;
        assert_eq!(updated.status, StatusCode::SEE_OTHER);

        let reloaded = repository.find_by_id(id).await.expect("find").expect("present");
        assert_eq!(reloaded.id, Some(id));
        assert_eq!(reloaded.price, Decimal::new(109_999, 2));
        assert_eq!(reloaded.brand, "Acme");
        assert_eq!(reloaded.model, "X1");
        assert_eq!(reloaded.year, 2023);
        assert_eq!(reloaded.product_type, ProductType::Laptop);

        assert_eq!(repository.find_by_id(ProductId(id.0 + 1)).await.expect("find"), None);
        pool.close().await;
    }
}
