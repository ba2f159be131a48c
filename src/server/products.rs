//! Product handlers.
//!
//! # Endpoints
//!
//! - `POST /api/products` - Add a product
//! - `GET /api/products` - List products
//! - `GET /api/products/{id}` - Get a product
//! - `PUT /api/products/{id}` - Replace some or all of a product's fields
//! - `DELETE /api/products/{id}` - Delete a product

use axum::{extract::State, http::StatusCode, Json};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::StockroomError;
use crate::server::api_error::ApiError;
use crate::server::auth::AuthenticatedUser;
use crate::server::database::{Product, ProductChanges};
use crate::server::extract::{ApiJson, ApiPath};
use crate::server::handlers::{AppState, DeleteResponse};
use crate::server::logging::{log_record_event, RecordEvent};
use crate::server::validation::{validate_price, validate_product_name, NumericInput};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for adding a product.
#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: Option<String>,
    pub price: Option<NumericInput>,
}

/// Request body for updating a product. Absent fields keep their value.
#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub price: Option<NumericInput>,
}

/// A product as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub created_at: NaiveDateTime,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            price: product.price,
            created_at: product.created_at,
        }
    }
}

/// Response for add and update.
#[derive(Debug, Serialize)]
pub struct ProductEnvelope {
    pub message: String,
    pub product: ProductResponse,
}

fn parse_name(name: &str) -> Result<String, ApiError> {
    let name = name.trim();
    validate_product_name(name, "name")?;
    Ok(name.to_string())
}

fn parse_price(price: &NumericInput) -> Result<f64, ApiError> {
    let price = price.to_f64("price")?;
    validate_price(price, "price")?;
    Ok(price)
}

// ============================================================================
// Handlers
// ============================================================================

/// Add a product.
///
/// `POST /api/products`
pub async fn create_product_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(payload): ApiJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductEnvelope>), ApiError> {
    let name = payload
        .name
        .as_deref()
        .ok_or_else(|| ApiError::missing_field("name"))
        .and_then(parse_name)?;
    let price = payload
        .price
        .as_ref()
        .ok_or_else(|| ApiError::missing_field("price"))
        .and_then(parse_price)?;

    let product = state.db.insert_product(&name, price).await?;
    log_record_event(RecordEvent::Created, "product", product.id, &user.subject);

    Ok((
        StatusCode::CREATED,
        Json(ProductEnvelope {
            message: "Product added successfully".to_string(),
            product: product.into(),
        }),
    ))
}

/// List all products.
///
/// `GET /api/products`
pub async fn list_products_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state.db.list_products().await?;
    info!("Listing {} products", products.len());

    Ok(Json(products.into_iter().map(Into::into).collect()))
}

/// Get a product by id.
///
/// `GET /api/products/{id}`
pub async fn get_product_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state
        .db
        .get_product(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product"))?;

    Ok(Json(product.into()))
}

/// Update a product. Only the fields present in the body change.
///
/// `PUT /api/products/{id}`
pub async fn update_product_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UpdateProductRequest>,
) -> Result<Json<ProductEnvelope>, ApiError> {
    let changes = ProductChanges {
        name: payload.name.as_deref().map(parse_name).transpose()?,
        price: payload.price.as_ref().map(parse_price).transpose()?,
    };

    let product = state
        .db
        .update_product(id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("Product"))?;
    log_record_event(RecordEvent::Updated, "product", id, &user.subject);

    Ok(Json(ProductEnvelope {
        message: "Product updated successfully".to_string(),
        product: product.into(),
    }))
}

/// Delete a product.
///
/// `DELETE /api/products/{id}`
///
/// A product that still has sales or purchases is not deleted; the request
/// fails with 409 so no movement is left pointing at a missing product.
pub async fn delete_product_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = state.db.delete_product(id).await.map_err(|e| match e {
        StockroomError::ConstraintViolation(_) => {
            ApiError::conflict(format!("Product {id} still has sales or purchases"))
        }
        other => other.into(),
    })?;

    if !deleted {
        return Err(ApiError::not_found("Product"));
    }
    log_record_event(RecordEvent::Deleted, "product", id, &user.subject);

    Ok(Json(DeleteResponse {
        message: format!("Product with ID {id} deleted successfully"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_name_trims() {
        assert_eq!(parse_name("  Widget ").unwrap(), "Widget");
        assert!(parse_name("   ").is_err());
    }

    #[test]
    fn parse_price_rejects_negative_and_text() {
        assert_eq!(parse_price(&NumericInput::Float(9.99)).unwrap(), 9.99);
        assert_eq!(
            parse_price(&NumericInput::Text("4.50".to_string())).unwrap(),
            4.5
        );
        assert!(parse_price(&NumericInput::Integer(-1)).is_err());
        assert!(parse_price(&NumericInput::Text("cheap".to_string())).is_err());
    }
}
