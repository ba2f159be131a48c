//! Sale and purchase handlers.
//!
//! Sales and purchases have the same shape (a product reference and a
//! quantity), so both resources are served by one implementation
//! parameterized by [`MovementKind`].
//!
//! # Endpoints
//!
//! - `POST /api/sales`, `POST /api/purchases` - Record a movement
//! - `GET /api/sales`, `GET /api/purchases` - List movements
//! - `GET /api/{sales,purchases}/{id}` - Get a movement
//! - `PUT /api/{sales,purchases}/{id}` - Replace some or all fields
//! - `DELETE /api/{sales,purchases}/{id}` - Delete a movement

use axum::{extract::State, http::StatusCode, Json};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::errors::StockroomError;
use crate::server::api_error::ApiError;
use crate::server::auth::AuthenticatedUser;
use crate::server::database::{MovementChanges, MovementKind, StockMovement};
use crate::server::extract::{ApiJson, ApiPath};
use crate::server::handlers::{AppState, DeleteResponse};
use crate::server::logging::{log_record_event, RecordEvent};
use crate::server::validation::NumericInput;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for recording or updating a sale/purchase.
///
/// Both fields are required on create; on update absent fields keep their value.
#[derive(Debug, Deserialize)]
pub struct MovementRequest {
    pub product_id: Option<NumericInput>,
    pub quantity: Option<NumericInput>,
}

/// A sale or purchase as returned by the API.
///
/// `product_name` is `null` if the product has since been removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementResponse {
    pub id: i64,
    pub product_id: i64,
    pub product_name: Option<String>,
    pub quantity: f64,
    pub created_at: NaiveDateTime,
}

impl From<StockMovement> for MovementResponse {
    fn from(movement: StockMovement) -> Self {
        Self {
            id: movement.id,
            product_id: movement.product_id,
            product_name: movement.product_name,
            quantity: movement.quantity,
            created_at: movement.created_at,
        }
    }
}

/// `{"message": ..., "sale": {...}}` or `{"message": ..., "purchase": {...}}`.
fn envelope(kind: MovementKind, message: String, movement: StockMovement) -> Json<Value> {
    Json(json!({
        "message": message,
        kind.key(): MovementResponse::from(movement),
    }))
}

fn parse_product_id(value: &NumericInput) -> Result<i64, ApiError> {
    Ok(value.to_i64("product_id")?)
}

fn parse_quantity(value: &NumericInput) -> Result<f64, ApiError> {
    Ok(value.to_f64("quantity")?)
}

/// The foreign key rejected the write: the referenced product does not exist.
fn unknown_product(e: StockroomError) -> ApiError {
    match e {
        StockroomError::ConstraintViolation(_) => {
            ApiError::invalid_field("product_id", "no product with this id")
        }
        other => other.into(),
    }
}

// ============================================================================
// Shared implementation
// ============================================================================

async fn create_movement(
    state: AppState,
    kind: MovementKind,
    user: AuthenticatedUser,
    payload: MovementRequest,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let product_id = payload
        .product_id
        .as_ref()
        .ok_or_else(|| ApiError::missing_field("product_id"))
        .and_then(parse_product_id)?;
    let quantity = payload
        .quantity
        .as_ref()
        .ok_or_else(|| ApiError::missing_field("quantity"))
        .and_then(parse_quantity)?;

    let movement = state
        .db
        .insert_movement(kind, product_id, quantity)
        .await
        .map_err(unknown_product)?;
    log_record_event(RecordEvent::Created, kind.key(), movement.id, &user.subject);

    let message = format!("{} recorded successfully", kind.label());
    Ok((StatusCode::CREATED, envelope(kind, message, movement)))
}

async fn list_movements(
    state: AppState,
    kind: MovementKind,
) -> Result<Json<Vec<MovementResponse>>, ApiError> {
    let movements = state.db.list_movements(kind).await?;
    info!("Listing {} {}", movements.len(), kind.table());

    Ok(Json(movements.into_iter().map(Into::into).collect()))
}

async fn get_movement(
    state: AppState,
    kind: MovementKind,
    id: i64,
) -> Result<Json<MovementResponse>, ApiError> {
    let movement = state
        .db
        .get_movement(kind, id)
        .await?
        .ok_or_else(|| ApiError::not_found(kind.label()))?;

    Ok(Json(movement.into()))
}

async fn update_movement(
    state: AppState,
    kind: MovementKind,
    user: AuthenticatedUser,
    id: i64,
    payload: MovementRequest,
) -> Result<Json<Value>, ApiError> {
    let changes = MovementChanges {
        product_id: payload
            .product_id
            .as_ref()
            .map(parse_product_id)
            .transpose()?,
        quantity: payload.quantity.as_ref().map(parse_quantity).transpose()?,
    };

    let movement = state
        .db
        .update_movement(kind, id, changes)
        .await
        .map_err(unknown_product)?
        .ok_or_else(|| ApiError::not_found(kind.label()))?;
    log_record_event(RecordEvent::Updated, kind.key(), id, &user.subject);

    let message = format!("{} updated successfully", kind.label());
    Ok(envelope(kind, message, movement))
}

async fn delete_movement(
    state: AppState,
    kind: MovementKind,
    user: AuthenticatedUser,
    id: i64,
) -> Result<Json<DeleteResponse>, ApiError> {
    if !state.db.delete_movement(kind, id).await? {
        return Err(ApiError::not_found(kind.label()));
    }
    log_record_event(RecordEvent::Deleted, kind.key(), id, &user.subject);

    Ok(Json(DeleteResponse {
        message: format!("{} with ID {id} deleted successfully", kind.label()),
    }))
}

// ============================================================================
// Sale handlers
// ============================================================================

/// `POST /api/sales`
pub async fn create_sale_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(payload): ApiJson<MovementRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    create_movement(state, MovementKind::Sale, user, payload).await
}

/// `GET /api/sales`
pub async fn list_sales_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<MovementResponse>>, ApiError> {
    list_movements(state, MovementKind::Sale).await
}

/// `GET /api/sales/{id}`
pub async fn get_sale_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MovementResponse>, ApiError> {
    get_movement(state, MovementKind::Sale, id).await
}

/// `PUT /api/sales/{id}`
pub async fn update_sale_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<MovementRequest>,
) -> Result<Json<Value>, ApiError> {
    update_movement(state, MovementKind::Sale, user, id, payload).await
}

/// `DELETE /api/sales/{id}`
pub async fn delete_sale_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    delete_movement(state, MovementKind::Sale, user, id).await
}

// ============================================================================
// Purchase handlers
// ============================================================================

/// `POST /api/purchases`
pub async fn create_purchase_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(payload): ApiJson<MovementRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    create_movement(state, MovementKind::Purchase, user, payload).await
}

/// `GET /api/purchases`
pub async fn list_purchases_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<MovementResponse>>, ApiError> {
    list_movements(state, MovementKind::Purchase).await
}

/// `GET /api/purchases/{id}`
pub async fn get_purchase_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MovementResponse>, ApiError> {
    get_movement(state, MovementKind::Purchase, id).await
}

/// `PUT /api/purchases/{id}`
pub async fn update_purchase_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<MovementRequest>,
) -> Result<Json<Value>, ApiError> {
    update_movement(state, MovementKind::Purchase, user, id, payload).await
}

/// `DELETE /api/purchases/{id}`
pub async fn delete_purchase_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    delete_movement(state, MovementKind::Purchase, user, id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn movement(product_name: Option<&str>) -> StockMovement {
        StockMovement {
            id: 7,
            product_id: 1,
            product_name: product_name.map(str::to_string),
            quantity: 3.0,
            created_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn envelope_uses_resource_key() {
        let Json(body) = envelope(
            MovementKind::Purchase,
            "Purchase recorded successfully".to_string(),
            movement(Some("Widget")),
        );

        assert_eq!(body["message"], "Purchase recorded successfully");
        assert_eq!(body["purchase"]["id"], 7);
        assert_eq!(body["purchase"]["product_name"], "Widget");
        assert!(body.get("sale").is_none());
    }

    #[test]
    fn missing_product_name_serializes_as_null() {
        let Json(body) = envelope(MovementKind::Sale, String::new(), movement(None));
        assert!(body["sale"]["product_name"].is_null());
    }

    #[test]
    fn foreign_key_failure_points_at_product_id() {
        let err = unknown_product(StockroomError::ConstraintViolation("FOREIGN KEY".into()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error.details, Some(json!({ "field": "product_id" })));

        let err = unknown_product(StockroomError::DatabaseError("disk I/O".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn quantity_accepts_strings() {
        assert_eq!(parse_quantity(&NumericInput::Text("2.5".into())).unwrap(), 2.5);
        assert_eq!(parse_product_id(&NumericInput::Text("4".into())).unwrap(), 4);
        assert!(parse_product_id(&NumericInput::Float(1.5)).is_err());
    }
}
