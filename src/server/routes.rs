use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::server::auth::require_auth;
use crate::server::handlers::{health_handler, AppState};
use crate::server::logging::request_logging_middleware;
use crate::server::movements::{
    create_purchase_handler, create_sale_handler, delete_purchase_handler, delete_sale_handler,
    get_purchase_handler, get_sale_handler, list_purchases_handler, list_sales_handler,
    update_purchase_handler, update_sale_handler,
};
use crate::server::products::{
    create_product_handler, delete_product_handler, get_product_handler, list_products_handler,
    update_product_handler,
};
use crate::server::users::{list_users_handler, login_handler, register_handler};

/// Build the application router for the Stockroom server.
///
/// Authentication policy lives here and nowhere else: the routes in the
/// public group are open, every route in the protected group sits behind
/// [`require_auth`].
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Liveness and database probe
/// - `POST /api/register` - Create an account
/// - `POST /api/login` - Obtain a token
///
/// ## Protected (Bearer token)
/// - `GET|POST /api/products`, `GET|PUT|DELETE /api/products/{id}`
/// - `GET|POST /api/sales`, `GET|PUT|DELETE /api/sales/{id}`
/// - `GET|POST /api/purchases`, `GET|PUT|DELETE /api/purchases/{id}`
/// - `GET /api/users` - List accounts
pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health_handler))
        .route("/api/register", post(register_handler))
        .route("/api/login", post(login_handler));

    let protected = Router::new()
        // Products
        .route(
            "/api/products",
            get(list_products_handler).post(create_product_handler),
        )
        .route(
            "/api/products/:id",
            get(get_product_handler)
                .put(update_product_handler)
                .delete(delete_product_handler),
        )
        // Sales
        .route(
            "/api/sales",
            get(list_sales_handler).post(create_sale_handler),
        )
        .route(
            "/api/sales/:id",
            get(get_sale_handler)
                .put(update_sale_handler)
                .delete(delete_sale_handler),
        )
        // Purchases
        .route(
            "/api/purchases",
            get(list_purchases_handler).post(create_purchase_handler),
        )
        .route(
            "/api/purchases/:id",
            get(get_purchase_handler)
                .put(update_purchase_handler)
                .delete(delete_purchase_handler),
        )
        // Users
        .route("/api/users", get(list_users_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    public
        .merge(protected)
        .layer(middleware::from_fn(request_logging_middleware))
        .with_state(state)
}
