// src/lib.rs

use std::sync::Arc;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use sqlx::PgPool;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod cleanup;
pub mod config;
pub mod db;
pub mod lifecycle;
pub mod models;
pub mod routes;

use config::Config;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        Self { pool, config: Arc::new(config) }
    }
}

pub fn app(state: AppState) -> Router {
    // Very permissive CORS; the storefront is served from another origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // health
        .route("/health", get(routes::health::health))
        // shops
        .route(
            "/api/v1/shops",
            post(routes::shops::create_shop).get(routes::shops::list_shops),
        )
        .route(
            "/api/v1/shops/:id",
            get(routes::shops::get_shop)
                .patch(routes::shops::patch_shop)
                .delete(routes::shops::delete_shop),
        )
        // food items
        .route(
            "/api/v1/shops/:id/food-items",
            post(routes::food_items::create_food_item),
        )
        .route("/api/v1/food-items", get(routes::food_items::list_food_items))
        .route(
            "/api/v1/food-items/:id",
            get(routes::food_items::get_food_item)
                .patch(routes::food_items::patch_food_item)
                .delete(routes::food_items::delete_food_item),
        )
        // cart
        .route(
            "/api/v1/cart/:user_id",
            get(routes::cart::get_cart).delete(routes::cart::clear_cart),
        )
        .route("/api/v1/cart/:user_id/items", put(routes::cart::set_cart_item))
        .route(
            "/api/v1/cart/:user_id/items/:food_item_id",
            delete(routes::cart::remove_cart_item),
        )
        // orders
        .route(
            "/api/v1/orders",
            post(routes::orders::create_order).get(routes::orders::list_orders),
        )
        .route("/api/v1/orders/cleanup", post(routes::orders::cleanup_orders))
        .route("/api/v1/orders/:order_id", get(routes::orders::get_order))
        .route("/api/v1/orders/:order_id/cancel", post(routes::orders::cancel_order))
        // order history
        .route("/api/v1/order-history", get(routes::history::list_history))
        .route("/api/v1/order-history/:order_id", get(routes::history::get_history))
        // payments
        .route("/api/v1/payments/verify", post(routes::payments::verify_payment))
        .route("/api/v1/payments/failure", post(routes::payments::payment_failed))
        // admin dashboard
        .route(
            "/api/v1/admin/shops/:shop_id/orders",
            get(routes::admin::list_shop_orders),
        )
        .route(
            "/api/v1/admin/shops/:shop_id/dashboard",
            get(routes::admin::shop_dashboard),
        )
        .route(
            "/api/v1/admin/orders/:order_id/status",
            patch(routes::admin::update_order_status),
        )
        // reviews
        .route("/api/v1/reviews", post(routes::reviews::create_review))
        .route("/api/v1/reviews/:id", delete(routes::reviews::delete_review))
        .route(
            "/api/v1/food-items/:id/reviews",
            get(routes::reviews::list_item_reviews),
        )
        // state & middleware
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
