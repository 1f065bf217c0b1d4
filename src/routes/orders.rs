// src/routes/orders.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::query_as;
use tracing::info;

use crate::{
    db::orders::{self as store, InsertOutcome},
    lifecycle::{self, PaymentMethod, RequestedItem},
    models::{ArchiveResult, FoodItem, NewOrder, Order},
    AppState,
};
use super::{
    bad_request, internal_error, not_found, require_non_empty, rule_error, store_error, ApiError,
};

const MAX_NOTES_LEN: usize = 500;

// ─────────────────────────────────────────────────────────────────────────────
// Request models
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateOrderBody {
    pub user_id: String,
    pub items: Vec<RequestedItem>,
    pub payment_method: String,    // cod | online
    pub delivery_address: String,
    pub contact_phone: String,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct ListQ { pub user_id: String }

#[derive(Deserialize)]
pub struct CancelBody { pub user_id: String }

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Shape checks that need no database access.
fn validate_body(b: &CreateOrderBody) -> Result<PaymentMethod, ApiError> {
    require_non_empty("user_id", &b.user_id)?;
    require_non_empty("delivery_address", &b.delivery_address)?;
    require_non_empty("contact_phone", &b.contact_phone)?;
    if b.notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_LEN) {
        return Err(bad_request(format!("notes longer than {MAX_NOTES_LEN} characters")));
    }
    let method: PaymentMethod = b.payment_method.parse().map_err(rule_error)?;
    lifecycle::validate_request(&b.items).map_err(rule_error)?;
    Ok(method)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/orders
pub async fn create_order(
    State(state): State<AppState>,
    Json(b): Json<CreateOrderBody>,
) -> Result<Response, ApiError> {
    // 1) Validate the request itself
    let method = validate_body(&b)?;

    // 2) Load catalog rows for the requested items
    let ids: Vec<i64> = b.items.iter().map(|i| i.food_item_id).collect();
    let catalog = query_as::<_, FoodItem>(
        r#"SELECT * FROM public.food_items WHERE food_item_id = ANY($1)"#
    )
    .bind(&ids)
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;

    // 3) Price, split per shop, fingerprint
    let lines = lifecycle::price_items(&b.items, &catalog).map_err(rule_error)?;
    let total_paise = lifecycle::order_total(&lines).map_err(rule_error)?;
    let splits = lifecycle::payment_splits(&lines).map_err(rule_error)?;
    let shop_ids = lifecycle::shop_ids(&lines);

    // 4) Every shop involved must be open
    let closed = query_as::<_, (i64, String)>(
        r#"SELECT shop_id, name FROM public.shops WHERE shop_id = ANY($1) AND NOT is_open"#
    )
    .bind(&shop_ids)
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;
    if let Some((_, name)) = closed.first() {
        return Err(bad_request(format!("shop '{name}' is closed")));
    }

    // 5) Identifier + insert with duplicate check
    let now = Utc::now();
    let fingerprint = lifecycle::item_fingerprint(lines.iter().map(|l| (l.food_item_id, l.quantity)));
    let new = NewOrder {
        order_id: lifecycle::generate_order_id(&b.user_id, &fingerprint, now),
        user_id: b.user_id.trim().to_string(),
        items: lines,
        item_fingerprint: fingerprint,
        shop_ids,
        payment_splits: splits,
        total_paise,
        payment_method: method.as_str().to_string(),
        payment_status: method.initial_payment_status().as_str().to_string(),
        status: method.initial_status().as_str().to_string(),
        delivery_address: b.delivery_address.trim().to_string(),
        contact_phone: b.contact_phone.trim().to_string(),
        notes: b.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
    };

    let outcome = store::insert_order(&state.pool, new, state.config.duplicate_window(), now)
        .await
        .map_err(store_error)?;
    Ok(insert_response(outcome))
}

/// `201` with the new order, or `409` naming the order it duplicates.
fn insert_response(outcome: InsertOutcome) -> Response {
    match outcome {
        InsertOutcome::Created(order) => (StatusCode::CREATED, Json(order)).into_response(),
        InsertOutcome::Duplicate(existing) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "error": "duplicate order",
                "order_id": existing.order_id,
                "status": existing.status,
            })),
        )
            .into_response(),
    }
}

/// GET /api/v1/orders?user_id=
///
/// Active orders only; expired rows awaiting cleanup are hidden.
pub async fn list_orders(
    State(state): State<AppState>,
    Query(q): Query<ListQ>,
) -> Result<Json<Vec<Order>>, ApiError> {
    require_non_empty("user_id", &q.user_id)?;
    let rows = query_as::<_, Order>(
        r#"SELECT * FROM public.orders WHERE user_id = $1 ORDER BY created_at DESC"#
    )
    .bind(&q.user_id)
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;

    let now = Utc::now();
    let retention = state.config.order_retention();
    let active = rows
        .into_iter()
        .filter(|o| !lifecycle::is_expired(o.created_at, now, retention))
        .collect();
    Ok(Json(active))
}

/// GET /api/v1/orders/:order_id
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    store::fetch_order(&state.pool, &order_id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| not_found(format!("order '{order_id}' not found")))
}

/// POST /api/v1/orders/:order_id/cancel
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(b): Json<CancelBody>,
) -> Result<Json<Order>, ApiError> {
    require_non_empty("user_id", &b.user_id)?;
    let order = store::cancel_by_customer(
        &state.pool,
        &order_id,
        &b.user_id,
        state.config.status_update_retries,
    )
    .await
    .map_err(store_error)?;
    Ok(Json(order))
}

/// POST /api/v1/orders/cleanup
pub async fn cleanup_orders(
    State(state): State<AppState>,
) -> Result<Json<ArchiveResult>, ApiError> {
    let archived = store::archive_all_expired(&state.pool, state.config.order_retention(), Utc::now())
        .await
        .map_err(store_error)?;
    info!(archived, "manual cleanup finished");
    Ok(Json(ArchiveResult { archived }))
}
