// src/routes/payments.rs

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Deserialize;
use tracing::warn;

use crate::{db::orders as store, lifecycle, models::Order, AppState};
use super::{require_non_empty, rule_error, store_error, ApiError};

/// Gateway checkout callback, forwarded by the storefront.
#[derive(Deserialize)]
pub struct VerifyBody {
    pub order_id: String,
    pub gateway_order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Deserialize)]
pub struct FailureBody {
    pub order_id: String,
    pub reason: Option<String>,
}

/// POST /api/v1/payments/verify
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(b): Json<VerifyBody>,
) -> Result<Json<Order>, ApiError> {
    require_non_empty("order_id", &b.order_id)?;
    require_non_empty("gateway_order_id", &b.gateway_order_id)?;
    require_non_empty("payment_id", &b.payment_id)?;

    // Signature first: nothing is read or written for forged callbacks
    lifecycle::verify_payment_signature(
        &b.gateway_order_id,
        &b.payment_id,
        &b.signature,
        &state.config.payment_key_secret,
    )
    .map_err(|e| {
        warn!(order_id = %b.order_id, payment_id = %b.payment_id, "rejected payment signature");
        rule_error(e)
    })?;

    let order = store::mark_paid(&state.pool, &b.order_id, &b.gateway_order_id, &b.payment_id, Utc::now())
        .await
        .map_err(store_error)?;
    Ok(Json(order))
}

/// POST /api/v1/payments/failure
pub async fn payment_failed(
    State(state): State<AppState>,
    Json(b): Json<FailureBody>,
) -> Result<Json<Order>, ApiError> {
    require_non_empty("order_id", &b.order_id)?;
    warn!(
        order_id = %b.order_id,
        reason = b.reason.as_deref().unwrap_or("unspecified"),
        "payment failed"
    );
    let order = store::mark_payment_failed(&state.pool, &b.order_id, state.config.status_update_retries)
        .await
        .map_err(store_error)?;
    Ok(Json(order))
}
