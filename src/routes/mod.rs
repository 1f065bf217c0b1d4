use axum::http::StatusCode;
use tracing::error;

use crate::db::StoreError;
use crate::lifecycle::LifecycleError;

pub mod health;
pub mod shops;
pub mod food_items;
pub mod cart;
pub mod orders;
pub mod history;
pub mod payments;
pub mod admin;
pub mod reviews;

pub type ApiError = (StatusCode, String);

// Common error mappers
pub fn internal_error<E: std::fmt::Display>(e: E) -> ApiError {
    error!(error = %e, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, format!("internal error: {e}"))
}

pub fn bad_request<M: Into<String>>(msg: M) -> ApiError {
    (StatusCode::BAD_REQUEST, msg.into())
}

pub fn not_found<M: Into<String>>(msg: M) -> ApiError {
    (StatusCode::NOT_FOUND, msg.into())
}

/// Missing rows and dangling references become 404, anything else 500.
pub fn db_error(e: sqlx::Error) -> ApiError {
    match e {
        sqlx::Error::RowNotFound => not_found("not found"),
        sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
            not_found("referenced record not found")
        }
        other => internal_error(other),
    }
}

pub fn rule_error(e: LifecycleError) -> ApiError {
    let status = match e {
        LifecycleError::InvalidTransition { .. }
        | LifecycleError::NotCancellable(_)
        | LifecycleError::GatewayMismatch(_)
        | LifecycleError::AlreadyPaid(_) => StatusCode::CONFLICT,
        LifecycleError::AmountOverflow => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, e.to_string())
}

pub fn store_error(e: StoreError) -> ApiError {
    match e {
        StoreError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        StoreError::Rule(rule) => rule_error(rule),
        StoreError::Contended(_) => (StatusCode::CONFLICT, e.to_string()),
        StoreError::Db(db) => db_error(db),
    }
}

/// Shared `limit`/`offset` clamping.
pub fn page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    (limit.unwrap_or(50).clamp(1, 500), offset.unwrap_or(0).max(0))
}

pub fn require_non_empty(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(bad_request(format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}
