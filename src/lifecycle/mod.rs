// src/lifecycle/mod.rs

//! Order lifecycle rules.
//!
//! Everything here is synchronous and free of I/O: identifier generation,
//! pricing against the catalog, payment splits, the duplicate heuristic,
//! the status machine, expiry and payment signatures. The `db` layer and
//! the route handlers call into these rules and persist the results.

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod dedupe;
pub mod ids;
pub mod payment;
pub mod pricing;
pub mod status;

pub use dedupe::{find_duplicate, DuplicateProbe};
pub use ids::{generate_order_id, item_fingerprint};
pub use payment::{capture_payment, sign_payment, verify_payment_signature, PaymentCapture};
pub use pricing::{
    check_quantity, order_total, payment_splits, price_items, shop_ids, validate_request,
    RequestedItem, MAX_LINE_QUANTITY,
};
pub use status::OrderStatus;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("order has no items")]
    EmptyOrder,

    #[error("invalid quantity {quantity} for food item {food_item_id}")]
    InvalidQuantity { food_item_id: i64, quantity: i32 },

    #[error("unknown food item {0}")]
    UnknownItem(i64),

    #[error("food item {0} is not available")]
    ItemUnavailable(i64),

    #[error("order amount overflow")]
    AmountOverflow,

    #[error("unknown order status '{0}'")]
    UnknownStatus(String),

    #[error("cannot move order from '{from}' to '{to}'")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("order in status '{0}' can no longer be cancelled")]
    NotCancellable(OrderStatus),

    #[error("unknown payment method '{0}'")]
    UnknownPaymentMethod(String),

    #[error("payment signature mismatch")]
    InvalidSignature,

    #[error("order '{0}' belongs to a different gateway order")]
    GatewayMismatch(String),

    #[error("order '{0}' is already paid")]
    AlreadyPaid(String),
}

// ───────────────────────────────────────
// Payment method / status
// ───────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    CashOnDelivery,
    Online,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "cod",
            PaymentMethod::Online => "online",
        }
    }

    /// Status a freshly placed order starts in.
    pub fn initial_status(self) -> OrderStatus {
        match self {
            PaymentMethod::CashOnDelivery => OrderStatus::Placed,
            PaymentMethod::Online => OrderStatus::PendingPayment,
        }
    }

    pub fn initial_payment_status(self) -> PaymentStatus {
        match self {
            PaymentMethod::CashOnDelivery => PaymentStatus::Pending,
            PaymentMethod::Online => PaymentStatus::Awaiting,
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cod" | "cash" => Ok(PaymentMethod::CashOnDelivery),
            "online" => Ok(PaymentMethod::Online),
            _ => Err(LifecycleError::UnknownPaymentMethod(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Awaiting,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Awaiting => "awaiting",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ───────────────────────────────────────
// Expiry
// ───────────────────────────────────────

/// An active order is expired once it has lived for `retention` or longer.
pub fn is_expired(created_at: DateTime<Utc>, now: DateTime<Utc>, retention: Duration) -> bool {
    now - created_at >= retention
}

/// Orders created after this instant are still active.
pub fn active_since(now: DateTime<Utc>, retention: Duration) -> DateTime<Utc> {
    now - retention
}
