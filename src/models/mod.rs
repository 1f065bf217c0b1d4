// src/models/mod.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};

// ───────────────────────────────────────
// Catalog
// ───────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Shop {
    pub shop_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub payment_account: Option<String>, // gateway account / UPI handle
    pub is_open: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FoodItem {
    pub food_item_id: i64,
    pub shop_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub price_paise: i64,
    pub image_url: Option<String>,
    pub is_veg: bool,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ───────────────────────────────────────
// Cart
// ───────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CartLine {
    pub food_item_id: i64,
    pub shop_id: i64,
    pub name: String,
    pub price_paise: i64,
    pub is_available: bool,
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Cart {
    pub user_id: String,
    pub lines: Vec<CartLine>,
    pub total_paise: i64,
}

// ───────────────────────────────────────
// Orders
// ───────────────────────────────────────

/// Snapshot of a catalog item at the time the order was priced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub food_item_id: i64,
    pub shop_id: i64,
    pub name: String,
    pub unit_price_paise: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSplit {
    pub shop_id: i64,
    pub subtotal_paise: i64,
    pub item_count: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub order_id: String,
    pub user_id: String,
    pub items: Json<Vec<OrderLine>>,
    pub item_fingerprint: String,
    pub shop_ids: Vec<i64>,
    pub payment_splits: Json<Vec<PaymentSplit>>,
    pub total_paise: i64,
    pub payment_method: String,   // cod | online
    pub payment_status: String,   // pending | awaiting | paid | failed
    pub gateway_order_id: Option<String>,
    pub payment_id: Option<String>,
    pub status: String,
    pub delivery_address: String,
    pub contact_phone: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to insert an order; produced by the create handler.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: String,
    pub user_id: String,
    pub items: Vec<OrderLine>,
    pub item_fingerprint: String,
    pub shop_ids: Vec<i64>,
    pub payment_splits: Vec<PaymentSplit>,
    pub total_paise: i64,
    pub payment_method: String,
    pub payment_status: String,
    pub status: String,
    pub delivery_address: String,
    pub contact_phone: String,
    pub notes: Option<String>,
}

impl NewOrder {
    /// Food items the order takes out of the user's cart.
    pub fn food_item_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.items.iter().map(|l| l.food_item_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderHistory {
    pub order_id: String,
    pub user_id: String,
    pub items: Json<Vec<OrderLine>>,
    pub shop_ids: Vec<i64>,
    pub payment_splits: Json<Vec<PaymentSplit>>,
    pub total_paise: i64,
    pub payment_method: String,
    pub payment_status: String,
    pub payment_id: Option<String>,
    pub final_status: String,
    pub reason: String,           // paid | expired
    pub delivery_address: String,
    pub contact_phone: String,
    pub notes: Option<String>,
    pub ordered_at: DateTime<Utc>,
    pub archived_at: DateTime<Utc>,
}

// ───────────────────────────────────────
// Reviews
// ───────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub review_id: i64,
    pub user_id: String,
    pub food_item_id: i64,
    pub rating: i32,              // 1..=5
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub count: usize,
    pub average: Option<f64>,
}

// ───────────────────────────────────────
// DTOs helpful for endpoints
// ───────────────────────────────────────
#[derive(Debug, Serialize, Deserialize)]
pub struct ArchiveResult { pub archived: u64 }

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct StatusCount { pub status: String, pub count: i64 }

#[derive(Debug, Serialize, Deserialize)]
pub struct ShopDashboard {
    pub shop_id: i64,
    pub active_orders: i64,
    pub by_status: Vec<StatusCount>,
    pub revenue_today_paise: i64,
    pub orders_today: i64,
}
