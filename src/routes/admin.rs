// src/routes/admin.rs

//! Shop staff dashboard: order queue, status changes, daily figures.

use axum::{extract::{Path, Query, State}, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::query_as;

use crate::{
    db::orders as store,
    lifecycle::{self, OrderStatus},
    models::{Order, ShopDashboard, StatusCount},
    AppState,
};
use super::{internal_error, not_found, rule_error, store_error, ApiError};

#[derive(Deserialize)]
pub struct ShopOrdersQ { pub status: Option<String> }

#[derive(Deserialize)]
pub struct StatusBody { pub status: String }

fn active_orders(counts: &[StatusCount]) -> i64 {
    counts
        .iter()
        .filter(|c| c.status.parse::<OrderStatus>().is_ok_and(|st| !st.is_terminal()))
        .map(|c| c.count)
        .sum()
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(chrono::NaiveTime::MIN).and_utc()
}

async fn ensure_shop(state: &AppState, shop_id: i64) -> Result<(), ApiError> {
    query_as::<_, (i64,)>(r#"SELECT shop_id FROM public.shops WHERE shop_id = $1"#)
        .bind(shop_id)
        .fetch_optional(&state.pool)
        .await
        .map_err(internal_error)?
        .map(|_| ())
        .ok_or_else(|| not_found(format!("shop {shop_id} not found")))
}

/// GET /api/v1/admin/shops/:shop_id/orders
///
/// Expired rows awaiting cleanup are left out, as in the customer listing.
pub async fn list_shop_orders(
    State(state): State<AppState>,
    Path(shop_id): Path<i64>,
    Query(q): Query<ShopOrdersQ>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let status = q
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(rule_error)?;

    let since = lifecycle::active_since(Utc::now(), state.config.order_retention());
    let rows = query_as::<_, Order>(
        r#"SELECT * FROM public.orders
           WHERE $1 = ANY(shop_ids)
             AND ($2::text IS NULL OR status = $2)
             AND created_at > $3
           ORDER BY created_at"#)
        .bind(shop_id).bind(status.map(OrderStatus::as_str)).bind(since)
        .fetch_all(&state.pool).await.map_err(internal_error)?;
    Ok(Json(rows))
}

/// PATCH /api/v1/admin/orders/:order_id/status
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(b): Json<StatusBody>,
) -> Result<Json<Order>, ApiError> {
    let target: OrderStatus = b.status.parse().map_err(rule_error)?;
    let order = store::update_status(&state.pool, &order_id, target, state.config.status_update_retries)
        .await
        .map_err(store_error)?;
    Ok(Json(order))
}

/// GET /api/v1/admin/shops/:shop_id/dashboard
pub async fn shop_dashboard(
    State(state): State<AppState>,
    Path(shop_id): Path<i64>,
) -> Result<Json<ShopDashboard>, ApiError> {
    ensure_shop(&state, shop_id).await?;
    let now = Utc::now();

    let by_status = query_as::<_, StatusCount>(
        r#"SELECT status, COUNT(*) AS count
           FROM public.orders
           WHERE $1 = ANY(shop_ids) AND created_at > $2
           GROUP BY status
           ORDER BY status"#
    )
    .bind(shop_id)
    .bind(lifecycle::active_since(now, state.config.order_retention()))
    .fetch_all(&state.pool).await.map_err(internal_error)?;

    // Paid orders live in both tables until archived; count them once.
    let (revenue_today_paise, orders_today): (i64, i64) = query_as(
        r#"
        SELECT COALESCE(SUM((s.split->>'subtotal_paise')::bigint), 0)::bigint,
               COUNT(DISTINCT t.order_id)
        FROM (
            SELECT order_id, payment_splits, status AS st, created_at AS at
              FROM public.orders
            UNION ALL
            SELECT h.order_id, h.payment_splits, h.final_status, h.ordered_at
              FROM public.order_history h
             WHERE NOT EXISTS (SELECT 1 FROM public.orders o WHERE o.order_id = h.order_id)
        ) t
        CROSS JOIN LATERAL jsonb_array_elements(t.payment_splits) AS s(split)
        WHERE (s.split->>'shop_id')::bigint = $1
          AND t.st NOT IN ('cancelled', 'payment_failed')
          AND t.at >= $2
        "#
    )
    .bind(shop_id)
    .bind(start_of_day(now))
    .fetch_one(&state.pool).await.map_err(internal_error)?;

    Ok(Json(ShopDashboard {
        shop_id,
        active_orders: active_orders(&by_status),
        by_status,
        revenue_today_paise,
        orders_today,
    }))
}
