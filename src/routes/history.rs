// src/routes/history.rs

use axum::{extract::{Path, Query, State}, Json};
use serde::Deserialize;
use sqlx::query_as;
use crate::{AppState, models::OrderHistory};
use super::{db_error, internal_error, page, require_non_empty, ApiError};

#[derive(Deserialize)]
pub struct ListHistoryQ {
    pub user_id: String,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_history(
    State(state): State<AppState>,
    Query(q): Query<ListHistoryQ>,
) -> Result<Json<Vec<OrderHistory>>, ApiError> {
    require_non_empty("user_id", &q.user_id)?;
    let (limit, offset) = page(q.limit, q.offset);
    let rows = query_as::<_, OrderHistory>(
        r#"SELECT * FROM public.order_history
           WHERE user_id = $1
           ORDER BY ordered_at DESC
           LIMIT $2 OFFSET $3"#
    )
    .bind(&q.user_id).bind(limit).bind(offset)
    .fetch_all(&state.pool).await.map_err(internal_error)?;
    Ok(Json(rows))
}

pub async fn get_history(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<OrderHistory>, ApiError> {
    let row = query_as::<_, OrderHistory>(r#"SELECT * FROM public.order_history WHERE order_id = $1"#)
        .bind(&order_id)
        .fetch_one(&state.pool).await.map_err(db_error)?;
    Ok(Json(row))
}
