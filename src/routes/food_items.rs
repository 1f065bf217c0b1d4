// src/routes/food_items.rs

use axum::{extract::{Path, Query, State}, http::StatusCode, Json};
use serde::Deserialize;
use sqlx::{query_as, query};
use crate::{AppState, models::FoodItem};
use super::{bad_request, db_error, internal_error, page, require_non_empty, ApiError};

#[derive(Deserialize)]
pub struct ListFoodQ {
    pub shop_id: Option<i64>,
    pub category: Option<String>,
    pub q: Option<String>,
    pub available: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateFoodBody {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_category")] pub category: String,
    pub price_paise: i64,
    pub image_url: Option<String>,
    #[serde(default = "default_true")] pub is_veg: bool,
    #[serde(default = "default_true")] pub is_available: bool,
}
fn default_category() -> String { "general".into() }
fn default_true() -> bool { true }

#[derive(Deserialize)]
pub struct PatchFoodBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price_paise: Option<i64>,
    pub image_url: Option<String>,
    pub is_veg: Option<bool>,
    pub is_available: Option<bool>,
}

fn check_price(price_paise: i64) -> Result<(), ApiError> {
    if price_paise > 0 {
        Ok(())
    } else {
        Err(bad_request("price_paise must be positive"))
    }
}

pub async fn create_food_item(
    State(state): State<AppState>,
    Path(shop_id): Path<i64>,
    Json(b): Json<CreateFoodBody>,
) -> Result<(StatusCode, Json<FoodItem>), ApiError> {
    require_non_empty("name", &b.name)?;
    check_price(b.price_paise)?;

    let row = query_as::<_, FoodItem>(
        r#"
        INSERT INTO public.food_items(shop_id, name, description, category, price_paise, image_url, is_veg, is_available)
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
        RETURNING *
        "#
    )
    .bind(shop_id).bind(b.name.trim()).bind(b.description).bind(b.category.trim().to_lowercase())
    .bind(b.price_paise).bind(b.image_url).bind(b.is_veg).bind(b.is_available)
    .fetch_one(&state.pool).await.map_err(db_error)?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn list_food_items(
    State(state): State<AppState>,
    Query(q): Query<ListFoodQ>,
) -> Result<Json<Vec<FoodItem>>, ApiError> {
    let (limit, offset) = page(q.limit, q.offset);
    let category = q.category.map(|c| c.trim().to_lowercase());
    let pattern = q.q
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{s}%"));

    let rows = query_as::<_, FoodItem>(
        r#"
        SELECT * FROM public.food_items
        WHERE ($1::bigint IS NULL OR shop_id = $1)
          AND ($2::text IS NULL OR category = $2)
          AND ($3::text IS NULL OR name ILIKE $3 OR description ILIKE $3)
          AND ($4::bool IS NULL OR is_available = $4)
        ORDER BY shop_id, name
        LIMIT $5 OFFSET $6
        "#
    )
    .bind(q.shop_id).bind(category).bind(pattern).bind(q.available)
    .bind(limit).bind(offset)
    .fetch_all(&state.pool).await.map_err(internal_error)?;
    Ok(Json(rows))
}

pub async fn get_food_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<FoodItem>, ApiError> {
    let row = query_as::<_, FoodItem>(r#"SELECT * FROM public.food_items WHERE food_item_id = $1"#)
        .bind(id).fetch_one(&state.pool).await.map_err(db_error)?;
    Ok(Json(row))
}

pub async fn patch_food_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(b): Json<PatchFoodBody>,
) -> Result<Json<FoodItem>, ApiError> {
    if let Some(name) = &b.name {
        require_non_empty("name", name)?;
    }
    if let Some(price) = b.price_paise {
        check_price(price)?;
    }

    let row = query_as::<_, FoodItem>(
        r#"
        UPDATE public.food_items SET
          name = COALESCE($2, name),
          description = COALESCE($3, description),
          category = COALESCE($4, category),
          price_paise = COALESCE($5, price_paise),
          image_url = COALESCE($6, image_url),
          is_veg = COALESCE($7, is_veg),
          is_available = COALESCE($8, is_available),
          updated_at = now()
        WHERE food_item_id = $1
        RETURNING *
        "#
    )
    .bind(id).bind(b.name).bind(b.description).bind(b.category.map(|c| c.trim().to_lowercase()))
    .bind(b.price_paise).bind(b.image_url).bind(b.is_veg).bind(b.is_available)
    .fetch_one(&state.pool).await.map_err(db_error)?;
    Ok(Json(row))
}

pub async fn delete_food_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let res = query(r#"DELETE FROM public.food_items WHERE food_item_id = $1"#)
        .bind(id).execute(&state.pool).await.map_err(internal_error)?;
    Ok(Json(serde_json::json!({ "deleted": res.rows_affected() > 0 })))
}
