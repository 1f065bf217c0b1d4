// src/routes/shops.rs

use axum::{extract::{Path, Query, State}, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use sqlx::{query_as, query};
use crate::AppState;
use crate::models::Shop;
use super::{db_error, internal_error, page, require_non_empty, ApiError};

#[derive(Deserialize)]
pub struct ListQ {
    pub open: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateShopBody {
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub payment_account: Option<String>,
    #[serde(default = "default_open")] pub is_open: bool,
}
fn default_open() -> bool { true }

#[derive(Deserialize)]
pub struct PatchShopBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub payment_account: Option<String>,
    pub is_open: Option<bool>,
}

#[derive(Serialize)]
pub struct Deleted { pub deleted: bool }

pub async fn list_shops(
    State(state): State<AppState>,
    Query(q): Query<ListQ>,
) -> Result<Json<Vec<Shop>>, ApiError> {
    let (limit, offset) = page(q.limit, q.offset);
    let rows = if let Some(open) = q.open {
        query_as::<_, Shop>(
            r#"SELECT * FROM public.shops WHERE is_open = $1 ORDER BY name LIMIT $2 OFFSET $3"#
        )
        .bind(open)
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.pool).await.map_err(internal_error)?
    } else {
        query_as::<_, Shop>(
            r#"SELECT * FROM public.shops ORDER BY name LIMIT $1 OFFSET $2"#
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.pool).await.map_err(internal_error)?
    };
    Ok(Json(rows))
}

pub async fn get_shop(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Shop>, ApiError> {
    let row = query_as::<_, Shop>(
        r#"SELECT * FROM public.shops WHERE shop_id = $1"#
    )
    .bind(id)
    .fetch_one(&state.pool).await.map_err(db_error)?;
    Ok(Json(row))
}

pub async fn create_shop(
    State(state): State<AppState>,
    Json(body): Json<CreateShopBody>,
) -> Result<(StatusCode, Json<Shop>), ApiError> {
    require_non_empty("name", &body.name)?;
    let row = query_as::<_, Shop>(
        r#"
        INSERT INTO public.shops(name, description, location, contact_phone, contact_email, payment_account, is_open)
        VALUES ($1,$2,$3,$4,$5,$6,$7)
        RETURNING *
        "#
    )
    .bind(body.name.trim())
    .bind(&body.description)
    .bind(&body.location)
    .bind(&body.contact_phone)
    .bind(&body.contact_email)
    .bind(&body.payment_account)
    .bind(body.is_open)
    .fetch_one(&state.pool).await.map_err(internal_error)?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn patch_shop(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<PatchShopBody>,
) -> Result<Json<Shop>, ApiError> {
    if let Some(name) = &body.name {
        require_non_empty("name", name)?;
    }
    let row = query_as::<_, Shop>(
        r#"
        UPDATE public.shops SET
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            location = COALESCE($4, location),
            contact_phone = COALESCE($5, contact_phone),
            contact_email = COALESCE($6, contact_email),
            payment_account = COALESCE($7, payment_account),
            is_open = COALESCE($8, is_open),
            updated_at = now()
        WHERE shop_id = $1
        RETURNING *
        "#
    )
    .bind(id)
    .bind(body.name)
    .bind(body.description)
    .bind(body.location)
    .bind(body.contact_phone)
    .bind(body.contact_email)
    .bind(body.payment_account)
    .bind(body.is_open)
    .fetch_one(&state.pool).await.map_err(db_error)?;
    Ok(Json(row))
}

pub async fn delete_shop(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Deleted>, ApiError> {
    let res = query(r#"DELETE FROM public.shops WHERE shop_id = $1"#)
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(internal_error)?;
    Ok(Json(Deleted { deleted: res.rows_affected() > 0 }))
}
