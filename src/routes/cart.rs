// src/routes/cart.rs

use axum::{extract::{Path, State}, Json};
use serde::Deserialize;
use sqlx::{query, query_as, PgPool};
use crate::{AppState, lifecycle, models::{Cart, CartLine}};
use super::{bad_request, internal_error, not_found, require_non_empty, rule_error, ApiError};

#[derive(Deserialize)]
pub struct SetItemBody {
    pub food_item_id: i64,
    pub quantity: i32, // 0 removes the line
}

fn cart_total(lines: &[CartLine]) -> Result<i64, ApiError> {
    lines.iter().try_fold(0i64, |acc, l| {
        l.price_paise
            .checked_mul(i64::from(l.quantity))
            .and_then(|amount| acc.checked_add(amount))
            .ok_or_else(|| rule_error(lifecycle::LifecycleError::AmountOverflow))
    })
}

async fn load_cart(pool: &PgPool, user_id: &str) -> Result<Cart, ApiError> {
    let lines = query_as::<_, CartLine>(
        r#"
        SELECT f.food_item_id, f.shop_id, f.name, f.price_paise, f.is_available, c.quantity
        FROM public.cart_items c
        JOIN public.food_items f ON f.food_item_id = c.food_item_id
        WHERE c.user_id = $1
        ORDER BY c.added_at, f.food_item_id
        "#
    )
    .bind(user_id)
    .fetch_all(pool).await.map_err(internal_error)?;

    let total_paise = cart_total(&lines)?;
    Ok(Cart { user_id: user_id.to_string(), lines, total_paise })
}

pub async fn get_cart(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Cart>, ApiError> {
    Ok(Json(load_cart(&state.pool, &user_id).await?))
}

pub async fn set_cart_item(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(b): Json<SetItemBody>,
) -> Result<Json<Cart>, ApiError> {
    require_non_empty("user_id", &user_id)?;

    if b.quantity == 0 {
        query(r#"DELETE FROM public.cart_items WHERE user_id = $1 AND food_item_id = $2"#)
            .bind(&user_id).bind(b.food_item_id)
            .execute(&state.pool).await.map_err(internal_error)?;
        return Ok(Json(load_cart(&state.pool, &user_id).await?));
    }

    lifecycle::check_quantity(b.food_item_id, b.quantity).map_err(rule_error)?;

    let available: Option<bool> = query_as::<_, (bool,)>(
        r#"SELECT is_available FROM public.food_items WHERE food_item_id = $1"#
    )
    .bind(b.food_item_id)
    .fetch_optional(&state.pool).await.map_err(internal_error)?
    .map(|(a,)| a);

    match available {
        None => return Err(not_found(format!("food item {} not found", b.food_item_id))),
        Some(false) => return Err(bad_request(format!("food item {} is not available", b.food_item_id))),
        Some(true) => {}
    }

    query(
        r#"
        INSERT INTO public.cart_items(user_id, food_item_id, quantity)
        VALUES ($1,$2,$3)
        ON CONFLICT (user_id, food_item_id) DO UPDATE SET quantity = EXCLUDED.quantity
        "#
    )
    .bind(&user_id).bind(b.food_item_id).bind(b.quantity)
    .execute(&state.pool).await.map_err(internal_error)?;

    Ok(Json(load_cart(&state.pool, &user_id).await?))
}

pub async fn remove_cart_item(
    State(state): State<AppState>,
    Path((user_id, food_item_id)): Path<(String, i64)>,
) -> Result<Json<Cart>, ApiError> {
    query(r#"DELETE FROM public.cart_items WHERE user_id = $1 AND food_item_id = $2"#)
        .bind(&user_id).bind(food_item_id)
        .execute(&state.pool).await.map_err(internal_error)?;
    Ok(Json(load_cart(&state.pool, &user_id).await?))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let res = query(r#"DELETE FROM public.cart_items WHERE user_id = $1"#)
        .bind(&user_id)
        .execute(&state.pool).await.map_err(internal_error)?;
    Ok(Json(serde_json::json!({ "removed": res.rows_affected() })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(price: i64, qty: i32) -> CartLine {
        CartLine {
            food_item_id: 1,
            shop_id: 1,
            name: "samosa".into(),
            price_paise: price,
            is_available: true,
            quantity: qty,
        }
    }

    #[test]
    fn totals_lines() {
        assert_eq!(cart_total(&[]).unwrap(), 0);
        assert_eq!(cart_total(&[line(1500, 2), line(2000, 1)]).unwrap(), 5000);
        assert!(cart_total(&[line(i64::MAX, 2)]).is_err());
    }
}
