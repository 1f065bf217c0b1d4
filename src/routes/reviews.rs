// src/routes/reviews.rs

use axum::{extract::{Path, State}, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use sqlx::{query, query_as};
use crate::{AppState, models::{RatingSummary, Review}};
use super::{bad_request, internal_error, not_found, require_non_empty, ApiError};

const MAX_COMMENT_LEN: usize = 1000;

#[derive(Deserialize)]
pub struct CreateReviewBody {
    pub user_id: String,
    pub food_item_id: i64,
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Serialize)]
pub struct ItemReviews {
    pub food_item_id: i64,
    pub summary: RatingSummary,
    pub reviews: Vec<Review>,
}

fn validate_review(b: &CreateReviewBody) -> Result<(), ApiError> {
    require_non_empty("user_id", &b.user_id)?;
    if !(1..=5).contains(&b.rating) {
        return Err(bad_request("rating must be between 1 and 5"));
    }
    if b.comment.as_ref().is_some_and(|c| c.chars().count() > MAX_COMMENT_LEN) {
        return Err(bad_request(format!("comment longer than {MAX_COMMENT_LEN} characters")));
    }
    Ok(())
}

pub fn rating_summary(reviews: &[Review]) -> RatingSummary {
    let count = reviews.len();
    let average = (count > 0).then(|| {
        let sum: i64 = reviews.iter().map(|r| i64::from(r.rating)).sum();
        // one decimal place, as shown on item cards
        ((sum as f64 / count as f64) * 10.0).round() / 10.0
    });
    RatingSummary { count, average }
}

/// POST /api/v1/reviews — one review per user and item; resubmitting replaces it.
pub async fn create_review(
    State(state): State<AppState>,
    Json(b): Json<CreateReviewBody>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    validate_review(&b)?;

    let exists = query_as::<_, (i64,)>(r#"SELECT food_item_id FROM public.food_items WHERE food_item_id = $1"#)
        .bind(b.food_item_id)
        .fetch_optional(&state.pool).await.map_err(internal_error)?;
    if exists.is_none() {
        return Err(not_found(format!("food item {} not found", b.food_item_id)));
    }

    let comment = b.comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
    let row = query_as::<_, Review>(
        r#"
        INSERT INTO public.reviews(user_id, food_item_id, rating, comment)
        VALUES ($1,$2,$3,$4)
        ON CONFLICT (user_id, food_item_id) DO UPDATE
           SET rating = EXCLUDED.rating,
               comment = EXCLUDED.comment,
               updated_at = now()
        RETURNING *
        "#
    )
    .bind(b.user_id.trim()).bind(b.food_item_id).bind(b.rating).bind(comment)
    .fetch_one(&state.pool).await.map_err(internal_error)?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/v1/food-items/:id/reviews
pub async fn list_item_reviews(
    State(state): State<AppState>,
    Path(food_item_id): Path<i64>,
) -> Result<Json<ItemReviews>, ApiError> {
    let reviews = query_as::<_, Review>(
        r#"SELECT * FROM public.reviews WHERE food_item_id = $1 ORDER BY updated_at DESC"#
    )
    .bind(food_item_id)
    .fetch_all(&state.pool).await.map_err(internal_error)?;

    Ok(Json(ItemReviews {
        food_item_id,
        summary: rating_summary(&reviews),
        reviews,
    }))
}

pub async fn delete_review(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let res = query(r#"DELETE FROM public.reviews WHERE review_id = $1"#)
        .bind(id).execute(&state.pool).await.map_err(internal_error)?;
    Ok(Json(serde_json::json!({ "deleted": res.rows_affected() > 0 })))
}
