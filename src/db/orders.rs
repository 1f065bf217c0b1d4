// src/db/orders.rs

//! Order persistence: creation with duplicate checks, guarded status
//! changes, payment capture and archiving into `order_history`.

use std::future::Future;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use sqlx::{query, query_as, types::Json, PgConnection, PgPool};
use tracing::{debug, info, warn};

use super::StoreError;
use crate::lifecycle::{
    capture_payment, find_duplicate, DuplicateProbe, OrderStatus, PaymentCapture, PaymentStatus,
};
use crate::models::{NewOrder, Order};

/// Upper bound on rows moved by one archive pass.
const ARCHIVE_BATCH: i64 = 500;

#[derive(Debug)]
pub enum InsertOutcome {
    Created(Order),
    Duplicate(Order),
}

pub async fn fetch_order(pool: &PgPool, order_id: &str) -> Result<Option<Order>, sqlx::Error> {
    query_as::<_, Order>(r#"SELECT * FROM public.orders WHERE order_id = $1"#)
        .bind(order_id)
        .fetch_optional(pool)
        .await
}

/// Inserts `new` unless the user submitted the same order within `window`.
///
/// The per-user advisory lock serialises concurrent submissions from one
/// user, so two identical requests cannot both pass the duplicate check.
/// Ordered items are removed from the user's cart in the same transaction.
pub async fn insert_order(
    pool: &PgPool,
    new: NewOrder,
    window: Duration,
    now: DateTime<Utc>,
) -> Result<InsertOutcome, StoreError> {
    let mut tx = pool.begin().await?;

    query(r#"SELECT pg_advisory_xact_lock(hashtext($1))"#)
        .bind(&new.user_id)
        .execute(&mut *tx)
        .await?;

    let recent = query_as::<_, Order>(
        r#"SELECT * FROM public.orders
           WHERE user_id = $1 AND created_at >= $2
           ORDER BY created_at DESC"#,
    )
    .bind(&new.user_id)
    .bind(now - window)
    .fetch_all(&mut *tx)
    .await?;

    let probe = DuplicateProbe {
        user_id: &new.user_id,
        item_fingerprint: &new.item_fingerprint,
        total_paise: new.total_paise,
    };
    if let Some(existing) = find_duplicate(&probe, &recent, window, now) {
        let existing = existing.clone();
        tx.rollback().await?;
        info!(user_id = %new.user_id, existing = %existing.order_id, "duplicate order submission");
        return Ok(InsertOutcome::Duplicate(existing));
    }

    let food_ids = new.food_item_ids();

    let row = query_as::<_, Order>(
        r#"
        INSERT INTO public.orders
          (order_id, user_id, items, item_fingerprint, shop_ids, payment_splits, total_paise,
           payment_method, payment_status, status, delivery_address, contact_phone, notes,
           created_at, updated_at)
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$14)
        RETURNING *
        "#,
    )
    .bind(&new.order_id)
    .bind(&new.user_id)
    .bind(Json(new.items))
    .bind(&new.item_fingerprint)
    .bind(&new.shop_ids)
    .bind(Json(new.payment_splits))
    .bind(new.total_paise)
    .bind(&new.payment_method)
    .bind(&new.payment_status)
    .bind(&new.status)
    .bind(&new.delivery_address)
    .bind(&new.contact_phone)
    .bind(&new.notes)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    query(r#"DELETE FROM public.cart_items WHERE user_id = $1 AND food_item_id = ANY($2)"#)
        .bind(&row.user_id)
        .bind(&food_ids)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!(order_id = %row.order_id, user_id = %row.user_id, total_paise = row.total_paise, "order created");
    Ok(InsertOutcome::Created(row))
}

/// Runs `attempt` until it yields a value, at most `attempts` times, backing
/// off 50 ms per attempt in between. `Ok(None)` means every attempt lost.
async fn with_retries<T, F, Fut>(attempts: u32, mut attempt: F) -> Result<Option<T>, StoreError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, StoreError>>,
{
    let attempts = attempts.max(1);
    for n in 1..=attempts {
        if let Some(done) = attempt(n).await? {
            return Ok(Some(done));
        }
        if n < attempts {
            tokio::time::sleep(StdDuration::from_millis(50 * u64::from(n))).await;
        }
    }
    Ok(None)
}

/// Compare-and-set status change.
///
/// `decide` sees the freshly read order and returns the target status (or
/// refuses). The update only applies if the status is still what `decide`
/// saw; otherwise the order is re-read and `decide` runs again, up to
/// `attempts` times.
pub async fn transition_order<F>(
    pool: &PgPool,
    order_id: &str,
    attempts: u32,
    decide: F,
) -> Result<Order, StoreError>
where
    F: Fn(&Order) -> Result<OrderStatus, StoreError>,
{
    let decide = &decide;
    let updated = with_retries(attempts, |attempt| async move {
        let current = fetch_order(pool, order_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(order_id.to_string()))?;
        let target = decide(&current)?;

        let row = query_as::<_, Order>(
            r#"
            UPDATE public.orders SET
              status = $2,
              payment_status = CASE
                WHEN $2 = 'payment_failed' THEN 'failed'
                WHEN $2 = 'delivered' AND payment_method = 'cod' THEN 'paid'
                ELSE payment_status
              END,
              updated_at = now()
            WHERE order_id = $1 AND status = $3
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(target.as_str())
        .bind(&current.status)
        .fetch_optional(pool)
        .await?;

        match &row {
            Some(row) => info!(order_id, from = %current.status, to = %row.status, "order status updated"),
            None => warn!(order_id, attempt, "order status changed concurrently, retrying"),
        }
        Ok::<_, StoreError>(row)
    })
    .await?;

    updated.ok_or_else(|| StoreError::Contended(order_id.to_string()))
}

/// Staff-driven status change validated against the status machine.
///
/// Placing an unpaid online order is left to [`mark_paid`].
pub async fn update_status(
    pool: &PgPool,
    order_id: &str,
    target: OrderStatus,
    attempts: u32,
) -> Result<Order, StoreError> {
    transition_order(pool, order_id, attempts, |order| {
        let from: OrderStatus = order.status.parse()?;
        Ok(from.staff_transition(target)?)
    })
    .await
}

/// Customer cancellation; only the owner may cancel, and only early on.
pub async fn cancel_by_customer(
    pool: &PgPool,
    order_id: &str,
    user_id: &str,
    attempts: u32,
) -> Result<Order, StoreError> {
    transition_order(pool, order_id, attempts, |order| {
        if order.user_id != user_id {
            // not revealing other users' orders
            return Err(StoreError::NotFound(order.order_id.clone()));
        }
        let from: OrderStatus = order.status.parse()?;
        Ok(from.cancel_by_customer()?)
    })
    .await
}

pub async fn mark_payment_failed(
    pool: &PgPool,
    order_id: &str,
    attempts: u32,
) -> Result<Order, StoreError> {
    update_status(pool, order_id, OrderStatus::PaymentFailed, attempts).await
}

/// Records a verified online payment and writes the `paid` history record.
///
/// Replaying the same payment returns the order unchanged.
pub async fn mark_paid(
    pool: &PgPool,
    order_id: &str,
    gateway_order_id: &str,
    payment_id: &str,
    now: DateTime<Utc>,
) -> Result<Order, StoreError> {
    let mut tx = pool.begin().await?;

    let order = query_as::<_, Order>(r#"SELECT * FROM public.orders WHERE order_id = $1 FOR UPDATE"#)
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(order_id.to_string()))?;

    let to = match capture_payment(&order, gateway_order_id, payment_id)? {
        PaymentCapture::Replay => {
            debug!(order_id, payment_id, "payment already recorded");
            return Ok(order);
        }
        PaymentCapture::Apply(to) => to,
    };

    let paid = query_as::<_, Order>(
        r#"
        UPDATE public.orders SET
          status = $2,
          payment_status = $3,
          payment_id = $4,
          gateway_order_id = COALESCE(gateway_order_id, $5),
          updated_at = now()
        WHERE order_id = $1
        RETURNING *
        "#,
    )
    .bind(order_id)
    .bind(to.as_str())
    .bind(PaymentStatus::Paid.as_str())
    .bind(payment_id)
    .bind(gateway_order_id)
    .fetch_one(&mut *tx)
    .await?;

    upsert_history(&mut *tx, &paid, "paid", now).await?;
    tx.commit().await?;

    info!(order_id, payment_id, "online payment recorded");
    Ok(paid)
}

/// Moves orders older than `retention` into `order_history`.
///
/// Rows locked by an in-flight update are skipped and picked up next pass.
pub async fn archive_expired(
    pool: &PgPool,
    retention: Duration,
    now: DateTime<Utc>,
) -> Result<u64, StoreError> {
    let mut tx = pool.begin().await?;

    let expired = query_as::<_, Order>(
        r#"
        SELECT * FROM public.orders
        WHERE created_at <= $1
        ORDER BY created_at
        LIMIT $2
        FOR UPDATE SKIP LOCKED
        "#,
    )
    .bind(now - retention)
    .bind(ARCHIVE_BATCH)
    .fetch_all(&mut *tx)
    .await?;

    if expired.is_empty() {
        tx.rollback().await?;
        return Ok(0);
    }

    for order in &expired {
        upsert_history(&mut *tx, order, "expired", now).await?;
    }

    let ids: Vec<String> = expired.iter().map(|o| o.order_id.clone()).collect();
    let res = query(r#"DELETE FROM public.orders WHERE order_id = ANY($1)"#)
        .bind(&ids)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!(archived = res.rows_affected(), "archived expired orders");
    Ok(res.rows_affected())
}

/// Archives every expired order, one batch per transaction, until a pass
/// finds nothing left.
pub async fn archive_all_expired(
    pool: &PgPool,
    retention: Duration,
    now: DateTime<Utc>,
) -> Result<u64, StoreError> {
    drain_batches(|| archive_expired(pool, retention, now)).await
}

async fn drain_batches<F, Fut>(mut pass: F) -> Result<u64, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<u64, StoreError>>,
{
    let mut total = 0;
    loop {
        match pass().await? {
            0 => return Ok(total),
            n => total += n,
        }
    }
}

async fn upsert_history(
    conn: &mut PgConnection,
    order: &Order,
    reason: &str,
    at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    query(
        r#"
        INSERT INTO public.order_history
          (order_id, user_id, items, shop_ids, payment_splits, total_paise, payment_method,
           payment_status, payment_id, final_status, reason, delivery_address, contact_phone,
           notes, ordered_at, archived_at)
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16)
        ON CONFLICT (order_id) DO UPDATE SET
          payment_status = EXCLUDED.payment_status,
          payment_id     = COALESCE(EXCLUDED.payment_id, order_history.payment_id),
          final_status   = EXCLUDED.final_status,
          reason         = EXCLUDED.reason,
          archived_at    = EXCLUDED.archived_at
        "#,
    )
    .bind(&order.order_id)
    .bind(&order.user_id)
    .bind(&order.items)
    .bind(&order.shop_ids)
    .bind(&order.payment_splits)
    .bind(order.total_paise)
    .bind(&order.payment_method)
    .bind(&order.payment_status)
    .bind(&order.payment_id)
    .bind(&order.status)
    .bind(reason)
    .bind(&order.delivery_address)
    .bind(&order.contact_phone)
    .bind(&order.notes)
    .bind(order.created_at)
    .bind(at)
    .execute(conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_until_an_attempt_wins() {
        let calls = AtomicU32::new(0);
        let out = with_retries(3, |n| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(if n == 3 { Some(n) } else { None }) }
        })
        .await
        .unwrap();
        assert_eq!(out, Some(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_last_attempt() {
        let calls = AtomicU32::new(0);
        let out: Option<u32> = with_retries(2, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(None) }
        })
        .await
        .unwrap();
        assert_eq!(out, None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn refusal_stops_retrying() {
        let calls = AtomicU32::new(0);
        let out: Result<Option<u32>, StoreError> = with_retries(5, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(StoreError::NotFound("ORD-X".into())) }
        })
        .await;
        assert!(matches!(out, Err(StoreError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let out = with_retries(0, |n| async move { Ok(Some(n)) }).await.unwrap();
        assert_eq!(out, Some(1));
    }

    #[tokio::test]
    async fn drains_batches_until_empty() {
        let mut batches = vec![ARCHIVE_BATCH as u64, ARCHIVE_BATCH as u64, 12, 0, 7].into_iter();
        let total = drain_batches(|| {
            let n = batches.next().unwrap_or(0);
            async move { Ok(n) }
        })
        .await
        .unwrap();
        assert_eq!(total, 2 * ARCHIVE_BATCH as u64 + 12);
        assert_eq!(batches.next(), Some(7));
    }
}
