// src/lifecycle/dedupe.rs

use chrono::{DateTime, Duration, Utc};

use super::OrderStatus;
use crate::models::Order;

/// What a new submission is compared on.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateProbe<'a> {
    pub user_id: &'a str,
    pub item_fingerprint: &'a str,
    pub total_paise: i64,
}

/// Returns the id of a recent order that looks like the same submission.
///
/// Same user, same items, same total, not void, created no earlier than
/// `window` before `now`. Orders stamped after `now` also match: a racing
/// submission may commit between reading the clock and taking the user lock.
/// The newest match wins.
pub fn find_duplicate<'o>(
    probe: &DuplicateProbe<'_>,
    recent: &'o [Order],
    window: Duration,
    now: DateTime<Utc>,
) -> Option<&'o Order> {
    recent
        .iter()
        .filter(|o| o.user_id == probe.user_id)
        .filter(|o| o.item_fingerprint == probe.item_fingerprint)
        .filter(|o| o.total_paise == probe.total_paise)
        .filter(|o| {
            o.status
                .parse::<OrderStatus>()
                .map(|st| !st.is_void())
                .unwrap_or(true)
        })
        .filter(|o| now - o.created_at <= window)
        .max_by_key(|o| o.created_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderLine, PaymentSplit};
    use sqlx::types::Json;

    fn order(id: &str, user: &str, fp: &str, total: i64, status: &str, created_at: DateTime<Utc>) -> Order {
        Order {
            order_id: id.into(),
            user_id: user.into(),
            items: Json(Vec::<OrderLine>::new()),
            item_fingerprint: fp.into(),
            shop_ids: vec![1],
            payment_splits: Json(Vec::<PaymentSplit>::new()),
            total_paise: total,
            payment_method: "cod".into(),
            payment_status: "pending".into(),
            gateway_order_id: None,
            payment_id: None,
            status: status.into(),
            delivery_address: "Hostel 4, Room 12".into(),
            contact_phone: "9000000000".into(),
            notes: None,
            created_at,
            updated_at: created_at,
        }
    }

    fn probe<'a>(user: &'a str, fp: &'a str, total: i64) -> DuplicateProbe<'a> {
        DuplicateProbe { user_id: user, item_fingerprint: fp, total_paise: total }
    }

    #[test]
    fn matches_recent_identical_submission() {
        let now = Utc::now();
        let recent = vec![
            order("A", "u1", "fp", 500, "placed", now - Duration::seconds(90)),
            order("B", "u1", "fp", 500, "placed", now - Duration::seconds(30)),
        ];
        let hit = find_duplicate(&probe("u1", "fp", 500), &recent, Duration::seconds(120), now);
        assert_eq!(hit.map(|o| o.order_id.as_str()), Some("B"));
    }

    #[test]
    fn ignores_other_users_items_and_totals() {
        let now = Utc::now();
        let t = now - Duration::seconds(10);
        let recent = vec![
            order("A", "u2", "fp", 500, "placed", t),
            order("B", "u1", "other", 500, "placed", t),
            order("C", "u1", "fp", 700, "placed", t),
        ];
        assert!(find_duplicate(&probe("u1", "fp", 500), &recent, Duration::seconds(120), now).is_none());
    }

    #[test]
    fn ignores_void_and_old_orders() {
        let now = Utc::now();
        let recent = vec![
            order("A", "u1", "fp", 500, "cancelled", now - Duration::seconds(5)),
            order("B", "u1", "fp", 500, "payment_failed", now - Duration::seconds(5)),
            order("C", "u1", "fp", 500, "placed", now - Duration::seconds(600)),
        ];
        assert!(find_duplicate(&probe("u1", "fp", 500), &recent, Duration::seconds(120), now).is_none());
    }

    #[test]
    fn matches_order_committed_after_clock_read() {
        let now = Utc::now();
        let recent = vec![order("A", "u1", "fp", 500, "pending_payment", now + Duration::milliseconds(3))];
        let hit = find_duplicate(&probe("u1", "fp", 500), &recent, Duration::seconds(120), now);
        assert_eq!(hit.map(|o| o.order_id.as_str()), Some("A"));
    }
}
