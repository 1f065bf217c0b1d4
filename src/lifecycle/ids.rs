// src/lifecycle/ids.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

const USER_TAG_LEN: usize = 8;
const HASH_TAG_LEN: usize = 8;
const SUFFIX_LEN: usize = 6;

/// SHA-256 over `id:qty` pairs sorted by food item id.
///
/// Independent of line order; repeated ids have their quantities summed.
pub fn item_fingerprint<I>(items: I) -> String
where
    I: IntoIterator<Item = (i64, i32)>,
{
    let mut merged: BTreeMap<i64, i64> = BTreeMap::new();
    for (id, qty) in items {
        *merged.entry(id).or_default() += i64::from(qty);
    }
    let canonical = merged
        .iter()
        .map(|(id, qty)| format!("{id}:{qty}"))
        .collect::<Vec<_>>()
        .join(",");

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

/// `ORD-<user>-<hash>-<millis>-<suffix>`.
pub fn generate_order_id(user_id: &str, fingerprint: &str, now: DateTime<Utc>) -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(SUFFIX_LEN)
        .collect();
    order_id_from_parts(user_id, fingerprint, now, &suffix)
}

fn order_id_from_parts(user_id: &str, fingerprint: &str, now: DateTime<Utc>, suffix: &str) -> String {
    let mut user: String = user_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(USER_TAG_LEN)
        .collect::<String>()
        .to_uppercase();
    if user.is_empty() {
        user.push_str("ANON");
    }
    let hash: String = fingerprint.chars().take(HASH_TAG_LEN).collect();

    format!(
        "ORD-{user}-{}-{}-{}",
        hash.to_uppercase(),
        now.timestamp_millis(),
        suffix.to_uppercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fingerprint_ignores_line_order_and_merges_repeats() {
        let a = item_fingerprint([(3, 1), (1, 2)]);
        let b = item_fingerprint([(1, 2), (3, 1)]);
        let c = item_fingerprint([(1, 1), (3, 1), (1, 1)]);
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_ne!(a, item_fingerprint([(1, 3), (3, 1)]));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn id_layout() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let fp = item_fingerprint([(7, 2)]);
        let id = order_id_from_parts("user_2abc-XYZ!9", &fp, now, "a1b2c3");

        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1], "USER2ABC");
        assert_eq!(parts[2], fp[..8].to_uppercase());
        assert_eq!(parts[3], now.timestamp_millis().to_string());
        assert_eq!(parts[4], "A1B2C3");
    }

    #[test]
    fn anonymous_user_tag() {
        let id = order_id_from_parts("---", "abcdef0123", Utc::now(), "ffffff");
        assert!(id.starts_with("ORD-ANON-ABCDEF01-"));
    }

    #[test]
    fn random_suffix_differs_between_calls() {
        let now = Utc::now();
        let fp = item_fingerprint([(1, 1)]);
        let a = generate_order_id("u1", &fp, now);
        let b = generate_order_id("u1", &fp, now);
        assert_ne!(a, b);
        assert_eq!(a.rsplit('-').next().map(str::len), Some(SUFFIX_LEN));
    }
}
