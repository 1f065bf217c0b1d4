// src/lifecycle/payment.rs

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::{LifecycleError, OrderStatus, PaymentStatus};
use crate::models::Order;

type HmacSha256 = Hmac<Sha256>;

fn mac_for(gateway_order_id: &str, payment_id: &str, secret: &str) -> HmacSha256 {
    // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac key of any size");
    mac.update(gateway_order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    mac
}

/// Hex HMAC-SHA256 of `"<gateway_order_id>|<payment_id>"`, as the gateway signs callbacks.
pub fn sign_payment(gateway_order_id: &str, payment_id: &str, secret: &str) -> String {
    hex::encode(mac_for(gateway_order_id, payment_id, secret).finalize().into_bytes())
}

pub fn verify_payment_signature(
    gateway_order_id: &str,
    payment_id: &str,
    signature: &str,
    secret: &str,
) -> Result<(), LifecycleError> {
    let provided = hex::decode(signature.trim()).map_err(|_| LifecycleError::InvalidSignature)?;
    mac_for(gateway_order_id, payment_id, secret)
        .verify_slice(&provided)
        .map_err(|_| LifecycleError::InvalidSignature)
}

/// What recording a verified payment does to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentCapture {
    /// The same payment was already recorded; nothing to write.
    Replay,
    /// Move the order to this status and mark it paid.
    Apply(OrderStatus),
}

/// Decides how a verified payment lands on `order`.
///
/// A stored gateway order id must match. A paid order accepts only a replay
/// of the payment that paid it.
pub fn capture_payment(
    order: &Order,
    gateway_order_id: &str,
    payment_id: &str,
) -> Result<PaymentCapture, LifecycleError> {
    if order.gateway_order_id.as_deref().is_some_and(|gw| gw != gateway_order_id) {
        return Err(LifecycleError::GatewayMismatch(order.order_id.clone()));
    }

    if order.payment_status == PaymentStatus::Paid.as_str() {
        return if order.payment_id.as_deref() == Some(payment_id) {
            Ok(PaymentCapture::Replay)
        } else {
            Err(LifecycleError::AlreadyPaid(order.order_id.clone()))
        };
    }

    let from: OrderStatus = order.status.parse()?;
    Ok(PaymentCapture::Apply(from.transition(OrderStatus::Placed)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderLine, PaymentSplit};
    use chrono::Utc;
    use sqlx::types::Json;

    fn online_order(status: &str, payment_status: &str) -> Order {
        let now = Utc::now();
        Order {
            order_id: "ORD-U1-ABCD1234-1-a1b2c3".into(),
            user_id: "u1".into(),
            items: Json(Vec::<OrderLine>::new()),
            item_fingerprint: "fp".into(),
            shop_ids: vec![1],
            payment_splits: Json(Vec::<PaymentSplit>::new()),
            total_paise: 12_000,
            payment_method: "online".into(),
            payment_status: payment_status.into(),
            gateway_order_id: None,
            payment_id: None,
            status: status.into(),
            delivery_address: "Hostel 4, Room 12".into(),
            contact_phone: "9000000000".into(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn accepts_gateway_signature() {
        let sig = sign_payment("gw_order_1", "pay_1", "s3cret");
        assert_eq!(sig.len(), 64);
        assert_eq!(verify_payment_signature("gw_order_1", "pay_1", &sig, "s3cret"), Ok(()));
        assert_eq!(
            verify_payment_signature("gw_order_1", "pay_1", &sig.to_uppercase(), "s3cret"),
            Ok(())
        );
    }

    #[test]
    fn rejects_tampered_fields() {
        let sig = sign_payment("gw_order_1", "pay_1", "s3cret");
        let bad = Err(LifecycleError::InvalidSignature);
        assert_eq!(verify_payment_signature("gw_order_2", "pay_1", &sig, "s3cret"), bad);
        assert_eq!(verify_payment_signature("gw_order_1", "pay_2", &sig, "s3cret"), bad);
        assert_eq!(verify_payment_signature("gw_order_1", "pay_1", &sig, "other"), bad);
        assert_eq!(verify_payment_signature("gw_order_1", "pay_1", "zz", "s3cret"), bad);
        assert_eq!(verify_payment_signature("gw_order_1", "pay_1", "abc", "s3cret"), bad);
    }

    #[test]
    fn awaiting_order_is_placed_on_capture() {
        let order = online_order("pending_payment", "awaiting");
        assert_eq!(
            capture_payment(&order, "gw_1", "pay_1"),
            Ok(PaymentCapture::Apply(OrderStatus::Placed))
        );
    }

    #[test]
    fn replayed_payment_is_a_no_op() {
        let mut order = online_order("placed", "paid");
        order.gateway_order_id = Some("gw_1".into());
        order.payment_id = Some("pay_1".into());
        assert_eq!(capture_payment(&order, "gw_1", "pay_1"), Ok(PaymentCapture::Replay));
    }

    #[test]
    fn second_payment_or_foreign_gateway_order_conflicts() {
        let mut order = online_order("placed", "paid");
        order.gateway_order_id = Some("gw_1".into());
        order.payment_id = Some("pay_1".into());
        assert_eq!(
            capture_payment(&order, "gw_1", "pay_2"),
            Err(LifecycleError::AlreadyPaid(order.order_id.clone()))
        );
        assert_eq!(
            capture_payment(&order, "gw_2", "pay_1"),
            Err(LifecycleError::GatewayMismatch(order.order_id.clone()))
        );
    }

    #[test]
    fn failed_or_cancelled_order_cannot_be_captured() {
        for status in ["payment_failed", "cancelled"] {
            let order = online_order(status, "failed");
            assert!(matches!(
                capture_payment(&order, "gw_1", "pay_1"),
                Err(LifecycleError::InvalidTransition { .. })
            ));
        }
    }
}
