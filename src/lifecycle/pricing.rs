// src/lifecycle/pricing.rs

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::LifecycleError;
use crate::models::{FoodItem, OrderLine, PaymentSplit};

pub const MAX_LINE_QUANTITY: i32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedItem {
    pub food_item_id: i64,
    pub quantity: i32,
}

pub fn check_quantity(food_item_id: i64, quantity: i32) -> Result<(), LifecycleError> {
    if (1..=MAX_LINE_QUANTITY).contains(&quantity) {
        Ok(())
    } else {
        Err(LifecycleError::InvalidQuantity { food_item_id, quantity })
    }
}

/// Validates the request shape without touching the catalog.
pub fn validate_request(requested: &[RequestedItem]) -> Result<(), LifecycleError> {
    if requested.is_empty() {
        return Err(LifecycleError::EmptyOrder);
    }
    for r in requested {
        check_quantity(r.food_item_id, r.quantity)?;
    }
    Ok(())
}

/// Prices the requested items against catalog rows, in first-seen order.
///
/// Repeated ids are merged into one line and the merged quantity must still
/// be within bounds.
pub fn price_items(
    requested: &[RequestedItem],
    catalog: &[FoodItem],
) -> Result<Vec<OrderLine>, LifecycleError> {
    validate_request(requested)?;

    let by_id: HashMap<i64, &FoodItem> = catalog.iter().map(|f| (f.food_item_id, f)).collect();
    let mut lines: Vec<OrderLine> = Vec::with_capacity(requested.len());

    for r in requested {
        if let Some(line) = lines.iter_mut().find(|l| l.food_item_id == r.food_item_id) {
            let merged = line.quantity.saturating_add(r.quantity);
            check_quantity(r.food_item_id, merged)?;
            line.quantity = merged;
            continue;
        }

        let item = by_id
            .get(&r.food_item_id)
            .ok_or(LifecycleError::UnknownItem(r.food_item_id))?;
        if !item.is_available {
            return Err(LifecycleError::ItemUnavailable(item.food_item_id));
        }
        lines.push(OrderLine {
            food_item_id: item.food_item_id,
            shop_id: item.shop_id,
            name: item.name.clone(),
            unit_price_paise: item.price_paise,
            quantity: r.quantity,
        });
    }
    Ok(lines)
}

fn line_amount(line: &OrderLine) -> Result<i64, LifecycleError> {
    line.unit_price_paise
        .checked_mul(i64::from(line.quantity))
        .ok_or(LifecycleError::AmountOverflow)
}

pub fn order_total(lines: &[OrderLine]) -> Result<i64, LifecycleError> {
    lines.iter().try_fold(0i64, |acc, l| {
        acc.checked_add(line_amount(l)?).ok_or(LifecycleError::AmountOverflow)
    })
}

/// Per-shop shares of the order, sorted by shop id.
pub fn payment_splits(lines: &[OrderLine]) -> Result<Vec<PaymentSplit>, LifecycleError> {
    let mut per_shop: BTreeMap<i64, PaymentSplit> = BTreeMap::new();
    for l in lines {
        let split = per_shop.entry(l.shop_id).or_insert(PaymentSplit {
            shop_id: l.shop_id,
            subtotal_paise: 0,
            item_count: 0,
        });
        split.subtotal_paise = split
            .subtotal_paise
            .checked_add(line_amount(l)?)
            .ok_or(LifecycleError::AmountOverflow)?;
        split.item_count += l.quantity;
    }
    Ok(per_shop.into_values().collect())
}

/// Distinct shop ids, ascending.
pub fn shop_ids(lines: &[OrderLine]) -> Vec<i64> {
    let mut ids: Vec<i64> = lines.iter().map(|l| l.shop_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}
