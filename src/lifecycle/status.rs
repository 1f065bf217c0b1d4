// src/lifecycle/status.rs

use std::fmt;
use std::str::FromStr;

use super::LifecycleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    PendingPayment,
    Placed,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
    PaymentFailed,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::PendingPayment,
        OrderStatus::Placed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::PaymentFailed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::Placed => "placed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::PaymentFailed => "payment_failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_empty()
    }

    /// Orders that never went through count for neither revenue nor duplicates.
    pub fn is_void(self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::PaymentFailed)
    }

    pub fn customer_cancellable(self) -> bool {
        matches!(self, OrderStatus::PendingPayment | OrderStatus::Placed)
    }

    /// Statuses reachable in one step.
    pub fn next(self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            PendingPayment => &[Placed, PaymentFailed, Cancelled],
            Placed => &[Preparing, Cancelled],
            Preparing => &[Ready, Cancelled],
            Ready => &[Delivered],
            Delivered | Cancelled | PaymentFailed => &[],
        }
    }

    pub fn can_transition(self, to: OrderStatus) -> bool {
        self.next().contains(&to)
    }

    pub fn transition(self, to: OrderStatus) -> Result<OrderStatus, LifecycleError> {
        if self.can_transition(to) {
            Ok(to)
        } else {
            Err(LifecycleError::InvalidTransition { from: self, to })
        }
    }

    /// Transition requested by shop staff. `pending_payment -> placed` is
    /// reserved for a verified payment.
    pub fn staff_transition(self, to: OrderStatus) -> Result<OrderStatus, LifecycleError> {
        if self == OrderStatus::PendingPayment && to == OrderStatus::Placed {
            return Err(LifecycleError::InvalidTransition { from: self, to });
        }
        self.transition(to)
    }

    pub fn cancel_by_customer(self) -> Result<OrderStatus, LifecycleError> {
        if self.customer_cancellable() {
            Ok(OrderStatus::Cancelled)
        } else {
            Err(LifecycleError::NotCancellable(self))
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        OrderStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == key)
            .ok_or_else(|| LifecycleError::UnknownStatus(s.to_string()))
    }
}
