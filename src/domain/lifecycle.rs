//! Legal moves of the `(payment_status, order_status)` pair.
//!
//! Every state-changing operation asks this module for the target state before it issues
//! its conditional write, so an illegal move is rejected before the store is touched.

use super::order::{NotificationKind, Order, OrderStatus, PaymentMethod, PaymentStatus};
use crate::error::{OrderError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderState {
    pub payment: PaymentStatus,
    pub order: OrderStatus,
}

impl OrderState {
    pub const fn new(payment: PaymentStatus, order: OrderStatus) -> Self {
        Self { payment, order }
    }

    pub fn of(order: &Order) -> Self {
        Self::new(order.payment_status, order.order_status)
    }

    /// State an order is created in.
    ///
    /// Cash on delivery is fulfilled right away; gateway orders wait for a verified payment.
    pub fn initial(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::Cod => Self::new(PaymentStatus::Success, OrderStatus::Confirmed),
            PaymentMethod::Gateway => Self::new(PaymentStatus::Pending, OrderStatus::Pending),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A gateway callback passed signature and order checks.
    PaymentVerified,
    /// An administrator reconciled a payment whose callback never arrived.
    PaymentForced,
    /// An administrator moved the fulfillment status.
    StatusUpdate(OrderStatus),
    /// An administrator abandoned an unpaid gateway order.
    PendingCancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    To(OrderState),
    /// The order already is where the event would take it.
    Unchanged,
}

impl Transition {
    pub fn target(&self) -> Option<OrderState> {
        match self {
            Transition::To(state) => Some(*state),
            Transition::Unchanged => None,
        }
    }
}

/// Notification owed once an order lands in `state`.
pub fn notification_for(state: OrderState) -> Option<NotificationKind> {
    match state.order {
        OrderStatus::Confirmed => Some(NotificationKind::Confirmation),
        OrderStatus::Delivered => Some(NotificationKind::Delivery),
        OrderStatus::Cancelled => Some(NotificationKind::Cancellation),
        OrderStatus::Pending => None,
    }
}

const AWAITING: OrderState = OrderState::new(PaymentStatus::Pending, OrderStatus::Pending);
const PAID: OrderState = OrderState::new(PaymentStatus::Success, OrderStatus::Confirmed);

fn conflict(msg: impl Into<String>) -> OrderError {
    OrderError::Conflict(msg.into())
}

impl OrderState {
    pub fn apply(self, event: LifecycleEvent) -> Result<Transition> {
        use OrderStatus as O;
        use PaymentStatus as P;

        match event {
            LifecycleEvent::PaymentVerified => match (self.payment, self.order) {
                (P::Pending, O::Pending) => Ok(Transition::To(PAID)),
                (P::Success, _) => Err(conflict("payment already verified")),
                (P::Failed, _) => Err(conflict("order is no longer awaiting payment")),
                (P::Pending, status) => Err(conflict(format!(
                    "order in status {} cannot accept a payment",
                    status
                ))),
            },
            LifecycleEvent::PaymentForced => match (self.payment, self.order) {
                (P::Pending, O::Pending) => Ok(Transition::To(PAID)),
                (P::Success, _) => Ok(Transition::Unchanged),
                (P::Failed, _) => Err(conflict("order is no longer awaiting payment")),
                (P::Pending, status) => Err(conflict(format!(
                    "order in status {} cannot accept a payment",
                    status
                ))),
            },
            LifecycleEvent::StatusUpdate(target) => {
                if target == O::Pending {
                    return Err(OrderError::validation(
                        "orderStatus",
                        "must be one of Confirmed, Delivered, Cancelled",
                    ));
                }
                if self.order.is_terminal() {
                    return Err(conflict(format!(
                        "order is already {} and cannot change",
                        self.order
                    )));
                }
                match (self.payment, self.order) {
                    (P::Success, O::Confirmed) if target == O::Confirmed => {
                        Ok(Transition::Unchanged)
                    }
                    (P::Success, O::Confirmed) => {
                        Ok(Transition::To(OrderState::new(P::Success, target)))
                    }
                    (P::Pending | P::Failed, _) => {
                        Err(conflict("payment has not been completed for this order"))
                    }
                    (P::Success, status) => Err(conflict(format!(
                        "order in status {} cannot be updated",
                        status
                    ))),
                }
            }
            LifecycleEvent::PendingCancelled => {
                if self == AWAITING {
                    Ok(Transition::To(OrderState::new(P::Failed, O::Cancelled)))
                } else {
                    Err(conflict("only orders awaiting payment can be cancelled"))
                }
            }
        }
    }
}
