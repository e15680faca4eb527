//! Conditional writes: what must still hold, and what to change when it does.
//!
//! Stores evaluate a [`Precondition`] and apply an [`OrderChange`] as one atomic step.

use super::lifecycle::OrderState;
use super::order::{NotificationKind, Order, PaymentInstrument, PaymentMethod};
use chrono::{DateTime, Utc};

/// Compare-and-set guard evaluated against the stored record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Precondition {
    pub payment_method: Option<PaymentMethod>,
    pub state: Option<OrderState>,
    /// Outer `None` skips the check; `Some(None)` requires no gateway order yet.
    pub gateway_order_id: Option<Option<String>>,
    /// Record must be created strictly after this instant.
    pub created_after: Option<DateTime<Utc>>,
    /// Record must be created at or before this instant.
    pub created_at_or_before: Option<DateTime<Utc>>,
    pub not_notified: Option<NotificationKind>,
}

impl Precondition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(method);
        self
    }

    pub fn in_state(mut self, state: OrderState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn gateway_order_id(mut self, id: Option<&str>) -> Self {
        self.gateway_order_id = Some(id.map(str::to_string));
        self
    }

    pub fn created_after(mut self, instant: DateTime<Utc>) -> Self {
        self.created_after = Some(instant);
        self
    }

    pub fn created_at_or_before(mut self, instant: DateTime<Utc>) -> Self {
        self.created_at_or_before = Some(instant);
        self
    }

    pub fn not_notified(mut self, kind: NotificationKind) -> Self {
        self.not_notified = Some(kind);
        self
    }

    pub fn holds(&self, order: &Order) -> bool {
        if let Some(method) = self.payment_method
            && order.payment_method != method
        {
            return false;
        }
        if let Some(state) = self.state
            && OrderState::of(order) != state
        {
            return false;
        }
        if let Some(expected) = &self.gateway_order_id
            && &order.gateway_order_id != expected
        {
            return false;
        }
        if let Some(instant) = self.created_after
            && order.created_at <= instant
        {
            return false;
        }
        if let Some(instant) = self.created_at_or_before
            && order.created_at > instant
        {
            return false;
        }
        if let Some(kind) = self.not_notified
            && order.notifications.is_sent(kind)
        {
            return false;
        }
        true
    }
}

/// A mutation applied to a record whose precondition held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderChange {
    /// Remember the remote order created for this payment attempt.
    AttachGatewayOrder { gateway_order_id: String },
    /// Record a captured payment.
    PaymentCaptured {
        gateway_payment_id: String,
        state: OrderState,
    },
    /// Fill in the instrument once the gateway reports it.
    RecordInstrument { instrument: PaymentInstrument },
    Transition { state: OrderState },
    MarkNotified { kind: NotificationKind },
}

impl OrderChange {
    pub fn apply(&self, order: &mut Order, now: DateTime<Utc>) {
        match self {
            OrderChange::AttachGatewayOrder { gateway_order_id } => {
                order.gateway_order_id = Some(gateway_order_id.clone());
            }
            OrderChange::PaymentCaptured {
                gateway_payment_id,
                state,
            } => {
                order.gateway_payment_id = Some(gateway_payment_id.clone());
                order.payment_status = state.payment;
                order.order_status = state.order;
            }
            OrderChange::RecordInstrument { instrument } => {
                order.gateway_instrument = Some(instrument.clone());
            }
            OrderChange::Transition { state } => {
                order.payment_status = state.payment;
                order.order_status = state.order;
            }
            OrderChange::MarkNotified { kind } => {
                order.notifications.mark_sent(*kind);
            }
        }
        order.updated_at = now;
    }
}
