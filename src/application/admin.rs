//! Administrative operations. Callers are expected to be authenticated upstream.

use super::engine::OrderEngine;
use crate::domain::lifecycle::{LifecycleEvent, OrderState, Transition, notification_for};
use crate::domain::money::Money;
use crate::domain::mutation::{OrderChange, Precondition};
use crate::domain::order::{NotificationKind, Order, OrderStatus, PaymentMethod, PaymentStatus};
use crate::error::{OrderError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

const AWAITING: OrderState = OrderState::new(PaymentStatus::Pending, OrderStatus::Pending);

/// One row of the pending-payments listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOrderSummary {
    pub order_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub total: Money,
    pub gateway_order_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub expired: bool,
}

impl OrderEngine {
    /// Gateway orders still waiting for payment, oldest first.
    pub async fn list_pending_orders(&self) -> Result<Vec<PendingOrderSummary>> {
        let now = self.now();
        let expiry = &self.config.expiry;
        let orders = self.store.list_pending_gateway().await?;
        Ok(orders
            .into_iter()
            .map(|order| PendingOrderSummary {
                expires_at: expiry.expires_at(&order),
                expired: expiry.is_expired(&order, now),
                order_id: order.order_id,
                customer_name: order.customer.name,
                customer_email: order.customer.email,
                total: order.total,
                gateway_order_id: order.gateway_order_id,
                created_at: order.created_at,
            })
            .collect())
    }

    /// Full record of an order that is still awaiting gateway payment.
    pub async fn get_pending_order(&self, order_id: &str) -> Result<Order> {
        let order = self.load(order_id).await?;
        if !order.awaiting_payment() {
            return Err(OrderError::NotFound(format!(
                "no pending gateway order {}",
                order_id
            )));
        }
        Ok(order)
    }

    /// Abandons an unpaid gateway order: `(Pending, Pending)` becomes `(Failed, Cancelled)`.
    ///
    /// An order that exists but no longer awaits payment is a conflict.
    pub async fn cancel_pending_order(&self, order_id: &str) -> Result<Order> {
        let order = self.load(order_id).await?;
        if !order.awaiting_payment() {
            return Err(OrderError::Conflict(format!(
                "order {} is not awaiting payment ({}, {})",
                order_id, order.payment_status, order.order_status
            )));
        }
        let Transition::To(target) = OrderState::of(&order).apply(LifecycleEvent::PendingCancelled)?
        else {
            return Ok(order);
        };

        let guard = Precondition::new()
            .payment_method(PaymentMethod::Gateway)
            .in_state(AWAITING)
            .gateway_order_id(order.gateway_order_id.as_deref());
        let change = OrderChange::Transition { state: target };
        let cancelled = self
            .store
            .update_if(order_id, &guard, &change)
            .await?
            .ok_or_else(|| {
                OrderError::Conflict("order changed while it was being cancelled".into())
            })?;

        info!(order_id, "pending order cancelled");
        Ok(self.notify(NotificationKind::Cancellation, cancelled).await)
    }

    /// Marks a gateway order paid when its callback was lost.
    ///
    /// Requires the gateway payment id the administrator reconciled against. Already
    /// paid orders are returned unchanged. The expiry window is not enforced here.
    pub async fn force_confirm_payment(&self, order_id: &str, gateway_payment_id: &str) -> Result<Order> {
        let gateway_payment_id = gateway_payment_id.trim();
        if gateway_payment_id.is_empty() {
            return Err(OrderError::validation("paymentId", "is required"));
        }

        let order = self.load(order_id).await?;
        let target = match OrderState::of(&order).apply(LifecycleEvent::PaymentForced)? {
            Transition::Unchanged => return Ok(order),
            Transition::To(target) => target,
        };

        let guard = Precondition::new()
            .payment_method(PaymentMethod::Gateway)
            .in_state(AWAITING);
        let change = OrderChange::PaymentCaptured {
            gateway_payment_id: gateway_payment_id.to_string(),
            state: target,
        };
        let Some(paid) = self.store.update_if(order_id, &guard, &change).await? else {
            let current = self.load(order_id).await?;
            return match OrderState::of(&current).apply(LifecycleEvent::PaymentForced)? {
                Transition::Unchanged => Ok(current),
                Transition::To(_) => Err(OrderError::Conflict(
                    "order changed while it was being confirmed".into(),
                )),
            };
        };

        info!(order_id, gateway_payment_id, "payment force-confirmed");
        Ok(self.notify(NotificationKind::Confirmation, paid).await)
    }

    /// Moves `order_status` of a paid order forward.
    ///
    /// `Delivered` and `Cancelled` are terminal; any update against them is a conflict.
    pub async fn update_order_status(&self, order_id: &str, status: OrderStatus) -> Result<Order> {
        let order = self.load(order_id).await?;
        let current = OrderState::of(&order);
        let target = match current.apply(LifecycleEvent::StatusUpdate(status))? {
            Transition::Unchanged => return Ok(order),
            Transition::To(target) => target,
        };

        let guard = Precondition::new().in_state(current);
        let change = OrderChange::Transition { state: target };
        let Some(updated) = self.store.update_if(order_id, &guard, &change).await? else {
            let latest = self.load(order_id).await?;
            OrderState::of(&latest).apply(LifecycleEvent::StatusUpdate(status))?;
            return Err(OrderError::Conflict(format!(
                "order moved to {} while being updated",
                latest.order_status
            )));
        };

        info!(order_id, from = %current.order, to = %target.order, "order status updated");

        match notification_for(target) {
            Some(kind) => Ok(self.notify(kind, updated).await),
            None => Ok(updated),
        }
    }
}
