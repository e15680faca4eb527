//! Gateway coordination: opening a remote payment and trusting its confirmation.

use super::engine::OrderEngine;
use crate::domain::lifecycle::{LifecycleEvent, OrderState, Transition};
use crate::domain::mutation::{OrderChange, Precondition};
use crate::domain::order::{
    NotificationKind, Order, OrderStatus, PaymentInstrument, PaymentMethod, PaymentStatus,
    PublicOrderView,
};
use crate::domain::ports::GatewayOrderRequest;
use crate::error::{OrderError, Result, ValidationErrors};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Smallest amount, in minor units, the gateway accepts.
pub const MIN_GATEWAY_AMOUNT: i64 = 100;

const AWAITING: OrderState = OrderState::new(PaymentStatus::Pending, OrderStatus::Pending);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInitiation {
    pub gateway_order_id: String,
    /// Public key the checkout widget needs to open the gateway.
    pub public_key: String,
    /// Amount in minor units, as registered with the gateway.
    pub amount: i64,
    pub currency: String,
    pub order_data: PublicOrderView,
}

/// Proof of payment relayed by the client after checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaymentConfirmation {
    pub order_id: String,
    pub payment_id: String,
    pub gateway_order_id: String,
    pub signature: String,
}

impl PaymentConfirmation {
    fn validate(&self) -> Result<()> {
        let mut errors = ValidationErrors::new();
        for (field, value) in [
            ("orderId", &self.order_id),
            ("paymentId", &self.payment_id),
            ("gatewayOrderId", &self.gateway_order_id),
            ("signature", &self.signature),
        ] {
            if value.trim().is_empty() {
                errors.push(field, "is required");
            }
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedPayment {
    pub success: bool,
    pub order: PublicOrderView,
}

impl OrderEngine {
    /// Registers the order with the payment gateway.
    ///
    /// The order must be an unexpired, unpaid gateway order whose stored prices still
    /// re-derive. Nothing local changes unless the gateway returns an order id; a retry
    /// replaces the previous remote order id.
    pub async fn initiate_payment(&self, order_id: &str) -> Result<PaymentInitiation> {
        let now = self.now();
        let order = self.load(order_id).await?;
        self.ensure_payable(&order, now)?;
        self.config.pricing.revalidate(&order)?;

        let amount = order
            .total
            .to_minor_units()
            .ok_or_else(|| OrderError::validation("total", "amount out of range"))?
            .max(MIN_GATEWAY_AMOUNT);

        let request = GatewayOrderRequest {
            amount,
            currency: self.config.currency.clone(),
            receipt: order.order_id.clone(),
        };
        let remote = tokio::time::timeout(
            self.config.gateway_timeout,
            self.gateway.create_order(request),
        )
        .await
        .map_err(|_| {
            warn!(order_id, gateway = self.gateway.name(), "gateway order creation timed out");
            OrderError::Gateway("timed out creating gateway order".into())
        })?
        .map_err(|e| {
            warn!(order_id, gateway = self.gateway.name(), error = %e, "gateway order creation failed");
            OrderError::Gateway(e.to_string())
        })?;

        let gateway_order_id = remote.id.trim().to_string();
        if gateway_order_id.is_empty() {
            warn!(order_id, "gateway returned no order id");
            return Err(OrderError::Gateway("gateway returned no order id".into()));
        }

        let guard = Precondition::new()
            .payment_method(PaymentMethod::Gateway)
            .in_state(AWAITING)
            .gateway_order_id(order.gateway_order_id.as_deref())
            .created_after(self.config.expiry.cutoff(now));
        let change = OrderChange::AttachGatewayOrder {
            gateway_order_id: gateway_order_id.clone(),
        };
        let Some(updated) = self.store.update_if(order_id, &guard, &change).await? else {
            return Err(self.explain_rejected_write(order_id, now).await);
        };

        info!(order_id, %gateway_order_id, amount, "payment initiated");

        Ok(PaymentInitiation {
            gateway_order_id,
            public_key: self.config.gateway_key_id.clone(),
            amount,
            currency: self.config.currency.clone(),
            order_data: updated.public_view(),
        })
    }

    /// Verifies a payment confirmation and marks the order paid.
    ///
    /// The signature is checked before the order is even loaded. A replayed or concurrent
    /// duplicate confirmation either fails the status gate or loses the conditional write,
    /// so the success transition and its notification happen once.
    pub async fn verify_payment(&self, confirmation: PaymentConfirmation) -> Result<VerifiedPayment> {
        confirmation.validate()?;
        let PaymentConfirmation {
            order_id,
            payment_id,
            gateway_order_id,
            signature,
        } = confirmation;
        let now = self.now();

        if let Err(e) = self
            .signatures
            .verify(&gateway_order_id, &payment_id, &signature)
        {
            warn!(
                target: "security",
                %order_id,
                %gateway_order_id,
                %payment_id,
                "payment signature mismatch"
            );
            return Err(e);
        }

        let order = self.load(&order_id).await?;
        if !order.is_gateway() {
            return Err(OrderError::validation(
                "orderId",
                "order is not payable through the gateway",
            ));
        }
        let target = match OrderState::of(&order).apply(LifecycleEvent::PaymentVerified)? {
            Transition::To(state) => state,
            Transition::Unchanged => {
                return Err(OrderError::Conflict("payment already verified".into()));
            }
        };
        if order.gateway_order_id.as_deref() != Some(gateway_order_id.as_str()) {
            warn!(
                target: "security",
                %order_id,
                %gateway_order_id,
                "confirmation names a gateway order not attached to this order"
            );
            return Err(OrderError::validation(
                "gatewayOrderId",
                "does not match this order",
            ));
        }
        if self.config.expiry.is_expired(&order, now) {
            return Err(self.expired(&order));
        }
        self.config.pricing.revalidate(&order)?;

        let guard = Precondition::new()
            .payment_method(PaymentMethod::Gateway)
            .in_state(AWAITING)
            .gateway_order_id(Some(&gateway_order_id))
            .created_after(self.config.expiry.cutoff(now));
        let change = OrderChange::PaymentCaptured {
            gateway_payment_id: payment_id.clone(),
            state: target,
        };
        let Some(paid) = self.store.update_if(&order_id, &guard, &change).await? else {
            return Err(self.explain_rejected_write(&order_id, now).await);
        };

        info!(%order_id, %gateway_order_id, %payment_id, "payment verified");

        let paid = self.record_instrument(paid, &payment_id).await;
        let paid = self.notify(NotificationKind::Confirmation, paid).await;

        Ok(VerifiedPayment {
            success: true,
            order: paid.public_view(),
        })
    }

    /// Asks the gateway how the customer paid. Never fails the caller.
    async fn record_instrument(&self, order: Order, payment_id: &str) -> Order {
        let fetched =
            tokio::time::timeout(self.config.gateway_timeout, self.gateway.fetch_payment(payment_id))
                .await;
        let payment = match fetched {
            Ok(Ok(payment)) => payment,
            Ok(Err(e)) => {
                warn!(order_id = %order.order_id, payment_id, error = %e, "instrument lookup failed");
                return order;
            }
            Err(_) => {
                warn!(order_id = %order.order_id, payment_id, "instrument lookup timed out");
                return order;
            }
        };

        let change = OrderChange::RecordInstrument {
            instrument: PaymentInstrument::from_gateway_method(&payment.method),
        };
        let guard = Precondition::new().payment_method(PaymentMethod::Gateway);
        match self.store.update_if(&order.order_id, &guard, &change).await {
            Ok(Some(updated)) => updated,
            Ok(None) => order,
            Err(e) => {
                warn!(order_id = %order.order_id, error = %e, "instrument not persisted");
                order
            }
        }
    }

    fn ensure_payable(&self, order: &Order, now: DateTime<Utc>) -> Result<()> {
        if !order.is_gateway() {
            return Err(OrderError::validation(
                "orderId",
                "order is not payable through the gateway",
            ));
        }
        match order.payment_status {
            PaymentStatus::Success => {
                return Err(OrderError::Conflict("order is already paid".into()));
            }
            PaymentStatus::Failed => {
                return Err(OrderError::Conflict(
                    "order is no longer awaiting payment".into(),
                ));
            }
            PaymentStatus::Pending => {}
        }
        if order.order_status != OrderStatus::Pending {
            return Err(OrderError::Conflict(format!(
                "order in status {} cannot accept a payment",
                order.order_status
            )));
        }
        if self.config.expiry.is_expired(order, now) {
            return Err(self.expired(order));
        }
        Ok(())
    }

    pub(crate) fn expired(&self, order: &Order) -> OrderError {
        info!(order_id = %order.order_id, "rejected request for expired order");
        OrderError::Expired(format!(
            "order {} expired at {}; please place a new order",
            order.order_id,
            self.config.expiry.expires_at(order).to_rfc3339()
        ))
    }

    /// Classifies why a conditional write on a payable order did not apply.
    async fn explain_rejected_write(&self, order_id: &str, now: DateTime<Utc>) -> OrderError {
        let current = match self.store.get(order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => return OrderError::NotFound(format!("order {}", order_id)),
            Err(e) => return e,
        };
        if let Err(e) = self.ensure_payable(&current, now) {
            return e;
        }
        OrderError::Conflict("order was modified by a concurrent request; retry".into())
    }
}
