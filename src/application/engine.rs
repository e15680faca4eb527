use super::config::EngineConfig;
use crate::domain::intake::NewOrderRequest;
use crate::domain::order::{NotificationKind, Order, PaymentMethod, PublicOrderView};
use crate::domain::ports::{NotifierBox, OrderStore, OrderStoreBox, PaymentGatewayBox};
use crate::domain::signature::SignatureVerifier;
use crate::error::{OrderError, Result};
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

/// The order and payment reconciliation engine.
///
/// `OrderEngine` owns handles to the store, the payment gateway and the notifier. It keeps
/// no per-order state of its own: every request may run concurrently with any other, and
/// the store's conditional writes are the only synchronization between them.
pub struct OrderEngine {
    pub(crate) store: OrderStoreBox,
    pub(crate) gateway: PaymentGatewayBox,
    pub(crate) notifier: NotifierBox,
    pub(crate) signatures: SignatureVerifier,
    pub(crate) config: EngineConfig,
}

impl OrderEngine {
    /// Creates a new `OrderEngine`.
    ///
    /// # Arguments
    ///
    /// * `config` - Pricing, expiry and gateway settings. Validated here.
    /// * `store` - Persistent order collection.
    /// * `gateway` - Remote payment processor.
    /// * `notifier` - Customer notification collaborator.
    pub fn new(
        config: EngineConfig,
        store: OrderStoreBox,
        gateway: PaymentGatewayBox,
        notifier: NotifierBox,
    ) -> Result<Self> {
        config.validate()?;
        let signatures = SignatureVerifier::new(&config.gateway_secret);
        Ok(Self {
            store,
            gateway,
            notifier,
            signatures,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn OrderStore {
        self.store.as_ref()
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    pub(crate) async fn load(&self, order_id: &str) -> Result<Order> {
        self.store
            .get(order_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(format!("order {}", order_id)))
    }

    /// Validates and persists a new order.
    ///
    /// Prices are re-derived server-side; any mismatch with what the client declared
    /// rejects the request. Cash-on-delivery orders are confirmed immediately and notified.
    pub async fn create_order(&self, request: NewOrderRequest) -> Result<Order> {
        let validated = request.validate(&self.config.pricing)?;
        let order_id = validated
            .order_id
            .clone()
            .unwrap_or_else(generate_order_id);

        let order = validated.into_order(order_id, self.now());
        self.store.insert(order.clone()).await?;

        info!(
            order_id = %order.order_id,
            payment_method = ?order.payment_method,
            total = %order.total,
            "order created"
        );

        if order.payment_method == PaymentMethod::Cod {
            return Ok(self.notify(NotificationKind::Confirmation, order).await);
        }
        Ok(order)
    }

    /// Customer-facing view of an order.
    pub async fn get_order(&self, order_id: &str) -> Result<PublicOrderView> {
        Ok(self.load(order_id).await?.public_view())
    }
}

fn generate_order_id() -> String {
    format!("ORD-{}", Uuid::new_v4().simple()).to_uppercase()
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::domain::intake::fixtures::request;
    use crate::domain::money::Money;
    use crate::domain::order::{OrderStatus, PaymentStatus};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_cod_order_is_confirmed_and_notified() {
        let h = harness();
        let order = h.engine.create_order(request("COD")).await.unwrap();

        assert_eq!(order.payment_status, PaymentStatus::Success);
        assert_eq!(order.order_status, OrderStatus::Confirmed);
        assert!(order.notifications.email_sent);
        assert_eq!(h.notifier.count(NotificationKind::Confirmation), 1);
        assert_eq!(h.gateway.created_orders(), 0);
    }

    #[tokio::test]
    async fn test_gateway_order_waits_for_payment() {
        let h = harness();
        let order = h.engine.create_order(request("Gateway")).await.unwrap();

        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.order_status, OrderStatus::Pending);
        assert!(!order.notifications.email_sent);
        assert_eq!(h.notifier.count(NotificationKind::Confirmation), 0);
        assert!(order.order_id.starts_with("ORD-"));
    }

    #[tokio::test]
    async fn test_duplicate_order_id_conflicts() {
        let h = harness();
        let mut first = request("Gateway");
        first.order_id = Some("ORD-CLIENT-1".to_string());
        let mut second = request("COD");
        second.order_id = Some("ORD-CLIENT-1".to_string());

        h.engine.create_order(first).await.unwrap();
        let err = h.engine.create_order(second).await.unwrap_err();
        assert!(matches!(err, OrderError::Conflict(_)));

        let all = h.store.all_orders().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].payment_method, PaymentMethod::Gateway);
    }

    #[tokio::test]
    async fn test_tampered_price_never_persisted() {
        let h = harness();
        let mut req = request("Gateway");
        req.total = Some(dec!(10));

        let err = h.engine.create_order(req).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(h.store.all_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_intake() {
        let notifier = RecordingNotifier {
            fail: true,
            ..Default::default()
        };
        let h = harness_with(
            crate::infrastructure::simulated_gateway::SimulatedGateway::new(SECRET),
            notifier,
        );
        let order = h.engine.create_order(request("COD")).await.unwrap();

        assert!(!order.notifications.email_sent);
        assert_eq!(h.notifier.count(NotificationKind::Confirmation), 1);
        let stored = h.store.get(&order.order_id).await.unwrap().unwrap();
        assert!(!stored.notifications.email_sent);
    }

    #[tokio::test]
    async fn test_get_order_returns_public_view() {
        let h = harness();
        let order = h.engine.create_order(request("Gateway")).await.unwrap();
        let view = h.engine.get_order(&order.order_id).await.unwrap();
        assert_eq!(view.total, Money::new(dec!(500)));

        let err = h.engine.get_order("ORD-MISSING").await.unwrap_err();
        assert!(matches!(err, OrderError::NotFound(_)));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = generate_order_id();
        let b = generate_order_id();
        assert_ne!(a, b);
        assert!(crate::domain::intake::valid_order_id(&a));
    }
}
