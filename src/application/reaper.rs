use super::engine::OrderEngine;
use crate::domain::lifecycle::OrderState;
use crate::domain::mutation::Precondition;
use crate::domain::order::{OrderStatus, PaymentMethod, PaymentStatus};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    /// Pending gateway orders looked at.
    pub examined: usize,
    /// Orders deleted.
    pub purged: usize,
}

impl OrderEngine {
    /// Deletes unpaid gateway orders whose payment window closed before `now`.
    ///
    /// Each delete re-checks the order is still pending and old enough, so an order paid
    /// a moment ago survives. Correctness of initiate/verify never depends on this running.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<PurgeReport> {
        let expiry = &self.config.expiry;
        let guard = Precondition::new()
            .payment_method(PaymentMethod::Gateway)
            .in_state(OrderState::new(PaymentStatus::Pending, OrderStatus::Pending))
            .created_at_or_before(expiry.cutoff(now));

        let pending = self.store.list_pending_gateway().await?;
        let mut report = PurgeReport {
            examined: pending.len(),
            purged: 0,
        };

        for order in pending.iter().filter(|o| expiry.is_expired(o, now)) {
            match self.store.delete_if(&order.order_id, &guard).await {
                Ok(true) => report.purged += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(order_id = %order.order_id, error = %e, "failed to purge expired order");
                }
            }
        }

        info!(examined = report.examined, purged = report.purged, "expired orders purged");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use crate::application::engine::test_support::*;
    use crate::domain::order::fixtures::gateway_order;
    use crate::domain::order::{OrderStatus, PaymentStatus};
    use crate::domain::ports::OrderStore;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_purges_only_expired_pending_orders() {
        let h = harness();
        let now = Utc::now();
        h.store
            .insert(gateway_order("ORD-OLD", now - Duration::minutes(31)))
            .await
            .unwrap();
        h.store
            .insert(gateway_order("ORD-FRESH", now - Duration::minutes(10)))
            .await
            .unwrap();
        let mut paid = gateway_order("ORD-PAID", now - Duration::hours(5));
        paid.payment_status = PaymentStatus::Success;
        paid.order_status = OrderStatus::Confirmed;
        paid.gateway_payment_id = Some("pay_1".to_string());
        h.store.insert(paid).await.unwrap();

        let report = h.engine.purge_expired(now).await.unwrap();
        assert_eq!(report.examined, 2);
        assert_eq!(report.purged, 1);

        assert!(h.store.get("ORD-OLD").await.unwrap().is_none());
        assert!(h.store.get("ORD-FRESH").await.unwrap().is_some());
        assert!(h.store.get("ORD-PAID").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_is_repeatable() {
        let h = harness();
        let now = Utc::now();
        h.store
            .insert(gateway_order("ORD-OLD", now - Duration::hours(1)))
            .await
            .unwrap();

        assert_eq!(h.engine.purge_expired(now).await.unwrap().purged, 1);
        assert_eq!(h.engine.purge_expired(now).await.unwrap().purged, 0);
    }
}
