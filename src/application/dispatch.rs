use super::engine::OrderEngine;
use crate::domain::mutation::{OrderChange, Precondition};
use crate::domain::order::{NotificationKind, Order};
use tracing::{debug, info, warn};

impl OrderEngine {
    /// Sends the notification for `kind` once, after the triggering write committed.
    ///
    /// Only a reported success flips the order's flag, through a write guarded on the
    /// flag still being unset. Failures and timeouts are logged and swallowed; the
    /// returned order is the freshest copy this call observed.
    pub(crate) async fn notify(&self, kind: NotificationKind, order: Order) -> Order {
        if order.notifications.is_sent(kind) {
            debug!(order_id = %order.order_id, ?kind, "notification already sent");
            return order;
        }

        let attempt =
            tokio::time::timeout(self.config.notify_timeout, self.notifier.send(kind, &order))
                .await;

        match attempt {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(order_id = %order.order_id, ?kind, error = %e, "notification failed");
                return order;
            }
            Err(_) => {
                warn!(order_id = %order.order_id, ?kind, "notification timed out");
                return order;
            }
        }

        let guard = Precondition::new().not_notified(kind);
        let change = OrderChange::MarkNotified { kind };
        match self.store.update_if(&order.order_id, &guard, &change).await {
            Ok(Some(updated)) => {
                info!(order_id = %updated.order_id, ?kind, "notification sent");
                updated
            }
            Ok(None) => {
                debug!(order_id = %order.order_id, ?kind, "notification flag already set");
                order
            }
            Err(e) => {
                warn!(
                    order_id = %order.order_id,
                    ?kind,
                    error = %e,
                    "notification sent but flag not persisted"
                );
                order
            }
        }
    }
}
