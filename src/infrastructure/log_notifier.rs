use crate::domain::order::{NotificationKind, Order};
use crate::domain::ports::{Notifier, NotifyError};
use async_trait::async_trait;
use tracing::info;

/// Records each customer notification as a structured log event instead of sending mail.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, kind: NotificationKind, order: &Order) -> Result<(), NotifyError> {
        if order.customer.email.is_empty() {
            return Err(NotifyError(format!(
                "order {} has no customer email",
                order.order_id
            )));
        }
        info!(
            target: "notifications",
            order_id = %order.order_id,
            to = %order.customer.email,
            ?kind,
            total = %order.total,
            status = %order.order_status,
            "notification delivered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::fixtures::gateway_order;
    use chrono::Utc;

    #[tokio::test]
    async fn test_log_notifier_requires_email() {
        let notifier = LogNotifier::new();
        let mut order = gateway_order("ORD-1", Utc::now());
        notifier
            .send(NotificationKind::Confirmation, &order)
            .await
            .unwrap();

        order.customer.email.clear();
        assert!(
            notifier
                .send(NotificationKind::Confirmation, &order)
                .await
                .is_err()
        );
    }
}
