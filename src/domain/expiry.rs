use super::order::Order;
use chrono::{DateTime, Duration, Utc};

/// How long an unpaid gateway order stays actionable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    window: Duration,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::new(Duration::minutes(30))
    }
}

impl ExpiryPolicy {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Orders created at or before this instant are past the window.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.window
    }

    /// Only unpaid gateway orders expire; everything else lives until deleted.
    pub fn applies_to(&self, order: &Order) -> bool {
        order.awaiting_payment()
    }

    pub fn is_expired(&self, order: &Order, now: DateTime<Utc>) -> bool {
        self.applies_to(order) && order.created_at <= self.cutoff(now)
    }

    pub fn expires_at(&self, order: &Order) -> DateTime<Utc> {
        order.created_at + self.window
    }
}
