use super::money::Money;
use super::mutation::{OrderChange, Precondition};
use super::order::{NotificationKind, Order};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Persistent collection of orders keyed by `order_id`.
///
/// Implementations must make `insert`, `update_if` and `delete_if` atomic per record:
/// these are the only synchronization points between concurrent requests.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Confirms the backing store is reachable.
    async fn health_check(&self) -> Result<()>;

    /// Persists a new order. Fails with `Conflict` if the id is taken; never overwrites.
    async fn insert(&self, order: Order) -> Result<()>;

    async fn get(&self, order_id: &str) -> Result<Option<Order>>;

    /// Applies `change` only if `precondition` still holds.
    ///
    /// Returns the updated order, `None` when the precondition failed, and `NotFound`
    /// when no such order exists.
    async fn update_if(
        &self,
        order_id: &str,
        precondition: &Precondition,
        change: &OrderChange,
    ) -> Result<Option<Order>>;

    /// Removes the order only if `precondition` still holds. Returns whether it was removed.
    async fn delete_if(&self, order_id: &str, precondition: &Precondition) -> Result<bool>;

    /// Gateway orders still waiting for payment, oldest first.
    async fn list_pending_gateway(&self) -> Result<Vec<Order>>;

    async fn all_orders(&self) -> Result<Vec<Order>>;
}

pub type OrderStoreBox = Box<dyn OrderStore>;

/// Factory for creating order stores.
pub type OrderStoreFactory = Box<dyn Fn() -> OrderStoreBox + Send + Sync>;

/// Remote order creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOrderRequest {
    /// Amount in minor currency units.
    pub amount: i64,
    pub currency: String,
    /// Local order id, echoed back by the gateway.
    pub receipt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOrder {
    /// Empty when the gateway answered without an identifier.
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayPayment {
    pub id: String,
    /// Raw instrument name as reported by the gateway (`upi`, `card`, ...).
    pub method: String,
    pub amount: Option<Money>,
    pub captured_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum GatewayFailure {
    #[error("gateway rejected request: {0}")]
    Rejected(String),
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
    #[error("unknown payment: {0}")]
    UnknownPayment(String),
}

/// The external payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_order(
        &self,
        request: GatewayOrderRequest,
    ) -> std::result::Result<GatewayOrder, GatewayFailure>;

    async fn fetch_payment(
        &self,
        payment_id: &str,
    ) -> std::result::Result<GatewayPayment, GatewayFailure>;
}

pub type PaymentGatewayBox = Box<dyn PaymentGateway>;

#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Delivers customer messages. Owns templating, attachments and its own retries.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, kind: NotificationKind, order: &Order)
    -> std::result::Result<(), NotifyError>;
}

pub type NotifierBox = Box<dyn Notifier>;
