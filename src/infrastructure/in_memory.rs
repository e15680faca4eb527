use crate::domain::mutation::{OrderChange, Precondition};
use crate::domain::order::Order;
use crate::domain::ports::OrderStore;
use crate::error::{OrderError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory order store.
///
/// Uses `Arc<RwLock<HashMap<String, Order>>>` so clones share the same orders. Conditional
/// writes check and mutate under one write guard, which makes them atomic per record.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<String, Order>>>,
}

impl InMemoryOrderStore {
    /// Creates a new, empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    async fn insert(&self, order: Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        match orders.entry(order.order_id.clone()) {
            Entry::Occupied(_) => Err(OrderError::Conflict(format!(
                "order {} already exists",
                order.order_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(order);
                Ok(())
            }
        }
    }

    async fn get(&self, order_id: &str) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(order_id).cloned())
    }

    async fn update_if(
        &self,
        order_id: &str,
        precondition: &Precondition,
        change: &OrderChange,
    ) -> Result<Option<Order>> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| OrderError::NotFound(format!("order {}", order_id)))?;

        if !precondition.holds(order) {
            return Ok(None);
        }
        change.apply(order, Utc::now());
        Ok(Some(order.clone()))
    }

    async fn delete_if(&self, order_id: &str, precondition: &Precondition) -> Result<bool> {
        let mut orders = self.orders.write().await;
        match orders.get(order_id) {
            Some(order) if precondition.holds(order) => {
                orders.remove(order_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_pending_gateway(&self) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut pending: Vec<Order> = orders
            .values()
            .filter(|o| o.awaiting_payment())
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(pending)
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.values().cloned().collect())
    }
}
