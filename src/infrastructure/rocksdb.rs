use crate::domain::mutation::{OrderChange, Precondition};
use crate::domain::order::Order;
use crate::domain::ports::OrderStore;
use crate::error::{OrderError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family holding orders, keyed by `order_id`, values are JSON.
pub const CF_ORDERS: &str = "orders";

/// A persistent order store backed by RocksDB.
///
/// RocksDB has no compare-and-set primitive, so every read-check-write sequence runs
/// while holding `write_lock`. Plain reads bypass it.
///
/// `Clone` shares the underlying `Arc<DB>` and the lock.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_orders = ColumnFamilyDescriptor::new(CF_ORDERS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_orders])?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn orders_cf(&self) -> Result<&ColumnFamily> {
        self.db.cf_handle(CF_ORDERS).ok_or_else(|| {
            OrderError::Storage(Box::new(std::io::Error::other(
                "orders column family not found",
            )))
        })
    }

    fn read(&self, order_id: &str) -> Result<Option<Order>> {
        let cf = self.orders_cf()?;
        match self.db.get_pinned_cf(cf, order_id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write(&self, order: &Order) -> Result<()> {
        let cf = self.orders_cf()?;
        let value = serde_json::to_vec(order)?;
        self.db.put_cf(cf, order.order_id.as_bytes(), value)?;
        Ok(())
    }

    fn scan(&self) -> Result<Vec<Order>> {
        let cf = self.orders_cf()?;
        let mut orders = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            orders.push(serde_json::from_slice(&value)?);
        }
        Ok(orders)
    }
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn health_check(&self) -> Result<()> {
        self.orders_cf().map(|_| ())
    }

    async fn insert(&self, order: Order) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self.read(&order.order_id)?.is_some() {
            return Err(OrderError::Conflict(format!(
                "order {} already exists",
                order.order_id
            )));
        }
        self.write(&order)
    }

    async fn get(&self, order_id: &str) -> Result<Option<Order>> {
        self.read(order_id)
    }

    async fn update_if(
        &self,
        order_id: &str,
        precondition: &Precondition,
        change: &OrderChange,
    ) -> Result<Option<Order>> {
        let _guard = self.write_lock.lock().await;
        let mut order = self
            .read(order_id)?
            .ok_or_else(|| OrderError::NotFound(format!("order {}", order_id)))?;

        if !precondition.holds(&order) {
            return Ok(None);
        }
        change.apply(&mut order, Utc::now());
        self.write(&order)?;
        Ok(Some(order))
    }

    async fn delete_if(&self, order_id: &str, precondition: &Precondition) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        match self.read(order_id)? {
            Some(order) if precondition.holds(&order) => {
                let cf = self.orders_cf()?;
                self.db.delete_cf(cf, order_id.as_bytes())?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_pending_gateway(&self) -> Result<Vec<Order>> {
        let mut pending: Vec<Order> = self
            .scan()?
            .into_iter()
            .filter(|o| o.awaiting_payment())
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(pending)
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        self.scan()
    }
}
