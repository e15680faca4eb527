use crate::domain::ports::{
    GatewayFailure, GatewayOrder, GatewayOrderRequest, GatewayPayment, PaymentGateway,
};
use crate::domain::signature::SignatureVerifier;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behavior {
    Normal,
    /// `create_order` always reports the gateway as unavailable.
    Failing,
    /// `create_order` succeeds but answers without an order id.
    Anonymous,
    /// `fetch_payment` never finds anything.
    NoLookup,
}

#[derive(Debug, Default)]
struct Ledger {
    orders: HashMap<String, GatewayOrderRequest>,
    /// payment id -> (gateway order id, instrument)
    payments: HashMap<String, (String, String)>,
    created: usize,
    next_payment: u64,
}

/// An in-process payment gateway.
///
/// Remote order ids are derived from the receipt (`ORD-7` becomes `order_ORD7`), so a
/// retried initiation maps to the same remote order. Payments completed through
/// [`SimulatedGateway::complete_payment`] are signed with the shared secret exactly as the
/// real gateway signs its checkout callback.
///
/// Clones share the same ledger.
#[derive(Clone)]
pub struct SimulatedGateway {
    signer: SignatureVerifier,
    behavior: Behavior,
    ledger: Arc<Mutex<Ledger>>,
}

impl SimulatedGateway {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self::with_behavior(secret, Behavior::Normal)
    }

    pub fn failing(secret: impl AsRef<[u8]>) -> Self {
        Self::with_behavior(secret, Behavior::Failing)
    }

    pub fn anonymous(secret: impl AsRef<[u8]>) -> Self {
        Self::with_behavior(secret, Behavior::Anonymous)
    }

    pub fn without_payment_lookup(secret: impl AsRef<[u8]>) -> Self {
        Self::with_behavior(secret, Behavior::NoLookup)
    }

    fn with_behavior(secret: impl AsRef<[u8]>, behavior: Behavior) -> Self {
        Self {
            signer: SignatureVerifier::new(secret),
            behavior,
            ledger: Arc::default(),
        }
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of remote orders created so far.
    pub fn created_orders(&self) -> usize {
        self.ledger().created
    }

    /// Simulates the customer paying for `gateway_order_id` with `method`.
    ///
    /// Returns the payment id and the callback signature the checkout widget would relay.
    pub fn complete_payment(
        &self,
        gateway_order_id: &str,
        method: &str,
    ) -> crate::error::Result<(String, String)> {
        let mut ledger = self.ledger();
        let payment_id = format!("pay_{:06}", ledger.next_payment + 1);
        let signature = self.signer.sign(gateway_order_id, &payment_id)?;
        ledger.next_payment += 1;
        ledger.payments.insert(
            payment_id.clone(),
            (gateway_order_id.to_string(), method.to_string()),
        );
        Ok((payment_id, signature))
    }
}

fn remote_order_id(receipt: &str) -> String {
    let compact: String = receipt.chars().filter(|c| *c != '-').collect();
    format!("order_{}", compact)
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn create_order(
        &self,
        request: GatewayOrderRequest,
    ) -> Result<GatewayOrder, GatewayFailure> {
        if request.amount <= 0 {
            return Err(GatewayFailure::Rejected(format!(
                "invalid amount {}",
                request.amount
            )));
        }
        let id = match self.behavior {
            Behavior::Failing => {
                return Err(GatewayFailure::Unavailable("connection refused".into()));
            }
            Behavior::Anonymous => String::new(),
            Behavior::Normal | Behavior::NoLookup => remote_order_id(&request.receipt),
        };

        let mut ledger = self.ledger();
        ledger.created += 1;
        if !id.is_empty() {
            ledger.orders.insert(id.clone(), request.clone());
        }
        Ok(GatewayOrder {
            id,
            amount: request.amount,
            currency: request.currency,
        })
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment, GatewayFailure> {
        if self.behavior == Behavior::NoLookup {
            return Err(GatewayFailure::Unavailable("payment lookup disabled".into()));
        }
        let ledger = self.ledger();
        let (_gateway_order_id, method) = ledger
            .payments
            .get(payment_id)
            .ok_or_else(|| GatewayFailure::UnknownPayment(payment_id.to_string()))?;
        Ok(GatewayPayment {
            id: payment_id.to_string(),
            method: method.clone(),
            amount: None,
            captured_at: Some(Utc::now()),
        })
    }
}
