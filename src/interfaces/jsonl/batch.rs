use super::request_reader::{Request, RequestReader};
use super::response_writer::{Response, ResponseWriter};
use crate::application::engine::OrderEngine;
use crate::error::{OrderError, Result};
use crate::infrastructure::simulated_gateway::SimulatedGateway;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use std::io::{BufRead, Write};
use tracing::{debug, info};

/// Tally of a processed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Feeds batch requests through an [`OrderEngine`], one at a time, in input order.
pub struct BatchProcessor<'a> {
    engine: &'a OrderEngine,
    simulator: Option<&'a SimulatedGateway>,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(engine: &'a OrderEngine) -> Self {
        Self {
            engine,
            simulator: None,
        }
    }

    /// Enables the `simulate_payment` op against `gateway`.
    pub fn with_simulator(mut self, gateway: &'a SimulatedGateway) -> Self {
        self.simulator = Some(gateway);
        self
    }

    pub async fn handle(&self, request: Request) -> Result<Value> {
        let engine = self.engine;
        let value = match request {
            Request::CreateOrder(req) => serde_json::to_value(engine.create_order(req).await?)?,
            Request::InitiatePayment { order_id } => {
                serde_json::to_value(engine.initiate_payment(&order_id).await?)?
            }
            Request::VerifyPayment(confirmation) => {
                serde_json::to_value(engine.verify_payment(confirmation).await?)?
            }
            Request::GetOrder { order_id } => serde_json::to_value(engine.get_order(&order_id).await?)?,
            Request::ListPending => serde_json::to_value(engine.list_pending_orders().await?)?,
            Request::GetPendingOrder { order_id } => {
                serde_json::to_value(engine.get_pending_order(&order_id).await?)?
            }
            Request::CancelPendingOrder { order_id } => {
                serde_json::to_value(engine.cancel_pending_order(&order_id).await?)?
            }
            Request::ForceConfirm {
                order_id,
                payment_id,
            } => serde_json::to_value(engine.force_confirm_payment(&order_id, &payment_id).await?)?,
            Request::UpdateStatus { order_id, status } => {
                serde_json::to_value(engine.update_order_status(&order_id, status).await?)?
            }
            Request::Reap => serde_json::to_value(engine.purge_expired(Utc::now()).await?)?,
            Request::SimulatePayment {
                gateway_order_id,
                method,
            } => {
                let gateway = self.simulator.ok_or_else(|| {
                    OrderError::Config("simulate_payment requires the simulated gateway".into())
                })?;
                let method = method.unwrap_or_else(|| "upi".to_string());
                let (payment_id, signature) =
                    gateway.complete_payment(&gateway_order_id, &method)?;
                json!({
                    "gatewayOrderId": gateway_order_id,
                    "paymentId": payment_id,
                    "signature": signature,
                })
            }
        };
        Ok(value)
    }

    /// Processes every request from `reader`, writing one response per request.
    ///
    /// Request failures are reported in-band. Only a failure to write a response aborts.
    pub async fn run<R: BufRead, W: Write>(
        &self,
        reader: RequestReader<R>,
        writer: &mut ResponseWriter<W>,
    ) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();

        for (line, parsed) in reader.requests() {
            let response = match parsed {
                Ok(request) => {
                    let op = request.op();
                    debug!(line, op, "processing request");
                    match self.handle(request).await {
                        Ok(result) => Response::success(line, op, result),
                        Err(e) => {
                            debug!(line, op, error = %e, "request failed");
                            Response::failure(line, Some(op), &e)
                        }
                    }
                }
                Err(e) => Response::failure(line, None, &e),
            };
            if response.ok {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            writer.write_response(&response)?;
        }
        writer.flush()?;

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "batch complete"
        );
        Ok(summary)
    }
}
