use crate::application::payments::PaymentConfirmation;
use crate::domain::intake::NewOrderRequest;
use crate::domain::order::OrderStatus;
use crate::error::{OrderError, Result};
use serde::Deserialize;
use std::io::BufRead;

/// One batch request, tagged by `op`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Request {
    CreateOrder(NewOrderRequest),
    InitiatePayment {
        order_id: String,
    },
    VerifyPayment(PaymentConfirmation),
    GetOrder {
        order_id: String,
    },
    ListPending,
    GetPendingOrder {
        order_id: String,
    },
    CancelPendingOrder {
        order_id: String,
    },
    ForceConfirm {
        order_id: String,
        payment_id: String,
    },
    UpdateStatus {
        order_id: String,
        status: OrderStatus,
    },
    Reap,
    /// Pays a gateway order on the simulated gateway and returns the signed callback.
    SimulatePayment {
        gateway_order_id: String,
        #[serde(default)]
        method: Option<String>,
    },
}

impl Request {
    pub fn op(&self) -> &'static str {
        match self {
            Request::CreateOrder(_) => "create_order",
            Request::InitiatePayment { .. } => "initiate_payment",
            Request::VerifyPayment(_) => "verify_payment",
            Request::GetOrder { .. } => "get_order",
            Request::ListPending => "list_pending",
            Request::GetPendingOrder { .. } => "get_pending_order",
            Request::CancelPendingOrder { .. } => "cancel_pending_order",
            Request::ForceConfirm { .. } => "force_confirm",
            Request::UpdateStatus { .. } => "update_status",
            Request::Reap => "reap",
            Request::SimulatePayment { .. } => "simulate_payment",
        }
    }
}

/// Reads newline-delimited JSON requests.
///
/// Blank lines and lines starting with `#` are skipped. A line that fails to parse yields
/// a validation error for that line only; the stream keeps going.
pub struct RequestReader<R: BufRead> {
    source: R,
}

impl<R: BufRead> RequestReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    /// Lazily yields `(line_number, request)` pairs. Line numbers are 1-based.
    pub fn requests(self) -> impl Iterator<Item = (usize, Result<Request>)> {
        self.source
            .lines()
            .enumerate()
            .filter_map(|(idx, line)| {
                let line_no = idx + 1;
                match line {
                    Ok(text) if text.trim().is_empty() || text.trim_start().starts_with('#') => {
                        None
                    }
                    Ok(text) => Some((line_no, parse_line(&text))),
                    Err(e) => Some((line_no, Err(OrderError::from(e)))),
                }
            })
    }
}

fn parse_line(text: &str) -> Result<Request> {
    serde_json::from_str(text).map_err(|e| OrderError::validation("request", e.to_string()))
}
