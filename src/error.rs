use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every problem found while validating one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self(vec![FieldError::new(field, message)])
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    /// Turns the collected list into a `Result`, succeeding only when nothing was pushed.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(OrderError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

#[derive(Error, Debug)]
pub enum OrderError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("payment signature verification failed")]
    Signature,
    #[error("payment gateway error: {0}")]
    Gateway(String),
    #[error("order expired: {0}")]
    Expired(String),
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("configuration error: {0}")]
    Config(String),
}

impl OrderError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(ValidationErrors::single(field, message))
    }

    /// HTTP-equivalent status for transport layers.
    pub fn status_code(&self) -> u16 {
        match self {
            OrderError::Validation(_) => 400,
            OrderError::Signature => 401,
            OrderError::NotFound(_) => 404,
            OrderError::Conflict(_) => 409,
            OrderError::Expired(_) => 410,
            OrderError::Gateway(_) => 502,
            OrderError::Storage(_) | OrderError::Config(_) => 500,
        }
    }

    /// Short machine-readable kind, used in batch responses.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderError::Validation(_) => "validation",
            OrderError::Conflict(_) => "conflict",
            OrderError::NotFound(_) => "not_found",
            OrderError::Signature => "signature",
            OrderError::Gateway(_) => "gateway",
            OrderError::Expired(_) => "expired",
            OrderError::Storage(_) => "storage",
            OrderError::Config(_) => "config",
        }
    }
}

impl From<std::io::Error> for OrderError {
    fn from(err: std::io::Error) -> Self {
        OrderError::Storage(Box::new(err))
    }
}

impl From<serde_json::Error> for OrderError {
    fn from(err: serde_json::Error) -> Self {
        OrderError::Storage(Box::new(err))
    }
}

impl From<csv::Error> for OrderError {
    fn from(err: csv::Error) -> Self {
        OrderError::Storage(Box::new(err))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for OrderError {
    fn from(err: rocksdb::Error) -> Self {
        OrderError::Storage(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, OrderError>;
