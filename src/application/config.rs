use crate::domain::expiry::ExpiryPolicy;
use crate::domain::money::Money;
use crate::domain::pricing::PricingPolicy;
use crate::error::{OrderError, Result};
use std::time::Duration;

const MAX_WINDOW_DAYS: i64 = 365;

/// Runtime settings for [`OrderEngine`](super::engine::OrderEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub pricing: PricingPolicy,
    pub expiry: ExpiryPolicy,
    /// ISO currency code sent to the gateway.
    pub currency: String,
    /// Public key id handed to the storefront checkout widget.
    pub gateway_key_id: String,
    /// Shared secret for callback signatures.
    pub gateway_secret: String,
    /// Upper bound on each outbound gateway call.
    pub gateway_timeout: Duration,
    /// Upper bound on each notification attempt.
    pub notify_timeout: Duration,
}

impl EngineConfig {
    pub fn new(gateway_key_id: impl Into<String>, gateway_secret: impl Into<String>) -> Self {
        Self {
            pricing: PricingPolicy::default(),
            expiry: ExpiryPolicy::default(),
            currency: "INR".to_string(),
            gateway_key_id: gateway_key_id.into(),
            gateway_secret: gateway_secret.into(),
            gateway_timeout: Duration::from_secs(10),
            notify_timeout: Duration::from_secs(10),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.gateway_secret.is_empty() {
            return Err(OrderError::Config("gateway secret must not be empty".into()));
        }
        if self.gateway_key_id.is_empty() {
            return Err(OrderError::Config("gateway key id must not be empty".into()));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(OrderError::Config(format!(
                "currency '{}' is not an ISO 4217 code",
                self.currency
            )));
        }
        if self.expiry.window() <= chrono::Duration::zero() {
            return Err(OrderError::Config("payment window must be positive".into()));
        }
        if self.expiry.window() > chrono::Duration::days(MAX_WINDOW_DAYS) {
            return Err(OrderError::Config(format!(
                "payment window must not exceed {} days",
                MAX_WINDOW_DAYS
            )));
        }
        let pricing = &self.pricing;
        if pricing.shipping_fee.is_negative()
            || pricing.free_shipping_threshold.is_negative()
            || pricing.minimum_total <= Money::ZERO
        {
            return Err(OrderError::Config(
                "shipping fee and threshold must not be negative, minimum total must be positive"
                    .into(),
            ));
        }
        if self.gateway_timeout.is_zero() || self.notify_timeout.is_zero() {
            return Err(OrderError::Config("timeouts must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::new("rzp_test_key", "secret");
        assert!(config.validate().is_ok());
        assert_eq!(config.expiry.window(), chrono::Duration::minutes(30));
    }

    #[test]
    fn test_empty_secret_rejected() {
        let config = EngineConfig::new("rzp_test_key", "");
        assert!(matches!(config.validate(), Err(OrderError::Config(_))));
    }

    #[test]
    fn test_bad_currency_rejected() {
        let mut config = EngineConfig::new("k", "s");
        config.currency = "rupees".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_fee_rejected() {
        let mut config = EngineConfig::new("k", "s");
        config.pricing.shipping_fee = Money::new(dec!(-1));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = EngineConfig::new("k", "s");
        config.expiry = ExpiryPolicy::new(chrono::Duration::zero());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_window_rejected() {
        let mut config = EngineConfig::new("k", "s");
        config.expiry = ExpiryPolicy::new(chrono::Duration::days(MAX_WINDOW_DAYS + 1));
        assert!(matches!(config.validate(), Err(OrderError::Config(_))));

        config.expiry = ExpiryPolicy::new(chrono::Duration::days(MAX_WINDOW_DAYS));
        assert!(config.validate().is_ok());
    }
}
