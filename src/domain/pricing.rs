use super::money::Money;
use super::order::{Order, OrderItem};
use crate::error::{OrderError, Result, ValidationErrors};
use rust_decimal_macros::dec;
use serde::Serialize;

/// The only coupon code the store honors.
pub const FREE_SHIPPING_CODE: &str = "FREESHIPPING";

/// Shipping tiers and the order floor. Fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    /// Subtotals at or above this ship for free.
    pub free_shipping_threshold: Money,
    /// Flat fee charged below the threshold.
    pub shipping_fee: Money,
    /// No order is ever charged less than this.
    pub minimum_total: Money,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Money::new(dec!(500)),
            shipping_fee: Money::new(dec!(50)),
            minimum_total: Money::new(dec!(1)),
        }
    }
}

/// Server-derived prices for a set of item lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingBreakdown {
    pub subtotal: Money,
    /// Shipping actually charged (zero when free shipping is applied).
    pub shipping_cost: Money,
    pub discount: Money,
    pub total: Money,
    /// Shipping the subtotal would cost without any coupon.
    pub expected_shipping_cost: Money,
}

/// Returns true for the free-shipping code, ignoring case and surrounding blanks.
pub fn is_free_shipping(code: &str) -> bool {
    code.trim().eq_ignore_ascii_case(FREE_SHIPPING_CODE)
}

fn normalized_coupon(code: Option<&str>) -> Option<&str> {
    code.map(str::trim).filter(|c| !c.is_empty())
}

fn out_of_range() -> OrderError {
    OrderError::validation("items", "amount out of range")
}

impl PricingPolicy {
    pub fn expected_shipping(&self, subtotal: Money) -> Money {
        if subtotal >= self.free_shipping_threshold {
            Money::ZERO
        } else {
            self.shipping_fee
        }
    }

    /// Derives subtotal, shipping, discount and total.
    ///
    /// A coupon code other than [`FREE_SHIPPING_CODE`] is rejected rather than ignored.
    /// The free-shipping discount is the waived shipping fee, so the charged total is
    /// `subtotal + expected_shipping - discount`, floored at `minimum_total`.
    pub fn compute(&self, items: &[OrderItem], coupon_code: Option<&str>) -> Result<PricingBreakdown> {
        let subtotal = items
            .iter()
            .try_fold(Money::ZERO, |acc, item| acc.checked_add(item.line_total()?))
            .ok_or_else(out_of_range)?;
        let expected_shipping_cost = self.expected_shipping(subtotal);

        let (shipping_cost, discount) = match normalized_coupon(coupon_code) {
            None => (expected_shipping_cost, Money::ZERO),
            Some(code) if is_free_shipping(code) => (Money::ZERO, expected_shipping_cost),
            Some(code) => {
                return Err(OrderError::validation(
                    "coupon.code",
                    format!("unrecognized coupon code '{}'", code),
                ));
            }
        };

        let total = subtotal
            .checked_add(expected_shipping_cost)
            .ok_or_else(out_of_range)?
            - discount;
        let total = total.max(self.minimum_total);

        Ok(PricingBreakdown {
            subtotal,
            shipping_cost,
            discount,
            total,
            expected_shipping_cost,
        })
    }

    /// Re-derives the prices of a stored order and fails closed on any disagreement.
    pub fn revalidate(&self, order: &Order) -> Result<PricingBreakdown> {
        let pricing = self.compute(&order.items, order.coupon_code())?;

        let mut errors = ValidationErrors::new();
        if !order.subtotal.approx_eq(pricing.subtotal) {
            errors.push("subtotal", "stored subtotal does not match item prices");
        }
        if !order.shipping_method.cost.approx_eq(pricing.shipping_cost) {
            errors.push("shippingMethod.cost", "stored shipping cost does not match policy");
        }
        if !order.discount().approx_eq(pricing.discount) {
            errors.push("coupon.discount", "stored discount does not match coupon");
        }
        if !order.total.approx_eq(pricing.total) {
            errors.push("total", "stored total does not match derived total");
        }
        errors.into_result()?;

        Ok(pricing)
    }
}
