//! Order-intake input and its validation.
//!
//! Requests arrive loosely typed. [`NewOrderRequest::validate`] turns one into a
//! [`ValidatedOrder`] or a complete list of field errors, and re-derives every price.

use super::lifecycle::OrderState;
use super::money::Money;
use super::order::{
    Coupon, Customer, NotificationFlags, Order, OrderItem, PaymentMethod, ShippingAddress,
    ShippingKind, ShippingMethod,
};
use super::pricing::{PricingBreakdown, PricingPolicy, is_free_shipping};
use crate::error::{OrderError, Result, ValidationErrors};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

const MAX_TEXT_LEN: usize = 200;
const MAX_ORDER_ID_LEN: usize = 64;
const MAX_ITEM_QUANTITY: i64 = 10_000;
const MAX_ITEM_PRICE: Decimal = dec!(10000000);

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CustomerInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AddressInput {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ItemInput {
    pub product_id: Option<String>,
    pub name: Option<String>,
    pub quantity: Option<i64>,
    pub price: Option<Decimal>,
    pub variant: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShippingMethodInput {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub cost: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CouponInput {
    pub code: Option<String>,
    pub discount: Option<Decimal>,
}

/// Order-intake payload as sent by the storefront.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewOrderRequest {
    /// Client-chosen id, used as an idempotency key. Generated when absent.
    pub order_id: Option<String>,
    pub customer: CustomerInput,
    pub shipping_address: AddressInput,
    pub items: Vec<ItemInput>,
    pub shipping_method: ShippingMethodInput,
    pub coupon: Option<CouponInput>,
    pub payment_method: Option<String>,
    /// Total the client displayed to the customer.
    pub total: Option<Decimal>,
}

/// An intake request that passed validation, with server-derived prices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrder {
    pub order_id: Option<String>,
    pub customer: Customer,
    pub shipping_address: ShippingAddress,
    pub items: Vec<OrderItem>,
    pub shipping_kind: ShippingKind,
    pub coupon_code: Option<String>,
    pub payment_method: PaymentMethod,
    pub pricing: PricingBreakdown,
}

impl ValidatedOrder {
    pub fn into_order(self, order_id: String, now: DateTime<Utc>) -> Order {
        let state = OrderState::initial(self.payment_method);
        let coupon = self.coupon_code.map(|code| Coupon {
            code,
            discount: self.pricing.discount,
        });
        Order {
            order_id,
            customer: self.customer,
            shipping_address: self.shipping_address,
            items: self.items,
            shipping_method: ShippingMethod {
                kind: self.shipping_kind,
                cost: self.pricing.shipping_cost,
            },
            coupon,
            payment_method: self.payment_method,
            payment_status: state.payment,
            order_status: state.order,
            gateway_order_id: None,
            gateway_payment_id: None,
            gateway_instrument: None,
            subtotal: self.pricing.subtotal,
            total: self.pricing.total,
            notifications: NotificationFlags::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

fn required_text(errors: &mut ValidationErrors, field: &str, value: &Option<String>) -> String {
    match value.as_deref().map(str::trim) {
        None | Some("") => {
            errors.push(field, "is required");
            String::new()
        }
        Some(v) if v.chars().count() > MAX_TEXT_LEN => {
            errors.push(field, format!("must be at most {} characters", MAX_TEXT_LEN));
            String::new()
        }
        Some(v) => v.to_string(),
    }
}

fn optional_text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

fn valid_phone(phone: &str) -> bool {
    let digits: String = phone
        .trim_start_matches('+')
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect();
    (10..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

fn valid_postal_code(code: &str) -> bool {
    code.len() <= 10
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-')
}

pub fn valid_order_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ORDER_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn parse_payment_method(raw: &str) -> Option<PaymentMethod> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "cod" | "cash_on_delivery" => Some(PaymentMethod::Cod),
        "gateway" | "online" | "razorpay" => Some(PaymentMethod::Gateway),
        _ => None,
    }
}

fn parse_shipping_kind(raw: &str) -> Option<ShippingKind> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "standard" => Some(ShippingKind::Standard),
        "express" => Some(ShippingKind::Express),
        _ => None,
    }
}

impl NewOrderRequest {
    /// Validates every field and checks the client's prices against `policy`.
    ///
    /// Field problems are reported together. Pricing is only compared once the item
    /// lines themselves are valid.
    pub fn validate(&self, policy: &PricingPolicy) -> Result<ValidatedOrder> {
        let mut errors = ValidationErrors::new();

        let order_id = optional_text(&self.order_id);
        if let Some(id) = &order_id
            && !valid_order_id(id)
        {
            errors.push(
                "orderId",
                "must be 1-64 characters of letters, digits, '-' or '_'",
            );
        }

        let customer = Customer {
            name: required_text(&mut errors, "customer.name", &self.customer.name),
            email: required_text(&mut errors, "customer.email", &self.customer.email),
            phone: required_text(&mut errors, "customer.phone", &self.customer.phone),
        };
        if !customer.email.is_empty() && !valid_email(&customer.email) {
            errors.push("customer.email", "is not a valid email address");
        }
        if !customer.phone.is_empty() && !valid_phone(&customer.phone) {
            errors.push("customer.phone", "must contain 10 to 15 digits");
        }

        let address = &self.shipping_address;
        let shipping_address = ShippingAddress {
            line1: required_text(&mut errors, "shippingAddress.line1", &address.line1),
            line2: optional_text(&address.line2),
            city: required_text(&mut errors, "shippingAddress.city", &address.city),
            state: required_text(&mut errors, "shippingAddress.state", &address.state),
            postal_code: required_text(
                &mut errors,
                "shippingAddress.postalCode",
                &address.postal_code,
            ),
            country: required_text(&mut errors, "shippingAddress.country", &address.country),
        };
        if !shipping_address.postal_code.is_empty()
            && !valid_postal_code(&shipping_address.postal_code)
        {
            errors.push("shippingAddress.postalCode", "is not a valid postal code");
        }

        if self.items.is_empty() {
            errors.push("items", "must contain at least one item");
        }
        let items_before = errors.fields().len();
        let items: Vec<OrderItem> = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let product_id =
                    required_text(&mut errors, &format!("items[{i}].productId"), &item.product_id);
                let name = required_text(&mut errors, &format!("items[{i}].name"), &item.name);
                let quantity = match item.quantity {
                    Some(q) if (1..=MAX_ITEM_QUANTITY).contains(&q) => q as u32,
                    Some(q) if q > MAX_ITEM_QUANTITY => {
                        errors.push(
                            format!("items[{i}].quantity"),
                            format!("must not exceed {MAX_ITEM_QUANTITY}"),
                        );
                        0
                    }
                    Some(_) => {
                        errors.push(format!("items[{i}].quantity"), "must be at least 1");
                        0
                    }
                    None => {
                        errors.push(format!("items[{i}].quantity"), "is required");
                        0
                    }
                };
                let price = match item.price {
                    Some(p) if p > MAX_ITEM_PRICE => {
                        errors.push(
                            format!("items[{i}].price"),
                            format!("must not exceed {MAX_ITEM_PRICE}"),
                        );
                        Money::ZERO
                    }
                    Some(p) if !p.is_sign_negative() || p.is_zero() => Money::new(p),
                    Some(_) => {
                        errors.push(format!("items[{i}].price"), "must not be negative");
                        Money::ZERO
                    }
                    None => {
                        errors.push(format!("items[{i}].price"), "is required");
                        Money::ZERO
                    }
                };
                OrderItem {
                    product_id,
                    name,
                    quantity,
                    price,
                    variant: optional_text(&item.variant),
                }
            })
            .collect();
        let items_valid = !items.is_empty() && errors.fields().len() == items_before;

        let shipping_kind = match self.shipping_method.kind.as_deref() {
            Some(raw) => parse_shipping_kind(raw).unwrap_or_else(|| {
                errors.push("shippingMethod.type", "must be Standard or Express");
                ShippingKind::Standard
            }),
            None => {
                errors.push("shippingMethod.type", "is required");
                ShippingKind::Standard
            }
        };
        match self.shipping_method.cost {
            Some(cost) if cost.is_sign_negative() && !cost.is_zero() => {
                errors.push("shippingMethod.cost", "must not be negative");
            }
            Some(_) => {}
            None => errors.push("shippingMethod.cost", "is required"),
        }

        let payment_method = match self.payment_method.as_deref() {
            Some(raw) => parse_payment_method(raw).unwrap_or_else(|| {
                errors.push("paymentMethod", "must be COD or Gateway");
                PaymentMethod::Gateway
            }),
            None => {
                errors.push("paymentMethod", "is required");
                PaymentMethod::Gateway
            }
        };

        let coupon_code = self
            .coupon
            .as_ref()
            .and_then(|c| optional_text(&c.code))
            .map(|code| code.to_ascii_uppercase());
        if let Some(code) = &coupon_code
            && !is_free_shipping(code)
        {
            errors.push("coupon.code", format!("unrecognized coupon code '{}'", code));
        }

        let declared_total = match self.total {
            Some(total) if total.is_sign_negative() && !total.is_zero() => {
                errors.push("total", "must not be negative");
                None
            }
            Some(total) => Some(Money::new(total)),
            None => {
                errors.push("total", "is required");
                None
            }
        };

        if !items_valid || !errors.is_empty() {
            return Err(OrderError::Validation(errors));
        }

        let pricing = policy.compute(&items, coupon_code.as_deref())?;
        if let Some(cost) = self.shipping_method.cost
            && !Money::new(cost).approx_eq(pricing.shipping_cost)
        {
            errors.push(
                "shippingMethod.cost",
                format!("expected {} for this order", pricing.shipping_cost),
            );
        }
        if let Some(discount) = self.coupon.as_ref().and_then(|c| c.discount)
            && !Money::new(discount).approx_eq(pricing.discount)
        {
            errors.push(
                "coupon.discount",
                format!("expected {} for this order", pricing.discount),
            );
        }
        if let Some(total) = declared_total
            && !total.approx_eq(pricing.total)
        {
            errors.push("total", format!("expected {} for this order", pricing.total));
        }
        errors.into_result()?;

        Ok(ValidatedOrder {
            order_id,
            customer,
            shipping_address,
            items,
            shipping_kind,
            coupon_code,
            payment_method,
            pricing,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::request;
    use super::*;
    use crate::domain::order::{OrderStatus, PaymentStatus};
    use rust_decimal_macros::dec;

    fn field_names(err: OrderError) -> Vec<String> {
        match err {
            OrderError::Validation(errors) => {
                errors.fields().iter().map(|f| f.field.clone()).collect()
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_request() {
        let validated = request("Gateway")
            .validate(&PricingPolicy::default())
            .unwrap();
        assert_eq!(validated.payment_method, PaymentMethod::Gateway);
        assert_eq!(validated.pricing.total, Money::new(dec!(500)));
        assert_eq!(validated.items.len(), 2);
    }

    #[test]
    fn test_free_shipping_request() {
        let mut req = request("COD");
        req.coupon = Some(CouponInput {
            code: Some("freeshipping".to_string()),
            discount: Some(dec!(50)),
        });
        req.shipping_method.cost = Some(dec!(0));
        req.total = Some(dec!(450));
        let validated = req.validate(&PricingPolicy::default()).unwrap();
        assert_eq!(validated.coupon_code.as_deref(), Some("FREESHIPPING"));
        assert_eq!(validated.pricing.discount, Money::new(dec!(50)));
    }

    #[test]
    fn test_tampered_total_rejected() {
        let mut req = request("Gateway");
        req.total = Some(dec!(1));
        let fields = field_names(req.validate(&PricingPolicy::default()).unwrap_err());
        assert_eq!(fields, vec!["total"]);
    }

    #[test]
    fn test_total_within_tolerance_accepted() {
        let mut req = request("Gateway");
        req.total = Some(dec!(500.01));
        assert!(req.validate(&PricingPolicy::default()).is_ok());
    }

    #[test]
    fn test_tampered_shipping_rejected() {
        let mut req = request("Gateway");
        req.shipping_method.cost = Some(dec!(0));
        req.total = Some(dec!(450));
        let fields = field_names(req.validate(&PricingPolicy::default()).unwrap_err());
        assert!(fields.contains(&"shippingMethod.cost".to_string()));
        assert!(fields.contains(&"total".to_string()));
    }

    #[test]
    fn test_unknown_coupon_rejected() {
        let mut req = request("Gateway");
        req.coupon = Some(CouponInput {
            code: Some("WELCOME10".to_string()),
            discount: None,
        });
        let fields = field_names(req.validate(&PricingPolicy::default()).unwrap_err());
        assert_eq!(fields, vec!["coupon.code"]);
    }

    #[test]
    fn test_all_field_errors_reported_together() {
        let mut req = request("Bitcoin");
        req.customer.email = Some("not-an-email".to_string());
        req.items[0].quantity = Some(0);
        req.items[1].price = Some(dec!(-5));
        let fields = field_names(req.validate(&PricingPolicy::default()).unwrap_err());
        assert!(fields.contains(&"customer.email".to_string()));
        assert!(fields.contains(&"items[0].quantity".to_string()));
        assert!(fields.contains(&"items[1].price".to_string()));
        assert!(fields.contains(&"paymentMethod".to_string()));
    }

    #[test]
    fn test_oversized_item_lines_rejected() {
        let mut req = request("COD");
        req.items[0].price = Some(dec!(70000000000000000000000000000));
        req.items[1].quantity = Some(i64::from(u32::MAX));
        let fields = field_names(req.validate(&PricingPolicy::default()).unwrap_err());
        assert_eq!(fields, vec!["items[0].price", "items[1].quantity"]);
    }

    #[test]
    fn test_item_caps_are_inclusive() {
        let mut req = request("COD");
        req.items = vec![ItemInput {
            product_id: Some("p-9".to_string()),
            name: Some("Sofa".to_string()),
            quantity: Some(MAX_ITEM_QUANTITY),
            price: Some(MAX_ITEM_PRICE),
            variant: None,
        }];
        req.shipping_method.cost = Some(dec!(0));
        req.total = Some(dec!(100000000000));
        let validated = req.validate(&PricingPolicy::default()).unwrap();
        assert_eq!(validated.pricing.total, Money::new(dec!(100000000000)));
    }

    #[test]
    fn test_empty_items_rejected() {
        let mut req = request("COD");
        req.items.clear();
        let fields = field_names(req.validate(&PricingPolicy::default()).unwrap_err());
        assert!(fields.contains(&"items".to_string()));
    }

    #[test]
    fn test_missing_payload_reports_required_fields() {
        let fields = field_names(
            NewOrderRequest::default()
                .validate(&PricingPolicy::default())
                .unwrap_err(),
        );
        for field in ["customer.name", "shippingAddress.city", "items", "total"] {
            assert!(fields.contains(&field.to_string()), "missing {field}");
        }
    }

    #[test]
    fn test_bad_client_order_id_rejected() {
        let mut req = request("COD");
        req.order_id = Some("ORD 1/../x".to_string());
        let fields = field_names(req.validate(&PricingPolicy::default()).unwrap_err());
        assert_eq!(fields, vec!["orderId"]);
    }

    #[test]
    fn test_cod_order_created_confirmed() {
        let order = request("COD")
            .validate(&PricingPolicy::default())
            .unwrap()
            .into_order("ORD-1".to_string(), Utc::now());
        assert_eq!(order.payment_status, PaymentStatus::Success);
        assert_eq!(order.order_status, OrderStatus::Confirmed);
        assert_eq!(order.shipping_method.cost, Money::new(dec!(50)));
    }

    #[test]
    fn test_deserializes_from_storefront_json() {
        let json = r#"{
            "customer": {"name": "A", "email": "a@b.co", "phone": "9876543210"},
            "shippingAddress": {"line1": "x", "city": "y", "state": "z", "postalCode": "560001", "country": "India"},
            "items": [{"productId": "p", "name": "n", "quantity": 1, "price": 499.99}],
            "shippingMethod": {"type": "Express", "cost": 50},
            "paymentMethod": "Gateway",
            "total": 549.99
        }"#;
        let req: NewOrderRequest = serde_json::from_str(json).unwrap();
        let validated = req.validate(&PricingPolicy::default()).unwrap();
        assert_eq!(validated.shipping_kind, ShippingKind::Express);
        assert!(validated.pricing.total.approx_eq(Money::new(dec!(549.99))));
    }
}
