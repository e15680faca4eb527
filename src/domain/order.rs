use super::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub price: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl OrderItem {
    /// `price * quantity`, or `None` on overflow.
    pub fn line_total(&self) -> Option<Money> {
        self.price.checked_mul(self.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShippingKind {
    Standard,
    Express,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingMethod {
    #[serde(rename = "type")]
    pub kind: ShippingKind,
    pub cost: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub code: String,
    pub discount: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "COD")]
    Cod,
    Gateway,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Success => "Success",
            PaymentStatus::Failed => "Failed",
        };
        f.write_str(label)
    }
}

/// Payment instrument the gateway reports for a captured payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentInstrument {
    #[serde(rename = "UPI")]
    Upi,
    Card,
    #[serde(rename = "Net Banking")]
    NetBanking,
    Wallet,
    #[serde(rename = "EMI")]
    Emi,
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
    #[serde(rename = "Pay Later")]
    PayLater,
    #[serde(untagged)]
    Other(String),
}

impl PaymentInstrument {
    /// Normalizes the raw `method` string a gateway returns.
    pub fn from_gateway_method(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "upi" => PaymentInstrument::Upi,
            "card" | "credit_card" | "debit_card" => PaymentInstrument::Card,
            "netbanking" | "net_banking" => PaymentInstrument::NetBanking,
            "wallet" => PaymentInstrument::Wallet,
            "emi" | "cardless_emi" => PaymentInstrument::Emi,
            "bank_transfer" | "nach" => PaymentInstrument::BankTransfer,
            "paylater" | "pay_later" => PaymentInstrument::PayLater,
            _ => PaymentInstrument::Other(raw.trim().to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            PaymentInstrument::Upi => "UPI",
            PaymentInstrument::Card => "Card",
            PaymentInstrument::NetBanking => "Net Banking",
            PaymentInstrument::Wallet => "Wallet",
            PaymentInstrument::Emi => "EMI",
            PaymentInstrument::BankTransfer => "Bank Transfer",
            PaymentInstrument::PayLater => "Pay Later",
            PaymentInstrument::Other(raw) => raw,
        }
    }
}

/// Lifecycle milestones that trigger a customer notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Confirmation,
    Delivery,
    Cancellation,
}

/// Per-milestone "already notified" flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFlags {
    pub email_sent: bool,
    pub delivery_email_sent: bool,
    pub cancellation_email_sent: bool,
}

impl NotificationFlags {
    pub fn is_sent(&self, kind: NotificationKind) -> bool {
        match kind {
            NotificationKind::Confirmation => self.email_sent,
            NotificationKind::Delivery => self.delivery_email_sent,
            NotificationKind::Cancellation => self.cancellation_email_sent,
        }
    }

    pub fn mark_sent(&mut self, kind: NotificationKind) {
        match kind {
            NotificationKind::Confirmation => self.email_sent = true,
            NotificationKind::Delivery => self.delivery_email_sent = true,
            NotificationKind::Cancellation => self.cancellation_email_sent = true,
        }
    }
}

/// The order aggregate, keyed by `order_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: String,
    pub customer: Customer,
    pub shipping_address: ShippingAddress,
    pub items: Vec<OrderItem>,
    pub shipping_method: ShippingMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon: Option<Coupon>,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    #[serde(default)]
    pub gateway_order_id: Option<String>,
    #[serde(default)]
    pub gateway_payment_id: Option<String>,
    #[serde(default)]
    pub gateway_instrument: Option<PaymentInstrument>,
    pub subtotal: Money,
    pub total: Money,
    #[serde(default)]
    pub notifications: NotificationFlags,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_gateway(&self) -> bool {
        self.payment_method == PaymentMethod::Gateway
    }

    /// A gateway order that has not been paid, failed or cancelled yet.
    pub fn awaiting_payment(&self) -> bool {
        self.is_gateway()
            && self.payment_status == PaymentStatus::Pending
            && self.order_status == OrderStatus::Pending
    }

    pub fn coupon_code(&self) -> Option<&str> {
        self.coupon.as_ref().map(|c| c.code.as_str())
    }

    pub fn discount(&self) -> Money {
        self.coupon.as_ref().map(|c| c.discount).unwrap_or(Money::ZERO)
    }

    pub fn public_view(&self) -> PublicOrderView {
        PublicOrderView {
            order_id: self.order_id.clone(),
            customer_name: self.customer.name.clone(),
            items: self.items.clone(),
            shipping_method: self.shipping_method.clone(),
            coupon: self.coupon.clone(),
            subtotal: self.subtotal,
            total: self.total,
            payment_method: self.payment_method,
            payment_status: self.payment_status,
            order_status: self.order_status,
            gateway_instrument: self.gateway_instrument.clone(),
            created_at: self.created_at,
        }
    }
}

/// What a customer-facing response may reveal about an order.
///
/// Contact details, gateway payment ids and notification bookkeeping stay internal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicOrderView {
    pub order_id: String,
    pub customer_name: String,
    pub items: Vec<OrderItem>,
    pub shipping_method: ShippingMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon: Option<Coupon>,
    pub subtotal: Money,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_instrument: Option<PaymentInstrument>,
    pub created_at: DateTime<Utc>,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_normalization() {
        assert_eq!(
            PaymentInstrument::from_gateway_method("upi"),
            PaymentInstrument::Upi
        );
        assert_eq!(
            PaymentInstrument::from_gateway_method("NetBanking"),
            PaymentInstrument::NetBanking
        );
        assert_eq!(
            PaymentInstrument::from_gateway_method("cardless_emi"),
            PaymentInstrument::Emi
        );
        assert_eq!(
            PaymentInstrument::from_gateway_method("crypto"),
            PaymentInstrument::Other("crypto".to_string())
        );
    }

    #[test]
    fn test_instrument_serializes_as_label() {
        let json = serde_json::to_string(&PaymentInstrument::NetBanking).unwrap();
        assert_eq!(json, "\"Net Banking\"");
        let json = serde_json::to_string(&PaymentInstrument::Other("crypto".into())).unwrap();
        assert_eq!(json, "\"crypto\"");
    }

    #[test]
    fn test_payment_method_wire_names() {
        let method: PaymentMethod = serde_json::from_str("\"COD\"").unwrap();
        assert_eq!(method, PaymentMethod::Cod);
        let method: PaymentMethod = serde_json::from_str("\"Gateway\"").unwrap();
        assert_eq!(method, PaymentMethod::Gateway);
    }

    #[test]
    fn test_notification_flags_are_independent() {
        let mut flags = NotificationFlags::default();
        flags.mark_sent(NotificationKind::Delivery);
        assert!(flags.is_sent(NotificationKind::Delivery));
        assert!(!flags.is_sent(NotificationKind::Confirmation));
        assert!(!flags.is_sent(NotificationKind::Cancellation));
    }

    #[test]
    fn test_public_view_hides_contact_details() {
        let order = fixtures::gateway_order("ORD-1", Utc::now());
        let json = serde_json::to_value(order.public_view()).unwrap();
        assert!(json.get("customer").is_none());
        assert!(json.get("gatewayPaymentId").is_none());
        assert_eq!(json["customerName"], "Asha Rao");
        assert_eq!(json["orderId"], "ORD-1");
    }
}
