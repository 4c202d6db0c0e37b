//! Payment Request Data
//!
//! Context pushed into widgets and steps: amounts, line items, shipping options.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A monetary amount
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAmount {
    /// ISO 4217 currency code
    pub currency: String,

    /// Decimal value (never use f64 for money)
    pub value: Decimal,
}

impl PaymentAmount {
    pub fn new(currency: impl Into<String>, value: Decimal) -> Self {
        Self {
            currency: currency.into(),
            value,
        }
    }
}

impl std::fmt::Display for PaymentAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:.2}", self.currency, self.value)
    }
}

/// A labelled amount (line item or total)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentItem {
    pub label: String,
    pub amount: PaymentAmount,
}

impl PaymentItem {
    pub fn new(label: impl Into<String>, amount: PaymentAmount) -> Self {
        Self {
            label: label.into(),
            amount,
        }
    }
}

/// A shipping option offered by the merchant
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingOption {
    pub id: String,
    pub label: String,
    pub amount: PaymentAmount,
    #[serde(default)]
    pub selected: bool,
}

/// Merchant options
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOptions {
    #[serde(default)]
    pub request_shipping: bool,

    #[serde(default)]
    pub request_payer_email: bool,
}

/// Everything the caller hands to `open`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub id: String,

    /// Origin of the requesting page, shown by the host widget
    pub origin: String,

    /// Supported payment method identifiers (e.g. "basic-card")
    pub method_data: Vec<String>,

    #[serde(default)]
    pub display_items: Vec<PaymentItem>,

    pub total: PaymentItem,

    #[serde(default)]
    pub shipping_options: Vec<ShippingOption>,

    #[serde(default)]
    pub options: PaymentOptions,
}

impl PaymentRequest {
    pub fn new(origin: impl Into<String>, total: PaymentItem) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            origin: origin.into(),
            method_data: vec!["basic-card".into()],
            display_items: Vec::new(),
            total,
            shipping_options: Vec::new(),
            options: PaymentOptions::default(),
        }
    }

    pub fn with_item(mut self, item: PaymentItem) -> Self {
        self.display_items.push(item);
        self
    }

    pub fn with_shipping_option(mut self, option: ShippingOption) -> Self {
        self.options.request_shipping = true;
        self.shipping_options.push(option);
        self
    }

    pub fn with_methods(mut self, methods: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.method_data = methods.into_iter().map(Into::into).collect();
        self
    }

    /// The selected shipping option, falling back to the first one
    pub fn selected_shipping_option(&self) -> Option<&ShippingOption> {
        self.shipping_options
            .iter()
            .find(|o| o.selected)
            .or_else(|| self.shipping_options.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn option(id: &str, selected: bool) -> ShippingOption {
        ShippingOption {
            id: id.into(),
            label: id.into(),
            amount: PaymentAmount::new("USD", dec!(5)),
            selected,
        }
    }

    #[test]
    fn test_amount_display() {
        let amount = PaymentAmount::new("USD", dec!(29));
        assert_eq!(amount.to_string(), "USD 29.00");
    }

    #[test]
    fn test_selected_shipping_option() {
        let total = PaymentItem::new("Total", PaymentAmount::new("USD", dec!(10)));
        let request = PaymentRequest::new("https://shop.example", total)
            .with_shipping_option(option("standard", false))
            .with_shipping_option(option("express", true));

        assert!(request.options.request_shipping);
        assert_eq!(request.selected_shipping_option().unwrap().id, "express");
    }

    #[test]
    fn test_deserialize_camel_case() {
        let request: PaymentRequest = serde_json::from_value(serde_json::json!({
            "id": "req-1",
            "origin": "https://shop.example",
            "methodData": ["basic-card"],
            "total": { "label": "Total", "amount": { "currency": "EUR", "value": "12.50" } }
        }))
        .unwrap();

        assert_eq!(request.total.amount.value, dec!(12.50));
        assert!(request.shipping_options.is_empty());
        assert!(!request.options.request_shipping);
    }
}
