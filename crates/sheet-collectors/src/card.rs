//! Credit Card
//!
//! Collects card details, billed to the committed shipping address. The
//! security code is collected but never remembered.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use tokio::sync::watch;

use sheet_core::{
    Collector, DataCollector, FieldMap, FormData, Fragment, PaymentRequest, PersistenceError, RecordStore,
    SAVE_DETAILS_FIELD, ValidationFailure,
};

use crate::address::summarize;

/// Table remembered cards are kept in
pub const CARD_TABLE: &str = "cards";

pub const CARDHOLDER_FIELD: &str = "cardholderName";
pub const NUMBER_FIELD: &str = "cardNumber";
pub const EXPIRY_MONTH_FIELD: &str = "expiryMonth";
pub const EXPIRY_YEAR_FIELD: &str = "expiryYear";
pub const SECURITY_CODE_FIELD: &str = "cardSecurityCode";

const CARD_FIELDS: [&str; 5] = [
    CARDHOLDER_FIELD,
    NUMBER_FIELD,
    EXPIRY_MONTH_FIELD,
    EXPIRY_YEAR_FIELD,
    SECURITY_CODE_FIELD,
];

/// Collector for card details
pub struct CardCollector {
    data: DataCollector,
    billing: watch::Receiver<FieldMap>,
    summary: watch::Sender<FieldMap>,
}

impl CardCollector {
    /// `billing` is the address collector's published address
    pub fn new(store: Arc<dyn RecordStore>, billing: watch::Receiver<FieldMap>) -> Self {
        let (summary, _) = watch::channel(FieldMap::new());
        Self {
            data: DataCollector::new(CARD_FIELDS, store).with_table(CARD_TABLE),
            billing,
            summary,
        }
    }

    /// Cardholder and masked number of the committed card
    pub fn subscribe(&self) -> watch::Receiver<FieldMap> {
        self.summary.subscribe()
    }
}

/// Last four digits behind a mask
pub fn mask(number: &str) -> String {
    let digits: Vec<char> = number.chars().filter(char::is_ascii_digit).collect();
    let tail: String = digits[digits.len().saturating_sub(4)..].iter().collect();
    format!("**** {}", tail)
}

fn invalid(field: &str, message: impl Into<String>) -> ValidationFailure {
    ValidationFailure::InvalidField {
        field: field.into(),
        message: message.into(),
    }
}

fn check_expiry(month: &str, year: &str) -> Result<(), ValidationFailure> {
    let month: u32 = month
        .trim()
        .parse()
        .ok()
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| invalid(EXPIRY_MONTH_FIELD, "must be between 1 and 12"))?;
    let year: i32 = year
        .trim()
        .parse()
        .map_err(|_| invalid(EXPIRY_YEAR_FIELD, "must be a year"))?;
    let year = if year < 100 { 2000 + year } else { year };

    let today = Utc::now().date_naive();
    if (year, month) < (today.year(), today.month()) {
        return Err(invalid(EXPIRY_YEAR_FIELD, "card has expired"));
    }
    Ok(())
}

#[async_trait]
impl Collector for CardCollector {
    fn name(&self) -> &str {
        "card"
    }

    fn data(&self) -> &DataCollector {
        &self.data
    }

    fn data_mut(&mut self) -> &mut DataCollector {
        &mut self.data
    }

    fn required_fields(&self) -> &[&'static str] {
        &CARD_FIELDS
    }

    fn validate(&self, input: &FormData) -> Result<(), ValidationFailure> {
        for field in CARD_FIELDS {
            if input.get(field).is_none_or(str::is_empty) {
                return Err(ValidationFailure::MissingField(field.into()));
            }
        }

        let number = input.get(NUMBER_FIELD).unwrap_or_default();
        let digits_only = number.chars().all(|c| c.is_ascii_digit() || c == ' ');
        if !digits_only || !number.chars().any(|c| c.is_ascii_digit()) {
            return Err(invalid(NUMBER_FIELD, "must contain only digits"));
        }
        check_expiry(
            input.get(EXPIRY_MONTH_FIELD).unwrap_or_default(),
            input.get(EXPIRY_YEAR_FIELD).unwrap_or_default(),
        )
    }

    async fn save(&mut self, input: &FormData) -> Result<(), PersistenceError> {
        let mut fields = self.to_fields(input);
        fields.remove(SECURITY_CODE_FIELD);
        self.data.save(input, fields).await
    }

    fn continued(&mut self, fields: &FieldMap) {
        let mut summary = FieldMap::new();
        if let Some(holder) = fields.get(CARDHOLDER_FIELD) {
            summary.insert(CARDHOLDER_FIELD.into(), holder.clone());
        }
        if let Some(number) = fields.get(NUMBER_FIELD) {
            summary.insert(NUMBER_FIELD.into(), mask(number));
        }
        self.summary.send_replace(summary);
    }

    fn reset(&mut self) {
        self.summary.send_replace(FieldMap::new());
    }

    fn render(&self, _request: &PaymentRequest, input: &FormData) -> Fragment {
        let number = input.get(NUMBER_FIELD).map(mask).unwrap_or_default();
        let mut lines = vec![
            Fragment::new(format!("Cardholder: {}", input.get(CARDHOLDER_FIELD).unwrap_or_default())),
            Fragment::new(format!("Card number: {}", number)),
            Fragment::new(format!(
                "Expires: {}/{}",
                input.get(EXPIRY_MONTH_FIELD).unwrap_or_default(),
                input.get(EXPIRY_YEAR_FIELD).unwrap_or_default()
            )),
        ];

        let billing = summarize(&self.billing.borrow());
        if !billing.is_empty() {
            lines.push(Fragment::new(format!("Billing address: {}", billing)));
        }
        let saved = if input.is_on(SAVE_DETAILS_FIELD) { "[x]" } else { "[ ]" };
        lines.push(Fragment::new(format!("{} Remember this card", saved)));
        Fragment::join(lines)
    }
}
