//! Confirmation
//!
//! Final review of the address and card before the user commits to paying.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use sheet_core::{
    ButtonLabels, Collector, DataCollector, FieldMap, FormData, Fragment, PaymentRequest, RecordStore,
    ValidationFailure,
};

use crate::address::summarize;
use crate::card::{CARDHOLDER_FIELD, NUMBER_FIELD};

/// Checkbox the user ticks to confirm
pub const CONFIRM_FIELD: &str = "confirm";

/// Collector for the final confirmation
pub struct ConfirmationCollector {
    data: DataCollector,
    address: watch::Receiver<FieldMap>,
    card: watch::Receiver<FieldMap>,
}

impl ConfirmationCollector {
    pub fn new(
        store: Arc<dyn RecordStore>,
        address: watch::Receiver<FieldMap>,
        card: watch::Receiver<FieldMap>,
    ) -> Self {
        Self {
            data: DataCollector::new([CONFIRM_FIELD], store),
            address,
            card,
        }
    }
}

#[async_trait]
impl Collector for ConfirmationCollector {
    fn name(&self) -> &str {
        "confirmation"
    }

    fn data(&self) -> &DataCollector {
        &self.data
    }

    fn data_mut(&mut self) -> &mut DataCollector {
        &mut self.data
    }

    fn required_fields(&self) -> &[&'static str] {
        &[CONFIRM_FIELD]
    }

    fn choice_field(&self) -> Option<&str> {
        Some(CONFIRM_FIELD)
    }

    /// Only a ticked box confirms
    fn validate(&self, input: &FormData) -> Result<(), ValidationFailure> {
        match input.get(CONFIRM_FIELD) {
            None | Some("") => Err(ValidationFailure::MissingField(CONFIRM_FIELD.into())),
            Some(_) if !input.is_on(CONFIRM_FIELD) => Err(ValidationFailure::ChoiceRequired(CONFIRM_FIELD.into())),
            Some(_) => Ok(()),
        }
    }

    fn render(&self, request: &PaymentRequest, input: &FormData) -> Fragment {
        let card = self.card.borrow();
        let mut lines = vec![Fragment::new(format!("Pay {}", request.total.amount))];
        if let Some(number) = card.get(NUMBER_FIELD) {
            let holder = card.get(CARDHOLDER_FIELD).map_or("", String::as_str);
            lines.push(Fragment::new(format!("With card {} ({})", number, holder)));
        }
        let address = summarize(&self.address.borrow());
        if !address.is_empty() {
            lines.push(Fragment::new(format!("Ship to {}", address)));
        }
        let confirmed = if input.is_on(CONFIRM_FIELD) { "[x]" } else { "[ ]" };
        lines.push(Fragment::new(format!("{} I confirm this payment", confirmed)));
        Fragment::join(lines)
    }

    fn button_labels(&self) -> ButtonLabels {
        ButtonLabels {
            proceed: "Pay".into(),
            ..ButtonLabels::default()
        }
    }
}
