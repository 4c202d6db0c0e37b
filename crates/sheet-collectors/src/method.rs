//! Payment Method Chooser
//!
//! Lets the user pick one of the methods the merchant supports.

use std::sync::Arc;

use async_trait::async_trait;

use sheet_core::{
    Collector, DataCollector, FormData, Fragment, PaymentRequest, RecordStore, ValidationFailure,
};

/// Field holding the chosen method
pub const METHOD_FIELD: &str = "methodName";

/// Collector for the payment method
pub struct MethodChooser {
    data: DataCollector,
    available: Vec<String>,
}

impl MethodChooser {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            data: DataCollector::new([METHOD_FIELD], store),
            available: Vec::new(),
        }
    }

    /// Methods offered by the last request seen
    pub fn available(&self) -> &[String] {
        &self.available
    }
}

#[async_trait]
impl Collector for MethodChooser {
    fn name(&self) -> &str {
        "method_chooser"
    }

    fn data(&self) -> &DataCollector {
        &self.data
    }

    fn data_mut(&mut self) -> &mut DataCollector {
        &mut self.data
    }

    fn required_fields(&self) -> &[&'static str] {
        &[METHOD_FIELD]
    }

    fn choice_field(&self) -> Option<&str> {
        Some(METHOD_FIELD)
    }

    fn validate(&self, input: &FormData) -> Result<(), ValidationFailure> {
        let method = input
            .get(METHOD_FIELD)
            .filter(|m| !m.is_empty())
            .ok_or_else(|| ValidationFailure::MissingField(METHOD_FIELD.into()))?;

        if !self.available.iter().any(|m| m == method) {
            return Err(ValidationFailure::InvalidField {
                field: METHOD_FIELD.into(),
                message: format!("{} is not accepted here", method),
            });
        }
        Ok(())
    }

    fn update(&mut self, request: &PaymentRequest) {
        self.available.clone_from(&request.method_data);
    }

    fn render(&self, _request: &PaymentRequest, input: &FormData) -> Fragment {
        let chosen = input.get(METHOD_FIELD);
        Fragment::join(self.available.iter().map(|method| {
            let mark = if Some(method.as_str()) == chosen { "(x)" } else { "( )" };
            Fragment::new(format!("{} {}", mark, method))
        }))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use sheet_core::{MemoryStore, PaymentAmount, PaymentItem, Step};

    use super::*;

    fn request() -> PaymentRequest {
        let total = PaymentItem::new("Total", PaymentAmount::new("USD", dec!(10)));
        PaymentRequest::new("https://shop.example", total).with_methods(["basic-card", "wallet"])
    }

    #[test]
    fn test_only_offered_methods_are_valid() {
        let mut chooser = MethodChooser::new(Arc::new(MemoryStore::new()));
        chooser.update(&request());
        assert_eq!(chooser.available(), ["basic-card", "wallet"]);

        let mut input = FormData::new();
        input.set(METHOD_FIELD, "bitcoin");
        assert!(matches!(
            chooser.validate(&input),
            Err(ValidationFailure::InvalidField { .. })
        ));

        input.set(METHOD_FIELD, "wallet");
        assert!(chooser.validate(&input).is_ok());
    }

    #[test]
    fn test_render_marks_choice() {
        let mut chooser = MethodChooser::new(Arc::new(MemoryStore::new()));
        let request = request();
        chooser.update(&request);

        let mut input = FormData::new();
        input.set(METHOD_FIELD, "wallet");
        let rendered = chooser.render(&request, &input);
        assert_eq!(rendered.as_str(), "( ) basic-card\n(x) wallet");
    }

    #[tokio::test]
    async fn test_step_requires_explicit_choice() {
        let mut step = Step::new("Choose your payment method:", MethodChooser::new(Arc::new(MemoryStore::new())))
            .user_must_choose();
        step.ready().await;
        step.update(&request());

        step.input_mut().prefill(METHOD_FIELD, "basic-card");
        assert_eq!(
            step.validate(),
            Err(ValidationFailure::ChoiceRequired(METHOD_FIELD.into()))
        );

        step.input_mut().set(METHOD_FIELD, "basic-card");
        assert!(step.validate().is_ok());
    }
}
