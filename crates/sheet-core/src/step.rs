//! Steps
//!
//! A step pairs one collector with a caption, an advancement policy and the
//! input surface the user types into.

use crate::collector::Collector;
use crate::error::ValidationFailure;
use crate::record::{FieldMap, FormData};
use crate::render::Fragment;
use crate::request::PaymentRequest;

/// One page of the sheet
pub struct Step {
    caption: String,
    collector: Box<dyn Collector>,
    requires_explicit_choice: bool,
    input: FormData,
}

impl Step {
    pub fn new(caption: impl Into<String>, collector: impl Collector + 'static) -> Self {
        Self::boxed(caption, Box::new(collector))
    }

    pub fn boxed(caption: impl Into<String>, collector: Box<dyn Collector>) -> Self {
        Self {
            caption: caption.into(),
            collector,
            requires_explicit_choice: false,
            input: FormData::new(),
        }
    }

    /// Refuse to advance until the user picks something themselves
    pub fn user_must_choose(mut self) -> Self {
        self.requires_explicit_choice = true;
        self
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn requires_explicit_choice(&self) -> bool {
        self.requires_explicit_choice
    }

    pub fn collector(&self) -> &dyn Collector {
        self.collector.as_ref()
    }

    pub fn input(&self) -> &FormData {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut FormData {
        &mut self.input
    }

    /// Wait for the collector, then prefill the input from its record
    pub async fn ready(&mut self) {
        self.collector.ready().await;
        self.prefill();
    }

    fn prefill(&mut self) {
        for (field, value) in self.collector.defaults() {
            self.input.prefill(field, value);
        }
    }

    /// Required fields present, and an explicit choice made if the policy asks
    pub fn validate(&self) -> Result<(), ValidationFailure> {
        self.collector.validate(&self.input)?;

        if !self.requires_explicit_choice {
            return Ok(());
        }
        match self.collector.choice_field() {
            Some(field) => {
                if !self.input.is_touched(field) || self.input.get(field).is_none_or(str::is_empty) {
                    return Err(ValidationFailure::ChoiceRequired(field.to_string()));
                }
            }
            // Without a dedicated field, the user must have entered something
            None => {
                let schema = self.collector.data().schema();
                if !schema.iter().any(|field| self.input.is_touched(field)) {
                    let field = schema.iter().next().map_or(self.collector.name(), String::as_str);
                    return Err(ValidationFailure::ChoiceRequired(field.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Validate, save (best effort) and return the step's fields
    pub async fn commit(&mut self) -> Result<FieldMap, ValidationFailure> {
        self.validate()?;

        if let Err(e) = self.collector.save(&self.input).await {
            tracing::warn!(
                step = %self.caption,
                collector = self.collector.name(),
                error = %e,
                "Saving details failed, continuing"
            );
        }

        let fields = self.collector.to_fields(&self.input);
        self.collector.continued(&fields);
        Ok(fields)
    }

    pub fn update(&mut self, request: &PaymentRequest) {
        self.collector.update(request);
    }

    /// Clear typed input and collector state, keeping stored defaults
    pub fn reset(&mut self) {
        self.input.clear();
        self.collector.reset();
        self.prefill();
    }

    pub fn render(&self, request: &PaymentRequest) -> Fragment {
        let labels = self.collector.button_labels();
        let mut parts = Vec::new();
        if !self.caption.is_empty() {
            parts.push(Fragment::new(self.caption.clone()));
        }
        parts.push(self.collector.render(request, &self.input));
        parts.push(Fragment::new(format!("[{}] [{}]", labels.cancel, labels.proceed)));
        Fragment::join(parts)
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("caption", &self.caption)
            .field("collector", &self.collector.name())
            .field("requires_explicit_choice", &self.requires_explicit_choice)
            .finish()
    }
}
