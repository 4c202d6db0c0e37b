//! Step Sequencer
//!
//! Walks an ordered list of steps to completion, aggregating each committed
//! step's fields with later-step precedence.

use crate::error::ValidationFailure;
use crate::record::CollectedData;
use crate::request::PaymentRequest;
use crate::step::Step;

/// What an `advance` did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the step at this index
    Updated(usize),

    /// The last step committed; carries everything collected
    Done(CollectedData),

    /// The active step's input was rejected; nothing moved
    Invalid(ValidationFailure),

    /// No step is active (completed, or no steps)
    Idle,
}

/// Ordered steps with one active at a time
#[derive(Debug)]
pub struct StepSequencer {
    steps: Vec<Step>,
    active: Option<usize>,
    completed: bool,
    collected: CollectedData,
}

impl StepSequencer {
    pub fn new(steps: Vec<Step>) -> Self {
        let empty = steps.is_empty();
        Self {
            steps,
            active: (!empty).then_some(0),
            completed: empty,
            collected: CollectedData::new(),
        }
    }

    /// The active step, or `None` when completed or empty
    pub fn active(&self) -> Option<&Step> {
        self.active.and_then(|i| self.steps.get(i))
    }

    pub fn active_mut(&mut self) -> Option<&mut Step> {
        self.active.and_then(|i| self.steps.get_mut(i))
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Data aggregated so far
    pub fn collected(&self) -> &CollectedData {
        &self.collected
    }

    /// Commit the active step and move on
    pub async fn advance(&mut self) -> Advance {
        let Some(index) = self.active else {
            return Advance::Idle;
        };
        let Some(step) = self.steps.get_mut(index) else {
            return Advance::Idle;
        };

        let fields = match step.commit().await {
            Ok(fields) => fields,
            Err(failure) => {
                tracing::debug!(step = index, %failure, "Step input rejected");
                return Advance::Invalid(failure);
            }
        };
        self.collected.absorb(fields);

        if index + 1 == self.steps.len() {
            self.active = None;
            self.completed = true;
            tracing::info!(steps = self.steps.len(), fields = self.collected.len(), "All steps completed");
            Advance::Done(self.collected.clone())
        } else {
            self.active = Some(index + 1);
            tracing::debug!(step = index + 1, caption = self.steps[index + 1].caption(), "Advanced to next step");
            Advance::Updated(index + 1)
        }
    }

    /// Discard collected data and start over from the first step
    pub fn reset(&mut self) {
        self.collected.clear();
        self.active = (!self.steps.is_empty()).then_some(0);
        self.completed = self.steps.is_empty();
        for step in &mut self.steps {
            step.reset();
        }
    }

    /// Push request context to every step without moving
    pub fn update(&mut self, request: &PaymentRequest) {
        for step in &mut self.steps {
            step.update(request);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::collector::{Collector, DataCollector};
    use crate::record::{FormData, fields};
    use crate::render::Fragment;
    use crate::store::MemoryStore;

    struct Plain {
        data: DataCollector,
        required: &'static [&'static str],
    }

    #[async_trait]
    impl Collector for Plain {
        fn name(&self) -> &str {
            "plain"
        }

        fn data(&self) -> &DataCollector {
            &self.data
        }

        fn data_mut(&mut self) -> &mut DataCollector {
            &mut self.data
        }

        fn required_fields(&self) -> &[&'static str] {
            self.required
        }

        fn render(&self, _request: &PaymentRequest, _input: &FormData) -> Fragment {
            Fragment::empty()
        }
    }

    fn step(schema: &[&str], required: &'static [&'static str]) -> Step {
        let store = Arc::new(MemoryStore::new());
        Step::new(
            "",
            Plain {
                data: DataCollector::new(schema.iter().copied(), store),
                required,
            },
        )
    }

    fn three_steps() -> StepSequencer {
        StepSequencer::new(vec![
            step(&["a"], &["a"]),
            step(&["b"], &["b"]),
            step(&["a", "c"], &["a", "c"]),
        ])
    }

    async fn run_through(sequencer: &mut StepSequencer) -> Vec<Advance> {
        let inputs = [
            vec![("a", "1")],
            vec![("b", "2")],
            vec![("a", "9"), ("c", "3")],
        ];
        let mut results = Vec::new();
        for pairs in inputs {
            let step = sequencer.active_mut().unwrap();
            for (k, v) in pairs {
                step.input_mut().set(k, v);
            }
            results.push(sequencer.advance().await);
        }
        results
    }

    #[tokio::test]
    async fn test_later_steps_win() {
        let mut sequencer = three_steps();
        let results = run_through(&mut sequencer).await;

        assert_eq!(results[0], Advance::Updated(1));
        assert_eq!(results[1], Advance::Updated(2));
        let expected = CollectedData::from(fields([("a", "9"), ("b", "2"), ("c", "3")]));
        assert_eq!(results[2], Advance::Done(expected));
        assert!(sequencer.is_completed());
        assert!(sequencer.active().is_none());
    }

    #[tokio::test]
    async fn test_done_fires_once() {
        let mut sequencer = three_steps();
        let results = run_through(&mut sequencer).await;
        assert_eq!(results.iter().filter(|r| matches!(r, Advance::Done(_))).count(), 1);
        assert_eq!(sequencer.advance().await, Advance::Idle);
    }

    #[tokio::test]
    async fn test_invalid_input_does_not_progress() {
        let mut sequencer = three_steps();
        let result = sequencer.advance().await;
        assert_eq!(result, Advance::Invalid(ValidationFailure::MissingField("a".into())));
        assert_eq!(sequencer.active_index(), Some(0));
        assert!(sequencer.collected().is_empty());
    }

    #[tokio::test]
    async fn test_reset_restarts_cleanly() {
        let mut sequencer = three_steps();
        sequencer.active_mut().unwrap().input_mut().set("a", "1");
        sequencer.advance().await;

        sequencer.reset();
        assert_eq!(sequencer.active_index(), Some(0));
        assert!(!sequencer.is_completed());
        assert!(sequencer.collected().is_empty());
        assert!(sequencer.active().unwrap().input().is_empty());

        let results = run_through(&mut sequencer).await;
        assert!(matches!(results.last(), Some(Advance::Done(_))));

        sequencer.reset();
        let again = run_through(&mut sequencer).await;
        assert_eq!(results, again);
    }

    #[tokio::test]
    async fn test_empty_sequencer_is_complete() {
        let mut sequencer = StepSequencer::new(Vec::new());
        assert!(sequencer.is_completed());
        assert!(sequencer.active().is_none());
        assert_eq!(sequencer.advance().await, Advance::Idle);
    }

    #[test]
    fn test_update_keeps_position() {
        let mut sequencer = three_steps();
        let total = crate::request::PaymentItem::new(
            "Total",
            crate::request::PaymentAmount::new("USD", rust_decimal_macros::dec!(1)),
        );
        sequencer.update(&PaymentRequest::new("https://shop.example", total));
        assert_eq!(sequencer.active_index(), Some(0));
    }
}
