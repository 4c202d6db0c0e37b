//! # sheet-collectors
//!
//! The standard payment sheet steps: payment method, shipping address, card
//! details and confirmation.
//!
//! Later collectors read what earlier ones committed, so dependencies are
//! handed over at construction:
//!
//! ```text
//! MethodChooser
//! AddressCollector ──address──▶ CardCollector ──card──▶ ConfirmationCollector
//!        │                                                      ▲
//!        └──────────────────────address─────────────────────────┘
//! ```

pub mod address;
pub mod card;
pub mod confirmation;
pub mod method;

use std::sync::Arc;

use sheet_core::{EventSink, RecordStore, Step};

pub use address::AddressCollector;
pub use card::CardCollector;
pub use confirmation::ConfirmationCollector;
pub use method::MethodChooser;

/// The four standard steps, in order
pub fn standard_steps(store: Arc<dyn RecordStore>, events: &EventSink) -> Vec<Step> {
    let method = MethodChooser::new(Arc::clone(&store));
    let address = AddressCollector::new(Arc::clone(&store), events.clone());
    let card = CardCollector::new(Arc::clone(&store), address.subscribe());
    let confirmation = ConfirmationCollector::new(store, address.subscribe(), card.subscribe());

    vec![
        Step::new("Choose your payment method:", method).user_must_choose(),
        Step::new("Shipping address:", address),
        Step::new("", card),
        Step::new("", confirmation).user_must_choose(),
    ]
}
