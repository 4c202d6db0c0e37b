//! # sheet-core
//!
//! A modal payment sheet that walks the user through ordered steps and settles
//! exactly one outcome per session.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     PaymentSheet                             │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │ TopWidgets  │  │    Step     │  │      Dialog         │  │
//! │  │             │  │  Sequencer  │──│    (Strategy)       │  │
//! │  └─────────────┘  └──────┬──────┘  └─────────────────────┘  │
//! │                   ┌──────┴──────┐  ┌─────────────────────┐  │
//! │                   │ Step ─ Step │──│    RecordStore      │  │
//! │                   │ (Collector) │  │    (Strategy)       │  │
//! │                   └─────────────┘  └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `Collector` trait is the extension point for step content; the
//! `Dialog` and `RecordStore` traits keep presentation and persistence
//! swappable.

pub mod collector;
pub mod config;
pub mod dialog;
pub mod error;
pub mod event;
pub mod outcome;
pub mod record;
pub mod render;
pub mod request;
pub mod sequencer;
pub mod session;
pub mod step;
pub mod store;
pub mod widget;

pub use collector::{Collector, DataCollector, SAVE_DETAILS_FIELD};
pub use config::SheetConfig;
pub use dialog::{Dialog, DialogProbe, DocumentHandle, DocumentReady, HeadlessDialog};
pub use error::{PersistenceError, Result, SheetError, ValidationFailure};
pub use event::{EventSink, SheetEvent};
pub use outcome::{Deferred, Outcome};
pub use record::{CollectedData, CollectorRecord, FieldMap, FormData};
pub use render::{ButtonLabels, Fragment, SheetView};
pub use request::{PaymentAmount, PaymentItem, PaymentOptions, PaymentRequest, ShippingOption};
pub use sequencer::{Advance, StepSequencer};
pub use session::{CloseReason, PaymentSheet, PaymentSheetBuilder, SessionState};
pub use step::Step;
pub use store::{JsonFileStore, MemoryStore, RecordStore};
