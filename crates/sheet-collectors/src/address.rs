//! Shipping Address
//!
//! Collects and remembers the shipping address. A committed address is
//! published to dependent collectors and broadcast as a sheet event.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use sheet_core::{
    Collector, DataCollector, EventSink, FieldMap, FormData, Fragment, PaymentRequest, RecordStore,
    SAVE_DETAILS_FIELD, SheetEvent,
};

/// Table remembered addresses are kept in
pub const ADDRESS_TABLE: &str = "addresses";

/// Address fields, in display order
pub const ADDRESS_FIELDS: [&str; 7] = [
    "recipient",
    "addressLine",
    "city",
    "region",
    "postalCode",
    "country",
    "phone",
];

const REQUIRED: [&str; 5] = ["recipient", "addressLine", "city", "postalCode", "country"];

/// Collector for the shipping address
pub struct AddressCollector {
    data: DataCollector,
    published: watch::Sender<FieldMap>,
    events: EventSink,
}

impl AddressCollector {
    pub fn new(store: Arc<dyn RecordStore>, events: EventSink) -> Self {
        let (published, _) = watch::channel(FieldMap::new());
        Self {
            data: DataCollector::new(ADDRESS_FIELDS, store).with_table(ADDRESS_TABLE),
            published,
            events,
        }
    }

    /// The last committed address; empty until the step commits
    pub fn subscribe(&self) -> watch::Receiver<FieldMap> {
        self.published.subscribe()
    }
}

/// One-line summary of an address map
pub fn summarize(address: &FieldMap) -> String {
    ["recipient", "addressLine", "city", "postalCode", "country"]
        .iter()
        .filter_map(|field| address.get(*field))
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl Collector for AddressCollector {
    fn name(&self) -> &str {
        "address"
    }

    fn data(&self) -> &DataCollector {
        &self.data
    }

    fn data_mut(&mut self) -> &mut DataCollector {
        &mut self.data
    }

    fn required_fields(&self) -> &[&'static str] {
        &REQUIRED
    }

    fn continued(&mut self, fields: &FieldMap) {
        tracing::debug!(fields = fields.len(), "Shipping address committed");
        self.published.send_replace(fields.clone());
        self.events.emit(SheetEvent::ShippingAddressChange { address: fields.clone() });
    }

    fn reset(&mut self) {
        self.published.send_replace(FieldMap::new());
    }

    fn render(&self, _request: &PaymentRequest, input: &FormData) -> Fragment {
        let mut lines: Vec<Fragment> = ADDRESS_FIELDS
            .iter()
            .map(|field| Fragment::new(format!("{}: {}", field, input.get(field).unwrap_or_default())))
            .collect();
        let saved = if input.is_on(SAVE_DETAILS_FIELD) { "[x]" } else { "[ ]" };
        lines.push(Fragment::new(format!("{} Remember this address", saved)));
        Fragment::join(lines)
    }
}
