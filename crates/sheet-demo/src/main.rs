//! Payment Sheet Demo
//!
//! Runs one scripted checkout and one cancelled checkout against a headless
//! dialog, printing what the sheet collected.

use std::sync::Arc;

use rust_decimal_macros::dec;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sheet_collectors::standard_steps;
use sheet_core::{
    Advance, CloseReason, HeadlessDialog, JsonFileStore, MemoryStore, PaymentAmount, PaymentItem, PaymentRequest,
    PaymentSheet, RecordStore, SAVE_DETAILS_FIELD, ShippingOption, SheetConfig,
};

const CHECKOUT: [&[(&str, &str)]; 4] = [
    &[("methodName", "basic-card")],
    &[
        ("recipient", "Jane Doe"),
        ("addressLine", "1 Main St"),
        ("city", "Springfield"),
        ("postalCode", "12345"),
        ("country", "US"),
        (SAVE_DETAILS_FIELD, "on"),
    ],
    &[
        ("cardholderName", "Jane Doe"),
        ("cardNumber", "4242424242424242"),
        ("expiryMonth", "12"),
        ("expiryYear", "2099"),
        ("cardSecurityCode", "123"),
        (SAVE_DETAILS_FIELD, "on"),
    ],
    &[("confirm", "on")],
];

fn request() -> PaymentRequest {
    let total = PaymentItem::new("Total", PaymentAmount::new("USD", dec!(34.00)));
    PaymentRequest::new("https://shop.example", total)
        .with_item(PaymentItem::new("Paperback", PaymentAmount::new("USD", dec!(29.00))))
        .with_shipping_option(ShippingOption {
            id: "standard".into(),
            label: "Standard shipping".into(),
            amount: PaymentAmount::new("USD", dec!(5.00)),
            selected: true,
        })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = SheetConfig::from_env()?;
    let store: Arc<dyn RecordStore> = match &config.store_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Remembering details on disk");
            Arc::new(JsonFileStore::new(path))
        }
        None => Arc::new(MemoryStore::new()),
    };

    let dialog = HeadlessDialog::new();
    let probe = dialog.probe();
    let builder = PaymentSheet::builder(config, store);
    let steps = standard_steps(builder.store(), &builder.events());
    let sheet = builder.dialog(dialog).steps(steps).build()?;

    let mut events = sheet.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::info!(event = event.name(), "Sheet event");
        }
    });

    // Scripted checkout
    let session = {
        let sheet = sheet.clone();
        tokio::spawn(async move { sheet.open(request()).await })
    };
    probe.shown().await;
    for page in CHECKOUT {
        for (field, value) in page {
            sheet.set_field(field, value).await;
        }
        if let Advance::Invalid(failure) = sheet.proceed().await {
            anyhow::bail!("checkout page rejected: {}", failure);
        }
    }
    let data = session.await??;
    if let Some(view) = probe.last_render() {
        println!("{}\n", view);
    }
    println!("{}", serde_json::to_string_pretty(&data)?);
    sheet.request_close(CloseReason::Success).await;

    // Cancelled checkout
    let session = {
        let sheet = sheet.clone();
        tokio::spawn(async move { sheet.open(request()).await })
    };
    probe.shown().await;
    sheet.cancel().await;
    match session.await? {
        Ok(_) => tracing::warn!("Cancelled checkout resolved anyway"),
        Err(e) => println!("Second checkout: {}", e.user_message()),
    }

    Ok(())
}
