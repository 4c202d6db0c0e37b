//! Ancillary Widgets
//!
//! The top section (line items, shipping picker, total, waiting spinner) and
//! the bottom host line. Top widgets carry an explicit visibility flag.

use crate::render::Fragment;
use crate::request::PaymentRequest;

/// Something that renders from request data alone
pub trait Widget: Send + Sync {
    fn render(&self, request: &PaymentRequest) -> Fragment;
}

/// Line item list
#[derive(Debug, Default)]
pub struct LineItems;

impl Widget for LineItems {
    fn render(&self, request: &PaymentRequest) -> Fragment {
        Fragment::join(
            request
                .display_items
                .iter()
                .map(|item| Fragment::new(format!("{}: {}", item.label, item.amount))),
        )
    }
}

/// Grand total
#[derive(Debug, Default)]
pub struct Total;

impl Widget for Total {
    fn render(&self, request: &PaymentRequest) -> Fragment {
        Fragment::new(format!("{}: {}", request.total.label, request.total.amount))
    }
}

/// Shown once all steps are done, while the caller processes the payment
#[derive(Debug, Default)]
pub struct AwaitPaymentResponse;

impl Widget for AwaitPaymentResponse {
    fn render(&self, _request: &PaymentRequest) -> Fragment {
        Fragment::new("Processing payment...")
    }
}

/// Shipping option picker
///
/// Holds the user's pick; the merchant's `selected` flag is only the default.
#[derive(Debug, Default)]
pub struct ShippingOptions {
    chosen: Option<String>,
}

impl ShippingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the user's pick. Returns `false` for an unknown id.
    pub fn choose(&mut self, request: &PaymentRequest, id: &str) -> bool {
        if request.shipping_options.iter().any(|o| o.id == id) {
            self.chosen = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn chosen(&self) -> Option<&str> {
        self.chosen.as_deref()
    }

    pub fn clear(&mut self) {
        self.chosen = None;
    }

    fn selected_id<'a>(&'a self, request: &'a PaymentRequest) -> Option<&'a str> {
        self.chosen
            .as_deref()
            .or_else(|| request.selected_shipping_option().map(|o| o.id.as_str()))
    }
}

impl Widget for ShippingOptions {
    fn render(&self, request: &PaymentRequest) -> Fragment {
        if !request.options.request_shipping || request.shipping_options.is_empty() {
            return Fragment::empty();
        }
        let selected = self.selected_id(request);
        Fragment::join(request.shipping_options.iter().map(|o| {
            let mark = if Some(o.id.as_str()) == selected { "(x)" } else { "( )" };
            Fragment::new(format!("{} {} - {}", mark, o.label, o.amount))
        }))
    }
}

/// Bottom line naming the requesting site
#[derive(Debug, Default)]
pub struct Host;

impl Widget for Host {
    fn render(&self, request: &PaymentRequest) -> Fragment {
        Fragment::new(format!("Requested by {}", request.origin))
    }
}

/// Which top widget an entry holds
#[derive(Debug)]
pub enum TopWidget {
    LineItems(LineItems),
    ShippingOptions(ShippingOptions),
    Total(Total),
    AwaitPaymentResponse(AwaitPaymentResponse),
}

impl TopWidget {
    fn as_widget(&self) -> &dyn Widget {
        match self {
            TopWidget::LineItems(w) => w,
            TopWidget::ShippingOptions(w) => w,
            TopWidget::Total(w) => w,
            TopWidget::AwaitPaymentResponse(w) => w,
        }
    }

    fn shown_by_default(&self) -> bool {
        !matches!(self, TopWidget::AwaitPaymentResponse(_))
    }
}

#[derive(Debug)]
struct WidgetEntry {
    widget: TopWidget,
    active: bool,
}

/// The ordered top section
#[derive(Debug)]
pub struct TopWidgets {
    entries: Vec<WidgetEntry>,
}

impl Default for TopWidgets {
    fn default() -> Self {
        Self::new()
    }
}

impl TopWidgets {
    pub fn new() -> Self {
        let mut widgets = Self {
            entries: vec![
                TopWidget::LineItems(LineItems),
                TopWidget::ShippingOptions(ShippingOptions::new()),
                TopWidget::Total(Total),
                TopWidget::AwaitPaymentResponse(AwaitPaymentResponse),
            ]
            .into_iter()
            .map(|widget| WidgetEntry { widget, active: false })
            .collect(),
        };
        widgets.restore_defaults();
        widgets
    }

    /// Everything visible except the waiting spinner
    pub fn restore_defaults(&mut self) {
        for entry in &mut self.entries {
            entry.active = entry.widget.shown_by_default();
        }
    }

    /// Hide everything but the waiting spinner
    pub fn await_response(&mut self) {
        for entry in &mut self.entries {
            entry.active = matches!(entry.widget, TopWidget::AwaitPaymentResponse(_));
        }
    }

    pub fn shipping_options_mut(&mut self) -> Option<&mut ShippingOptions> {
        self.entries.iter_mut().find_map(|e| match &mut e.widget {
            TopWidget::ShippingOptions(picker) => Some(picker),
            _ => None,
        })
    }

    pub fn render(&self, request: &PaymentRequest) -> Vec<Fragment> {
        self.entries
            .iter()
            .filter(|e| e.active)
            .map(|e| e.widget.as_widget().render(request))
            .filter(|f| !f.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{PaymentAmount, PaymentItem, ShippingOption};
    use rust_decimal_macros::dec;

    fn request() -> PaymentRequest {
        let total = PaymentItem::new("Total", PaymentAmount::new("USD", dec!(35)));
        PaymentRequest::new("https://shop.example", total)
            .with_item(PaymentItem::new("Book", PaymentAmount::new("USD", dec!(30))))
            .with_shipping_option(ShippingOption {
                id: "standard".into(),
                label: "Standard".into(),
                amount: PaymentAmount::new("USD", dec!(5)),
                selected: true,
            })
            .with_shipping_option(ShippingOption {
                id: "express".into(),
                label: "Express".into(),
                amount: PaymentAmount::new("USD", dec!(15)),
                selected: false,
            })
    }

    #[test]
    fn test_default_visibility() {
        let widgets = TopWidgets::new();
        let rendered = widgets.render(&request());
        assert_eq!(rendered.len(), 3);
        assert!(rendered.iter().all(|f| !f.as_str().contains("Processing")));
    }

    #[test]
    fn test_await_response_hides_others() {
        let mut widgets = TopWidgets::new();
        widgets.await_response();
        let rendered = widgets.render(&request());
        assert_eq!(rendered, vec![Fragment::new("Processing payment...")]);

        widgets.restore_defaults();
        assert_eq!(widgets.render(&request()).len(), 3);
    }

    #[test]
    fn test_shipping_choice() {
        let request = request();
        let mut widgets = TopWidgets::new();
        let picker = widgets.shipping_options_mut().unwrap();
        assert!(!picker.choose(&request, "teleport"));
        assert!(picker.choose(&request, "express"));

        let shipping = picker.render(&request);
        assert!(shipping.as_str().contains("(x) Express"));
        assert!(shipping.as_str().contains("( ) Standard"));
    }
}
