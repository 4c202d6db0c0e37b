//! Render Boundary
//!
//! Widgets and collectors turn state into opaque [`Fragment`]s. The sheet only
//! assembles them into a [`SheetView`]; it never looks inside.

use serde::{Deserialize, Serialize};

/// An opaque renderable piece of the sheet
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fragment(String);

impl Fragment {
    pub fn new(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Concatenate fragments in order
    pub fn join(parts: impl IntoIterator<Item = Fragment>) -> Self {
        Self(parts.into_iter().map(|f| f.0).collect::<Vec<_>>().join("\n"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Fragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The whole sheet, as handed to the dialog
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetView {
    pub heading: String,

    /// Active top widgets, in order
    pub top: Vec<Fragment>,

    /// The active step; `None` hides the data-sheet section
    pub data_sheet: Option<Fragment>,

    /// Host information
    pub bottom: Fragment,
}

impl SheetView {
    /// Whether the data-sheet section is hidden
    pub fn data_sheet_hidden(&self) -> bool {
        self.data_sheet.is_none()
    }
}

impl std::fmt::Display for SheetView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "# {}", self.heading)?;
        for fragment in &self.top {
            writeln!(f, "{}", fragment)?;
        }
        if let Some(sheet) = &self.data_sheet {
            writeln!(f, "{}", sheet)?;
        }
        write!(f, "{}", self.bottom)
    }
}

/// Labels for a step's proceed and cancel buttons
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonLabels {
    pub proceed: String,
    pub cancel: String,
}

impl Default for ButtonLabels {
    fn default() -> Self {
        Self {
            proceed: "Continue".into(),
            cancel: "Cancel".into(),
        }
    }
}
