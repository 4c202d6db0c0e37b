//! Dialog Boundary
//!
//! The modal surface the sheet renders into. Presentation layers implement
//! [`Dialog`]; [`HeadlessDialog`] records everything for tests and demos.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use crate::error::{Result, SheetError};
use crate::render::SheetView;

/// Resolves once the host document can accept the dialog
///
/// Awaited by the sheet without holding the dialog, so an abort can still get
/// through while attachment is pending.
#[derive(Clone, Debug)]
pub struct DocumentReady {
    rx: watch::Receiver<bool>,
}

impl DocumentReady {
    /// A document that is ready right away
    pub fn ready() -> Self {
        let (tx, rx) = watch::channel(true);
        drop(tx);
        Self { rx }
    }

    /// A document that becomes ready when the returned handle says so
    pub fn deferred() -> (Self, DocumentHandle) {
        let (tx, rx) = watch::channel(false);
        (Self { rx }, DocumentHandle { tx: Arc::new(tx) })
    }

    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the document is ready
    pub async fn wait(mut self) -> Result<()> {
        self.rx
            .wait_for(|ready| *ready)
            .await
            .map(|_| ())
            .map_err(|_| SheetError::Dialog("document went away before it was ready".into()))
    }
}

/// Marks a deferred document as loaded
#[derive(Clone, Debug)]
pub struct DocumentHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl DocumentHandle {
    pub fn mark_ready(&self) {
        self.tx.send_replace(true);
    }
}

/// Modal dialog primitives
pub trait Dialog: Send {
    /// Readiness gate for attachment
    fn document(&self) -> DocumentReady;

    fn is_attached(&self) -> bool;

    /// Insert into the document; only called once `document()` is ready
    fn attach(&mut self);

    fn detach(&mut self);

    /// Whether the open-state attribute is set
    fn is_open(&self) -> bool;

    /// Set the open-state attribute without showing
    fn set_open(&mut self);

    fn show_modal(&mut self) -> Result<()>;

    fn close(&mut self) -> Result<()>;

    fn render(&mut self, view: &SheetView);
}

#[derive(Debug, Default)]
struct Recorded {
    renders: Vec<SheetView>,
    attaches: usize,
    shows: usize,
}

/// Read-only view into a [`HeadlessDialog`] from outside the sheet
#[derive(Clone, Debug)]
pub struct DialogProbe {
    recorded: Arc<Mutex<Recorded>>,
    shown: watch::Receiver<bool>,
}

impl DialogProbe {
    /// Wait until the modal is showing
    pub async fn shown(&self) {
        let mut shown = self.shown.clone();
        let _ = shown.wait_for(|s| *s).await;
    }

    /// Wait until the modal is no longer showing
    pub async fn hidden(&self) {
        let mut shown = self.shown.clone();
        let _ = shown.wait_for(|s| !*s).await;
    }

    pub fn is_showing(&self) -> bool {
        *self.shown.borrow()
    }

    pub fn render_count(&self) -> usize {
        self.recorded().renders.len()
    }

    pub fn last_render(&self) -> Option<SheetView> {
        self.recorded().renders.last().cloned()
    }

    pub fn attach_count(&self) -> usize {
        self.recorded().attaches
    }

    pub fn show_count(&self) -> usize {
        self.recorded().shows
    }

    fn recorded(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-process dialog that keeps a log of what happened to it
#[derive(Debug)]
pub struct HeadlessDialog {
    document: DocumentReady,
    attached: bool,
    open: bool,
    recorded: Arc<Mutex<Recorded>>,
    shown: watch::Sender<bool>,
}

impl Default for HeadlessDialog {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDialog {
    pub fn new() -> Self {
        Self::with_document(DocumentReady::ready())
    }

    /// A dialog whose document loads later
    pub fn deferred() -> (Self, DocumentHandle) {
        let (document, handle) = DocumentReady::deferred();
        (Self::with_document(document), handle)
    }

    fn with_document(document: DocumentReady) -> Self {
        let (shown, _) = watch::channel(false);
        Self {
            document,
            attached: false,
            open: false,
            recorded: Arc::new(Mutex::new(Recorded::default())),
            shown,
        }
    }

    pub fn probe(&self) -> DialogProbe {
        DialogProbe {
            recorded: Arc::clone(&self.recorded),
            shown: self.shown.subscribe(),
        }
    }

    fn recorded(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Dialog for HeadlessDialog {
    fn document(&self) -> DocumentReady {
        self.document.clone()
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn attach(&mut self) {
        self.attached = true;
        self.recorded().attaches += 1;
    }

    fn detach(&mut self) {
        self.attached = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn set_open(&mut self) {
        self.open = true;
    }

    fn show_modal(&mut self) -> Result<()> {
        if !self.attached {
            return Err(SheetError::Dialog("cannot show a detached dialog".into()));
        }
        self.open = true;
        self.recorded().shows += 1;
        self.shown.send_replace(true);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.open {
            return Err(SheetError::Dialog("dialog is not open".into()));
        }
        self.open = false;
        self.shown.send_replace(false);
        Ok(())
    }

    fn render(&mut self, view: &SheetView) {
        self.recorded().renders.push(view.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_document() {
        let document = DocumentReady::ready();
        assert!(document.is_ready());
        document.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_deferred_document() {
        let (document, handle) = DocumentReady::deferred();
        assert!(!document.is_ready());

        let waiter = tokio::spawn(document.wait());
        handle.mark_ready();
        waiter.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_document_dropped_before_ready() {
        let (document, handle) = DocumentReady::deferred();
        drop(handle);
        assert!(document.wait().await.is_err());
    }

    #[tokio::test]
    async fn test_headless_lifecycle() {
        let mut dialog = HeadlessDialog::new();
        let probe = dialog.probe();

        assert!(dialog.show_modal().is_err());
        dialog.attach();
        dialog.render(&SheetView::default());
        dialog.show_modal().unwrap();
        probe.shown().await;

        assert!(dialog.is_open());
        assert_eq!(probe.render_count(), 1);
        assert_eq!(probe.show_count(), 1);

        dialog.close().unwrap();
        assert!(dialog.close().is_err());
        probe.hidden().await;
        assert!(!probe.is_showing());
    }
}
