//! Payment Sheet Session
//!
//! Owns the dialog lifecycle and settles exactly one outcome per `open`.
//!
//! ```text
//!  Idle ──open──▶ AwaitingDialogAttach ──attached──▶ Showing ──close──▶ Closed
//!    │                    │                             │                 │
//!    └──────abort─────────┴────────────abort────────────┴──▶ Closed ◀─open┘
//! ```
//!
//! Three paths compete to settle the outcome: the last step completing, a
//! user or caller abort, and an explicit close. Whichever comes first wins;
//! the others find the outcome already settled.

use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::{Mutex as AsyncMutex, broadcast, oneshot};

use crate::config::SheetConfig;
use crate::dialog::Dialog;
use crate::error::{Result, SheetError};
use crate::event::{EventSink, SheetEvent};
use crate::outcome::{Deferred, Outcome};
use crate::record::CollectedData;
use crate::render::SheetView;
use crate::request::PaymentRequest;
use crate::sequencer::{Advance, StepSequencer};
use crate::step::Step;
use crate::store::RecordStore;
use crate::widget::{Host, TopWidgets, Widget};

/// Reason given when the user cancels from the dialog or a step
pub const USER_ABORTED: &str = "User aborted.";

/// Reason given when collectors are not ready in time
pub const TIMED_OUT: &str = "Payment sheet timed out.";

/// Reason given to an outcome still pending when the sheet closes
pub const SHEET_CLOSED: &str = "Sheet closed.";

/// Lifecycle of the sheet
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingDialogAttach,
    Showing,
    Closed,
}

/// Why the caller wants the sheet closed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseReason {
    Fail,
    Abort,
    Success,
    Unknown,
}

impl CloseReason {
    pub fn as_str(self) -> &'static str {
        match self {
            CloseReason::Fail => "fail",
            CloseReason::Abort => "abort",
            CloseReason::Success => "success",
            CloseReason::Unknown => "unknown",
        }
    }
}

impl FromStr for CloseReason {
    type Err = SheetError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fail" => Ok(CloseReason::Fail),
            "abort" => Ok(CloseReason::Abort),
            "success" => Ok(CloseReason::Success),
            "unknown" => Ok(CloseReason::Unknown),
            other => Err(SheetError::Assertion(format!("unrecognized close reason: {}", other))),
        }
    }
}

struct Lifecycle {
    state: SessionState,
    /// Bumped by every `open`; lets a suspended `open` notice it was superseded
    cycle: u64,
    outcome: Deferred<Outcome>,
    request: Option<PaymentRequest>,
}

impl Lifecycle {
    fn in_flight(&self) -> bool {
        matches!(self.state, SessionState::AwaitingDialogAttach | SessionState::Showing)
    }
}

type ReadyFuture = Shared<BoxFuture<'static, ()>>;

struct Inner {
    config: SheetConfig,
    store: Arc<dyn RecordStore>,
    dialog: Mutex<Box<dyn Dialog>>,
    lifecycle: Mutex<Lifecycle>,
    sequencer: Arc<AsyncMutex<Option<StepSequencer>>>,
    widgets: Mutex<TopWidgets>,
    host: Host,
    events: EventSink,
    ready: ReadyFuture,
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Inner {
    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        lock(&self.lifecycle)
    }

    fn dialog(&self) -> MutexGuard<'_, Box<dyn Dialog>> {
        lock(&self.dialog)
    }

    fn widgets(&self) -> MutexGuard<'_, TopWidgets> {
        lock(&self.widgets)
    }

    fn current_request(&self) -> Option<PaymentRequest> {
        self.lifecycle().request.clone()
    }

    /// Whether `cycle` is still the live, un-aborted one
    fn is_current(&self, cycle: u64) -> bool {
        let life = self.lifecycle();
        life.cycle == cycle && life.in_flight()
    }

    fn compose(&self, request: &PaymentRequest, active: Option<&Step>) -> SheetView {
        SheetView {
            heading: self.config.heading.clone(),
            top: self.widgets().render(request),
            data_sheet: active.map(|step| step.render(request)),
            bottom: self.host.render(request),
        }
    }

    /// Re-render the dialog from current state
    fn present(&self, sequencer: Option<&StepSequencer>) {
        let Some(request) = self.current_request() else {
            return;
        };
        let view = self.compose(&request, sequencer.and_then(StepSequencer::active));
        self.dialog().render(&view);
    }
}

/// Builder for a [`PaymentSheet`]
pub struct PaymentSheetBuilder {
    config: SheetConfig,
    store: Arc<dyn RecordStore>,
    dialog: Option<Box<dyn Dialog>>,
    steps: Vec<Step>,
    events: EventSink,
}

impl PaymentSheetBuilder {
    pub fn new(config: SheetConfig, store: Arc<dyn RecordStore>) -> Self {
        let events = EventSink::new(config.event_capacity);
        Self {
            config,
            store,
            dialog: None,
            steps: Vec::new(),
            events,
        }
    }

    /// Sink for collectors that publish sheet events
    pub fn events(&self) -> EventSink {
        self.events.clone()
    }

    /// The shared record store, for constructing collectors
    pub fn store(&self) -> Arc<dyn RecordStore> {
        Arc::clone(&self.store)
    }

    pub fn dialog(mut self, dialog: impl Dialog + 'static) -> Self {
        self.dialog = Some(Box::new(dialog));
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Build the sheet and start readying its steps
    ///
    /// Readiness starts in the background when called inside a tokio runtime;
    /// otherwise it starts on the first `open` or `ready`.
    pub fn build(self) -> Result<PaymentSheet> {
        let dialog = self
            .dialog
            .ok_or_else(|| SheetError::Config("a dialog is required".into()))?;

        let sequencer = Arc::new(AsyncMutex::new(None));
        let ready = initialize(self.steps, Arc::clone(&sequencer)).boxed().shared();
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(ready.clone());
        }

        Ok(PaymentSheet {
            inner: Arc::new(Inner {
                config: self.config,
                store: self.store,
                dialog: Mutex::new(dialog),
                lifecycle: Mutex::new(Lifecycle {
                    state: SessionState::Idle,
                    cycle: 0,
                    outcome: Deferred::settled(),
                    request: None,
                }),
                sequencer,
                widgets: Mutex::new(TopWidgets::new()),
                host: Host,
                events: self.events,
                ready,
            }),
        })
    }
}

/// Ready each step in order, then hand them to the sequencer
async fn initialize(mut steps: Vec<Step>, slot: Arc<AsyncMutex<Option<StepSequencer>>>) {
    tracing::info!(steps = steps.len(), "Initializing payment sheet");
    for (index, step) in steps.iter_mut().enumerate() {
        step.ready().await;
        tracing::debug!(step = index, caption = step.caption(), "Step ready");
    }
    *slot.lock().await = Some(StepSequencer::new(steps));
    tracing::info!("Payment sheet ready");
}

/// Wait for readiness; `false` if the timeout hit first
async fn wait_ready(ready: ReadyFuture, timeout: Option<Duration>) -> bool {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, ready).await.is_ok(),
        None => {
            ready.await;
            true
        }
    }
}

fn settled(received: std::result::Result<Outcome, oneshot::error::RecvError>) -> Outcome {
    received.unwrap_or_else(|_| Err(SheetError::Aborted(SHEET_CLOSED.into())))
}

/// The payment sheet
///
/// A cheaply clonable handle; clones drive the same session.
#[derive(Clone)]
pub struct PaymentSheet {
    inner: Arc<Inner>,
}

impl PaymentSheet {
    pub fn builder(config: SheetConfig, store: Arc<dyn RecordStore>) -> PaymentSheetBuilder {
        PaymentSheetBuilder::new(config, store)
    }

    /// Resolves once every step's collector is ready
    pub async fn ready(&self) {
        self.inner.ready.clone().await;
    }

    pub fn state(&self) -> SessionState {
        self.inner.lifecycle().state
    }

    pub fn is_showing(&self) -> bool {
        self.state() == SessionState::Showing
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SheetEvent> {
        self.inner.events.subscribe()
    }

    /// Show the sheet and wait for the collected data
    ///
    /// Fails with [`SheetError::AlreadyShowing`] if a session is in flight,
    /// and with [`SheetError::Aborted`] if the session is cancelled.
    pub async fn open(&self, request: PaymentRequest) -> Outcome {
        let (cycle, mut rx) = {
            let mut life = self.inner.lifecycle();
            if life.in_flight() {
                return Err(SheetError::AlreadyShowing);
            }
            let (outcome, rx) = Deferred::new();
            life.cycle += 1;
            life.outcome = outcome;
            life.state = SessionState::AwaitingDialogAttach;
            life.request = Some(request.clone());
            (life.cycle, rx)
        };
        tracing::info!(request = %request.id, origin = %request.origin, "Opening payment sheet");

        {
            let mut widgets = self.inner.widgets();
            widgets.restore_defaults();
            if let Some(picker) = widgets.shipping_options_mut() {
                picker.clear();
            }
        }

        let document = {
            let dialog = self.inner.dialog();
            (!dialog.is_attached()).then(|| dialog.document())
        };
        if let Some(document) = document {
            let attached = tokio::select! {
                biased;
                received = &mut rx => return settled(received),
                attached = document.wait() => attached,
            };
            if let Err(e) = attached {
                tracing::warn!(error = %e, "Dialog could not be attached");
                self.abort(USER_ABORTED).await;
                return settled(rx.await);
            }
        }

        let superseded = {
            let mut life = self.inner.lifecycle();
            let superseded = life.cycle != cycle || !life.in_flight();
            if !superseded {
                life.state = SessionState::Showing;
            }
            superseded
        };
        if superseded {
            return settled(rx.await);
        }
        {
            let mut dialog = self.inner.dialog();
            if !dialog.is_attached() {
                dialog.attach();
            }
        }

        let timeout = self.inner.config.ready_timeout();
        let is_ready = tokio::select! {
            biased;
            received = &mut rx => return settled(received),
            is_ready = wait_ready(self.inner.ready.clone(), timeout) => is_ready,
        };
        if !is_ready {
            tracing::warn!(?timeout, "Collectors were not ready in time");
            self.abort(TIMED_OUT).await;
            return settled(rx.await);
        }

        let shown = {
            let mut guard = self.inner.sequencer.lock().await;
            if !self.inner.is_current(cycle) {
                drop(guard);
                return settled(rx.await);
            }
            match guard.as_mut() {
                Some(sequencer) => {
                    // Each cycle starts from the first step with nothing collected
                    sequencer.reset();
                    sequencer.update(&request);
                    let view = self.inner.compose(&request, sequencer.active());
                    let mut dialog = self.inner.dialog();
                    dialog.render(&view);
                    let shown = dialog.show_modal();
                    drop(dialog);

                    if shown.is_ok() && sequencer.is_empty() {
                        self.complete(CollectedData::new());
                    }
                    shown
                }
                None => Err(SheetError::Assertion("steps missing after readiness".into())),
            }
        };
        if let Err(e) = shown {
            tracing::error!(error = %e, "Could not show payment sheet");
            self.abort(USER_ABORTED).await;
        }

        let outcome = settled(rx.await);
        match &outcome {
            Ok(data) => tracing::info!(fields = data.len(), "Payment sheet collected data"),
            Err(e) => tracing::info!(error = %e, "Payment sheet did not complete"),
        }
        outcome
    }

    /// Push new request data to every step and re-render
    pub async fn update(&self, request: PaymentRequest) {
        self.inner.lifecycle().request = Some(request.clone());
        let mut guard = self.inner.sequencer.lock().await;
        if let Some(sequencer) = guard.as_mut() {
            sequencer.update(&request);
        }
        self.inner.present(guard.as_ref());
    }

    /// Render from current state, defaulting to the last request seen
    pub async fn render(&self, request: Option<&PaymentRequest>) -> Option<SheetView> {
        let request = match request {
            Some(request) => request.clone(),
            None => self.inner.current_request()?,
        };
        let guard = self.inner.sequencer.lock().await;
        let view = self
            .inner
            .compose(&request, guard.as_ref().and_then(StepSequencer::active));
        drop(guard);
        self.inner.dialog().render(&view);
        Some(view)
    }

    /// Type into the active step. Returns `false` if no step is active.
    pub async fn set_field(&self, field: &str, value: &str) -> bool {
        let mut guard = self.inner.sequencer.lock().await;
        match guard.as_mut().and_then(StepSequencer::active_mut) {
            Some(step) => {
                step.input_mut().set(field, value);
                true
            }
            None => false,
        }
    }

    /// Caption of the active step
    pub async fn active_caption(&self) -> Option<String> {
        let guard = self.inner.sequencer.lock().await;
        guard
            .as_ref()
            .and_then(StepSequencer::active)
            .map(|step| step.caption().to_string())
    }

    /// Data collected by the steps committed so far
    pub async fn collected(&self) -> CollectedData {
        let guard = self.inner.sequencer.lock().await;
        guard
            .as_ref()
            .map(|s| s.collected().clone())
            .unwrap_or_default()
    }

    /// The user asked to continue from the active step
    pub async fn proceed(&self) -> Advance {
        if !self.is_showing() {
            return Advance::Idle;
        }

        let mut guard = self.inner.sequencer.lock().await;
        let Some(sequencer) = guard.as_mut() else {
            return Advance::Idle;
        };

        let advance = sequencer.advance().await;
        match &advance {
            Advance::Updated(_) | Advance::Invalid(_) => self.inner.present(Some(&*sequencer)),
            Advance::Done(data) => {
                self.inner.widgets().await_response();
                self.inner.present(Some(&*sequencer));
                self.complete(data.clone());
            }
            Advance::Idle => {}
        }
        advance
    }

    fn complete(&self, data: CollectedData) {
        if !self.inner.lifecycle().outcome.resolve(data) {
            tracing::debug!("Outcome already settled");
        }
    }

    /// Pick a shipping option. Returns `false` for an unknown id.
    pub async fn select_shipping_option(&self, id: &str) -> bool {
        let Some(request) = self.inner.current_request() else {
            return false;
        };
        let chosen = self
            .inner
            .widgets()
            .shipping_options_mut()
            .is_some_and(|picker| picker.choose(&request, id));
        if !chosen {
            return false;
        }

        self.inner.events.emit(SheetEvent::ShippingOptionChange { id: id.to_string() });
        let guard = self.inner.sequencer.lock().await;
        self.inner.present(guard.as_ref());
        true
    }

    /// The dialog's cancel event (e.g. escape pressed)
    pub async fn cancel(&self) {
        self.abort(USER_ABORTED).await;
    }

    /// A step's own cancel button
    pub async fn abort_step(&self) {
        self.abort(USER_ABORTED).await;
    }

    /// Tear down the session and reject its outcome with `reason`
    ///
    /// Safe from any state; from `Idle` it is just a close.
    pub async fn abort(&self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::info!(%reason, state = ?self.state(), "Aborting payment sheet");

        if self.inner.store.is_open() {
            if let Err(e) = self.inner.store.close().await {
                tracing::warn!(error = %e, "Closing record store failed");
            }
        }

        if let Some(sequencer) = self.inner.sequencer.lock().await.as_mut() {
            sequencer.reset();
        }

        self.inner
            .lifecycle()
            .outcome
            .reject(SheetError::Aborted(reason.clone()));
        self.close().await;
        self.inner.events.emit(SheetEvent::Abort { reason });
    }

    /// Close for `reason`
    pub async fn request_close(&self, reason: CloseReason) {
        tracing::info!(reason = reason.as_str(), "Close requested");
        match reason {
            CloseReason::Success => {
                let collected = self.collected().await;
                if self.inner.lifecycle().outcome.resolve(collected) {
                    tracing::debug!("Resolved outcome on successful close");
                }
            }
            CloseReason::Fail | CloseReason::Abort | CloseReason::Unknown => {}
        }
        self.close().await;
    }

    /// [`request_close`](Self::request_close) with a reason name
    ///
    /// An unrecognized name is a programming error: it is logged and returned,
    /// and the sheet is left as it was.
    pub async fn request_close_by_name(&self, reason: &str) -> Result<()> {
        match reason.parse::<CloseReason>() {
            Ok(reason) => {
                self.request_close(reason).await;
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "This should never happen");
                Err(e)
            }
        }
    }

    /// Close the dialog unconditionally
    pub async fn close(&self) {
        {
            let mut dialog = self.inner.dialog();
            if !dialog.is_open() {
                dialog.set_open();
            }
            if let Err(e) = dialog.close() {
                tracing::warn!(error = %e, "Dialog didn't close correctly");
            }
            dialog.detach();
        }

        let mut life = self.inner.lifecycle();
        life.state = SessionState::Closed;
        life.outcome.reject(SheetError::Aborted(SHEET_CLOSED.into()));
    }
}
