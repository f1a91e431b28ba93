//! Modal dialog shells.
//!
//! A [`PopContainer`] owns one [`Container`] tree and shows it in its own
//! modal window. [`PopContainer::show`] drives the toolkit's event loop until
//! the dialog is torn down and then returns the dialog's result string.
//!
//! # Lifecycle
//!
//! ```text
//! Created -> OpenRequested -> Visible -> CloseRequested -> TornDown
//!                 |                            |
//!                 +-- WINDOWOPEN veto          +-- WINDOWCLOSED veto -> Visible
//! ```
//!
//! - `WINDOWOPEN` fires before the window is shown. Rejecting it tears the
//!   dialog down without ever showing it, and `show` returns `""`.
//! - `WINDOWPOSTOPEN` fires once, right after the window became visible.
//! - `WINDOWCLOSED` fires for every close attempt, from the user or from
//!   [`DialogHandle::close`]. Rejecting it keeps the dialog open.
//!
//! Close requests are deferred: the modal loop handles them between native
//! events, so a callback may call `close` while it is still running.
//!
//! [`Application`] is the same shell with the application lifecycle events.

use std::sync::{Arc, Weak};

use cinegrid_core::logging::{span_names, targets};
use cinegrid_core::{Error, EventKind, EventResult, EventValue, NativeHandle, NativeSignal, Result, WindowId};
use parking_lot::{Mutex, RwLock};

use crate::backend::LoopStatus;
use crate::context::AppContext;
use crate::event::{Dispatcher, Envelope};
use crate::widget::{Callback, Container, Widget};

/// Where a dialog shell is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogPhase {
    Created,
    OpenRequested,
    Visible,
    CloseRequested,
    TornDown,
}

impl DialogPhase {
    pub fn name(self) -> &'static str {
        match self {
            DialogPhase::Created => "CREATED",
            DialogPhase::OpenRequested => "OPEN_REQUESTED",
            DialogPhase::Visible => "VISIBLE",
            DialogPhase::CloseRequested => "CLOSE_REQUESTED",
            DialogPhase::TornDown => "TORN_DOWN",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Lifecycle {
    open: EventKind,
    post_open: EventKind,
    closed: EventKind,
}

const DIALOG_EVENTS: Lifecycle = Lifecycle {
    open: EventKind::WindowOpen,
    post_open: EventKind::WindowPostOpen,
    closed: EventKind::WindowClosed,
};

const APP_EVENTS: Lifecycle = Lifecycle {
    open: EventKind::AppInit,
    post_open: EventKind::AppPostInit,
    closed: EventKind::AppClosed,
};

struct ShellState {
    phase: DialogPhase,
    window_id: Option<WindowId>,
    native: Option<NativeHandle>,
    window: Option<Widget>,
    result: String,
    pending_close: bool,
}

pub(crate) struct DialogInner {
    ctx: AppContext,
    tag: String,
    title: String,
    container: Container,
    callback: RwLock<Option<Callback>>,
    lifecycle: Lifecycle,
    state: Mutex<ShellState>,
}

impl DialogInner {
    fn new(ctx: &AppContext, tag: String, title: String, container: Container, lifecycle: Lifecycle) -> Arc<Self> {
        Arc::new(Self {
            ctx: ctx.clone(),
            tag,
            title,
            container,
            callback: RwLock::new(None),
            lifecycle,
            state: Mutex::new(ShellState {
                phase: DialogPhase::Created,
                window_id: None,
                native: None,
                window: None,
                result: String::new(),
                pending_close: false,
            }),
        })
    }

    fn phase(&self) -> DialogPhase {
        self.state.lock().phase
    }

    fn wrong_phase(&self, action: &'static str, phase: DialogPhase) -> Error {
        Error::DialogState {
            tag: self.tag.clone(),
            action,
            phase: phase.name(),
        }
    }

    fn fire(&self, event: EventKind) -> EventResult {
        let Some(callback) = self.callback.read().clone() else {
            return EventResult::Accept;
        };
        let Some(window_id) = self.state.lock().window_id else {
            return EventResult::Accept;
        };
        Dispatcher::new(&self.ctx).fire(&callback, window_id, &self.tag, &self.tag, event, event.name(), EventValue::None)
    }

    fn show(self: &Arc<Self>) -> Result<String> {
        {
            let mut state = self.state.lock();
            if state.phase != DialogPhase::Created {
                return Err(self.wrong_phase("show", state.phase));
            }
            state.phase = DialogPhase::OpenRequested;
        }

        let span = tracing::debug_span!(target: targets::DIALOG, "cinegrid::dialog", tag = %self.tag);
        let _guard = span.enter();

        let opened = self
            .open()
            .and_then(|opened| if opened { self.run().map(|()| true) } else { Ok(false) });
        match opened {
            Ok(true) => Ok(self.state.lock().result.clone()),
            Ok(false) => Ok(String::new()),
            Err(err) => {
                self.teardown();
                Err(err)
            }
        }
    }

    // Returns false when the open was vetoed.
    fn open(self: &Arc<Self>) -> Result<bool> {
        let ctx = &self.ctx;
        let window_id = ctx.next_window_id()?;
        let native = ctx.toolkit().create_window(&self.title, &self.tag)?;
        {
            let mut state = self.state.lock();
            state.window_id = Some(window_id);
            state.native = Some(native);
        }
        let window = Widget::window(ctx, window_id, &self.tag, native)?;
        self.state.lock().window = Some(window);
        ctx.register_window(window_id, native, &self.title, Arc::downgrade(self));
        ctx.modal().push(window_id, &self.tag);

        let callback = self.callback.read().clone();
        self.container.materialize(ctx, window_id, native, &self.tag, callback)?;

        let weak = Arc::downgrade(self);
        ctx.toolkit().connect(
            native,
            NativeSignal::CloseRequested,
            Arc::new(move |_, _| {
                if let Some(inner) = weak.upgrade() {
                    inner.request_close("window");
                }
            }),
        )?;

        if self.fire(self.lifecycle.open).is_reject() {
            tracing::debug!(target: targets::DIALOG, tag = %self.tag, "open vetoed");
            self.teardown();
            return Ok(false);
        }

        ctx.toolkit().set_visible(native, true)?;
        self.state.lock().phase = DialogPhase::Visible;
        tracing::debug!(target: targets::DIALOG, tag = %self.tag, %window_id, "dialog visible");
        self.fire(self.lifecycle.post_open);
        Ok(true)
    }

    fn run(&self) -> Result<()> {
        let depth = self.ctx.modal().depth();
        let span = tracing::debug_span!(target: targets::DIALOG, span_names::MODAL_LOOP, tag = %self.tag, depth);
        let _guard = span.enter();
        loop {
            let pending = std::mem::take(&mut self.state.lock().pending_close);
            if pending {
                if self.try_close() {
                    return Ok(());
                }
                continue;
            }

            match self.ctx.toolkit().process_events()? {
                LoopStatus::Processed => {}
                LoopStatus::Idle => {
                    let window_id = self.state.lock().window_id;
                    return Err(window_id.map_or_else(
                        || Error::toolkit("event loop ran without a window"),
                        Error::EventLoopStarved,
                    ));
                }
            }
        }
    }

    fn request_close(&self, source: &'static str) {
        let mut state = self.state.lock();
        if state.phase == DialogPhase::Visible {
            state.pending_close = true;
        } else {
            tracing::debug!(target: targets::DIALOG, tag = %self.tag, source, phase = state.phase.name(), "close request ignored");
        }
    }

    // Returns true once the dialog is torn down.
    fn try_close(&self) -> bool {
        self.state.lock().phase = DialogPhase::CloseRequested;
        if self.fire(self.lifecycle.closed).is_reject() {
            tracing::debug!(target: targets::DIALOG, tag = %self.tag, "close vetoed");
            self.state.lock().phase = DialogPhase::Visible;
            return false;
        }
        self.teardown();
        true
    }

    fn teardown(&self) {
        let (window_id, native, window) = {
            let mut state = self.state.lock();
            if state.phase == DialogPhase::TornDown {
                return;
            }
            state.phase = DialogPhase::TornDown;
            state.pending_close = false;
            (state.window_id, state.native, state.window.take())
        };
        drop(window);

        let ctx = &self.ctx;
        if let Some(window_id) = window_id {
            let removed = ctx.registry().delete_window(window_id);
            self.container.detach();
            ctx.modal().pop(window_id);
            ctx.unregister_window(window_id);
            tracing::debug!(target: targets::DIALOG, tag = %self.tag, %window_id, removed, "dialog torn down");
        }
        if let Some(native) = native
            && let Err(err) = ctx.toolkit().destroy(native)
        {
            tracing::warn!(target: targets::DIALOG, tag = %self.tag, %err, "failed to destroy window");
        }
    }

    fn close(&self) -> Result<()> {
        let phase = self.phase();
        match phase {
            DialogPhase::Visible => {
                self.request_close("close");
                Ok(())
            }
            DialogPhase::CloseRequested => Ok(()),
            _ => Err(self.wrong_phase("close", phase)),
        }
    }
}

/// A modal dialog around a container tree.
///
/// ```no_run
/// use cinegrid::{AppContext, Container, Control, EventKind, EventResult, PopContainer};
///
/// let (ctx, _toolkit) = AppContext::headless();
/// let form = Container::vbox("form");
/// form.add_row([Control::button("ok", "Ok")]).unwrap();
///
/// let dialog = PopContainer::new(&ctx, "ask", "Question", form).with_callback(|env| {
///     if env.event() == EventKind::Clicked {
///         if let Some(dialog) = env.dialog() {
///             dialog.set_result(env.tag());
///             dialog.close().ok();
///         }
///     }
///     EventResult::Accept
/// });
/// let result = dialog.show().unwrap();
/// ```
pub struct PopContainer {
    inner: Arc<DialogInner>,
}

impl PopContainer {
    pub fn new(ctx: &AppContext, tag: impl Into<String>, title: impl Into<String>, container: Container) -> Self {
        Self {
            inner: DialogInner::new(ctx, tag.into(), title.into(), container, DIALOG_EVENTS),
        }
    }

    /// Set the callback for the dialog's lifecycle events.
    ///
    /// Controls without a callback of their own, in containers without one,
    /// report to this callback as well.
    pub fn with_callback<F>(self, callback: F) -> Self
    where
        F: Fn(&Envelope) -> EventResult + Send + Sync + 'static,
    {
        *self.inner.callback.write() = Some(Arc::new(callback));
        self
    }

    /// Show the dialog and block until it is torn down.
    ///
    /// Returns the last value passed to [`set_result`](Self::set_result), or
    /// `""` if the open was vetoed. A shell can only be shown once.
    pub fn show(&self) -> Result<String> {
        self.inner.show()
    }

    /// Request the dialog to close. Only valid while it is visible.
    pub fn close(&self) -> Result<()> {
        self.inner.close()
    }

    pub fn set_result(&self, result: impl Into<String>) {
        self.inner.state.lock().result = result.into();
    }

    pub fn result(&self) -> String {
        self.inner.state.lock().result.clone()
    }

    pub fn phase(&self) -> DialogPhase {
        self.inner.phase()
    }

    pub fn tag(&self) -> &str {
        &self.inner.tag
    }

    pub fn title(&self) -> &str {
        &self.inner.title
    }

    pub fn container(&self) -> &Container {
        &self.inner.container
    }

    /// The dialog's window, while it is open.
    pub fn window_id(&self) -> Option<WindowId> {
        self.inner.state.lock().window_id
    }

    pub fn handle(&self) -> DialogHandle {
        DialogHandle(Arc::downgrade(&self.inner))
    }
}

impl std::fmt::Debug for PopContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("PopContainer")
            .field("tag", &self.inner.tag)
            .field("title", &self.inner.title)
            .field("phase", &state.phase)
            .field("window_id", &state.window_id)
            .field("result", &state.result)
            .finish()
    }
}

/// Weak handle to a dialog shell, for use from callbacks.
///
/// Every operation is a no-op (or returns `None`) once the shell is gone.
#[derive(Clone)]
pub struct DialogHandle(Weak<DialogInner>);

impl DialogHandle {
    pub(crate) fn new(inner: Weak<DialogInner>) -> Self {
        Self(inner)
    }

    /// Request the dialog to close; see [`PopContainer::close`].
    pub fn close(&self) -> Result<()> {
        match self.0.upgrade() {
            Some(inner) => inner.close(),
            None => Ok(()),
        }
    }

    pub fn set_result(&self, result: impl Into<String>) {
        if let Some(inner) = self.0.upgrade() {
            inner.state.lock().result = result.into();
        }
    }

    pub fn result(&self) -> Option<String> {
        self.0.upgrade().map(|inner| inner.state.lock().result.clone())
    }

    pub fn phase(&self) -> Option<DialogPhase> {
        self.0.upgrade().map(|inner| inner.phase())
    }

    pub fn tag(&self) -> Option<String> {
        self.0.upgrade().map(|inner| inner.tag.clone())
    }

    pub fn window_id(&self) -> Option<WindowId> {
        self.0.upgrade().and_then(|inner| inner.state.lock().window_id)
    }
}

impl std::fmt::Debug for DialogHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DialogHandle").field(&self.tag()).finish()
    }
}

/// The main window of an application.
///
/// Runs like a [`PopContainer`] but reports `APPINIT`, `APPPOSTINIT` and
/// `APPCLOSED` instead of the window events, and fires `APPEXIT` once the
/// window is gone.
pub struct Application {
    inner: Arc<DialogInner>,
}

impl Application {
    pub fn new(ctx: &AppContext, title: impl Into<String>, container: Container) -> Self {
        let tag = ctx.config().app_name.clone();
        Self {
            inner: DialogInner::new(ctx, tag, title.into(), container, APP_EVENTS),
        }
    }

    pub fn with_callback<F>(self, callback: F) -> Self
    where
        F: Fn(&Envelope) -> EventResult + Send + Sync + 'static,
    {
        *self.inner.callback.write() = Some(Arc::new(callback));
        self
    }

    /// Run the main window until it closes and return its result.
    pub fn run(&self) -> Result<String> {
        let result = self.inner.show()?;
        if self.inner.state.lock().window_id.is_some() {
            self.inner.fire(EventKind::AppExit);
        }
        Ok(result)
    }

    pub fn handle(&self) -> DialogHandle {
        DialogHandle(Arc::downgrade(&self.inner))
    }

    pub fn context(&self) -> &AppContext {
        &self.inner.ctx
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("tag", &self.inner.tag)
            .field("phase", &self.inner.phase())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::Control;

    fn form() -> Container {
        let form = Container::vbox("form");
        form.add_row([Control::button("ok", "Ok")]).unwrap();
        form
    }

    #[test]
    fn test_close_before_show_is_rejected() {
        let (ctx, _) = AppContext::headless();
        let dialog = PopContainer::new(&ctx, "ask", "Ask", form());
        assert!(matches!(
            dialog.close(),
            Err(Error::DialogState { action: "close", phase: "CREATED", .. })
        ));
    }

    #[test]
    fn test_starved_loop_tears_down() {
        let (ctx, toolkit) = AppContext::headless();
        let dialog = PopContainer::new(&ctx, "ask", "Ask", form());
        assert!(matches!(dialog.show(), Err(Error::EventLoopStarved(_))));
        assert_eq!(dialog.phase(), DialogPhase::TornDown);
        assert!(ctx.registry().is_empty());
        assert_eq!(toolkit.open_window_count(), 0);
        assert_eq!(ctx.modal().depth(), 0);
    }

    #[test]
    fn test_show_twice_is_rejected() {
        let (ctx, toolkit) = AppContext::headless();
        let dialog = PopContainer::new(&ctx, "ask", "Ask", form());
        toolkit.queue_close();
        assert_eq!(dialog.show().unwrap(), "");
        assert!(matches!(dialog.show(), Err(Error::DialogState { action: "show", .. })));
    }

    #[test]
    fn test_application_events() {
        let (ctx, toolkit) = AppContext::headless();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let app = Application::new(&ctx, "Main", form()).with_callback(move |env| {
            sink.lock().push(env.event());
            EventResult::Accept
        });
        toolkit.queue_close();
        app.run().unwrap();
        assert_eq!(
            *seen.lock(),
            vec![EventKind::AppInit, EventKind::AppPostInit, EventKind::AppClosed, EventKind::AppExit]
        );
    }
}
