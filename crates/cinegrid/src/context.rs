//! The application context.
//!
//! An [`AppContext`] owns everything that would otherwise be process-wide
//! state: the widget registry, the native toolkit, the configuration, window
//! id allocation and the modal stack. Two contexts never share widgets, so
//! tests can run several applications side by side.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use cinegrid_core::logging::TreeStyle;
use cinegrid_core::{Error, NativeHandle, RegistryDump, Result, SharedWidgetRegistry, WindowId};
use parking_lot::Mutex;

use crate::backend::{HeadlessToolkit, Toolkit};
use crate::config::GuiConfig;
use crate::dialog::{DialogHandle, DialogInner};
use crate::modal::ModalStack;
use crate::widget::{Widget, WidgetInner};

struct WindowRecord {
    native: NativeHandle,
    title: String,
    dialog: Weak<DialogInner>,
}

struct ContextInner {
    registry: SharedWidgetRegistry<WidgetInner>,
    toolkit: Arc<dyn Toolkit>,
    config: GuiConfig,
    next_window: AtomicU32,
    windows: Mutex<HashMap<WindowId, WindowRecord>>,
    modal: ModalStack,
}

/// Shared handle to one application's widget state.
///
/// Cloning is cheap and every clone refers to the same application.
#[derive(Clone)]
pub struct AppContext {
    inner: Arc<ContextInner>,
}

impl AppContext {
    /// Create a context on top of a toolkit.
    pub fn new(toolkit: Arc<dyn Toolkit>, config: GuiConfig) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                registry: SharedWidgetRegistry::new(),
                toolkit,
                config,
                next_window: AtomicU32::new(1),
                windows: Mutex::new(HashMap::new()),
                modal: ModalStack::new(),
            }),
        }
    }

    /// Create a context on a fresh [`HeadlessToolkit`] with default
    /// configuration. The toolkit is returned too so the caller can script it.
    pub fn headless() -> (Self, Arc<HeadlessToolkit>) {
        Self::headless_with_config(GuiConfig::default())
    }

    /// Like [`AppContext::headless`], with a configuration.
    pub fn headless_with_config(config: GuiConfig) -> (Self, Arc<HeadlessToolkit>) {
        let toolkit = Arc::new(HeadlessToolkit::new());
        let ctx = Self::new(toolkit.clone(), config);
        (ctx, toolkit)
    }

    /// The widget registry.
    pub fn registry(&self) -> &SharedWidgetRegistry<WidgetInner> {
        &self.inner.registry
    }

    /// The native toolkit.
    pub fn toolkit(&self) -> &Arc<dyn Toolkit> {
        &self.inner.toolkit
    }

    /// The configuration.
    pub fn config(&self) -> &GuiConfig {
        &self.inner.config
    }

    /// The modal window stack.
    pub fn modal(&self) -> &ModalStack {
        &self.inner.modal
    }

    /// Look a widget up with the registry's three-tier search.
    pub fn widget_get(&self, window_id: WindowId, container_tag: &str, tag: &str) -> Result<Widget> {
        self.inner.registry.get(window_id, container_tag, tag).map(Widget::from_inner)
    }

    /// Whether a widget is registered.
    pub fn widget_exists(&self, window_id: WindowId, container_tag: &str, tag: &str) -> bool {
        self.inner.registry.exists(window_id, container_tag, tag)
    }

    /// Delete a widget (recursively for containers), or a whole scope with
    /// `tag == "-"`. Returns the number of widgets removed.
    pub fn widget_delete(&self, window_id: WindowId, container_tag: &str, tag: &str) -> usize {
        self.inner.registry.delete(window_id, container_tag, tag)
    }

    /// Allocate the id of a new window.
    pub fn next_window_id(&self) -> Result<WindowId> {
        let raw = self.inner.next_window.fetch_add(1, Ordering::Relaxed);
        WindowId::new(raw).ok_or_else(|| Error::toolkit("window ids exhausted"))
    }

    pub(crate) fn register_window(
        &self,
        window_id: WindowId,
        native: NativeHandle,
        title: &str,
        dialog: Weak<DialogInner>,
    ) {
        self.inner.windows.lock().insert(
            window_id,
            WindowRecord {
                native,
                title: title.to_string(),
                dialog,
            },
        );
    }

    pub(crate) fn unregister_window(&self, window_id: WindowId) {
        self.inner.windows.lock().remove(&window_id);
    }

    /// The native handle of an open window.
    pub fn window_native(&self, window_id: WindowId) -> Option<NativeHandle> {
        self.inner.windows.lock().get(&window_id).map(|record| record.native)
    }

    /// The title of an open window.
    pub fn window_title(&self, window_id: WindowId) -> Option<String> {
        self.inner.windows.lock().get(&window_id).map(|record| record.title.clone())
    }

    /// Ids of every open window, oldest first.
    pub fn open_windows(&self) -> Vec<WindowId> {
        let mut ids: Vec<WindowId> = self.inner.windows.lock().keys().copied().collect();
        ids.sort();
        ids
    }

    /// The dialog shell that owns a window.
    pub fn dialog(&self, window_id: WindowId) -> Option<DialogHandle> {
        self.inner
            .windows
            .lock()
            .get(&window_id)
            .map(|record| DialogHandle::new(Weak::clone(&record.dialog)))
    }

    /// Render the registry of one window for debugging.
    pub fn dump(&self, window_id: WindowId) -> String {
        self.inner
            .registry
            .with_read(|registry| RegistryDump::new(window_id).style(TreeStyle::Ascii).format(registry))
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("widgets", &self.inner.registry.len())
            .field("windows", &self.inner.windows.lock().len())
            .field("modal_depth", &self.inner.modal.depth())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_ids_are_unique_per_context() {
        let (a, _) = AppContext::headless();
        let (b, _) = AppContext::headless();
        let first = a.next_window_id().unwrap();
        assert_ne!(first, a.next_window_id().unwrap());
        // Separate contexts count independently.
        assert_eq!(b.next_window_id().unwrap(), first);
    }

    #[test]
    fn test_unknown_widget_is_an_error() {
        let (ctx, _) = AppContext::headless();
        let w = ctx.next_window_id().unwrap();
        assert!(!ctx.widget_exists(w, "form", "ok"));
        assert!(matches!(
            ctx.widget_get(w, "form", "ok"),
            Err(Error::WidgetNotFound { .. })
        ));
        assert!(ctx.dialog(w).is_none());
        assert_eq!(ctx.widget_delete(w, "form", "-"), 0);
    }
}
