//! The native toolkit seam.
//!
//! Everything cinegrid knows about real windows and widgets goes through the
//! [`Toolkit`] trait: creating and destroying native resources, reading and
//! writing their state, connecting signals, and driving the native event loop
//! one event at a time. [`HeadlessToolkit`] implements it in memory.

mod headless;

use std::sync::Arc;

use cinegrid_core::{ControlKind, NativeHandle, NativePayload, NativeSignal, Result};

pub use headless::HeadlessToolkit;

/// Receiver for one native signal.
pub type NativeSlot = Arc<dyn Fn(NativeSignal, NativePayload) + Send + Sync>;

/// Outcome of one pass through the native event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStatus {
    /// One event was delivered.
    Processed,
    /// Nothing was pending.
    Idle,
}

/// Construction parameters for one native widget.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeSpec {
    /// Kind of native widget to build.
    pub kind: ControlKind,
    /// Object name given to the native widget.
    pub tag: String,
    /// Label, initial text or title.
    pub text: String,
    /// Hover text.
    pub tooltip: String,
    /// Whether the widget starts enabled.
    pub enabled: bool,
    /// Initial check state for checkable widgets.
    pub checked: bool,
    /// Whether the user may edit the widget's text.
    pub editable: bool,
    /// Items of a combo box or menu.
    pub items: Vec<String>,
    /// Column headers of a grid.
    pub columns: Vec<String>,
    /// Value range of sliders, spin boxes and progress bars.
    pub range: Option<(i64, i64)>,
}

impl NativeSpec {
    /// A spec with defaults for everything but kind and tag.
    pub fn new(kind: ControlKind, tag: impl Into<String>) -> Self {
        Self {
            kind,
            tag: tag.into(),
            text: String::new(),
            tooltip: String::new(),
            enabled: true,
            checked: false,
            editable: true,
            items: Vec::new(),
            columns: Vec::new(),
            range: None,
        }
    }
}

/// Primitives cinegrid needs from a native widget toolkit.
///
/// Setters never emit signals: only user input (or a scripted stand-in for
/// it) delivered through [`Toolkit::process_events`] reaches connected slots.
/// Operations on a destroyed handle fail with `Error::StaleHandle`.
pub trait Toolkit: Send + Sync {
    /// Create a hidden top-level window.
    fn create_window(&self, title: &str, tag: &str) -> Result<NativeHandle>;

    /// Create a child widget.
    fn create_widget(&self, parent: NativeHandle, spec: &NativeSpec) -> Result<NativeHandle>;

    /// Destroy a window or widget together with its native children.
    /// Destroying an already destroyed handle is not an error.
    fn destroy(&self, handle: NativeHandle) -> Result<()>;

    /// Whether the handle still refers to a native resource.
    fn is_valid(&self, handle: NativeHandle) -> bool;

    fn set_visible(&self, handle: NativeHandle, visible: bool) -> Result<()>;
    fn is_visible(&self, handle: NativeHandle) -> Result<bool>;
    fn set_enabled(&self, handle: NativeHandle, enabled: bool) -> Result<()>;
    fn set_focus(&self, handle: NativeHandle) -> Result<()>;
    fn set_tooltip(&self, handle: NativeHandle, tooltip: &str) -> Result<()>;

    fn text(&self, handle: NativeHandle) -> Result<String>;
    fn set_text(&self, handle: NativeHandle, text: &str) -> Result<()>;
    fn checked(&self, handle: NativeHandle) -> Result<bool>;
    fn set_checked(&self, handle: NativeHandle, checked: bool) -> Result<()>;
    fn current_index(&self, handle: NativeHandle) -> Result<Option<usize>>;
    fn set_current_index(&self, handle: NativeHandle, index: Option<usize>) -> Result<()>;

    /// Route a native signal of `handle` to `slot`.
    fn connect(&self, handle: NativeHandle, signal: NativeSignal, slot: NativeSlot) -> Result<()>;

    fn grid_insert_row(&self, handle: NativeHandle, row: usize) -> Result<()>;
    fn grid_remove_row(&self, handle: NativeHandle, row: usize) -> Result<()>;
    /// Move a row so that it ends up at index `to`.
    fn grid_move_row(&self, handle: NativeHandle, from: usize, to: usize) -> Result<()>;
    fn grid_row_count(&self, handle: NativeHandle) -> Result<usize>;
    fn grid_cell_text(&self, handle: NativeHandle, row: usize, col: usize) -> Result<String>;
    fn grid_set_cell_text(&self, handle: NativeHandle, row: usize, col: usize, text: &str) -> Result<()>;
    fn grid_cell_checked(&self, handle: NativeHandle, row: usize, col: usize) -> Result<bool>;
    fn grid_set_cell_checked(&self, handle: NativeHandle, row: usize, col: usize, checked: bool) -> Result<()>;
    fn grid_set_cell_tooltip(&self, handle: NativeHandle, row: usize, col: usize, tooltip: &str) -> Result<()>;
    /// Embed a widget in a cell, or clear the cell's widget with `None`.
    fn grid_set_cell_widget(
        &self,
        handle: NativeHandle,
        row: usize,
        col: usize,
        widget: Option<NativeHandle>,
    ) -> Result<()>;
    fn grid_select(&self, handle: NativeHandle, row: usize, col: usize) -> Result<()>;
    fn grid_selection(&self, handle: NativeHandle) -> Result<Option<(usize, usize)>>;

    /// Deliver at most one pending native event.
    fn process_events(&self) -> Result<LoopStatus>;
}
