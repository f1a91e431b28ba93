//! In-memory toolkit.
//!
//! `HeadlessToolkit` keeps native widget state in a slot map and replaces the
//! user with a script: tests queue clicks, edits, key presses and window close
//! requests, and each call to [`Toolkit::process_events`] delivers the next
//! one. Scripted input always targets the most recently opened window that is
//! still alive, which is the window a modal loop is waiting on.

use std::collections::VecDeque;

use cinegrid_core::logging::targets;
use cinegrid_core::{ControlKind, Error, KeyInput, NativeHandle, NativePayload, NativeSignal, Result};
use parking_lot::Mutex;
use slotmap::SlotMap;

use super::{LoopStatus, NativeSlot, NativeSpec, Toolkit};

#[derive(Default, Clone)]
struct NativeCell {
    text: String,
    checked: bool,
    tooltip: String,
    widget: Option<NativeHandle>,
}

struct NativeWidget {
    kind: ControlKind,
    tag: String,
    parent: Option<NativeHandle>,
    window: Option<NativeHandle>,
    visible: bool,
    enabled: bool,
    text: String,
    tooltip: String,
    checked: bool,
    items: Vec<String>,
    current_index: Option<usize>,
    columns: usize,
    rows: Vec<Vec<NativeCell>>,
    selection: Option<(usize, usize)>,
    slots: Vec<(NativeSignal, NativeSlot)>,
}

impl NativeWidget {
    fn new(kind: ControlKind, tag: &str) -> Self {
        Self {
            kind,
            tag: tag.to_string(),
            parent: None,
            window: None,
            visible: false,
            enabled: true,
            text: String::new(),
            tooltip: String::new(),
            checked: false,
            items: Vec::new(),
            current_index: None,
            columns: 0,
            rows: Vec::new(),
            selection: None,
            slots: Vec::new(),
        }
    }

    fn cell(&self, row: usize, col: usize) -> Result<&NativeCell> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .ok_or(Error::CellOutOfRange {
                row,
                col,
                rows: self.rows.len(),
                cols: self.columns,
            })
    }

    fn cell_mut(&mut self, row: usize, col: usize) -> Result<&mut NativeCell> {
        let (rows, cols) = (self.rows.len(), self.columns);
        self.rows
            .get_mut(row)
            .and_then(|cells| cells.get_mut(col))
            .ok_or(Error::CellOutOfRange { row, col, rows, cols })
    }

    fn slots_for(&self, signal: NativeSignal) -> Vec<NativeSlot> {
        self.slots
            .iter()
            .filter(|(connected, _)| *connected == signal)
            .map(|(_, slot)| NativeSlot::clone(slot))
            .collect()
    }
}

enum Scripted {
    Click(String),
    Close,
    Emit {
        tag: String,
        signal: NativeSignal,
        payload: NativePayload,
    },
    Call(Box<dyn FnOnce() + Send>),
}

#[derive(Default)]
struct HeadlessState {
    widgets: SlotMap<NativeHandle, NativeWidget>,
    windows: Vec<NativeHandle>,
    queue: VecDeque<Scripted>,
    opened: Vec<String>,
}

impl HeadlessState {
    fn get(&self, handle: NativeHandle) -> Result<&NativeWidget> {
        self.widgets.get(handle).ok_or(Error::StaleHandle(handle))
    }

    fn get_mut(&mut self, handle: NativeHandle) -> Result<&mut NativeWidget> {
        self.widgets.get_mut(handle).ok_or(Error::StaleHandle(handle))
    }

    fn active_window(&self) -> Option<NativeHandle> {
        self.windows.last().copied()
    }

    fn find_in_active(&self, tag: &str) -> Result<NativeHandle> {
        let window = self
            .active_window()
            .ok_or_else(|| Error::toolkit(format!("no open window to deliver input for '{tag}'")))?;
        self.widgets
            .iter()
            .find(|(_, widget)| widget.window == Some(window) && widget.tag == tag)
            .map(|(handle, _)| handle)
            .ok_or_else(|| Error::toolkit(format!("no widget tagged '{tag}' in the active window")))
    }
}

/// A [`Toolkit`] with no display, driven by a scripted event queue.
#[derive(Default)]
pub struct HeadlessToolkit {
    state: Mutex<HeadlessState>,
}

impl HeadlessToolkit {
    /// Create a toolkit with no windows and an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a click on the widget tagged `tag` in the active window.
    /// Checkable widgets also toggle.
    pub fn queue_click(&self, tag: impl Into<String>) {
        self.state.lock().queue.push_back(Scripted::Click(tag.into()));
    }

    /// Queue a close request (the title bar close button) for the active window.
    pub fn queue_close(&self) {
        self.state.lock().queue.push_back(Scripted::Close);
    }

    /// Queue an arbitrary signal. The payload is applied to the widget's
    /// native state before slots run.
    pub fn queue_emit(&self, tag: impl Into<String>, signal: NativeSignal, payload: NativePayload) {
        self.state.lock().queue.push_back(Scripted::Emit {
            tag: tag.into(),
            signal,
            payload,
        });
    }

    /// Queue an in-place edit of a grid cell.
    pub fn queue_cell_edit(&self, tag: impl Into<String>, row: usize, col: usize, text: impl Into<String>) {
        self.queue_emit(
            tag,
            NativeSignal::CellChanged,
            NativePayload::Cell {
                row,
                col,
                text: text.into(),
            },
        );
    }

    /// Queue typing `text` into a grid cell, one key press per character,
    /// followed by Enter.
    pub fn queue_keys(&self, tag: impl Into<String>, row: usize, col: usize, text: &str) {
        let tag = tag.into();
        let keys = text.chars().map(KeyInput::Char).chain([KeyInput::Enter]);
        for key in keys {
            self.queue_emit(tag.clone(), NativeSignal::KeyPress, NativePayload::Key { row, col, key });
        }
    }

    /// Queue a closure to run when its turn comes, with no toolkit lock held.
    pub fn queue_call<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.state.lock().queue.push_back(Scripted::Call(Box::new(f)));
    }

    /// Number of scripted events not yet delivered.
    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Titles of every window created so far, in creation order.
    pub fn opened_windows(&self) -> Vec<String> {
        self.state.lock().opened.clone()
    }

    /// Number of windows currently alive.
    pub fn open_window_count(&self) -> usize {
        self.state.lock().windows.len()
    }

    /// Number of native widgets (windows included) currently alive.
    pub fn widget_count(&self) -> usize {
        self.state.lock().widgets.len()
    }

    /// Find a live widget by tag in the active window.
    pub fn find(&self, tag: &str) -> Option<NativeHandle> {
        self.state.lock().find_in_active(tag).ok()
    }

    fn deliver(&self, handle: NativeHandle, signals: &[NativeSignal], payload: NativePayload) -> Result<()> {
        let slots: Vec<(NativeSignal, Vec<NativeSlot>)> = {
            let state = self.state.lock();
            let widget = state.get(handle)?;
            if !widget.enabled {
                tracing::debug!(target: targets::TOOLKIT, tag = %widget.tag, "input to disabled widget dropped");
                return Ok(());
            }
            signals
                .iter()
                .map(|signal| (*signal, widget.slots_for(*signal)))
                .collect()
        };
        for (signal, receivers) in slots {
            for slot in receivers {
                slot(signal, payload.clone());
            }
        }
        Ok(())
    }

    fn apply_payload(&self, handle: NativeHandle, payload: &NativePayload) -> Result<()> {
        let mut state = self.state.lock();
        let widget = state.get_mut(handle)?;
        match payload {
            NativePayload::Text(text) => widget.text = text.clone(),
            NativePayload::Bool(checked) => widget.checked = *checked,
            NativePayload::Int(value) => widget.text = value.to_string(),
            NativePayload::Index(index) => {
                widget.current_index = *index;
                widget.text = index
                    .and_then(|i| widget.items.get(i).cloned())
                    .unwrap_or_default();
            }
            NativePayload::Cell { row, col, text } => widget.cell_mut(*row, *col)?.text = text.clone(),
            NativePayload::Key { row, col, .. } => widget.selection = Some((*row, *col)),
            NativePayload::None => {}
        }
        Ok(())
    }

    fn click(&self, tag: &str) -> Result<()> {
        let (handle, checkable, checked) = {
            let mut state = self.state.lock();
            let handle = state.find_in_active(tag)?;
            let widget = state.get_mut(handle)?;
            let checkable = matches!(
                widget.kind,
                ControlKind::Checkbox | ControlKind::RadioButton | ControlKind::Switch
            );
            if checkable && widget.enabled {
                widget.checked = !widget.checked;
            }
            (handle, checkable, widget.checked)
        };
        if checkable {
            self.deliver(handle, &[NativeSignal::Clicked], NativePayload::None)?;
            self.deliver(handle, &[NativeSignal::Toggled], NativePayload::Bool(checked))
        } else {
            self.deliver(handle, &[NativeSignal::Clicked], NativePayload::None)
        }
    }
}

impl Toolkit for HeadlessToolkit {
    fn create_window(&self, title: &str, tag: &str) -> Result<NativeHandle> {
        let mut state = self.state.lock();
        let mut window = NativeWidget::new(ControlKind::Window, tag);
        window.text = title.to_string();
        let handle = state.widgets.insert(window);
        if let Some(widget) = state.widgets.get_mut(handle) {
            widget.window = Some(handle);
        }
        state.windows.push(handle);
        state.opened.push(title.to_string());
        tracing::trace!(target: targets::TOOLKIT, title, tag, "created window");
        Ok(handle)
    }

    fn create_widget(&self, parent: NativeHandle, spec: &NativeSpec) -> Result<NativeHandle> {
        let mut state = self.state.lock();
        let window = state.get(parent)?.window;
        let mut widget = NativeWidget::new(spec.kind, &spec.tag);
        widget.parent = Some(parent);
        widget.window = window;
        widget.visible = true;
        widget.enabled = spec.enabled;
        widget.text = spec.text.clone();
        widget.tooltip = spec.tooltip.clone();
        widget.checked = spec.checked;
        widget.items = spec.items.clone();
        widget.columns = spec.columns.len();
        if spec.kind == ControlKind::ComboBox && !widget.items.is_empty() {
            widget.current_index = Some(0);
            widget.text = widget.items[0].clone();
        }
        Ok(state.widgets.insert(widget))
    }

    fn destroy(&self, handle: NativeHandle) -> Result<()> {
        let mut state = self.state.lock();
        if !state.widgets.contains_key(handle) {
            tracing::trace!(target: targets::TOOLKIT, ?handle, "destroy of dead handle ignored");
            return Ok(());
        }
        // Collect the handle and every native descendant.
        let mut doomed = vec![handle];
        let mut i = 0;
        while i < doomed.len() {
            let current = doomed[i];
            doomed.extend(
                state
                    .widgets
                    .iter()
                    .filter(|(_, widget)| widget.parent == Some(current))
                    .map(|(child, _)| child),
            );
            i += 1;
        }
        for dead in &doomed {
            state.widgets.remove(*dead);
        }
        state.windows.retain(|window| !doomed.contains(window));
        Ok(())
    }

    fn is_valid(&self, handle: NativeHandle) -> bool {
        self.state.lock().widgets.contains_key(handle)
    }

    fn set_visible(&self, handle: NativeHandle, visible: bool) -> Result<()> {
        self.state.lock().get_mut(handle)?.visible = visible;
        Ok(())
    }

    fn is_visible(&self, handle: NativeHandle) -> Result<bool> {
        Ok(self.state.lock().get(handle)?.visible)
    }

    fn set_enabled(&self, handle: NativeHandle, enabled: bool) -> Result<()> {
        self.state.lock().get_mut(handle)?.enabled = enabled;
        Ok(())
    }

    fn set_focus(&self, handle: NativeHandle) -> Result<()> {
        self.state.lock().get(handle).map(|_| ())
    }

    fn set_tooltip(&self, handle: NativeHandle, tooltip: &str) -> Result<()> {
        self.state.lock().get_mut(handle)?.tooltip = tooltip.to_string();
        Ok(())
    }

    fn text(&self, handle: NativeHandle) -> Result<String> {
        Ok(self.state.lock().get(handle)?.text.clone())
    }

    fn set_text(&self, handle: NativeHandle, text: &str) -> Result<()> {
        let mut state = self.state.lock();
        let widget = state.get_mut(handle)?;
        if widget.kind == ControlKind::ComboBox {
            widget.current_index = widget.items.iter().position(|item| item == text);
        }
        widget.text = text.to_string();
        Ok(())
    }

    fn checked(&self, handle: NativeHandle) -> Result<bool> {
        Ok(self.state.lock().get(handle)?.checked)
    }

    fn set_checked(&self, handle: NativeHandle, checked: bool) -> Result<()> {
        self.state.lock().get_mut(handle)?.checked = checked;
        Ok(())
    }

    fn current_index(&self, handle: NativeHandle) -> Result<Option<usize>> {
        Ok(self.state.lock().get(handle)?.current_index)
    }

    fn set_current_index(&self, handle: NativeHandle, index: Option<usize>) -> Result<()> {
        self.apply_payload(handle, &NativePayload::Index(index))
    }

    fn connect(&self, handle: NativeHandle, signal: NativeSignal, slot: NativeSlot) -> Result<()> {
        self.state.lock().get_mut(handle)?.slots.push((signal, slot));
        Ok(())
    }

    fn grid_insert_row(&self, handle: NativeHandle, row: usize) -> Result<()> {
        let mut state = self.state.lock();
        let widget = state.get_mut(handle)?;
        let row = row.min(widget.rows.len());
        let cells = vec![NativeCell::default(); widget.columns];
        widget.rows.insert(row, cells);
        Ok(())
    }

    fn grid_remove_row(&self, handle: NativeHandle, row: usize) -> Result<()> {
        let mut state = self.state.lock();
        let widget = state.get_mut(handle)?;
        widget.cell(row, 0)?;
        widget.rows.remove(row);
        if widget.selection.is_some_and(|(selected, _)| selected >= widget.rows.len()) {
            widget.selection = None;
        }
        Ok(())
    }

    fn grid_move_row(&self, handle: NativeHandle, from: usize, to: usize) -> Result<()> {
        let mut state = self.state.lock();
        let widget = state.get_mut(handle)?;
        widget.cell(from, 0)?;
        widget.cell(to, 0)?;
        let cells = widget.rows.remove(from);
        widget.rows.insert(to, cells);
        Ok(())
    }

    fn grid_row_count(&self, handle: NativeHandle) -> Result<usize> {
        Ok(self.state.lock().get(handle)?.rows.len())
    }

    fn grid_cell_text(&self, handle: NativeHandle, row: usize, col: usize) -> Result<String> {
        Ok(self.state.lock().get(handle)?.cell(row, col)?.text.clone())
    }

    fn grid_set_cell_text(&self, handle: NativeHandle, row: usize, col: usize, text: &str) -> Result<()> {
        self.state.lock().get_mut(handle)?.cell_mut(row, col)?.text = text.to_string();
        Ok(())
    }

    fn grid_cell_checked(&self, handle: NativeHandle, row: usize, col: usize) -> Result<bool> {
        Ok(self.state.lock().get(handle)?.cell(row, col)?.checked)
    }

    fn grid_set_cell_checked(&self, handle: NativeHandle, row: usize, col: usize, checked: bool) -> Result<()> {
        self.state.lock().get_mut(handle)?.cell_mut(row, col)?.checked = checked;
        Ok(())
    }

    fn grid_set_cell_tooltip(&self, handle: NativeHandle, row: usize, col: usize, tooltip: &str) -> Result<()> {
        self.state.lock().get_mut(handle)?.cell_mut(row, col)?.tooltip = tooltip.to_string();
        Ok(())
    }

    fn grid_set_cell_widget(
        &self,
        handle: NativeHandle,
        row: usize,
        col: usize,
        widget: Option<NativeHandle>,
    ) -> Result<()> {
        self.state.lock().get_mut(handle)?.cell_mut(row, col)?.widget = widget;
        Ok(())
    }

    fn grid_select(&self, handle: NativeHandle, row: usize, col: usize) -> Result<()> {
        let mut state = self.state.lock();
        let widget = state.get_mut(handle)?;
        widget.cell(row, col)?;
        widget.selection = Some((row, col));
        Ok(())
    }

    fn grid_selection(&self, handle: NativeHandle) -> Result<Option<(usize, usize)>> {
        Ok(self.state.lock().get(handle)?.selection)
    }

    fn process_events(&self) -> Result<LoopStatus> {
        let Some(next) = self.state.lock().queue.pop_front() else {
            return Ok(LoopStatus::Idle);
        };

        match next {
            Scripted::Click(tag) => self.click(&tag)?,
            Scripted::Close => {
                let window = self
                    .state
                    .lock()
                    .active_window()
                    .ok_or_else(|| Error::toolkit("no open window to close"))?;
                self.deliver(window, &[NativeSignal::CloseRequested], NativePayload::None)?;
            }
            Scripted::Emit { tag, signal, payload } => {
                let handle = self.state.lock().find_in_active(&tag)?;
                self.apply_payload(handle, &payload)?;
                self.deliver(handle, &[signal], payload)?;
            }
            Scripted::Call(f) => f(),
        }
        Ok(LoopStatus::Processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;
    use std::sync::Arc;

    fn button(toolkit: &HeadlessToolkit, window: NativeHandle, tag: &str) -> NativeHandle {
        toolkit
            .create_widget(window, &NativeSpec::new(ControlKind::Button, tag))
            .unwrap()
    }

    #[test]
    fn test_scripted_click_reaches_slot() {
        let toolkit = HeadlessToolkit::new();
        let window = toolkit.create_window("Main", "main").unwrap();
        let ok = button(&toolkit, window, "ok");

        let seen = Arc::new(PlMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        toolkit
            .connect(
                ok,
                NativeSignal::Clicked,
                Arc::new(move |signal, _| sink.lock().push(signal)),
            )
            .unwrap();

        toolkit.queue_click("ok");
        assert_eq!(toolkit.process_events().unwrap(), LoopStatus::Processed);
        assert_eq!(toolkit.process_events().unwrap(), LoopStatus::Idle);
        assert_eq!(*seen.lock(), vec![NativeSignal::Clicked]);
    }

    #[test]
    fn test_input_targets_newest_window() {
        let toolkit = HeadlessToolkit::new();
        let first = toolkit.create_window("First", "first").unwrap();
        let second = toolkit.create_window("Second", "second").unwrap();
        let a = button(&toolkit, first, "ok");
        let b = button(&toolkit, second, "ok");

        assert_eq!(toolkit.find("ok"), Some(b));
        toolkit.destroy(second).unwrap();
        assert_eq!(toolkit.find("ok"), Some(a));
        assert!(!toolkit.is_valid(b));
    }

    #[test]
    fn test_destroy_takes_children() {
        let toolkit = HeadlessToolkit::new();
        let window = toolkit.create_window("Main", "main").unwrap();
        let panel = toolkit
            .create_widget(window, &NativeSpec::new(ControlKind::Container, "panel"))
            .unwrap();
        let ok = button(&toolkit, panel, "ok");

        toolkit.destroy(window).unwrap();
        assert!(!toolkit.is_valid(panel));
        assert!(!toolkit.is_valid(ok));
        assert_eq!(toolkit.widget_count(), 0);
        assert!(toolkit.destroy(window).is_ok());
        assert!(matches!(toolkit.text(ok), Err(Error::StaleHandle(_))));
    }

    #[test]
    fn test_cell_edit_updates_text_before_slots() {
        let toolkit = Arc::new(HeadlessToolkit::new());
        let window = toolkit.create_window("Main", "main").unwrap();
        let mut spec = NativeSpec::new(ControlKind::Grid, "files");
        spec.columns = vec!["Name".into()];
        let grid = toolkit.create_widget(window, &spec).unwrap();
        toolkit.grid_insert_row(grid, 0).unwrap();

        let seen = Arc::new(PlMutex::new(String::new()));
        let sink = Arc::clone(&seen);
        let tk = Arc::clone(&toolkit);
        toolkit
            .connect(
                grid,
                NativeSignal::CellChanged,
                Arc::new(move |_, _| *sink.lock() = tk.grid_cell_text(grid, 0, 0).unwrap()),
            )
            .unwrap();

        toolkit.queue_cell_edit("files", 0, 0, "clip.mp4");
        toolkit.process_events().unwrap();
        assert_eq!(*seen.lock(), "clip.mp4");
    }

    #[test]
    fn test_checkbox_click_toggles() {
        let toolkit = HeadlessToolkit::new();
        let window = toolkit.create_window("Main", "main").unwrap();
        let check = toolkit
            .create_widget(window, &NativeSpec::new(ControlKind::Checkbox, "agree"))
            .unwrap();
        toolkit.queue_click("agree");
        toolkit.process_events().unwrap();
        assert!(toolkit.checked(check).unwrap());
    }

    #[test]
    fn test_unknown_tag_is_an_error() {
        let toolkit = HeadlessToolkit::new();
        toolkit.create_window("Main", "main").unwrap();
        toolkit.queue_click("missing");
        assert!(matches!(toolkit.process_events(), Err(Error::Toolkit(_))));
    }
}
