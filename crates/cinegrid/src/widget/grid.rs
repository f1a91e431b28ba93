//! The grid control's cell model.
//!
//! Each cell keeps a record next to the native cell text: the current,
//! previous and original values, opaque user data, the inferred value kind,
//! and optionally a container embedded in the cell (an *overlay*).
//!
//! # Writes
//!
//! The first write to a cell sets its original value, which never changes
//! afterwards; every later write shifts the current value into the previous
//! one. [`Grid::read_and_commit`] is also a write when the native text was
//! edited since the last one: it re-parses the text as the kind the cell
//! already holds.
//!
//! # Overlays
//!
//! An overlay container is registered in the grid's scope under
//! `"{row}|{tag}"`, and every container nested in it is renamed the same
//! way, so two rows holding the same tree never share a scope. Inserting,
//! deleting or moving rows renumbers those tags so lookups by `(row, tag)`
//! keep working. The nesting is captured when the overlay is set.
//!
//! # Typing buffer
//!
//! Key presses in a cell accumulate in a buffer. Enter, Tab, or losing focus
//! flushes it as one `CLEAR_TYPING_BUFFER` event whose callback decides what
//! to commit. Without a callback the text is committed directly.

use cinegrid_core::logging::targets;
use cinegrid_core::{
    Error, EventKind, EventValue, GridCellChange, KeyInput, NativePayload, NativeSignal, Result, UserData, Value,
    ValueKind, overlay_tag, parse_overlay_tag,
};
use parking_lot::MutexGuard;

use super::{ColumnDef, Container, Widget, WidgetBody, event_value};

const PARKED: &str = "#pending";

struct OverlayScope {
    base: String,
    container: Container,
    // Index of the enclosing scope; `None` is the grid itself.
    parent: Option<usize>,
}

// Preorder: the cell's own container first, parents before children.
struct Overlay {
    scopes: Vec<OverlayScope>,
}

impl Overlay {
    fn new(container: Container) -> Self {
        let mut scopes = Vec::new();
        Self::collect(container, None, &mut scopes);
        Self { scopes }
    }

    fn collect(container: Container, parent: Option<usize>, scopes: &mut Vec<OverlayScope>) {
        let tag = container.tag();
        let base = parse_overlay_tag(&tag)
            .map(|(_, base)| base.to_string())
            .unwrap_or(tag);
        let index = scopes.len();
        let children = container.child_containers();
        scopes.push(OverlayScope { base, container, parent });
        for child in children {
            Self::collect(child, Some(index), scopes);
        }
    }

    fn container(&self) -> &Container {
        &self.scopes[0].container
    }

    // The scope a container is registered in, under its tag as of now.
    fn parent_tag(&self, scope: &OverlayScope, grid_tag: &str) -> String {
        scope
            .parent
            .and_then(|index| self.scopes.get(index))
            .map_or_else(|| grid_tag.to_string(), |parent| parent.container.tag())
    }
}

struct CellRecord {
    current: Option<Value>,
    previous: Option<Value>,
    original: Option<Value>,
    user_data: UserData,
    inferred: Option<ValueKind>,
    first_write: bool,
    overlay: Option<Overlay>,
    origin_row: usize,
}

impl CellRecord {
    fn new(origin_row: usize) -> Self {
        Self {
            current: None,
            previous: None,
            original: None,
            user_data: UserData::none(),
            inferred: None,
            first_write: true,
            overlay: None,
            origin_row,
        }
    }
}

struct TypingBuffer {
    row: usize,
    col: usize,
    text: String,
}

pub(crate) struct GridModel {
    columns: Vec<ColumnDef>,
    cells: Vec<Vec<CellRecord>>,
    typing: Option<TypingBuffer>,
    created_rows: usize,
}

impl GridModel {
    pub(crate) fn new(columns: Vec<ColumnDef>) -> Self {
        Self {
            columns,
            cells: Vec::new(),
            typing: None,
            created_rows: 0,
        }
    }

    fn out_of_range(&self, row: usize, col: usize) -> Error {
        Error::CellOutOfRange {
            row,
            col,
            rows: self.cells.len(),
            cols: self.columns.len(),
        }
    }

    fn cell(&self, row: usize, col: usize) -> Result<&CellRecord> {
        self.cells
            .get(row)
            .and_then(|cells| cells.get(col))
            .ok_or_else(|| self.out_of_range(row, col))
    }

    fn cell_mut(&mut self, row: usize, col: usize) -> Result<&mut CellRecord> {
        let err = self.out_of_range(row, col);
        self.cells.get_mut(row).and_then(|cells| cells.get_mut(col)).ok_or(err)
    }

    fn new_row(&mut self) -> Vec<CellRecord> {
        let origin = self.created_rows;
        self.created_rows += 1;
        (0..self.columns.len()).map(|_| CellRecord::new(origin)).collect()
    }

    fn overlays(&self) -> impl Iterator<Item = (usize, &Overlay)> {
        self.cells.iter().enumerate().flat_map(|(row, cells)| {
            cells
                .iter()
                .filter_map(move |cell| cell.overlay.as_ref().map(|overlay| (row, overlay)))
        })
    }
}

/// A grid control: rows of typed cells.
#[derive(Clone, Debug)]
pub struct Grid(pub(super) Widget);

impl Grid {
    fn model(&self) -> Result<MutexGuard<'_, GridModel>> {
        match self.0.body() {
            WidgetBody::Grid(model) => Ok(model.lock()),
            _ => Err(Error::WrongControlKind {
                tag: self.0.tag(),
                expected: "Grid",
                actual: self.0.kind(),
            }),
        }
    }

    /// The grid's widget.
    pub fn widget(&self) -> &Widget {
        &self.0
    }

    pub fn tag(&self) -> String {
        self.0.tag()
    }

    pub fn row_count(&self) -> Result<usize> {
        Ok(self.model()?.cells.len())
    }

    pub fn col_count(&self) -> Result<usize> {
        Ok(self.model()?.columns.len())
    }

    /// Index of the column tagged `tag`.
    pub fn colindex_get(&self, tag: &str) -> Result<usize> {
        self.model()?
            .columns
            .iter()
            .position(|column| column.tag == tag)
            .ok_or_else(|| Error::UnknownColumn {
                grid: self.tag(),
                column: tag.to_string(),
            })
    }

    /// Write a cell, appending rows until `row` exists.
    pub fn value_set(&self, row: usize, col: usize, value: impl Into<Value>, user_data: UserData) -> Result<()> {
        let value = value.into();
        let mut model = self.model()?;
        if col >= model.columns.len() {
            return Err(model.out_of_range(row, col));
        }
        while model.cells.len() <= row {
            self.append_row(&mut model)?;
        }
        self.write(&mut model, row, col, value, Some(user_data))
    }

    fn write(
        &self,
        model: &mut GridModel,
        row: usize,
        col: usize,
        value: Value,
        user_data: Option<UserData>,
    ) -> Result<()> {
        let record = model.cell_mut(row, col)?;
        if record.first_write {
            record.original = Some(value.clone());
            record.first_write = false;
        } else {
            record.previous = record.current.take();
        }
        record.inferred = Some(value.kind());
        if let Some(user_data) = user_data {
            record.user_data = user_data;
        }
        let text = value.display_text();
        record.current = Some(value);
        self.0
            .context()
            .toolkit()
            .grid_set_cell_text(self.0.native(), row, col, &text)?;
        tracing::trace!(target: targets::GRID, grid = %self.tag(), row, col, text = %text, "cell written");
        Ok(())
    }

    /// Read a cell, committing any in-place edit first.
    ///
    /// If the displayed text no longer matches the current value, it is
    /// parsed as the kind the cell already holds (a string if it holds
    /// nothing) and written as the new current value, shifting the old one
    /// into the previous value.
    pub fn read_and_commit(&self, row: usize, col: usize) -> Result<Value> {
        let mut model = self.model()?;
        model.cell(row, col)?;
        let text = self
            .0
            .context()
            .toolkit()
            .grid_cell_text(self.0.native(), row, col)?;
        let record = model.cell(row, col)?;
        if let Some(current) = &record.current
            && current.display_text() == text
        {
            return Ok(current.clone());
        }
        if record.current.is_none() && text.is_empty() {
            return Ok(Value::Str(text));
        }

        let kind = record.inferred.unwrap_or(ValueKind::Str);
        let value = Value::parse(kind, &text)?;
        tracing::debug!(target: targets::GRID, grid = %self.tag(), row, col, %kind, "committing edited cell text");
        self.write(&mut model, row, col, value.clone(), None)?;
        Ok(value)
    }

    /// The current value without reconciling against the displayed text.
    pub fn peek(&self, row: usize, col: usize) -> Result<Option<Value>> {
        Ok(self.model()?.cell(row, col)?.current.clone())
    }

    pub fn original_get(&self, row: usize, col: usize) -> Result<Option<Value>> {
        Ok(self.model()?.cell(row, col)?.original.clone())
    }

    pub fn previous_get(&self, row: usize, col: usize) -> Result<Option<Value>> {
        Ok(self.model()?.cell(row, col)?.previous.clone())
    }

    /// The kind of the last value written to the cell.
    pub fn kind_get(&self, row: usize, col: usize) -> Result<Option<ValueKind>> {
        Ok(self.model()?.cell(row, col)?.inferred)
    }

    /// The row a cell was created in, before any row moves.
    pub fn origin_row(&self, row: usize, col: usize) -> Result<usize> {
        Ok(self.model()?.cell(row, col)?.origin_row)
    }

    pub fn userdata_get(&self, row: usize, col: usize) -> Result<UserData> {
        Ok(self.model()?.cell(row, col)?.user_data.clone())
    }

    pub fn userdata_set(&self, row: usize, col: usize, user_data: UserData) -> Result<()> {
        self.model()?.cell_mut(row, col)?.user_data = user_data;
        Ok(())
    }

    pub fn tooltip_set(&self, row: usize, col: usize, tooltip: &str) -> Result<()> {
        self.model()?.cell(row, col)?;
        self.0
            .context()
            .toolkit()
            .grid_set_cell_tooltip(self.0.native(), row, col, tooltip)
    }

    pub fn checked_get(&self, row: usize, col: usize) -> Result<bool> {
        self.model()?.cell(row, col)?;
        self.0.context().toolkit().grid_cell_checked(self.0.native(), row, col)
    }

    pub fn checked_set(&self, row: usize, col: usize, checked: bool) -> Result<()> {
        self.model()?.cell(row, col)?;
        self.0
            .context()
            .toolkit()
            .grid_set_cell_checked(self.0.native(), row, col, checked)
    }

    /// Rows whose cell in `col` is checked.
    pub fn checked_rows(&self, col: usize) -> Result<Vec<usize>> {
        let rows = self.row_count()?;
        let mut checked = Vec::new();
        for row in 0..rows {
            if self.checked_get(row, col)? {
                checked.push(row);
            }
        }
        Ok(checked)
    }

    /// Check or uncheck `col` in every row.
    pub fn check_all(&self, col: usize, checked: bool) -> Result<()> {
        for row in 0..self.row_count()? {
            self.checked_set(row, col, checked)?;
        }
        Ok(())
    }

    fn append_row(&self, model: &mut GridModel) -> Result<usize> {
        let row = model.cells.len();
        self.0.context().toolkit().grid_insert_row(self.0.native(), row)?;
        let cells = model.new_row();
        model.cells.push(cells);
        Ok(row)
    }

    /// Append an empty row and return its index.
    pub fn row_append(&self) -> Result<usize> {
        let mut model = self.model()?;
        self.append_row(&mut model)
    }

    /// Insert an empty row before `row` (`row == row_count` appends).
    pub fn row_insert(&self, row: usize) -> Result<()> {
        let mut model = self.model()?;
        if row > model.cells.len() {
            return Err(model.out_of_range(row, 0));
        }
        self.0.context().toolkit().grid_insert_row(self.0.native(), row)?;
        let cells = model.new_row();
        model.cells.insert(row, cells);
        if let Some(buffer) = model.typing.as_mut()
            && buffer.row >= row
        {
            buffer.row += 1;
        }
        self.renumber_overlays(&model)
    }

    /// Delete a row with its records and overlays.
    pub fn row_delete(&self, row: usize) -> Result<()> {
        let mut model = self.model()?;
        if row >= model.cells.len() {
            return Err(model.out_of_range(row, 0));
        }
        let ctx = self.0.context();
        let grid_tag = self.tag();
        for overlay in model.cells[row].iter().filter_map(|cell| cell.overlay.as_ref()) {
            ctx.widget_delete(self.0.window_id(), &grid_tag, &overlay.container().tag());
            overlay.container().detach();
        }
        ctx.toolkit().grid_remove_row(self.0.native(), row)?;
        model.cells.remove(row);
        model.typing = match model.typing.take() {
            Some(buffer) if buffer.row == row => None,
            Some(mut buffer) if buffer.row > row => {
                buffer.row -= 1;
                Some(buffer)
            }
            other => other,
        };
        self.renumber_overlays(&model)
    }

    /// Swap a row with the one above it. Returns the row's new index.
    pub fn move_row_up(&self, row: usize) -> Result<usize> {
        if row == 0 {
            self.model()?.cell(row, 0)?;
            return Ok(0);
        }
        self.swap_rows(row - 1, row)?;
        Ok(row - 1)
    }

    /// Swap a row with the one below it. Returns the row's new index.
    pub fn move_row_down(&self, row: usize) -> Result<usize> {
        let rows = self.row_count()?;
        if row + 1 == rows {
            return Ok(row);
        }
        self.swap_rows(row, row + 1)?;
        Ok(row + 1)
    }

    fn swap_rows(&self, upper: usize, lower: usize) -> Result<()> {
        let mut model = self.model()?;
        if lower >= model.cells.len() {
            return Err(model.out_of_range(lower, 0));
        }
        self.0
            .context()
            .toolkit()
            .grid_move_row(self.0.native(), lower, upper)?;
        model.cells.swap(upper, lower);
        if let Some(buffer) = model.typing.as_mut() {
            if buffer.row == upper {
                buffer.row = lower;
            } else if buffer.row == lower {
                buffer.row = upper;
            }
        }
        self.renumber_overlays(&model)
    }

    // Two phases so a swap never retags onto a tag that is still in use.
    fn renumber_overlays(&self, model: &GridModel) -> Result<()> {
        let ctx = self.0.context();
        let window_id = self.0.window_id();
        let grid_tag = self.tag();

        // Parents go first, so a child's scope has already moved with them.
        let mut renumbered = 0;
        for (row, overlay) in model.overlays() {
            for scope in &overlay.scopes {
                let current = scope.container.tag();
                let expected = overlay_tag(row, &scope.base);
                if current != expected {
                    let parent = overlay.parent_tag(scope, &grid_tag);
                    ctx.registry()
                        .retag(window_id, &parent, &current, &format!("{expected}{PARKED}"))?;
                    renumbered += 1;
                }
            }
        }
        if renumbered == 0 {
            debug_assert!(self.overlays_consistent(model));
            return Ok(());
        }
        for (_, overlay) in model.overlays() {
            for scope in &overlay.scopes {
                let current = scope.container.tag();
                if let Some(expected) = current.strip_suffix(PARKED) {
                    let parent = overlay.parent_tag(scope, &grid_tag);
                    ctx.registry().retag(window_id, &parent, &current, expected)?;
                }
            }
        }
        tracing::trace!(target: targets::GRID, grid = %grid_tag, renumbered, "overlay tags renumbered");
        debug_assert!(self.overlays_consistent(model));
        Ok(())
    }

    fn overlays_consistent(&self, model: &GridModel) -> bool {
        let window_id = self.0.window_id();
        let grid_tag = self.tag();
        self.0.context().registry().with_read(|registry| {
            model.overlays().all(|(row, overlay)| {
                overlay.scopes.iter().all(|scope| {
                    let expected = overlay_tag(row, &scope.base);
                    scope.container.tag() == expected
                        && registry
                            .scope_entries(window_id, &overlay.parent_tag(scope, &grid_tag))
                            .is_some_and(|entries| {
                                entries.iter().any(|entry| !entry.sentinel && entry.tag == expected)
                            })
                })
            })
        })
    }

    /// Whether every overlay's tag names the row it currently sits in.
    pub fn overlay_tags_consistent(&self) -> bool {
        self.model()
            .map(|model| self.overlays_consistent(&model))
            .unwrap_or(false)
    }

    /// Embed a container in a cell.
    ///
    /// The container and every container nested in it are renamed to
    /// `"{row}|{tag}"`, then materialized in the grid's scope. A container
    /// already in the cell is deleted first.
    pub fn row_widget_set(&self, row: usize, col: usize, container: Container) -> Result<Widget> {
        let mut model = self.model()?;
        model.cell(row, col)?;
        let ctx = self.0.context().clone();
        let window_id = self.0.window_id();
        let grid_tag = self.tag();

        if let Some(old) = model.cell_mut(row, col)?.overlay.take() {
            ctx.widget_delete(window_id, &grid_tag, &old.container().tag());
            old.container().detach();
        }

        let overlay = Overlay::new(container);
        for scope in &overlay.scopes {
            scope.container.rename(&overlay_tag(row, &scope.base))?;
        }

        ctx.registry().open_scope(window_id, &grid_tag, &self.0.0)?;
        let widget = overlay.container().materialize(
            &ctx,
            window_id,
            self.0.native(),
            &grid_tag,
            self.0.0.callback.clone(),
        )?;
        ctx.toolkit()
            .grid_set_cell_widget(self.0.native(), row, col, Some(widget.native()))?;
        model.cell_mut(row, col)?.overlay = Some(overlay);
        Ok(widget)
    }

    /// The container embedded in a cell.
    pub fn row_container(&self, row: usize, col: usize) -> Result<Option<Container>> {
        Ok(self
            .model()?
            .cell(row, col)?
            .overlay
            .as_ref()
            .map(|overlay| overlay.container().clone()))
    }

    /// A widget inside the overlay container `container_tag` of `row`, or
    /// inside a container nested in it.
    pub fn row_widget_get(&self, row: usize, container_tag: &str, tag: &str) -> Result<Widget> {
        let scope = overlay_tag(row, container_tag);
        let window_id = self.0.window_id();
        let ctx = self.0.context();
        let exists = ctx
            .registry()
            .with_read(|registry| registry.scope_entries(window_id, &scope).is_some());
        if !exists {
            return Err(Error::not_found(window_id, scope, tag));
        }
        ctx.widget_get(window_id, &scope, tag)
    }

    /// Delete every row, record and overlay.
    pub fn clear(&self) -> Result<()> {
        let mut model = self.model()?;
        let ctx = self.0.context();
        let grid_tag = self.tag();
        for (_, overlay) in model.overlays() {
            ctx.widget_delete(self.0.window_id(), &grid_tag, &overlay.container().tag());
            overlay.container().detach();
        }
        for row in (0..model.cells.len()).rev() {
            ctx.toolkit().grid_remove_row(self.0.native(), row)?;
        }
        model.cells.clear();
        model.typing = None;
        Ok(())
    }

    /// Select the first cell of a row.
    pub fn select_row(&self, row: usize) -> Result<()> {
        self.model()?.cell(row, 0)?;
        self.0.context().toolkit().grid_select(self.0.native(), row, 0)
    }

    /// The selected cell, if any.
    pub fn selection(&self) -> Result<Option<(usize, usize)>> {
        self.0.context().toolkit().grid_selection(self.0.native())
    }

    /// Rows whose displayed text differs from their original values.
    pub fn changed_rows(&self) -> Result<Vec<usize>> {
        let model = self.model()?;
        let toolkit = self.0.context().toolkit();
        let mut changed = Vec::new();
        for (row, cells) in model.cells.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                let text = toolkit.grid_cell_text(self.0.native(), row, col)?;
                let original = cell.original.as_ref().map(Value::display_text).unwrap_or_default();
                if text != original {
                    changed.push(row);
                    break;
                }
            }
        }
        Ok(changed)
    }

    /// Whether any row was modified since it was first written.
    pub fn changed(&self) -> Result<bool> {
        Ok(!self.changed_rows()?.is_empty())
    }

    /// Text waiting in the typing buffer, with its cell.
    pub fn typing_buffer(&self) -> Result<Option<(usize, usize, String)>> {
        Ok(self
            .model()?
            .typing
            .as_ref()
            .map(|buffer| (buffer.row, buffer.col, buffer.text.clone())))
    }

    pub(super) fn on_signal(&self, signal: NativeSignal, event: EventKind, payload: NativePayload) -> Result<()> {
        match (signal, payload) {
            (NativeSignal::KeyPress, NativePayload::Key { row, col, key }) => self.on_key(row, col, key),
            (NativeSignal::FocusOut, payload) => {
                if self.0.context().config().flush_typing_on_focus_out {
                    self.flush_typing()?;
                }
                self.0.dispatch(event, signal.name(), event_value(payload));
                Ok(())
            }
            (NativeSignal::CellChanged, NativePayload::Cell { row, col, text }) => {
                let change = {
                    let model = self.model()?;
                    let record = model.cell(row, col)?;
                    GridCellChange {
                        row,
                        col,
                        old_text: record.current.as_ref().map(Value::display_text).unwrap_or_default(),
                        new_text: text,
                        prior_value: record.current.clone(),
                        user_data: record.user_data.clone(),
                    }
                };
                self.0.dispatch(event, signal.name(), EventValue::Cell(change));
                Ok(())
            }
            (_, payload) => {
                self.0.dispatch(event, signal.name(), event_value(payload));
                Ok(())
            }
        }
    }

    fn on_key(&self, row: usize, col: usize, key: KeyInput) -> Result<()> {
        if key.is_commit() {
            return self.flush_typing();
        }
        let moved = self
            .model()?
            .typing
            .as_ref()
            .is_some_and(|buffer| (buffer.row, buffer.col) != (row, col));
        if moved {
            self.flush_typing()?;
        }

        let mut model = self.model()?;
        model.cell(row, col)?;
        match key {
            KeyInput::Char(c) => model
                .typing
                .get_or_insert_with(|| TypingBuffer {
                    row,
                    col,
                    text: String::new(),
                })
                .text
                .push(c),
            KeyInput::Backspace => {
                if let Some(buffer) = model.typing.as_mut() {
                    buffer.text.pop();
                }
            }
            KeyInput::Escape => model.typing = None,
            KeyInput::Enter | KeyInput::Tab => {}
        }
        Ok(())
    }

    /// Flush the typing buffer as one `CLEAR_TYPING_BUFFER` event.
    ///
    /// The event value is a [`GridCellChange`] with the typed text. A grid
    /// without a callback commits the text itself.
    pub fn flush_typing(&self) -> Result<()> {
        let (buffer, change) = {
            let mut model = self.model()?;
            let Some(buffer) = model.typing.take() else {
                return Ok(());
            };
            let record = model.cell(buffer.row, buffer.col)?;
            let old_text = self
                .0
                .context()
                .toolkit()
                .grid_cell_text(self.0.native(), buffer.row, buffer.col)?;
            let change = GridCellChange {
                row: buffer.row,
                col: buffer.col,
                old_text,
                new_text: buffer.text.clone(),
                prior_value: record.current.clone(),
                user_data: record.user_data.clone(),
            };
            (buffer, change)
        };

        if self.0.0.callback.is_some() {
            let result = self.0.dispatch(
                EventKind::ClearTypingBuffer,
                EventKind::ClearTypingBuffer.name(),
                EventValue::Cell(change),
            );
            if result.is_reject() {
                tracing::debug!(target: targets::GRID, grid = %self.tag(), row = buffer.row, col = buffer.col, "typed text rejected");
            }
            return Ok(());
        }

        self.0
            .context()
            .toolkit()
            .grid_set_cell_text(self.0.native(), buffer.row, buffer.col, &buffer.text)?;
        self.read_and_commit(buffer.row, buffer.col).map(|_| ())
    }
}
