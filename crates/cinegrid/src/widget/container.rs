//! Container composition.
//!
//! A [`Container`] owns a 2-D arrangement of children: rows of controls and
//! nested containers. Logical row 0 is reserved for an optional menu, which
//! attaches to the window chrome instead of the layout flow; user rows start
//! after it and are addressed from 0 by [`Container::add_row_at`].
//!
//! Containers are plain data until [`materialize`](Container::materialize)d
//! into a window. Materialization registers the container under its parent
//! scope, opens its own scope and builds every child. Rows added afterwards
//! are built immediately.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use cinegrid_core::logging::targets;
use cinegrid_core::{ControlKind, Error, EventResult, NativeHandle, Result, Value, WindowId, validate_tag};
use parking_lot::{Mutex, RwLock};

use super::{Callback, Control, Widget};
use crate::context::AppContext;
use crate::event::Envelope;

/// How a container arranges its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// One child per line, top to bottom.
    #[default]
    Vertical,
    /// All children on one line.
    Horizontal,
    /// Rows and columns; short rows are padded.
    Grid,
    /// Label/field pairs; short rows are padded.
    Form,
}

impl Layout {
    fn pads_rows(self) -> bool {
        matches!(self, Self::Grid | Self::Form)
    }
}

/// A child handed to [`Container::add_row`].
#[derive(Clone)]
pub enum Child {
    Control(Control),
    Container(Container),
}

impl From<Control> for Child {
    fn from(control: Control) -> Self {
        Self::Control(control)
    }
}

impl From<Container> for Child {
    fn from(container: Container) -> Self {
        Self::Container(container)
    }
}

enum Node {
    Leaf { control: Control, widget: Option<Widget> },
    Branch(Container),
}

impl Node {
    fn tag(&self) -> String {
        match self {
            Self::Leaf { control, .. } => control.tag().to_string(),
            Self::Branch(container) => container.tag(),
        }
    }

    fn is_menu(&self) -> bool {
        matches!(self, Self::Leaf { control, .. } if control.kind() == ControlKind::Menu)
    }

    fn is_pad(&self) -> bool {
        matches!(self, Self::Leaf { control, .. }
            if control.kind() == ControlKind::Spacer && control.tag().starts_with(PAD_PREFIX))
    }
}

const PAD_PREFIX: &str = "_pad";

fn nodes<I>(children: I) -> Vec<Node>
where
    I: IntoIterator,
    I::Item: Into<Child>,
{
    children
        .into_iter()
        .map(|child| {
            let child: Child = child.into();
            match child {
                Child::Control(control) => Node::Leaf { control, widget: None },
                Child::Container(container) => Node::Branch(container),
            }
        })
        .collect()
}

#[derive(Default)]
struct Rows {
    // Logical row 0.
    menu: Option<Node>,
    rows: Vec<Vec<Node>>,
}

impl Rows {
    fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.menu.iter().chain(self.rows.iter().flatten())
    }

    fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.menu.iter_mut().chain(self.rows.iter_mut().flatten())
    }
}

#[derive(Clone)]
struct Materialized {
    ctx: AppContext,
    window_id: WindowId,
    native: NativeHandle,
    widget: Widget,
    callback: Option<Callback>,
}

#[derive(Clone, Copy)]
enum Placement {
    Append,
    At(usize),
    Extend,
}

/// One value read from a control by [`Container::gather_values`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValueRecord {
    pub container_tag: String,
    pub tag: String,
    pub value: Value,
    /// What the control's validator said about the value.
    pub valid: bool,
}

/// A difference reported by [`Container::snapshot_diff`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValueChange {
    pub container_tag: String,
    pub tag: String,
    /// Value in the snapshot; `None` if the control did not exist then.
    pub before: Option<Value>,
    /// Current value; `None` if the control no longer exists.
    pub after: Option<Value>,
}

pub(crate) struct ContainerNode {
    tag: RwLock<String>,
    layout: Layout,
    title: RwLock<String>,
    callback: RwLock<Option<Callback>>,
    rows: Mutex<Rows>,
    state: Mutex<Option<Materialized>>,
    baseline: Mutex<Vec<ValueRecord>>,
    pads: AtomicUsize,
}

impl ContainerNode {
    pub(crate) fn set_tag(&self, tag: &str) {
        *self.tag.write() = tag.to_string();
    }
}

/// A composable node of controls and nested containers.
///
/// Cloning shares the node.
#[derive(Clone)]
pub struct Container(Arc<ContainerNode>);

impl Container {
    /// An empty container.
    pub fn new(tag: impl Into<String>, layout: Layout) -> Self {
        Self(Arc::new(ContainerNode {
            tag: RwLock::new(tag.into()),
            layout,
            title: RwLock::new(String::new()),
            callback: RwLock::new(None),
            rows: Mutex::new(Rows::default()),
            state: Mutex::new(None),
            baseline: Mutex::new(Vec::new()),
            pads: AtomicUsize::new(0),
        }))
    }

    pub fn vbox(tag: impl Into<String>) -> Self {
        Self::new(tag, Layout::Vertical)
    }

    pub fn hbox(tag: impl Into<String>) -> Self {
        Self::new(tag, Layout::Horizontal)
    }

    pub fn form(tag: impl Into<String>) -> Self {
        Self::new(tag, Layout::Form)
    }

    pub(crate) fn from_node(node: Arc<ContainerNode>) -> Self {
        Self(node)
    }

    /// Give the container a visible title (a group box caption).
    pub fn with_title(self, title: impl Into<String>) -> Self {
        *self.0.title.write() = title.into();
        self
    }

    /// Route events of children without their own callback to `callback`.
    pub fn with_callback<F>(self, callback: F) -> Self
    where
        F: Fn(&Envelope) -> EventResult + Send + Sync + 'static,
    {
        *self.0.callback.write() = Some(Arc::new(callback));
        self
    }

    pub fn tag(&self) -> String {
        self.0.tag.read().clone()
    }

    pub fn layout(&self) -> Layout {
        self.0.layout
    }

    pub fn title(&self) -> String {
        self.0.title.read().clone()
    }

    /// Rename a container that has not been materialized yet.
    pub(crate) fn rename(&self, tag: &str) -> Result<()> {
        validate_tag(tag)?;
        if self.is_materialized() {
            return Err(Error::TagInUse {
                container_tag: self.tag(),
                tag: tag.to_string(),
            });
        }
        self.0.set_tag(tag);
        Ok(())
    }

    /// Append one row.
    pub fn add_row<I>(&self, children: I) -> Result<&Self>
    where
        I: IntoIterator,
        I::Item: Into<Child>,
    {
        self.place(Placement::Append, nodes(children))?;
        Ok(self)
    }

    /// Replace user row `row`, or append if `row` is past the last row.
    ///
    /// When the container is materialized the replaced children are deleted
    /// from the registry before their replacements are built.
    pub fn add_row_at<I>(&self, row: usize, children: I) -> Result<&Self>
    where
        I: IntoIterator,
        I::Item: Into<Child>,
    {
        self.place(Placement::At(row), nodes(children))?;
        Ok(self)
    }

    /// Append one child to the last row, starting a row if there is none.
    pub fn add_control(&self, child: impl Into<Child>) -> Result<&Self> {
        self.place(Placement::Extend, nodes([child]))?;
        Ok(self)
    }

    fn place(&self, placement: Placement, mut nodes: Vec<Node>) -> Result<()> {
        let container_tag = self.tag();
        if nodes.is_empty() {
            return Ok(());
        }
        for node in &nodes {
            validate_tag(&node.tag())?;
        }
        if let Some(menu) = nodes.iter().find(|node| node.is_menu())
            && (nodes.len() > 1 || matches!(placement, Placement::Extend))
        {
            return Err(Error::MenuPlacement(menu.tag()));
        }
        let is_menu = nodes[0].is_menu();

        let removed = {
            let mut rows = self.0.rows.lock();
            let replaced_row = match placement {
                Placement::At(row) if !is_menu && row < rows.rows.len() => Some(row),
                _ => None,
            };

            // Tags stay unique within the container, ignoring what is being
            // replaced.
            let mut taken: Vec<String> = Vec::new();
            if let Some(menu) = &rows.menu
                && !is_menu
            {
                taken.push(menu.tag());
            }
            for (index, row) in rows.rows.iter().enumerate() {
                if Some(index) != replaced_row {
                    taken.extend(row.iter().map(Node::tag));
                }
            }
            for node in &nodes {
                let tag = node.tag();
                if taken.contains(&tag) {
                    return Err(Error::DuplicateTag {
                        container_tag: container_tag.clone(),
                        tag,
                    });
                }
                taken.push(tag);
            }

            if is_menu {
                rows.menu.replace(nodes.remove(0)).into_iter().collect()
            } else {
                match (placement, replaced_row) {
                    (_, Some(row)) => std::mem::replace(&mut rows.rows[row], nodes),
                    (Placement::Extend, None) if !rows.rows.is_empty() => {
                        if let Some(last) = rows.rows.last_mut() {
                            last.extend(nodes);
                        }
                        Vec::new()
                    }
                    _ => {
                        rows.rows.push(nodes);
                        Vec::new()
                    }
                }
            }
        };

        let state = self.state();
        let pad = state.as_ref().is_none_or(|state| state.ctx.config().pad_grid_rows);
        let trimmed = self.pad_rows(pad);
        let Some(state) = state else {
            return Ok(());
        };
        for node in removed.iter().chain(&trimmed) {
            Self::unregister(&state, &container_tag, node);
        }
        self.build_children(&state)
    }

    fn unregister(state: &Materialized, container_tag: &str, node: &Node) {
        let tag = node.tag();
        let count = state.ctx.widget_delete(state.window_id, container_tag, &tag);
        if let Node::Branch(child) = node {
            child.detach();
        }
        tracing::debug!(target: targets::CONTAINER, container_tag, tag = %tag, count, "replaced child removed");
    }

    // Fill short rows with spacers up to the widest row. Pads no longer
    // needed are handed back so a live container can unregister them.
    fn pad_rows(&self, enabled: bool) -> Vec<Node> {
        if !self.0.layout.pads_rows() {
            return Vec::new();
        }
        let mut rows = self.0.rows.lock();
        let width = if enabled {
            rows.rows
                .iter()
                .map(|row| row.iter().filter(|node| !node.is_pad()).count())
                .max()
                .unwrap_or(0)
        } else {
            0
        };
        let mut trimmed = Vec::new();
        for row in rows.rows.iter_mut() {
            let (pads, kept): (Vec<Node>, Vec<Node>) = std::mem::take(row).into_iter().partition(Node::is_pad);
            *row = kept;
            let mut pads = pads.into_iter();
            while row.len() < width {
                let pad = pads.next().unwrap_or_else(|| {
                    let n = self.0.pads.fetch_add(1, Ordering::Relaxed);
                    Node::Leaf {
                        control: Control::spacer(format!("{PAD_PREFIX}{n}")),
                        widget: None,
                    }
                });
                row.push(pad);
            }
            trimmed.extend(pads);
        }
        trimmed
    }

    /// Build the native widgets of this container and everything in it, and
    /// register them under `parent_scope` in `window_id`.
    ///
    /// Materializing twice builds only children added since.
    pub fn materialize(
        &self,
        ctx: &AppContext,
        window_id: WindowId,
        parent: NativeHandle,
        parent_scope: &str,
        inherited: Option<Callback>,
    ) -> Result<Widget> {
        let state = match self.state() {
            Some(state) => state,
            None => {
                let tag = self.tag();
                let callback = self.0.callback.read().clone().or(inherited);
                let widget = Widget::build_container(
                    ctx,
                    window_id,
                    parent_scope,
                    parent,
                    &self.0,
                    &tag,
                    &self.title(),
                    callback.clone(),
                )?;
                let state = Materialized {
                    ctx: ctx.clone(),
                    window_id,
                    native: widget.native(),
                    widget,
                    callback,
                };
                *self.0.state.lock() = Some(state.clone());
                tracing::debug!(target: targets::CONTAINER, %window_id, parent_scope, tag = %tag, "materialized container");
                state
            }
        };
        let tag = self.tag();
        for node in &self.pad_rows(state.ctx.config().pad_grid_rows) {
            Self::unregister(&state, &tag, node);
        }
        self.build_children(&state)?;
        Ok(state.widget)
    }

    fn build_children(&self, state: &Materialized) -> Result<()> {
        let tag = self.tag();
        // Deleting the last child drops the scope; adding one brings it back.
        state.ctx.registry().open_scope(state.window_id, &tag, &state.widget.0)?;
        let menu_parent = state.ctx.window_native(state.window_id).unwrap_or(state.native);
        let mut rows = self.0.rows.lock();
        for node in rows.nodes_mut() {
            match node {
                Node::Leaf { control, widget } if widget.is_none() => {
                    let parent = if control.kind() == ControlKind::Menu {
                        menu_parent
                    } else {
                        state.native
                    };
                    let callback = control.base.callback.clone().or_else(|| state.callback.clone());
                    *widget = Some(Widget::build(&state.ctx, state.window_id, &tag, parent, control, callback)?);
                }
                Node::Leaf { .. } => {}
                Node::Branch(child) => {
                    child.materialize(&state.ctx, state.window_id, state.native, &tag, state.callback.clone())?;
                }
            }
        }
        Ok(())
    }

    fn state(&self) -> Option<Materialized> {
        self.0.state.lock().clone()
    }

    pub fn is_materialized(&self) -> bool {
        self.0.state.lock().is_some()
    }

    /// The container's own widget, once materialized.
    pub fn as_widget(&self) -> Option<Widget> {
        self.0.state.lock().as_ref().map(|state| state.widget.clone())
    }

    pub fn window_id(&self) -> Option<WindowId> {
        self.0.state.lock().as_ref().map(|state| state.window_id)
    }

    /// Number of user rows (the menu row not counted).
    pub fn row_count(&self) -> usize {
        self.0.rows.lock().rows.len()
    }

    /// Width of the widest row.
    pub fn column_count(&self) -> usize {
        self.0.rows.lock().rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Tags of one user row, left to right.
    pub fn row_tags(&self, row: usize) -> Vec<String> {
        self.0
            .rows
            .lock()
            .rows
            .get(row)
            .map(|nodes| nodes.iter().map(Node::tag).collect())
            .unwrap_or_default()
    }

    pub fn has_menu(&self) -> bool {
        self.0.rows.lock().menu.is_some()
    }

    /// A built child by tag, searching nested containers too.
    pub fn widget(&self, tag: &str) -> Option<Widget> {
        let rows = self.0.rows.lock();
        for node in rows.nodes() {
            match node {
                Node::Leaf { control, widget } if control.tag() == tag => return widget.clone(),
                Node::Branch(child) if child.tag() == tag => return child.as_widget(),
                _ => {}
            }
        }
        rows.nodes().find_map(|node| match node {
            Node::Branch(child) => child.widget(tag),
            Node::Leaf { .. } => None,
        })
    }

    /// Hide and unregister every descendant control, keeping the rows.
    ///
    /// Nested containers stay registered; their controls are cleared. A
    /// later [`materialize`](Container::materialize) rebuilds the controls.
    pub fn clear_all_widgets(&self) -> Result<()> {
        let Some(state) = self.state() else {
            return Ok(());
        };
        let container_tag = self.tag();
        let mut rows = self.0.rows.lock();
        for node in rows.nodes_mut() {
            match node {
                Node::Leaf { control, widget } => {
                    let Some(built) = widget.take() else {
                        continue;
                    };
                    if built.is_live() {
                        built.set_visible(false)?;
                    } else {
                        tracing::debug!(target: targets::CONTAINER, tag = control.tag(), "native widget already gone");
                    }
                    state.ctx.widget_delete(state.window_id, &container_tag, control.tag());
                }
                Node::Branch(child) => child.clear_all_widgets()?,
            }
        }
        Ok(())
    }

    /// Read every registered descendant control that carries a value, in
    /// row order, depth first.
    pub fn gather_values(&self) -> Result<Vec<ValueRecord>> {
        let mut records = Vec::new();
        self.gather_into(&mut records)?;
        Ok(records)
    }

    fn gather_into(&self, records: &mut Vec<ValueRecord>) -> Result<()> {
        let state = self.state().ok_or_else(|| Error::NotMaterialized(self.tag()))?;
        let container_tag = self.tag();
        let rows = self.0.rows.lock();
        for node in rows.nodes() {
            match node {
                Node::Leaf {
                    control,
                    widget: Some(widget),
                } if widget.has_value() && state.ctx.widget_exists(state.window_id, &container_tag, control.tag()) => {
                    records.push(ValueRecord {
                        container_tag: container_tag.clone(),
                        tag: control.tag().to_string(),
                        value: widget.value_get()?,
                        valid: widget.validate()?,
                    });
                }
                Node::Branch(child) if child.is_materialized() => child.gather_into(records)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Record the current values as the baseline for
    /// [`snapshot_diff`](Container::snapshot_diff).
    pub fn snapshot(&self) -> Result<Vec<ValueRecord>> {
        let records = self.gather_values()?;
        *self.0.baseline.lock() = records.clone();
        Ok(records)
    }

    /// Whether any value differs from the last snapshot.
    pub fn snapshot_changed(&self) -> Result<bool> {
        Ok(!self.snapshot_diff()?.is_empty())
    }

    /// Values that differ from the last snapshot.
    pub fn snapshot_diff(&self) -> Result<Vec<ValueChange>> {
        let current = self.gather_values()?;
        let baseline = self.0.baseline.lock().clone();
        let same_key = |a: &ValueRecord, b: &ValueRecord| a.container_tag == b.container_tag && a.tag == b.tag;

        let mut changes: Vec<ValueChange> = current
            .iter()
            .filter_map(|now| {
                let before = baseline.iter().find(|then| same_key(then, now));
                match before {
                    Some(then) if then.value == now.value => None,
                    _ => Some(ValueChange {
                        container_tag: now.container_tag.clone(),
                        tag: now.tag.clone(),
                        before: before.map(|then| then.value.clone()),
                        after: Some(now.value.clone()),
                    }),
                }
            })
            .collect();
        changes.extend(
            baseline
                .iter()
                .filter(|then| !current.iter().any(|now| same_key(then, now)))
                .map(|then| ValueChange {
                    container_tag: then.container_tag.clone(),
                    tag: then.tag.clone(),
                    before: Some(then.value.clone()),
                    after: None,
                }),
        );
        Ok(changes)
    }

    /// Containers directly inside this one, menu row first.
    pub(crate) fn child_containers(&self) -> Vec<Container> {
        self.0
            .rows
            .lock()
            .nodes()
            .filter_map(|node| match node {
                Node::Branch(child) => Some(child.clone()),
                Node::Leaf { .. } => None,
            })
            .collect()
    }

    /// Forget every native widget after the registry entries are gone, so
    /// the container can be materialized again.
    pub(crate) fn detach(&self) {
        let mut rows = self.0.rows.lock();
        for node in rows.nodes_mut() {
            match node {
                Node::Leaf { widget, .. } => *widget = None,
                Node::Branch(child) => child.detach(),
            }
        }
        *self.0.state.lock() = None;
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("tag", &self.tag())
            .field("layout", &self.0.layout)
            .field("rows", &self.row_count())
            .field("materialized", &self.is_materialized())
            .finish()
    }
}
