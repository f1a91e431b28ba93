//! Widgets: built controls, containers and grids.
//!
//! A [`Widget`] is the live counterpart of a [`Control`] or [`Container`]:
//! it owns one native handle, knows its identity key, and is registered in
//! its context's registry. The registry only holds weak references; the
//! container tree (or the dialog shell, for windows) holds the strong ones.
//!
//! Native signals reach a widget through slots connected from the static
//! capability table of its [`ControlKind`]. Each slot turns the signal into
//! an [`EventKind`] and dispatches it to the widget's callback.

mod container;
mod control;
mod grid;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use cinegrid_core::logging::targets;
use cinegrid_core::{
    ControlKind, Error, EventKind, EventResult, EventValue, NativeHandle, NativePayload, NativeSignal,
    RegistryEntry, Result, Value, ValueKind, WindowId,
};
use parking_lot::{Mutex, RwLock};

pub use container::{Child, Container, Layout, ValueChange, ValueRecord};
pub use control::{ColumnDef, Control, ControlBase, ControlVariant, GridSpec};
pub use grid::Grid;

pub(crate) use container::ContainerNode;
pub(crate) use grid::GridModel;

use crate::context::AppContext;
use crate::event::{Dispatcher, Envelope};

/// A user callback. Receives every event of the widgets it is attached to.
pub type Callback = Arc<dyn Fn(&Envelope) -> EventResult + Send + Sync>;

/// A value check attached to a control.
pub type Validator = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

pub(crate) enum WidgetBody {
    Leaf { validator: Option<Validator> },
    Container(Weak<ContainerNode>),
    Grid(Mutex<GridModel>),
    Window,
}

struct Identity {
    container_tag: String,
    tag: String,
}

/// Shared state of a built widget. Reach it through [`Widget`].
pub struct WidgetInner {
    ctx: AppContext,
    window_id: WindowId,
    identity: RwLock<Identity>,
    kind: ControlKind,
    native: NativeHandle,
    callback: Option<Callback>,
    body: WidgetBody,
    released: AtomicBool,
}

impl RegistryEntry for WidgetInner {
    fn owns_scope(&self) -> bool {
        matches!(self.kind, ControlKind::Container | ControlKind::Window | ControlKind::Grid)
    }

    fn is_leaf(&self) -> bool {
        !self.kind.is_container()
    }

    fn is_live(&self) -> bool {
        !self.released.load(Ordering::Acquire) && self.ctx.toolkit().is_valid(self.native)
    }

    fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(err) = self.ctx.toolkit().destroy(self.native) {
            tracing::warn!(target: targets::TOOLKIT, tag = %self.identity.read().tag, %err, "failed to destroy native widget");
        }
    }

    fn set_identity(&self, container_tag: &str, tag: &str) {
        {
            let mut identity = self.identity.write();
            identity.container_tag = container_tag.to_string();
            identity.tag = tag.to_string();
        }
        if let WidgetBody::Container(node) = &self.body
            && let Some(node) = node.upgrade()
        {
            node.set_tag(tag);
        }
    }
}

/// Handle to a built, registered widget.
#[derive(Clone)]
pub struct Widget(Arc<WidgetInner>);

impl Widget {
    pub(crate) fn from_inner(inner: Arc<WidgetInner>) -> Self {
        Self(inner)
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        ctx: &AppContext,
        window_id: WindowId,
        container_tag: &str,
        tag: &str,
        kind: ControlKind,
        native: NativeHandle,
        callback: Option<Callback>,
        body: WidgetBody,
    ) -> Self {
        Self(Arc::new(WidgetInner {
            ctx: ctx.clone(),
            window_id,
            identity: RwLock::new(Identity {
                container_tag: container_tag.to_string(),
                tag: tag.to_string(),
            }),
            kind,
            native,
            callback,
            body,
            released: AtomicBool::new(false),
        }))
    }

    /// Build the native widget for a control, register it under
    /// `(window_id, container_tag, control.tag())` and connect its signals.
    pub(crate) fn build(
        ctx: &AppContext,
        window_id: WindowId,
        container_tag: &str,
        parent: NativeHandle,
        control: &Control,
        callback: Option<Callback>,
    ) -> Result<Self> {
        let native = ctx.toolkit().create_widget(parent, &control.native_spec())?;
        let body = match &control.variant {
            ControlVariant::Grid(spec) => WidgetBody::Grid(Mutex::new(GridModel::new(spec.columns.clone()))),
            _ => WidgetBody::Leaf {
                validator: control.base.validator.clone(),
            },
        };
        let widget = Self::assemble(
            ctx,
            window_id,
            container_tag,
            control.tag(),
            control.kind(),
            native,
            callback,
            body,
        );
        widget.register(None)?;
        Ok(widget)
    }

    /// Build the native widget of a container, register it in its parent
    /// scope and open its own scope.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn build_container(
        ctx: &AppContext,
        window_id: WindowId,
        parent_scope: &str,
        parent: NativeHandle,
        node: &Arc<ContainerNode>,
        tag: &str,
        title: &str,
        callback: Option<Callback>,
    ) -> Result<Self> {
        let mut spec = crate::backend::NativeSpec::new(ControlKind::Container, tag);
        spec.text = title.to_string();
        let native = ctx.toolkit().create_widget(parent, &spec)?;
        let widget = Self::assemble(
            ctx,
            window_id,
            parent_scope,
            tag,
            ControlKind::Container,
            native,
            callback,
            WidgetBody::Container(Arc::downgrade(node)),
        );
        widget.register(Some(tag))?;
        Ok(widget)
    }

    /// Wrap a native window and open the scope its content registers under.
    pub(crate) fn window(ctx: &AppContext, window_id: WindowId, tag: &str, native: NativeHandle) -> Result<Self> {
        let widget = Self::assemble(ctx, window_id, tag, tag, ControlKind::Window, native, None, WidgetBody::Window);
        ctx.registry().open_scope(window_id, tag, &widget.0)?;
        Ok(widget)
    }

    fn register(&self, scope: Option<&str>) -> Result<()> {
        let ctx = &self.0.ctx;
        let (container_tag, tag) = self.identity();
        let registered = ctx
            .registry()
            .add(self.0.window_id, &container_tag, &tag, &self.0)
            .and_then(|()| match scope {
                Some(scope) => ctx.registry().open_scope(self.0.window_id, scope, &self.0),
                None => Ok(()),
            })
            .and_then(|()| self.wire());
        if let Err(err) = registered {
            ctx.registry().delete(self.0.window_id, &container_tag, &tag);
            self.0.release();
            return Err(err);
        }
        Ok(())
    }

    fn wire(&self) -> Result<()> {
        // Without a callback only grids have work to do on their own signals.
        if self.0.callback.is_none() && self.0.kind != ControlKind::Grid {
            return Ok(());
        }
        for (signal, event) in self.0.kind.capabilities() {
            let weak = Arc::downgrade(&self.0);
            self.0.ctx.toolkit().connect(
                self.0.native,
                signal,
                Arc::new(move |signal, payload| {
                    if let Some(inner) = weak.upgrade() {
                        Widget(inner).on_signal(signal, event, payload);
                    }
                }),
            )?;
        }
        Ok(())
    }

    fn on_signal(&self, signal: NativeSignal, event: EventKind, payload: NativePayload) {
        if self.0.released.load(Ordering::Acquire) {
            return;
        }
        if self.0.ctx.modal().is_blocked(self.0.window_id) {
            tracing::debug!(target: targets::DISPATCH, window_id = %self.0.window_id, tag = %self.tag(), %signal, "signal to blocked window ignored");
            return;
        }

        if let WidgetBody::Grid(_) = &self.0.body {
            if let Err(err) = Grid(self.clone()).on_signal(signal, event, payload) {
                tracing::warn!(target: targets::GRID, tag = %self.tag(), %signal, %err, "grid signal failed");
            }
            return;
        }

        let action = match (&payload, signal) {
            (NativePayload::Text(item), NativeSignal::Triggered) => item.clone(),
            _ => signal.name().to_string(),
        };
        let result = self.dispatch(event, &action, event_value(payload));
        if result.is_reject() {
            tracing::debug!(target: targets::DISPATCH, tag = %self.tag(), %event, "callback rejected event");
        }
    }

    /// Dispatch an event of this widget to its callback.
    ///
    /// Widgets without a callback accept every event.
    pub(crate) fn dispatch(&self, event: EventKind, action: &str, value: EventValue) -> EventResult {
        let Some(callback) = &self.0.callback else {
            return EventResult::Accept;
        };
        let (container_tag, tag) = self.identity();
        Dispatcher::new(&self.0.ctx).fire(callback, self.0.window_id, &container_tag, &tag, event, action, value)
    }

    /// `(container_tag, tag)` of this widget.
    pub fn identity(&self) -> (String, String) {
        let identity = self.0.identity.read();
        (identity.container_tag.clone(), identity.tag.clone())
    }

    pub fn tag(&self) -> String {
        self.0.identity.read().tag.clone()
    }

    pub fn container_tag(&self) -> String {
        self.0.identity.read().container_tag.clone()
    }

    pub fn window_id(&self) -> WindowId {
        self.0.window_id
    }

    pub fn kind(&self) -> ControlKind {
        self.0.kind
    }

    pub fn native(&self) -> NativeHandle {
        self.0.native
    }

    /// The context this widget belongs to.
    pub fn context(&self) -> &AppContext {
        &self.0.ctx
    }

    /// Whether the native widget still exists.
    pub fn is_live(&self) -> bool {
        self.0.is_live()
    }

    /// Whether two handles refer to the same widget.
    pub fn ptr_eq(&self, other: &Widget) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn body(&self) -> &WidgetBody {
        &self.0.body
    }

    /// Whether this kind of widget carries a value.
    pub fn has_value(&self) -> bool {
        !matches!(
            self.0.kind,
            ControlKind::Menu | ControlKind::Spacer | ControlKind::Container | ControlKind::Grid | ControlKind::Window
        )
    }

    fn wrong_kind(&self, expected: &'static str) -> Error {
        Error::WrongControlKind {
            tag: self.tag(),
            expected,
            actual: self.0.kind,
        }
    }

    fn mismatch(&self, value: &Value) -> Error {
        Error::ValueMismatch {
            control: self.0.kind,
            tag: self.tag(),
            kind: value.kind(),
        }
    }

    /// Read the control's value from its native state.
    ///
    /// Check boxes, radio buttons and switches yield `Bool`; date edits
    /// `Date`; sliders, spin boxes and progress bars `Int`; every text-bearing
    /// kind `Str`.
    pub fn value_get(&self) -> Result<Value> {
        let toolkit = self.0.ctx.toolkit();
        match self.0.kind {
            ControlKind::Checkbox | ControlKind::RadioButton | ControlKind::Switch => {
                Ok(Value::Bool(toolkit.checked(self.0.native)?))
            }
            ControlKind::DateEdit => Value::parse(ValueKind::Date, &toolkit.text(self.0.native)?),
            ControlKind::Slider | ControlKind::Spinbox | ControlKind::ProgressBar => {
                Value::parse(ValueKind::Int, &toolkit.text(self.0.native)?)
            }
            ControlKind::Button
            | ControlKind::ComboBox
            | ControlKind::Image
            | ControlKind::Label
            | ControlKind::LineEdit
            | ControlKind::TextEdit => Ok(Value::Str(toolkit.text(self.0.native)?)),
            ControlKind::Container | ControlKind::Grid | ControlKind::Menu | ControlKind::Spacer | ControlKind::Window => {
                Err(self.wrong_kind("value control"))
            }
        }
    }

    /// Write a value into the control's native state. Never emits events.
    pub fn value_set(&self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let toolkit = self.0.ctx.toolkit();
        let native = self.0.native;
        match (self.0.kind, &value) {
            (ControlKind::Checkbox | ControlKind::RadioButton | ControlKind::Switch, Value::Bool(checked)) => {
                toolkit.set_checked(native, *checked)
            }
            (ControlKind::DateEdit, Value::Date(_))
            | (ControlKind::Slider | ControlKind::Spinbox | ControlKind::ProgressBar, Value::Int(_))
            | (ControlKind::ComboBox, Value::Str(_)) => toolkit.set_text(native, &value.display_text()),
            (ControlKind::ComboBox, Value::Int(index)) => {
                let index = usize::try_from(*index).ok();
                toolkit.set_current_index(native, index)
            }
            (
                ControlKind::Button
                | ControlKind::Image
                | ControlKind::Label
                | ControlKind::LineEdit
                | ControlKind::TextEdit,
                _,
            ) => toolkit.set_text(native, &value.display_text()),
            (ControlKind::Container | ControlKind::Grid | ControlKind::Menu | ControlKind::Spacer | ControlKind::Window, _) => {
                Err(self.wrong_kind("value control"))
            }
            _ => Err(self.mismatch(&value)),
        }
    }

    /// Run the control's validator on its current value. Controls without a
    /// validator are always valid.
    pub fn validate(&self) -> Result<bool> {
        let value = self.value_get()?;
        Ok(match &self.0.body {
            WidgetBody::Leaf {
                validator: Some(validator),
            } => validator(&value),
            _ => true,
        })
    }

    pub fn set_visible(&self, visible: bool) -> Result<()> {
        self.0.ctx.toolkit().set_visible(self.0.native, visible)
    }

    pub fn is_visible(&self) -> Result<bool> {
        self.0.ctx.toolkit().is_visible(self.0.native)
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.0.ctx.toolkit().set_enabled(self.0.native, enabled)
    }

    pub fn set_focus(&self) -> Result<()> {
        self.0.ctx.toolkit().set_focus(self.0.native)
    }

    pub fn set_tooltip(&self, tooltip: &str) -> Result<()> {
        self.0.ctx.toolkit().set_tooltip(self.0.native, tooltip)
    }

    /// View this widget as a grid.
    pub fn as_grid(&self) -> Result<Grid> {
        match self.0.body {
            WidgetBody::Grid(_) => Ok(Grid(self.clone())),
            _ => Err(self.wrong_kind("Grid")),
        }
    }

    /// The container this widget was built from.
    pub fn as_container(&self) -> Result<Container> {
        match &self.0.body {
            WidgetBody::Container(node) => node
                .upgrade()
                .map(Container::from_node)
                .ok_or_else(|| Error::NotMaterialized(self.tag())),
            _ => Err(self.wrong_kind("Container")),
        }
    }
}

impl fmt::Debug for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (container_tag, tag) = self.identity();
        f.debug_struct("Widget")
            .field("window_id", &self.0.window_id)
            .field("container_tag", &container_tag)
            .field("tag", &tag)
            .field("kind", &self.0.kind)
            .finish()
    }
}

fn event_value(payload: NativePayload) -> EventValue {
    match payload {
        NativePayload::None | NativePayload::Key { .. } => EventValue::None,
        NativePayload::Text(text) | NativePayload::Cell { text, .. } => EventValue::Text(text),
        NativePayload::Bool(checked) => EventValue::Bool(checked),
        NativePayload::Int(value) => EventValue::Value(Value::Int(value)),
        NativePayload::Index(index) => {
            EventValue::Index(index.and_then(|i| i64::try_from(i).ok()).unwrap_or(-1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Toolkit as _;
    use chrono::NaiveDate;

    fn built(control: Control) -> (AppContext, Widget) {
        let (ctx, toolkit) = AppContext::headless();
        let w = ctx.next_window_id().unwrap();
        let window = toolkit.create_window("Test", "test").unwrap();
        let widget = Widget::build(&ctx, w, "form", window, &control, None).unwrap();
        (ctx, widget)
    }

    #[test]
    fn test_build_registers_widget() {
        let (ctx, widget) = built(Control::line_edit("name", "clip"));
        let found = ctx.widget_get(widget.window_id(), "form", "name").unwrap();
        assert!(found.ptr_eq(&widget));
        assert_eq!(widget.value_get().unwrap(), Value::from("clip"));
    }

    #[test]
    fn test_value_kinds_follow_control_kind() {
        let (_ctx, check) = built(Control::checkbox("agree", "Agree", false));
        check.value_set(true).unwrap();
        assert_eq!(check.value_get().unwrap(), Value::Bool(true));
        assert!(matches!(check.value_set("yes"), Err(Error::ValueMismatch { .. })));

        let (_ctx, date) = built(Control::date_edit("when", None));
        let day = NaiveDate::from_ymd_opt(2022, 8, 1).unwrap();
        date.value_set(day).unwrap();
        assert_eq!(date.value_get().unwrap(), Value::Date(day));

        let (_ctx, spin) = built(Control::spinbox("count", 0, 10));
        spin.value_set(7).unwrap();
        assert_eq!(spin.value_get().unwrap(), Value::Int(7));
    }

    #[test]
    fn test_combo_box_by_index_and_text() {
        let (_ctx, combo) = built(Control::combo_box("format", ["PAL", "NTSC"]));
        assert_eq!(combo.value_get().unwrap(), Value::from("PAL"));
        combo.value_set(1).unwrap();
        assert_eq!(combo.value_get().unwrap(), Value::from("NTSC"));
        combo.value_set("PAL").unwrap();
        assert_eq!(combo.value_get().unwrap(), Value::from("PAL"));
    }

    #[test]
    fn test_valueless_kinds_refuse_values() {
        let (_ctx, spacer) = built(Control::spacer("gap"));
        assert!(!spacer.has_value());
        assert!(matches!(spacer.value_get(), Err(Error::WrongControlKind { .. })));
        assert!(spacer.as_grid().is_err());
        assert!(spacer.as_container().is_err());
    }

    #[test]
    fn test_validator() {
        let (_ctx, name) = built(Control::line_edit("name", "").with_validator(|v| {
            v.as_str().is_some_and(|s| !s.trim().is_empty())
        }));
        assert!(!name.validate().unwrap());
        name.value_set("clip").unwrap();
        assert!(name.validate().unwrap());
    }

    #[test]
    fn test_release_destroys_native_once() {
        let (ctx, widget) = built(Control::button("ok", "Ok"));
        assert!(widget.is_live());
        assert_eq!(ctx.widget_delete(widget.window_id(), "form", "ok"), 1);
        assert!(!widget.is_live());
        assert!(matches!(widget.value_get(), Err(Error::StaleHandle(_))));
    }
}
