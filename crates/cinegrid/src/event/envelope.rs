use cinegrid_core::{ControlKind, EventKind, EventValue, Result, Value, WindowId};

use crate::context::AppContext;
use crate::dialog::DialogHandle;
use crate::widget::Widget;

/// Everything a callback learns about one dispatched event.
///
/// An envelope is built fresh for every dispatch and never changes after.
/// Besides describing the event it gives the callback access to the rest
/// of the window: sibling widgets, any registered widget by key, and the
/// dialog shell that owns the window.
#[derive(Clone)]
pub struct Envelope {
    pub(crate) ctx: AppContext,
    pub(crate) window_id: WindowId,
    pub(crate) container_tag: String,
    pub(crate) tag: String,
    pub(crate) event: EventKind,
    pub(crate) action: String,
    pub(crate) value: EventValue,
    pub(crate) object: Option<Widget>,
    pub(crate) widgets: Vec<(String, Widget)>,
    pub(crate) parent: Option<Widget>,
    pub(crate) control_kind: Option<ControlKind>,
}

impl Envelope {
    pub fn window_id(&self) -> WindowId {
        self.window_id
    }

    pub fn container_tag(&self) -> &str {
        &self.container_tag
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn event(&self) -> EventKind {
        self.event
    }

    /// The native signal name, or the chosen item for menus.
    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn value(&self) -> &EventValue {
        &self.value
    }

    /// The widget the event came from.
    pub fn object(&self) -> Option<&Widget> {
        self.object.as_ref()
    }

    /// The members of the source widget's container, as they were when the
    /// event was dispatched.
    pub fn widgets(&self) -> &[(String, Widget)] {
        &self.widgets
    }

    /// The container (or window) the source widget belongs to.
    pub fn parent(&self) -> Option<&Widget> {
        self.parent.as_ref()
    }

    pub fn control_kind(&self) -> Option<ControlKind> {
        self.control_kind
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// Look up any widget of this window.
    pub fn widget_get(&self, container_tag: &str, tag: &str) -> Result<Widget> {
        self.ctx.widget_get(self.window_id, container_tag, tag)
    }

    pub fn widget_exists(&self, container_tag: &str, tag: &str) -> bool {
        self.ctx.widget_exists(self.window_id, container_tag, tag)
    }

    /// Read the value of any control of this window.
    pub fn value_get(&self, container_tag: &str, tag: &str) -> Result<Value> {
        self.widget_get(container_tag, tag)?.value_get()
    }

    /// Write the value of any control of this window.
    pub fn value_set(&self, container_tag: &str, tag: &str, value: impl Into<Value>) -> Result<()> {
        self.widget_get(container_tag, tag)?.value_set(value)
    }

    /// A member of the source widget's container, by tag.
    pub fn sibling(&self, tag: &str) -> Option<&Widget> {
        self.widgets
            .iter()
            .find(|(member, _)| member == tag)
            .map(|(_, widget)| widget)
    }

    /// The dialog shell that owns this window.
    pub fn dialog(&self) -> Option<DialogHandle> {
        self.ctx.dialog(self.window_id)
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("window_id", &self.window_id)
            .field("container_tag", &self.container_tag)
            .field("tag", &self.tag)
            .field("event", &self.event)
            .field("action", &self.action)
            .field("value", &self.value)
            .field("control_kind", &self.control_kind)
            .finish()
    }
}
