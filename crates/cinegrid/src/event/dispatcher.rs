use cinegrid_core::logging::{span_names, targets};
use cinegrid_core::{EventKind, EventResult, EventValue, WindowId};

use super::Envelope;
use crate::context::AppContext;
use crate::widget::{Callback, Widget};

/// Builds envelopes and delivers them to callbacks.
pub struct Dispatcher<'a> {
    ctx: &'a AppContext,
}

impl<'a> Dispatcher<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    /// Build the envelope for an event of `(window_id, container_tag, tag)`.
    ///
    /// The source widget, its parent and the member snapshot are resolved
    /// from the registry; any of them may be missing (a window that is being
    /// torn down, an application-level event).
    pub fn envelope(
        &self,
        window_id: WindowId,
        container_tag: &str,
        tag: &str,
        event: EventKind,
        action: &str,
        value: EventValue,
    ) -> Envelope {
        let registry = self.ctx.registry();
        let object = registry.find(window_id, container_tag, tag).map(Widget::from_inner);
        let parent = registry
            .find(window_id, container_tag, container_tag)
            .map(Widget::from_inner);
        let widgets = registry
            .members_of(window_id, container_tag)
            .into_iter()
            .map(|(member, widget)| (member, Widget::from_inner(widget)))
            .collect();

        Envelope {
            ctx: self.ctx.clone(),
            window_id,
            container_tag: container_tag.to_string(),
            tag: tag.to_string(),
            event,
            action: action.to_string(),
            value,
            control_kind: object.as_ref().map(Widget::kind),
            object,
            widgets,
            parent,
        }
    }

    /// Invoke a callback and normalize its answer: `Default` becomes
    /// `Accept`.
    pub fn dispatch(&self, callback: &Callback, envelope: &Envelope) -> EventResult {
        let span = tracing::debug_span!(
            target: targets::DISPATCH,
            span_names::DISPATCH,
            window_id = %envelope.window_id,
            container_tag = %envelope.container_tag,
            tag = %envelope.tag,
            event = %envelope.event,
        );
        let _guard = span.enter();

        let result = callback(envelope).normalized();
        tracing::debug!(target: targets::DISPATCH, action = %envelope.action, code = result.code(), "dispatched");
        result
    }

    /// Build an envelope and dispatch it in one step.
    #[allow(clippy::too_many_arguments)]
    pub fn fire(
        &self,
        callback: &Callback,
        window_id: WindowId,
        container_tag: &str,
        tag: &str,
        event: EventKind,
        action: &str,
        value: EventValue,
    ) -> EventResult {
        let envelope = self.envelope(window_id, container_tag, tag, event, action, value);
        self.dispatch(callback, &envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Toolkit as _;
    use crate::widget::Control;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_default_normalizes_to_accept() {
        let (ctx, _) = AppContext::headless();
        let w = ctx.next_window_id().unwrap();
        let callback: Callback = Arc::new(|_| EventResult::Default);
        let result = Dispatcher::new(&ctx).fire(&callback, w, "form", "ok", EventKind::Clicked, "clicked", EventValue::None);
        assert_eq!(result, EventResult::Accept);

        let veto: Callback = Arc::new(|_| EventResult::Reject);
        let result = Dispatcher::new(&ctx).fire(&veto, w, "form", "ok", EventKind::Clicked, "clicked", EventValue::None);
        assert_eq!(result.code(), -1);
    }

    #[test]
    fn test_envelope_resolves_object_and_siblings() {
        let (ctx, toolkit) = AppContext::headless();
        let w = ctx.next_window_id().unwrap();
        let window = toolkit.create_window("Form", "form").unwrap();
        let _ok = Widget::build(&ctx, w, "form", window, &Control::button("ok", "Ok"), None).unwrap();
        let _name = Widget::build(&ctx, w, "form", window, &Control::line_edit("name", "clip"), None).unwrap();

        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let callback: Callback = Arc::new(move |env| {
            *sink.lock() = Some((
                env.control_kind(),
                env.sibling("name").is_some(),
                env.widgets().len(),
                env.value_get("form", "name").ok(),
            ));
            EventResult::Accept
        });
        Dispatcher::new(&ctx).fire(&callback, w, "form", "ok", EventKind::Clicked, "clicked", EventValue::None);

        let (kind, has_sibling, members, name) = seen.lock().take().unwrap();
        assert_eq!(kind, Some(cinegrid_core::ControlKind::Button));
        assert!(has_sibling);
        assert_eq!(members, 2);
        assert_eq!(name, Some(cinegrid_core::Value::from("clip")));
    }
}
