//! Stock popups: message, error and yes/no boxes.
//!
//! Each popup is a [`PopContainer`] with an icon, a read-only text and a row
//! of buttons. Clicking a button closes the popup with the button's tag as
//! the result.

use cinegrid_core::logging::targets;
use cinegrid_core::{ControlKind, EventKind, EventResult, Result};

use crate::context::AppContext;
use crate::dialog::PopContainer;
use crate::widget::{Child, Container, Control};

const ERROR_ICON: &str = "icons/error.svg";
const QUESTION_ICON: &str = "icons/question.svg";

fn message_box(icon: Option<&str>, message: &str, buttons: &[(&str, &str)]) -> Result<Container> {
    let body = Container::vbox("message_box");

    let mut text_row: Vec<Child> = Vec::new();
    if let Some(icon) = icon {
        text_row.push(Control::image("message_logo", icon).into());
    }
    text_row.push(Control::text_edit("informative_text", message, false).into());
    body.add_row(text_row)?;

    let button_box = Container::hbox("buttons");
    button_box.add_row(buttons.iter().map(|(tag, label)| Control::button(*tag, *label)))?;
    body.add_row([button_box])?;
    Ok(body)
}

fn run(ctx: &AppContext, tag: &str, title: &str, body: Container) -> Result<String> {
    PopContainer::new(ctx, tag, title, body)
        .with_callback(|env| {
            if env.event() == EventKind::Clicked
                && env.control_kind() == Some(ControlKind::Button)
                && let Some(dialog) = env.dialog()
            {
                dialog.set_result(env.tag());
                if let Err(err) = dialog.close() {
                    tracing::warn!(target: targets::DIALOG, %err, "failed to close popup");
                }
            }
            EventResult::Accept
        })
        .show()
}

/// An informational message with an "Ok" button.
#[derive(Debug, Clone)]
pub struct PopMessage {
    ctx: AppContext,
    title: String,
    message: String,
}

impl PopMessage {
    pub fn new(ctx: &AppContext, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ctx: ctx.clone(),
            title: title.into(),
            message: message.into(),
        }
    }

    /// Show the message; returns `"ok"`, or `""` if the window was closed.
    pub fn show(&self) -> Result<String> {
        let body = message_box(None, &self.message, &[("ok", "Ok")])?;
        run(&self.ctx, "pop_message", &self.title, body)
    }
}

/// An error message with an "Ok" button.
#[derive(Debug, Clone)]
pub struct PopError {
    ctx: AppContext,
    title: String,
    message: String,
}

impl PopError {
    pub fn new(ctx: &AppContext, message: impl Into<String>) -> Self {
        Self {
            ctx: ctx.clone(),
            title: "Error".to_string(),
            message: message.into(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn show(&self) -> Result<String> {
        let body = message_box(Some(ERROR_ICON), &self.message, &[("ok", "Ok")])?;
        run(&self.ctx, "pop_error", &self.title, body)
    }
}

/// A question answered with "Yes" or "No".
#[derive(Debug, Clone)]
pub struct PopYesNo {
    ctx: AppContext,
    title: String,
    message: String,
}

impl PopYesNo {
    pub fn new(ctx: &AppContext, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ctx: ctx.clone(),
            title: title.into(),
            message: message.into(),
        }
    }

    /// Show the question; returns `"yes"`, `"no"`, or `""` if the window was
    /// closed without an answer.
    pub fn show(&self) -> Result<String> {
        let body = message_box(Some(QUESTION_ICON), &self.message, &[("yes", "Yes"), ("no", "No")])?;
        run(&self.ctx, "pop_yes_no", &self.title, body)
    }

    /// Whether the answer was "yes".
    pub fn ask(&self) -> Result<bool> {
        Ok(self.show()? == "yes")
    }
}

/// The "Ok" / "Cancel" row at the bottom of a dialog.
pub fn command_buttons() -> Result<Container> {
    let buttons = Container::hbox("command_buttons");
    buttons.add_row([Control::button("ok", "Ok"), Control::button("cancel", "Cancel")])?;
    Ok(buttons)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_layout() {
        let body = message_box(Some(ERROR_ICON), "Disk full", &[("ok", "Ok")]).unwrap();
        assert_eq!(body.row_count(), 2);
        assert_eq!(body.row_tags(0), vec!["message_logo", "informative_text"]);
    }

    #[test]
    fn test_yes_no_answers() {
        let (ctx, toolkit) = AppContext::headless();
        toolkit.queue_click("yes");
        assert!(PopYesNo::new(&ctx, "Delete?", "Delete the clip?").ask().unwrap());

        toolkit.queue_click("no");
        assert!(!PopYesNo::new(&ctx, "Delete?", "Delete the clip?").ask().unwrap());

        toolkit.queue_close();
        assert_eq!(PopYesNo::new(&ctx, "Delete?", "Delete the clip?").show().unwrap(), "");
        assert_eq!(toolkit.opened_windows(), vec!["Delete?"; 3]);
    }

    #[test]
    fn test_error_title() {
        let (ctx, toolkit) = AppContext::headless();
        toolkit.queue_click("ok");
        let result = PopError::new(&ctx, "Bad name").title("Invalid File Name...").show().unwrap();
        assert_eq!(result, "ok");
        assert_eq!(toolkit.opened_windows(), vec!["Invalid File Name..."]);
    }

    #[test]
    fn test_command_buttons() {
        let buttons = command_buttons().unwrap();
        assert_eq!(buttons.row_tags(0), vec!["ok", "cancel"]);
    }
}
