//! Normalized event vocabulary.
//!
//! [`EventKind`] is the stable contract between the widget layer and every
//! client callback: the integer codes and upper-case names must not change
//! once dialogs depend on them.

use std::fmt;

use crate::error::{Error, Result};
use crate::value::{UserData, Value};

/// Kinds of normalized UI events delivered to callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(i32)]
pub enum EventKind {
    AppInit = 1,
    AppPostInit = 2,
    AppClosed = 3,
    AppExit = 4,
    BadInput = 5,
    Changed = 6,
    ClearTypingBuffer = 7,
    Clicked = 8,
    Closed = 9,
    Collapsed = 10,
    CursorChanged = 11,
    DateChanged = 12,
    DoubleClicked = 13,
    DragEnter = 14,
    DragMove = 15,
    Drop = 16,
    EditChanged = 17,
    Expanded = 18,
    FocusIn = 19,
    FocusOut = 20,
    Highlighted = 21,
    IndexChanged = 22,
    KeyPressed = 23,
    MenuClicked = 24,
    Moved = 25,
    Pressed = 26,
    Released = 27,
    Scrolled = 28,
    SelectionChanged = 29,
    TabChanged = 30,
    TextChanged = 31,
    TextEdit = 32,
    TimeChanged = 33,
    Toggled = 34,
    Triggered = 35,
    ValueChanged = 36,
    WindowOpen = 37,
    WindowPostOpen = 38,
    WindowClosed = 39,
    WindowResized = 40,
    Timer = 41,
    Custom = 42,
}

impl EventKind {
    /// Every event kind, in code order.
    pub const ALL: [EventKind; 42] = [
        Self::AppInit,
        Self::AppPostInit,
        Self::AppClosed,
        Self::AppExit,
        Self::BadInput,
        Self::Changed,
        Self::ClearTypingBuffer,
        Self::Clicked,
        Self::Closed,
        Self::Collapsed,
        Self::CursorChanged,
        Self::DateChanged,
        Self::DoubleClicked,
        Self::DragEnter,
        Self::DragMove,
        Self::Drop,
        Self::EditChanged,
        Self::Expanded,
        Self::FocusIn,
        Self::FocusOut,
        Self::Highlighted,
        Self::IndexChanged,
        Self::KeyPressed,
        Self::MenuClicked,
        Self::Moved,
        Self::Pressed,
        Self::Released,
        Self::Scrolled,
        Self::SelectionChanged,
        Self::TabChanged,
        Self::TextChanged,
        Self::TextEdit,
        Self::TimeChanged,
        Self::Toggled,
        Self::Triggered,
        Self::ValueChanged,
        Self::WindowOpen,
        Self::WindowPostOpen,
        Self::WindowClosed,
        Self::WindowResized,
        Self::Timer,
        Self::Custom,
    ];

    /// The stable integer code.
    #[inline]
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Look up an event kind by its integer code.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.code() == code)
    }

    /// The stable upper-case wire name.
    pub fn name(self) -> &'static str {
        match self {
            Self::AppInit => "APPINIT",
            Self::AppPostInit => "APPPOSTINIT",
            Self::AppClosed => "APPCLOSED",
            Self::AppExit => "APPEXIT",
            Self::BadInput => "BADINPUT",
            Self::Changed => "CHANGED",
            Self::ClearTypingBuffer => "CLEAR_TYPING_BUFFER",
            Self::Clicked => "CLICKED",
            Self::Closed => "CLOSED",
            Self::Collapsed => "COLLAPSED",
            Self::CursorChanged => "CURSORCHANGED",
            Self::DateChanged => "DATECHANGED",
            Self::DoubleClicked => "DOUBLECLICKED",
            Self::DragEnter => "DRAGENTER",
            Self::DragMove => "DRAGMOVE",
            Self::Drop => "DROP",
            Self::EditChanged => "EDITCHANGED",
            Self::Expanded => "EXPANDED",
            Self::FocusIn => "FOCUSIN",
            Self::FocusOut => "FOCUSOUT",
            Self::Highlighted => "HIGHLIGHTED",
            Self::IndexChanged => "INDEXCHANGED",
            Self::KeyPressed => "KEYPRESSED",
            Self::MenuClicked => "MENUCLICKED",
            Self::Moved => "MOVED",
            Self::Pressed => "PRESSED",
            Self::Released => "RELEASED",
            Self::Scrolled => "SCROLLED",
            Self::SelectionChanged => "SELECTIONCHANGED",
            Self::TabChanged => "TABCHANGED",
            Self::TextChanged => "TEXTCHANGED",
            Self::TextEdit => "TEXTEDIT",
            Self::TimeChanged => "TIMECHANGED",
            Self::Toggled => "TOGGLED",
            Self::Triggered => "TRIGGERED",
            Self::ValueChanged => "VALUECHANGED",
            Self::WindowOpen => "WINDOWOPEN",
            Self::WindowPostOpen => "WINDOWPOSTOPEN",
            Self::WindowClosed => "WINDOWCLOSED",
            Self::WindowResized => "WINDOWRESIZED",
            Self::Timer => "TIMER",
            Self::Custom => "CUSTOM",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a callback tells the dispatcher.
///
/// `Default` means the callback had no opinion and is treated as `Accept`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventResult {
    /// Accept / continue.
    Accept,
    /// Reject / veto.
    Reject,
    /// No opinion.
    #[default]
    Default,
}

impl EventResult {
    /// Collapse `Default` into `Accept`.
    pub fn normalized(self) -> Self {
        match self {
            Self::Reject => Self::Reject,
            Self::Accept | Self::Default => Self::Accept,
        }
    }

    /// Whether the event was vetoed.
    pub fn is_reject(self) -> bool {
        matches!(self, Self::Reject)
    }

    /// Whether the event was accepted (explicitly or by default).
    pub fn is_accept(self) -> bool {
        !self.is_reject()
    }

    /// Numeric form: `1` accept, `-1` reject.
    pub fn code(self) -> i32 {
        match self.normalized() {
            Self::Reject => -1,
            _ => 1,
        }
    }
}

impl TryFrom<i32> for EventResult {
    type Error = Error;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            1 => Ok(Self::Accept),
            -1 => Ok(Self::Reject),
            other => Err(Error::InvalidResultCode(other)),
        }
    }
}

impl From<Option<EventResult>> for EventResult {
    fn from(result: Option<EventResult>) -> Self {
        result.unwrap_or_default()
    }
}

/// A grid cell edit, carried by `CHANGED` and `CLEAR_TYPING_BUFFER` events.
#[derive(Debug, Clone)]
pub struct GridCellChange {
    /// Row of the edited cell.
    pub row: usize,
    /// Column of the edited cell.
    pub col: usize,
    /// Text displayed before the edit.
    pub old_text: String,
    /// Text entered by the user.
    pub new_text: String,
    /// The cell's current value before the edit.
    pub prior_value: Option<Value>,
    /// The cell's user data.
    pub user_data: UserData,
}

/// Payload of an event. Its shape depends on the event kind.
#[derive(Debug, Clone, Default)]
pub enum EventValue {
    /// No payload.
    #[default]
    None,
    /// A typed value.
    Value(Value),
    /// Free text.
    Text(String),
    /// A check/toggle state.
    Bool(bool),
    /// A selection index; `-1` for no selection.
    Index(i64),
    /// A grid cell edit.
    Cell(GridCellChange),
}

impl EventValue {
    /// The grid cell edit, if this is one.
    pub fn as_cell(&self) -> Option<&GridCellChange> {
        match self {
            Self::Cell(change) => Some(change),
            _ => None,
        }
    }

    /// The text payload, if this is one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable_and_unique() {
        assert_eq!(EventKind::AppInit.code(), 1);
        assert_eq!(EventKind::ClearTypingBuffer.code(), 7);
        assert_eq!(EventKind::Clicked.code(), 8);
        assert_eq!(EventKind::WindowOpen.code(), 37);
        assert_eq!(EventKind::WindowPostOpen.code(), 38);
        assert_eq!(EventKind::WindowClosed.code(), 39);

        for (index, kind) in EventKind::ALL.iter().enumerate() {
            assert_eq!(kind.code(), index as i32 + 1);
            assert_eq!(EventKind::from_code(kind.code()), Some(*kind));
        }
        assert_eq!(EventKind::from_code(0), None);
        assert_eq!(EventKind::from_code(99), None);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(EventKind::ClearTypingBuffer.to_string(), "CLEAR_TYPING_BUFFER");
        assert_eq!(EventKind::WindowPostOpen.name(), "WINDOWPOSTOPEN");
    }

    #[test]
    fn test_result_normalization() {
        assert_eq!(EventResult::Default.normalized(), EventResult::Accept);
        assert_eq!(EventResult::Reject.normalized(), EventResult::Reject);
        assert_eq!(EventResult::Default.code(), 1);
        assert_eq!(EventResult::Reject.code(), -1);
        assert_eq!(EventResult::from(None), EventResult::Default);
    }

    #[test]
    fn test_result_codes() {
        assert_eq!(EventResult::try_from(1).unwrap(), EventResult::Accept);
        assert_eq!(EventResult::try_from(-1).unwrap(), EventResult::Reject);
        assert!(matches!(
            EventResult::try_from(0),
            Err(Error::InvalidResultCode(0))
        ));
    }
}
