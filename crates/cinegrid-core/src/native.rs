//! Vocabulary shared with the native toolkit.
//!
//! Native handles, native signal names and the payloads those signals carry.
//! The static [`NativeSignal::event_kind`] table decides which native signals
//! become normalized events; signals without a mapping are never connected.

use std::fmt;

use slotmap::new_key_type;

use crate::event::EventKind;

new_key_type! {
    /// Handle to a native toolkit resource (window or widget).
    ///
    /// Handles are stable until the toolkit destroys the resource; afterwards
    /// the toolkit reports them as invalid.
    pub struct NativeHandle;
}

impl NativeHandle {
    /// Convert the handle to a raw u64 value.
    #[inline]
    pub fn as_raw(self) -> u64 {
        use slotmap::Key;
        self.data().as_ffi()
    }
}

/// Signals a native widget can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeSignal {
    Clicked,
    Pressed,
    Released,
    Toggled,
    StateChanged,
    TextChanged,
    TextEdited,
    EditingFinished,
    ReturnPressed,
    CurrentIndexChanged,
    CurrentTextChanged,
    Highlighted,
    ValueChanged,
    SliderMoved,
    DateChanged,
    TimeChanged,
    CursorPositionChanged,
    SelectionChanged,
    CellChanged,
    CellClicked,
    CellDoubleClicked,
    KeyPress,
    Expanded,
    Collapsed,
    CurrentChanged,
    Triggered,
    FocusIn,
    FocusOut,
    Scrolled,
    Resized,
    Moved,
    CloseRequested,
    InputRejected,
    DragEnter,
    DragMove,
    Drop,
    Destroyed,
    ObjectNameChanged,
    WindowTitleChanged,
    CustomContextMenuRequested,
}

/// Static binding of native signals to normalized event kinds, one row per
/// [`NativeSignal`] variant in declaration order.
const SIGNAL_TABLE: &[(NativeSignal, &str, Option<EventKind>)] = &[
    (NativeSignal::Clicked, "clicked", Some(EventKind::Clicked)),
    (NativeSignal::Pressed, "pressed", Some(EventKind::Pressed)),
    (NativeSignal::Released, "released", Some(EventKind::Released)),
    (NativeSignal::Toggled, "toggled", Some(EventKind::Toggled)),
    (NativeSignal::StateChanged, "stateChanged", Some(EventKind::Changed)),
    (NativeSignal::TextChanged, "textChanged", Some(EventKind::TextChanged)),
    (NativeSignal::TextEdited, "textEdited", Some(EventKind::TextEdit)),
    (NativeSignal::EditingFinished, "editingFinished", Some(EventKind::EditChanged)),
    (NativeSignal::ReturnPressed, "returnPressed", Some(EventKind::KeyPressed)),
    (NativeSignal::CurrentIndexChanged, "currentIndexChanged", Some(EventKind::IndexChanged)),
    (NativeSignal::CurrentTextChanged, "currentTextChanged", None),
    (NativeSignal::Highlighted, "highlighted", Some(EventKind::Highlighted)),
    (NativeSignal::ValueChanged, "valueChanged", Some(EventKind::ValueChanged)),
    (NativeSignal::SliderMoved, "sliderMoved", Some(EventKind::Moved)),
    (NativeSignal::DateChanged, "dateChanged", Some(EventKind::DateChanged)),
    (NativeSignal::TimeChanged, "timeChanged", Some(EventKind::TimeChanged)),
    (NativeSignal::CursorPositionChanged, "cursorPositionChanged", Some(EventKind::CursorChanged)),
    (NativeSignal::SelectionChanged, "selectionChanged", Some(EventKind::SelectionChanged)),
    (NativeSignal::CellChanged, "cellChanged", Some(EventKind::Changed)),
    (NativeSignal::CellClicked, "cellClicked", Some(EventKind::Clicked)),
    (NativeSignal::CellDoubleClicked, "cellDoubleClicked", Some(EventKind::DoubleClicked)),
    (NativeSignal::KeyPress, "keyPress", Some(EventKind::KeyPressed)),
    (NativeSignal::Expanded, "expanded", Some(EventKind::Expanded)),
    (NativeSignal::Collapsed, "collapsed", Some(EventKind::Collapsed)),
    (NativeSignal::CurrentChanged, "currentChanged", Some(EventKind::TabChanged)),
    (NativeSignal::Triggered, "triggered", Some(EventKind::MenuClicked)),
    (NativeSignal::FocusIn, "focusIn", Some(EventKind::FocusIn)),
    (NativeSignal::FocusOut, "focusOut", Some(EventKind::FocusOut)),
    (NativeSignal::Scrolled, "scrolled", Some(EventKind::Scrolled)),
    (NativeSignal::Resized, "resized", Some(EventKind::WindowResized)),
    (NativeSignal::Moved, "moved", Some(EventKind::Moved)),
    (NativeSignal::CloseRequested, "closeRequested", Some(EventKind::WindowClosed)),
    (NativeSignal::InputRejected, "inputRejected", Some(EventKind::BadInput)),
    (NativeSignal::DragEnter, "dragEnter", Some(EventKind::DragEnter)),
    (NativeSignal::DragMove, "dragMove", Some(EventKind::DragMove)),
    (NativeSignal::Drop, "drop", Some(EventKind::Drop)),
    (NativeSignal::Destroyed, "destroyed", None),
    (NativeSignal::ObjectNameChanged, "objectNameChanged", None),
    (NativeSignal::WindowTitleChanged, "windowTitleChanged", None),
    (NativeSignal::CustomContextMenuRequested, "customContextMenuRequested", None),
];

impl NativeSignal {
    // The table is laid out in declaration order.
    fn entry(self) -> &'static (NativeSignal, &'static str, Option<EventKind>) {
        &SIGNAL_TABLE[self as usize]
    }

    /// The toolkit's name for this signal.
    pub fn name(self) -> &'static str {
        self.entry().1
    }

    /// Look up a signal by its toolkit name.
    pub fn from_name(name: &str) -> Option<Self> {
        SIGNAL_TABLE
            .iter()
            .find(|(_, signal_name, _)| *signal_name == name)
            .map(|(signal, _, _)| *signal)
    }

    /// The normalized event kind, or `None` when the signal is ignored.
    pub fn event_kind(self) -> Option<EventKind> {
        self.entry().2
    }

    /// Every signal in the table.
    pub fn all() -> impl Iterator<Item = NativeSignal> {
        SIGNAL_TABLE.iter().map(|(signal, _, _)| *signal)
    }
}

impl fmt::Display for NativeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A key delivered to a focused grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    Char(char),
    Backspace,
    Enter,
    Tab,
    Escape,
}

impl KeyInput {
    /// Keys that end a typing run and flush the buffer.
    pub fn is_commit(self) -> bool {
        matches!(self, Self::Enter | Self::Tab)
    }
}

/// Data delivered alongside a native signal.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum NativePayload {
    #[default]
    None,
    Text(String),
    Bool(bool),
    Int(i64),
    /// Selection index; `None` when nothing is selected.
    Index(Option<usize>),
    /// A cell whose text was edited in place.
    Cell { row: usize, col: usize, text: String },
    /// A key typed into a cell.
    Key { row: usize, col: usize, key: KeyInput },
}
