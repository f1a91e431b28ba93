//! Control kinds and their static signal capabilities.
//!
//! Which native signals a widget can emit is a property of its kind, fixed at
//! compile time. Wiring a widget means walking [`ControlKind::capabilities`]
//! and connecting every signal that maps to an [`EventKind`].

use std::fmt;

use crate::event::EventKind;
use crate::native::NativeSignal;

/// The closed set of widget kinds the toolkit layer can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    Button,
    Checkbox,
    ComboBox,
    Container,
    DateEdit,
    Grid,
    Image,
    Label,
    LineEdit,
    Menu,
    ProgressBar,
    RadioButton,
    Slider,
    Spacer,
    Spinbox,
    Switch,
    TextEdit,
    Window,
}

use NativeSignal as S;

const BUTTON: &[NativeSignal] = &[S::Clicked, S::Pressed, S::Released, S::FocusIn, S::FocusOut];
const CHECKABLE: &[NativeSignal] = &[
    S::Clicked,
    S::Toggled,
    S::StateChanged,
    S::FocusIn,
    S::FocusOut,
    S::Destroyed,
];
const COMBO: &[NativeSignal] = &[
    S::CurrentIndexChanged,
    S::CurrentTextChanged,
    S::Highlighted,
    S::TextEdited,
    S::FocusIn,
    S::FocusOut,
];
const DATE: &[NativeSignal] = &[S::DateChanged, S::EditingFinished, S::FocusIn, S::FocusOut];
const GRID: &[NativeSignal] = &[
    S::CellChanged,
    S::CellClicked,
    S::CellDoubleClicked,
    S::KeyPress,
    S::SelectionChanged,
    S::FocusIn,
    S::FocusOut,
    S::Scrolled,
];
const LINE_EDIT: &[NativeSignal] = &[
    S::TextChanged,
    S::TextEdited,
    S::EditingFinished,
    S::ReturnPressed,
    S::CursorPositionChanged,
    S::SelectionChanged,
    S::InputRejected,
    S::FocusIn,
    S::FocusOut,
];
const MENU: &[NativeSignal] = &[S::Triggered];
const RANGE: &[NativeSignal] = &[S::ValueChanged, S::SliderMoved, S::Pressed, S::Released];
const SPINBOX: &[NativeSignal] = &[S::ValueChanged, S::EditingFinished, S::FocusIn, S::FocusOut];
const TEXT_EDIT: &[NativeSignal] = &[
    S::TextChanged,
    S::CursorPositionChanged,
    S::SelectionChanged,
    S::FocusIn,
    S::FocusOut,
];
const WINDOW: &[NativeSignal] = &[
    S::CloseRequested,
    S::Resized,
    S::Moved,
    S::WindowTitleChanged,
];
const PASSIVE: &[NativeSignal] = &[S::Destroyed, S::ObjectNameChanged];

impl ControlKind {
    /// Human-readable kind name, as reported in envelopes.
    pub fn name(self) -> &'static str {
        match self {
            Self::Button => "Button",
            Self::Checkbox => "Checkbox",
            Self::ComboBox => "ComboBox",
            Self::Container => "Container",
            Self::DateEdit => "DateEdit",
            Self::Grid => "Grid",
            Self::Image => "Image",
            Self::Label => "Label",
            Self::LineEdit => "LineEdit",
            Self::Menu => "Menu",
            Self::ProgressBar => "ProgressBar",
            Self::RadioButton => "RadioButton",
            Self::Slider => "Slider",
            Self::Spacer => "Spacer",
            Self::Spinbox => "Spinbox",
            Self::Switch => "Switch",
            Self::TextEdit => "TextEdit",
            Self::Window => "Window",
        }
    }

    /// Every native signal the underlying widget type exposes.
    pub fn signals(self) -> &'static [NativeSignal] {
        match self {
            Self::Button => BUTTON,
            Self::Checkbox | Self::RadioButton | Self::Switch => CHECKABLE,
            Self::ComboBox => COMBO,
            Self::DateEdit => DATE,
            Self::Grid => GRID,
            Self::LineEdit => LINE_EDIT,
            Self::Menu => MENU,
            Self::ProgressBar | Self::Slider => RANGE,
            Self::Spinbox => SPINBOX,
            Self::TextEdit => TEXT_EDIT,
            Self::Window => WINDOW,
            Self::Container | Self::Image | Self::Label | Self::Spacer => PASSIVE,
        }
    }

    /// Signals this kind emits that map to a normalized event.
    pub fn capabilities(self) -> impl Iterator<Item = (NativeSignal, EventKind)> {
        self.signals()
            .iter()
            .filter_map(|signal| signal.event_kind().map(|kind| (*signal, kind)))
    }

    /// Whether this kind can emit the given event.
    pub fn emits(self, kind: EventKind) -> bool {
        self.capabilities().any(|(_, emitted)| emitted == kind)
    }

    /// Whether widgets of this kind own a child scope in the registry.
    pub fn is_container(self) -> bool {
        matches!(self, Self::Container | Self::Window)
    }
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
