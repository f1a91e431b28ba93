//! Declarative control descriptions.
//!
//! A [`Control`] is pure data: what kind of leaf widget to build and how to
//! configure it. Nothing native exists until the owning container is
//! materialized, at which point [`Control::native_spec`] turns the variant
//! into toolkit construction parameters.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use cinegrid_core::value::DATE_FORMAT;
use cinegrid_core::{ControlKind, EventResult, Value};

use super::{Callback, Validator};
use crate::backend::NativeSpec;
use crate::event::Envelope;

/// One column of a [`Grid`](super::Grid).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Header text.
    pub label: String,
    /// Tag used by [`Grid::colindex_get`](super::Grid::colindex_get).
    pub tag: String,
    /// Whether cells accept in-place edits.
    pub editable: bool,
    /// Whether cells carry a check box.
    pub checkable: bool,
}

impl ColumnDef {
    /// An editable, uncheckable column.
    pub fn new(label: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            tag: tag.into(),
            editable: true,
            checkable: false,
        }
    }

    /// Make the column read-only.
    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    /// Give the column's cells a check box.
    pub fn checkable(mut self) -> Self {
        self.checkable = true;
        self
    }
}

/// Construction parameters of a grid control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridSpec {
    /// Column definitions, left to right.
    pub columns: Vec<ColumnDef>,
}

/// The kind-specific part of a [`Control`].
#[derive(Debug, Clone, PartialEq)]
pub enum ControlVariant {
    Button,
    Checkbox { checked: bool },
    ComboBox { items: Vec<String> },
    DateEdit { date: Option<NaiveDate> },
    Grid(GridSpec),
    Image { source: String },
    Label,
    LineEdit,
    Menu { items: Vec<String> },
    ProgressBar { min: i64, max: i64 },
    RadioButton { checked: bool },
    Slider { min: i64, max: i64 },
    Spacer,
    Spinbox { min: i64, max: i64 },
    Switch { checked: bool },
    TextEdit { editable: bool },
}

impl ControlVariant {
    /// The control kind this variant builds.
    pub fn kind(&self) -> ControlKind {
        match self {
            Self::Button => ControlKind::Button,
            Self::Checkbox { .. } => ControlKind::Checkbox,
            Self::ComboBox { .. } => ControlKind::ComboBox,
            Self::DateEdit { .. } => ControlKind::DateEdit,
            Self::Grid(_) => ControlKind::Grid,
            Self::Image { .. } => ControlKind::Image,
            Self::Label => ControlKind::Label,
            Self::LineEdit => ControlKind::LineEdit,
            Self::Menu { .. } => ControlKind::Menu,
            Self::ProgressBar { .. } => ControlKind::ProgressBar,
            Self::RadioButton { .. } => ControlKind::RadioButton,
            Self::Slider { .. } => ControlKind::Slider,
            Self::Spacer => ControlKind::Spacer,
            Self::Spinbox { .. } => ControlKind::Spinbox,
            Self::Switch { .. } => ControlKind::Switch,
            Self::TextEdit { .. } => ControlKind::TextEdit,
        }
    }
}

/// Options every control shares.
#[derive(Clone, Default)]
pub struct ControlBase {
    /// Tag, unique within the owning container.
    pub tag: String,
    /// Label or initial text.
    pub text: String,
    /// Hover text.
    pub tooltip: String,
    /// Whether the control starts enabled.
    pub enabled: bool,
    pub(crate) callback: Option<Callback>,
    pub(crate) validator: Option<Validator>,
}

/// A leaf control, described but not yet built.
#[derive(Clone)]
pub struct Control {
    /// Options shared by every kind.
    pub base: ControlBase,
    /// Kind-specific options.
    pub variant: ControlVariant,
}

impl Control {
    fn new(tag: impl Into<String>, text: impl Into<String>, variant: ControlVariant) -> Self {
        Self {
            base: ControlBase {
                tag: tag.into(),
                text: text.into(),
                tooltip: String::new(),
                enabled: true,
                callback: None,
                validator: None,
            },
            variant,
        }
    }

    pub fn button(tag: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(tag, label, ControlVariant::Button)
    }

    pub fn checkbox(tag: impl Into<String>, label: impl Into<String>, checked: bool) -> Self {
        Self::new(tag, label, ControlVariant::Checkbox { checked })
    }

    pub fn radio_button(tag: impl Into<String>, label: impl Into<String>, checked: bool) -> Self {
        Self::new(tag, label, ControlVariant::RadioButton { checked })
    }

    pub fn switch(tag: impl Into<String>, label: impl Into<String>, checked: bool) -> Self {
        Self::new(tag, label, ControlVariant::Switch { checked })
    }

    /// A drop-down list. The first item starts selected.
    pub fn combo_box<I, S>(tag: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = items.into_iter().map(Into::into).collect();
        Self::new(tag, "", ControlVariant::ComboBox { items })
    }

    pub fn date_edit(tag: impl Into<String>, date: Option<NaiveDate>) -> Self {
        Self::new(tag, "", ControlVariant::DateEdit { date })
    }

    /// A grid with the given columns and no rows.
    pub fn grid(tag: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self::new(tag, "", ControlVariant::Grid(GridSpec { columns }))
    }

    pub fn image(tag: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(tag, "", ControlVariant::Image { source: source.into() })
    }

    pub fn label(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(tag, text, ControlVariant::Label)
    }

    pub fn line_edit(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(tag, text, ControlVariant::LineEdit)
    }

    /// A menu. Menus attach to the window chrome and must sit alone in their
    /// row.
    pub fn menu<I, S>(tag: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = items.into_iter().map(Into::into).collect();
        Self::new(tag, "", ControlVariant::Menu { items })
    }

    pub fn progress_bar(tag: impl Into<String>, min: i64, max: i64) -> Self {
        Self::new(tag, min.to_string(), ControlVariant::ProgressBar { min, max })
    }

    pub fn slider(tag: impl Into<String>, min: i64, max: i64) -> Self {
        Self::new(tag, min.to_string(), ControlVariant::Slider { min, max })
    }

    pub fn spinbox(tag: impl Into<String>, min: i64, max: i64) -> Self {
        Self::new(tag, min.to_string(), ControlVariant::Spinbox { min, max })
    }

    /// A blank cell used to pad rows.
    pub fn spacer(tag: impl Into<String>) -> Self {
        Self::new(tag, "", ControlVariant::Spacer)
    }

    pub fn text_edit(tag: impl Into<String>, text: impl Into<String>, editable: bool) -> Self {
        Self::new(tag, text, ControlVariant::TextEdit { editable })
    }

    /// Route this control's events to `callback` instead of the container's.
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Envelope) -> EventResult + Send + Sync + 'static,
    {
        self.base.callback = Some(Arc::new(callback));
        self
    }

    /// Check values read from this control with `validator`.
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.base.validator = Some(Arc::new(validator));
        self
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.base.tooltip = tooltip.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.base.enabled = false;
        self
    }

    /// The control's tag.
    pub fn tag(&self) -> &str {
        &self.base.tag
    }

    /// The control's kind.
    pub fn kind(&self) -> ControlKind {
        self.variant.kind()
    }

    /// Toolkit construction parameters for this control.
    pub fn native_spec(&self) -> NativeSpec {
        let mut spec = NativeSpec::new(self.kind(), self.base.tag.clone());
        spec.text = self.base.text.clone();
        spec.tooltip = self.base.tooltip.clone();
        spec.enabled = self.base.enabled;

        match &self.variant {
            ControlVariant::Button | ControlVariant::Label | ControlVariant::LineEdit => {}
            ControlVariant::Checkbox { checked }
            | ControlVariant::RadioButton { checked }
            | ControlVariant::Switch { checked } => spec.checked = *checked,
            ControlVariant::ComboBox { items } | ControlVariant::Menu { items } => {
                spec.items = items.clone();
            }
            ControlVariant::DateEdit { date } => {
                spec.text = date
                    .map(|d| d.format(DATE_FORMAT).to_string())
                    .unwrap_or_default();
            }
            ControlVariant::Grid(grid) => {
                spec.columns = grid.columns.iter().map(|c| c.label.clone()).collect();
            }
            ControlVariant::Image { source } => spec.text = source.clone(),
            ControlVariant::ProgressBar { min, max } => {
                spec.range = Some((*min, *max));
                spec.editable = false;
            }
            ControlVariant::Slider { min, max } | ControlVariant::Spinbox { min, max } => {
                spec.range = Some((*min, *max));
            }
            ControlVariant::Spacer => {
                spec.editable = false;
                spec.enabled = false;
            }
            ControlVariant::TextEdit { editable } => spec.editable = *editable,
        }
        spec
    }
}

impl fmt::Debug for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Control")
            .field("tag", &self.base.tag)
            .field("variant", &self.variant)
            .field("has_callback", &self.base.callback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_spec_per_variant() {
        let spec = Control::checkbox("agree", "I agree", true).native_spec();
        assert_eq!(spec.kind, ControlKind::Checkbox);
        assert!(spec.checked);
        assert_eq!(spec.text, "I agree");

        let date = NaiveDate::from_ymd_opt(2024, 5, 17);
        let spec = Control::date_edit("when", date).native_spec();
        assert_eq!(spec.text, "2024-05-17");

        let spec = Control::grid(
            "files",
            vec![ColumnDef::new("Name", "name"), ColumnDef::new("Size", "size").read_only()],
        )
        .native_spec();
        assert_eq!(spec.columns, vec!["Name", "Size"]);

        let spec = Control::spinbox("count", 1, 9).native_spec();
        assert_eq!(spec.range, Some((1, 9)));
        assert_eq!(spec.text, "1");
    }

    #[test]
    fn test_builder_options() {
        let control = Control::button("ok", "&Ok")
            .with_tooltip("Accept")
            .disabled()
            .with_callback(|_| EventResult::Accept);
        assert_eq!(control.tag(), "ok");
        assert!(!control.base.enabled);
        assert!(control.base.callback.is_some());
        assert_eq!(control.native_spec().tooltip, "Accept");
    }
}
