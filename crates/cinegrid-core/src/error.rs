//! Error types for cinegrid.
//!
//! Everything here is a contract violation by the code building or driving a
//! widget tree. User-input problems (a bad file name typed into a grid, a
//! rename the filesystem refused) are reported to the user and surfaced as
//! status values instead, never through this type.

use std::path::PathBuf;

use crate::control::ControlKind;
use crate::key::WindowId;
use crate::native::NativeHandle;
use crate::value::ValueKind;

/// Result type alias for cinegrid operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the registry, the widget layer and the dialog shell.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A tag was empty or whitespace.
    #[error("Invalid tag {0:?}: tags must be non-empty")]
    InvalidTag(String),

    /// Two children of the same container share a tag.
    #[error("Duplicate tag '{tag}' in container '{container_tag}'")]
    DuplicateTag { container_tag: String, tag: String },

    /// No widget is registered under the key, even after the fallback searches.
    #[error("Widget '{tag}' not found in container '{container_tag}' of window {window_id}")]
    WidgetNotFound {
        window_id: WindowId,
        container_tag: String,
        tag: String,
    },

    /// A retag would collide with an existing entry.
    #[error("Tag '{tag}' is already registered in container '{container_tag}'")]
    TagInUse { container_tag: String, tag: String },

    /// A widget was asked to behave as a control kind it is not.
    #[error("Widget '{tag}' is a {actual}, expected {expected}")]
    WrongControlKind {
        tag: String,
        expected: &'static str,
        actual: ControlKind,
    },

    /// A value of the wrong kind was assigned to a control.
    #[error("{control} '{tag}' cannot hold a {kind} value")]
    ValueMismatch {
        control: ControlKind,
        tag: String,
        kind: ValueKind,
    },

    /// Text could not be read back as the kind of value a cell already holds.
    #[error("Cannot read {text:?} as {kind}")]
    ValueParse { text: String, kind: ValueKind },

    /// Grid cell access outside the grid.
    #[error("Cell ({row}, {col}) is outside a grid of {rows} rows x {cols} columns")]
    CellOutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// A column tag that the grid does not define.
    #[error("Grid '{grid}' has no column tagged '{column}'")]
    UnknownColumn { grid: String, column: String },

    /// Menus may only occupy logical row 0 of a container.
    #[error("Menu '{0}' must be the only control in row 0")]
    MenuPlacement(String),

    /// An operation that needs native widgets ran before materialization.
    #[error("Container '{0}' has not been materialized")]
    NotMaterialized(String),

    /// A native handle the toolkit has already destroyed.
    #[error("Native handle {0:?} is no longer valid")]
    StaleHandle(NativeHandle),

    /// A toolkit primitive failed.
    #[error("Toolkit error: {0}")]
    Toolkit(String),

    /// A dialog shell was driven through an illegal transition.
    #[error("Dialog '{tag}' cannot {action} while {phase}")]
    DialogState {
        tag: String,
        action: &'static str,
        phase: &'static str,
    },

    /// A modal loop ran out of native events while its window was still open.
    #[error("Event loop has no pending events while window {0} is open")]
    EventLoopStarved(WindowId),

    /// A numeric callback result other than 1 or -1.
    #[error("Invalid callback result code {0}: expected 1 or -1")]
    InvalidResultCode(i32),

    /// An argument a caller passed violates an operation's precondition.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O error.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a not-found error for a registry key.
    pub fn not_found(
        window_id: WindowId,
        container_tag: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self::WidgetNotFound {
            window_id,
            container_tag: container_tag.into(),
            tag: tag.into(),
        }
    }

    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a toolkit error.
    pub fn toolkit(message: impl Into<String>) -> Self {
        Self::Toolkit(message.into())
    }
}
