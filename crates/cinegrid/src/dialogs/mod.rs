//! Ready-made dialogs built from the widget layer.

mod file_renamer;

pub use file_renamer::{CommitStatus, FileRenamer};
