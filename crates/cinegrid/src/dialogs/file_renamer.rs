//! A dialog for renaming a batch of video files.
//!
//! The files are listed in an editable grid, one per row, each row carrying
//! the file's path as user data. Confirming renames every row whose name was
//! edited, keeping the file's original extension. Every new name is checked
//! before the first file is touched; the first bad row is selected and
//! reported in an error popup, and the dialog stays open.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cinegrid_core::logging::targets;
use cinegrid_core::{Error, EventKind, EventResult, Result, UserData};
use parking_lot::Mutex;

use crate::context::AppContext;
use crate::dialog::PopContainer;
use crate::event::Envelope;
use crate::file_ops::{FileOps, LocalFileOps, file_join, filename_validate, split_file_path};
use crate::popups::{PopError, PopYesNo, command_buttons};
use crate::widget::{ColumnDef, Container, Control, Grid};

const DIALOG_TAG: &str = "file_renamer";
const FILE_CONTAINER: &str = "file_controls";
const FILE_GRID: &str = "video_input_files";
const NAME_COLUMN: &str = "new_file_name";

/// Outcome of committing the dialog's edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    /// Done; the dialog may close.
    Committed,
    /// A row needs fixing; the dialog stays open.
    Invalid,
}

impl CommitStatus {
    pub fn code(self) -> i32 {
        match self {
            CommitStatus::Committed => 1,
            CommitStatus::Invalid => -1,
        }
    }
}

struct Rename {
    row: usize,
    from: PathBuf,
    to: PathBuf,
    name: String,
}

struct Renamer {
    ctx: AppContext,
    files: Mutex<Vec<PathBuf>>,
    file_ops: Arc<dyn FileOps>,
}

impl Renamer {
    fn handle(&self, env: &Envelope) -> Result<EventResult> {
        match env.event() {
            EventKind::WindowPostOpen => self.load_files(env)?,
            EventKind::ClearTypingBuffer => {
                if let Some(change) = env.value().as_cell() {
                    grid(env)?.value_set(change.row, change.col, change.new_text.clone(), change.user_data.clone())?;
                }
            }
            EventKind::Clicked if matches!(env.tag(), "ok" | "cancel") => {
                let status = if env.tag() == "ok" {
                    self.process_ok(env)?
                } else {
                    self.process_cancel(env)?
                };
                tracing::debug!(target: targets::DIALOG, button = env.tag(), code = status.code(), "commit processed");
                if status == CommitStatus::Committed
                    && let Some(dialog) = env.dialog()
                {
                    dialog.set_result(env.tag());
                    dialog.close()?;
                }
            }
            _ => {}
        }
        Ok(EventResult::Accept)
    }

    fn load_files(&self, env: &Envelope) -> Result<()> {
        let grid = grid(env)?;
        let col = grid.colindex_get(NAME_COLUMN)?;
        for (row, path) in self.files.lock().clone().into_iter().enumerate() {
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            grid.value_set(row, col, name, UserData::new(path))?;
        }
        Ok(())
    }

    fn process_ok(&self, env: &Envelope) -> Result<CommitStatus> {
        let grid = grid(env)?;
        if self.planned(&grid)?.is_empty() {
            self.package_files(&grid)?;
            return Ok(CommitStatus::Committed);
        }

        let confirmed = !self.ctx.config().confirm_renames
            || PopYesNo::new(&self.ctx, "Rename Files...", "Rename Files?").ask()?;
        if !confirmed {
            return Ok(CommitStatus::Committed);
        }
        let status = self.rename_files(&grid)?;
        if status == CommitStatus::Committed {
            self.package_files(&grid)?;
        }
        Ok(status)
    }

    fn process_cancel(&self, env: &Envelope) -> Result<CommitStatus> {
        let grid = grid(env)?;
        if self.planned(&grid)?.is_empty() {
            return Ok(CommitStatus::Committed);
        }

        let discard = PopYesNo::new(&self.ctx, "Files Renamed...", "Discard Renamed Files And Close Window?").ask()?;
        if discard {
            return Ok(CommitStatus::Committed);
        }
        let status = self.rename_files(&grid)?;
        if status == CommitStatus::Committed {
            self.package_files(&grid)?;
        }
        Ok(status)
    }

    // Rows whose edited name differs from the file they hold.
    fn planned(&self, grid: &Grid) -> Result<Vec<Rename>> {
        let col = grid.colindex_get(NAME_COLUMN)?;
        let mut planned = Vec::new();
        for row in 0..grid.row_count()? {
            let text = grid.read_and_commit(row, col)?.display_text();
            let user_data = grid.userdata_get(row, col)?;
            let Some(from) = user_data.downcast_ref::<PathBuf>() else {
                tracing::warn!(target: targets::DIALOG, row, "row has no file path");
                continue;
            };
            if let Some((name, to)) = target(&text, from) {
                planned.push(Rename {
                    row,
                    from: from.clone(),
                    to,
                    name,
                });
            }
        }
        Ok(planned)
    }

    fn rename_files(&self, grid: &Grid) -> Result<CommitStatus> {
        let col = grid.colindex_get(NAME_COLUMN)?;
        let planned = self.planned(grid)?;
        let max_len = self.ctx.config().max_file_name_len;

        for rename in &planned {
            if let Err(err) = filename_validate(&rename.name, max_len) {
                PopError::new(
                    &self.ctx,
                    format!("'{}' is not a valid file name ({err}). Please reenter.", rename.name),
                )
                .title("Invalid File Name...")
                .show()?;
                grid.select_row(rename.row)?;
                return Ok(CommitStatus::Invalid);
            }
        }

        for rename in planned {
            if let Err(err) = self.file_ops.rename(&rename.from, &rename.to) {
                tracing::warn!(target: targets::DIALOG, from = %rename.from.display(), to = %rename.to.display(), %err, "rename failed");
                PopError::new(
                    &self.ctx,
                    format!(
                        "Failed to rename file '{}' to '{}': {err}",
                        rename.from.display(),
                        rename.to.display()
                    ),
                )
                .title("Failed To Rename File...")
                .show()?;
                grid.select_row(rename.row)?;
                return Ok(CommitStatus::Invalid);
            }
            grid.value_set(rename.row, col, rename.name, UserData::new(rename.to))?;
        }
        Ok(CommitStatus::Committed)
    }

    fn package_files(&self, grid: &Grid) -> Result<()> {
        let col = grid.colindex_get(NAME_COLUMN)?;
        let mut files = self.files.lock();
        for (row, file) in files.iter_mut().enumerate().take(grid.row_count()?) {
            if let Some(path) = grid.userdata_get(row, col)?.downcast_ref::<PathBuf>() {
                file.clone_from(path);
            }
        }
        Ok(())
    }
}

fn grid(env: &Envelope) -> Result<Grid> {
    env.widget_get(FILE_CONTAINER, FILE_GRID)?.as_grid()
}

// The file name and path an edited cell asks for, or `None` when the cell
// is blank or still names the file it holds. The original extension is
// appended unless the text already ends with it.
fn target(text: &str, from: &Path) -> Option<(String, PathBuf)> {
    let text = text.trim();
    let current = from.file_name().map(|name| name.to_string_lossy())?;
    if text.is_empty() || text == current {
        return None;
    }

    let (dir, _, ext) = split_file_path(from);
    let stem = match text.len().checked_sub(ext.len()) {
        Some(split) if !ext.is_empty() && text.is_char_boundary(split) && text[split..].eq_ignore_ascii_case(&ext) => {
            &text[..split]
        }
        _ => text,
    };
    let to = file_join(&dir, stem, &ext);
    let name = format!("{stem}{ext}");
    Some((name, to))
}

/// Modal dialog that renames video files.
///
/// ```no_run
/// use cinegrid::AppContext;
/// use cinegrid::dialogs::FileRenamer;
///
/// let (ctx, _toolkit) = AppContext::headless();
/// let renamer = FileRenamer::new(&ctx, vec!["/videos/clip_a.mp4".into()]).unwrap();
/// if renamer.show().unwrap() == "ok" {
///     println!("{:?}", renamer.files());
/// }
/// ```
pub struct FileRenamer {
    renamer: Arc<Renamer>,
}

impl FileRenamer {
    /// Create the dialog for a non-empty list of files.
    pub fn new(ctx: &AppContext, files: Vec<PathBuf>) -> Result<Self> {
        if files.is_empty() {
            return Err(Error::InvalidArgument("file renamer needs at least one file".to_string()));
        }
        Ok(Self {
            renamer: Arc::new(Renamer {
                ctx: ctx.clone(),
                files: Mutex::new(files),
                file_ops: Arc::new(LocalFileOps),
            }),
        })
    }

    /// Rename through `file_ops` instead of the local file system.
    pub fn with_file_ops(self, file_ops: Arc<dyn FileOps>) -> Self {
        let files = self.files();
        Self {
            renamer: Arc::new(Renamer {
                ctx: self.renamer.ctx.clone(),
                files: Mutex::new(files),
                file_ops,
            }),
        }
    }

    fn layout() -> Result<Container> {
        let file_controls = Container::vbox(FILE_CONTAINER);
        file_controls.add_row([Control::grid(FILE_GRID, vec![ColumnDef::new("New File Name", NAME_COLUMN)])])?;

        let form = Container::vbox("form_controls");
        form.add_row([file_controls])?;
        form.add_row([command_buttons()?])?;
        Ok(form)
    }

    /// Show the dialog. Returns `"ok"` or `"cancel"`, or `""` if the window
    /// was closed some other way.
    pub fn show(&self) -> Result<String> {
        let renamer = Arc::clone(&self.renamer);
        PopContainer::new(&self.renamer.ctx, DIALOG_TAG, "Rename Video Files", Self::layout()?)
            .with_callback(move |env| match renamer.handle(env) {
                Ok(result) => result,
                Err(err) => {
                    tracing::error!(target: targets::DIALOG, tag = env.tag(), event = %env.event(), %err, "file renamer failed");
                    EventResult::Reject
                }
            })
            .show()
    }

    /// The files, with the names they have after the last commit.
    pub fn files(&self) -> Vec<PathBuf> {
        self.renamer.files.lock().clone()
    }
}

impl std::fmt::Debug for FileRenamer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRenamer").field("files", &self.files()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_keeps_extension() {
        let from = Path::new("/videos/clip_a.mp4");
        assert_eq!(target("clip_a.mp4", from), None);
        assert_eq!(target("  ", from), None);
        assert_eq!(
            target("intro", from),
            Some(("intro.mp4".to_string(), PathBuf::from("/videos/intro.mp4")))
        );
        assert_eq!(
            target("intro.MP4", from),
            Some(("intro.mp4".to_string(), PathBuf::from("/videos/intro.mp4")))
        );
        assert_eq!(
            target("clip_a", from),
            Some(("clip_a.mp4".to_string(), PathBuf::from("/videos/clip_a.mp4")))
        );
    }

    #[test]
    fn test_empty_file_list_is_rejected() {
        let (ctx, _) = AppContext::headless();
        assert!(matches!(FileRenamer::new(&ctx, Vec::new()), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_commit_codes() {
        assert_eq!(CommitStatus::Committed.code(), 1);
        assert_eq!(CommitStatus::Invalid.code(), -1);
    }
}
