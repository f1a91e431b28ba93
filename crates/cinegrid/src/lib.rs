//! cinegrid - declarative dialogs, containers and typed grids over a native
//! widget toolkit.
//!
//! This is the widget layer. It re-exports everything from
//! [`cinegrid_core`] and adds:
//!
//! - [`AppContext`]: one application's registry, toolkit, config and modal
//!   stack
//! - [`Control`] and [`Container`]: the declarative widget tree
//! - [`Widget`] and [`Grid`]: built, registered widgets
//! - [`Envelope`]: what a callback learns about an event
//! - [`PopContainer`] and [`Application`]: modal dialog shells
//! - [`popups`], [`dialogs`]: stock popups and the file renamer
//!
//! # Example
//!
//! ```no_run
//! use cinegrid::{AppContext, Container, Control, EventKind, EventResult, PopContainer};
//!
//! fn main() -> cinegrid::Result<()> {
//!     let (ctx, _toolkit) = AppContext::headless();
//!
//!     let form = Container::form("clip");
//!     form.add_row([Control::label("title_label", "Title"), Control::line_edit("title", "")])?;
//!     form.add_row([Control::button("ok", "Ok")])?;
//!
//!     let dialog = PopContainer::new(&ctx, "clip_editor", "Edit Clip", form).with_callback(|env| {
//!         if env.event() == EventKind::Clicked && env.tag() == "ok" {
//!             if let Some(dialog) = env.dialog() {
//!                 dialog.set_result("ok");
//!                 dialog.close().ok();
//!             }
//!         }
//!         EventResult::Accept
//!     });
//!     println!("{}", dialog.show()?);
//!     Ok(())
//! }
//! ```

pub use cinegrid_core::*;

pub mod backend;
pub mod config;
mod context;
pub mod dialog;
pub mod dialogs;
pub mod event;
pub mod file_ops;
pub mod modal;
pub mod popups;
pub mod widget;

pub use backend::{HeadlessToolkit, LoopStatus, NativeSpec, Toolkit};
pub use config::GuiConfig;
pub use context::AppContext;
pub use dialog::{Application, DialogHandle, DialogPhase, PopContainer};
pub use event::{Dispatcher, Envelope};
pub use file_ops::{FileNameError, FileOps, LocalFileOps};
pub use modal::ModalStack;
pub use popups::{PopError, PopMessage, PopYesNo};
pub use widget::{Callback, Child, ColumnDef, Container, Control, Grid, Layout, Validator, Widget};

static_assertions::assert_impl_all!(AppContext: Send, Sync);
static_assertions::assert_impl_all!(Widget: Send, Sync);
static_assertions::assert_impl_all!(Container: Send, Sync);
static_assertions::assert_impl_all!(Envelope: Send, Sync);
static_assertions::assert_impl_all!(PopContainer: Send, Sync);
