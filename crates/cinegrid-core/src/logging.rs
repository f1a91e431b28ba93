//! Logging and debugging facilities.
//!
//! cinegrid logs through `tracing` and never installs a subscriber. Install
//! one in the application (or a test) to see output:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("cinegrid=debug,cinegrid_core::registry=trace")
//!     .init();
//! ```
//!
//! [`RegistryDump`] renders the registry of one window as a tree of scopes.

use std::fmt::Write as _;

use crate::key::WindowId;
use crate::registry::{RegistryEntry, WidgetRegistry};

/// Target names for log filtering.
pub mod targets {
    /// Widget registry mutations.
    pub const REGISTRY: &str = "cinegrid_core::registry";
    /// Event envelope construction and callback dispatch.
    pub const DISPATCH: &str = "cinegrid::dispatch";
    /// Grid cell model and typing buffer.
    pub const GRID: &str = "cinegrid::grid";
    /// Dialog shell lifecycle.
    pub const DIALOG: &str = "cinegrid::dialog";
    /// Container composition and materialization.
    pub const CONTAINER: &str = "cinegrid::container";
    /// Native toolkit calls.
    pub const TOOLKIT: &str = "cinegrid::toolkit";
    /// File system operations.
    pub const FILES: &str = "cinegrid::files";
}

/// Span names used around long-running operations.
pub mod span_names {
    /// One callback dispatch.
    pub const DISPATCH: &str = "cinegrid::dispatch";
    /// A modal loop.
    pub const MODAL_LOOP: &str = "cinegrid::modal_loop";
}

/// Branch characters for [`RegistryDump`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
}

/// Debug rendering of one window's registry.
///
/// ```text
/// window 1
/// └── dialog
///     └── form
///         ├── name
///         └── files
///             └── cell
/// ```
#[derive(Debug, Clone)]
pub struct RegistryDump {
    window_id: WindowId,
    style: TreeStyle,
    show_dead: bool,
}

impl RegistryDump {
    /// Dump the given window with Unicode branches.
    pub fn new(window_id: WindowId) -> Self {
        Self {
            window_id,
            style: TreeStyle::default(),
            show_dead: true,
        }
    }

    /// Choose the branch style.
    pub fn style(mut self, style: TreeStyle) -> Self {
        self.style = style;
        self
    }

    /// Mark entries whose native resource is gone. On by default.
    pub fn show_dead(mut self, show: bool) -> Self {
        self.show_dead = show;
        self
    }

    /// Render the tree.
    pub fn format<W: RegistryEntry>(&self, registry: &WidgetRegistry<W>) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "window {} ({} widgets)",
            self.window_id,
            registry.window_len(self.window_id)
        );
        let roots = registry.root_scopes(self.window_id);
        if roots.is_empty() {
            out.push_str("  (empty)\n");
        }
        let count = roots.len();
        for (i, scope) in roots.iter().enumerate() {
            self.format_scope(registry, scope, String::new(), i + 1 == count, &mut out);
        }
        out
    }

    fn format_scope<W: RegistryEntry>(
        &self,
        registry: &WidgetRegistry<W>,
        scope: &str,
        indent: String,
        is_last: bool,
        out: &mut String,
    ) {
        let (tee, corner, bar) = match self.style {
            TreeStyle::Ascii => ("+-- ", "`-- ", "|   "),
            TreeStyle::Unicode => ("\u{251c}\u{2500}\u{2500} ", "\u{2514}\u{2500}\u{2500} ", "\u{2502}   "),
        };
        let _ = writeln!(out, "{indent}{}{scope}", if is_last { corner } else { tee });
        let child_indent = format!("{indent}{}", if is_last { "    " } else { bar });

        let members: Vec<_> = registry
            .scope_entries(self.window_id, scope)
            .unwrap_or_default()
            .into_iter()
            .filter(|entry| !entry.sentinel)
            .collect();
        let count = members.len();
        for (i, entry) in members.into_iter().enumerate() {
            let last = i + 1 == count;
            if entry.owns_scope && registry.scope_entries(self.window_id, &entry.tag).is_some() {
                self.format_scope(registry, &entry.tag, child_indent.clone(), last, out);
                continue;
            }
            let mark = if self.show_dead && !entry.live { " (dead)" } else { "" };
            let _ = writeln!(
                out,
                "{child_indent}{}{}{mark}",
                if last { corner } else { tee },
                entry.tag
            );
        }
    }
}
