//! Identity keys.
//!
//! Every live widget is addressed by a `(window_id, container_tag, tag)`
//! triple. Container tags are namespaced by window inside the registry so the
//! same container tag in two windows never collides.

use std::fmt;
use std::num::NonZeroU32;

use crate::error::{Error, Result};

/// Identifier of a top-level window (dialog or main window).
///
/// Window ids are positive integers handed out by the application context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(NonZeroU32);

impl WindowId {
    /// Create a window id from a raw value. Returns `None` for zero.
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// The raw numeric id.
    #[inline]
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Full address of one widget instance.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    /// Owning window.
    pub window_id: WindowId,
    /// Tag of the immediate parent container.
    pub container_tag: String,
    /// Tag of the widget itself.
    pub tag: String,
}

impl IdentityKey {
    /// Build a key, rejecting empty tags.
    pub fn new(
        window_id: WindowId,
        container_tag: impl Into<String>,
        tag: impl Into<String>,
    ) -> Result<Self> {
        let container_tag = container_tag.into();
        let tag = tag.into();
        validate_tag(&container_tag)?;
        validate_tag(&tag)?;
        Ok(Self {
            window_id,
            container_tag,
            tag,
        })
    }

    /// The window-namespaced bucket name of the parent container.
    pub fn scoped_container(&self) -> String {
        scoped_tag(self.window_id, &self.container_tag)
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.window_id, self.container_tag, self.tag)
    }
}

/// Namespace a container tag by its window: `"{window_id}_{container_tag}"`.
pub fn scoped_tag(window_id: WindowId, container_tag: &str) -> String {
    format!("{window_id}_{container_tag}")
}

/// Reject tags that are empty once trimmed.
pub fn validate_tag(tag: &str) -> Result<()> {
    if tag.trim().is_empty() {
        return Err(Error::InvalidTag(tag.to_string()));
    }
    Ok(())
}

/// Tag of a per-row grid overlay widget: `"{row}|{tag}"`.
pub fn overlay_tag(row: usize, tag: &str) -> String {
    format!("{row}|{tag}")
}

/// Split an overlay tag back into its row and base tag.
pub fn parse_overlay_tag(tag: &str) -> Option<(usize, &str)> {
    let (row, base) = tag.split_once('|')?;
    Some((row.parse().ok()?, base))
}
