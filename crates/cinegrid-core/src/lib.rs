//! Core systems for cinegrid.
//!
//! This crate holds the toolkit-independent foundations of the cinegrid widget
//! layer:
//!
//! - **Identity keys**: `(window, container_tag, tag)` addressing of widgets
//! - **Widget registry**: weak, scope-bucketed lookup with recursive delete
//! - **Event vocabulary**: stable event-kind codes, native signal table,
//!   per-control-kind capabilities, the three-state callback result
//! - **Values**: the six typed value kinds carried by controls and grid cells
//!
//! # Registry Example
//!
//! ```
//! use std::sync::Arc;
//! use cinegrid_core::{RegistryEntry, WidgetRegistry, WindowId};
//!
//! struct Leaf;
//!
//! impl RegistryEntry for Leaf {
//!     fn owns_scope(&self) -> bool { false }
//!     fn is_live(&self) -> bool { true }
//!     fn release(&self) {}
//!     fn set_identity(&self, _: &str, _: &str) {}
//! }
//!
//! let window = WindowId::new(1).unwrap();
//! let mut registry = WidgetRegistry::new();
//! let ok = Arc::new(Leaf);
//! registry.add(window, "buttons", "ok", &ok).unwrap();
//!
//! assert!(registry.exists(window, "buttons", "ok"));
//! registry.delete(window, "buttons", "-");
//! assert!(!registry.exists(window, "buttons", "ok"));
//! ```

pub mod control;
mod error;
pub mod event;
pub mod key;
pub mod logging;
pub mod native;
pub mod registry;
pub mod value;

pub use control::ControlKind;
pub use error::{Error, Result};
pub use event::{EventKind, EventResult, EventValue, GridCellChange};
pub use key::{IdentityKey, WindowId, overlay_tag, parse_overlay_tag, scoped_tag, validate_tag};
pub use logging::{RegistryDump, TreeStyle};
pub use native::{KeyInput, NativeHandle, NativePayload, NativeSignal};
pub use registry::{ALL_TAGS, EntryId, EntryInfo, RegistryEntry, SharedWidgetRegistry, WidgetRegistry};
pub use value::{UserData, Value, ValueKind};

static_assertions::assert_impl_all!(EventValue: Send, Sync);
static_assertions::assert_impl_all!(UserData: Send, Sync);
