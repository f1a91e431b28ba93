//! Widget registry.
//!
//! The registry is a lookup table from identity keys to live widgets. It never
//! owns a widget: entries hold [`Weak`] references and the container tree keeps
//! the strong ones. What the registry does own is the *native* lifetime of
//! each widget. Removing an entry hands the widget back to the caller to be
//! released (native handle destroyed), children strictly before parents.
//!
//! # Scopes
//!
//! Entries live in per-window buckets named after their parent container. A
//! container registers twice: once in its parent's bucket under its own tag,
//! and once in its own bucket as a *sentinel* self-entry opened by
//! [`WidgetRegistry::open_scope`]. The sentinel lets `get(w, c, c)` resolve
//! the container itself and marks the scope as existing while it is empty.
//!
//! ```text
//! (1, "dialog")      : [dialog*]  [form]
//! (1, "form")        : [form*]    [name]  [files]
//! (1, "files")       : [files*]   [0|row_box]
//! (1, "0|row_box")   : [0|row_box*] [preview]
//! ```
//!
//! # Lookup
//!
//! [`WidgetRegistry::find`] searches three tiers: the named bucket, then the
//! buckets of containers nested below it, then every bucket of the window.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use slotmap::{new_key_type, SlotMap};

use crate::error::{Error, Result};
use crate::key::{scoped_tag, validate_tag, IdentityKey, WindowId};
use crate::logging::targets;

new_key_type! {
    /// Arena key of one registry entry.
    pub struct EntryId;
}

/// The tag that addresses every member of a scope in [`WidgetRegistry::delete`].
pub const ALL_TAGS: &str = "-";

/// Behavior the registry needs from the widgets it tracks.
pub trait RegistryEntry: Send + Sync + 'static {
    /// Whether this widget owns a child scope named after its own tag.
    fn owns_scope(&self) -> bool;

    /// Whether this widget is a control rather than a container. Controls may
    /// still own a scope (a grid owns the scopes of its row widgets).
    fn is_leaf(&self) -> bool {
        !self.owns_scope()
    }

    /// Whether the widget's native resource still exists.
    fn is_live(&self) -> bool;

    /// Destroy the native resource. Called once, after the entry is removed.
    fn release(&self);

    /// Notify the widget that its identity changed through a retag.
    fn set_identity(&self, container_tag: &str, tag: &str);
}

struct Entry<W> {
    container_tag: String,
    tag: String,
    widget: Weak<W>,
    owns_scope: bool,
    leaf: bool,
    sentinel: bool,
}

/// A summary of one registry entry, for inspection and dumps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// The scope the entry lives in.
    pub container_tag: String,
    /// The entry's tag.
    pub tag: String,
    /// Whether the entry is a container with its own scope.
    pub owns_scope: bool,
    /// Whether this is a scope's self-entry.
    pub sentinel: bool,
    /// Whether the widget behind the entry is still alive.
    pub live: bool,
}

type ScopeKey = (WindowId, String);

/// Registry of live widgets keyed by `(window, container_tag, tag)`.
pub struct WidgetRegistry<W: RegistryEntry> {
    entries: SlotMap<EntryId, Entry<W>>,
    scopes: BTreeMap<ScopeKey, Vec<EntryId>>,
}

impl<W: RegistryEntry> WidgetRegistry<W> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: SlotMap::with_key(),
            scopes: BTreeMap::new(),
        }
    }

    /// Register `widget` under `(window_id, container_tag, tag)`.
    ///
    /// An existing entry at the same key is deleted first, recursively if it
    /// is a container; the widgets removed that way are returned so the caller
    /// can release them. Registering the same widget twice is a no-op.
    pub fn add(
        &mut self,
        window_id: WindowId,
        container_tag: &str,
        tag: &str,
        widget: &Arc<W>,
    ) -> Result<Vec<Arc<W>>> {
        validate_tag(container_tag)?;
        validate_tag(tag)?;

        let mut removed = Vec::new();
        if let Some(existing) = self.direct(window_id, container_tag, tag) {
            let same = self
                .entries
                .get(existing)
                .is_some_and(|entry| Weak::ptr_eq(&entry.widget, &Arc::downgrade(widget)));
            if same {
                return Ok(removed);
            }
            tracing::trace!(target: targets::REGISTRY, %window_id, container_tag, tag, "replacing entry");
            self.remove_entry(window_id, existing, &mut removed);
        }

        let id = self.entries.insert(Entry {
            container_tag: container_tag.to_string(),
            tag: tag.to_string(),
            widget: Arc::downgrade(widget),
            owns_scope: widget.owns_scope(),
            leaf: widget.is_leaf(),
            sentinel: false,
        });
        self.scopes
            .entry((window_id, container_tag.to_string()))
            .or_default()
            .push(id);
        tracing::trace!(target: targets::REGISTRY, %window_id, container_tag, tag, "registered widget");
        Ok(removed)
    }

    /// Open the scope of a container by registering its sentinel self-entry.
    ///
    /// Opening an already open scope is a no-op.
    pub fn open_scope(&mut self, window_id: WindowId, container_tag: &str, widget: &Arc<W>) -> Result<()> {
        validate_tag(container_tag)?;
        let key = (window_id, container_tag.to_string());
        if let Some(ids) = self.scopes.get(&key) {
            if ids.iter().any(|id| self.entries.get(*id).is_some_and(|e| e.sentinel)) {
                return Ok(());
            }
        }
        let id = self.entries.insert(Entry {
            container_tag: container_tag.to_string(),
            tag: container_tag.to_string(),
            widget: Arc::downgrade(widget),
            owns_scope: true,
            leaf: false,
            sentinel: true,
        });
        // The sentinel always sits first in its bucket.
        self.scopes.entry(key).or_default().insert(0, id);
        tracing::trace!(target: targets::REGISTRY, %window_id, container_tag, "opened scope");
        Ok(())
    }

    /// Delete an entry, or a whole scope.
    ///
    /// With `tag == "-"` or `tag == container_tag` every entry of the scope is
    /// deleted, nested containers first, and the bucket is removed. Otherwise
    /// the single entry is deleted, after its own scope if it is a container.
    /// Deleting something that is not registered does nothing.
    ///
    /// Returns the removed widgets in release order (children first).
    pub fn delete(&mut self, window_id: WindowId, container_tag: &str, tag: &str) -> Vec<Arc<W>> {
        let mut removed = Vec::new();
        if tag == ALL_TAGS || tag == container_tag {
            self.remove_scope(window_id, container_tag, &mut removed);
        } else if let Some(id) = self.direct(window_id, container_tag, tag) {
            self.remove_entry(window_id, id, &mut removed);
        } else {
            tracing::trace!(target: targets::REGISTRY, %window_id, container_tag, tag, "delete of unregistered tag ignored");
        }
        removed
    }

    /// Delete every scope that belongs to a window.
    pub fn delete_window(&mut self, window_id: WindowId) -> Vec<Arc<W>> {
        let mut removed = Vec::new();
        for container_tag in self.root_scopes(window_id) {
            self.remove_scope(window_id, &container_tag, &mut removed);
        }
        removed
    }

    /// Whether a widget can be found under the key.
    pub fn exists(&self, window_id: WindowId, container_tag: &str, tag: &str) -> bool {
        self.find(window_id, container_tag, tag).is_some()
    }

    /// Look up a widget, failing if no search tier finds it.
    pub fn get(&self, window_id: WindowId, container_tag: &str, tag: &str) -> Result<Arc<W>> {
        self.find(window_id, container_tag, tag)
            .ok_or_else(|| Error::not_found(window_id, container_tag, tag))
    }

    /// Look up a widget: direct, then nested scopes, then every scope of the
    /// window.
    pub fn find(&self, window_id: WindowId, container_tag: &str, tag: &str) -> Option<Arc<W>> {
        if let Some(widget) = self.find_nested(window_id, container_tag, tag) {
            return Some(widget);
        }

        let fallback = self
            .window_scopes(window_id)
            .flat_map(|(_, ids)| ids.iter())
            .filter_map(|id| self.entries.get(*id))
            .filter(|entry| entry.tag == tag)
            .find_map(|entry| entry.widget.upgrade());
        if fallback.is_some() {
            tracing::trace!(target: targets::REGISTRY, %window_id, container_tag, tag, "resolved by window scan");
        }
        fallback
    }

    fn find_nested(&self, window_id: WindowId, container_tag: &str, tag: &str) -> Option<Arc<W>> {
        let ids = self.scopes.get(&(window_id, container_tag.to_string()))?;

        if let Some(widget) = ids
            .iter()
            .filter_map(|id| self.entries.get(*id))
            .filter(|entry| entry.tag == tag)
            .find_map(|entry| entry.widget.upgrade())
        {
            return Some(widget);
        }

        ids.iter()
            .filter_map(|id| self.entries.get(*id))
            .filter(|entry| entry.owns_scope && !entry.sentinel)
            .find_map(|entry| self.find_nested(window_id, &entry.tag, tag))
    }

    /// Leaf controls registered directly under a container, in insertion order.
    pub fn controls_of(&self, window_id: WindowId, container_tag: &str) -> Vec<Arc<W>> {
        self.members(window_id, container_tag)
            .filter(|entry| entry.leaf)
            .filter_map(|entry| entry.widget.upgrade())
            .collect()
    }

    /// Every member (leaf or container) registered directly under a container,
    /// keyed by tag, in insertion order.
    pub fn members_of(&self, window_id: WindowId, container_tag: &str) -> Vec<(String, Arc<W>)> {
        self.members(window_id, container_tag)
            .filter_map(|entry| entry.widget.upgrade().map(|w| (entry.tag.clone(), w)))
            .collect()
    }

    fn members(&self, window_id: WindowId, container_tag: &str) -> impl Iterator<Item = &Entry<W>> {
        self.scopes
            .get(&(window_id, container_tag.to_string()))
            .into_iter()
            .flat_map(|ids| ids.iter())
            .filter_map(|id| self.entries.get(*id))
            .filter(|entry| !entry.sentinel)
    }

    /// Rename an entry in place.
    ///
    /// If the entry is a container its scope moves with it and every member of
    /// that scope is told its new container tag.
    pub fn retag(&mut self, window_id: WindowId, container_tag: &str, old_tag: &str, new_tag: &str) -> Result<()> {
        validate_tag(new_tag)?;
        if old_tag == new_tag {
            return Ok(());
        }
        let id = self
            .direct(window_id, container_tag, old_tag)
            .ok_or_else(|| Error::not_found(window_id, container_tag, old_tag))?;
        let moves_scope = self.entries.get(id).is_some_and(|entry| entry.owns_scope);
        if self.direct(window_id, container_tag, new_tag).is_some()
            || (moves_scope && self.scopes.contains_key(&(window_id, new_tag.to_string())))
        {
            return Err(Error::TagInUse {
                container_tag: container_tag.to_string(),
                tag: new_tag.to_string(),
            });
        }

        if let Some(entry) = self.entries.get_mut(id) {
            entry.tag = new_tag.to_string();
            if let Some(widget) = entry.widget.upgrade() {
                widget.set_identity(container_tag, new_tag);
            }
        }

        if moves_scope {
            if let Some(ids) = self.scopes.remove(&(window_id, old_tag.to_string())) {
                for member in &ids {
                    if let Some(entry) = self.entries.get_mut(*member) {
                        entry.container_tag = new_tag.to_string();
                        if entry.sentinel {
                            entry.tag = new_tag.to_string();
                        } else if let Some(widget) = entry.widget.upgrade() {
                            widget.set_identity(new_tag, &entry.tag);
                        }
                    }
                }
                self.scopes.insert((window_id, new_tag.to_string()), ids);
            }
        }

        tracing::trace!(target: targets::REGISTRY, %window_id, container_tag, old_tag, new_tag, "retagged entry");
        Ok(())
    }

    /// Number of registered widgets, sentinels excluded.
    pub fn len(&self) -> usize {
        self.entries.values().filter(|entry| !entry.sentinel).count()
    }

    /// Whether nothing is registered, not even a scope sentinel.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of open scopes across all windows.
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// Number of registered widgets in one window, sentinels excluded.
    pub fn window_len(&self, window_id: WindowId) -> usize {
        self.window_scopes(window_id)
            .flat_map(|(_, ids)| ids.iter())
            .filter_map(|id| self.entries.get(*id))
            .filter(|entry| !entry.sentinel)
            .count()
    }

    /// Identity keys of every registered widget, sentinels excluded.
    pub fn keys(&self) -> Vec<IdentityKey> {
        self.scopes
            .iter()
            .flat_map(|((window_id, _), ids)| ids.iter().map(move |id| (*window_id, id)))
            .filter_map(|(window_id, id)| self.entries.get(*id).map(|entry| (window_id, entry)))
            .filter(|(_, entry)| !entry.sentinel)
            .map(|(window_id, entry)| IdentityKey {
                window_id,
                container_tag: entry.container_tag.clone(),
                tag: entry.tag.clone(),
            })
            .collect()
    }

    /// Namespaced names (`"{window}_{container}"`) of a window's scopes.
    pub fn scope_names(&self, window_id: WindowId) -> Vec<String> {
        self.window_scopes(window_id)
            .map(|((window_id, container_tag), _)| scoped_tag(*window_id, container_tag))
            .collect()
    }

    /// Summaries of the entries in one scope, sentinel first.
    pub fn scope_entries(&self, window_id: WindowId, container_tag: &str) -> Option<Vec<EntryInfo>> {
        let ids = self.scopes.get(&(window_id, container_tag.to_string()))?;
        Some(
            ids.iter()
                .filter_map(|id| self.entries.get(*id))
                .map(|entry| EntryInfo {
                    container_tag: entry.container_tag.clone(),
                    tag: entry.tag.clone(),
                    owns_scope: entry.owns_scope,
                    sentinel: entry.sentinel,
                    live: entry
                        .widget
                        .upgrade()
                        .is_some_and(|widget| widget.is_live()),
                })
                .collect(),
        )
    }

    /// Scopes of a window that no other scope of the window contains.
    pub fn root_scopes(&self, window_id: WindowId) -> Vec<String> {
        let nested: Vec<&str> = self
            .window_scopes(window_id)
            .flat_map(|(_, ids)| ids.iter())
            .filter_map(|id| self.entries.get(*id))
            .filter(|entry| entry.owns_scope && !entry.sentinel)
            .map(|entry| entry.tag.as_str())
            .collect();
        self.window_scopes(window_id)
            .map(|((_, container_tag), _)| container_tag)
            .filter(|container_tag| !nested.contains(&container_tag.as_str()))
            .cloned()
            .collect()
    }

    fn window_scopes(&self, window_id: WindowId) -> impl Iterator<Item = (&ScopeKey, &Vec<EntryId>)> {
        self.scopes
            .range((window_id, String::new())..)
            .take_while(move |((window, _), _)| *window == window_id)
    }

    fn direct(&self, window_id: WindowId, container_tag: &str, tag: &str) -> Option<EntryId> {
        self.scopes
            .get(&(window_id, container_tag.to_string()))?
            .iter()
            .copied()
            .find(|id| {
                self.entries
                    .get(*id)
                    .is_some_and(|entry| !entry.sentinel && entry.tag == tag)
            })
    }

    // Post-order: a container's scope is emptied before the container goes.
    fn remove_entry(&mut self, window_id: WindowId, id: EntryId, removed: &mut Vec<Arc<W>>) {
        let Some(entry) = self.entries.get(id) else {
            return;
        };
        if entry.owns_scope && !entry.sentinel {
            let child_scope = entry.tag.clone();
            self.remove_scope(window_id, &child_scope, removed);
        }

        let Some(entry) = self.entries.remove(id) else {
            return;
        };
        let key = (window_id, entry.container_tag.clone());
        let only_sentinels_left = match self.scopes.get_mut(&key) {
            Some(ids) => {
                ids.retain(|member| *member != id);
                ids.iter()
                    .all(|member| self.entries.get(*member).is_some_and(|left| left.sentinel))
            }
            None => false,
        };
        tracing::trace!(target: targets::REGISTRY, %window_id, container_tag = %entry.container_tag, tag = %entry.tag, "deleted entry");

        // A bucket holding nothing but its sentinel goes with its last member.
        if only_sentinels_left {
            if let Some(ids) = self.scopes.remove(&key) {
                for sentinel in ids {
                    self.entries.remove(sentinel);
                }
                tracing::trace!(target: targets::REGISTRY, %window_id, container_tag = %entry.container_tag, "deleted emptied scope");
            }
        }

        if !entry.sentinel {
            if let Some(widget) = entry.widget.upgrade() {
                removed.push(widget);
            }
        }
    }

    fn remove_scope(&mut self, window_id: WindowId, container_tag: &str, removed: &mut Vec<Arc<W>>) {
        let Some(ids) = self.scopes.get(&(window_id, container_tag.to_string())).cloned() else {
            tracing::trace!(target: targets::REGISTRY, %window_id, container_tag, "delete of unknown scope ignored");
            return;
        };
        let (sentinels, members): (Vec<EntryId>, Vec<EntryId>) = ids
            .into_iter()
            .partition(|id| self.entries.get(*id).is_some_and(|entry| entry.sentinel));
        for id in members.into_iter().chain(sentinels) {
            self.remove_entry(window_id, id, removed);
        }
        self.scopes.remove(&(window_id, container_tag.to_string()));
        tracing::trace!(target: targets::REGISTRY, %window_id, container_tag, "deleted scope");
    }
}

impl<W: RegistryEntry> Default for WidgetRegistry<W> {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe, cloneable handle to a [`WidgetRegistry`].
///
/// Mutations collect removed widgets under the write lock and release them
/// after it is dropped, so a widget's `release` may look the registry up
/// again without deadlocking.
pub struct SharedWidgetRegistry<W: RegistryEntry> {
    inner: Arc<RwLock<WidgetRegistry<W>>>,
}

impl<W: RegistryEntry> Clone for SharedWidgetRegistry<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: RegistryEntry> SharedWidgetRegistry<W> {
    /// Create an empty shared registry.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(WidgetRegistry::new())),
        }
    }

    /// See [`WidgetRegistry::add`]. Replaced widgets are released.
    pub fn add(&self, window_id: WindowId, container_tag: &str, tag: &str, widget: &Arc<W>) -> Result<()> {
        let removed = self.inner.write().add(window_id, container_tag, tag, widget)?;
        release_all(removed);
        Ok(())
    }

    /// See [`WidgetRegistry::open_scope`].
    pub fn open_scope(&self, window_id: WindowId, container_tag: &str, widget: &Arc<W>) -> Result<()> {
        self.inner.write().open_scope(window_id, container_tag, widget)
    }

    /// See [`WidgetRegistry::delete`]. Removed widgets are released.
    pub fn delete(&self, window_id: WindowId, container_tag: &str, tag: &str) -> usize {
        let removed = self.inner.write().delete(window_id, container_tag, tag);
        let count = removed.len();
        release_all(removed);
        count
    }

    /// See [`WidgetRegistry::delete_window`]. Removed widgets are released.
    pub fn delete_window(&self, window_id: WindowId) -> usize {
        let removed = self.inner.write().delete_window(window_id);
        let count = removed.len();
        release_all(removed);
        count
    }

    /// See [`WidgetRegistry::exists`].
    pub fn exists(&self, window_id: WindowId, container_tag: &str, tag: &str) -> bool {
        self.inner.read().exists(window_id, container_tag, tag)
    }

    /// See [`WidgetRegistry::get`].
    pub fn get(&self, window_id: WindowId, container_tag: &str, tag: &str) -> Result<Arc<W>> {
        self.inner.read().get(window_id, container_tag, tag)
    }

    /// See [`WidgetRegistry::find`].
    pub fn find(&self, window_id: WindowId, container_tag: &str, tag: &str) -> Option<Arc<W>> {
        self.inner.read().find(window_id, container_tag, tag)
    }

    /// See [`WidgetRegistry::controls_of`].
    pub fn controls_of(&self, window_id: WindowId, container_tag: &str) -> Vec<Arc<W>> {
        self.inner.read().controls_of(window_id, container_tag)
    }

    /// See [`WidgetRegistry::members_of`].
    pub fn members_of(&self, window_id: WindowId, container_tag: &str) -> Vec<(String, Arc<W>)> {
        self.inner.read().members_of(window_id, container_tag)
    }

    /// See [`WidgetRegistry::retag`].
    pub fn retag(&self, window_id: WindowId, container_tag: &str, old_tag: &str, new_tag: &str) -> Result<()> {
        self.inner.write().retag(window_id, container_tag, old_tag, new_tag)
    }

    /// See [`WidgetRegistry::len`].
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// See [`WidgetRegistry::is_empty`].
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// See [`WidgetRegistry::window_len`].
    pub fn window_len(&self, window_id: WindowId) -> usize {
        self.inner.read().window_len(window_id)
    }

    /// See [`WidgetRegistry::scope_count`].
    pub fn scope_count(&self) -> usize {
        self.inner.read().scope_count()
    }

    /// See [`WidgetRegistry::keys`].
    pub fn keys(&self) -> Vec<IdentityKey> {
        self.inner.read().keys()
    }

    /// Run a closure with read access to the registry.
    pub fn with_read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&WidgetRegistry<W>) -> R,
    {
        f(&self.inner.read())
    }
}

impl<W: RegistryEntry> Default for SharedWidgetRegistry<W> {
    fn default() -> Self {
        Self::new()
    }
}

fn release_all<W: RegistryEntry>(removed: Vec<Arc<W>>) {
    for widget in removed {
        if widget.is_live() {
            widget.release();
        } else {
            tracing::debug!(target: targets::REGISTRY, "native resource already gone, skipping release");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeWidget {
        name: Mutex<String>,
        container: bool,
        live: AtomicBool,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl FakeWidget {
        fn leaf(name: &str, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Self::make(name, false, log)
        }

        fn container(name: &str, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Self::make(name, true, log)
        }

        fn make(name: &str, container: bool, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                name: Mutex::new(name.to_string()),
                container,
                live: AtomicBool::new(true),
                log: Arc::clone(log),
            })
        }
    }

    impl RegistryEntry for FakeWidget {
        fn owns_scope(&self) -> bool {
            self.container
        }

        fn is_live(&self) -> bool {
            self.live.load(Ordering::Acquire)
        }

        fn release(&self) {
            self.live.store(false, Ordering::Release);
            self.log.lock().push(self.name.lock().clone());
        }

        fn set_identity(&self, _container_tag: &str, tag: &str) {
            *self.name.lock() = tag.to_string();
        }
    }

    fn w(raw: u32) -> WindowId {
        WindowId::new(raw).unwrap()
    }

    /// dialog > form > (name, files > (cell))
    fn tree(
        registry: &mut WidgetRegistry<FakeWidget>,
        log: &Arc<Mutex<Vec<String>>>,
    ) -> Vec<Arc<FakeWidget>> {
        let dialog = FakeWidget::container("dialog", log);
        let form = FakeWidget::container("form", log);
        let name = FakeWidget::leaf("name", log);
        let files = FakeWidget::container("files", log);
        let cell = FakeWidget::leaf("cell", log);

        registry.open_scope(w(1), "dialog", &dialog).unwrap();
        registry.add(w(1), "dialog", "form", &form).unwrap();
        registry.open_scope(w(1), "form", &form).unwrap();
        registry.add(w(1), "form", "name", &name).unwrap();
        registry.add(w(1), "form", "files", &files).unwrap();
        registry.open_scope(w(1), "files", &files).unwrap();
        registry.add(w(1), "files", "cell", &cell).unwrap();
        vec![dialog, form, name, files, cell]
    }

    #[test]
    fn test_add_and_get() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = WidgetRegistry::new();
        let _keep = tree(&mut registry, &log);

        assert!(registry.exists(w(1), "form", "name"));
        assert_eq!(*registry.get(w(1), "form", "name").unwrap().name.lock(), "name");
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.scope_count(), 3);
    }

    #[test]
    fn test_readd_replaces_and_releases_old_entry() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = WidgetRegistry::new();
        let first = FakeWidget::leaf("first", &log);
        let second = FakeWidget::leaf("second", &log);

        registry.add(w(1), "form", "ok", &first).unwrap();
        let removed = registry.add(w(1), "form", "ok", &second).unwrap();
        assert_eq!(removed.len(), 1);
        assert!(Arc::ptr_eq(&removed[0], &first));

        let keys = registry.keys();
        assert_eq!(keys.len(), 1);
        assert!(Arc::ptr_eq(&registry.get(w(1), "form", "ok").unwrap(), &second));
    }

    #[test]
    fn test_readd_same_widget_is_noop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = WidgetRegistry::new();
        let leaf = FakeWidget::leaf("ok", &log);
        registry.add(w(1), "form", "ok", &leaf).unwrap();
        assert!(registry.add(w(1), "form", "ok", &leaf).unwrap().is_empty());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_delete_container_is_post_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let shared = SharedWidgetRegistry::new();
        let mut keep = Vec::new();
        {
            let mut registry = shared.inner.write();
            keep.extend(tree(&mut registry, &log));
        }

        let count = shared.delete(w(1), "dialog", "form");
        assert_eq!(count, 4);
        assert_eq!(*log.lock(), vec!["name", "cell", "files", "form"]);

        for tag in ["form", "name", "files", "cell"] {
            assert!(!shared.exists(w(1), "dialog", tag));
        }
        // "dialog" lost its only member, so its bucket went too.
        assert_eq!(shared.scope_count(), 0);
    }

    #[test]
    fn test_deleting_last_member_drops_bucket() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = WidgetRegistry::new();
        let dialog = FakeWidget::container("dialog", &log);
        let form = FakeWidget::container("form", &log);
        let ok = FakeWidget::leaf("ok", &log);
        let cancel = FakeWidget::leaf("cancel", &log);

        registry.open_scope(w(1), "dialog", &dialog).unwrap();
        registry.add(w(1), "dialog", "form", &form).unwrap();
        registry.open_scope(w(1), "form", &form).unwrap();
        registry.add(w(1), "form", "ok", &ok).unwrap();
        registry.add(w(1), "form", "cancel", &cancel).unwrap();
        assert_eq!(registry.scope_count(), 2);

        assert_eq!(registry.delete(w(1), "form", "ok").len(), 1);
        assert_eq!(registry.scope_count(), 2);
        assert_eq!(registry.scope_entries(w(1), "form").unwrap().len(), 2);

        assert_eq!(registry.delete(w(1), "form", "cancel").len(), 1);
        assert_eq!(registry.scope_count(), 1);
        assert!(registry.scope_entries(w(1), "form").is_none());
        // The container itself is still a member of its parent.
        assert!(registry.exists(w(1), "dialog", "form"));
        assert_eq!(registry.len(), 1);

        // Reopening and adding starts a fresh bucket.
        registry.open_scope(w(1), "form", &form).unwrap();
        registry.add(w(1), "form", "ok", &ok).unwrap();
        let entries = registry.scope_entries(w(1), "form").unwrap();
        assert!(entries[0].sentinel);
        assert_eq!(entries[1].tag, "ok");
    }

    #[test]
    fn test_delete_scope_by_dash_or_own_tag() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = WidgetRegistry::new();
        let _keep = tree(&mut registry, &log);

        let removed = registry.delete(w(1), "files", "-");
        assert_eq!(removed.len(), 1);
        assert!(registry.scope_entries(w(1), "files").is_none());
        // The container itself stays registered in its parent.
        assert!(registry.exists(w(1), "form", "files"));

        let removed = registry.delete(w(1), "dialog", "dialog");
        assert_eq!(removed.len(), 3);
        assert!(registry.is_empty());
        assert_eq!(registry.scope_count(), 0);
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = WidgetRegistry::new();
        let _keep = tree(&mut registry, &log);
        assert!(registry.delete(w(1), "form", "nope").is_empty());
        assert!(registry.delete(w(9), "nope", "-").is_empty());
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_three_tier_lookup() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = WidgetRegistry::new();
        let _keep = tree(&mut registry, &log);

        // Direct.
        assert!(registry.find(w(1), "files", "cell").is_some());
        // Nested below the named scope.
        assert!(registry.find(w(1), "dialog", "cell").is_some());
        // Window scan from an unrelated scope name.
        assert!(registry.find(w(1), "elsewhere", "name").is_some());
        // Never across windows.
        assert!(registry.find(w(2), "form", "name").is_none());
        assert!(matches!(
            registry.get(w(1), "form", "missing"),
            Err(Error::WidgetNotFound { .. })
        ));
    }

    #[test]
    fn test_same_container_tag_in_two_windows() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = WidgetRegistry::new();
        let a = FakeWidget::leaf("a", &log);
        let b = FakeWidget::leaf("b", &log);
        registry.add(w(1), "form", "ok", &a).unwrap();
        registry.add(w(2), "form", "ok", &b).unwrap();

        assert!(Arc::ptr_eq(&registry.get(w(1), "form", "ok").unwrap(), &a));
        assert!(Arc::ptr_eq(&registry.get(w(2), "form", "ok").unwrap(), &b));
        assert_eq!(registry.delete_window(w(1)).len(), 1);
        assert!(registry.exists(w(2), "form", "ok"));
        assert_eq!(registry.scope_names(w(2)), vec!["2_form".to_string()]);
    }

    #[test]
    fn test_controls_of_excludes_containers() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = WidgetRegistry::new();
        let _keep = tree(&mut registry, &log);

        let controls = registry.controls_of(w(1), "form");
        assert_eq!(controls.len(), 1);
        assert_eq!(*controls[0].name.lock(), "name");
        assert_eq!(registry.members_of(w(1), "form").len(), 2);
    }

    #[test]
    fn test_retag_moves_child_scope() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = WidgetRegistry::new();
        let _keep = tree(&mut registry, &log);

        registry.retag(w(1), "form", "files", "media").unwrap();
        assert!(registry.exists(w(1), "form", "media"));
        assert!(registry.scope_entries(w(1), "files").is_none());
        let entries = registry.scope_entries(w(1), "media").unwrap();
        assert!(entries[0].sentinel);
        assert_eq!(entries[0].tag, "media");
        assert_eq!(entries[1].container_tag, "media");

        assert!(matches!(
            registry.retag(w(1), "form", "media", "name"),
            Err(Error::TagInUse { .. })
        ));
    }

    #[test]
    fn test_dropped_widget_is_not_found() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = WidgetRegistry::new();
        {
            let temp = FakeWidget::leaf("temp", &log);
            registry.add(w(1), "form", "temp", &temp).unwrap();
        }
        assert!(!registry.exists(w(1), "form", "temp"));
    }

    #[test]
    fn test_release_skips_dead_native() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let shared = SharedWidgetRegistry::new();
        let leaf = FakeWidget::leaf("gone", &log);
        shared.add(w(1), "form", "gone", &leaf).unwrap();
        leaf.live.store(false, Ordering::Release);

        assert_eq!(shared.delete(w(1), "form", "gone"), 1);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_root_scopes() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = WidgetRegistry::new();
        let _keep = tree(&mut registry, &log);
        assert_eq!(registry.root_scopes(w(1)), vec!["dialog".to_string()]);
    }
}
