//! Integration tests for registry identity and recursive delete.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use cinegrid_core::{IdentityKey, RegistryEntry, SharedWidgetRegistry, WindowId};

static RELEASED: AtomicUsize = AtomicUsize::new(0);

struct TestWidget {
    container: bool,
    live: AtomicBool,
}

impl TestWidget {
    fn new(container: bool) -> Arc<Self> {
        Arc::new(Self {
            container,
            live: AtomicBool::new(true),
        })
    }
}

impl RegistryEntry for TestWidget {
    fn owns_scope(&self) -> bool {
        self.container
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    fn release(&self) {
        assert!(self.live.swap(false, Ordering::AcqRel), "released twice");
        RELEASED.fetch_add(1, Ordering::Relaxed);
    }

    fn set_identity(&self, _container_tag: &str, _tag: &str) {}
}

fn window(raw: u32) -> WindowId {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("cinegrid_core::registry=trace")
        .with_test_writer()
        .try_init();
    WindowId::new(raw).unwrap()
}

#[test]
fn test_identity_stays_unique_across_add_delete_sequences() {
    let registry = SharedWidgetRegistry::new();
    let mut owned = Vec::new();
    let tags = ["ok", "cancel", "name", "folder"];
    let scopes = ["form", "buttons"];

    // A fixed, interleaved sequence of adds, re-adds and deletes.
    let mut step = 7usize;
    for round in 0..200 {
        step = (step * 31 + 17) % 1009;
        let w = window(1 + (step % 2) as u32);
        let scope = scopes[step % scopes.len()];
        let tag = tags[(step / 3) % tags.len()];

        if round % 5 == 4 {
            registry.delete(w, scope, tag);
        } else {
            let widget = TestWidget::new(false);
            registry.add(w, scope, tag, &widget).unwrap();
            owned.push(widget);
        }

        let keys = registry.keys();
        let unique: HashSet<IdentityKey> = keys.iter().cloned().collect();
        assert_eq!(keys.len(), unique.len(), "duplicate key after round {round}");
    }

    let live = owned.iter().filter(|w| w.is_live()).count();
    assert_eq!(live, registry.len());
}

#[test]
fn test_recursive_delete_leaves_no_orphans() {
    let registry = SharedWidgetRegistry::new();
    let w = window(3);
    let mut owned = Vec::new();

    // root > level0 > level1 > level2, each level with two leaves.
    let root = TestWidget::new(true);
    registry.open_scope(w, "root", &root).unwrap();
    owned.push(root);

    let mut parent = "root".to_string();
    let mut descendants = Vec::new();
    for depth in 0..3 {
        let tag = format!("level{depth}");
        let container = TestWidget::new(true);
        registry.add(w, &parent, &tag, &container).unwrap();
        registry.open_scope(w, &tag, &container).unwrap();
        owned.push(container);
        descendants.push((parent.clone(), tag.clone()));

        for leaf in ["a", "b"] {
            let leaf_tag = format!("{tag}_{leaf}");
            let widget = TestWidget::new(false);
            registry.add(w, &tag, &leaf_tag, &widget).unwrap();
            owned.push(widget);
            descendants.push((tag.clone(), leaf_tag));
        }
        parent = tag;
    }

    let before = RELEASED.load(Ordering::Relaxed);
    let removed = registry.delete(w, "root", "level0");
    assert_eq!(removed, 9);
    assert!(RELEASED.load(Ordering::Relaxed) >= before + 9);

    for (container_tag, tag) in &descendants {
        assert!(!registry.exists(w, container_tag, tag), "{container_tag}/{tag} survived");
    }
    assert_eq!(registry.window_len(w), 0);
    // The root lost its only member, so no bucket is left at all.
    assert_eq!(registry.scope_count(), 0);
}
