//! Modal window tracking.
//!
//! Every dialog shell pushes its window onto the [`ModalStack`] of its
//! context when it opens and pops it on teardown. The most recently opened
//! window is on top; signals from any other open window are blocked until it
//! closes.

use cinegrid_core::WindowId;
use parking_lot::Mutex;

#[derive(Debug, Clone)]
struct ModalEntry {
    window_id: WindowId,
    tag: String,
}

/// Stack of open modal windows, owned by one [`AppContext`](crate::AppContext).
#[derive(Debug, Default)]
pub struct ModalStack {
    stack: Mutex<Vec<ModalEntry>>,
}

impl ModalStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a window. Pushing a window already on the stack does nothing.
    pub fn push(&self, window_id: WindowId, tag: &str) {
        let mut stack = self.stack.lock();
        if stack.iter().any(|e| e.window_id == window_id) {
            return;
        }
        stack.push(ModalEntry {
            window_id,
            tag: tag.to_string(),
        });
    }

    /// Remove a window wherever it sits in the stack.
    ///
    /// Returns `true` if the window was found.
    pub fn pop(&self, window_id: WindowId) -> bool {
        let mut stack = self.stack.lock();
        if let Some(pos) = stack.iter().position(|e| e.window_id == window_id) {
            stack.remove(pos);
            true
        } else {
            false
        }
    }

    /// The topmost window.
    pub fn active(&self) -> Option<WindowId> {
        self.stack.lock().last().map(|e| e.window_id)
    }

    /// Tag of the topmost window's dialog.
    pub fn active_tag(&self) -> Option<String> {
        self.stack.lock().last().map(|e| e.tag.clone())
    }

    /// Number of open modal windows.
    pub fn depth(&self) -> usize {
        self.stack.lock().len()
    }

    /// Whether the window is on the stack.
    pub fn contains(&self, window_id: WindowId) -> bool {
        self.stack.lock().iter().any(|e| e.window_id == window_id)
    }

    /// Whether input to a window should be blocked: it is open but another
    /// window was opened after it.
    pub fn is_blocked(&self, window_id: WindowId) -> bool {
        let stack = self.stack.lock();
        match stack.last() {
            Some(top) if top.window_id != window_id => stack.iter().any(|e| e.window_id == window_id),
            _ => false,
        }
    }

    /// Tags of the open windows, bottom first.
    pub fn tags(&self) -> Vec<String> {
        self.stack.lock().iter().map(|e| e.tag.clone()).collect()
    }

    /// Forget every window.
    pub fn clear(&self) {
        self.stack.lock().clear();
    }
}
