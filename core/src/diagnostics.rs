//! Replay diagnostics.
//!
//! Every diagnostic goes to `tracing` under the `domreplay` target and into a
//! bounded ring kept for inspection. Nothing in the engine reads the ring back
//! to make decisions.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

pub const TARGET: &str = "domreplay";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Debug,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug)]
struct Inner {
    ring: VecDeque<Diagnostic>,
    cap: usize,
    show_warning: bool,
    show_debug: bool,
}

/// Cloneable handle to one replayer's diagnostic ring.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    inner: Rc<RefCell<Inner>>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(256, true, false)
    }
}

impl Diagnostics {
    pub fn new(cap: usize, show_warning: bool, show_debug: bool) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                ring: VecDeque::with_capacity(cap.min(1024)),
                cap: cap.max(1),
                show_warning,
                show_debug,
            })),
        }
    }

    pub fn set_visibility(&self, show_warning: bool, show_debug: bool) {
        let mut g = self.inner.borrow_mut();
        g.show_warning = show_warning;
        g.show_debug = show_debug;
    }

    pub fn warn(&self, message: impl Into<String>) {
        if !self.inner.borrow().show_warning {
            return;
        }
        let message = message.into();
        tracing::warn!(target: TARGET, "{message}");
        self.push(Severity::Warning, message);
    }

    pub fn debug(&self, message: impl Into<String>) {
        if !self.inner.borrow().show_debug {
            return;
        }
        let message = message.into();
        tracing::debug!(target: TARGET, "{message}");
        self.push(Severity::Debug, message);
    }

    fn push(&self, severity: Severity, message: String) {
        let mut g = self.inner.borrow_mut();
        if g.ring.len() >= g.cap {
            g.ring.pop_front();
        }
        g.ring.push_back(Diagnostic { severity, message });
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.inner.borrow().ring.iter().cloned().collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.inner
            .borrow()
            .ring
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .map(|d| d.message.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.inner.borrow_mut().ring.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_keeps_the_newest_entries() {
        let diag = Diagnostics::new(2, true, true);
        diag.warn("a");
        diag.debug("b");
        diag.warn("c");
        let messages: Vec<_> = diag.entries().into_iter().map(|d| d.message).collect();
        assert_eq!(messages, vec!["b", "c"]);
        assert_eq!(diag.warnings(), vec!["c"]);
    }

    #[test]
    fn hidden_levels_are_not_recorded() {
        let diag = Diagnostics::new(8, false, false);
        diag.warn("a");
        diag.debug("b");
        assert!(diag.entries().is_empty());
    }
}
