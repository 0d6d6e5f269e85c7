//! Dependent chain tracking for creation episodes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::error;

use crate::bean::{AnyArc, BeanDef};

struct DependentEntry {
    bean: Arc<BeanDef>,
    instance: AnyArc,
}

/// Tracks dependent-scoped instances created during one resolution episode.
///
/// One chain belongs to exactly one episode: an [`Instance`](crate::Instance)
/// facade, a [`Handle`](crate::Handle), or a cached normal-scope entry (whose
/// dependents form its cleanup chain). Chains are never shared across episodes.
///
/// [`release`](CreationalContext::release) destroys every recorded instance
/// exactly once; `Drop` calls it too, so release happens on every exit path of
/// the episode, success or failure.
pub struct CreationalContext {
    dependents: Mutex<Vec<DependentEntry>>,
    released: AtomicBool,
}

impl CreationalContext {
    pub(crate) fn new() -> Self {
        Self {
            dependents: Mutex::new(Vec::new()),
            released: AtomicBool::new(false),
        }
    }

    /// Records a freshly created dependent instance for later release.
    pub(crate) fn track(&self, bean: Arc<BeanDef>, instance: AnyArc) {
        self.dependents.lock().push(DependentEntry { bean, instance });
    }

    /// Number of dependents currently tracked by this chain.
    pub fn dependent_count(&self) -> usize {
        self.dependents.lock().len()
    }

    /// Releases every tracked dependent exactly once.
    ///
    /// Repeated calls are no-ops. Disposal runs in reverse creation order;
    /// a failing disposer is logged and does not prevent the remaining
    /// members from being released.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut drained = std::mem::take(&mut *self.dependents.lock());
        while let Some(entry) = drained.pop() {
            if let Err(e) = entry.bean.destroy(&entry.instance) {
                error!(bean = entry.bean.name(), error = %e, "dependent disposer failed");
            }
        }
    }
}

impl Drop for CreationalContext {
    fn drop(&mut self) {
        self.release();
    }
}
