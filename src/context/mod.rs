//! Contextual instance stores, one per scope instance.
//!
//! [`SharedContext`] backs every normal scope (singleton, application,
//! request, custom); [`DependentContext`] is the non-caching pseudo-scope.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::bean::{AnyArc, BeanDef, BeanId};
use crate::container::BeanContext;
use crate::creational::CreationalContext;
use crate::error::{OdiError, OdiResult};
use crate::scope::ScopeKind;

/// A contextual instance store.
///
/// `get` returns the cached instance for a bean or creates one through the
/// bean's factory; `destroy` removes and disposes a single entry. Creation
/// failures propagate from the factory; resolution failures raised while
/// building dependencies pass through unwrapped.
pub trait Context: Send + Sync {
    /// The scope this context serves.
    fn scope(&self) -> ScopeKind;

    /// False once the context has been destroyed.
    fn is_active(&self) -> bool;

    /// Cached-or-created instance for the bean.
    fn get(&self, bean: &Arc<BeanDef>, ctx: &BeanContext<'_>) -> OdiResult<AnyArc>;

    /// Non-creating lookup.
    fn get_if_present(&self, bean: &BeanDef) -> Option<AnyArc>;

    /// Number of live cached instances; always zero for the dependent
    /// pseudo-scope. Creations still in flight are not counted.
    fn instance_count(&self) -> usize;

    /// Removes the bean's entry and invokes its disposer.
    ///
    /// The entry is removed before the disposer runs, so a failing disposer
    /// never leaks the entry; the disposer error propagates to the caller.
    /// Destroying an absent bean is a no-op, which makes repeated destroys
    /// silently idempotent.
    fn destroy(&self, bean: &BeanDef) -> OdiResult<()>;
}

#[derive(Clone)]
struct StoredEntry {
    bean: Arc<BeanDef>,
    instance: AnyArc,
    // Dependents created while constructing this instance; released with it.
    chain: Arc<CreationalContext>,
}

#[derive(Default)]
struct EntrySlot {
    cell: OnceCell<StoredEntry>,
    // Whoever swaps this to true owns destruction of the cell's entry;
    // guarantees exactly one disposal when teardown races a creation.
    reaped: AtomicBool,
}

/// Store for a normal scope: at most one live instance per bean.
///
/// The per-bean `OnceCell` slot guarantees exactly one winning creation under
/// concurrent first access; losing threads block and receive the winner's
/// instance rather than running the factory a second time.
///
/// State machine per context instance: `Active -> Destroyed`, one-way.
/// Operations after [`destroy_all`](SharedContext::destroy_all) fail with
/// [`OdiError::ContextNotActive`].
pub struct SharedContext {
    scope: ScopeKind,
    active: AtomicBool,
    entries: Mutex<HashMap<BeanId, Arc<EntrySlot>>>,
}

impl SharedContext {
    pub(crate) fn new(scope: ScopeKind) -> Self {
        Self {
            scope,
            active: AtomicBool::new(true),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Tears the context down: flips to `Destroyed`, then destroys every
    /// cached entry. Disposer failures are logged and do not stop the
    /// teardown; every entry is removed regardless. Idempotent.
    pub fn destroy_all(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        debug!(scope = ?self.scope, "tearing down context");
        let drained: Vec<Arc<EntrySlot>> = self.entries.lock().drain().map(|(_, s)| s).collect();
        for slot in drained {
            // An empty cell is a creation still in flight; its creator
            // observes the inactive context after filling the cell and
            // reaps its own slot.
            let Some(entry) = slot.cell.get() else { continue };
            if slot.reaped.swap(true, Ordering::AcqRel) {
                continue;
            }
            if let Err(e) = Self::destroy_entry(entry) {
                error!(bean = entry.bean.name(), error = %e, "disposer failed during context teardown");
            }
        }
    }

    fn destroy_entry(entry: &StoredEntry) -> OdiResult<()> {
        let result = entry.bean.destroy(&entry.instance);
        // Dependents must release even when the disposer fails.
        entry.chain.release();
        result
    }
}

impl Context for SharedContext {
    fn scope(&self) -> ScopeKind {
        self.scope
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn get(&self, bean: &Arc<BeanDef>, ctx: &BeanContext<'_>) -> OdiResult<AnyArc> {
        if !self.is_active() {
            return Err(OdiError::ContextNotActive(self.scope));
        }

        let slot = {
            let mut entries = self.entries.lock();
            entries.entry(bean.id()).or_default().clone()
        };

        let entry = slot
            .cell
            .get_or_try_init(|| {
                let chain = Arc::new(CreationalContext::new());
                let inner = ctx.for_chain(&chain);
                // On failure the chain is dropped here, releasing any
                // dependents created by the partial construction.
                let instance = bean.create(&inner)?;
                Ok(StoredEntry {
                    bean: bean.clone(),
                    instance,
                    chain,
                })
            })?
            .clone();

        // A teardown may have run while we were creating. Teardown skips
        // slots whose cells were still empty when it drained, so the loser
        // here must reap its own entry; the `reaped` swap decides which side
        // disposes when both observe the filled cell. Callers racing a
        // teardown see either the pre-destruction instance or this error.
        if !self.is_active() {
            {
                let mut entries = self.entries.lock();
                if entries.get(&bean.id()).is_some_and(|s| Arc::ptr_eq(s, &slot)) {
                    entries.remove(&bean.id());
                }
            }
            if !slot.reaped.swap(true, Ordering::AcqRel) {
                if let Err(e) = Self::destroy_entry(&entry) {
                    warn!(bean = bean.name(), error = %e, "disposer failed while unwinding a creation that lost to teardown");
                }
            }
            return Err(OdiError::ContextNotActive(self.scope));
        }

        Ok(entry.instance)
    }

    fn get_if_present(&self, bean: &BeanDef) -> Option<AnyArc> {
        self.entries
            .lock()
            .get(&bean.id())
            .and_then(|slot| slot.cell.get())
            .map(|entry| entry.instance.clone())
    }

    fn instance_count(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|slot| slot.cell.get().is_some())
            .count()
    }

    fn destroy(&self, bean: &BeanDef) -> OdiResult<()> {
        if !self.is_active() {
            return Err(OdiError::ContextNotActive(self.scope));
        }
        let Some(slot) = self.entries.lock().remove(&bean.id()) else {
            return Ok(());
        };
        match slot.cell.get() {
            Some(entry) if !slot.reaped.swap(true, Ordering::AcqRel) => {
                Self::destroy_entry(entry)
            }
            _ => Ok(()),
        }
    }
}

/// The dependent pseudo-scope: never caches, never shares.
///
/// Every `get` creates a fresh instance and records it on the episode's
/// [`CreationalContext`], so it is released together with the owning lookup.
pub struct DependentContext;

impl Context for DependentContext {
    fn scope(&self) -> ScopeKind {
        ScopeKind::Dependent
    }

    fn is_active(&self) -> bool {
        true
    }

    fn get(&self, bean: &Arc<BeanDef>, ctx: &BeanContext<'_>) -> OdiResult<AnyArc> {
        let instance = bean.create(ctx)?;
        ctx.chain().track(bean.clone(), instance.clone());
        Ok(instance)
    }

    fn get_if_present(&self, _bean: &BeanDef) -> Option<AnyArc> {
        None
    }

    fn instance_count(&self) -> usize {
        0
    }

    fn destroy(&self, _bean: &BeanDef) -> OdiResult<()> {
        // Nothing cached; dependent instances are released by their chain.
        Ok(())
    }
}
