//! The programmatic lookup facade and its handles.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::bean::{AnyArc, BeanDef};
use crate::container::{cast_view, OdiContainer};
use crate::creational::CreationalContext;
use crate::error::{OdiError, OdiResult};
use crate::key::TypeKey;
use crate::qualifier::{Annotation, QualifierSet};
use crate::resolution;
use crate::scope::ScopeKind;

/// A lazy, re-narrowable lookup handle for beans of type `T`.
///
/// Resolution runs on first use and is cached on the facade, so repeated
/// `get`/`is_ambiguous`/`is_unsatisfied` calls never re-run selection.
/// Dependent-scoped instances obtained through [`get`](Instance::get) are
/// tracked on the facade's creation episode and released when the facade is
/// dropped (or via [`destroy_dependents`](Instance::destroy_dependents)).
///
/// # Examples
///
/// ```rust
/// use odi::{Annotation, BeanCollection};
///
/// struct Connection {
///     url: &'static str,
/// }
///
/// let mut beans = BeanCollection::new();
/// beans.register::<Connection>()
///     .application_scoped()
///     .qualified(Annotation::qualifier("Backup"))
///     .with(|_| Connection { url: "backup://db" })
///     .done()
///     .unwrap();
/// beans.register::<Connection>()
///     .application_scoped()
///     .qualified(Annotation::qualifier("Archive"))
///     .with(|_| Connection { url: "archive://db" })
///     .done()
///     .unwrap();
///
/// let container = beans.build();
/// let instance = container.select::<Connection>();
/// assert!(instance.is_unsatisfied()); // no default-qualified bean
///
/// let backup = instance.select([Annotation::qualifier("Backup")]).unwrap();
/// assert_eq!(backup.get().unwrap().url, "backup://db");
/// ```
pub struct Instance<T: ?Sized + Send + Sync + 'static> {
    container: OdiContainer,
    key: TypeKey,
    qualifiers: QualifierSet,
    resolved: OnceCell<Result<Arc<BeanDef>, OdiError>>,
    chain: Arc<CreationalContext>,
    _marker: PhantomData<Box<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Instance<T> {
    pub(crate) fn new(container: OdiContainer, qualifiers: QualifierSet) -> Self {
        Self {
            container,
            key: TypeKey::of::<T>(),
            qualifiers,
            resolved: OnceCell::new(),
            chain: Arc::new(CreationalContext::new()),
            _marker: PhantomData,
        }
    }

    fn narrowed<U: ?Sized + Send + Sync + 'static>(
        &self,
        key: TypeKey,
        qualifiers: QualifierSet,
    ) -> Instance<U> {
        Instance {
            container: self.container.clone(),
            key,
            qualifiers,
            resolved: OnceCell::new(),
            chain: Arc::new(CreationalContext::new()),
            _marker: PhantomData,
        }
    }

    /// Narrows by additional qualifiers.
    ///
    /// Qualifiers merge with the existing set; the same qualifier type
    /// appearing across merges fails eagerly with
    /// [`OdiError::InvalidQualifier`].
    pub fn select(
        &self,
        annotations: impl IntoIterator<Item = Annotation>,
    ) -> OdiResult<Instance<T>> {
        let extra = QualifierSet::from_annotations(annotations)?;
        let merged = self.qualifiers.merge(&extra)?;
        Ok(self.narrowed::<T>(self.key, merged))
    }

    /// Narrows the required type to `U`, optionally adding qualifiers.
    ///
    /// Assignability (some registered bean provides both `U` and `T`) is
    /// checked eagerly at select time; an invalid narrowing surfaces here as
    /// [`OdiError::InvalidArgument`], not later on `get`.
    pub fn select_subtype<U: ?Sized + Send + Sync + 'static>(
        &self,
        annotations: impl IntoIterator<Item = Annotation>,
    ) -> OdiResult<Instance<U>> {
        let sub = TypeKey::of::<U>();
        if !self.container.is_assignable(&sub, &self.key) {
            return Err(OdiError::InvalidArgument(format!(
                "{} is not assignable to {}",
                sub.name(),
                self.key.name()
            )));
        }
        let extra = QualifierSet::from_annotations(annotations)?;
        let merged = self.qualifiers.merge(&extra)?;
        Ok(self.narrowed::<U>(sub, merged))
    }

    fn resolution(&self) -> &Result<Arc<BeanDef>, OdiError> {
        self.resolved.get_or_init(|| {
            let candidates = self.container.candidates(&self.key);
            resolution::resolve(self.key.name(), &candidates, &self.qualifiers)
        })
    }

    /// Resolves and retrieves the contextual instance.
    pub fn get(&self) -> OdiResult<Arc<T>> {
        let bean = self.resolution().clone()?;
        let canonical = self.container.contextual_get(&bean, &self.chain)?;
        cast_view::<T>(&bean, &self.key, &canonical)
    }

    /// True when zero candidates match.
    ///
    /// Only resolution outcomes are classified; any other failure mode
    /// (a failing factory, an inactive context) yields `false` here and in
    /// [`is_ambiguous`](Instance::is_ambiguous) alike, because speculative
    /// classification never creates instances.
    pub fn is_unsatisfied(&self) -> bool {
        matches!(self.resolution(), Err(OdiError::Unsatisfied(_)))
    }

    /// True when more than one candidate survives all tie-breaks.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self.resolution(), Err(OdiError::Ambiguous(_, _)))
    }

    /// True when resolution selects exactly one bean.
    pub fn is_resolvable(&self) -> bool {
        self.resolution().is_ok()
    }

    /// Handle for the resolved bean; retrieval happens on the handle's `get`.
    pub fn get_handle(&self) -> OdiResult<Handle<T>> {
        let bean = self.resolution().clone()?;
        Ok(Handle::new(self.container.clone(), bean, self.key))
    }

    /// Handles for every qualifier-matching candidate, in registration order.
    ///
    /// Unlike [`get_handle`](Instance::get_handle) no ambiguity rules apply;
    /// every match is returned. Each call re-runs the candidate query.
    pub fn handles(&self) -> Vec<Handle<T>> {
        self.container
            .candidates(&self.key)
            .into_iter()
            .filter(|bean| bean.qualifiers().satisfies(&self.qualifiers))
            .map(|bean| Handle::new(self.container.clone(), bean, self.key))
            .collect()
    }

    /// Lazy iteration over every matching candidate's instance.
    ///
    /// The iterator is finite (bounded by the candidate count) and consumed
    /// once; call `iter` again to re-resolve the candidate list.
    pub fn iter(&self) -> InstanceIter<T> {
        InstanceIter {
            handles: self.handles(),
            pos: 0,
        }
    }

    /// Releases this facade's dependent instances now instead of at drop.
    pub fn destroy_dependents(&self) {
        self.chain.release();
    }
}

/// Iterator over contextual instances of all matching candidates.
///
/// Instances are created lazily on `next`; handles stay alive for the
/// iterator's lifetime so dependent instances are not released mid-iteration.
pub struct InstanceIter<T: ?Sized + Send + Sync + 'static> {
    handles: Vec<Handle<T>>,
    pos: usize,
}

impl<T: ?Sized + Send + Sync + 'static> Iterator for InstanceIter<T> {
    type Item = OdiResult<Arc<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.handles.get(self.pos)?;
        self.pos += 1;
        Some(handle.get())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.handles.len() - self.pos;
        (remaining, Some(remaining))
    }
}

/// A per-bean handle with on-demand retrieval and explicit destruction.
///
/// `destroy` runs exactly once; repeated calls are no-ops. Dropping the
/// handle releases its dependent instances but leaves shared normal-scope
/// instances alone; destroying those requires the explicit `destroy`.
pub struct Handle<T: ?Sized + Send + Sync + 'static> {
    container: OdiContainer,
    bean: Arc<BeanDef>,
    key: TypeKey,
    chain: Arc<CreationalContext>,
    cached: OnceCell<AnyArc>,
    destroyed: AtomicBool,
    _marker: PhantomData<Box<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Handle<T> {
    fn new(container: OdiContainer, bean: Arc<BeanDef>, key: TypeKey) -> Self {
        Self {
            container,
            bean,
            key,
            chain: Arc::new(CreationalContext::new()),
            cached: OnceCell::new(),
            destroyed: AtomicBool::new(false),
            _marker: PhantomData,
        }
    }

    /// The bean definition this handle serves.
    pub fn bean(&self) -> &Arc<BeanDef> {
        &self.bean
    }

    /// Retrieves (and on first call creates) the contextual instance.
    pub fn get(&self) -> OdiResult<Arc<T>> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(OdiError::InvalidArgument(
                "handle has already been destroyed".to_string(),
            ));
        }
        let canonical = self
            .cached
            .get_or_try_init(|| self.container.contextual_get(&self.bean, &self.chain))?
            .clone();
        cast_view::<T>(&self.bean, &self.key, &canonical)
    }

    /// Destroys the contextual instance exactly once.
    ///
    /// For dependent beans this releases the handle's creation episode; for
    /// normal scopes it destroys the shared entry in the owning context.
    /// Repeated calls are no-ops. Failing to reach the owning context (an
    /// inactive request scope, say) leaves the handle intact for a retry; a
    /// disposer failure still counts as destroyed, because the context
    /// removes its entry before the disposer runs.
    pub fn destroy(&self) -> OdiResult<()> {
        match self.bean.scope() {
            ScopeKind::Dependent => {
                if !self.destroyed.swap(true, Ordering::AcqRel) {
                    self.chain.release();
                }
                Ok(())
            }
            scope => {
                let context = self.container.get_context(scope)?;
                if self.destroyed.swap(true, Ordering::AcqRel) {
                    return Ok(());
                }
                let result = context.destroy(&self.bean);
                self.chain.release();
                result
            }
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> Drop for Handle<T> {
    fn drop(&mut self) {
        self.chain.release();
    }
}
