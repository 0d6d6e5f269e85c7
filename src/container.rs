//! The bean container: scope contexts, lookup, and the programmatic surface.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::bean::{AnyArc, BeanDef, BeanRegistry};
use crate::context::{Context, DependentContext, SharedContext};
use crate::creational::CreationalContext;
use crate::error::{OdiError, OdiResult};
use crate::instance::Instance;
use crate::key::TypeKey;
use crate::qualifier::{Annotation, QualifierSet};
use crate::resolution;
use crate::scope::ScopeKind;

/// The running container: a bean registry plus one context per scope.
///
/// Cloning is cheap (`Arc` inner) and every clone shares the same contexts.
/// There is deliberately no process-wide "current container" registry; the
/// handle is passed explicitly to every entry point.
///
/// # Examples
///
/// ```rust
/// use odi::BeanCollection;
///
/// struct Greeter {
///     greeting: &'static str,
/// }
///
/// let mut beans = BeanCollection::new();
/// beans.register::<Greeter>()
///     .application_scoped()
///     .with(|_| Greeter { greeting: "hello" })
///     .done()
///     .unwrap();
///
/// let container = beans.build();
/// let greeter = container.select::<Greeter>().get().unwrap();
/// assert_eq!(greeter.greeting, "hello");
/// container.shutdown();
/// ```
pub struct OdiContainer {
    inner: Arc<ContainerInner>,
}

struct ContainerInner {
    registry: Arc<dyn BeanRegistry>,
    singleton: Arc<SharedContext>,
    application: Arc<SharedContext>,
    request: RwLock<Option<Arc<SharedContext>>>,
    custom: HashMap<&'static str, Arc<SharedContext>>,
    dependent: Arc<DependentContext>,
}

impl Clone for OdiContainer {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl OdiContainer {
    pub(crate) fn new(
        registry: Arc<dyn BeanRegistry>,
        custom_scopes: &[&'static str],
    ) -> Self {
        let custom = custom_scopes
            .iter()
            .map(|name| {
                (
                    *name,
                    Arc::new(SharedContext::new(ScopeKind::Custom(name))),
                )
            })
            .collect();
        Self {
            inner: Arc::new(ContainerInner {
                registry,
                singleton: Arc::new(SharedContext::new(ScopeKind::Singleton)),
                application: Arc::new(SharedContext::new(ScopeKind::Application)),
                request: RwLock::new(None),
                custom,
                dependent: Arc::new(DependentContext),
            }),
        }
    }

    // ----- Facade entry points -----

    /// Starts a lookup for `T` with the implicit `@Default` qualifier.
    pub fn select<T: ?Sized + Send + Sync + 'static>(&self) -> Instance<T> {
        Instance::new(self.clone(), QualifierSet::empty())
    }

    /// Starts a lookup for `T` with explicit qualifiers.
    pub fn select_with<T: ?Sized + Send + Sync + 'static>(
        &self,
        annotations: impl IntoIterator<Item = Annotation>,
    ) -> OdiResult<Instance<T>> {
        let qualifiers = QualifierSet::from_annotations(annotations)?;
        Ok(Instance::new(self.clone(), qualifiers))
    }

    // ----- BeanContainer surface -----

    /// Qualifier-filtered candidate definitions for `T`.
    pub fn get_beans<T: ?Sized + Send + Sync + 'static>(
        &self,
        annotations: impl IntoIterator<Item = Annotation>,
    ) -> OdiResult<Vec<Arc<BeanDef>>> {
        let requested = QualifierSet::from_annotations(annotations)?;
        Ok(self
            .inner
            .registry
            .candidates(&TypeKey::of::<T>())
            .into_iter()
            .filter(|bean| bean.qualifiers().satisfies(&requested))
            .collect())
    }

    /// Applies the alternative and priority tie-breaks to an already filtered
    /// set; fails unless exactly one definition survives.
    pub fn resolve(&self, beans: Vec<Arc<BeanDef>>) -> OdiResult<Arc<BeanDef>> {
        resolution::resolve_among("bean set", beans)
    }

    /// The context serving a scope.
    ///
    /// Fails with [`OdiError::ContextNotActive`] for a request scope with no
    /// active request and for custom scopes that were never registered.
    pub fn get_context(&self, scope: ScopeKind) -> OdiResult<Arc<dyn Context>> {
        match scope {
            ScopeKind::Singleton => Ok(self.inner.singleton.clone()),
            ScopeKind::Application => Ok(self.inner.application.clone()),
            ScopeKind::Request => self
                .inner
                .request
                .read()
                .clone()
                .map(|ctx| ctx as Arc<dyn Context>)
                .ok_or(OdiError::ContextNotActive(ScopeKind::Request)),
            ScopeKind::Dependent => Ok(self.inner.dependent.clone()),
            ScopeKind::Custom(name) => self
                .inner
                .custom
                .get(name)
                .cloned()
                .map(|ctx| ctx as Arc<dyn Context>)
                .ok_or(OdiError::ContextNotActive(scope)),
        }
    }

    // ----- Request scope lifecycle -----

    /// Activates the request scope. The guard tears the request context down
    /// when dropped (or via [`RequestGuard::end`]); activating while a
    /// request is already active fails loudly rather than silently nesting.
    pub fn begin_request(&self) -> OdiResult<RequestGuard> {
        let mut slot = self.inner.request.write();
        if slot.is_some() {
            return Err(OdiError::InvalidArgument(
                "request context is already active".to_string(),
            ));
        }
        debug!("activating request context");
        let ctx = Arc::new(SharedContext::new(ScopeKind::Request));
        *slot = Some(ctx);
        Ok(RequestGuard {
            container: self.clone(),
        })
    }

    pub(crate) fn end_request(&self) {
        let taken = self.inner.request.write().take();
        if let Some(ctx) = taken {
            ctx.destroy_all();
        }
    }

    /// Tears down every context: request (if active), custom scopes,
    /// application, then singleton. Idempotent.
    pub fn shutdown(&self) {
        debug!("shutting down container");
        self.end_request();
        for ctx in self.inner.custom.values() {
            ctx.destroy_all();
        }
        self.inner.application.destroy_all();
        self.inner.singleton.destroy_all();
    }

    // ----- Internal lookup plumbing -----

    pub(crate) fn candidates(&self, key: &TypeKey) -> Vec<Arc<BeanDef>> {
        self.inner.registry.candidates(key)
    }

    /// Whether `sub` can narrow a lookup for `sup`: identical keys, or some
    /// registered bean provides both types.
    pub(crate) fn is_assignable(&self, sub: &TypeKey, sup: &TypeKey) -> bool {
        sub == sup
            || self
                .inner
                .registry
                .candidates(sub)
                .iter()
                .any(|bean| bean.provides(sup))
    }

    /// Scope-dispatched contextual retrieval of the canonical instance.
    pub(crate) fn contextual_get(
        &self,
        bean: &Arc<BeanDef>,
        chain: &Arc<CreationalContext>,
    ) -> OdiResult<AnyArc> {
        let ctx = BeanContext {
            container: self,
            chain,
        };
        match bean.scope() {
            ScopeKind::Singleton => self.inner.singleton.get(bean, &ctx),
            ScopeKind::Application => self.inner.application.get(bean, &ctx),
            ScopeKind::Request => {
                let request = self
                    .inner
                    .request
                    .read()
                    .clone()
                    .ok_or(OdiError::ContextNotActive(ScopeKind::Request))?;
                request.get(bean, &ctx)
            }
            ScopeKind::Dependent => self.inner.dependent.get(bean, &ctx),
            ScopeKind::Custom(name) => {
                let custom = self
                    .inner
                    .custom
                    .get(name)
                    .ok_or(OdiError::ContextNotActive(bean.scope()))?;
                custom.get(bean, &ctx)
            }
        }
    }

    /// Full lookup used by factories: resolve, retrieve, cast.
    pub(crate) fn lookup<U: ?Sized + Send + Sync + 'static>(
        &self,
        requested: &QualifierSet,
        chain: &Arc<CreationalContext>,
    ) -> OdiResult<Arc<U>> {
        let key = TypeKey::of::<U>();
        let candidates = self.candidates(&key);
        let bean = resolution::resolve(key.name(), &candidates, requested)?;
        let canonical = self.contextual_get(&bean, chain)?;
        cast_view::<U>(&bean, &key, &canonical)
    }
}

/// Downcasts a canonical instance to the typed view for `key`.
pub(crate) fn cast_view<U: ?Sized + Send + Sync + 'static>(
    bean: &BeanDef,
    key: &TypeKey,
    canonical: &AnyArc,
) -> OdiResult<Arc<U>> {
    let view = bean.view(key, canonical)?;
    view.downcast::<Arc<U>>()
        .map(|boxed| (*boxed).clone())
        .map_err(|_| OdiError::TypeMismatch(key.name()))
}

/// Active-request handle; tears the request context down when dropped.
pub struct RequestGuard {
    container: OdiContainer,
}

impl RequestGuard {
    /// Ends the request explicitly (equivalent to dropping the guard).
    pub fn end(self) {}
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.container.end_request();
    }
}

/// Resolution context handed to bean factories.
///
/// Dependencies resolved through it join the current creation episode, so
/// dependent-scoped collaborators are released together with their owner.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use odi::BeanCollection;
///
/// struct Engine;
/// struct Car {
///     engine: Arc<Engine>,
/// }
///
/// let mut beans = BeanCollection::new();
/// beans.register::<Engine>()
///     .application_scoped()
///     .with(|_| Engine)
///     .done()
///     .unwrap();
/// beans.register::<Car>()
///     .try_with(|ctx| Ok(Car { engine: ctx.get::<Engine>()? }))
///     .done()
///     .unwrap();
///
/// let container = beans.build();
/// let car = container.select::<Car>().get().unwrap();
/// let engine = container.select::<Engine>().get().unwrap();
/// assert!(Arc::ptr_eq(&car.engine, &engine));
/// ```
pub struct BeanContext<'a> {
    pub(crate) container: &'a OdiContainer,
    pub(crate) chain: &'a Arc<CreationalContext>,
}

impl<'a> BeanContext<'a> {
    /// Rebinds the context to a different creation episode.
    pub(crate) fn for_chain<'b>(
        &'b self,
        chain: &'b Arc<CreationalContext>,
    ) -> BeanContext<'b> {
        BeanContext {
            container: self.container,
            chain,
        }
    }

    pub(crate) fn chain(&self) -> &Arc<CreationalContext> {
        self.chain
    }

    /// The owning container.
    pub fn container(&self) -> &OdiContainer {
        self.container
    }

    /// Resolves a dependency with the implicit `@Default` qualifier.
    pub fn get<U: ?Sized + Send + Sync + 'static>(&self) -> OdiResult<Arc<U>> {
        self.container.lookup::<U>(&QualifierSet::empty(), self.chain)
    }

    /// Resolves a dependency with explicit qualifiers.
    pub fn get_with<U: ?Sized + Send + Sync + 'static>(
        &self,
        annotations: impl IntoIterator<Item = Annotation>,
    ) -> OdiResult<Arc<U>> {
        let requested = QualifierSet::from_annotations(annotations)?;
        self.container.lookup::<U>(&requested, self.chain)
    }
}
