//! Bean registration and container assembly.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use smallvec::{smallvec, SmallVec};

use crate::bean::{AnyArc, BeanDef, BeanId, Caster, Disposer, Factory, TypeIndexedRegistry};
use crate::container::{BeanContext, OdiContainer};
use crate::error::{OdiError, OdiResult};
use crate::key::TypeKey;
use crate::qualifier::{Annotation, QualifierSet};
use crate::scope::ScopeKind;

/// Collects bean definitions, then assembles an immutable [`OdiContainer`].
///
/// Registration order is preserved and used as the stable order for
/// candidate enumeration. Beans default to the dependent pseudo-scope and
/// default qualifiers until the builder says otherwise.
///
/// # Examples
///
/// ```rust
/// use odi::BeanCollection;
///
/// #[derive(Debug)]
/// struct Greeter {
///     salutation: &'static str,
/// }
///
/// let mut beans = BeanCollection::new();
/// beans.register::<Greeter>()
///     .singleton()
///     .with(|_| Greeter { salutation: "hello" })
///     .done()
///     .unwrap();
///
/// let container = beans.build();
/// let greeter = container.select::<Greeter>().get().unwrap();
/// assert_eq!(greeter.salutation, "hello");
/// ```
pub struct BeanCollection {
    beans: Vec<Arc<BeanDef>>,
    custom_scopes: Vec<&'static str>,
    next_id: u64,
}

impl BeanCollection {
    pub fn new() -> Self {
        Self {
            beans: Vec::new(),
            custom_scopes: Vec::new(),
            next_id: 0,
        }
    }

    /// Starts a registration for a bean producing `T`.
    ///
    /// `T` itself is always a provided type; additional views (trait objects,
    /// supertypes) come from [`BeanBuilder::provides`].
    pub fn register<T: Send + Sync + 'static>(&mut self) -> BeanBuilder<'_, T> {
        let key = TypeKey::of::<T>();
        let mut casters: HashMap<TypeKey, Caster> = HashMap::new();
        // Identity view, boxed the same way as trait views so retrieval
        // downcasts uniformly to Arc<U>.
        casters.insert(
            key,
            Arc::new(|canonical: &AnyArc| {
                let typed = canonical.clone().downcast::<T>().ok()?;
                Some(Arc::new(typed) as AnyArc)
            }),
        );
        BeanBuilder {
            collection: self,
            scope: ScopeKind::Dependent,
            annotations: Vec::new(),
            alternative: false,
            priority: 0,
            types: smallvec![key],
            casters,
            factory: None,
            disposer: None,
            _marker: PhantomData,
        }
    }

    /// Declares a custom named scope; its context starts active and lives
    /// until [`OdiContainer::shutdown`].
    pub fn register_scope(&mut self, name: &'static str) -> &mut Self {
        if !self.custom_scopes.contains(&name) {
            self.custom_scopes.push(name);
        }
        self
    }

    /// Freezes the registrations into a container.
    pub fn build(self) -> OdiContainer {
        OdiContainer::new(
            Arc::new(TypeIndexedRegistry::new(self.beans)),
            &self.custom_scopes,
        )
    }
}

impl Default for BeanCollection {
    fn default() -> Self {
        Self::new()
    }
}

/// Fluent configuration for a single bean registration.
///
/// Finish with [`done`](BeanBuilder::done); dropping the builder without
/// calling it discards the registration.
pub struct BeanBuilder<'c, T: Send + Sync + 'static> {
    collection: &'c mut BeanCollection,
    scope: ScopeKind,
    annotations: Vec<Annotation>,
    alternative: bool,
    priority: i32,
    types: SmallVec<[TypeKey; 4]>,
    casters: HashMap<TypeKey, Caster>,
    factory: Option<Factory>,
    disposer: Option<Disposer>,
    _marker: PhantomData<T>,
}

impl<'c, T: Send + Sync + 'static> BeanBuilder<'c, T> {
    pub fn singleton(mut self) -> Self {
        self.scope = ScopeKind::Singleton;
        self
    }

    pub fn application_scoped(mut self) -> Self {
        self.scope = ScopeKind::Application;
        self
    }

    pub fn request_scoped(mut self) -> Self {
        self.scope = ScopeKind::Request;
        self
    }

    pub fn dependent(mut self) -> Self {
        self.scope = ScopeKind::Dependent;
        self
    }

    pub fn scoped(mut self, scope: ScopeKind) -> Self {
        self.scope = scope;
        self
    }

    /// Adds a qualifier annotation. Non-qualifier annotations and duplicate
    /// qualifier types are rejected at [`done`](BeanBuilder::done).
    pub fn qualified(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Shorthand for the built-in `Named` qualifier.
    pub fn named(self, value: &str) -> Self {
        self.qualified(Annotation::named(value))
    }

    /// Marks this bean as an alternative: it only participates in resolution
    /// when no matching non-alternative exists.
    pub fn alternative(mut self) -> Self {
        self.alternative = true;
        self
    }

    /// Tie-break weight among alternatives; higher wins. Defaults to 0.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Exposes this bean under an additional type `U`, usually a trait
    /// object. The cast must be a plain coercion, e.g.
    /// `|engine| engine as Arc<dyn Engine>`.
    pub fn provides<U: ?Sized + Send + Sync + 'static>(
        mut self,
        cast: fn(Arc<T>) -> Arc<U>,
    ) -> Self {
        let key = TypeKey::of::<U>();
        if !self.types.contains(&key) {
            self.types.push(key);
        }
        self.casters.insert(
            key,
            Arc::new(move |canonical: &AnyArc| {
                let typed = canonical.clone().downcast::<T>().ok()?;
                Some(Arc::new(cast(typed)) as AnyArc)
            }),
        );
        self
    }

    /// Infallible factory.
    pub fn with<F>(self, factory: F) -> Self
    where
        F: for<'a> Fn(&BeanContext<'a>) -> T + Send + Sync + 'static,
    {
        self.try_with(move |ctx| Ok(factory(ctx)))
    }

    /// Fallible factory; errors surface from `get` as-is, so nested
    /// resolution failures keep their original variant.
    pub fn try_with<F>(mut self, factory: F) -> Self
    where
        F: for<'a> Fn(&BeanContext<'a>) -> OdiResult<T> + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(move |ctx: &BeanContext<'_>| {
            factory(ctx).map(|value| Arc::new(value) as AnyArc)
        }));
        self
    }

    /// Registers a pre-built instance. The factory hands out the same
    /// allocation every time, which only matters for normal scopes after
    /// their context is torn down and re-created.
    pub fn instance(mut self, value: T) -> Self {
        let shared = Arc::new(value);
        self.factory = Some(Arc::new(move |_: &BeanContext<'_>| {
            Ok(shared.clone() as AnyArc)
        }));
        self
    }

    /// Destruction callback, run when the owning context (or creation
    /// episode) destroys the instance.
    pub fn on_destroy<F>(self, disposer: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.try_on_destroy(move |value| {
            disposer(value);
            Ok(())
        })
    }

    /// Fallible destruction callback; an `Err` surfaces as
    /// [`OdiError::Destruction`] from explicit destroys and is logged during
    /// bulk teardown.
    pub fn try_on_destroy<F>(mut self, disposer: F) -> Self
    where
        F: Fn(&T) -> Result<(), String> + Send + Sync + 'static,
    {
        self.disposer = Some(Arc::new(move |canonical: &AnyArc| {
            match canonical.downcast_ref::<T>() {
                Some(value) => disposer(value).map_err(OdiError::Destruction),
                None => Err(OdiError::TypeMismatch(std::any::type_name::<T>())),
            }
        }));
        self
    }

    /// Validates and commits the registration.
    pub fn done(self) -> OdiResult<()> {
        let qualifiers = QualifierSet::from_annotations(self.annotations)?;
        let factory = self.factory.ok_or_else(|| {
            OdiError::InvalidArgument(format!(
                "bean {} registered without a factory or instance",
                std::any::type_name::<T>()
            ))
        })?;
        let id = BeanId(self.collection.next_id);
        self.collection.next_id += 1;
        self.collection.beans.push(Arc::new(BeanDef {
            id,
            name: std::any::type_name::<T>(),
            scope: self.scope,
            qualifiers,
            alternative: self.alternative,
            priority: self.priority,
            types: self.types,
            factory,
            casters: self.casters,
            disposer: self.disposer,
        }));
        Ok(())
    }
}
