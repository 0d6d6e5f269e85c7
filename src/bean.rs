//! Bean definitions and the external registry seam.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::container::BeanContext;
use crate::error::{OdiError, OdiResult};
use crate::key::TypeKey;
use crate::qualifier::QualifierSet;
use crate::scope::ScopeKind;

/// Type-erased instance for storage in contexts.
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

pub(crate) type Factory =
    Arc<dyn for<'a> Fn(&BeanContext<'a>) -> OdiResult<AnyArc> + Send + Sync>;
pub(crate) type Caster = Arc<dyn Fn(&AnyArc) -> Option<AnyArc> + Send + Sync>;
pub(crate) type Disposer = Arc<dyn Fn(&AnyArc) -> OdiResult<()> + Send + Sync>;

/// Opaque bean identity; equality and hashing only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BeanId(pub(crate) u64);

/// A bean definition: identity, declared metadata, and lifecycle hooks.
///
/// The engine never mutates a definition after registration. The declared
/// scope, qualifiers, alternative flag, and priority are closed values fixed
/// at build time; resolution never re-derives them.
pub struct BeanDef {
    pub(crate) id: BeanId,
    pub(crate) name: &'static str,
    pub(crate) scope: ScopeKind,
    pub(crate) qualifiers: QualifierSet,
    pub(crate) alternative: bool,
    pub(crate) priority: i32,
    pub(crate) types: SmallVec<[TypeKey; 4]>,
    pub(crate) factory: Factory,
    pub(crate) casters: HashMap<TypeKey, Caster>,
    pub(crate) disposer: Option<Disposer>,
}

impl BeanDef {
    pub fn id(&self) -> BeanId {
        self.id
    }

    /// Primary type name, used in diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn scope(&self) -> ScopeKind {
        self.scope
    }

    pub fn qualifiers(&self) -> &QualifierSet {
        &self.qualifiers
    }

    pub fn is_alternative(&self) -> bool {
        self.alternative
    }

    /// Declared priority; defaults to 0, higher wins tie-breaks.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// The bean types this definition can be looked up under.
    pub fn provided_types(&self) -> &[TypeKey] {
        &self.types
    }

    pub fn provides(&self, key: &TypeKey) -> bool {
        self.types.contains(key)
    }

    /// One-line description used in ambiguity diagnostics.
    pub fn description(&self) -> String {
        let kind = if self.alternative {
            "alternative"
        } else {
            "bean"
        };
        format!(
            "{} {} ({:?}, priority {})",
            kind, self.name, self.scope, self.priority
        )
    }

    /// Delegated construction. Failures propagate unchanged; wrapping user
    /// causes into [`OdiError::Creation`] is the factory's responsibility.
    pub(crate) fn create(&self, ctx: &BeanContext<'_>) -> OdiResult<AnyArc> {
        (self.factory)(ctx)
    }

    /// Delegated teardown; a no-op when no disposer was registered.
    pub(crate) fn destroy(&self, instance: &AnyArc) -> OdiResult<()> {
        match &self.disposer {
            Some(dispose) => dispose(instance),
            None => Ok(()),
        }
    }

    /// Produces the typed view of a canonical instance for one of the bean's
    /// provided types. The returned `AnyArc` holds an `Arc<U>` for key `U`.
    pub(crate) fn view(&self, key: &TypeKey, canonical: &AnyArc) -> OdiResult<AnyArc> {
        self.casters
            .get(key)
            .and_then(|cast| cast(canonical))
            .ok_or(OdiError::TypeMismatch(key.name()))
    }
}

impl fmt::Debug for BeanDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDef")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("alternative", &self.alternative)
            .field("priority", &self.priority)
            .finish()
    }
}

/// The external bean registry seam.
///
/// The engine consumes candidates through this single method: type-compatible
/// definitions, qualifier-blind. Precise qualifier filtering, alternative
/// handling, and priority tie-breaks all happen inside the engine.
pub trait BeanRegistry: Send + Sync {
    /// Bean definitions providing the given type, in registration order.
    fn candidates(&self, key: &TypeKey) -> Vec<Arc<BeanDef>>;
}

/// Default registry backed by a type-indexed candidate map.
///
/// Built by [`BeanCollection::build`](crate::BeanCollection::build); each bean
/// is indexed under every type it provides.
pub struct TypeIndexedRegistry {
    by_type: HashMap<TypeKey, Vec<Arc<BeanDef>>>,
}

impl TypeIndexedRegistry {
    pub fn new(beans: impl IntoIterator<Item = Arc<BeanDef>>) -> Self {
        let mut by_type: HashMap<TypeKey, Vec<Arc<BeanDef>>> = HashMap::new();
        for bean in beans {
            for key in bean.provided_types().to_vec() {
                by_type.entry(key).or_default().push(bean.clone());
            }
        }
        Self { by_type }
    }
}

impl BeanRegistry for TypeIndexedRegistry {
    fn candidates(&self, key: &TypeKey) -> Vec<Arc<BeanDef>> {
        self.by_type.get(key).cloned().unwrap_or_default()
    }
}
