//! Required-type keys for candidate lookup.

use std::any::TypeId;
use std::hash::{Hash, Hasher};

/// Key identifying a required type in the bean registry.
///
/// Works for concrete types and trait object types alike; a bean may be
/// registered under several keys (its bean types), and lookups always go
/// through the key of the requested view.
///
/// # Examples
///
/// ```rust
/// use odi::TypeKey;
///
/// trait Greeter: Send + Sync {}
///
/// let concrete = TypeKey::of::<String>();
/// let object = TypeKey::of::<dyn Greeter>();
/// assert_ne!(concrete, object);
/// assert!(object.name().contains("Greeter"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Builds the key for `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The type name, for diagnostics and error messages.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

// TypeId-only comparison; the name is carried for diagnostics.
impl PartialEq for TypeKey {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    #[inline(always)]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
