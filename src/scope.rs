//! Scope kinds controlling instance caching behavior.

/// Declared scope of a bean.
///
/// Normal scopes guarantee at most one live instance per bean per active
/// context; `Dependent` is a pseudo-scope that never caches and produces a
/// fresh instance on every creation request.
///
/// # Scope characteristics
///
/// - **Singleton / Application**: process-lifetime caches on the container
/// - **Request**: cached for the lifetime of one activated request context
/// - **Dependent**: fresh per creation, released with the owning episode
/// - **Custom**: user-declared normal scope, torn down at container shutdown
///
/// # Examples
///
/// ```rust
/// use odi::ScopeKind;
///
/// assert!(ScopeKind::Application.is_normal());
/// assert!(!ScopeKind::Dependent.is_normal());
/// assert!(ScopeKind::Custom("conversation").is_normal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// One instance for the container lifetime
    Singleton,
    /// One instance for the application lifetime (normal scope)
    Application,
    /// One instance per activated request context
    Request,
    /// Fresh instance per creation request, never shared or cached
    Dependent,
    /// User-declared normal scope, registered at build time by name
    Custom(&'static str),
}

impl ScopeKind {
    /// True for scopes that cache at most one live instance per bean.
    pub fn is_normal(&self) -> bool {
        !matches!(self, ScopeKind::Dependent)
    }
}
