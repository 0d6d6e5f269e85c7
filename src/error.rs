//! Error types for the contexts and resolution engine.

use std::fmt;
use std::sync::Arc;

use crate::scope::ScopeKind;

/// Bean resolution and context lifecycle errors.
///
/// Resolution failures (`Unsatisfied`, `Ambiguous`) are pure and deterministic;
/// retrying without changing inputs reproduces the same error, so nothing in
/// this crate ever retries. Creation failures wrap the underlying cause, while
/// resolution failures raised inside a bean factory propagate unchanged.
///
/// # Examples
///
/// ```rust
/// use odi::{BeanCollection, OdiError};
///
/// struct Missing;
///
/// let container = BeanCollection::new().build();
/// match container.select::<Missing>().get() {
///     Err(OdiError::Unsatisfied(name)) => assert!(name.contains("Missing")),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone)]
pub enum OdiError {
    /// Zero candidates matched the required type and qualifiers
    Unsatisfied(&'static str),
    /// More than one candidate survived all tie-breaks (includes descriptions)
    Ambiguous(&'static str, Vec<String>),
    /// Malformed qualifier usage (duplicate qualifier type, non-qualifier annotation)
    InvalidQualifier(String),
    /// Operation attempted on a destroyed or never-activated context
    ContextNotActive(ScopeKind),
    /// Bean construction failed; the original cause is attached
    Creation(&'static str, Arc<dyn std::error::Error + Send + Sync>),
    /// A bean disposer reported a failure
    Destruction(String),
    /// Stored instance could not be downcast to the requested view
    TypeMismatch(&'static str),
    /// Invalid argument to a facade operation (bad narrowing, destroyed handle)
    InvalidArgument(String),
}

impl OdiError {
    /// Wraps a bean factory failure, preserving the cause for `source()`.
    ///
    /// Use this inside `try_with` factories for failures of your own; errors
    /// that are already [`OdiError`] (nested resolution, inactive contexts)
    /// should be propagated with `?` instead, never re-wrapped.
    pub fn creation<E>(bean: &'static str, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        OdiError::Creation(bean, Arc::new(cause))
    }
}

impl fmt::Display for OdiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OdiError::Unsatisfied(name) => {
                write!(f, "Unsatisfied dependency: no bean matches {}", name)
            }
            OdiError::Ambiguous(name, candidates) => {
                write!(
                    f,
                    "Ambiguous dependency for {}: {}",
                    name,
                    candidates.join(", ")
                )
            }
            OdiError::InvalidQualifier(msg) => write!(f, "Invalid qualifier: {}", msg),
            OdiError::ContextNotActive(scope) => {
                write!(f, "Context not active for scope {:?}", scope)
            }
            OdiError::Creation(name, cause) => {
                write!(f, "Failed to create bean {}: {}", name, cause)
            }
            OdiError::Destruction(msg) => write!(f, "Bean disposer failed: {}", msg),
            OdiError::TypeMismatch(name) => write!(f, "Type mismatch for: {}", name),
            OdiError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
        }
    }
}

impl std::error::Error for OdiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OdiError::Creation(_, cause) => Some(cause.as_ref()),
            _ => None,
        }
    }
}

/// Result type for engine operations
pub type OdiResult<T> = Result<T, OdiError>;
