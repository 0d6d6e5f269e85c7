//! # odi
//!
//! Contexts and qualified bean resolution for Rust, inspired by CDI-style
//! dependency injection.
//!
//! ## Features
//!
//! - **Qualified resolution**: beans carry qualifier annotations; lookups
//!   narrow by type and by qualifier, with `@Default`/`@Any`/`@Named`
//!   built-ins
//! - **Contextual scopes**: Singleton, Application, Request, custom named
//!   scopes, plus the Dependent pseudo-scope
//! - **Alternatives and priority**: alternatives only compete when no
//!   ordinary bean matches, tie-broken by declared priority
//! - **Dependent chains**: every creation episode tracks the dependent
//!   instances built for it and destroys them in reverse order
//! - **Lazy facades**: `Instance<T>` re-narrows by subtype or qualifier and
//!   classifies unsatisfied/ambiguous outcomes without creating anything
//! - **Thread-safe**: Arc-based sharing with single-winner instance creation
//!
//! ## Quick Start
//!
//! ```rust
//! use odi::BeanCollection;
//! use std::sync::Arc;
//!
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let mut beans = BeanCollection::new();
//! beans.register::<Database>()
//!     .application_scoped()
//!     .with(|_| Database {
//!         connection_string: "postgres://localhost".to_string(),
//!     })
//!     .done()
//!     .unwrap();
//! beans.register::<UserService>()
//!     .try_with(|ctx| {
//!         Ok(UserService {
//!             db: ctx.get::<Database>()?,
//!         })
//!     })
//!     .done()
//!     .unwrap();
//!
//! let container = beans.build();
//! let users = container.select::<UserService>().get().unwrap();
//! assert_eq!(users.db.connection_string, "postgres://localhost");
//! container.shutdown();
//! ```
//!
//! ## Scopes
//!
//! - **Singleton / Application**: one shared instance per container, torn
//!   down at [`OdiContainer::shutdown`]
//! - **Request**: one instance per active request window, bracketed by
//!   [`OdiContainer::begin_request`]
//! - **Dependent**: a fresh instance per injection point, destroyed with
//!   whatever it was created for
//!
//! ## Qualifiers and Alternatives
//!
//! ```rust
//! use odi::BeanCollection;
//! use std::sync::Arc;
//!
//! trait Transport: Send + Sync {
//!     fn send(&self, payload: &str) -> String;
//! }
//!
//! struct Smtp;
//! impl Transport for Smtp {
//!     fn send(&self, payload: &str) -> String {
//!         format!("smtp:{payload}")
//!     }
//! }
//!
//! struct Mock;
//! impl Transport for Mock {
//!     fn send(&self, payload: &str) -> String {
//!         format!("mock:{payload}")
//!     }
//! }
//!
//! let mut beans = BeanCollection::new();
//! beans.register::<Smtp>()
//!     .singleton()
//!     .provides::<dyn Transport>(|s| s as Arc<dyn Transport>)
//!     .with(|_| Smtp)
//!     .done()
//!     .unwrap();
//! beans.register::<Mock>()
//!     .singleton()
//!     .alternative()
//!     .provides::<dyn Transport>(|m| m as Arc<dyn Transport>)
//!     .with(|_| Mock)
//!     .done()
//!     .unwrap();
//!
//! let container = beans.build();
//! // The ordinary bean wins while it matches; the alternative waits.
//! let transport = container.select::<dyn Transport>().get().unwrap();
//! assert_eq!(transport.send("hi"), "smtp:hi");
//! ```

pub mod bean;
pub mod collection;
pub mod container;
pub mod context;
pub mod creational;
pub mod error;
pub mod instance;
pub mod key;
pub mod qualifier;
pub mod scope;

mod resolution;

pub use bean::{BeanDef, BeanId, BeanRegistry, TypeIndexedRegistry};
pub use collection::{BeanBuilder, BeanCollection};
pub use container::{BeanContext, OdiContainer, RequestGuard};
pub use context::Context;
pub use creational::CreationalContext;
pub use error::{OdiError, OdiResult};
pub use instance::{Handle, Instance, InstanceIter};
pub use key::TypeKey;
pub use qualifier::{Annotation, MemberValue, Qualifier, QualifierSet};
pub use scope::ScopeKind;
