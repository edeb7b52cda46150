//! External ports: the two narrow async interfaces the orchestrator core
//! uses to reach systems it does not own — the build system ([`Builder`])
//! and the module-metadata resolver ([`Resolver`]).
//!
//! Both traits are intentionally small and object-safe: the engine wires a
//! single `Arc<dyn Builder>` / `Arc<dyn Resolver>` into its context at
//! startup, and every other crate only ever sees the trait, never a concrete
//! backend. Tests get deterministic fakes from [`MockBuilder`] and
//! [`MockResolver`].

pub mod builder;
pub mod error;
pub mod resolver;

pub use builder::{BuildSubmission, Builder, MockBuilder, TaskInfo};
pub use error::{BuilderError, ResolverError};
pub use resolver::{MockResolver, ModuleQuery, Resolver};
