//! The Stream Expander: converts an abstract dependency manifest (with
//! stream wildcards and negations) into one or more concrete, fully-pinned
//! build plans.

pub mod error;
pub mod expander;
pub mod hash;
pub mod request;
pub mod version;

pub use error::ExpandError;
pub use expander::Expander;
pub use request::{DependencyRequirement, ExpansionRequest, NestedModuleRef};
