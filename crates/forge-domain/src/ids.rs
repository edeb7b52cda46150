//! Identifier and hash newtypes.
//!
//! Every identifier gets its own type with a `Display` impl, rather than
//! passing bare integers or strings around — the same convention the rest of
//! the model uses for `OrderId`-style identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Primary key of a [`crate::ModuleBuild`](crate::module_build::ModuleBuild).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleBuildId(pub i64);

impl fmt::Display for ModuleBuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ModuleBuildId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Primary key of a [`crate::ComponentBuild`](crate::component_build::ComponentBuild).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentBuildId(pub i64);

impl fmt::Display for ComponentBuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ComponentBuildId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// `name:stream:version:context`, the fully-qualified identifier of a module variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Nsvc {
    pub name: String,
    pub stream: String,
    pub version: i64,
    pub context: String,
}

impl Nsvc {
    pub fn new(
        name: impl Into<String>,
        stream: impl Into<String>,
        version: i64,
        context: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            stream: stream.into(),
            version,
            context: context.into(),
        }
    }
}

impl fmt::Display for Nsvc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.name, self.stream, self.version, self.context)
    }
}

/// A full-length (blake3, hex-encoded) context hash, as computed over one of
/// the three canonical dependency lists (`ref_build_context`, `build_context`,
/// `runtime_context`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextHash(pub String);

impl fmt::Display for ContextHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ContextHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
