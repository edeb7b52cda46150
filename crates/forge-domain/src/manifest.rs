//! The pinned manifest blob carried by a [`crate::ModuleBuild`].
//!
//! This is the *output* shape of stream expansion: exactly one stream per
//! dependency, every transitive build-time dependency resolved to a concrete
//! NSVC. The expansion engine that produces it lives in a separate crate —
//! this type is just the data both it and the Store agree on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::Nsvc;

/// One RPM-level component declared by a manifest, before it becomes a
/// [`crate::ComponentBuild`] row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRef {
    pub package: String,
    /// Source URL, already pinned to a concrete commit by the (external)
    /// SCM-resolution step.
    pub scmurl: String,
    pub format: String,
    /// Declared build-order; components with equal build-order share a
    /// batch.
    pub build_order: i32,
    pub build_time_only: bool,
}

/// A fully pinned manifest: exactly one stream per dependency, with every
/// transitively required module resolved to a concrete NSVC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedManifest {
    pub name: String,
    pub stream: String,
    pub version: i64,
    pub context: String,
    /// Concrete `(name, stream, version, context)` of every transitively
    /// required module, keyed by dependency name.
    pub buildrequires: BTreeMap<String, Nsvc>,
    pub components: Vec<ComponentRef>,
}

impl PinnedManifest {
    /// Components grouped into batches by declared build-order, in the order
    /// the scheduler will drive them (batch 1 is reserved for the
    /// synthesized `module-build-macros` component and is never produced
    /// here).
    pub fn batches(&self) -> BTreeMap<i32, Vec<&ComponentRef>> {
        let mut batches: BTreeMap<i32, Vec<&ComponentRef>> = BTreeMap::new();
        for c in &self.components {
            batches.entry(c.build_order).or_default().push(c);
        }
        batches
    }
}
