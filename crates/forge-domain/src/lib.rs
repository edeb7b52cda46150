//! Data model for the module build orchestrator.
//!
//! Four entities carry all state: [`ModuleBuild`], [`ComponentBuild`], and
//! their append-only trace logs. Everything in this crate is plain data plus
//! the state-machine validation that guards mutation of it — no I/O, no
//! async. The Store crate is what actually persists these.

pub mod component_build;
pub mod ids;
pub mod manifest;
pub mod module_build;
pub mod trace;

pub use component_build::{ComponentBuild, ComponentBuildState};
pub use ids::{ComponentBuildId, ContextHash, ModuleBuildId, Nsvc};
pub use manifest::{ComponentRef, PinnedManifest};
pub use module_build::{InvalidTransition, ModuleBuild, ModuleBuildState, ModuleBuildSummary, RebuildStrategy};
pub use trace::{ComponentBuildTrace, ModuleBuildTrace};
