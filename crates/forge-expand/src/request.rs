//! Input shapes the expander consumes: an abstract manifest whose
//! dependencies carry stream *sets* rather than one pinned stream each.

use std::collections::BTreeMap;

use forge_domain::{ComponentRef, Nsvc};

/// One dependency's stream set, as declared by the manifest.
///
/// - `streams` non-empty: exactly these streams are candidates.
/// - `streams` empty and `excludes` non-empty: every known stream except the
///   excluded ones (the `-X` negation form).
/// - both empty: every known stream compatible with the base module's
///   stream-version window, i.e. every entry of `known_streams` as supplied
///   by the submission path's catalogue lookup.
#[derive(Debug, Clone)]
pub struct DependencyRequirement {
    pub name: String,
    pub streams: Vec<String>,
    pub excludes: Vec<String>,
    /// The full catalogue of streams known for this dependency name, used to
    /// resolve the negation and wildcard forms above. Populated by the
    /// caller from the resolver ahead of expansion.
    pub known_streams: Vec<String>,
    /// Whether this dependency is build-time only (excluded from the
    /// runtime-context hash).
    pub build_time_only: bool,
}

impl DependencyRequirement {
    /// The candidate streams this requirement resolves to, before any
    /// candidate-build lookup or cross-dependency pruning.
    pub fn candidate_streams(&self) -> Vec<String> {
        if !self.streams.is_empty() {
            return self.streams.clone();
        }
        self.known_streams
            .iter()
            .filter(|s| !self.excludes.contains(s))
            .cloned()
            .collect()
    }
}

/// A module referenced as a component, recursively expanded by fetching its
/// own already-pinned manifest rather than re-running stream expansion on it.
#[derive(Debug, Clone)]
pub struct NestedModuleRef {
    pub name: String,
    pub stream: String,
    pub version: Option<i64>,
    pub context: Option<String>,
}

/// Everything the expander needs to turn one manifest into one or more
/// pinned variants.
#[derive(Debug, Clone)]
pub struct ExpansionRequest {
    pub name: String,
    pub stream: String,
    /// Monotonically increasing raw build version, before stream-version
    /// prefixing.
    pub raw_version: i64,
    /// The base module's stream name (e.g. `f29.1.0`), used both for
    /// version-prefixing and as the default compatibility window for
    /// wildcard dependency resolution.
    pub base_module_stream: String,
    /// The platform module this request resolves candidates against, passed
    /// through to `Resolver::get_buildrequired_modulemds`.
    pub base_module_nsvc: Nsvc,
    pub requirements: Vec<DependencyRequirement>,
    pub components: Vec<ComponentRef>,
    pub nested_modules: Vec<NestedModuleRef>,
    /// Caller-supplied defaults (e.g. from the submission payload) used to
    /// break ties when more than one combination survives pruning.
    pub default_streams: BTreeMap<String, String>,
    /// Whether the caller has authorized the expander to emit more than one
    /// surviving variant instead of failing with `StreamAmbiguous`.
    pub allow_ambiguous: bool,
}
