//! The Stream Expander: turns an [`ExpansionRequest`] into one or more fully
//! pinned [`PinnedManifest`]s.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use forge_domain::{ComponentRef, Nsvc, PinnedManifest};
use forge_external::Resolver;
use futures::stream::{self, StreamExt, TryStreamExt};

use crate::error::ExpandError;
use crate::hash::{nsvc_context, public_context, ref_build_context};
use crate::request::{ExpansionRequest, NestedModuleRef};
use crate::version::prefixed_version;

/// Bound on concurrent resolver lookups when flattening nested module
/// components (Design Notes §9: thread-pool-per-SCM-lookup becomes a bounded
/// `buffer_unordered`).
const NESTED_FETCH_CONCURRENCY: usize = 8;

/// One candidate build for a single dependency requirement: its pinned NSVC
/// plus the transitive buildrequires it itself carries, needed for the
/// cross-build-dependency consistency prune.
#[derive(Debug, Clone)]
struct Candidate {
    nsvc: Nsvc,
    build_time_only: bool,
    transitive: BTreeMap<String, Nsvc>,
}

pub struct Expander {
    resolver: Arc<dyn Resolver>,
}

impl Expander {
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self { resolver }
    }

    pub async fn expand(&self, request: &ExpansionRequest) -> Result<Vec<PinnedManifest>, ExpandError> {
        let per_requirement = self.candidates_per_requirement(request).await?;
        let combos = cartesian_product(&per_requirement);
        let consistent: Vec<&Vec<Candidate>> = combos.iter().filter(|combo| is_consistent(combo)).collect();

        let surviving = apply_defaults(request, &consistent);

        if surviving.len() > 1 && !request.allow_ambiguous {
            return Err(ExpandError::StreamAmbiguous {
                name: request.name.clone(),
                candidates: surviving.len(),
            });
        }

        let mut manifests = Vec::with_capacity(surviving.len());
        for combo in surviving {
            manifests.push(self.build_manifest(request, combo).await?);
        }
        Ok(manifests)
    }

    async fn candidates_per_requirement(&self, request: &ExpansionRequest) -> Result<Vec<Vec<Candidate>>, ExpandError> {
        let mut out = Vec::with_capacity(request.requirements.len());
        for req in &request.requirements {
            let streams = req.candidate_streams();
            let mut candidates = Vec::new();
            for stream_name in &streams {
                let manifests = self
                    .resolver
                    .get_buildrequired_modulemds(&req.name, stream_name, &request.base_module_nsvc)
                    .await?;
                for m in manifests {
                    candidates.push(Candidate {
                        nsvc: Nsvc::new(m.name.clone(), m.stream.clone(), m.version, m.context.clone()),
                        build_time_only: req.build_time_only,
                        transitive: m.buildrequires.clone(),
                    });
                }
            }
            if candidates.is_empty() {
                return Err(ExpandError::NoCandidates {
                    name: req.name.clone(),
                    stream: streams.join(","),
                });
            }
            out.push(candidates);
        }
        Ok(out)
    }

    async fn build_manifest(&self, request: &ExpansionRequest, combo: &[Candidate]) -> Result<PinnedManifest, ExpandError> {
        let refs: Vec<(String, String)> = combo.iter().map(|c| (c.nsvc.name.clone(), c.nsvc.stream.clone())).collect();
        let build_nsvcs: Vec<Nsvc> = combo.iter().map(|c| c.nsvc.clone()).collect();
        let runtime_nsvcs: Vec<Nsvc> = combo
            .iter()
            .filter(|c| !c.build_time_only)
            .map(|c| c.nsvc.clone())
            .collect();

        let build_context = nsvc_context(&build_nsvcs);
        let runtime_context = nsvc_context(&runtime_nsvcs);
        let ref_context = ref_build_context(&refs);
        let context = public_context(&build_context, &runtime_context);

        let version = prefixed_version(&request.base_module_stream, request.raw_version)?;

        let buildrequires: BTreeMap<String, Nsvc> = request
            .requirements
            .iter()
            .zip(combo.iter())
            .map(|(req, candidate)| (req.name.clone(), candidate.nsvc.clone()))
            .collect();

        let components = self.flatten_components(request).await?;

        let manifest = PinnedManifest {
            name: request.name.clone(),
            stream: request.stream.clone(),
            version,
            context,
            buildrequires,
            components,
        };
        tracing::debug!(
            module = %request.name,
            stream = %request.stream,
            context = %manifest.context,
            ref_build_context = %ref_context.as_str(),
            "expanded module variant"
        );
        Ok(manifest)
    }

    /// Merges direct components with every nested module's components,
    /// offsetting nested build-orders so they land in batches after every
    /// component already collected, and erroring on a package declared by
    /// more than one nested module (or shadowing a direct component).
    async fn flatten_components(&self, request: &ExpansionRequest) -> Result<Vec<ComponentRef>, ExpandError> {
        let mut components = request.components.clone();
        let mut seen: BTreeSet<String> = components.iter().map(|c| c.package.clone()).collect();
        let mut running_max = components.iter().map(|c| c.build_order).max().unwrap_or(0);

        let nested_manifests = self.fetch_nested_manifests(&request.nested_modules).await?;

        for manifest in nested_manifests {
            let offset = running_max + 1;
            for inner in &manifest.components {
                if !seen.insert(inner.package.clone()) {
                    return Err(ExpandError::ComponentConflict {
                        package: inner.package.clone(),
                    });
                }
                let mut component = inner.clone();
                component.build_order += offset;
                running_max = running_max.max(component.build_order);
                components.push(component);
            }
        }
        Ok(components)
    }

    async fn fetch_nested_manifests(&self, nested: &[NestedModuleRef]) -> Result<Vec<PinnedManifest>, ExpandError> {
        let resolver = &self.resolver;
        let fetches = nested.iter().map(|n| async move {
            let query = forge_external::ModuleQuery {
                name: n.name.clone(),
                stream: n.stream.clone(),
                version: n.version,
                context: n.context.clone(),
            };
            let mut found = resolver.get_module_modulemds(&query, true).await?;
            found
                .pop()
                .ok_or_else(|| ExpandError::NoCandidates { name: n.name.clone(), stream: n.stream.clone() })
        });
        stream::iter(fetches)
            .buffer_unordered(NESTED_FETCH_CONCURRENCY)
            .try_collect()
            .await
    }
}

fn cartesian_product(per_requirement: &[Vec<Candidate>]) -> Vec<Vec<Candidate>> {
    per_requirement.iter().fold(vec![Vec::new()], |acc, candidates| {
        let mut next = Vec::with_capacity(acc.len() * candidates.len());
        for prefix in &acc {
            for candidate in candidates {
                let mut combo = prefix.clone();
                combo.push(candidate.clone());
                next.push(combo);
            }
        }
        next
    })
}

/// Cross-build-dependency consistency: every name referenced — whether as a
/// top-level chosen dependency or as a transitive buildrequire of one —
/// must agree on its stream across the whole combination.
fn is_consistent(combo: &[Candidate]) -> bool {
    let mut streams: BTreeMap<&str, &str> = BTreeMap::new();
    for candidate in combo {
        if !agree(&mut streams, &candidate.nsvc.name, &candidate.nsvc.stream) {
            return false;
        }
        for nsvc in candidate.transitive.values() {
            if !agree(&mut streams, &nsvc.name, &nsvc.stream) {
                return false;
            }
        }
    }
    true
}

fn agree<'a>(streams: &mut BTreeMap<&'a str, &'a str>, name: &'a str, stream: &'a str) -> bool {
    match streams.get(name) {
        Some(existing) => *existing == stream,
        None => {
            streams.insert(name, stream);
            true
        }
    }
}

/// Narrows `combos` to those matching every caller-supplied default stream,
/// falling back to the unfiltered set if the defaults eliminate everything
/// (a default naming a stream no surviving combo carries is simply moot).
fn apply_defaults<'a>(request: &ExpansionRequest, combos: &'a [&'a Vec<Candidate>]) -> Vec<&'a Vec<Candidate>> {
    if request.default_streams.is_empty() {
        return combos.to_vec();
    }
    let filtered: Vec<&Vec<Candidate>> = combos
        .iter()
        .filter(|combo| {
            request.requirements.iter().zip(combo.iter()).all(|(req, candidate)| {
                match request.default_streams.get(&req.name) {
                    Some(default_stream) => &candidate.nsvc.stream == default_stream,
                    None => true,
                }
            })
        })
        .copied()
        .collect();
    if filtered.is_empty() {
        combos.to_vec()
    } else {
        filtered
    }
}
