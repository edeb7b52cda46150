//! Rebuild-reuse policy: decides which of a resubmitted module's
//! freshly-declared components can be satisfied by copying a prior build's
//! artifact rather than resubmitting to the builder.

use std::collections::BTreeMap;

use forge_domain::{ComponentBuild, ComponentRef, RebuildStrategy};

/// Packages eligible for reuse, keyed by package name, mapped to the prior
/// [`ComponentBuild`] whose artifact should be copied. A package absent from
/// the result is rebuilt from scratch.
pub fn plan_reuse(
    strategy: RebuildStrategy,
    components: &[ComponentRef],
    prior: &[ComponentBuild],
) -> BTreeMap<String, ComponentBuild> {
    let prior_by_package: BTreeMap<&str, &ComponentBuild> =
        prior.iter().map(|c| (c.package.as_str(), c)).collect();

    match strategy {
        RebuildStrategy::All => BTreeMap::new(),
        RebuildStrategy::OnlyChanged => components
            .iter()
            .filter_map(|c| {
                let prior_component = *prior_by_package.get(c.package.as_str())?;
                unchanged(c, prior_component).then(|| (c.package.clone(), prior_component.clone()))
            })
            .collect(),
        RebuildStrategy::ChangedAndAfter => {
            // The earliest batch touched by a change (or a brand-new
            // package, which counts as changed) forces every component at
            // or after it to rebuild even if individually unchanged.
            let first_changed_batch = components
                .iter()
                .filter(|c| match prior_by_package.get(c.package.as_str()) {
                    Some(prior_component) => !unchanged(c, prior_component),
                    None => true,
                })
                .map(|c| c.build_order)
                .min();

            components
                .iter()
                .filter_map(|c| {
                    let prior_component = *prior_by_package.get(c.package.as_str())?;
                    let before_change = match first_changed_batch {
                        Some(changed_at) => c.build_order < changed_at,
                        None => true,
                    };
                    (before_change && unchanged(c, prior_component)).then(|| (c.package.clone(), prior_component.clone()))
                })
                .collect()
        }
    }
}

fn unchanged(component_ref: &ComponentRef, prior: &ComponentBuild) -> bool {
    prior.is_complete() && prior.scmurl == component_ref.scmurl
}

#[cfg(test)]
mod tests {
    use forge_domain::{ComponentBuildId, ComponentBuildState, ModuleBuildId};

    use super::*;

    fn component_ref(package: &str, build_order: i32, scmurl: &str) -> ComponentRef {
        ComponentRef {
            package: package.into(),
            scmurl: scmurl.into(),
            format: "rpms".into(),
            build_order,
            build_time_only: false,
        }
    }

    fn prior_component(id: i64, package: &str, scmurl: &str) -> ComponentBuild {
        ComponentBuild {
            id: ComponentBuildId(id),
            module_id: ModuleBuildId(1),
            package: package.into(),
            scmurl: scmurl.into(),
            format: "rpms".into(),
            task_id: Some(100 + id),
            state: Some(ComponentBuildState::Complete),
            state_reason: None,
            nvr: Some(format!("{package}-1.0-1")),
            batch: 2,
            tagged: true,
            tagged_in_final: true,
            build_time_only: false,
            reused_component_id: None,
            weight: 1.0,
        }
    }

    #[test]
    fn all_strategy_reuses_nothing() {
        let prior = vec![prior_component(1, "foo", "https://example.com/foo#abc")];
        let components = vec![component_ref("foo", 0, "https://example.com/foo#abc")];
        assert!(plan_reuse(RebuildStrategy::All, &components, &prior).is_empty());
    }

    #[test]
    fn only_changed_reuses_just_the_untouched_package() {
        let prior = vec![
            prior_component(1, "foo", "https://example.com/foo#abc"),
            prior_component(2, "bar", "https://example.com/bar#abc"),
        ];
        let components = vec![
            component_ref("foo", 0, "https://example.com/foo#abc"),
            component_ref("bar", 0, "https://example.com/bar#def"),
        ];
        let reuse = plan_reuse(RebuildStrategy::OnlyChanged, &components, &prior);
        assert!(reuse.contains_key("foo"));
        assert!(!reuse.contains_key("bar"));
    }

    #[test]
    fn changed_and_after_rebuilds_every_later_batch_even_if_unchanged() {
        let prior = vec![
            prior_component(1, "early", "https://example.com/early#abc"),
            prior_component(2, "changed", "https://example.com/changed#abc"),
            prior_component(3, "later", "https://example.com/later#abc"),
        ];
        let components = vec![
            component_ref("early", 0, "https://example.com/early#abc"),
            component_ref("changed", 1, "https://example.com/changed#def"),
            component_ref("later", 1, "https://example.com/later#abc"),
        ];
        let reuse = plan_reuse(RebuildStrategy::ChangedAndAfter, &components, &prior);
        assert!(reuse.contains_key("early"));
        assert!(!reuse.contains_key("changed"));
        assert!(!reuse.contains_key("later"));
    }
}
