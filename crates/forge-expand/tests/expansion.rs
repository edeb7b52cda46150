use std::collections::BTreeMap;
use std::sync::Arc;

use forge_domain::{Nsvc, PinnedManifest};
use forge_expand::{DependencyRequirement, Expander, ExpansionRequest};
use forge_external::MockResolver;

fn candidate(name: &str, stream: &str, version: i64, context: &str) -> PinnedManifest {
    PinnedManifest {
        name: name.into(),
        stream: stream.into(),
        version,
        context: context.into(),
        buildrequires: BTreeMap::new(),
        components: vec![],
    }
}

fn base_request(requirements: Vec<DependencyRequirement>) -> ExpansionRequest {
    ExpansionRequest {
        name: "testmodule".into(),
        stream: "master".into(),
        raw_version: 20190101000000,
        base_module_stream: "f29.1.0".into(),
        base_module_nsvc: Nsvc::new("platform", "f29", 3, "00000000"),
        requirements,
        components: vec![],
        nested_modules: vec![],
        default_streams: BTreeMap::new(),
        allow_ambiguous: false,
    }
}

#[tokio::test]
async fn single_stream_dependency_yields_one_variant() {
    let resolver = Arc::new(MockResolver::new());
    resolver.expect_get_buildrequired_modulemds(Ok(vec![candidate("foo", "1", 5, "abcdef01")]));

    let expander = Expander::new(resolver.clone());
    let request = base_request(vec![DependencyRequirement {
        name: "foo".into(),
        streams: vec!["1".into()],
        excludes: vec![],
        known_streams: vec!["1".into()],
        build_time_only: false,
    }]);

    let variants = expander.expand(&request).await.unwrap();
    assert_eq!(variants.len(), 1);
    assert_eq!(variants[0].buildrequires["foo"].stream, "1");
    resolver.verify();
}

#[tokio::test]
async fn two_candidate_streams_without_ambiguity_consent_fails() {
    let resolver = Arc::new(MockResolver::new());
    resolver.expect_get_buildrequired_modulemds(Ok(vec![candidate("gtk", "1", 1, "aaaaaaaa")]));
    resolver.expect_get_buildrequired_modulemds(Ok(vec![candidate("gtk", "2", 1, "bbbbbbbb")]));

    let expander = Expander::new(resolver.clone());
    let mut request = base_request(vec![DependencyRequirement {
        name: "gtk".into(),
        streams: vec![],
        excludes: vec![],
        known_streams: vec!["1".into(), "2".into()],
        build_time_only: false,
    }]);
    request.allow_ambiguous = false;

    let err = expander.expand(&request).await.unwrap_err();
    assert!(matches!(err, forge_expand::ExpandError::StreamAmbiguous { .. }));
    resolver.verify();
}

#[tokio::test]
async fn defaults_narrow_an_ambiguous_expansion_to_one_variant() {
    let resolver = Arc::new(MockResolver::new());
    resolver.expect_get_buildrequired_modulemds(Ok(vec![candidate("gtk", "1", 1, "aaaaaaaa")]));
    resolver.expect_get_buildrequired_modulemds(Ok(vec![candidate("gtk", "2", 1, "bbbbbbbb")]));

    let expander = Expander::new(resolver.clone());
    let mut request = base_request(vec![DependencyRequirement {
        name: "gtk".into(),
        streams: vec![],
        excludes: vec![],
        known_streams: vec!["1".into(), "2".into()],
        build_time_only: false,
    }]);
    request.default_streams.insert("gtk".into(), "1".into());

    let variants = expander.expand(&request).await.unwrap();
    assert_eq!(variants.len(), 1);
    assert_eq!(variants[0].buildrequires["gtk"].stream, "1");
    resolver.verify();
}

#[tokio::test]
async fn cross_dependency_stream_disagreement_is_pruned() {
    let resolver = Arc::new(MockResolver::new());
    let mut gtk1 = candidate("gtk", "1", 1, "aaaaaaaa");
    gtk1.buildrequires.insert("platform".into(), Nsvc::new("platform", "f29", 3, "00000000"));
    let mut gtk2 = candidate("gtk", "2", 1, "bbbbbbbb");
    gtk2.buildrequires.insert("platform".into(), Nsvc::new("platform", "f30", 3, "00000000"));
    resolver.expect_get_buildrequired_modulemds(Ok(vec![gtk1]));
    resolver.expect_get_buildrequired_modulemds(Ok(vec![gtk2]));
    resolver.expect_get_buildrequired_modulemds(Ok(vec![candidate("platform", "f29", 3, "00000000")]));

    let expander = Expander::new(resolver.clone());
    let mut request = base_request(vec![
        DependencyRequirement {
            name: "gtk".into(),
            streams: vec![],
            excludes: vec![],
            known_streams: vec!["1".into(), "2".into()],
            build_time_only: false,
        },
        DependencyRequirement {
            name: "platform".into(),
            streams: vec!["f29".into()],
            excludes: vec![],
            known_streams: vec!["f29".into()],
            build_time_only: false,
        },
    ]);
    request.allow_ambiguous = true;

    let variants = expander.expand(&request).await.unwrap();
    // gtk:2 disagrees with the chosen platform:f29 on platform's stream, so
    // only the gtk:1 combination survives pruning.
    assert_eq!(variants.len(), 1);
    assert_eq!(variants[0].buildrequires["gtk"].stream, "1");
    resolver.verify();
}

#[tokio::test]
async fn stream_version_is_used_as_a_version_prefix() {
    let resolver = Arc::new(MockResolver::new());
    let expander = Expander::new(resolver.clone());
    let request = base_request(vec![]);
    let variants = expander.expand(&request).await.unwrap();
    assert_eq!(variants.len(), 1);
    assert!(variants[0].version > 290100 * 10_i64.pow(13));
    resolver.verify();
}
