//! End-to-end exercises of the handler pipeline against an in-memory store:
//! happy path, concurrency ceiling, and failure propagation.

use std::collections::BTreeMap;
use std::sync::Arc;

use forge_bus::{BusEvent, ChannelBus, ComponentStateChanged, RepoRegenerated, TagChanged};
use forge_domain::{ComponentBuildState, ComponentRef, ModuleBuildState, PinnedManifest, RebuildStrategy};
use forge_external::{BuildSubmission, MockBuilder, MockResolver};
use forge_scheduler::{handlers, SchedulerConfig};
use forge_store::Store;

fn manifest(name: &str, components: Vec<ComponentRef>) -> PinnedManifest {
    PinnedManifest {
        name: name.into(),
        stream: "f29".into(),
        version: 1,
        context: "deadbeef".into(),
        buildrequires: BTreeMap::new(),
        components,
    }
}

fn component(package: &str, build_order: i32) -> ComponentRef {
    ComponentRef {
        package: package.into(),
        scmurl: format!("https://example.com/{package}.git#abc"),
        format: "rpms".into(),
        build_order,
        build_time_only: false,
    }
}

fn building(task_id: i64) -> Result<BuildSubmission, forge_external::BuilderError> {
    Ok(BuildSubmission {
        task_id: Some(task_id),
        state: ComponentBuildState::Building,
        reason: None,
    })
}

fn context() -> (forge_scheduler::HandlerContext, Arc<MockBuilder>, Arc<MockResolver>) {
    let builder = Arc::new(MockBuilder::new());
    let resolver = Arc::new(MockResolver::new());
    let bus = Arc::new(ChannelBus::new(64));
    let ctx = forge_scheduler::HandlerContext::new(SchedulerConfig::default(), bus, builder.clone(), resolver.clone());
    (ctx, builder, resolver)
}

#[tokio::test]
async fn happy_path_drives_a_module_from_submission_to_ready() {
    let (ctx, builder, resolver) = context();
    let store = Store::connect_in_memory().await.unwrap();

    let m = manifest("testmodule", vec![component("foo", 0), component("bar", 1), component("baz", 1)]);

    let mut session = store.begin().await.unwrap();
    let mut module = forge_scheduler::submit_module(
        &ctx,
        &mut session,
        forge_scheduler::SubmissionRequest {
            manifest: m,
            scmurl: "https://example.com/testmodule.git#abc".into(),
            owner: "alice".into(),
            rebuild_strategy: RebuildStrategy::ChangedAndAfter,
        },
    )
    .await
    .unwrap();
    session.commit().await.unwrap();
    assert_eq!(module.state, ModuleBuildState::Wait);

    // WAIT: resolve deps/tag, connect buildroot, submit module-build-macros.
    resolver.expect_get_module_build_dependencies(Ok(vec![]));
    resolver.expect_get_module_tag(Ok("module-testmodule-f29-1".into()));
    builder.expect_buildroot_connect(Ok(()));
    builder.expect_get_disttag_srpm(Ok("/srpms/macros.src.rpm".into()));
    builder.expect_build(building(1));

    let mut session = store.begin().await.unwrap();
    handlers::wait::handle_wait(&ctx, &mut session, &mut module).await.unwrap();
    session.commit().await.unwrap();
    assert_eq!(module.state, ModuleBuildState::Build);
    assert_eq!(module.batch, 1);

    // Batch 1 (macros) completes -> submit batch 2 (`foo`).
    builder.expect_build(building(2));
    let mut session = store.begin().await.unwrap();
    handlers::build::handle_component_state_changed(
        &ctx,
        &mut session,
        &mut module,
        &ComponentStateChanged {
            msg_id: "m1".into(),
            task_id: 1,
            state: ComponentBuildState::Complete,
            state_reason: None,
            nvr: Some("module-build-macros-1-1".into()),
        },
    )
    .await
    .unwrap();
    session.commit().await.unwrap();

    // `foo` completes and gets tagged -> regen requested for batch 2.
    builder.expect_new_repo(Ok(101));
    let mut session = store.begin().await.unwrap();
    handlers::build::handle_component_state_changed(
        &ctx,
        &mut session,
        &mut module,
        &ComponentStateChanged {
            msg_id: "m2".into(),
            task_id: 2,
            state: ComponentBuildState::Complete,
            state_reason: None,
            nvr: Some("foo-1.0-1".into()),
        },
    )
    .await
    .unwrap();
    session.commit().await.unwrap();

    let mut session = store.begin().await.unwrap();
    handlers::build::handle_tag_changed(
        &ctx,
        &mut session,
        &mut module,
        &TagChanged {
            msg_id: "t1".into(),
            tag: "module-testmodule-f29-1".into(),
            nvr: "foo-1.0-1".into(),
            tagged: true,
        },
    )
    .await
    .unwrap();
    session.commit().await.unwrap();
    assert_eq!(module.new_repo_task_id, Some(101));

    // Regen completes -> batch 3 (`bar`, `baz`) submitted together.
    builder.expect_build(building(3));
    builder.expect_build(building(4));
    let mut session = store.begin().await.unwrap();
    handlers::build::handle_repo_regenerated(
        &ctx,
        &mut session,
        &mut module,
        &RepoRegenerated {
            msg_id: "r1".into(),
            repo_id: 101,
            tag: "module-testmodule-f29-1".into(),
        },
    )
    .await
    .unwrap();
    session.commit().await.unwrap();
    assert_eq!(module.batch, 3);

    let mut last_followups = Vec::new();
    for (task_id, nvr) in [(3, "bar-1.0-1"), (4, "baz-1.0-1")] {
        let mut session = store.begin().await.unwrap();
        handlers::build::handle_component_state_changed(
            &ctx,
            &mut session,
            &mut module,
            &ComponentStateChanged {
                msg_id: format!("c{task_id}"),
                task_id,
                state: ComponentBuildState::Complete,
                state_reason: None,
                nvr: Some(nvr.into()),
            },
        )
        .await
        .unwrap();
        session.commit().await.unwrap();

        let mut session = store.begin().await.unwrap();
        last_followups = handlers::build::handle_tag_changed(
            &ctx,
            &mut session,
            &mut module,
            &TagChanged {
                msg_id: format!("t{task_id}"),
                tag: "module-testmodule-f29-1".into(),
                nvr: nvr.into(),
                tagged: true,
            },
        )
        .await
        .unwrap();
        session.commit().await.unwrap();
    }

    // No further batches: the last component's tag-change handling synthesizes
    // the final regen itself rather than waiting on a real builder round trip.
    assert_eq!(last_followups.len(), 1);
    let BusEvent::RepoRegenerated(synthetic_regen) = last_followups.remove(0) else {
        panic!("expected a synthesized RepoRegenerated event");
    };

    let mut session = store.begin().await.unwrap();
    handlers::build::handle_repo_regenerated(&ctx, &mut session, &mut module, &synthetic_regen)
        .await
        .unwrap();
    session.commit().await.unwrap();

    assert_eq!(module.state, ModuleBuildState::Ready);

    builder.verify();
    resolver.verify();
}

#[tokio::test]
async fn a_failed_component_fails_the_module_and_cancels_its_siblings() {
    let (ctx, builder, resolver) = context();
    let store = Store::connect_in_memory().await.unwrap();

    let m = manifest("testmodule", vec![component("foo", 0), component("bar", 0)]);

    let mut session = store.begin().await.unwrap();
    let mut module = forge_scheduler::submit_module(
        &ctx,
        &mut session,
        forge_scheduler::SubmissionRequest {
            manifest: m,
            scmurl: "https://example.com/testmodule.git#abc".into(),
            owner: "alice".into(),
            rebuild_strategy: RebuildStrategy::ChangedAndAfter,
        },
    )
    .await
    .unwrap();
    session.commit().await.unwrap();

    resolver.expect_get_module_build_dependencies(Ok(vec![]));
    resolver.expect_get_module_tag(Ok("module-testmodule-f29-1".into()));
    builder.expect_buildroot_connect(Ok(()));
    builder.expect_get_disttag_srpm(Ok("/srpms/macros.src.rpm".into()));
    builder.expect_build(building(1));

    let mut session = store.begin().await.unwrap();
    handlers::wait::handle_wait(&ctx, &mut session, &mut module).await.unwrap();
    session.commit().await.unwrap();

    builder.expect_build(building(2));
    builder.expect_build(building(3));
    let mut session = store.begin().await.unwrap();
    handlers::build::handle_component_state_changed(
        &ctx,
        &mut session,
        &mut module,
        &ComponentStateChanged {
            msg_id: "m1".into(),
            task_id: 1,
            state: ComponentBuildState::Complete,
            state_reason: None,
            nvr: Some("module-build-macros-1-1".into()),
        },
    )
    .await
    .unwrap();
    session.commit().await.unwrap();
    assert_eq!(module.batch, 2);

    // `bar` fails while `foo` is still BUILDING: the module fails and `foo`'s
    // task is cancelled.
    builder.expect_cancel_build(Ok(()));
    let mut session = store.begin().await.unwrap();
    handlers::build::handle_component_state_changed(
        &ctx,
        &mut session,
        &mut module,
        &ComponentStateChanged {
            msg_id: "m2".into(),
            task_id: 3,
            state: ComponentBuildState::Failed,
            state_reason: Some("rpmbuild exited nonzero".into()),
            nvr: None,
        },
    )
    .await
    .unwrap();
    session.commit().await.unwrap();

    assert_eq!(module.state, ModuleBuildState::Failed);
    builder.verify();
    resolver.verify();
}

#[tokio::test]
async fn concurrency_ceiling_of_one_never_submits_two_components_at_once() {
    let (ctx, builder, resolver) = context();
    let mut ctx = ctx;
    ctx.config.max_concurrent_component_builds = 1;
    let store = Store::connect_in_memory().await.unwrap();

    let components = (0..5).map(|i| component(&format!("pkg{i}"), 0)).collect();
    let m = manifest("testmodule", components);

    let mut session = store.begin().await.unwrap();
    let mut module = forge_scheduler::submit_module(
        &ctx,
        &mut session,
        forge_scheduler::SubmissionRequest {
            manifest: m,
            scmurl: "https://example.com/testmodule.git#abc".into(),
            owner: "alice".into(),
            rebuild_strategy: RebuildStrategy::ChangedAndAfter,
        },
    )
    .await
    .unwrap();
    session.commit().await.unwrap();

    resolver.expect_get_module_build_dependencies(Ok(vec![]));
    resolver.expect_get_module_tag(Ok("module-testmodule-f29-1".into()));
    builder.expect_buildroot_connect(Ok(()));
    builder.expect_get_disttag_srpm(Ok("/srpms/macros.src.rpm".into()));
    builder.expect_build(building(1));

    let mut session = store.begin().await.unwrap();
    handlers::wait::handle_wait(&ctx, &mut session, &mut module).await.unwrap();
    session.commit().await.unwrap();

    // Macros completes; the ceiling of 1 means only `pkg0` is submitted even
    // though batch 2 holds five components.
    builder.expect_build(building(2));
    let mut session = store.begin().await.unwrap();
    handlers::build::handle_component_state_changed(
        &ctx,
        &mut session,
        &mut module,
        &ComponentStateChanged {
            msg_id: "m1".into(),
            task_id: 1,
            state: ComponentBuildState::Complete,
            state_reason: None,
            nvr: Some("module-build-macros-1-1".into()),
        },
    )
    .await
    .unwrap();
    let building_count = session.components_building_count().await.unwrap();
    session.commit().await.unwrap();
    assert_eq!(building_count, 1);

    builder.verify();
    resolver.verify();
}
