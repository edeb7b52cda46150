//! Row shapes as sqlite actually stores them, and the conversions to/from
//! the domain types in `forge_domain`. Kept separate from the domain crate
//! so that crate stays free of any persistence concern.

use chrono::{DateTime, Utc};
use forge_domain::{
    ComponentBuild, ComponentBuildId, ComponentBuildState, ModuleBuild, ModuleBuildId, ModuleBuildState,
    PinnedManifest, RebuildStrategy,
};
use sqlx::FromRow;

use crate::error::StoreError;

#[derive(Debug, FromRow)]
pub(crate) struct ModuleBuildRow {
    pub id: i64,
    pub name: String,
    pub stream: String,
    pub version: i64,
    pub context: String,
    pub state: String,
    pub state_reason: Option<String>,
    pub manifest_json: String,
    pub scmurl: String,
    pub owner: String,
    pub koji_tag: Option<String>,
    pub batch: i32,
    pub rebuild_strategy: String,
    pub new_repo_task_id: Option<i64>,
    pub ref_build_context: String,
    pub build_context: String,
    pub runtime_context: String,
    pub submitted: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub completed: Option<DateTime<Utc>>,
}

impl TryFrom<ModuleBuildRow> for ModuleBuild {
    type Error = StoreError;

    fn try_from(row: ModuleBuildRow) -> Result<Self, Self::Error> {
        Ok(ModuleBuild {
            id: ModuleBuildId(row.id),
            name: row.name,
            stream: row.stream,
            version: row.version,
            context: row.context,
            state: parse_module_state(&row.state)?,
            state_reason: row.state_reason,
            manifest: serde_json::from_str::<PinnedManifest>(&row.manifest_json)?,
            scmurl: row.scmurl,
            owner: row.owner,
            koji_tag: row.koji_tag,
            batch: row.batch,
            rebuild_strategy: parse_rebuild_strategy(&row.rebuild_strategy)?,
            new_repo_task_id: row.new_repo_task_id,
            ref_build_context: forge_domain::ContextHash(row.ref_build_context),
            build_context: forge_domain::ContextHash(row.build_context),
            runtime_context: forge_domain::ContextHash(row.runtime_context),
            submitted: row.submitted,
            modified: row.modified,
            completed: row.completed,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ComponentBuildRow {
    pub id: i64,
    pub module_id: i64,
    pub package: String,
    pub scmurl: String,
    pub format: String,
    pub task_id: Option<i64>,
    pub state: Option<String>,
    pub state_reason: Option<String>,
    pub nvr: Option<String>,
    pub batch: i32,
    pub tagged: bool,
    pub tagged_in_final: bool,
    pub build_time_only: bool,
    pub reused_component_id: Option<i64>,
    pub weight: f64,
}

impl TryFrom<ComponentBuildRow> for ComponentBuild {
    type Error = StoreError;

    fn try_from(row: ComponentBuildRow) -> Result<Self, Self::Error> {
        Ok(ComponentBuild {
            id: ComponentBuildId(row.id),
            module_id: ModuleBuildId(row.module_id),
            package: row.package,
            scmurl: row.scmurl,
            format: row.format,
            task_id: row.task_id,
            state: row.state.as_deref().map(parse_component_state).transpose()?,
            state_reason: row.state_reason,
            nvr: row.nvr,
            batch: row.batch,
            tagged: row.tagged,
            tagged_in_final: row.tagged_in_final,
            build_time_only: row.build_time_only,
            reused_component_id: row.reused_component_id.map(ComponentBuildId),
            weight: row.weight,
        })
    }
}

pub(crate) fn module_state_str(state: ModuleBuildState) -> &'static str {
    match state {
        ModuleBuildState::Init => "init",
        ModuleBuildState::Wait => "wait",
        ModuleBuildState::Build => "build",
        ModuleBuildState::Done => "done",
        ModuleBuildState::Ready => "ready",
        ModuleBuildState::Failed => "failed",
    }
}

fn parse_module_state(s: &str) -> Result<ModuleBuildState, StoreError> {
    Ok(match s {
        "init" => ModuleBuildState::Init,
        "wait" => ModuleBuildState::Wait,
        "build" => ModuleBuildState::Build,
        "done" => ModuleBuildState::Done,
        "ready" => ModuleBuildState::Ready,
        "failed" => ModuleBuildState::Failed,
        other => {
            return Err(StoreError::BadEnumValue {
                field: "module_builds.state",
                value: other.to_string(),
            })
        }
    })
}

pub(crate) fn component_state_str(state: ComponentBuildState) -> &'static str {
    match state {
        ComponentBuildState::Building => "BUILDING",
        ComponentBuildState::Complete => "COMPLETE",
        ComponentBuildState::Failed => "FAILED",
        ComponentBuildState::Canceled => "CANCELED",
        ComponentBuildState::Deleted => "DELETED",
    }
}

fn parse_component_state(s: &str) -> Result<ComponentBuildState, StoreError> {
    Ok(match s {
        "BUILDING" => ComponentBuildState::Building,
        "COMPLETE" => ComponentBuildState::Complete,
        "FAILED" => ComponentBuildState::Failed,
        "CANCELED" => ComponentBuildState::Canceled,
        "DELETED" => ComponentBuildState::Deleted,
        other => {
            return Err(StoreError::BadEnumValue {
                field: "component_builds.state",
                value: other.to_string(),
            })
        }
    })
}

pub(crate) fn rebuild_strategy_str(s: RebuildStrategy) -> &'static str {
    match s {
        RebuildStrategy::All => "all",
        RebuildStrategy::ChangedAndAfter => "changed-and-after",
        RebuildStrategy::OnlyChanged => "only-changed",
    }
}

fn parse_rebuild_strategy(s: &str) -> Result<RebuildStrategy, StoreError> {
    Ok(match s {
        "all" => RebuildStrategy::All,
        "changed-and-after" => RebuildStrategy::ChangedAndAfter,
        "only-changed" => RebuildStrategy::OnlyChanged,
        other => {
            return Err(StoreError::BadEnumValue {
                field: "module_builds.rebuild_strategy",
                value: other.to_string(),
            })
        }
    })
}
