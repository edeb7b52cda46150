//! The [`ComponentBuild`] entity: one package build within a module.

use serde::{Deserialize, Serialize};

use crate::ids::{ComponentBuildId, ModuleBuildId};

/// The external build system's state enum for a single task. `None` on
/// [`ComponentBuild::state`] means "not submitted yet" — there is no variant
/// for it here because the build system never reports one; it is purely the
/// absence of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComponentBuildState {
    Building,
    Complete,
    Failed,
    Canceled,
    Deleted,
}

impl ComponentBuildState {
    pub const ALL: [ComponentBuildState; 5] = [
        ComponentBuildState::Building,
        ComponentBuildState::Complete,
        ComponentBuildState::Failed,
        ComponentBuildState::Canceled,
        ComponentBuildState::Deleted,
    ];

    /// `FAILED`/`CANCELED` are unrecoverable: the poller treats a `BUILDING`
    /// task that the builder now reports in one of these as "the task died
    /// without us getting the message."
    pub fn is_dead(self) -> bool {
        matches!(self, Self::Failed | Self::Canceled)
    }
}

impl std::fmt::Display for ComponentBuildState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Building => "BUILDING",
            Self::Complete => "COMPLETE",
            Self::Failed => "FAILED",
            Self::Canceled => "CANCELED",
            Self::Deleted => "DELETED",
        };
        write!(f, "{s}")
    }
}

/// One package build inside a module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentBuild {
    pub id: ComponentBuildId,
    pub module_id: ModuleBuildId,
    pub package: String,
    /// Source URL, already pinned to a concrete commit.
    pub scmurl: String,
    pub format: String,

    /// Opaque identifier from the external builder; set when submission
    /// succeeds.
    pub task_id: Option<i64>,
    pub state: Option<ComponentBuildState>,
    pub state_reason: Option<String>,

    /// The concrete artifact identifier; set iff `state == Some(Complete)`.
    pub nvr: Option<String>,

    pub batch: i32,
    pub tagged: bool,
    pub tagged_in_final: bool,
    pub build_time_only: bool,

    /// Cross-module reuse: the component this one's artifact was copied
    /// from, if any. Always refers to a component in state `Complete`.
    pub reused_component_id: Option<ComponentBuildId>,

    /// Build-system cost hint, used only for scheduling heuristics; not
    /// itself load-bearing for correctness.
    pub weight: f64,
}

impl ComponentBuild {
    pub fn is_complete(&self) -> bool {
        matches!(self.state, Some(ComponentBuildState::Complete))
    }

    pub fn is_dead(&self) -> bool {
        matches!(self.state, Some(s) if s.is_dead())
    }

    pub fn is_building(&self) -> bool {
        matches!(self.state, Some(ComponentBuildState::Building))
    }

    /// A component not yet submitted, or submitted and immediately failed to
    /// obtain a `task_id`: it sits here until a batch evaluation or the
    /// poller notices the module can never complete.
    pub fn awaiting_submission(&self) -> bool {
        self.state.is_none() && self.task_id.is_none()
    }
}
