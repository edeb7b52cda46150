//! The [`ModuleBuild`] entity and its state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ContextHash, ModuleBuildId};
use crate::manifest::PinnedManifest;

/// Lifecycle states of a module build.
///
/// ```text
/// INIT ──► WAIT ──► BUILD ──► DONE ──► READY
///   │        │        │         │
///   └────────┴────────┴─► FAILED ◄─── (manual cancel or unrecoverable error)
/// ```
///
/// There is no legal transition out of `Failed` except resubmission, which
/// creates a brand new row rather than reusing this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleBuildState {
    Init,
    Wait,
    Build,
    Done,
    Ready,
    Failed,
}

impl ModuleBuildState {
    /// All states, in the order listed in the enum diagram. Used by the
    /// scheduler's exhaustiveness test and by the poller's per-state sweep.
    pub const ALL: [ModuleBuildState; 6] = [
        ModuleBuildState::Init,
        ModuleBuildState::Wait,
        ModuleBuildState::Build,
        ModuleBuildState::Done,
        ModuleBuildState::Ready,
        ModuleBuildState::Failed,
    ];

    /// `completed` is set iff the module is in one of these states.
    pub fn is_terminal_or_done(self) -> bool {
        matches!(self, Self::Done | Self::Ready | Self::Failed)
    }

    pub fn is_failed(self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Whether `from -> to` is a legal transition per the state diagram.
    /// `Failed` is reachable from every non-terminal state (manual cancel or
    /// unrecoverable error); there is no legal transition out of `Failed`.
    pub fn can_transition_to(self, to: ModuleBuildState) -> bool {
        use ModuleBuildState::*;
        match (self, to) {
            (Init, Wait) => true,
            (Wait, Build) => true,
            (Build, Done) => true,
            (Done, Ready) => true,
            (Init, Failed) | (Wait, Failed) | (Build, Failed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ModuleBuildState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::Wait => "wait",
            Self::Build => "build",
            Self::Done => "done",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Policy controlling which components are rebuilt on resubmission of an
/// otherwise-identical module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RebuildStrategy {
    /// Every component is rebuilt.
    All,
    /// Changed components, and every component in a later batch than any
    /// changed component, are rebuilt; everything else is reused.
    ChangedAndAfter,
    /// Only the components whose pinned commit changed are rebuilt.
    OnlyChanged,
}

impl Default for RebuildStrategy {
    fn default() -> Self {
        Self::ChangedAndAfter
    }
}

/// The top-level unit of work: a versioned group of package builds sharing a
/// tag and a pinned manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleBuild {
    pub id: ModuleBuildId,
    pub name: String,
    pub stream: String,
    pub version: i64,
    /// 8 hex character derivative of `build_context`/`runtime_context`; the
    /// human-readable discriminator between variants sharing
    /// `(name, stream, version)`.
    pub context: String,

    pub state: ModuleBuildState,
    pub state_reason: Option<String>,

    pub manifest: PinnedManifest,
    pub scmurl: String,
    pub owner: String,

    /// Assigned in WAIT; unset only in INIT and briefly during the WAIT
    /// handler's resolver round-trip.
    pub koji_tag: Option<String>,

    /// Current batch index. `0` before the first batch is selected.
    pub batch: i32,

    pub rebuild_strategy: RebuildStrategy,

    /// Tracks an in-flight repo-regen request so the batch-completion
    /// handler does not issue a second one while the first is outstanding.
    pub new_repo_task_id: Option<i64>,

    pub ref_build_context: ContextHash,
    pub build_context: ContextHash,
    pub runtime_context: ContextHash,

    pub submitted: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub completed: Option<DateTime<Utc>>,
}

impl ModuleBuild {
    /// `(name, stream, version, context)`, the module's NSVC.
    pub fn nsvc(&self) -> crate::ids::Nsvc {
        crate::ids::Nsvc::new(&self.name, &self.stream, self.version, &self.context)
    }

    /// Validates and applies a state transition, updating `modified` and, if
    /// the new state is terminal-or-done, `completed`. Returns the previous
    /// state so the caller can log it.
    pub fn transition(
        &mut self,
        to: ModuleBuildState,
        reason: impl Into<Option<String>>,
        now: DateTime<Utc>,
    ) -> Result<ModuleBuildState, InvalidTransition> {
        if !self.state.can_transition_to(to) {
            return Err(InvalidTransition {
                from: self.state,
                to,
            });
        }
        let previous = self.state;
        self.state = to;
        self.state_reason = reason.into();
        self.modified = now;
        if to.is_terminal_or_done() && self.completed.is_none() {
            self.completed = Some(now);
        }
        Ok(previous)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("illegal module build transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: ModuleBuildState,
    pub to: ModuleBuildState,
}

/// The public JSON projection of a [`ModuleBuild`], published on the bus
/// after every transition and (eventually) served by the REST collaborator.
/// Keeping one projection means the publish path and any future HTTP
/// response share the exact same shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleBuildSummary {
    pub id: ModuleBuildId,
    pub name: String,
    pub stream: String,
    pub version: i64,
    pub context: String,
    pub state: ModuleBuildState,
    pub state_reason: Option<String>,
    pub koji_tag: Option<String>,
    pub batch: i32,
    pub owner: String,
    pub submitted: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub completed: Option<DateTime<Utc>>,
}

impl From<&ModuleBuild> for ModuleBuildSummary {
    fn from(b: &ModuleBuild) -> Self {
        Self {
            id: b.id,
            name: b.name.clone(),
            stream: b.stream.clone(),
            version: b.version,
            context: b.context.clone(),
            state: b.state,
            state_reason: b.state_reason.clone(),
            koji_tag: b.koji_tag.clone(),
            batch: b.batch,
            owner: b.owner.clone(),
            submitted: b.submitted,
            modified: b.modified,
            completed: b.completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_transitions_follow_the_diagram() {
        use ModuleBuildState::*;
        assert!(Init.can_transition_to(Wait));
        assert!(Wait.can_transition_to(Build));
        assert!(Build.can_transition_to(Done));
        assert!(Done.can_transition_to(Ready));
        assert!(Build.can_transition_to(Failed));
        assert!(!Ready.can_transition_to(Build));
        assert!(!Failed.can_transition_to(Wait));
        assert!(!Init.can_transition_to(Build));
    }

    #[test]
    fn completed_is_set_exactly_on_terminal_states() {
        for state in ModuleBuildState::ALL {
            assert_eq!(
                state.is_terminal_or_done(),
                matches!(state, ModuleBuildState::Done | ModuleBuildState::Ready | ModuleBuildState::Failed)
            );
        }
    }
}
