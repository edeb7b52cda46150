//! The four events the scheduler reacts to.
//!
//! Every variant carries a `msg_id` — a stable identifier the *producer*
//! assigns once and never changes on redelivery. The bus gives no ordering or
//! exactly-once guarantee, only "complete or absent": a consumer either sees
//! the whole event with a given `msg_id`, or never sees it at all. Dedup is
//! the consumer's job (the poller tracks `msg_id`s it has already folded into
//! store state), not the transport's.

use forge_domain::ComponentBuildState;
use serde::{Deserialize, Serialize};

/// A package build changed state in the external build system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentStateChanged {
    pub msg_id: String,
    pub task_id: i64,
    pub state: ComponentBuildState,
    pub state_reason: Option<String>,
    /// Set iff `state == Complete`.
    pub nvr: Option<String>,
}

/// A buildroot repo finished regenerating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoRegenerated {
    pub msg_id: String,
    pub repo_id: i64,
    pub tag: String,
}

/// A package's tag membership changed (tagged in, or untagged).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagChanged {
    pub msg_id: String,
    pub tag: String,
    pub nvr: String,
    pub tagged: bool,
}

/// Another module build (possibly ours, echoed back; possibly a sibling we
/// are waiting on for cross-module reuse) changed state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleStateChanged {
    pub msg_id: String,
    pub name: String,
    pub stream: String,
    pub version: i64,
    pub context: String,
    pub state: String,
    /// Set on a manual-cancel-triggered `failed`; `None` for ordinary
    /// forward progress.
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BusEvent {
    ComponentStateChanged(ComponentStateChanged),
    RepoRegenerated(RepoRegenerated),
    TagChanged(TagChanged),
    ModuleStateChanged(ModuleStateChanged),
}

impl BusEvent {
    pub fn msg_id(&self) -> &str {
        match self {
            BusEvent::ComponentStateChanged(e) => &e.msg_id,
            BusEvent::RepoRegenerated(e) => &e.msg_id,
            BusEvent::TagChanged(e) => &e.msg_id,
            BusEvent::ModuleStateChanged(e) => &e.msg_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BusEvent::ComponentStateChanged(_) => "component_state_changed",
            BusEvent::RepoRegenerated(_) => "repo_regenerated",
            BusEvent::TagChanged(_) => "tag_changed",
            BusEvent::ModuleStateChanged(_) => "module_state_changed",
        }
    }
}
