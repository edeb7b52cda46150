//! Append-only audit logs. Every state change of a [`ModuleBuild`] or
//! [`ComponentBuild`] detected on commit appends one row here; rows are
//! never mutated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::component_build::ComponentBuildState;
use crate::ids::{ComponentBuildId, ModuleBuildId};
use crate::module_build::ModuleBuildState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleBuildTrace {
    pub id: i64,
    pub module_id: ModuleBuildId,
    pub state_time: DateTime<Utc>,
    pub state: ModuleBuildState,
    pub state_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentBuildTrace {
    pub id: i64,
    pub component_id: ComponentBuildId,
    pub state_time: DateTime<Utc>,
    pub state: Option<ComponentBuildState>,
    pub state_reason: Option<String>,
    pub task_id: Option<i64>,
}
