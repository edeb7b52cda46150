//! A transactional session: all reads and writes a handler makes happen
//! through one of these, and nothing is visible to other sessions until
//! [`StoreSession::commit`] runs the pre-commit trace hook and commits the
//! underlying sqlite transaction.
//!
//! sqlx rolls a `Transaction` back automatically when it is dropped without
//! an explicit commit, so an early `?` return out of a handler is already
//! safe; [`StoreSession::rollback`] exists only to make that path explicit
//! and loggable at the call site.

use std::collections::HashMap;

use chrono::Utc;
use forge_domain::{
    ComponentBuild, ComponentBuildId, ComponentBuildState, ModuleBuild, ModuleBuildId, ModuleBuildState,
};
use sqlx::{Row, Sqlite, Transaction};

use crate::error::StoreError;
use crate::row::{self, ComponentBuildRow, ModuleBuildRow};

pub struct StoreSession {
    tx: Transaction<'static, Sqlite>,
    dirty_modules: HashMap<ModuleBuildId, ModuleBuild>,
    dirty_components: HashMap<ComponentBuildId, ComponentBuild>,
}

impl StoreSession {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>) -> Self {
        Self {
            tx,
            dirty_modules: HashMap::new(),
            dirty_components: HashMap::new(),
        }
    }

    // -- module builds --------------------------------------------------

    pub async fn create_module(&mut self, mut module: ModuleBuild) -> Result<ModuleBuild, StoreError> {
        let manifest_json = serde_json::to_string(&module.manifest)?;
        let id: i64 = sqlx::query(
            r#"
            INSERT INTO module_builds
                (name, stream, version, context, state, state_reason, manifest_json,
                 scmurl, owner, koji_tag, batch, rebuild_strategy, new_repo_task_id,
                 ref_build_context, build_context, runtime_context, submitted, modified, completed)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&module.name)
        .bind(&module.stream)
        .bind(module.version)
        .bind(&module.context)
        .bind(row::module_state_str(module.state))
        .bind(&module.state_reason)
        .bind(&manifest_json)
        .bind(&module.scmurl)
        .bind(&module.owner)
        .bind(&module.koji_tag)
        .bind(module.batch)
        .bind(row::rebuild_strategy_str(module.rebuild_strategy))
        .bind(module.new_repo_task_id)
        .bind(module.ref_build_context.as_str())
        .bind(module.build_context.as_str())
        .bind(module.runtime_context.as_str())
        .bind(module.submitted)
        .bind(module.modified)
        .bind(module.completed)
        .fetch_one(&mut *self.tx)
        .await?
        .try_get("id")?;

        module.id = ModuleBuildId(id);
        self.dirty_modules.insert(module.id, module.clone());
        Ok(module)
    }

    pub async fn save_module(&mut self, module: &ModuleBuild) -> Result<(), StoreError> {
        let manifest_json = serde_json::to_string(&module.manifest)?;
        sqlx::query(
            r#"
            UPDATE module_builds SET
                state = ?, state_reason = ?, manifest_json = ?, scmurl = ?, owner = ?,
                koji_tag = ?, batch = ?, rebuild_strategy = ?, new_repo_task_id = ?,
                ref_build_context = ?, build_context = ?, runtime_context = ?,
                modified = ?, completed = ?
            WHERE id = ?
            "#,
        )
        .bind(row::module_state_str(module.state))
        .bind(&module.state_reason)
        .bind(&manifest_json)
        .bind(&module.scmurl)
        .bind(&module.owner)
        .bind(&module.koji_tag)
        .bind(module.batch)
        .bind(row::rebuild_strategy_str(module.rebuild_strategy))
        .bind(module.new_repo_task_id)
        .bind(module.ref_build_context.as_str())
        .bind(module.build_context.as_str())
        .bind(module.runtime_context.as_str())
        .bind(module.modified)
        .bind(module.completed)
        .bind(module.id.0)
        .execute(&mut *self.tx)
        .await?;

        self.dirty_modules.insert(module.id, module.clone());
        Ok(())
    }

    pub async fn get_module(&mut self, id: ModuleBuildId) -> Result<Option<ModuleBuild>, StoreError> {
        let row: Option<ModuleBuildRow> = sqlx::query_as("SELECT * FROM module_builds WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(ModuleBuild::try_from).transpose()
    }

    pub async fn get_module_by_nsvc(
        &mut self,
        name: &str,
        stream: &str,
        version: i64,
        context: &str,
    ) -> Result<Option<ModuleBuild>, StoreError> {
        let row: Option<ModuleBuildRow> = sqlx::query_as(
            "SELECT * FROM module_builds WHERE name = ? AND stream = ? AND version = ? AND context = ?",
        )
        .bind(name)
        .bind(stream)
        .bind(version)
        .bind(context)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(ModuleBuild::try_from).transpose()
    }

    /// `last_build_in_all_streams(name)` — the highest-version, non-failed
    /// build per stream for a name.
    pub async fn last_build_in_all_streams(&mut self, name: &str) -> Result<Vec<ModuleBuild>, StoreError> {
        let rows: Vec<ModuleBuildRow> = sqlx::query_as(
            r#"
            SELECT m.* FROM module_builds m
            INNER JOIN (
                SELECT stream, MAX(version) AS max_version
                FROM module_builds
                WHERE name = ? AND state != 'failed'
                GROUP BY stream
            ) latest ON m.stream = latest.stream AND m.version = latest.max_version
            WHERE m.name = ? AND m.state != 'failed'
            ORDER BY m.stream
            "#,
        )
        .bind(name)
        .bind(name)
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(ModuleBuild::try_from).collect()
    }

    /// `last_build_in_stream(name, stream)` — the highest-version, non-failed
    /// build for one specific `(name, stream)`, used by the rebuild-strategy
    /// comparison to find what a resubmission should diff against.
    pub async fn last_build_in_stream(&mut self, name: &str, stream: &str) -> Result<Option<ModuleBuild>, StoreError> {
        let row: Option<ModuleBuildRow> = sqlx::query_as(
            "SELECT * FROM module_builds WHERE name = ? AND stream = ? AND state != 'failed' \
             ORDER BY version DESC LIMIT 1",
        )
        .bind(name)
        .bind(stream)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(ModuleBuild::try_from).transpose()
    }

    /// `by_state(state)` — every module currently in a given state; used by
    /// the poller's per-state sweeps.
    pub async fn by_state(&mut self, state: ModuleBuildState) -> Result<Vec<ModuleBuild>, StoreError> {
        let rows: Vec<ModuleBuildRow> = sqlx::query_as("SELECT * FROM module_builds WHERE state = ? ORDER BY id")
            .bind(row::module_state_str(state))
            .fetch_all(&mut *self.tx)
            .await?;
        rows.into_iter().map(ModuleBuild::try_from).collect()
    }

    /// `from_tag(tag)` — the module whose buildroot tag is `tag`, used to
    /// correlate an incoming `TagChanged`/`RepoRegenerated` event (which only
    /// carries the tag) back to a module row.
    pub async fn from_tag(&mut self, tag: &str) -> Result<Option<ModuleBuild>, StoreError> {
        let row: Option<ModuleBuildRow> = sqlx::query_as("SELECT * FROM module_builds WHERE koji_tag = ?")
            .bind(tag)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(ModuleBuild::try_from).transpose()
    }

    /// `siblings(module)` — module ids sharing `(name, stream, version)` but
    /// a different `context`.
    pub async fn siblings(&mut self, module: &ModuleBuild) -> Result<Vec<ModuleBuildId>, StoreError> {
        let ids: Vec<(i64,)> = sqlx::query_as(
            "SELECT id FROM module_builds WHERE name = ? AND stream = ? AND version = ? AND context != ?",
        )
        .bind(&module.name)
        .bind(&module.stream)
        .bind(module.version)
        .bind(&module.context)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(ids.into_iter().map(|(id,)| ModuleBuildId(id)).collect())
    }

    // -- component builds -------------------------------------------------

    pub async fn create_component(&mut self, mut component: ComponentBuild) -> Result<ComponentBuild, StoreError> {
        let id: i64 = sqlx::query(
            r#"
            INSERT INTO component_builds
                (module_id, package, scmurl, format, task_id, state, state_reason, nvr,
                 batch, tagged, tagged_in_final, build_time_only, reused_component_id, weight)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(component.module_id.0)
        .bind(&component.package)
        .bind(&component.scmurl)
        .bind(&component.format)
        .bind(component.task_id)
        .bind(component.state.map(row::component_state_str))
        .bind(&component.state_reason)
        .bind(&component.nvr)
        .bind(component.batch)
        .bind(component.tagged)
        .bind(component.tagged_in_final)
        .bind(component.build_time_only)
        .bind(component.reused_component_id.map(|id| id.0))
        .bind(component.weight)
        .fetch_one(&mut *self.tx)
        .await?
        .try_get("id")?;

        component.id = ComponentBuildId(id);
        self.dirty_components.insert(component.id, component.clone());
        Ok(component)
    }

    pub async fn save_component(&mut self, component: &ComponentBuild) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE component_builds SET
                task_id = ?, state = ?, state_reason = ?, nvr = ?, tagged = ?,
                tagged_in_final = ?, reused_component_id = ?, weight = ?
            WHERE id = ?
            "#,
        )
        .bind(component.task_id)
        .bind(component.state.map(row::component_state_str))
        .bind(&component.state_reason)
        .bind(&component.nvr)
        .bind(component.tagged)
        .bind(component.tagged_in_final)
        .bind(component.reused_component_id.map(|id| id.0))
        .bind(component.weight)
        .bind(component.id.0)
        .execute(&mut *self.tx)
        .await?;

        self.dirty_components.insert(component.id, component.clone());
        Ok(())
    }

    pub async fn get_component(&mut self, id: ComponentBuildId) -> Result<Option<ComponentBuild>, StoreError> {
        let row: Option<ComponentBuildRow> = sqlx::query_as("SELECT * FROM component_builds WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(ComponentBuild::try_from).transpose()
    }

    pub async fn component_by_task_id(&mut self, task_id: i64) -> Result<Option<ComponentBuild>, StoreError> {
        let row: Option<ComponentBuildRow> = sqlx::query_as("SELECT * FROM component_builds WHERE task_id = ?")
            .bind(task_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(ComponentBuild::try_from).transpose()
    }

    pub async fn components_of(&mut self, module_id: ModuleBuildId) -> Result<Vec<ComponentBuild>, StoreError> {
        let rows: Vec<ComponentBuildRow> =
            sqlx::query_as("SELECT * FROM component_builds WHERE module_id = ? ORDER BY batch, package")
                .bind(module_id.0)
                .fetch_all(&mut *self.tx)
                .await?;
        rows.into_iter().map(ComponentBuild::try_from).collect()
    }

    /// Global count of components currently `BUILDING`, across every module.
    /// The concurrency ceiling is enforced store-wide, not per-module.
    pub async fn components_building_count(&mut self) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM component_builds WHERE state = 'BUILDING'")
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count)
    }

    /// Every component currently `BUILDING` with a `task_id`, across every
    /// module — the poller's first reconciliation pass polls each of these
    /// against the builder to catch a task that died without the
    /// corresponding `ComponentStateChanged` ever reaching the bus.
    pub async fn building_components(&mut self) -> Result<Vec<ComponentBuild>, StoreError> {
        let rows: Vec<ComponentBuildRow> =
            sqlx::query_as("SELECT * FROM component_builds WHERE state = 'BUILDING' AND task_id IS NOT NULL")
                .fetch_all(&mut *self.tx)
                .await?;
        rows.into_iter().map(ComponentBuild::try_from).collect()
    }

    /// `current_batch(module, state?)` — components where `batch ==
    /// module.batch`, optionally filtered by state.
    pub async fn current_batch(
        &mut self,
        module: &ModuleBuild,
        state: Option<ComponentBuildState>,
    ) -> Result<Vec<ComponentBuild>, StoreError> {
        self.components_where_batch(module.id, module.batch, module.batch, state)
            .await
    }

    /// `up_to_current_batch(module, state?)` — components where `batch ≤
    /// module.batch`.
    pub async fn up_to_current_batch(
        &mut self,
        module: &ModuleBuild,
        state: Option<ComponentBuildState>,
    ) -> Result<Vec<ComponentBuild>, StoreError> {
        self.components_where_batch(module.id, 1, module.batch, state).await
    }

    async fn components_where_batch(
        &mut self,
        module_id: ModuleBuildId,
        min_batch: i32,
        max_batch: i32,
        state: Option<ComponentBuildState>,
    ) -> Result<Vec<ComponentBuild>, StoreError> {
        let rows: Vec<ComponentBuildRow> = match state {
            Some(state) => {
                sqlx::query_as(
                    "SELECT * FROM component_builds \
                     WHERE module_id = ? AND batch BETWEEN ? AND ? AND state = ? \
                     ORDER BY batch, package",
                )
                .bind(module_id.0)
                .bind(min_batch)
                .bind(max_batch)
                .bind(row::component_state_str(state))
                .fetch_all(&mut *self.tx)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT * FROM component_builds \
                     WHERE module_id = ? AND batch BETWEEN ? AND ? \
                     ORDER BY batch, package",
                )
                .bind(module_id.0)
                .bind(min_batch)
                .bind(max_batch)
                .fetch_all(&mut *self.tx)
                .await?
            }
        };
        rows.into_iter().map(ComponentBuild::try_from).collect()
    }

    // -- transaction boundary ---------------------------------------------

    /// Runs the pre-commit trace hook over every entity touched this session,
    /// then commits. For each dirty module/component whose `(state,
    /// state_reason)` differs from the last trace row (or that has no trace
    /// row yet), appends one.
    pub async fn commit(mut self) -> Result<(), StoreError> {
        let dirty_modules: Vec<ModuleBuild> = std::mem::take(&mut self.dirty_modules).into_values().collect();
        for module in &dirty_modules {
            self.append_module_trace_if_changed(module).await?;
        }
        let dirty_components: Vec<ComponentBuild> = std::mem::take(&mut self.dirty_components).into_values().collect();
        for component in &dirty_components {
            self.append_component_trace_if_changed(component).await?;
        }
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await?;
        Ok(())
    }

    async fn append_module_trace_if_changed(&mut self, module: &ModuleBuild) -> Result<(), StoreError> {
        let last: Option<(String, Option<String>)> = sqlx::query_as(
            "SELECT state, state_reason FROM module_builds_trace \
             WHERE module_id = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(module.id.0)
        .fetch_optional(&mut *self.tx)
        .await?;

        let state_str = row::module_state_str(module.state).to_string();
        let changed = match &last {
            Some((last_state, last_reason)) => *last_state != state_str || *last_reason != module.state_reason,
            None => true,
        };
        if !changed {
            return Ok(());
        }

        sqlx::query(
            "INSERT INTO module_builds_trace (module_id, state_time, state, state_reason) VALUES (?, ?, ?, ?)",
        )
        .bind(module.id.0)
        .bind(Utc::now())
        .bind(state_str)
        .bind(&module.state_reason)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn append_component_trace_if_changed(&mut self, component: &ComponentBuild) -> Result<(), StoreError> {
        let last: Option<(Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT state, state_reason FROM component_builds_trace \
             WHERE component_id = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(component.id.0)
        .fetch_optional(&mut *self.tx)
        .await?;

        let state_str = component.state.map(row::component_state_str).map(str::to_string);
        let changed = match &last {
            Some((last_state, last_reason)) => *last_state != state_str || *last_reason != component.state_reason,
            None => true,
        };
        if !changed {
            return Ok(());
        }

        sqlx::query(
            "INSERT INTO component_builds_trace (component_id, state_time, state, state_reason, task_id) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(component.id.0)
        .bind(Utc::now())
        .bind(state_str)
        .bind(&component.state_reason)
        .bind(component.task_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }
}

#[allow(dead_code)]
fn assert_send<T: Send>() {}
#[allow(dead_code)]
fn _store_session_is_send() {
    assert_send::<StoreSession>();
}
