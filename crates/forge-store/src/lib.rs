//! Transactional persistence for module builds, component builds, and their
//! trace logs.
//!
//! [`Store`] owns a connection pool and hands out [`StoreSession`]s, each
//! wrapping one `sqlx` transaction. Nothing a handler writes through a
//! session is visible to any other session until that session commits, and
//! commit is the only place trace rows get appended — see
//! [`StoreSession::commit`].

pub mod error;
pub mod row;
pub mod schema;
pub mod session;

pub use error::StoreError;
pub use session::StoreSession;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

/// A transactional handle over the module-build, component-build, and trace
/// tables. Cheaply cloneable (it's just a pool handle), `Send + Sync`, safe
/// to share across every worker that needs to `begin()` a session.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Opens (creating if necessary) a sqlite database at `url` and runs the
    /// schema migration. `url` follows sqlx's sqlite connection-string
    /// syntax, e.g. `sqlite://forge.db` or `sqlite::memory:` for tests.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options: SqliteConnectOptions = url.parse::<SqliteConnectOptions>()?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// An in-memory store, for unit and integration tests.
    pub async fn connect_in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:").await
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        for statement in schema::STATEMENTS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Begins a new transactional session. Dropping the returned session
    /// without calling `commit` or `rollback` rolls it back (sqlx's
    /// `Transaction::drop` behavior), so an early `?` return out of a
    /// handler is already safe.
    pub async fn begin(&self) -> Result<StoreSession, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(StoreSession::new(tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use forge_domain::{ComponentRef, ContextHash, ModuleBuild, ModuleBuildState, PinnedManifest, RebuildStrategy};
    use std::collections::BTreeMap;

    fn sample_manifest() -> PinnedManifest {
        PinnedManifest {
            name: "testmodule".into(),
            stream: "master".into(),
            version: 1,
            context: "00000000".into(),
            buildrequires: BTreeMap::new(),
            components: vec![ComponentRef {
                package: "foo".into(),
                scmurl: "https://example.com/foo.git#deadbeef".into(),
                format: "rpms".into(),
                build_order: 0,
                build_time_only: false,
            }],
        }
    }

    fn sample_module() -> ModuleBuild {
        let now = Utc::now();
        ModuleBuild {
            id: forge_domain::ModuleBuildId(0),
            name: "testmodule".into(),
            stream: "master".into(),
            version: 1,
            context: "00000000".into(),
            state: ModuleBuildState::Init,
            state_reason: None,
            manifest: sample_manifest(),
            scmurl: "https://example.com/testmodule.git#deadbeef".into(),
            owner: "alice".into(),
            koji_tag: None,
            batch: 0,
            rebuild_strategy: RebuildStrategy::ChangedAndAfter,
            new_repo_task_id: None,
            ref_build_context: ContextHash("ref".into()),
            build_context: ContextHash("build".into()),
            runtime_context: ContextHash("runtime".into()),
            submitted: now,
            modified: now,
            completed: None,
        }
    }

    #[tokio::test]
    async fn create_and_fetch_module_round_trips() {
        let store = Store::connect_in_memory().await.unwrap();
        let mut session = store.begin().await.unwrap();
        let created = session.create_module(sample_module()).await.unwrap();
        session.commit().await.unwrap();

        let mut session = store.begin().await.unwrap();
        let fetched = session.get_module(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "testmodule");
        assert_eq!(fetched.state, ModuleBuildState::Init);
    }

    #[tokio::test]
    async fn commit_appends_a_trace_row_on_first_write_and_on_every_state_change() {
        let store = Store::connect_in_memory().await.unwrap();
        let mut session = store.begin().await.unwrap();
        let mut module = session.create_module(sample_module()).await.unwrap();
        session.commit().await.unwrap();

        let mut session = store.begin().await.unwrap();
        module.transition(ModuleBuildState::Wait, None, Utc::now()).unwrap();
        session.save_module(&module).await.unwrap();
        session.commit().await.unwrap();

        let traces: Vec<(String,)> = sqlx::query_as("SELECT state FROM module_builds_trace WHERE module_id = ? ORDER BY id")
            .bind(module.id.0)
            .fetch_all(&store.pool)
            .await
            .unwrap();
        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0].0, "init");
        assert_eq!(traces[1].0, "wait");
    }

    #[tokio::test]
    async fn rollback_discards_both_the_row_and_its_trace() {
        let store = Store::connect_in_memory().await.unwrap();
        let mut session = store.begin().await.unwrap();
        let module = session.create_module(sample_module()).await.unwrap();
        session.rollback().await.unwrap();

        let mut session = store.begin().await.unwrap();
        assert!(session.get_module(module.id).await.unwrap().is_none());
    }
}
