//! The Builder port: everything the orchestrator needs from the external
//! build system to drive one component through submission to completion.
//!
//! A narrow async trait held behind an `Arc<dyn Builder>` — object-safe
//! rather than generic over an associated error, since the scheduler needs
//! to hold a single concrete `Arc<dyn Builder>` regardless of which backend
//! is wired in.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use forge_domain::{ComponentBuildState, Nsvc};

use crate::error::BuilderError;

/// Result of a `build` call: the builder either hands back a `task_id` to
/// poll, or reports a state immediately (e.g. rejected at submission time,
/// never reaching `BUILDING`).
#[derive(Debug, Clone)]
pub struct BuildSubmission {
    pub task_id: Option<i64>,
    pub state: ComponentBuildState,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub state: ComponentBuildState,
    pub reason: Option<String>,
}

#[async_trait]
pub trait Builder: Send + Sync {
    /// Establish (or refresh) the buildroot for a module build, pinning it to
    /// the given buildrequires.
    async fn buildroot_connect(&self, buildrequires: &[Nsvc]) -> Result<(), BuilderError>;

    /// Add the repos of already-built sibling modules to a buildroot that is
    /// still being assembled.
    async fn buildroot_add_repos(&self, deps: &[Nsvc]) -> Result<(), BuilderError>;

    /// The dist-tag suffix (e.g. `.module_f29+3+deadbeef`) srpm rebuilds for
    /// this context should carry.
    async fn get_disttag_srpm(&self, disttag: &str) -> Result<String, BuilderError>;

    /// Submit one component's build. Never blocks until completion — the
    /// returned [`BuildSubmission`] either carries a `task_id` to poll later,
    /// or (rarely) a terminal state reached synchronously.
    async fn build(&self, package: &str, scmurl: &str) -> Result<BuildSubmission, BuilderError>;

    /// Best-effort cancellation; the builder is not required to guarantee the
    /// task stops, only to stop reporting it as active.
    async fn cancel_build(&self, task_id: i64) -> Result<(), BuilderError>;

    /// Trigger buildroot repo regeneration for a tag; returns an opaque
    /// `repo_id` the caller can use to correlate the eventual `RepoRegenerated`
    /// event.
    async fn new_repo(&self, tag: &str) -> Result<i64, BuilderError>;

    /// Poll a previously submitted task for its current state. Used by the
    /// poller to reconcile tasks for which no event ever arrived.
    async fn get_task_info(&self, task_id: i64) -> Result<TaskInfo, BuilderError>;

    /// Scheduling-heuristic cost hints, keyed by package name; never
    /// load-bearing for correctness, so a missing entry defaults to `1.0`
    /// rather than erroring.
    async fn get_build_weights(&self, packages: &[String]) -> HashMap<String, f64>;
}

enum Expectation {
    BuildrootConnect { response: Result<(), BuilderError> },
    BuildrootAddRepos { response: Result<(), BuilderError> },
    GetDisttagSrpm { response: Result<String, BuilderError> },
    Build { response: Result<BuildSubmission, BuilderError> },
    CancelBuild { response: Result<(), BuilderError> },
    NewRepo { response: Result<i64, BuilderError> },
    GetTaskInfo { response: Result<TaskInfo, BuilderError> },
    GetBuildWeights { response: HashMap<String, f64> },
}

/// A scripted [`Builder`] for scheduler and expander unit tests.
///
/// Expectations are consumed strictly in the order they were queued,
/// regardless of which method is called: a test sets up the exact call
/// sequence it expects and [`MockBuilder::verify`] fails loudly if any are
/// left unconsumed.
#[derive(Default)]
pub struct MockBuilder {
    expectations: Mutex<VecDeque<Expectation>>,
}

impl MockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_buildroot_connect(&self, response: Result<(), BuilderError>) -> &Self {
        self.push(Expectation::BuildrootConnect { response });
        self
    }

    pub fn expect_buildroot_add_repos(&self, response: Result<(), BuilderError>) -> &Self {
        self.push(Expectation::BuildrootAddRepos { response });
        self
    }

    pub fn expect_get_disttag_srpm(&self, response: Result<String, BuilderError>) -> &Self {
        self.push(Expectation::GetDisttagSrpm { response });
        self
    }

    pub fn expect_build(&self, response: Result<BuildSubmission, BuilderError>) -> &Self {
        self.push(Expectation::Build { response });
        self
    }

    pub fn expect_cancel_build(&self, response: Result<(), BuilderError>) -> &Self {
        self.push(Expectation::CancelBuild { response });
        self
    }

    pub fn expect_new_repo(&self, response: Result<i64, BuilderError>) -> &Self {
        self.push(Expectation::NewRepo { response });
        self
    }

    pub fn expect_get_task_info(&self, response: Result<TaskInfo, BuilderError>) -> &Self {
        self.push(Expectation::GetTaskInfo { response });
        self
    }

    pub fn expect_get_build_weights(&self, response: HashMap<String, f64>) -> &Self {
        self.push(Expectation::GetBuildWeights { response });
        self
    }

    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            panic!("MockBuilder: {} expectations not met", exps.len());
        }
    }

    fn push(&self, e: Expectation) {
        self.expectations.lock().unwrap().push_back(e);
    }

    fn pop(&self) -> Expectation {
        self.expectations
            .lock()
            .unwrap()
            .pop_front()
            .expect("MockBuilder: unexpected call, no expectation queued")
    }
}

#[async_trait]
impl Builder for MockBuilder {
    async fn buildroot_connect(&self, _buildrequires: &[Nsvc]) -> Result<(), BuilderError> {
        match self.pop() {
            Expectation::BuildrootConnect { response } => response,
            _ => panic!("MockBuilder: expected buildroot_connect"),
        }
    }

    async fn buildroot_add_repos(&self, _deps: &[Nsvc]) -> Result<(), BuilderError> {
        match self.pop() {
            Expectation::BuildrootAddRepos { response } => response,
            _ => panic!("MockBuilder: expected buildroot_add_repos"),
        }
    }

    async fn get_disttag_srpm(&self, _disttag: &str) -> Result<String, BuilderError> {
        match self.pop() {
            Expectation::GetDisttagSrpm { response } => response,
            _ => panic!("MockBuilder: expected get_disttag_srpm"),
        }
    }

    async fn build(&self, _package: &str, _scmurl: &str) -> Result<BuildSubmission, BuilderError> {
        match self.pop() {
            Expectation::Build { response } => response,
            _ => panic!("MockBuilder: expected build"),
        }
    }

    async fn cancel_build(&self, _task_id: i64) -> Result<(), BuilderError> {
        match self.pop() {
            Expectation::CancelBuild { response } => response,
            _ => panic!("MockBuilder: expected cancel_build"),
        }
    }

    async fn new_repo(&self, _tag: &str) -> Result<i64, BuilderError> {
        match self.pop() {
            Expectation::NewRepo { response } => response,
            _ => panic!("MockBuilder: expected new_repo"),
        }
    }

    async fn get_task_info(&self, _task_id: i64) -> Result<TaskInfo, BuilderError> {
        match self.pop() {
            Expectation::GetTaskInfo { response } => response,
            _ => panic!("MockBuilder: expected get_task_info"),
        }
    }

    async fn get_build_weights(&self, _packages: &[String]) -> HashMap<String, f64> {
        match self.pop() {
            Expectation::GetBuildWeights { response } => response,
            _ => panic!("MockBuilder: expected get_build_weights"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_builder_replays_queued_expectations_in_order() {
        let mock = MockBuilder::new();
        mock.expect_buildroot_connect(Ok(()));
        mock.expect_build(Ok(BuildSubmission {
            task_id: Some(42),
            state: ComponentBuildState::Building,
            reason: None,
        }));

        mock.buildroot_connect(&[]).await.unwrap();
        let submission = mock.build("foo", "https://example.com/foo.git#abc").await.unwrap();
        assert_eq!(submission.task_id, Some(42));

        mock.verify();
    }

    #[tokio::test]
    #[should_panic(expected = "expectations not met")]
    async fn verify_panics_on_unconsumed_expectations() {
        let mock = MockBuilder::new();
        mock.expect_new_repo(Ok(1));
        mock.verify();
    }
}
