//! The Resolver port: everything the Stream Expander needs from the
//! module-metadata index — resolving a `name:stream` to candidate modulemds,
//! walking transitive buildrequires, and mapping a module to its koji tag.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use forge_domain::{Nsvc, PinnedManifest};

use crate::error::ResolverError;

/// A (possibly partial) query against the module index: `version`/`context`
/// narrow to one build when known, otherwise every stream-matching build is a
/// candidate.
#[derive(Debug, Clone)]
pub struct ModuleQuery {
    pub name: String,
    pub stream: String,
    pub version: Option<i64>,
    pub context: Option<String>,
}

impl ModuleQuery {
    pub fn new(name: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stream: stream.into(),
            version: None,
            context: None,
        }
    }
}

#[async_trait]
pub trait Resolver: Send + Sync {
    /// Every modulemd matching `name:stream`, optionally narrowed by
    /// `version`/`context`. `strict` asks the resolver to error rather than
    /// return an empty list when nothing matches.
    async fn get_module_modulemds(
        &self,
        query: &ModuleQuery,
        strict: bool,
    ) -> Result<Vec<PinnedManifest>, ResolverError>;

    /// The transitive buildrequires closure of a resolved module build.
    async fn get_module_build_dependencies(
        &self,
        query: &ModuleQuery,
        strict: bool,
    ) -> Result<Vec<Nsvc>, ResolverError>;

    /// The koji tag a resolved module build's artifacts land in.
    async fn get_module_tag(&self, query: &ModuleQuery, strict: bool) -> Result<String, ResolverError>;

    /// Every modulemd of modules that declare `name:stream` as a
    /// buildrequire, scoped to one base module NSVC (platform stream).
    async fn get_buildrequired_modulemds(
        &self,
        name: &str,
        stream: &str,
        base_module_nsvc: &Nsvc,
    ) -> Result<Vec<PinnedManifest>, ResolverError>;
}

enum Expectation {
    GetModuleModulemds { response: Result<Vec<PinnedManifest>, ResolverError> },
    GetModuleBuildDependencies { response: Result<Vec<Nsvc>, ResolverError> },
    GetModuleTag { response: Result<String, ResolverError> },
    GetBuildrequiredModulemds { response: Result<Vec<PinnedManifest>, ResolverError> },
}

/// A scripted [`Resolver`] for expander and scheduler unit tests. Same
/// strict-FIFO replay discipline as [`crate::MockBuilder`].
#[derive(Default)]
pub struct MockResolver {
    expectations: Mutex<VecDeque<Expectation>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_get_module_modulemds(&self, response: Result<Vec<PinnedManifest>, ResolverError>) -> &Self {
        self.push(Expectation::GetModuleModulemds { response });
        self
    }

    pub fn expect_get_module_build_dependencies(&self, response: Result<Vec<Nsvc>, ResolverError>) -> &Self {
        self.push(Expectation::GetModuleBuildDependencies { response });
        self
    }

    pub fn expect_get_module_tag(&self, response: Result<String, ResolverError>) -> &Self {
        self.push(Expectation::GetModuleTag { response });
        self
    }

    pub fn expect_get_buildrequired_modulemds(
        &self,
        response: Result<Vec<PinnedManifest>, ResolverError>,
    ) -> &Self {
        self.push(Expectation::GetBuildrequiredModulemds { response });
        self
    }

    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            panic!("MockResolver: {} expectations not met", exps.len());
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
            .expect("MockResolver: unexpected call, no expectation queued")
    }
}

#[async_trait]
impl Resolver for MockResolver {
    async fn get_module_modulemds(
        &self,
        _query: &ModuleQuery,
        _strict: bool,
    ) -> Result<Vec<PinnedManifest>, ResolverError> {
        match self.pop() {
            Expectation::GetModuleModulemds { response } => response,
            _ => panic!("MockResolver: expected get_module_modulemds"),
        }
    }

    async fn get_module_build_dependencies(
        &self,
        _query: &ModuleQuery,
        _strict: bool,
    ) -> Result<Vec<Nsvc>, ResolverError> {
        match self.pop() {
            Expectation::GetModuleBuildDependencies { response } => response,
            _ => panic!("MockResolver: expected get_module_build_dependencies"),
        }
    }

    async fn get_module_tag(&self, _query: &ModuleQuery, _strict: bool) -> Result<String, ResolverError> {
        match self.pop() {
            Expectation::GetModuleTag { response } => response,
            _ => panic!("MockResolver: expected get_module_tag"),
        }
    }

    async fn get_buildrequired_modulemds(
        &self,
        _name: &str,
        _stream: &str,
        _base_module_nsvc: &Nsvc,
    ) -> Result<Vec<PinnedManifest>, ResolverError> {
        match self.pop() {
            Expectation::GetBuildrequiredModulemds { response } => response,
            _ => panic!("MockResolver: expected get_buildrequired_modulemds"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_resolver_replays_queued_expectations() {
        let mock = MockResolver::new();
        mock.expect_get_module_tag(Ok("module-foo-f29-20190101".into()));

        let tag = mock
            .get_module_tag(&ModuleQuery::new("foo", "f29"), true)
            .await
            .unwrap();
        assert_eq!(tag, "module-foo-f29-20190101");

        mock.verify();
    }
}
