use std::time::Duration;

/// The options that actually shape handler behavior (the rest — `system`,
/// `check_for_eol`, the SCM-override toggles, and `mock_resultsdir` — belong
/// to the submission/validation path the engine crate owns, in
/// `forge_engine::ForgeConfig`).
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub max_concurrent_component_builds: u32,
    /// Default: 3 tries, 10-second interval.
    pub resolver_retry_attempts: u32,
    pub resolver_retry_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_component_builds: 20,
            resolver_retry_attempts: 3,
            resolver_retry_interval: Duration::from_secs(10),
        }
    }
}
