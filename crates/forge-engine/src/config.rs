//! Layered configuration, loaded with the `config` crate: built-in defaults,
//! a project TOML file, then environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use forge_domain::RebuildStrategy;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// The engine-wide configuration table, covering the scheduler's retry knobs
/// (`forge_scheduler::SchedulerConfig`) plus the poller's own
/// `batch_quiet_threshold_secs` and the store's `database_url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    pub database_url: String,

    /// Selects which builder back-end implementation is wired in.
    pub system: String,

    pub polling_interval_secs: u64,
    pub max_concurrent_component_builds: u32,
    pub resolver_retry_attempts: u32,
    pub resolver_retry_interval_secs: u64,

    pub rebuild_strategy: RebuildStrategy,
    pub rebuild_strategies_allowed: Vec<RebuildStrategy>,

    pub base_module_names: Vec<String>,

    /// How long a `BUILD`-state module's current batch may go without a
    /// state change before the poller's third pass logs a warning.
    pub batch_quiet_threshold_secs: u64,

    pub check_for_eol: bool,
    pub allow_name_override_from_scm: bool,
    pub allow_stream_override_from_scm: bool,
    pub mock_resultsdir: Option<String>,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://forge.db".to_string(),
            system: "mock".to_string(),
            polling_interval_secs: 30,
            max_concurrent_component_builds: 20,
            resolver_retry_attempts: 3,
            resolver_retry_interval_secs: 10,
            rebuild_strategy: RebuildStrategy::ChangedAndAfter,
            rebuild_strategies_allowed: vec![
                RebuildStrategy::All,
                RebuildStrategy::ChangedAndAfter,
                RebuildStrategy::OnlyChanged,
            ],
            base_module_names: vec!["platform".to_string()],
            batch_quiet_threshold_secs: 30 * 60,
            check_for_eol: true,
            allow_name_override_from_scm: false,
            allow_stream_override_from_scm: false,
            mock_resultsdir: None,
        }
    }
}

impl ForgeConfig {
    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_secs)
    }

    pub fn batch_quiet_threshold(&self) -> Duration {
        Duration::from_secs(self.batch_quiet_threshold_secs)
    }

    pub fn scheduler_config(&self) -> forge_scheduler::SchedulerConfig {
        forge_scheduler::SchedulerConfig {
            max_concurrent_component_builds: self.max_concurrent_component_builds,
            resolver_retry_attempts: self.resolver_retry_attempts,
            resolver_retry_interval: Duration::from_secs(self.resolver_retry_interval_secs),
        }
    }
}

/// Builder-pattern loader: built-in defaults, then `forge.toml` in the
/// project directory, then `FORGE_`-prefixed environment variables.
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            project_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "FORGE".to_string(),
        }
    }

    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn load(self) -> Result<ForgeConfig, EngineError> {
        let defaults = ForgeConfig::default();
        let mut builder = config::Config::builder().add_source(config::Config::try_from(&defaults)?);

        let project_config_file = self.project_dir.join("forge.toml");
        if project_config_file.exists() {
            builder = builder.add_source(
                config::File::from(project_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .separator("_")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn defaults_match_the_spec_suggested_values() {
        let config = ForgeConfig::default();
        assert_eq!(config.max_concurrent_component_builds, 20);
        assert_eq!(config.resolver_retry_attempts, 3);
        assert_eq!(config.resolver_retry_interval_secs, 10);
        assert_eq!(config.rebuild_strategy, RebuildStrategy::ChangedAndAfter);
    }

    #[test]
    fn project_file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("forge-engine-config-test-{:?}", std::thread::current().id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("forge.toml"), "max_concurrent_component_builds = 5\n").unwrap();

        let config = ConfigLoader::new().with_project_dir(&dir).load().unwrap();
        assert_eq!(config.max_concurrent_component_builds, 5);

        fs::remove_dir_all(&dir).ok();
    }
}
