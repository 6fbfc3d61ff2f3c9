use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{HttpBackend, ReasoningBackend};
use crate::refiner_config::RefinerConfig;
use crate::session::ControllerSettings;
use crate::ui::UiMode;

/// Runtime configuration for the refiner.
///
/// This struct bridges the layered `RefinerConfig` with what a command needs
/// at runtime: a backend client, controller settings and display options.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_dir: PathBuf,
    pub base_url: String,
    pub selection_timeout: Duration,
    pub improvement_timeout: Duration,
    pub controller: ControllerSettings,
    pub wrap_width: usize,
    pub ui_mode: UiMode,
    pub verbose: bool,
    /// The underlying layered configuration
    refiner_config: RefinerConfig,
}

impl Config {
    pub fn new(
        project_dir: PathBuf,
        verbose: bool,
        ui_mode: UiMode,
        backend_url: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        let refiner_config = RefinerConfig::with_cli_args(project_dir, backend_url, timeout_secs)
            .context("Failed to load refiner configuration")?;
        Ok(Self::from_refiner_config(refiner_config, verbose, ui_mode))
    }

    pub fn from_refiner_config(refiner_config: RefinerConfig, verbose: bool, ui_mode: UiMode) -> Self {
        let toml = &refiner_config.toml;
        Self {
            project_dir: refiner_config.project_dir.clone(),
            base_url: toml.backend.base_url.clone(),
            selection_timeout: Duration::from_secs(toml.backend.selection_timeout_secs),
            improvement_timeout: Duration::from_secs(toml.backend.improvement_timeout_secs),
            controller: ControllerSettings {
                tracker: toml.stages.timing(),
                celebration: Duration::from_millis(toml.display.celebration_ms),
            },
            wrap_width: toml.display.wrap_width,
            ui_mode,
            verbose,
            refiner_config,
        }
    }

    /// Get the underlying layered configuration.
    pub fn refiner_config(&self) -> &RefinerConfig {
        &self.refiner_config
    }

    /// HTTP client for the configured backend.
    pub fn http_backend(&self) -> Result<HttpBackend> {
        HttpBackend::new(
            &self.base_url,
            self.selection_timeout,
            self.improvement_timeout,
        )
        .context("Failed to create backend client")
    }

    pub fn backend(&self) -> Result<Arc<dyn ReasoningBackend>> {
        Ok(Arc::new(self.http_backend()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refiner_config::RefinerToml;
    use tempfile::tempdir;

    fn layered(toml: RefinerToml) -> RefinerConfig {
        let dir = tempdir().unwrap();
        RefinerConfig {
            project_dir: dir.path().to_path_buf(),
            config_dir: dir.path().join(".refiner"),
            toml,
        }
    }

    #[test]
    fn test_runtime_values_follow_toml() {
        let mut toml = RefinerToml::default();
        toml.backend.selection_timeout_secs = 7;
        toml.display.celebration_ms = 1500;
        toml.stages.advance_secs = 2;

        let config = Config::from_refiner_config(layered(toml), true, UiMode::Json);
        assert_eq!(config.selection_timeout, Duration::from_secs(7));
        assert_eq!(config.improvement_timeout, Duration::from_secs(300));
        assert_eq!(config.controller.celebration, Duration::from_millis(1500));
        assert_eq!(config.controller.tracker.advance_interval, Duration::from_secs(2));
        assert_eq!(config.ui_mode, UiMode::Json);
        assert!(config.verbose);
    }

    #[test]
    fn test_http_backend_uses_base_url() {
        let mut toml = RefinerToml::default();
        toml.backend.base_url = "http://127.0.0.1:8123/".into();
        let config = Config::from_refiner_config(layered(toml), false, UiMode::Full);
        let backend = config.http_backend().unwrap();
        assert_eq!(backend.base_url(), "http://127.0.0.1:8123");
    }
}
