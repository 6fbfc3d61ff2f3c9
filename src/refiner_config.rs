//! Configuration file for the refiner.
//!
//! Reads `.refiner/refiner.toml` from the project directory, falling back to
//! `<config_dir>/refiner/refiner.toml`. Values are layered
//! file → environment → CLI.
//!
//! # Configuration File Format
//!
//! ```toml
//! [backend]
//! base_url = "http://localhost:8000"
//! selection_timeout_secs = 60
//! improvement_timeout_secs = 300
//!
//! [stages]
//! tick_ms = 100
//! fraction_step = 0.02
//! advance_secs = 8
//!
//! [display]
//! celebration_ms = 3000
//! wrap_width = 0
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::tracker::TrackerTiming;

/// Environment override for `backend.base_url`.
pub const ENV_BACKEND_URL: &str = "REFINER_BACKEND_URL";
/// Environment override applied to both backend timeouts.
pub const ENV_TIMEOUT_SECS: &str = "REFINER_TIMEOUT_SECS";

const CONFIG_DIR: &str = ".refiner";
const CONFIG_FILE: &str = "refiner.toml";

/// Where the reasoning backend lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Timeout for `/select-personas`
    #[serde(default = "default_selection_timeout_secs")]
    pub selection_timeout_secs: u64,
    /// Timeout for `/improve-question`, which chains many model calls
    #[serde(default = "default_improvement_timeout_secs")]
    pub improvement_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_selection_timeout_secs() -> u64 {
    60
}

fn default_improvement_timeout_secs() -> u64 {
    300
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            selection_timeout_secs: default_selection_timeout_secs(),
            improvement_timeout_secs: default_improvement_timeout_secs(),
        }
    }
}

/// Pacing of the cosmetic stage tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagesSection {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_fraction_step")]
    pub fraction_step: f64,
    #[serde(default = "default_advance_secs")]
    pub advance_secs: u64,
}

fn default_tick_ms() -> u64 {
    100
}

fn default_fraction_step() -> f64 {
    0.02
}

fn default_advance_secs() -> u64 {
    8
}

impl Default for StagesSection {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            fraction_step: default_fraction_step(),
            advance_secs: default_advance_secs(),
        }
    }
}

impl StagesSection {
    /// Tracker timing, with unusable values replaced (see `validate` for warnings).
    pub fn timing(&self) -> TrackerTiming {
        TrackerTiming {
            tick_interval: Duration::from_millis(self.tick_ms),
            fraction_step: self.fraction_step,
            advance_interval: Duration::from_secs(self.advance_secs),
        }
        .sanitized()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplaySection {
    /// How long the success celebration lasts
    #[serde(default = "default_celebration_ms")]
    pub celebration_ms: u64,
    /// Wrap width for result panels; 0 means terminal width
    #[serde(default)]
    pub wrap_width: usize,
}

fn default_celebration_ms() -> u64 {
    3000
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            celebration_ms: default_celebration_ms(),
            wrap_width: 0,
        }
    }
}

/// Contents of `refiner.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefinerToml {
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub stages: StagesSection,
    #[serde(default)]
    pub display: DisplaySection,
}

impl RefinerToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse refiner.toml")
    }

    /// Load from `config_dir/refiner.toml`, or defaults if the file doesn't exist.
    pub fn load_or_default(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize refiner.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply `REFINER_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var(ENV_BACKEND_URL)
            && !url.trim().is_empty()
        {
            self.backend.base_url = url.trim().to_string();
        }
        if let Ok(raw) = std::env::var(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: '{}'", ENV_TIMEOUT_SECS, raw))?;
            self.backend.selection_timeout_secs = secs;
            self.backend.improvement_timeout_secs = secs;
        }
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let url = self.backend.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            warnings.push(format!(
                "Invalid backend.base_url '{}': should start with http:// or https://",
                self.backend.base_url
            ));
        }
        if self.backend.selection_timeout_secs == 0 {
            warnings.push("backend.selection_timeout_secs is 0; every request would time out".into());
        }
        if self.backend.improvement_timeout_secs == 0 {
            warnings
                .push("backend.improvement_timeout_secs is 0; every request would time out".into());
        }
        if self.stages.tick_ms == 0 {
            warnings.push("stages.tick_ms must be greater than 0".into());
        }
        if self.stages.advance_secs == 0 {
            warnings.push("stages.advance_secs must be greater than 0".into());
        }
        if !(self.stages.fraction_step > 0.0 && self.stages.fraction_step <= 1.0) {
            warnings.push(format!(
                "Invalid stages.fraction_step {}: should be in (0, 1]",
                self.stages.fraction_step
            ));
        }

        warnings
    }
}

/// Layered configuration for one project directory.
///
/// It merges settings from:
/// 1. refiner.toml file
/// 2. Environment variables
/// 3. CLI arguments
#[derive(Debug, Clone)]
pub struct RefinerConfig {
    /// Path to the project directory
    pub project_dir: PathBuf,
    /// Directory the config file was (or would be) read from
    pub config_dir: PathBuf,
    /// Parsed and env-layered refiner.toml
    pub toml: RefinerToml,
}

impl RefinerConfig {
    /// Load config for `project_dir`: file first, then environment.
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let config_dir = Self::locate(&project_dir);
        let mut toml = RefinerToml::load_or_default(&config_dir)?;
        toml.apply_env()?;

        Ok(Self {
            project_dir,
            config_dir,
            toml,
        })
    }

    /// Apply CLI overrides on top of file and environment.
    pub fn with_cli_args(
        project_dir: PathBuf,
        backend_url: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        let mut config = Self::new(project_dir)?;
        if let Some(url) = backend_url {
            config.toml.backend.base_url = url;
        }
        if let Some(secs) = timeout_secs {
            config.toml.backend.selection_timeout_secs = secs;
            config.toml.backend.improvement_timeout_secs = secs;
        }
        Ok(config)
    }

    /// Project-local `.refiner/` if it has a config file, else the user config dir.
    fn locate(project_dir: &Path) -> PathBuf {
        let local = project_dir.join(CONFIG_DIR);
        if local.join(CONFIG_FILE).exists() {
            return local;
        }
        dirs::config_dir()
            .map(|d| d.join("refiner"))
            .filter(|d| d.join(CONFIG_FILE).exists())
            .unwrap_or(local)
    }

    /// Path of the active config file (which may not exist yet).
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Path `config init` writes to.
    pub fn project_config_file(&self) -> PathBuf {
        self.project_dir.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Validate configuration and return warnings.
    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        // SAFETY: guarded by ENV_MUTEX in every test touching these vars.
        unsafe {
            std::env::remove_var(ENV_BACKEND_URL);
            std::env::remove_var(ENV_TIMEOUT_SECS);
        }
    }

    // =========================================
    // RefinerToml tests
    // =========================================

    #[test]
    fn test_parse_empty_gives_defaults() {
        let config = RefinerToml::parse("").unwrap();
        assert_eq!(config, RefinerToml::default());
        assert_eq!(config.backend.base_url, "http://localhost:8000");
        assert_eq!(config.backend.selection_timeout_secs, 60);
        assert_eq!(config.backend.improvement_timeout_secs, 300);
        assert_eq!(config.stages.tick_ms, 100);
        assert_eq!(config.display.celebration_ms, 3000);
    }

    #[test]
    fn test_parse_partial_sections() {
        let config = RefinerToml::parse(
            r#"
[backend]
base_url = "http://reasoner:9000"

[stages]
advance_secs = 4
"#,
        )
        .unwrap();
        assert_eq!(config.backend.base_url, "http://reasoner:9000");
        assert_eq!(config.backend.improvement_timeout_secs, 300);
        assert_eq!(config.stages.advance_secs, 4);
        assert_eq!(config.stages.fraction_step, 0.02);
    }

    #[test]
    fn test_parse_rejects_bad_types() {
        assert!(RefinerToml::parse("[backend]\nselection_timeout_secs = \"soon\"").is_err());
    }

    #[test]
    fn test_stage_timing_conversion() {
        let timing = StagesSection::default().timing();
        assert_eq!(timing, TrackerTiming::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_tick_still_drives_tracker() {
        let config =
            RefinerToml::parse("[stages]\ntick_ms = 0\nadvance_secs = 0\nfraction_step = nan\n")
                .unwrap();
        assert_eq!(config.validate().len(), 3);

        let timing = config.stages.timing();
        assert!(!timing.tick_interval.is_zero());
        assert!(!timing.advance_interval.is_zero());
        assert_eq!(timing.fraction_step, 0.02);

        let mut tracker = crate::tracker::StageTracker::new(timing);
        tracker.start();
        tokio::time::sleep(Duration::from_millis(9)).await;
        let p = tracker.snapshot();
        assert!(p.running);
        assert!(p.index > 0);
        assert!((0.0..=1.0).contains(&p.fraction));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut config = RefinerToml::default();
        config.display.wrap_width = 72;
        config.save(&path).unwrap();

        let loaded = RefinerToml::load(&path).unwrap();
        assert_eq!(loaded.display.wrap_width, 72);
    }

    #[test]
    fn test_validate_default_is_clean() {
        assert!(RefinerToml::default().validate().is_empty());
    }

    #[test]
    fn test_validate_flags_problems() {
        let mut config = RefinerToml::default();
        config.backend.base_url = "localhost:8000".into();
        config.backend.selection_timeout_secs = 0;
        config.stages.fraction_step = 1.5;
        let warnings = config.validate();
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].contains("base_url"));
        assert!(warnings[1].contains("selection_timeout_secs"));
        assert!(warnings[2].contains("fraction_step"));
    }

    // =========================================
    // Layering tests
    // =========================================

    #[test]
    fn test_env_overrides_file() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let mut config = RefinerToml::default();
        unsafe {
            std::env::set_var(ENV_BACKEND_URL, "http://env:1234");
            std::env::set_var(ENV_TIMEOUT_SECS, "15");
        }
        config.apply_env().unwrap();
        clear_env();

        assert_eq!(config.backend.base_url, "http://env:1234");
        assert_eq!(config.backend.selection_timeout_secs, 15);
        assert_eq!(config.backend.improvement_timeout_secs, 15);
    }

    #[test]
    fn test_env_bad_timeout_is_error() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            std::env::set_var(ENV_TIMEOUT_SECS, "forever");
        }
        let result = RefinerToml::default().apply_env();
        clear_env();
        assert!(result.is_err());
    }

    #[test]
    fn test_project_file_then_cli() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(CONFIG_DIR)).unwrap();
        std::fs::write(
            dir.path().join(CONFIG_DIR).join(CONFIG_FILE),
            "[backend]\nbase_url = \"http://file:1\"\nselection_timeout_secs = 5\n",
        )
        .unwrap();

        let config = RefinerConfig::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(config.toml.backend.base_url, "http://file:1");
        assert_eq!(config.toml.backend.selection_timeout_secs, 5);
        assert!(config.config_file().ends_with(".refiner/refiner.toml"));

        let config = RefinerConfig::with_cli_args(
            dir.path().to_path_buf(),
            Some("http://cli:2".into()),
            Some(9),
        )
        .unwrap();
        assert_eq!(config.toml.backend.base_url, "http://cli:2");
        assert_eq!(config.toml.backend.selection_timeout_secs, 9);
        assert_eq!(config.toml.backend.improvement_timeout_secs, 9);
    }
}
