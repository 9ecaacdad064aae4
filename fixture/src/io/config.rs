//! Fixture configuration (TOML).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::types::WorkerDefaults;

/// Ambient values shared by every worker in a scenario.
///
/// Missing fields fall back to the defaults used by the test suite.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct FixtureConfig {
    pub scenario: ScenarioConfig,

    /// Defaults for every base worker record.
    pub worker: WorkerDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Team that owns volumes and job builds created during setup.
    pub team_name: String,

    /// Job whose builds own job build containers.
    pub job_name: String,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            team_name: "main".to_string(),
            job_name: "some-job".to_string(),
        }
    }
}

impl FixtureConfig {
    pub fn validate(&self) -> Result<()> {
        if self.scenario.team_name.trim().is_empty() {
            return Err(anyhow!("scenario.team_name must not be empty"));
        }
        if self.scenario.job_name.trim().is_empty() {
            return Err(anyhow!("scenario.job_name must not be empty"));
        }
        if self.worker.platform.trim().is_empty() {
            return Err(anyhow!("worker.platform must not be empty"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `FixtureConfig::default()`.
pub fn load_config(path: &Path) -> Result<FixtureConfig> {
    if !path.exists() {
        let cfg = FixtureConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: FixtureConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &FixtureConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf).with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
