use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SETTINGS_NAME: &str = "golem-desk.json";
pub const SETTINGS_SCHEMA_VERSION: u32 = 1;

/// Overrides the `golem` binary from the environment (or `.env`).
pub const ENV_GOLEM_CLI: &str = "GOLEM_DESK_CLI";
/// Overrides the `golem` profile from the environment (or `.env`).
pub const ENV_PROFILE: &str = "GOLEM_DESK_PROFILE";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Name or path of the `golem` executable.
    #[serde(default = "default_golem_cli", alias = "golem_cli")]
    pub golem_cli: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Application directory the `golem` CLI runs in.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "app_dir")]
    pub app_dir: Option<PathBuf>,

    /// Extra arguments placed before the subcommand on every call.
    #[serde(default, skip_serializing_if = "Vec::is_empty", alias = "extra_args")]
    pub extra_args: Vec<String>,
}

fn default_schema_version() -> u32 {
    SETTINGS_SCHEMA_VERSION
}

fn default_golem_cli() -> PathBuf {
    PathBuf::from("golem")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: SETTINGS_SCHEMA_VERSION,
            golem_cli: default_golem_cli(),
            profile: None,
            app_dir: None,
            extra_args: Vec::new(),
        }
    }
}

impl Settings {
    /// Apply `GOLEM_DESK_*` environment overrides.
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_overrides(
            std::env::var(ENV_GOLEM_CLI).ok(),
            std::env::var(ENV_PROFILE).ok(),
        );
        self
    }

    fn apply_overrides(&mut self, golem_cli: Option<String>, profile: Option<String>) {
        if let Some(cli) = golem_cli.filter(|s| !s.trim().is_empty()) {
            self.golem_cli = PathBuf::from(cli.trim());
        }
        if let Some(profile) = profile.filter(|s| !s.trim().is_empty()) {
            self.profile = Some(profile.trim().to_string());
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub base_dir: PathBuf,
    pub settings: Settings,
}

impl LoadedSettings {
    /// Directory the `golem` CLI is spawned in.
    pub fn working_dir(&self) -> PathBuf {
        match &self.settings.app_dir {
            Some(dir) => resolve_against(&self.base_dir, dir),
            None => self.base_dir.clone(),
        }
    }
}

/// Load settings from `settings_path`, or from `golem-desk.json` in the
/// current directory. A missing default file yields the defaults; a missing
/// explicit file is an error.
pub fn load_settings(settings_path: Option<&Path>) -> Result<LoadedSettings> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;

    let (path, explicit) = match settings_path {
        Some(p) => (resolve_against(&cwd, p), true),
        None => (cwd.join(DEFAULT_SETTINGS_NAME), false),
    };

    if !path.exists() {
        if explicit {
            bail!("settings not found: {}", path.display());
        }
        tracing::debug!("no {DEFAULT_SETTINGS_NAME} found, using defaults");
        return Ok(LoadedSettings {
            base_dir: cwd,
            settings: Settings::default().with_env_overrides(),
        });
    }

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read settings: {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse settings JSON: {}", path.display()))?;
    if settings.schema_version != SETTINGS_SCHEMA_VERSION {
        bail!(
            "unsupported settings schemaVersion {} in {} (expected {})",
            settings.schema_version,
            path.display(),
            SETTINGS_SCHEMA_VERSION
        );
    }

    let base_dir = path.parent().map(|p| p.to_path_buf()).unwrap_or(cwd);

    Ok(LoadedSettings {
        base_dir,
        settings: settings.with_env_overrides(),
    })
}

/// Write default settings into `dir`, unless a file already exists and
/// `overwrite` is false.
pub fn write_default_settings(dir: &Path, overwrite: bool) -> Result<PathBuf> {
    let dest = dir.join(DEFAULT_SETTINGS_NAME);
    if dest.exists() && !overwrite {
        bail!("{} already exists", dest.display());
    }

    let settings = Settings {
        profile: Some("local".to_string()),
        app_dir: Some(PathBuf::from(".")),
        ..Default::default()
    };

    let bytes = serde_json::to_vec_pretty(&settings).context("failed to serialize settings")?;
    let mut out = String::from_utf8(bytes).context("settings are not valid UTF-8")?;
    out.push('\n');

    let tmp = dest.with_extension("tmp");
    fs::write(&tmp, out.as_bytes())
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    if overwrite && dest.exists() {
        fs::remove_file(&dest).with_context(|| format!("failed to remove {}", dest.display()))?;
    }
    fs::rename(&tmp, &dest)
        .with_context(|| format!("failed to move {} into place", dest.display()))?;
    Ok(dest)
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
