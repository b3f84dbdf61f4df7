//! Server configuration
//!
//! ## Configuration Sources (in precedence order)
//!
//! 1. CLI flags (applied by the `boxshadow` binary)
//! 2. `boxshadow.yaml` (or the file passed with `--config`)
//! 3. Built-in defaults
//!
//! ## Example
//!
//! ```yaml
//! directories:
//!   - /srv/boxes
//!   - ./local-boxes
//! hostname: boxes.internal
//! port: 8099
//! filename_layout: version_provider
//! debounce_ms: 500
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Order of the two trailing fields in a box filename
///
/// Historical deployments disagree on whether the version or the provider
/// comes first, so the order is picked per deployment instead of guessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilenameLayout {
    /// `{owner}-VAGRANTSLASH-{box}__{version}__{provider}.box`
    #[default]
    VersionProvider,
    /// `{owner}-VAGRANTSLASH-{box}__{provider}__{version}.box`
    ProviderVersion,
}

impl FilenameLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilenameLayout::VersionProvider => "version_provider",
            FilenameLayout::ProviderVersion => "provider_version",
        }
    }
}

impl fmt::Display for FilenameLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level boxshadow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShadowConfig {
    /// Directories scanned (non-recursively) for `*.box` files
    #[serde(default = "default_directories")]
    pub directories: Vec<PathBuf>,

    /// Hostname used when synthesising download URLs
    #[serde(default = "default_hostname")]
    pub hostname: String,

    /// Port used when synthesising download URLs
    #[serde(default = "default_port")]
    pub port: u16,

    /// Which filename grammar variant this deployment uses
    #[serde(default)]
    pub filename_layout: FilenameLayout,

    /// Open each archive to confirm its provider before indexing it
    #[serde(default = "default_inspect_archives")]
    pub inspect_archives: bool,

    /// Upper bound on inspecting a single archive, in seconds
    #[serde(default = "default_inspect_timeout")]
    pub inspect_timeout_secs: u64,

    /// Upper bound on how much of metadata.json is read
    #[serde(default = "default_max_metadata_bytes")]
    pub max_metadata_bytes: u64,

    /// Window in which filesystem events are coalesced into one rebuild
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            directories: default_directories(),
            hostname: default_hostname(),
            port: default_port(),
            filename_layout: FilenameLayout::default(),
            inspect_archives: default_inspect_archives(),
            inspect_timeout_secs: default_inspect_timeout(),
            max_metadata_bytes: default_max_metadata_bytes(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_directories() -> Vec<PathBuf> {
    vec![PathBuf::from("./")]
}

fn default_hostname() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8099
}

fn default_inspect_archives() -> bool {
    true
}

fn default_inspect_timeout() -> u64 {
    30
}

fn default_max_metadata_bytes() -> u64 {
    64 * 1024
}

fn default_debounce_ms() -> u64 {
    500
}

impl ShadowConfig {
    /// Parse configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: ShadowConfig =
            serde_yaml_ng::from_str(content).context("Failed to parse boxshadow config YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, falling back to defaults if it does not exist
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.hostname.trim().is_empty() {
            anyhow::bail!("hostname must not be empty");
        }
        if self.port == 0 {
            anyhow::bail!("port must be non-zero");
        }
        Ok(())
    }

    /// Base of every synthesised download URL
    pub fn download_base(&self) -> String {
        format!("http://{}:{}", self.hostname, self.port)
    }

    pub fn inspect_timeout(&self) -> Duration {
        Duration::from_secs(self.inspect_timeout_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Make every configured directory absolute relative to `cwd`
    pub fn resolve_directories(&mut self, cwd: &Path) {
        self.directories = self
            .directories
            .iter()
            .map(|d| {
                if d.is_absolute() {
                    d.clone()
                } else {
                    normalize(&cwd.join(d))
                }
            })
            .collect();
    }
}

/// Lexically drop `.` components and fold `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
