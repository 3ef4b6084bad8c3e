//! CN-003: Project configuration — cocina.toml.
//!
//! The configuration source consumed by the resolver (kit/search
//! directories) and the transport layer (resolution mode, model provider,
//! external command). Missing file means defaults; the model credential is
//! read from the environment, never from the file.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration file name at the project root.
pub const CONFIG_FILE: &str = "cocina.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct CocinaConfig {
    /// Directory holding installed kits (default: `<root>/kits`)
    #[serde(default)]
    pub kits_dir: Option<PathBuf>,

    /// Flat recipe directories for the back-compat search fallback
    #[serde(default = "default_search_dirs")]
    pub search_dirs: Vec<PathBuf>,

    #[serde(default)]
    pub resolution: ResolutionConfig,
}

fn default_search_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("recipes")]
}

impl Default for CocinaConfig {
    fn default() -> Self {
        Self {
            kits_dir: None,
            search_dirs: default_search_dirs(),
            resolution: ResolutionConfig::default(),
        }
    }
}

/// How collected model-content requests get answered.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ResolutionConfig {
    /// Explicit mode: "model", "command", or "defer". Unset means auto.
    #[serde(default)]
    pub mode: Option<String>,

    #[serde(default)]
    pub provider: Option<ProviderConfig>,

    /// External command receiving the prompt document on stdin
    #[serde(default)]
    pub command: Option<String>,
}

/// Remote model provider (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_api_key_env() -> String {
    "COCINA_API_KEY".to_string()
}

impl CocinaConfig {
    /// Load configuration from `<root>/cocina.toml`, or defaults if absent.
    pub fn load(root: &Path) -> Result<Self, String> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| format!("invalid {}: {}", path.display(), e))
    }

    /// Kits directory, resolved against the project root.
    pub fn kits_dir(&self, root: &Path) -> PathBuf {
        match self.kits_dir {
            Some(ref d) if d.is_absolute() => d.clone(),
            Some(ref d) => root.join(d),
            None => root.join("kits"),
        }
    }

    /// Search directories, resolved against the project root.
    pub fn search_dirs(&self, root: &Path) -> Vec<PathBuf> {
        self.search_dirs
            .iter()
            .map(|d| if d.is_absolute() { d.clone() } else { root.join(d) })
            .collect()
    }

    /// API key for the configured provider, from the environment.
    pub fn api_key(&self) -> Option<String> {
        let provider = self.resolution.provider.as_ref()?;
        std::env::var(&provider.api_key_env).ok().filter(|k| !k.is_empty())
    }
}
