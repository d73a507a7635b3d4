use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};

pub const DEFAULT_POI_LIMIT: usize = 6;
pub const DEFAULT_MODEL_TIMEOUT_SECONDS: u64 = 60;

/// Runtime settings shared by the API server and the CLI, read from
/// `VOYAGE_*` environment variables.
#[derive(Debug, Clone)]
pub struct VoyageConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub model_timeout: Duration,
    pub nominatim_url: String,
    pub overpass_url: String,
    pub user_agent: String,
    pub poi_limit: usize,
    pub bind: String,
    pub export_dir: PathBuf,
}

impl Default for VoyageConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: "gemini-2.5-flash".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            model_timeout: Duration::from_secs(DEFAULT_MODEL_TIMEOUT_SECONDS),
            nominatim_url: "https://nominatim.openstreetmap.org".to_string(),
            overpass_url: "https://overpass-api.de/api/interpreter".to_string(),
            user_agent: "VoyagePlanner/1.0".to_string(),
            poi_limit: DEFAULT_POI_LIMIT,
            bind: "0.0.0.0:8080".to_string(),
            export_dir: PathBuf::from("."),
        }
    }
}

impl VoyageConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            gemini_api_key: env::var("VOYAGE_GEMINI_API_KEY")
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
            gemini_model: non_empty_var("VOYAGE_GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_base_url: non_empty_var("VOYAGE_GEMINI_BASE_URL")
                .unwrap_or(defaults.gemini_base_url),
            model_timeout: env::var("VOYAGE_MODEL_TIMEOUT_SECONDS")
                .ok()
                .and_then(|value| value.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.model_timeout),
            nominatim_url: non_empty_var("VOYAGE_NOMINATIM_URL").unwrap_or(defaults.nominatim_url),
            overpass_url: non_empty_var("VOYAGE_OVERPASS_URL").unwrap_or(defaults.overpass_url),
            user_agent: non_empty_var("VOYAGE_USER_AGENT").unwrap_or(defaults.user_agent),
            poi_limit: env::var("VOYAGE_POI_LIMIT")
                .ok()
                .and_then(|value| value.parse::<usize>().ok())
                .unwrap_or(defaults.poi_limit),
            bind: non_empty_var("VOYAGE_BIND").unwrap_or(defaults.bind),
            export_dir: non_empty_var("VOYAGE_EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.export_dir),
        }
    }

    pub fn model_configured(&self) -> bool {
        self.gemini_api_key.is_some()
    }

    /// Fails fast when settings are unusable.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("VOYAGE_GEMINI_BASE_URL", &self.gemini_base_url),
            ("VOYAGE_NOMINATIM_URL", &self.nominatim_url),
            ("VOYAGE_OVERPASS_URL", &self.overpass_url),
        ] {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                bail!("{name} must be an http(s) URL, got {value}");
            }
        }
        Ok(())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
