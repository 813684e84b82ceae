use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::summarize::gemini::{GEMINI_API_BASE_URL, GEMINI_DEFAULT_MODEL};

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "SUMMARIF_GEMINI_API_KEY";
/// Environment variable overriding the Gemini endpoint base URL.
pub const BASE_URL_ENV: &str = "SUMMARIF_GEMINI_BASE_URL";
/// Environment variable overriding the Gemini model.
pub const MODEL_ENV: &str = "SUMMARIF_GEMINI_MODEL";

/// Key captured from the build environment, if any.
pub const BUILD_TIME_API_KEY: Option<&str> = option_env!("SUMMARIF_GEMINI_API_KEY");
/// Compiled-in fallback key. Normally absent.
pub const DEFAULT_API_KEY: Option<&str> = None;
/// Value shipped in templates; never a real key.
pub const PLACEHOLDER_API_KEY: &str = "PUT_YOUR_KEY_HERE";

/// A key is usable if it is non-blank and not the placeholder.
pub fn is_usable_api_key(key: &str) -> bool {
    !key.trim().is_empty() && key != PLACEHOLDER_API_KEY
}

/// Check the format of a key the user wants to save.
pub fn validate_api_key_format(key: &str) -> Result<String, String> {
    let key = key.trim();
    if key.is_empty() {
        return Err("API key is required".to_string());
    }
    if !key.starts_with("AIza") {
        return Err("Invalid Gemini API key format. It should start with \"AIza\"".to_string());
    }
    Ok(key.to_string())
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root config directory (~/.config/summarif)
    pub config_dir: PathBuf,
    /// Persisted settings (API keys)
    pub settings_file: PathBuf,
    /// Gemini endpoint base URL
    pub api_base_url: String,
    /// Gemini model name
    pub model: String,
}

impl Config {
    /// Load configuration or use defaults
    pub fn load_or_default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("summarif");

        Self::with_config_dir(config_dir)
    }

    /// Configuration rooted at an explicit directory, still honoring the
    /// endpoint environment overrides.
    pub fn with_config_dir(config_dir: PathBuf) -> Self {
        let api_base_url = non_empty_env(BASE_URL_ENV).unwrap_or_else(|| GEMINI_API_BASE_URL.to_string());
        let model = non_empty_env(MODEL_ENV).unwrap_or_else(|| GEMINI_DEFAULT_MODEL.to_string());

        Self {
            settings_file: config_dir.join("settings.json"),
            config_dir,
            api_base_url,
            model,
        }
    }

    /// Ensure all required directories exist
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config_dir)
    }

    /// Every place an API key may come from, read now.
    pub fn credential_sources(&self) -> CredentialSources {
        CredentialSources {
            env: non_empty_env(API_KEY_ENV).or_else(|| BUILD_TIME_API_KEY.map(str::to_string)),
            settings: Settings::load(&self.settings_file),
            default: DEFAULT_API_KEY.map(str::to_string),
        }
    }

    /// Resolve the API key from every source, first non-empty wins.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.credential_sources().resolve()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Where an API key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    Environment,
    Settings,
    LegacySettings,
    Default,
}

impl std::fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Settings => write!(f, "settings"),
            CredentialSource::LegacySettings => write!(f, "legacy settings"),
            CredentialSource::Default => write!(f, "built-in default"),
        }
    }
}

/// Candidate API keys in precedence order.
#[derive(Debug, Clone, Default)]
pub struct CredentialSources {
    pub env: Option<String>,
    pub settings: Settings,
    pub default: Option<String>,
}

impl CredentialSources {
    /// First non-empty key and where it came from.
    pub fn resolve_with_source(&self) -> Option<(String, CredentialSource)> {
        let candidates = [
            (self.env.as_ref(), CredentialSource::Environment),
            (self.settings.gemini_api_key.as_ref(), CredentialSource::Settings),
            (
                self.settings.legacy_gemini_api_key.as_ref(),
                CredentialSource::LegacySettings,
            ),
            (self.default.as_ref(), CredentialSource::Default),
        ];
        candidates
            .into_iter()
            .find_map(|(key, source)| key.filter(|k| !k.is_empty()).map(|k| (k.clone(), source)))
    }

    pub fn resolve(&self) -> Option<String> {
        self.resolve_with_source().map(|(key, _)| key)
    }
}

/// Persisted user settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
    /// Key written by older releases
    #[serde(
        default,
        rename = "geminiApiKey",
        skip_serializing_if = "Option::is_none"
    )]
    pub legacy_gemini_api_key: Option<String>,
}

impl Settings {
    /// Load settings, falling back to empty settings if the file is missing
    /// or unreadable.
    pub fn load(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring malformed settings file");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;
        Ok(())
    }

    /// Validate and store a new API key under the current settings key.
    pub fn set_api_key(&mut self, key: &str) -> Result<(), String> {
        self.gemini_api_key = Some(validate_api_key_format(key)?);
        Ok(())
    }
}
