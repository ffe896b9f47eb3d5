//! Settings loaded from TOML with environment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PupError, TechnicalError};

/// Workspace-wide settings for running pups against a live endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PupSettings {
    /// Model identifier passed to the provider.
    pub model: String,
    /// OpenAI-compatible completions endpoint.
    pub base_url: String,
    /// Environment variable the API key is read from.
    pub api_key_env: String,
    /// Default iteration cap for pups built from these settings.
    pub max_iterations: u32,
    pub temperature: f64,
    /// Backing file for the memory capability.
    pub memory_file: PathBuf,
}

impl Default for PupSettings {
    fn default() -> Self {
        Self {
            model: "openai/gpt-4o-mini".into(),
            base_url: "https://openrouter.ai/api/v1".into(),
            api_key_env: "OPENROUTER_API_KEY".into(),
            max_iterations: 10,
            temperature: 0.7,
            memory_file: PathBuf::from("memory.json"),
        }
    }
}

impl PupSettings {
    /// Load settings: TOML file when given, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, PupError> {
        let mut settings = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    TechnicalError::MissingRequirements {
                        reason: format!("cannot read settings file {}: {e}", path.display()),
                    }
                })?;
                toml::from_str(&raw).map_err(|e| TechnicalError::MissingRequirements {
                    reason: format!("invalid settings file {}: {e}", path.display()),
                })?
            }
            None => Self::default(),
        };
        settings.apply_env_overrides(|name| std::env::var(name).ok());
        settings.validate()?;
        Ok(settings)
    }

    /// Overlay environment variables via an injected lookup, so tests need
    /// not mutate the process environment.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(model) = lookup("PUP_MODEL") {
            self.model = model;
        }
        if let Some(base_url) = lookup("PUP_BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(max_iterations) = lookup("PUP_MAX_ITERATIONS") {
            if let Ok(value) = max_iterations.parse() {
                self.max_iterations = value;
            } else {
                tracing::warn!(value = %max_iterations, "ignoring non-numeric PUP_MAX_ITERATIONS");
            }
        }
        if let Some(memory_file) = lookup("PUP_MEMORY_FILE") {
            self.memory_file = PathBuf::from(memory_file);
        }
    }

    pub fn validate(&self) -> Result<(), PupError> {
        if self.model.is_empty() {
            return Err(TechnicalError::MissingRequirements {
                reason: "settings: model must not be empty".into(),
            }
            .into());
        }
        if self.base_url.is_empty() {
            return Err(TechnicalError::MissingRequirements {
                reason: "settings: base_url must not be empty".into(),
            }
            .into());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(TechnicalError::MissingRequirements {
                reason: format!(
                    "settings: temperature {} outside the allowed range 0.0..=2.0",
                    self.temperature
                ),
            }
            .into());
        }
        Ok(())
    }

    /// Resolve the API key from the configured environment variable.
    ///
    /// A missing key is a provider error at client construction, not a
    /// settings-load failure.
    pub fn api_key(&self) -> Result<String, PupError> {
        std::env::var(&self.api_key_env).map_err(|_| {
            TechnicalError::Provider {
                reason: format!("{} is not set", self.api_key_env),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = PupSettings::default();
        assert_eq!(settings.model, "openai/gpt-4o-mini");
        assert_eq!(settings.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(settings.max_iterations, 10);
        assert_eq!(settings.memory_file, PathBuf::from("memory.json"));
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let settings: PupSettings =
            toml::from_str("model = \"openai/gpt-4o\"\nmax_iterations = 3\n").unwrap();
        assert_eq!(settings.model, "openai/gpt-4o");
        assert_eq!(settings.max_iterations, 3);
        assert_eq!(settings.base_url, "https://openrouter.ai/api/v1");
    }

    #[test]
    fn unknown_toml_keys_are_rejected() {
        let result: Result<PupSettings, _> = toml::from_str("modle = \"typo\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn env_overrides_take_precedence_over_file_values() {
        let mut settings: PupSettings = toml::from_str("model = \"from-file\"\n").unwrap();
        settings.apply_env_overrides(|name| match name {
            "PUP_MODEL" => Some("from-env".into()),
            "PUP_MAX_ITERATIONS" => Some("7".into()),
            _ => None,
        });
        assert_eq!(settings.model, "from-env");
        assert_eq!(settings.max_iterations, 7);
    }

    #[test]
    fn bad_numeric_override_is_ignored() {
        let mut settings = PupSettings::default();
        settings.apply_env_overrides(|name| {
            (name == "PUP_MAX_ITERATIONS").then(|| "lots".to_string())
        });
        assert_eq!(settings.max_iterations, 10);
    }

    #[test]
    fn out_of_range_temperature_fails_validation() {
        let settings = PupSettings {
            temperature: 3.0,
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert_eq!(err.subtype(), "missing_requirements");
    }
}
