use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

pub const ENV_EMPTY_TEXT_IS_ABSENT: &str = "REQBIND_EMPTY_TEXT_IS_ABSENT";
pub const ENV_LIST_SEPARATOR: &str = "REQBIND_LIST_SEPARATOR";
pub const ENV_TRIM_TEXT: &str = "REQBIND_TRIM_TEXT";

/// Knobs for how located text is interpreted while binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Treat an empty string the same as a missing value.
    pub empty_text_is_absent: bool,
    /// Split a single text value into several list elements.
    pub list_separator: Option<char>,
    /// Trim surrounding whitespace from text before conversion.
    pub trim_text: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            empty_text_is_absent: true,
            list_separator: None,
            trim_text: false,
        }
    }
}

/// Layout of a reqbind config file: options live under `[decode]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub decode: DecodeOptions,
}

impl DecodeOptions {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(file.decode)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Overrides options from `REQBIND_*` environment variables.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_EMPTY_TEXT_IS_ABSENT) {
            self.empty_text_is_absent = parse_flag(ENV_EMPTY_TEXT_IS_ABSENT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_TRIM_TEXT) {
            self.trim_text = parse_flag(ENV_TRIM_TEXT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_LIST_SEPARATOR) {
            let mut chars = raw.chars();
            self.list_separator = match (chars.next(), chars.next()) {
                (None, _) => None,
                (Some(separator), None) => Some(separator),
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        key: ENV_LIST_SEPARATOR.to_string(),
                        value: raw,
                    });
                }
            };
        }
        Ok(self)
    }

    pub fn with_list_separator(mut self, separator: char) -> Self {
        self.list_separator = Some(separator);
        self
    }

    pub fn keep_empty_text(mut self) -> Self {
        self.empty_text_is_absent = false;
        self
    }

    pub fn trimmed(mut self) -> Self {
        self.trim_text = true;
        self
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}
