//! Server configuration file (`config.json`) with self-repair.
//!
//! The file is a flat JSON object with nine string keys. A missing file is
//! created with defaults, an unparsable one is deleted and recreated, and a
//! file lacking some keys gets the missing entries spliced in before its
//! closing brace so every existing byte stays where it was.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::utils::strip_bom;

const DEFAULT_SERVER_PATH: &str = r"D:\SteamLibrary\steamapps\common\Arma 3 Server";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not a valid JSON object: {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error("could not insert missing entries into {path}: no usable closing brace")]
    Repair { path: PathBuf },
}

/// The nine keys every configuration must carry, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    Name,
    ServerPath,
    ServerConfigPath,
    BattleyePath,
    ProfilesPath,
    ModsPath,
    ModListPath,
    AllowedModListPath,
    AdditionalStartupParameters,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 9] = [
        ConfigKey::Name,
        ConfigKey::ServerPath,
        ConfigKey::ServerConfigPath,
        ConfigKey::BattleyePath,
        ConfigKey::ProfilesPath,
        ConfigKey::ModsPath,
        ConfigKey::ModListPath,
        ConfigKey::AllowedModListPath,
        ConfigKey::AdditionalStartupParameters,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::Name => "name",
            ConfigKey::ServerPath => "serverPath",
            ConfigKey::ServerConfigPath => "serverConfigPath",
            ConfigKey::BattleyePath => "battleyePath",
            ConfigKey::ProfilesPath => "profilesPath",
            ConfigKey::ModsPath => "modsPath",
            ConfigKey::ModListPath => "modListPath",
            ConfigKey::AllowedModListPath => "allowedModListPath",
            ConfigKey::AdditionalStartupParameters => "additionalStartupParameters",
        }
    }

    pub fn default_value(&self) -> String {
        match self {
            ConfigKey::Name => "Arma 3 Server".to_string(),
            ConfigKey::ServerPath => DEFAULT_SERVER_PATH.to_string(),
            ConfigKey::ServerConfigPath => format!(r"{}\server.cfg", DEFAULT_SERVER_PATH),
            ConfigKey::BattleyePath => format!(r"{}\battleye", DEFAULT_SERVER_PATH),
            ConfigKey::ProfilesPath => format!(r"{}\profiles", DEFAULT_SERVER_PATH),
            ConfigKey::ModsPath => r"D:\SteamLibrary\steamapps\common\Arma 3\!Workshop".to_string(),
            ConfigKey::ModListPath => format!(r"{}\modlist.txt", DEFAULT_SERVER_PATH),
            ConfigKey::AllowedModListPath => format!(r"{}\allowedmodlist.txt", DEFAULT_SERVER_PATH),
            ConfigKey::AdditionalStartupParameters => "-netlog -autoinit".to_string(),
        }
    }
}

/// Resolved server configuration. Every field is always populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    pub name: String,
    pub server_path: String,
    pub server_config_path: String,
    pub battleye_path: String,
    pub profiles_path: String,
    pub mods_path: String,
    pub mod_list_path: String,
    pub allowed_mod_list_path: String,
    pub additional_startup_parameters: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: ConfigKey::Name.default_value(),
            server_path: ConfigKey::ServerPath.default_value(),
            server_config_path: ConfigKey::ServerConfigPath.default_value(),
            battleye_path: ConfigKey::BattleyePath.default_value(),
            profiles_path: ConfigKey::ProfilesPath.default_value(),
            mods_path: ConfigKey::ModsPath.default_value(),
            mod_list_path: ConfigKey::ModListPath.default_value(),
            allowed_mod_list_path: ConfigKey::AllowedModListPath.default_value(),
            additional_startup_parameters: ConfigKey::AdditionalStartupParameters.default_value(),
        }
    }
}

impl ServerConfig {
    pub fn get(&self, key: ConfigKey) -> &str {
        match key {
            ConfigKey::Name => &self.name,
            ConfigKey::ServerPath => &self.server_path,
            ConfigKey::ServerConfigPath => &self.server_config_path,
            ConfigKey::BattleyePath => &self.battleye_path,
            ConfigKey::ProfilesPath => &self.profiles_path,
            ConfigKey::ModsPath => &self.mods_path,
            ConfigKey::ModListPath => &self.mod_list_path,
            ConfigKey::AllowedModListPath => &self.allowed_mod_list_path,
            ConfigKey::AdditionalStartupParameters => &self.additional_startup_parameters,
        }
    }

    pub fn set(&mut self, key: ConfigKey, value: String) {
        let slot = match key {
            ConfigKey::Name => &mut self.name,
            ConfigKey::ServerPath => &mut self.server_path,
            ConfigKey::ServerConfigPath => &mut self.server_config_path,
            ConfigKey::BattleyePath => &mut self.battleye_path,
            ConfigKey::ProfilesPath => &mut self.profiles_path,
            ConfigKey::ModsPath => &mut self.mods_path,
            ConfigKey::ModListPath => &mut self.mod_list_path,
            ConfigKey::AllowedModListPath => &mut self.allowed_mod_list_path,
            ConfigKey::AdditionalStartupParameters => &mut self.additional_startup_parameters,
        };
        *slot = value;
    }
}

/// How a key appears in a parsed document.
enum KeyState {
    Present(String),
    /// Key exists but holds null, an array or an object.
    Unusable,
    Missing,
}

fn key_state(document: &Map<String, Value>, key: ConfigKey) -> KeyState {
    match document.get(key.as_str()) {
        None => KeyState::Missing,
        Some(Value::String(s)) => KeyState::Present(s.clone()),
        Some(Value::Number(n)) => KeyState::Present(n.to_string()),
        Some(Value::Bool(b)) => KeyState::Present(b.to_string()),
        Some(_) => KeyState::Unusable,
    }
}

/// Insert `entries` as new members right after the last member of the outer
/// object. Returns `None` when the text has no closing brace.
pub fn splice_entries(text: &str, entries: &[(&str, &str)]) -> Option<String> {
    let close = text.rfind('}')?;
    let body_end = text[..close].trim_end().len();
    if body_end == 0 {
        return None;
    }
    // `{}` 처럼 비어 있는 객체면 선행 쉼표가 필요 없다
    let mut needs_comma = !text[..body_end].ends_with('{');

    let mut inserted = String::new();
    for (key, value) in entries {
        if needs_comma {
            inserted.push(',');
        }
        needs_comma = true;
        inserted.push_str("\n  ");
        inserted.push_str(&Value::from(*key).to_string());
        inserted.push_str(": ");
        inserted.push_str(&Value::from(*value).to_string());
    }
    if !text[body_end..close].contains('\n') {
        inserted.push('\n');
    }

    let mut repaired = String::with_capacity(text.len() + inserted.len());
    repaired.push_str(&text[..body_end]);
    repaired.push_str(&inserted);
    repaired.push_str(&text[body_end..]);
    Some(repaired)
}

/// Bytes of the file as text. Invalid UTF-8 is reported like a JSON syntax
/// error so the caller can recreate the file.
fn decode(bytes: &[u8]) -> Result<&str, String> {
    std::str::from_utf8(bytes).map_err(|e| format!("file is not valid UTF-8: {}", e))
}

/// A leading byte-order mark is accepted and kept in the file on repair.
fn parse_document(text: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(strip_bom(text)) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("top-level value is {}, expected an object", json_kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Owner of the server configuration file.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the configuration, creating or repairing the file as needed.
    pub fn load(&self) -> Result<ServerConfig, ConfigError> {
        tracing::info!("Checking for {}", self.path.display());
        if !self.path.exists() {
            tracing::warn!("{} could not be found", self.path.display());
            self.create_default()?;
        } else {
            tracing::info!("{} found", self.path.display());
        }

        let bytes = self.read()?;
        let parsed = decode(&bytes).and_then(|text| Ok((text, parse_document(text)?)));
        match parsed {
            Ok((text, document)) => self.ensure_complete(text, &document),
            Err(reason) => {
                tracing::error!("Could not parse {}: {}", self.path.display(), reason);
                tracing::warn!("Deleting {} and recreating it with defaults", self.path.display());
                fs::remove_file(&self.path).map_err(|source| ConfigError::Write {
                    path: self.path.clone(),
                    source,
                })?;
                self.create_default()?;
                let bytes = self.read()?;
                let (text, document) = decode(&bytes)
                    .and_then(|text| Ok((text, parse_document(text)?)))
                    .map_err(|reason| ConfigError::Parse {
                        path: self.path.clone(),
                        reason,
                    })?;
                self.ensure_complete(text, &document)
            }
        }
    }

    /// Resolve every key from `document`, appending any missing ones to the
    /// file with their defaults. `text` must be the file content `document`
    /// was parsed from. Nothing is written when no key is missing.
    pub fn ensure_complete(
        &self,
        text: &str,
        document: &Map<String, Value>,
    ) -> Result<ServerConfig, ConfigError> {
        tracing::info!("Checking for {} entries...", self.path.display());

        let mut config = ServerConfig::default();
        let mut missing = Vec::new();
        for key in ConfigKey::ALL {
            match key_state(document, key) {
                KeyState::Present(value) => config.set(key, value),
                KeyState::Unusable => {
                    tracing::warn!(
                        "{} has no usable string value, using default '{}' for this run",
                        key.as_str(),
                        key.default_value()
                    );
                }
                KeyState::Missing => {
                    tracing::warn!("{} value could not be found, creating...", key.as_str());
                    missing.push(key);
                }
            }
        }

        if missing.is_empty() {
            tracing::info!("All {} entries present", ConfigKey::ALL.len());
            return Ok(config);
        }

        let defaults: Vec<(ConfigKey, String)> =
            missing.iter().map(|key| (*key, key.default_value())).collect();
        let entries: Vec<(&str, &str)> = defaults
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();

        let repaired = splice_entries(text, &entries)
            .filter(|repaired| parse_document(repaired).is_ok())
            .ok_or_else(|| ConfigError::Repair { path: self.path.clone() })?;
        self.write(&repaired)?;
        tracing::info!("Added {} missing entries to {}", missing.len(), self.path.display());

        Ok(config)
    }

    fn create_default(&self) -> Result<(), ConfigError> {
        tracing::info!("Creating default {}", self.path.display());
        let content = serde_json::to_string_pretty(&ServerConfig::default()).map_err(|e| {
            ConfigError::Parse {
                path: self.path.clone(),
                reason: e.to_string(),
            }
        })?;
        self.write(&content)
    }

    fn read(&self) -> Result<Vec<u8>, ConfigError> {
        fs::read(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, content: &str) -> Result<(), ConfigError> {
        fs::write(&self.path, content).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })
    }
}
