//! `config.toml` loading and the credential source.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::keymap::KeyMachine;
use crate::views::Tab;

pub const DEFAULT_API_BASE_URL: &str = "https://api.todoist.com/rest/v2";
const APP_DIR: &str = "tasklane";
const TOKEN_FILE: &str = "token";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub default_tab: String,
    /// Days ahead of today the upcoming view covers.
    pub upcoming_days: u32,
    pub request_timeout_secs: u64,
    pub keys: BTreeMap<String, String>,
    pub oauth: OAuthConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            default_tab: String::from("today"),
            upcoming_days: 14,
            request_timeout_secs: 30,
            keys: BTreeMap::new(),
            oauth: OAuthConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub scope: String,
    pub redirect_port: u16,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            authorize_url: String::from("https://todoist.com/oauth/authorize"),
            token_url: String::from("https://todoist.com/oauth/access_token"),
            scope: String::from("data:read_write,data:delete"),
            redirect_port: 8765,
        }
    }
}

impl Config {
    /// Loads `path`, or the default location when `path` is `None`.
    ///
    /// A missing file yields the defaults; an unreadable or malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match config_dir() {
                Some(dir) => dir.join("config.toml"),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config: Self =
            toml::from_str(&raw).map_err(|source| ConfigError::Parse { path, source })?;
        // Surface binding mistakes at startup rather than on first key press.
        config.keymap()?;
        config.default_tab()?;
        Ok(config)
    }

    pub fn keymap(&self) -> Result<KeyMachine, ConfigError> {
        KeyMachine::with_overrides(&self.keys)
    }

    pub fn default_tab(&self) -> Result<Tab, ConfigError> {
        Tab::parse(&self.default_tab)
    }
}

pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR))
}

/// Candidate log file locations, most preferred first.
pub fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dir) = dirs::data_local_dir() {
        candidates.push(dir.join(APP_DIR).join("tasklane.log"));
    }
    candidates.push(PathBuf::from(".tasklane").join("tasklane.log"));
    candidates
}

/// Where the bearer token comes from, in lookup order.
#[derive(Debug, Clone)]
pub struct Credentials {
    explicit: Option<String>,
    token_file: Option<PathBuf>,
}

impl Credentials {
    pub fn new(explicit: Option<String>, token_file: Option<PathBuf>) -> Self {
        Self {
            explicit,
            token_file,
        }
    }

    pub fn from_default_location(explicit: Option<String>) -> Self {
        Self::new(explicit, config_dir().map(|dir| dir.join(TOKEN_FILE)))
    }

    pub fn token_file(&self) -> Option<&Path> {
        self.token_file.as_deref()
    }

    pub fn token(&self) -> Result<String, ConfigError> {
        if let Some(token) = self.explicit.as_deref().map(str::trim)
            && !token.is_empty()
        {
            return Ok(token.to_string());
        }

        let Some(path) = self.token_file.as_deref() else {
            return Err(ConfigError::MissingToken);
        };
        if !path.exists() {
            return Err(ConfigError::MissingToken);
        }
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let token = raw.trim();
        if token.is_empty() {
            return Err(ConfigError::MissingToken);
        }
        Ok(token.to_string())
    }

    pub fn store(&self, token: &str) -> Result<PathBuf, ConfigError> {
        let path = self
            .token_file
            .clone()
            .ok_or(ConfigError::MissingToken)?;
        let write_err = |source| ConfigError::Write {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(&path, format!("{}\n", token.trim())).map_err(write_err)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::load(Some(&dir.path().join("absent.toml"))).expect("load");
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.default_tab().expect("tab"), Tab::Today);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "default_tab = \"projects\"\n[keys]\nrefresh = \"ctrl-l\"\n[oauth]\nclient_id = \"abc\"\n",
        )
        .expect("write");
        let config = Config::load(Some(&path)).expect("load");
        assert_eq!(config.default_tab().expect("tab"), Tab::Projects);
        assert_eq!(config.upcoming_days, 14);
        assert_eq!(config.oauth.client_id, "abc");
        assert_eq!(config.oauth.redirect_port, 8765);
    }

    #[test]
    fn bad_binding_fails_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[keys]\nteleport = \"t\"\n").expect("write");
        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::UnknownAction(_))
        ));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "upcoming_days = \"soon\"").expect("write");
        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn explicit_token_wins_over_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("token");
        fs::write(&file, "from-file\n").expect("write");

        let creds = Credentials::new(Some("  from-flag ".into()), Some(file.clone()));
        assert_eq!(creds.token().expect("token"), "from-flag");

        let creds = Credentials::new(None, Some(file));
        assert_eq!(creds.token().expect("token"), "from-file");
    }

    #[test]
    fn stored_token_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let creds = Credentials::new(None, Some(dir.path().join("nested").join("token")));
        assert!(matches!(creds.token(), Err(ConfigError::MissingToken)));
        creds.store("abc123").expect("store");
        assert_eq!(creds.token().expect("token"), "abc123");
    }
}
