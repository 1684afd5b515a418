//! Configuration management for sdesk.
//!
//! Loads configuration from ${SDESK_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Environment variable that overrides `api_base_url`.
pub const API_BASE_URL_ENV: &str = "SDESK_API_BASE_URL";

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
/// To update, run `cargo xtask update-default-config`.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Merges user config values into the default template.
///
/// New comments/sections from the template stay present while the
/// user's customized values win.
fn merge_with_template(user_config: &str) -> Result<String> {
    use toml_edit::DocumentMut;

    let mut doc: DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;
    let user_doc: DocumentMut = user_config.parse().context("Failed to parse user config")?;

    merge_items(doc.as_table_mut(), user_doc.as_table());

    Ok(doc.to_string())
}

/// Recursively merges items from source table into target table.
fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

pub mod paths {
    //! Path resolution for sdesk configuration and data files.
    //!
    //! SDESK_HOME resolution order:
    //! 1. SDESK_HOME environment variable (if set)
    //! 2. ~/.config/sdesk (default)

    use std::path::PathBuf;

    /// Returns the sdesk home directory.
    pub fn sdesk_home() -> PathBuf {
        if let Ok(home) = std::env::var("SDESK_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".sdesk"),
            |h| h.join(".config").join("sdesk"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        sdesk_home().join("config.toml")
    }

    /// Returns the path to the persisted session.
    pub fn session_path() -> PathBuf {
        sdesk_home().join("session.json")
    }

    /// Returns the directory holding rotated log files.
    pub fn logs_dir() -> PathBuf {
        sdesk_home().join("logs")
    }
}

/// Logging options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive when `SDESK_LOG` is unset.
    pub level: String,
    /// Whether the TUI writes logs under `$SDESK_HOME/logs`.
    pub file: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub companies_page_size: u32,
    pub projects_page_size: u32,
    pub tickets_page_size: u32,
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: Self::DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: Self::DEFAULT_REQUEST_TIMEOUT_SECS,
            companies_page_size: 15,
            projects_page_size: 10,
            tickets_page_size: 10,
            log: LogConfig::default(),
        }
    }
}

impl Config {
    pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
    const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Resolves the API base URL: `SDESK_API_BASE_URL` > config > default.
    pub fn resolve_base_url(&self) -> Result<Url> {
        let env_url = std::env::var(API_BASE_URL_ENV).ok();
        self.resolve_base_url_with(env_url.as_deref())
    }

    fn resolve_base_url_with(&self, env_url: Option<&str>) -> Result<Url> {
        let candidates = [env_url, Some(self.api_base_url.as_str())];
        let chosen = candidates
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|url| !url.is_empty())
            .unwrap_or(Self::DEFAULT_API_BASE_URL);

        let mut url =
            Url::parse(chosen).with_context(|| format!("Invalid API base URL: {chosen}"))?;
        // Joining relative endpoint paths needs a trailing slash.
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    /// Per-request timeout. Zero falls back to the default.
    pub fn request_timeout(&self) -> Duration {
        let secs = if self.request_timeout_secs == 0 {
            Self::DEFAULT_REQUEST_TIMEOUT_SECS
        } else {
            self.request_timeout_secs
        };
        Duration::from_secs(secs)
    }

    /// Saves only the api_base_url field to the config file.
    pub fn save_api_base_url(url: &str) -> Result<()> {
        Self::save_api_base_url_to(&paths::config_path(), url)
    }

    /// Saves only the api_base_url field to a specific config file path.
    ///
    /// Creates the file with default template if it doesn't exist.
    /// If file exists, merges user values into the latest template.
    pub fn save_api_base_url_to(path: &Path, url: &str) -> Result<()> {
        use toml_edit::{DocumentMut, value};

        Url::parse(url).with_context(|| format!("Invalid API base URL: {url}"))?;

        let contents = if path.exists() {
            let user_config = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            merge_with_template(&user_config)?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        doc["api_base_url"] = value(url);

        Self::write_config(path, &doc.to_string())
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Generates a fresh config TOML from Rust defaults.
    ///
    /// Used by `xtask update-default-config` to keep `default_config.toml`
    /// in sync with `Config::default()`.
    pub fn generate() -> Result<String> {
        let generated =
            toml::to_string(&Config::default()).context("Failed to serialize default config")?;
        merge_with_template(&generated)
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    /// Missing file returns defaults.
    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nonexistent.toml")).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.companies_page_size, 15);
        assert_eq!(config.projects_page_size, 10);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(
            &config_path,
            "api_base_url = \"https://desk.example.com/api\"\n[log]\nlevel = \"debug\"\n",
        )
        .unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.api_base_url, "https://desk.example.com/api");
        assert_eq!(config.log.level, "debug");
        assert!(config.log.file);
        assert_eq!(config.request_timeout_secs, 10);
    }

    #[test]
    fn test_load_invalid_toml_reports_path() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "api_base_url = [").unwrap();

        let err = Config::load_from(&config_path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }

    /// Env beats config, config beats default, blanks are skipped.
    #[test]
    fn test_base_url_precedence() {
        let config = Config {
            api_base_url: "https://config.example.com/api".to_string(),
            ..Default::default()
        };

        let from_env = config
            .resolve_base_url_with(Some("https://env.example.com/v2"))
            .unwrap();
        assert_eq!(from_env.as_str(), "https://env.example.com/v2/");

        let from_config = config.resolve_base_url_with(Some("   ")).unwrap();
        assert_eq!(from_config.as_str(), "https://config.example.com/api/");

        let blank = Config {
            api_base_url: String::new(),
            ..Default::default()
        };
        let fallback = blank.resolve_base_url_with(None).unwrap();
        assert_eq!(fallback.as_str(), "http://localhost:8000/api/");
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let config = Config {
            api_base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(config.resolve_base_url_with(None).is_err());
    }

    #[test]
    fn test_zero_timeout_uses_default() {
        let config = Config {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_init_creates_config_with_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("api_base_url = \"http://localhost:8000/api\""));
        assert!(contents.contains("# Base URL of the service-desk REST API."));
        assert_eq!(Config::load_from(&config_path).unwrap(), Config::default());
    }

    /// No silent overwrite.
    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "").unwrap();

        assert!(Config::init(&config_path).is_err());
    }

    /// Saving keeps user values and template comments.
    #[test]
    fn test_save_api_base_url_preserves_other_values() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "projects_page_size = 25\n").unwrap();

        Config::save_api_base_url_to(&config_path, "https://desk.example.com/api").unwrap();

        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("# Page sizes used by list screens and commands."));
        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.api_base_url, "https://desk.example.com/api");
        assert_eq!(config.projects_page_size, 25);
    }

    #[test]
    fn test_save_api_base_url_rejects_garbage() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        assert!(Config::save_api_base_url_to(&config_path, "::nope").is_err());
        assert!(!config_path.exists());
    }

    /// The shipped template matches `Config::default()`.
    #[test]
    fn test_generate_matches_template_values() {
        let generated = Config::generate().unwrap();
        let parsed: Config = toml::from_str(&generated).unwrap();
        assert_eq!(parsed, Config::default());
        assert!(generated.contains("# Upper bound for a single HTTP request"));
    }
}
