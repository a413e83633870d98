//! Configuration file handling for fleetdesk.
//!
//! The configuration file is stored at `$FLEETDESK_HOME/config.json` and holds the portal API URL
//! and the list page size. The session cookie used to authenticate with the portal lives next to
//! it in `$FLEETDESK_HOME/.secrets/session`.

use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

const APP_NAME: &str = "fleetdesk";
const CONFIG_VERSION: u8 = 1;
const PAGE_SIZE: u32 = 25;
const SECRETS: &str = ".secrets";
const SESSION: &str = "session";
const CONFIG_JSON: &str = "config.json";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$FLEETDESK_HOME` and from there it loads `$FLEETDESK_HOME/config.json`.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    api_url: Url,
}

impl Config {
    /// Creates the data directory, its secrets subdirectory and:
    /// - Creates an initial `config.json` file using `api_url` along with default settings
    /// - Writes `session` (the portal's session cookie, e.g. `sid=abc123`) to the secrets
    ///   directory when one is given.
    ///
    /// # Errors
    /// - Returns an error if `api_url` is not an absolute http(s) URL.
    /// - Returns an error if any file operations fail.
    pub async fn create(
        dir: impl Into<PathBuf>,
        api_url: &str,
        session: Option<&str>,
    ) -> Result<Self> {
        let url = parse_api_url(api_url)?;

        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the fleetdesk home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let secrets_dir = root.join(SECRETS);
        utils::make_dir(&secrets_dir).await?;

        if let Some(cookie) = session {
            utils::write_secret(secrets_dir.join(SESSION), cookie.trim()).await?;
        }

        let config_path = root.join(CONFIG_JSON);
        let config_file = ConfigFile {
            api_url: url.to_string(),
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;

        Ok(Self {
            root,
            secrets: secrets_dir,
            config_path,
            config_file,
            api_url: url,
        })
    }

    /// This will
    /// - validate that `fleetdesk_home` exists and that the config file exists
    /// - load and validate the config file
    /// - validate that the secrets directory exists
    pub async fn load(fleetdesk_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = fleetdesk_home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("The fleetdesk home directory is missing, run 'fleetdesk init'")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;
        let api_url = parse_api_url(&config_file.api_url)?;

        let config = Self {
            secrets: root.join(SECRETS),
            root,
            config_path,
            config_file,
            api_url,
        };
        if !config.secrets.is_dir() {
            bail!(
                "The secrets directory is missing '{}'",
                config.secrets.display()
            )
        }
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    pub fn page_size(&self) -> u32 {
        self.config_file.page_size
    }

    /// Returns the stored `session_path` if it is absolute, otherwise resolves it against the home
    /// directory.
    pub fn session_path(&self) -> PathBuf {
        let p = self.config_file.session_path();
        if p.is_absolute() {
            return p;
        }
        self.root.join(p)
    }

    /// Reads the session cookie. Returns `None` when no session file exists; requests are then
    /// sent without a cookie and the portal decides what to do with them.
    pub async fn session(&self) -> Result<Option<String>> {
        let path = self.session_path();
        if !path.is_file() {
            return Ok(None);
        }
        let cookie = utils::read(&path).await?;
        let cookie = cookie.trim();
        Ok((!cookie.is_empty()).then(|| cookie.to_string()))
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "fleetdesk",
///   "config_version": 1,
///   "api_url": "https://portal.example.com/",
///   "page_size": 25,
///   "session_path": ".secrets/session"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "fleetdesk"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Base URL of the portal. The `/api/...` paths are joined onto it.
    api_url: String,

    /// Number of rows to request per page for paginated lists
    #[serde(default = "default_page_size")]
    page_size: u32,

    /// Path to the session cookie file (optional, relative to the home directory or absolute)
    /// Defaults to $FLEETDESK_HOME/.secrets/session if not specified
    #[serde(skip_serializing_if = "Option::is_none")]
    session_path: Option<PathBuf>,
}

fn default_page_size() -> u32 {
    PAGE_SIZE
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            api_url: String::new(),
            page_size: PAGE_SIZE,
            session_path: None,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if it is not a fleetdesk config
    async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = utils::read(path).await?;

        let config: ConfigFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        anyhow::ensure!(
            config.page_size > 0,
            "Invalid page_size in config file: must be greater than zero"
        );

        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }

    fn session_path(&self) -> PathBuf {
        self.session_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(SESSION))
    }
}

/// Parses the portal base URL. It must be absolute and use http or https. A trailing slash is
/// added so that joining `api/...` keeps any path prefix the portal is mounted under.
fn parse_api_url(s: &str) -> Result<Url> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        bail!("The portal API URL is empty")
    }
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash)
        .with_context(|| format!("Invalid portal API URL '{trimmed}'"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => bail!("The portal API URL must use http or https, got '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_config_create() {
        let dir = TempDir::new().unwrap();
        let home_dir = dir.path().join("fleetdesk_home");

        let config = Config::create(&home_dir, "https://portal.example.com", Some("sid=abc\n"))
            .await
            .unwrap();

        assert_eq!(config.api_url().as_str(), "https://portal.example.com/");
        assert_eq!(config.page_size(), 25);
        assert!(config.secrets().is_dir());
        assert!(config.config_path().is_file());
        assert_eq!(config.session().await.unwrap().as_deref(), Some("sid=abc"));
    }

    #[tokio::test]
    async fn test_config_load_after_create() {
        let dir = TempDir::new().unwrap();
        let home_dir = dir.path().to_owned();
        Config::create(&home_dir, "http://localhost:5000/portal", None)
            .await
            .unwrap();

        let config = Config::load(&home_dir).await.unwrap();
        assert_eq!(config.api_url().as_str(), "http://localhost:5000/portal/");
        assert!(config.session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_config_load_missing_home() {
        let dir = TempDir::new().unwrap();
        let result = Config::load(dir.path().join("nope")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_config_load_missing_secrets_dir() {
        let dir = TempDir::new().unwrap();
        Config::create(dir.path(), "https://portal.example.com", None)
            .await
            .unwrap();
        tokio::fs::remove_dir(dir.path().join(SECRETS)).await.unwrap();

        let err = Config::load(dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("secrets directory is missing"));
    }

    #[tokio::test]
    async fn test_config_file_load_with_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{
            "app_name": "fleetdesk",
            "config_version": 1,
            "api_url": "https://portal.example.com/"
        }"#;
        utils::write(&config_path, json).await.unwrap();

        let config = ConfigFile::load(&config_path).await.unwrap();
        assert_eq!(config.page_size, PAGE_SIZE);
        assert_eq!(config.session_path(), PathBuf::from(SECRETS).join(SESSION));
    }

    #[tokio::test]
    async fn test_config_file_load_invalid_app_name() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{
            "app_name": "some-other-app",
            "config_version": 1,
            "api_url": "https://portal.example.com/"
        }"#;
        utils::write(&config_path, json).await.unwrap();

        let result = ConfigFile::load(&config_path).await;
        assert!(result.unwrap_err().to_string().contains("Invalid app_name"));
    }

    #[tokio::test]
    async fn test_config_file_rejects_zero_page_size() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let json = r#"{
            "app_name": "fleetdesk",
            "config_version": 1,
            "api_url": "https://portal.example.com/",
            "page_size": 0
        }"#;
        utils::write(&config_path, json).await.unwrap();

        assert!(ConfigFile::load(&config_path).await.is_err());
    }

    #[test]
    fn test_config_file_serialization_omits_none_fields() {
        let config = ConfigFile::default();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("session_path"));
    }

    #[test]
    fn test_parse_api_url() {
        assert_eq!(
            parse_api_url("https://portal.example.com").unwrap().as_str(),
            "https://portal.example.com/"
        );
        assert_eq!(
            parse_api_url(" https://example.com/fleet/ ").unwrap().as_str(),
            "https://example.com/fleet/"
        );
        assert!(parse_api_url("").is_err());
        assert!(parse_api_url("ftp://example.com").is_err());
        assert!(parse_api_url("not a url").is_err());
    }
}
