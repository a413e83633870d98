use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{utils, Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory, its subdirectories and:
/// - Creates an initial `config.json` file using `api_url` along with default settings
/// - Copies the session cookie found in `session_file`, if given, into the secrets directory.
///
/// # Arguments
/// - `fleetdesk_home` - The directory that will be the root of data directory, e.g.
///   `$HOME/fleetdesk`
/// - `api_url` - The base URL of the portal, e.g. `https://portal.example.com`
/// - `session_file` - A file holding the `Cookie` header value of a logged-in browser session.
///
/// # Errors
/// - Returns an error if `api_url` is not an http(s) URL.
/// - Returns an error if any file operations fail.
pub async fn init(
    fleetdesk_home: &Path,
    api_url: &str,
    session_file: Option<&Path>,
) -> Result<Out<()>> {
    let session = match session_file {
        Some(path) => Some(
            utils::read(path)
                .await
                .context("Unable to read the session file")
                .pub_result(ErrorType::Config)?,
        ),
        None => None,
    };

    let config = Config::create(fleetdesk_home, api_url, session.as_deref())
        .await
        .context("Unable to create the data directory and configs")
        .pub_result(ErrorType::Config)?;

    let mut message = format!(
        "Successfully created the fleetdesk directory at {}",
        config.root().display()
    );
    if session.is_none() {
        message.push_str(&format!(
            "\nNo session was given; place the portal's session cookie in {}",
            config.session_path().display()
        ));
    }
    Ok(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_copies_session() {
        let dir = TempDir::new().unwrap();
        let session_file = dir.path().join("cookie.txt");
        std::fs::write(&session_file, "sid=abc123\n").unwrap();
        let home = dir.path().join("fleetdesk");

        let out = init(&home, "https://portal.example.com", Some(&session_file))
            .await
            .unwrap();
        assert!(out.message().starts_with("Successfully created"));

        let config = Config::load(&home).await.unwrap();
        assert_eq!(config.session().await.unwrap().as_deref(), Some("sid=abc123"));
    }

    #[tokio::test]
    async fn test_init_without_session() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("fleetdesk");
        let out = init(&home, "https://portal.example.com", None)
            .await
            .unwrap();
        assert!(out.message().contains("No session was given"));
    }

    #[tokio::test]
    async fn test_init_bad_url() {
        let dir = TempDir::new().unwrap();
        let err = init(&dir.path().join("fleetdesk"), "ftp://portal", None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Configuration error");
    }
}
