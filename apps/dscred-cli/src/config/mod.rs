//! Configuration management for the dscred CLI
//!
//! Flags and `TS_*` environment variables (resolved by clap) take precedence
//! over the JSON config file, which fills in whatever is left.

use crate::error::{CliError, CliResult};
use dscred::{ServerConfig, Settings};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Replaces the platform config directory, e.g. for CI runs.
pub const CONFIG_DIR_ENV: &str = "DSCRED_CONFIG_DIR";

const CONFIG_FILE_NAME: &str = "config.json";

/// `$DSCRED_CONFIG_DIR/config.json`, or `config.json` under the platform
/// config directory (`~/.config/dscred` on Linux).
fn default_config_file() -> CliResult<PathBuf> {
    let dir = match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) => PathBuf::from(dir),
        None => dirs::config_dir()
            .map(|base| base.join("dscred"))
            .ok_or_else(|| {
                CliError::Config(
                    "no configuration directory on this platform; pass --config".to_string(),
                )
            })?,
    };
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Config file to read: the explicit path if given, else the default location.
pub fn config_file(explicit: Option<&Path>) -> CliResult<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_config_file(),
    }
}

/// Merge command-line settings over the config file and validate the result.
pub fn resolve(cli: Settings, explicit_file: Option<&Path>) -> CliResult<ServerConfig> {
    let path = config_file(explicit_file)?;
    let file = Settings::load(&path)?;
    debug!(path = %path.display(), "Loaded config file");
    Ok(cli.merge(file).into_server_config()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_merges_file_under_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"server_url": "https://file.example.com", "api_version": "3.4", "username": "file-user", "page_size": 50}"#,
        )
        .unwrap();

        let cli = Settings {
            username: Some("flag-user".into()),
            password: Some("pw".into()),
            ..Default::default()
        };
        let config = resolve(cli, Some(&path)).unwrap();

        assert_eq!(config.server_url, "https://file.example.com");
        assert_eq!(config.username, "flag-user");
        assert_eq!(config.page_size, 50);
    }

    #[test]
    fn test_resolve_missing_password() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let cli = Settings {
            server_url: Some("https://h.example.com".into()),
            api_version: Some("3.4".into()),
            username: Some("admin".into()),
            ..Default::default()
        };
        let err = resolve(cli, Some(&path)).unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn test_config_file_prefers_explicit_path() {
        let explicit = Path::new("/etc/dscred/site.json");
        assert_eq!(config_file(Some(explicit)).unwrap(), explicit);
    }

    #[test]
    fn test_config_dir_override() {
        std::env::set_var(CONFIG_DIR_ENV, "/tmp/dscred-test");
        let path = config_file(None).unwrap();
        std::env::remove_var(CONFIG_DIR_ENV);
        assert_eq!(path, PathBuf::from("/tmp/dscred-test/config.json"));
    }

    #[test]
    fn test_resolve_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(resolve(Settings::default(), Some(&path)).is_err());
    }
}
