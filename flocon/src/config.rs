use crate::error::FloconError;
use anyhow::Result;
use directories::ProjectDirs;
use log::debug;
use qbo::config::QboClientConfiguration;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Environment variables that take precedence over the configuration file
pub struct EnvVars;

impl EnvVars {
    pub const SUPABASE_URL: &'static str = "SUPABASE_URL";
    pub const PUBLIC_SUPABASE_URL: &'static str = "NEXT_PUBLIC_SUPABASE_URL";
    pub const SERVICE_ROLE_KEY: &'static str = "SUPABASE_SERVICE_ROLE_KEY";
    pub const QBO_CLIENT_ID: &'static str = "QBO_CLIENT_ID";
    pub const QBO_CLIENT_SECRET: &'static str = "QBO_CLIENT_SECRET";
    pub const QBO_REDIRECT_URI: &'static str = "QBO_REDIRECT_URI";
    pub const QBO_ENVIRONMENT: &'static str = "QBO_ENVIRONMENT";
    pub const BIND: &'static str = "FLOCON_BIND";
}

/// Application configuration struct
/// Holds what we need to reach the database, QuickBooks and where to serve the API
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
pub struct AppConfiguration {
    #[serde(default)]
    pub database: DatabaseConfiguration,
    #[serde(default)]
    pub qbo: QboClientConfiguration,
    #[serde(default)]
    pub server: ServerConfiguration,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    /// The hosted Postgres database, reached through its PostgREST gateway
    #[default]
    Postgrest,
    /// Local Sqlite file, for offline work and testing
    Sqlite,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct DatabaseConfiguration {
    #[serde(default)]
    pub backend: DatabaseBackend,
    /// Base URL of the project, i.e. `https://xyz.supabase.co`
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub service_role_key: String,
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
}

impl Default for DatabaseConfiguration {
    fn default() -> Self {
        DatabaseConfiguration {
            backend: DatabaseBackend::Postgrest,
            url: String::new(),
            service_role_key: String::new(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct ServerConfiguration {
    pub bind: String,
}

impl Default for ServerConfiguration {
    fn default() -> Self {
        ServerConfiguration {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// Filename holding the application configuration parameters
#[must_use]
pub fn configuration_file() -> PathBuf {
    project_dirs().map_or_else(
        || PathBuf::from("flocon.toml"),
        |dirs| dirs.preference_dir().join("flocon.toml"),
    )
}

/// Filename of the local Sqlite database
#[must_use]
pub fn sqlite_file() -> PathBuf {
    project_dirs().map_or_else(
        || PathBuf::from("flocon.db"),
        |dirs| dirs.data_dir().join("flocon.db"),
    )
}

/// Loads the configuration file, if there is one, and applies the environment overrides.
///
/// # Errors
/// Fails if the file exists but cannot be read or parsed
pub fn load() -> Result<AppConfiguration, FloconError> {
    let config_path = configuration_file();
    let mut app_config = if config_path.exists() {
        read(&config_path)?
    } else {
        debug!("No configuration file {}, using defaults", config_path.display());
        AppConfiguration::default()
    };
    apply_overrides(&mut app_config, |name| env::var(name).ok());
    Ok(app_config)
}

/// The configuration file as written, without environment overrides, or the defaults if
/// there is no file yet
///
/// # Errors
/// Fails if the file exists but cannot be read or parsed
pub fn load_or_create() -> Result<AppConfiguration, FloconError> {
    let config_path = configuration_file();
    if config_path.exists() {
        read(&config_path)
    } else {
        Ok(AppConfiguration::default())
    }
}

#[allow(clippy::missing_errors_doc)]
pub fn save(cfg: &AppConfiguration) -> Result<()> {
    create_configuration_file(cfg, &configuration_file())
}

#[allow(clippy::missing_errors_doc)]
pub fn remove() -> io::Result<()> {
    fs::remove_file(configuration_file().as_path())
}

#[allow(clippy::missing_errors_doc)]
pub fn application_config_to_string(cfg: &AppConfiguration) -> Result<String> {
    Ok(toml::to_string::<AppConfiguration>(cfg)?)
}

/// Overwrites settings with whatever `lookup` yields for the known environment variables
pub fn apply_overrides<F>(cfg: &mut AppConfiguration, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(EnvVars::SUPABASE_URL).or_else(|| lookup(EnvVars::PUBLIC_SUPABASE_URL)) {
        cfg.database.url = url;
    }
    if let Some(key) = lookup(EnvVars::SERVICE_ROLE_KEY) {
        cfg.database.service_role_key = key;
    }
    if let Some(id) = lookup(EnvVars::QBO_CLIENT_ID) {
        cfg.qbo.client_id = id;
    }
    if let Some(secret) = lookup(EnvVars::QBO_CLIENT_SECRET) {
        cfg.qbo.client_secret = secret;
    }
    if let Some(uri) = lookup(EnvVars::QBO_REDIRECT_URI) {
        cfg.qbo.redirect_uri = uri;
    }
    if let Some(environment) = lookup(EnvVars::QBO_ENVIRONMENT) {
        cfg.qbo.environment = environment.parse().unwrap_or_default();
    }
    if let Some(bind) = lookup(EnvVars::BIND) {
        cfg.server.bind = bind;
    }
}

fn default_sqlite_path() -> String {
    sqlite_file().to_string_lossy().to_string()
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "flocon", "flocon")
}

/// Reads the `Application` configuration struct from the supplied TOML file
pub(crate) fn read(path: &Path) -> Result<AppConfiguration, FloconError> {
    let mut file = File::open(path).map_err(|source| FloconError::ApplicationConfig {
        path: path.into(),
        source,
    })?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|source| FloconError::ApplicationConfig {
            path: path.into(),
            source,
        })?;
    toml::from_str::<AppConfiguration>(&contents).map_err(|source| FloconError::TomlParse {
        path: path.into(),
        source,
    })
}

fn create_configuration_file(cfg: &AppConfiguration, path: &Path) -> Result<()> {
    if let Some(directory) = path.parent() {
        if !directory.as_os_str().is_empty() && !directory.try_exists()? {
            fs::create_dir_all(directory)?;
        }
    }
    let mut file = File::create(path)?;
    let toml = application_config_to_string(cfg)?;
    file.write_all(toml.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qbo::config::QboEnvironment;
    use std::collections::HashMap;

    #[test]
    fn toml_parsing() {
        let toml_str = r#"
        [database]
        url = "https://xyz.supabase.co"
        service_role_key = "service-key"

        [qbo]
        client_id = "ABC"
        client_secret = "XYZ"
        redirect_uri = "https://flocon.example.com/api/qbo/callback"
        environment = "production"
        "#;

        let app_config: AppConfiguration = toml::from_str(toml_str).unwrap();
        assert_eq!(app_config.database.backend, DatabaseBackend::Postgrest);
        assert_eq!(app_config.qbo.environment, QboEnvironment::Production);
        assert_eq!(app_config.server.bind, DEFAULT_BIND);
    }

    #[test]
    fn sqlite_path_gets_a_default() {
        let app_config: AppConfiguration = toml::from_str("[database]\nbackend = \"sqlite\"\n").unwrap();
        assert_eq!(app_config.database.backend, DatabaseBackend::Sqlite);
        assert_eq!(app_config.database.sqlite_path, sqlite_file().to_string_lossy());
    }

    #[test]
    fn environment_wins_over_file() {
        let vars: HashMap<&str, &str> = [
            (EnvVars::PUBLIC_SUPABASE_URL, "https://public.supabase.co"),
            (EnvVars::SERVICE_ROLE_KEY, "secret-key"),
            (EnvVars::QBO_ENVIRONMENT, "production"),
            (EnvVars::BIND, "0.0.0.0:8080"),
        ]
        .into_iter()
        .collect();
        let mut cfg = AppConfiguration::default();

        apply_overrides(&mut cfg, |name| vars.get(name).map(ToString::to_string));

        assert_eq!(cfg.database.url, "https://public.supabase.co");
        assert_eq!(cfg.database.service_role_key, "secret-key");
        assert_eq!(cfg.qbo.environment, QboEnvironment::Production);
        assert_eq!(cfg.server.bind, "0.0.0.0:8080");
    }

    #[test]
    fn write_and_read_toml_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("flocon.toml");
        let mut cfg = AppConfiguration::default();
        cfg.database.url = "https://xyz.supabase.co".into();
        cfg.qbo.client_id = "client".into();

        create_configuration_file(&cfg, &path)?;
        let result = read(&path)?;
        assert_eq!(cfg, result);
        Ok(())
    }
}
