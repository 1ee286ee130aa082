use std::process::exit;

use flocon::config::{self, AppConfiguration, DatabaseBackend};

use crate::cli::{ConfigCommand, UpdateConfiguration};

fn list_and_exit() {
    println!(
        "Configuration file {}:\n",
        config::configuration_file().to_string_lossy()
    );

    match config::load_or_create()
        .map_err(|e| e.to_string())
        .and_then(|cfg| config::application_config_to_string(&cfg).map_err(|e| e.to_string()))
    {
        Ok(toml_as_string) => println!("{toml_as_string}"),
        Err(e) => {
            eprintln!("ERROR: Unable to read the configuration: {e}");
            exit(4);
        }
    }
    exit(0);
}

fn apply(update: UpdateConfiguration, app_config: &mut AppConfiguration) {
    if let Some(url) = update.database_url {
        app_config.database.url = url;
    }
    if let Some(key) = update.service_role_key {
        app_config.database.service_role_key = key;
    }
    if let Some(path) = update.sqlite_path {
        app_config.database.backend = DatabaseBackend::Sqlite;
        app_config.database.sqlite_path = path;
    }
    if let Some(client_id) = update.client_id {
        app_config.qbo.client_id = client_id;
    }
    if let Some(secret) = update.client_secret {
        app_config.qbo.client_secret = secret;
    }
    if let Some(uri) = update.redirect_uri {
        app_config.qbo.redirect_uri = uri;
    }
    if let Some(environment) = update.environment {
        app_config.qbo.environment = environment.parse().unwrap_or_default();
    }
    if let Some(bind) = update.bind {
        app_config.server.bind = bind;
    }
}

pub fn execute(cmd: ConfigCommand) {
    match cmd {
        ConfigCommand::List => list_and_exit(),
        ConfigCommand::Update(update) => {
            let mut app_config = match config::load_or_create() {
                Ok(ac) => ac,
                Err(e) => {
                    eprintln!(
                        "ERROR: Unable to load or create configuration file {}, reason:{}",
                        config::configuration_file().to_string_lossy(),
                        e
                    );
                    exit(4);
                }
            };
            apply(update, &mut app_config);
            if let Err(e) = config::save(&app_config) {
                eprintln!("ERROR: Unable to save the configuration: {e}");
                exit(4);
            }
            println!(
                "Configuration saved to {}",
                config::configuration_file().to_string_lossy()
            );
        }
        ConfigCommand::Remove => match config::remove() {
            Ok(()) => {
                println!(
                    "Configuration file {} removed",
                    config::configuration_file().to_string_lossy()
                );
            }
            Err(e) => {
                eprintln!(
                    "ERROR:Unable to remove configuration file {} : {}",
                    config::configuration_file().to_string_lossy(),
                    e
                );
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_path_switches_backend() {
        let mut cfg = AppConfiguration::default();
        apply(
            UpdateConfiguration {
                sqlite_path: Some("/tmp/flocon.db".into()),
                environment: Some("production".into()),
                ..Default::default()
            },
            &mut cfg,
        );
        assert_eq!(cfg.database.backend, DatabaseBackend::Sqlite);
        assert_eq!(cfg.database.sqlite_path, "/tmp/flocon.db");
        assert_eq!(cfg.qbo.environment.to_string(), "production");
        assert!(cfg.qbo.client_id.is_empty());
    }
}
