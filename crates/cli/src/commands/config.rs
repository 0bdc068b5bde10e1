use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use techstore_core::config::{resolve_config_path, AppConfig, LoadOptions, LogFormat};
use toml::Value;

use crate::commands::{CommandResult, EXIT_CONFIG};

/// One reportable setting: dotted key, effective value, and the environment
/// variables that can set it (first match wins).
struct Setting {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                EXIT_CONFIG,
            );
        }
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(settings(&config).into_iter().map(|setting| {
        let source = field_source(
            setting.key,
            setting.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        render_line(setting.key, &setting.value, &source)
    }));

    CommandResult::success("config", lines.join("\n"))
}

fn settings(config: &AppConfig) -> Vec<Setting> {
    vec![
        Setting {
            key: "database.url",
            value: config.database.url.clone(),
            env_keys: &["TECHSTORE_DATABASE_URL"],
        },
        Setting {
            key: "database.max_connections",
            value: config.database.max_connections.to_string(),
            env_keys: &["TECHSTORE_DATABASE_MAX_CONNECTIONS"],
        },
        Setting {
            key: "database.timeout_secs",
            value: config.database.timeout_secs.to_string(),
            env_keys: &["TECHSTORE_DATABASE_TIMEOUT_SECS"],
        },
        Setting {
            key: "server.bind_address",
            value: config.server.bind_address.clone(),
            env_keys: &["TECHSTORE_SERVER_BIND_ADDRESS"],
        },
        Setting {
            key: "server.port",
            value: config.server.port.to_string(),
            env_keys: &["TECHSTORE_SERVER_PORT"],
        },
        Setting {
            key: "server.graceful_shutdown_secs",
            value: config.server.graceful_shutdown_secs.to_string(),
            env_keys: &["TECHSTORE_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        },
        Setting {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["TECHSTORE_LOGGING_LEVEL", "TECHSTORE_LOG_LEVEL"],
        },
        Setting {
            key: "logging.format",
            value: log_format_name(config.logging.format).to_string(),
            env_keys: &["TECHSTORE_LOGGING_FORMAT", "TECHSTORE_LOG_FORMAT"],
        },
    ]
}

fn log_format_name(format: LogFormat) -> &'static str {
    match format {
        LogFormat::Compact => "compact",
        LogFormat::Pretty => "pretty",
        LogFormat::Json => "json",
    }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("config file"));
            return format!("file ({})", file_path.display());
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: &str) -> String {
    format!("- {key} = {value} (source: {source})")
}
