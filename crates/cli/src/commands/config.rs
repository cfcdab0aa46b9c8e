use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use glowie_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

struct Field {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run() -> String {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => render(&config, detect_config_path().as_deref()),
        Err(error) => format!("config validation failed: {error}"),
    }
}

pub fn render(config: &AppConfig, config_file_path: Option<&Path>) -> String {
    let config_file_doc = load_config_file_doc(config_file_path);

    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path,
        );
        lines.push(format!("- {} = {} (source: {source})", field.key, field.value));
    }
    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    vec![
        Field { key: "app.name", env_keys: &["GLOWIE_APP_NAME"], value: config.app.name.clone() },
        Field {
            key: "app.environment",
            env_keys: &["GLOWIE_APP_ENV"],
            value: config.app.environment.clone(),
        },
        Field {
            key: "llm.provider",
            env_keys: &["GLOWIE_LLM_PROVIDER"],
            value: config.llm.provider.as_str().to_string(),
        },
        Field {
            key: "llm.model",
            env_keys: &["GLOWIE_LLM_MODEL", "MISTRAL_MODEL"],
            value: config.llm.model.clone(),
        },
        Field {
            key: "llm.base_url",
            env_keys: &["GLOWIE_LLM_BASE_URL"],
            value: config.llm.effective_base_url().to_string(),
        },
        Field {
            key: "llm.api_key",
            env_keys: &["GLOWIE_LLM_API_KEY", "MISTRAL_API_KEY"],
            value: redact_secret(config.llm.api_key.as_ref()),
        },
        Field {
            key: "llm.timeout_secs",
            env_keys: &["GLOWIE_LLM_TIMEOUT_SECS"],
            value: config.llm.timeout_secs.to_string(),
        },
        Field {
            key: "backend.base_url",
            env_keys: &["GLOWIE_BACKEND_URL"],
            value: config.backend.base_url.clone(),
        },
        Field {
            key: "backend.api_key",
            env_keys: &["GLOWIE_BACKEND_API_KEY"],
            value: redact_secret(config.backend.api_key.as_ref()),
        },
        Field {
            key: "cache.enabled",
            env_keys: &["GLOWIE_CACHE_ENABLED"],
            value: config.cache.enabled.to_string(),
        },
        Field {
            key: "cache.ttl_secs",
            env_keys: &["GLOWIE_CACHE_TTL_SECS"],
            value: config.cache.ttl_secs.to_string(),
        },
        Field {
            key: "server.bind_address",
            env_keys: &["GLOWIE_SERVER_BIND_ADDRESS"],
            value: config.server.bind_address.clone(),
        },
        Field {
            key: "server.port",
            env_keys: &["GLOWIE_SERVER_PORT"],
            value: config.server.port.to_string(),
        },
        Field {
            key: "server.allowed_origins",
            env_keys: &["GLOWIE_SERVER_ALLOWED_ORIGINS"],
            value: config.server.allowed_origins.join(","),
        },
        Field {
            key: "logging.level",
            env_keys: &["GLOWIE_LOGGING_LEVEL", "GLOWIE_LOG_LEVEL"],
            value: config.logging.level.clone(),
        },
        Field {
            key: "logging.format",
            env_keys: &["GLOWIE_LOGGING_FORMAT", "GLOWIE_LOG_FORMAT"],
            value: config.logging.format.as_str().to_string(),
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("glowie.toml"), PathBuf::from("config/glowie.toml")]
        .into_iter()
        .find(|path| path.exists())
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
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
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

/// Keeps a short prefix so operators can tell keys apart.
fn redact_secret(secret: Option<&SecretString>) -> String {
    let Some(secret) = secret else {
        return "<unset>".to_string();
    };
    let trimmed = secret.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.split_once('-') {
        Some((prefix, _)) if prefix.len() <= 4 => format!("{prefix}-***"),
        _ => "<redacted>".to_string(),
    }
}
