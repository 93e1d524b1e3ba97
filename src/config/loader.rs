//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML file without validating it.
pub fn read_config_file(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Overlay environment variables on `config`.
///
/// `lookup` abstracts the environment so callers can inject values. Empty
/// values count as unset, and the first non-empty name in each alias list
/// wins. Values that cannot be applied are returned and leave `config`
/// untouched.
pub fn apply_env<F>(config: &mut ProxyConfig, lookup: F) -> Vec<ValidationError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut errors = Vec::new();
    let first = |names: &[&str]| {
        names
            .iter()
            .filter_map(|name| lookup(*name))
            .find(|value| !value.is_empty())
    };

    if let Some(host) = first(&["HOST"]) {
        config.listener.bind_host = host;
    }
    if let Some(port) = first(&["PORT"]) {
        match port.parse() {
            Ok(port) => config.listener.port = port,
            Err(_) => errors.push(ValidationError::InvalidEnv {
                name: "PORT",
                value: port,
            }),
        }
    }
    if let Some(secret) = first(&["PROXY_SECRET", "proxy_secret"]) {
        config.auth.secret = Some(secret);
    }
    if let Some(cert) = first(&["MTLS_CERTIFICATE", "C6_CERTIFICATE"]) {
        config.mtls.certificate = Some(cert);
    }
    if let Some(key) = first(&["MTLS_PRIVATE_KEY", "C6_PRIVATE_KEY"]) {
        config.mtls.private_key = Some(key);
    }
    if let Some(label) = first(&["MTLS_KEY_LABEL"]) {
        config.mtls.key_label = label;
    }
    if let Some(path) = first(&["MTLS_CA_BUNDLE"]) {
        config.mtls.ca_bundle_path = Some(path.into());
    }

    errors
}

/// Drop empty strings that a config file may carry for optional values.
fn clear_empty(config: &mut ProxyConfig) {
    for value in [
        &mut config.auth.secret,
        &mut config.mtls.certificate,
        &mut config.mtls.private_key,
    ] {
        if value.as_deref().is_some_and(str::is_empty) {
            *value = None;
        }
    }
}

/// Build the effective configuration.
///
/// Precedence, lowest first: defaults, the optional TOML file, process
/// environment. The result is validated; unusable environment values are
/// reported alongside the semantic errors.
pub fn load_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    load_config_with(path, |name| std::env::var(name).ok())
}

/// [`load_config`] with an injectable environment.
pub fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<ProxyConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => ProxyConfig::default(),
    };

    let mut errors = apply_env(&mut config, lookup);
    clear_empty(&mut config);

    if let Err(semantic) = validate_config(&config) {
        errors.extend(semantic);
    }
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors));
    }

    Ok(config)
}
