pub mod schema;
pub mod watcher;

use crate::error::{CastError, Result};
use crate::input::BUILTIN_COMMANDS;
use schema::AppConfig;
use std::path::Path;

/// Load and parse configuration from a TOML file.
///
/// # Errors
/// Returns `CastError::ConfigNotFound` if the file doesn't exist,
/// `CastError::Io` on read errors, `CastError::TomlParse` on syntax errors,
/// or `CastError::Config` on validation failures.
pub fn load(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Err(CastError::ConfigNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

/// Parse configuration text, expanding environment variables first.
///
/// # Errors
/// Returns `CastError::TomlParse` or `CastError::Config`.
pub fn parse(content: &str) -> Result<AppConfig> {
    let content = expand_env_vars(content);
    let config: AppConfig = toml::from_str(&content)?;

    validate(&config)?;
    Ok(config)
}

/// Expand `${VAR}` and `$VAR` patterns in the config string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }

        if chars.peek() == Some(&'{') {
            chars.next();
            let var_name: String = chars.by_ref().take_while(|&c| c != '}').collect();
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    use std::fmt::Write;
                    let _ = write!(result, "${{{var_name}}}");
                }
            }
            continue;
        }

        let mut var_name = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                var_name.push(c);
                chars.next();
            } else {
                break;
            }
        }

        if var_name.is_empty() {
            result.push('$');
        } else if let Ok(val) = std::env::var(&var_name) {
            result.push_str(&val);
        } else {
            result.push('$');
            result.push_str(&var_name);
        }
    }

    result
}

/// Validate config constraints.
fn validate(config: &AppConfig) -> Result<()> {
    if config.daemon.poll_interval_ms == 0 {
        return Err(CastError::Config(
            "poll_interval_ms must be greater than 0".to_string(),
        ));
    }

    if config.daemon.request_timeout_ms == 0 {
        return Err(CastError::Config(
            "request_timeout_ms must be greater than 0".to_string(),
        ));
    }

    let host = config.cablecast.host.trim();
    if !host.is_empty() && !(host.starts_with("http://") || host.starts_with("https://")) {
        return Err(CastError::Config(format!(
            "host '{host}' must start with http:// or https://"
        )));
    }

    for name in config.bindings.keys() {
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(CastError::Config(format!(
                "binding name '{name}' must be a single word"
            )));
        }
        if BUILTIN_COMMANDS.contains(&name.as_str()) {
            return Err(CastError::Config(format!(
                "binding '{name}' shadows a built-in command"
            )));
        }
    }

    Ok(())
}
