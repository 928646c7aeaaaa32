//! Environment variable interpolation for configuration

use super::error::ConfigError;
use regex::Regex;
use std::env;
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

/// Replace every `${VAR}` reference with the variable's value.
///
/// Fails on the first variable that is not set.
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(content.len());
    let mut cursor = 0;

    for cap in ENV_VAR_PATTERN.captures_iter(content) {
        let Some(full_match) = cap.get(0) else {
            continue;
        };
        let var_name = &cap[1];
        let value = env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound {
            var: var_name.to_string(),
        })?;

        result.push_str(&content[cursor..full_match.start()]);
        result.push_str(&value);
        cursor = full_match.end();
    }
    result.push_str(&content[cursor..]);

    Ok(result)
}

/// Names of all variables referenced in `content`
pub fn referenced_env_vars(content: &str) -> Vec<String> {
    ENV_VAR_PATTERN
        .captures_iter(content)
        .map(|cap| cap[1].to_string())
        .collect()
}
