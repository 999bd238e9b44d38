// ABOUTME: Environment variable name validation.
// ABOUTME: Keys double as Dockerfile ARG names, so they follow POSIX shell rules.

use std::collections::BTreeMap;

use super::ValidationError;

/// Check that `key` is usable as both an env var and a build arg.
pub fn validate_env_key(key: &str) -> Result<(), ValidationError> {
    let mut chars = key.chars();
    let Some(first) = chars.next() else {
        return Err(ValidationError::EmptyEnvKey);
    };

    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(ValidationError::InvalidEnvKey(key.to_string()));
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::InvalidEnvKey(key.to_string()));
    }

    Ok(())
}

/// Validate every key of an environment map.
pub fn validate_env(env: &BTreeMap<String, String>) -> Result<(), ValidationError> {
    env.keys().try_for_each(|k| validate_env_key(k))
}

/// Parse a `KEY=VALUE` pair as given on the command line.
pub fn parse_env_pair(pair: &str) -> Result<(String, String), ValidationError> {
    let (key, value) = pair
        .split_once('=')
        .ok_or_else(|| ValidationError::InvalidEnvKey(pair.to_string()))?;
    validate_env_key(key)?;
    Ok((key.to_string(), value.to_string()))
}
