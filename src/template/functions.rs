//! Extension functions available inside templates.

use std::sync::Arc;

use minijinja::{Error, ErrorKind, Value};

/// Looks up a process environment variable by name.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Returns a lookup backed by the real process environment.
#[must_use]
pub fn process_env() -> EnvLookup {
    Arc::new(|name| std::env::var(name).ok())
}

/// Builds the `requiredEnv` function over the given lookup.
///
/// An unset or empty variable is an error, which aborts rendering.
pub fn required_env(
    lookup: EnvLookup,
) -> impl Fn(String) -> Result<String, Error> + Send + Sync + 'static {
    move |name: String| match lookup(&name) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("required env var `{name}` is not set"),
        )),
    }
}

/// Serializes any template value as YAML, without the trailing newline.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
pub fn to_yaml(value: Value) -> Result<String, Error> {
    let text = serde_yaml::to_string(&value).map_err(|e| {
        Error::new(ErrorKind::InvalidOperation, format!("toYaml failed: {e}"))
    })?;
    Ok(text.strip_suffix('\n').unwrap_or(&text).to_string())
}
