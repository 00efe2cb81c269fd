/// Environment variable helpers for resolving the node URI list.
///
/// These are purely helpers; the core sink types remain decoupled from
/// environment access and only see an already-resolved URI string.

/// Default environment variable consulted by [`connection_string`] when a
/// configuration names no variable of its own.
pub const ELASTIC_URI_ENV: &str = "ELASTIC_LOG_SINK_URI";

/// Look up a named connection string in the environment.
///
/// Returns `None` when the variable is unset or empty, so callers can fall
/// back to the configured `uri`.
pub fn connection_string(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
