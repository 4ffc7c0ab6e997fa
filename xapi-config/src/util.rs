use crate::loader::error::ConfigLoadError;

/// Split a comma-separated value into trimmed, non-empty entries.
pub fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|part| {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

/// Parse a boolean value from a raw string, accepting common env-style forms.
///
/// Accepted truthy values (case-insensitive): `"1"`, `"true"`, `"yes"`, `"on"`.
/// Accepted falsy values: `"0"`, `"false"`, `"no"`, `"off"`.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn parse_bool_var(
    name: &'static str,
) -> Result<Option<bool>, ConfigLoadError> {
    non_empty_var(name)
        .map(|raw| {
            parse_bool(&raw)
                .ok_or(ConfigLoadError::InvalidVar { name, value: raw })
        })
        .transpose()
}

/// Read a variable, treating blank values the same as unset ones.
pub fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn parse_var<T: std::str::FromStr>(
    name: &'static str,
) -> Result<Option<T>, ConfigLoadError> {
    parse_value(name, non_empty_var(name))
}

/// Parse an already-read value; a present but malformed value is an error
/// rather than a silent fallback to the default.
pub fn parse_value<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
) -> Result<Option<T>, ConfigLoadError> {
    raw.map(|raw| {
        raw.parse()
            .map_err(|_| ConfigLoadError::InvalidVar { name, value: raw })
    })
    .transpose()
}
