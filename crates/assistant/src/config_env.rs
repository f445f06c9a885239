use std::env;

use crate::config::ConfigError;

/// Reads one variable; the process environment in production, a map in tests.
pub(crate) type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

pub(crate) fn process_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

pub(crate) fn parse_u64_env(
    lookup: EnvLookup<'_>,
    key: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match optional_trimmed_env(lookup, key) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| ConfigError::ParseNumber(key.to_string())),
        None => Ok(default),
    }
}

pub(crate) fn parse_optional_f64_env(
    lookup: EnvLookup<'_>,
    key: &str,
) -> Result<Option<f64>, ConfigError> {
    optional_trimmed_env(lookup, key)
        .map(|raw| {
            raw.parse::<f64>()
                .map_err(|_| ConfigError::ParseNumber(key.to_string()))
        })
        .transpose()
}

pub(crate) fn parse_bool_env(
    lookup: EnvLookup<'_>,
    key: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match optional_trimmed_env(lookup, key) {
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool(key.to_string())),
        },
        None => Ok(default),
    }
}

pub(crate) fn optional_trimmed_env(lookup: EnvLookup<'_>, key: &str) -> Option<String> {
    lookup(key).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
pub(crate) fn map_lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
    let vars: std::collections::HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

#[cfg(test)]
mod tests {
    use super::{map_lookup, optional_trimmed_env, parse_bool_env, parse_u64_env};
    use crate::config::ConfigError;

    #[test]
    fn blank_values_count_as_unset() {
        let lookup = map_lookup(&[("BLANK", "   "), ("PADDED", "  value ")]);
        assert_eq!(optional_trimmed_env(&lookup, "BLANK"), None);
        assert_eq!(optional_trimmed_env(&lookup, "MISSING"), None);
        assert_eq!(
            optional_trimmed_env(&lookup, "PADDED").as_deref(),
            Some("value")
        );
        assert!(matches!(parse_u64_env(&lookup, "BLANK", 7), Ok(7)));
    }

    #[test]
    fn bool_grammar_accepts_common_spellings() {
        let lookup = map_lookup(&[
            ("A", "yes"),
            ("B", "OFF"),
            ("C", "1"),
            ("D", "false"),
            ("E", "maybe"),
        ]);
        assert!(matches!(parse_bool_env(&lookup, "A", false), Ok(true)));
        assert!(matches!(parse_bool_env(&lookup, "B", true), Ok(false)));
        assert!(matches!(parse_bool_env(&lookup, "C", false), Ok(true)));
        assert!(matches!(parse_bool_env(&lookup, "D", true), Ok(false)));
        assert!(matches!(parse_bool_env(&lookup, "MISSING", true), Ok(true)));
        assert!(matches!(
            parse_bool_env(&lookup, "E", false),
            Err(ConfigError::ParseBool(key)) if key == "E"
        ));
    }
}
