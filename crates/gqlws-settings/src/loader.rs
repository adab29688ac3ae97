//! Settings file loading and `GQLWS_*` environment overrides.
//!
//! The file only needs the keys it changes: it is merged key by key over the
//! serialized defaults, and `null` leaves a default in place.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::GqlWsSettings;

/// Default settings file, `~/.gqlws/settings.json`.
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".gqlws").join("settings.json")
}

/// Load settings from `path`, apply environment overrides, and validate.
///
/// A missing file yields defaults.
pub fn load_settings_from_path(path: &Path) -> Result<GqlWsSettings> {
    let parse_error = |source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    };

    let mut settings = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: Value = serde_json::from_str(&content).map_err(parse_error)?;
        let defaults = serde_json::to_value(GqlWsSettings::default()).map_err(parse_error)?;
        serde_json::from_value(merge(defaults, file)).map_err(parse_error)?
    } else {
        debug!(?path, "settings file not found, using defaults");
        GqlWsSettings::default()
    };

    apply_overrides(&mut settings, |name| std::env::var(name).ok());
    settings.validate()?;
    Ok(settings)
}

fn merge(base: Value, file: Value) -> Value {
    match (base, file) {
        (Value::Object(mut base), Value::Object(file)) => {
            for (key, value) in file {
                if value.is_null() {
                    continue;
                }
                let merged = match base.remove(&key) {
                    Some(existing) => merge(existing, value),
                    None => value,
                };
                let _ = base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, file) => file,
    }
}

/// Apply `GQLWS_*` overrides read through `lookup`.
///
/// Unparseable values are ignored with a warning; range checks are left to
/// [`GqlWsSettings::validate`].
fn apply_overrides(settings: &mut GqlWsSettings, lookup: impl Fn(&str) -> Option<String>) {
    let server = &mut settings.server;
    override_with(&mut server.host, "GQLWS_HOST", &lookup, parse);
    override_with(&mut server.port, "GQLWS_PORT", &lookup, parse);
    override_with(&mut server.outbound_buffer, "GQLWS_OUTBOUND_BUFFER", &lookup, parse);

    let endpoint = &mut settings.graphql_ws;
    override_with(&mut endpoint.enabled, "GQLWS_ENABLED", &lookup, parse_flag);
    override_with(&mut endpoint.path, "GQLWS_PATH", &lookup, parse);
    override_with(&mut endpoint.keep_alive_enabled, "GQLWS_KEEP_ALIVE", &lookup, parse_flag);

    let logging = &mut settings.logging;
    override_with(&mut logging.level, "GQLWS_LOG_LEVEL", &lookup, parse);
    override_with(&mut logging.json, "GQLWS_LOG_JSON", &lookup, parse_flag);
}

fn override_with<T>(
    target: &mut T,
    name: &str,
    lookup: &impl Fn(&str) -> Option<String>,
    parse: fn(&str) -> Option<T>,
) {
    let Some(raw) = lookup(name).filter(|raw| !raw.is_empty()) else {
        return;
    };
    match parse(&raw) {
        Some(value) => *target = value,
        None => warn!(key = name, value = %raw, "invalid env override, ignoring"),
    }
}

fn parse<T: FromStr>(raw: &str) -> Option<T> {
    raw.trim().parse().ok()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use serde_json::json;

    fn overrides(pairs: &[(&str, &str)]) -> GqlWsSettings {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let mut settings = GqlWsSettings::default();
        apply_overrides(&mut settings, |name| env.get(name).cloned());
        settings
    }

    fn write_settings(body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, body).unwrap();
        (dir, path)
    }

    #[test]
    fn merge_keeps_unmentioned_keys_and_skips_null() {
        let merged = merge(
            json!({"server": {"port": 8080, "host": "127.0.0.1"}, "logging": {"json": false}}),
            json!({"server": {"port": 9090, "host": null}}),
        );
        assert_eq!(
            merged,
            json!({"server": {"port": 9090, "host": "127.0.0.1"}, "logging": {"json": false}})
        );
    }

    #[test]
    fn missing_file_yields_defaults() {
        let settings = load_settings_from_path(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings.graphql_ws, GqlWsSettings::default().graphql_ws);
    }

    #[test]
    fn partial_file_overrides_defaults() {
        let (_dir, path) = write_settings(
            r#"{"graphqlWs": {"path": "/subscriptions", "keepAliveEnabled": false}, "server": {"port": 9090}}"#,
        );

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.graphql_ws.path, "/subscriptions");
        assert!(!settings.graphql_ws.keep_alive_enabled);
        assert!(settings.graphql_ws.enabled);
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.server.host, "127.0.0.1");
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let (_dir, path) = write_settings("not valid json");
        let err = load_settings_from_path(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Parse { path: p, .. } if p == path));
    }

    #[test]
    fn wrong_value_type_is_parse_error() {
        let (_dir, path) = write_settings(r#"{"server": {"port": "eighty"}}"#);
        assert!(matches!(
            load_settings_from_path(&path),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn out_of_range_value_is_invalid() {
        let (_dir, path) = write_settings(r#"{"graphqlWs": {"path": "no-slash"}}"#);
        assert!(matches!(
            load_settings_from_path(&path),
            Err(SettingsError::Invalid { field: "graphqlWs.path", .. })
        ));
    }

    #[test]
    fn env_overrides_every_setting() {
        let settings = overrides(&[
            ("GQLWS_HOST", "0.0.0.0"),
            ("GQLWS_PORT", "9000"),
            ("GQLWS_OUTBOUND_BUFFER", "8"),
            ("GQLWS_ENABLED", "off"),
            ("GQLWS_PATH", "/ws"),
            ("GQLWS_KEEP_ALIVE", "FALSE"),
            ("GQLWS_LOG_LEVEL", "debug"),
            ("GQLWS_LOG_JSON", "1"),
        ]);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.outbound_buffer, 8);
        assert!(!settings.graphql_ws.enabled);
        assert_eq!(settings.graphql_ws.path, "/ws");
        assert!(!settings.graphql_ws.keep_alive_enabled);
        assert_eq!(settings.logging.level, "debug");
        assert!(settings.logging.json);
    }

    #[test]
    fn unparseable_env_values_are_ignored() {
        let settings = overrides(&[
            ("GQLWS_PORT", "99999"),
            ("GQLWS_KEEP_ALIVE", "maybe"),
            ("GQLWS_HOST", ""),
        ]);
        assert_eq!(settings, GqlWsSettings::default());
    }
}
