//! # gqlws-settings
//!
//! Configuration for the gqlws server, loaded from three layers (in
//! priority order):
//! 1. **Compiled defaults**: [`GqlWsSettings::default()`]
//! 2. **Settings file**: `~/.gqlws/settings.json`, deep-merged over defaults
//! 3. **Environment variables**: `GQLWS_*` overrides (highest priority)
//!
//! ```no_run
//! let settings = gqlws_settings::load_settings_from_path(&gqlws_settings::settings_path())?;
//! println!("GraphQL WebSocket path: {}", settings.graphql_ws.path);
//! # Ok::<(), gqlws_settings::SettingsError>(())
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings_from_path, settings_path};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_path_is_under_home_dir() {
        assert!(settings_path().ends_with(".gqlws/settings.json"));
    }

    #[test]
    fn default_settings_are_valid() {
        let settings = GqlWsSettings::default();
        assert!(settings.validate().is_ok());
        assert!(settings.graphql_ws.enabled);
        assert!(settings.graphql_ws.keep_alive_enabled);
        assert_eq!(settings.graphql_ws.path, "/graphql-ws");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.logging.level, "info");
    }
}
