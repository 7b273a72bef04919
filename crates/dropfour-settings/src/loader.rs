//! Layered settings loading.
//!
//! Loading flow (later layers win):
//! 1. Compiled [`Settings::default()`]
//! 2. JSON file, if it exists
//! 3. `DROPFOUR_*` environment variables, nested with `__`
//!    (`DROPFOUR_SERVER__PORT=9000` sets `server.port`)
//!
//! CLI flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized};
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::Settings;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "DROPFOUR_";

/// Default settings file, relative to the working directory.
pub fn settings_path() -> PathBuf {
    PathBuf::from("dropfour.json")
}

/// Load settings from the default path.
pub fn load_settings() -> Result<Settings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from `path` with environment overrides, then validate.
///
/// A missing file is not an error; a file with invalid JSON is.
pub fn load_settings_from_path(path: &Path) -> Result<Settings> {
    if path.exists() {
        debug!(?path, "loading settings from file");
    } else {
        debug!(?path, "settings file not found, using defaults");
    }
    let settings: Settings = figment(path).extract()?;
    validate(&settings)?;
    Ok(settings)
}

/// The provider stack, exposed so callers can merge further layers.
pub fn figment(path: &Path) -> Figment {
    Figment::from(Serialized::defaults(Settings::default()))
        .merge(Json::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Reject values that would panic or misbehave at runtime.
pub fn validate(settings: &Settings) -> Result<()> {
    let server = &settings.server;
    if server.max_send_queue == 0 {
        return Err(SettingsError::InvalidValue(
            "server.max_send_queue must be greater than 0".into(),
        ));
    }
    if server.heartbeat_interval_secs == 0 {
        return Err(SettingsError::InvalidValue(
            "server.heartbeat_interval_secs must be greater than 0".into(),
        ));
    }
    if server.heartbeat_timeout_secs <= server.heartbeat_interval_secs {
        return Err(SettingsError::InvalidValue(format!(
            "server.heartbeat_timeout_secs ({}) must exceed heartbeat_interval_secs ({})",
            server.heartbeat_timeout_secs, server.heartbeat_interval_secs
        )));
    }
    Ok(())
}
