//! # dropfour-settings
//!
//! Configuration with layered sources.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`Settings::default()`]
//! 2. **File**: `dropfour.json` in the working directory, or an explicit path
//! 3. **Environment**: `DROPFOUR_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{ENV_PREFIX, figment, load_settings, load_settings_from_path, settings_path, validate};
pub use types::{LogFormat, LoggingSettings, ServerSettings, Settings};
