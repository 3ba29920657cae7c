//! Build environment and the per-entry environment metadata.

use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Whether the process runs as a development or production build.
///
/// Development builds mirror every entry to the console sink and may
/// capture `ERROR` tracing events into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local or debug build
    Development,
    /// Release build
    Production,
}

impl Environment {
    /// Environment implied by the compilation profile.
    #[must_use]
    pub const fn from_build() -> Self {
        if cfg!(debug_assertions) {
            Self::Development
        } else {
            Self::Production
        }
    }

    /// Returns true for development builds.
    #[must_use]
    pub const fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::from_build()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Environment metadata stamped on every entry.
///
/// The agent string is fixed at construction. The location is maintained by
/// the consumer (the current route or URL) and read at log time.
#[derive(Debug)]
pub struct EnvironmentInfo {
    user_agent: String,
    location: RwLock<Option<String>>,
}

impl EnvironmentInfo {
    /// Creates metadata for an application name and version.
    #[must_use]
    pub fn new(app_name: &str, version: &str) -> Self {
        Self {
            user_agent: format!(
                "{app_name}/{version} ({}; {})",
                std::env::consts::OS,
                std::env::consts::ARCH
            ),
            location: RwLock::new(default_location()),
        }
    }

    /// Returns the agent string.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Returns the current location.
    #[must_use]
    pub fn location(&self) -> Option<String> {
        self.location.read().clone()
    }

    /// Replaces the current location.
    pub fn set_location(&self, location: Option<String>) {
        *self.location.write() = location;
    }
}

fn default_location() -> Option<String> {
    std::env::current_dir()
        .ok()
        .map(|dir| dir.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_matches_build_profile() {
        assert_eq!(
            Environment::from_build().is_development(),
            cfg!(debug_assertions)
        );
    }

    #[test]
    fn environment_serialization() {
        let json = serde_json::to_string(&Environment::Production).expect("serialize");
        assert_eq!(json, "\"production\"");
        assert_eq!(Environment::Development.to_string(), "development");
    }

    #[test]
    fn user_agent_includes_platform() {
        let info = EnvironmentInfo::new("console", "1.2.3");
        assert!(info.user_agent().starts_with("console/1.2.3 ("));
        assert!(info.user_agent().contains(std::env::consts::OS));
    }

    #[test]
    fn location_can_be_replaced() {
        let info = EnvironmentInfo::new("console", "1.0.0");
        info.set_location(Some("/dashboard".to_string()));
        assert_eq!(info.location().as_deref(), Some("/dashboard"));

        info.set_location(None);
        assert!(info.location().is_none());
    }
}
