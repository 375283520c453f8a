//! Rule configuration, optionally read from `ecrule.toml`.
//!
//! ```toml
//! flavor = "mock"
//! revert_on_teardown = true
//! resource_roots = ["tests/resources"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "ecrule.toml";

/// Environment variable overriding the configuration file path.
pub const CONFIG_ENV: &str = "ECRULE_CONFIG";

/// Which object store backs the rule's editing context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextFlavor {
    /// A private in-memory SQLite database per context.
    #[default]
    Temporary,
    /// A plain in-process map; nothing touches a database.
    Mock,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub flavor: ContextFlavor,
    /// Revert pending changes during `after()` before disposing. Off by
    /// default: disposal discards pending changes anyway.
    pub revert_on_teardown: bool,
    /// Searched after the roots of the locator the rule is built with.
    pub resource_roots: Vec<PathBuf>,
}

impl RuleConfig {
    /// Loads from `$ECRULE_CONFIG`, or `ecrule.toml` in the working directory.
    pub fn load() -> Self {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
        Self::load_from(&path)
    }

    /// Loads from an explicit path. A missing file yields the defaults; an
    /// unreadable or malformed one yields the defaults with a warning.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("No rule config at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml(&contents) {
                Ok(config) => {
                    info!("Loaded rule config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse rule config {:?}: {}. Using defaults.", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read rule config {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    #[must_use]
    pub fn with_flavor(mut self, flavor: ContextFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    #[must_use]
    pub fn with_revert_on_teardown(mut self, revert: bool) -> Self {
        self.revert_on_teardown = revert;
        self
    }

    #[must_use]
    pub fn with_resource_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.resource_roots.push(root.into());
        self
    }
}
