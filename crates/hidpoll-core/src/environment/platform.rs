// Hidpoll Platform Detection
// Identifies the host OS family once at startup for plugin selection

use std::fmt;

use strum_macros::{Display, EnumIter, EnumString};

/// Operating system families the plugins are keyed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OsFamily {
    Linux,
    #[strum(serialize = "macos")]
    MacOs,
    Windows,
    Other,
}

/// Description of the host, handed to plugin predicates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    os: OsFamily,
    os_name: String,
}

impl Platform {
    /// Detect the platform this binary was built for
    pub fn detect() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Build a platform from an OS name as reported by `std::env::consts::OS`
    pub fn from_os_name(os_name: &str) -> Self {
        let os = os_name.parse().unwrap_or(OsFamily::Other);
        if os == OsFamily::Other {
            log::warn!("OS name {} not recognised, only portable plugins apply", os_name);
        }
        Self {
            os,
            os_name: os_name.to_string(),
        }
    }

    pub fn os(&self) -> OsFamily {
        self.os
    }

    pub fn os_name(&self) -> &str {
        &self.os_name
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.os, self.os_name)
    }
}
