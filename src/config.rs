//! Bridge Configuration
//!
//! TOML-backed configuration for the bridge: downstream presentation
//! (listen address, desktop name, backlog, initial geometry), connection
//! mode, viewer authentication, clipboard enablement and color
//! strictness. Everything has a default so an empty file is a valid
//! configuration.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// File contents were not valid TOML
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Parsed values fail validation
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What failed and why
        reason: String,
    },
}

/// How the downstream side reaches its viewers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Bind `address` and accept incoming viewer connections
    #[default]
    Listen,
    /// Make one outbound connection to a viewer listening at `address`
    Reverse,
}

/// Viewer authentication method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", tag = "method")]
pub enum AuthMethod {
    /// No authentication
    #[default]
    None,
    /// Password authentication; the secret comes from `password` or is
    /// read from `password_file`
    Password {
        /// Inline password
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
        /// Path to a file whose first line is the password
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password_file: Option<PathBuf>,
    },
    /// Offer both no-auth and password; the viewer picks
    Negotiated {
        /// Inline password
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
        /// Path to a file whose first line is the password
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password_file: Option<PathBuf>,
    },
}

/// Resolved authentication policy handed to the downstream engine.
///
/// Built from [`AuthMethod`] with any password file already read; the
/// engine performs the actual credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPolicy {
    /// Accept every viewer
    None,
    /// Require the given password
    Password(String),
    /// Offer no-auth and password side by side
    Negotiated(String),
}

fn default_address() -> String {
    "0.0.0.0:5900".to_owned()
}

fn default_desktop_name() -> String {
    "rdp2vnc".to_owned()
}

fn default_backlog() -> u32 {
    5
}

fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    600
}

fn default_clipboard() -> bool {
    true
}

/// Bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Address to bind (listen mode) or connect to (reverse mode)
    #[serde(default = "default_address")]
    pub address: String,

    /// Connection mode
    #[serde(default)]
    pub mode: Mode,

    /// Desktop name presented to viewers
    #[serde(default = "default_desktop_name")]
    pub desktop_name: String,

    /// Listen backlog (listen mode only)
    #[serde(default = "default_backlog")]
    pub backlog: u32,

    /// Framebuffer width before the upstream session reports its own
    #[serde(default = "default_width")]
    pub initial_width: u32,

    /// Framebuffer height before the upstream session reports its own
    #[serde(default = "default_height")]
    pub initial_height: u32,

    /// Viewer authentication
    #[serde(default)]
    pub auth: AuthMethod,

    /// Forward viewer cut text to the upstream clipboard
    #[serde(default = "default_clipboard")]
    pub clipboard: bool,

    /// Fail scalar reads whose indexed round-trip is lossy instead of
    /// tolerating them with a warning
    #[serde(default)]
    pub color_strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: default_address(),
            mode: Mode::default(),
            desktop_name: default_desktop_name(),
            backlog: default_backlog(),
            initial_width: default_width(),
            initial_height: default_height(),
            auth: AuthMethod::default(),
            clipboard: default_clipboard(),
            color_strict: false,
        }
    }
}

impl Config {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "loading config");
        let raw = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// The built-in defaults, as a starting point for callers without a
    /// config file
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !valid_host_port(&self.address) {
            return Err(ConfigError::Invalid {
                reason: format!("address '{}' is not host:port", self.address),
            });
        }
        if self.initial_width == 0 || self.initial_height == 0 {
            return Err(ConfigError::Invalid {
                reason: "initial size must be at least 1x1".to_owned(),
            });
        }
        if self.desktop_name.is_empty() {
            return Err(ConfigError::Invalid {
                reason: "desktop name must not be empty".to_owned(),
            });
        }
        match &self.auth {
            AuthMethod::Password {
                password,
                password_file,
            }
            | AuthMethod::Negotiated {
                password,
                password_file,
            } => {
                if password.is_none() && password_file.is_none() {
                    return Err(ConfigError::Invalid {
                        reason: "password auth requires 'password' or 'password_file'".to_owned(),
                    });
                }
                if password.is_some() && password_file.is_some() {
                    return Err(ConfigError::Invalid {
                        reason: "'password' and 'password_file' are mutually exclusive".to_owned(),
                    });
                }
            }
            AuthMethod::None => {}
        }
        Ok(())
    }

    /// Apply command-line style overrides on top of this configuration
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(address) = overrides.address {
            self.address = address;
        }
        if let Some(mode) = overrides.mode {
            self.mode = mode;
        }
        if let Some(desktop_name) = overrides.desktop_name {
            self.desktop_name = desktop_name;
        }
        if let Some(clipboard) = overrides.clipboard {
            self.clipboard = clipboard;
        }
        self
    }

    /// Resolve the authentication method into a policy, reading the
    /// password file if one is configured
    pub fn auth_policy(&self) -> Result<AuthPolicy, ConfigError> {
        let resolve = |password: &Option<String>,
                       password_file: &Option<PathBuf>|
         -> Result<String, ConfigError> {
            if let Some(password) = password {
                return Ok(password.clone());
            }
            let path = password_file.as_ref().ok_or_else(|| ConfigError::Invalid {
                reason: "password auth requires 'password' or 'password_file'".to_owned(),
            })?;
            let raw = fs::read_to_string(path)?;
            Ok(raw.lines().next().unwrap_or_default().to_owned())
        };

        match &self.auth {
            AuthMethod::None => Ok(AuthPolicy::None),
            AuthMethod::Password {
                password,
                password_file,
            } => Ok(AuthPolicy::Password(resolve(password, password_file)?)),
            AuthMethod::Negotiated {
                password,
                password_file,
            } => Ok(AuthPolicy::Negotiated(resolve(password, password_file)?)),
        }
    }
}

/// Accepts a literal socket address or `hostname:port`; name resolution
/// is left to the engines at connect/bind time
fn valid_host_port(addr: &str) -> bool {
    if addr.parse::<SocketAddr>().is_ok() {
        return true;
    }
    match addr.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}

/// Optional per-field overrides applied after loading
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Replacement address
    pub address: Option<String>,
    /// Replacement mode
    pub mode: Option<Mode>,
    /// Replacement desktop name
    pub desktop_name: Option<String>,
    /// Replacement clipboard enablement
    pub clipboard: Option<bool>,
}
