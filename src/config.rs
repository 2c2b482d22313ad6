use anyhow::{Context, Result};
use std::{env, path::PathBuf, str::FromStr, time::Duration};

/// Application configuration loaded at startup and passed down explicitly
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    /// Card bridge connection
    pub device: DeviceConfig,

    /// Network join polling
    pub join: JoinConfig,

    /// Diagnostic output
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeviceConfig {
    pub socket_path: PathBuf,
}

#[derive(Clone, Debug, PartialEq)]
pub struct JoinConfig {
    pub max_polls: u32,
    pub poll_interval: Duration,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DiagnosticsConfig {
    pub verbosity: Verbosity,
}

/// Diagnostic level, `1` unless changed with `-d` or `EYEFI_DEBUG_LEVEL`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Verbosity(pub u8);

impl Verbosity {
    pub const QUIET: Verbosity = Verbosity(0);
    pub const NORMAL: Verbosity = Verbosity(1);

    pub fn shows_progress(&self) -> bool {
        *self >= Self::NORMAL
    }

    /// Default `log` filter for this level, overridden by `RUST_LOG`
    pub fn log_filter(&self) -> &'static str {
        match self.0 {
            0 | 1 => "warn",
            2 => "debug",
            _ => "trace",
        }
    }
}

impl Default for Verbosity {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl AppConfig {
    pub const DEFAULT_SOCKET_PATH: &str = "/run/eyefi/card.sock";
    pub const DEFAULT_MAX_POLLS: u32 = 200;
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

    /// Load configuration from environment variables
    pub fn load() -> Result<Self> {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let device = DeviceConfig {
            socket_path: lookup("EYEFI_SOCKET_PATH")
                .unwrap_or_else(|| Self::DEFAULT_SOCKET_PATH.to_string())
                .into(),
        };

        let join = JoinConfig {
            max_polls: parse_or(&lookup, "EYEFI_MAX_POLLS", Self::DEFAULT_MAX_POLLS)?,
            poll_interval: Duration::from_millis(parse_or(
                &lookup,
                "EYEFI_POLL_INTERVAL_MS",
                Self::DEFAULT_POLL_INTERVAL_MS,
            )?),
        };

        let diagnostics = DiagnosticsConfig {
            verbosity: Verbosity(parse_or(
                &lookup,
                "EYEFI_DEBUG_LEVEL",
                Verbosity::default().0,
            )?),
        };

        Ok(Self {
            device,
            join,
            diagnostics,
        })
    }

    pub fn with_verbosity(mut self, verbosity: Option<u8>) -> Self {
        if let Some(level) = verbosity {
            self.diagnostics.verbosity = Verbosity(level);
        }
        self
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .context(format!("failed to parse {key}: invalid format")),
        None => Ok(default),
    }
}
