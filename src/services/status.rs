//! Classification of card connection-test status codes.

use crate::card_client::StatusCode;
use std::fmt;

/// Named connection-test state resolved from a [`StatusCode`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionTestState {
    Success,
    NotScanning,
    Unknown,
    /// Any state that is still progressing towards a result
    Other(String),
}

impl ConnectionTestState {
    pub fn other(name: impl Into<String>) -> Self {
        Self::Other(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Success => "success",
            Self::NotScanning => "not scanning",
            Self::Unknown => "unknown",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for ConnectionTestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pure, total lookup from status code to connection-test state
pub trait StatusResolver {
    fn resolve(&self, code: StatusCode) -> ConnectionTestState;
}

impl<F> StatusResolver for F
where
    F: Fn(StatusCode) -> ConnectionTestState,
{
    fn resolve(&self, code: StatusCode) -> ConnectionTestState {
        self(code)
    }
}

/// Connection-test table of the card firmware
#[derive(Clone, Copy, Debug, Default)]
pub struct CardStatusResolver;

impl CardStatusResolver {
    const STATES: [&str; 6] = [
        "not scanning",
        "locating network",
        "verifying network key",
        "waiting for DHCP",
        "testing connection to Eye-Fi server",
        "success",
    ];
}

impl StatusResolver for CardStatusResolver {
    fn resolve(&self, code: StatusCode) -> ConnectionTestState {
        match code {
            0 => ConnectionTestState::NotScanning,
            5 => ConnectionTestState::Success,
            1..=4 => ConnectionTestState::other(Self::STATES[usize::from(code)]),
            _ => ConnectionTestState::Unknown,
        }
    }
}
