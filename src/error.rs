//! Unified error type for the bridge firmware.
//!
//! Every port error converts into [`Error`] so startup code can use `?`
//! uniformly.  All variants are `Copy`.

use core::fmt;

use crate::app::ports::{DiscoveryError, ListenerError, RadioError, SerialError, StoreError};
use crate::app::settings::SettingsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    Store(StoreError),
    Settings(SettingsError),
    Radio(RadioError),
    Discovery(DiscoveryError),
    Serial(SerialError),
    Listener(ListenerError),
}

pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "store: {e}"),
            Self::Settings(e) => write!(f, "settings: {e}"),
            Self::Radio(e) => write!(f, "radio: {e}"),
            Self::Discovery(e) => write!(f, "discovery: {e}"),
            Self::Serial(e) => write!(f, "serial: {e}"),
            Self::Listener(e) => write!(f, "listener: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<SettingsError> for Error {
    fn from(e: SettingsError) -> Self {
        Self::Settings(e)
    }
}

impl From<RadioError> for Error {
    fn from(e: RadioError) -> Self {
        Self::Radio(e)
    }
}

impl From<DiscoveryError> for Error {
    fn from(e: DiscoveryError) -> Self {
        Self::Discovery(e)
    }
}

impl From<SerialError> for Error {
    fn from(e: SerialError) -> Self {
        Self::Serial(e)
    }
}

impl From<ListenerError> for Error {
    fn from(e: ListenerError) -> Self {
        Self::Listener(e)
    }
}
