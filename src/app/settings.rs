//! Configuration manager.
//!
//! [`SettingsManager`] owns the process-wide [`SettingsRecord`] and moves it
//! to and from a [`RecordStorePort`] at address 0.  It is created once at
//! startup with compiled-in defaults and lives for the rest of the process;
//! callers share it by reference (or behind a mutex when the HTTP server
//! task needs it too).

use core::fmt;

use log::{debug, info, warn};

use crate::config::{RECORD_SIZE, SettingsRecord};

use super::events::AppEvent;
use super::ports::{EventSink, RecordStorePort, StoreError};

/// Errors from [`SettingsManager::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsError {
    /// The store is smaller than the record or rejected an address.
    OutOfRange,
    /// Bytes were staged but the store could not make them durable.
    /// The in-memory record is still the one the caller asked to save.
    CommitFailed,
    /// Reading back a stored byte failed.
    Io,
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange => write!(f, "record does not fit the store"),
            Self::CommitFailed => write!(f, "failed to commit settings"),
            Self::Io => write!(f, "store I/O error"),
        }
    }
}

impl From<StoreError> for SettingsError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OutOfRange { .. } => Self::OutOfRange,
            StoreError::CommitFailed => Self::CommitFailed,
            StoreError::IoError => Self::Io,
        }
    }
}

/// Outcome of a successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveReport {
    /// Bytes that differed from the stored copy and were rewritten.
    pub bytes_written: usize,
}

pub struct SettingsManager<S: RecordStorePort> {
    store: S,
    record: SettingsRecord,
}

impl<S: RecordStorePort> SettingsManager<S> {
    /// Wrap a store.  The in-memory record starts at compiled-in defaults;
    /// nothing is read until [`load`](Self::load).
    pub fn new(store: S) -> Self {
        Self {
            store,
            record: SettingsRecord::defaults(),
        }
    }

    pub fn record(&self) -> &SettingsRecord {
        &self.record
    }

    /// Mutable access for field setters.  Changes reach the store only via
    /// [`save`](Self::save).
    pub fn record_mut(&mut self) -> &mut SettingsRecord {
        &mut self.record
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Read the record from address 0.
    ///
    /// Returns `true` only if the stored preamble is valid.  Otherwise the
    /// in-memory record is reset to defaults and `false` is returned.
    pub fn load(&mut self) -> bool {
        info!("Settings: loading from store");
        let mut raw = [0u8; RECORD_SIZE];
        for (address, slot) in raw.iter_mut().enumerate() {
            match self.store.read_byte(address) {
                Ok(b) => *slot = b,
                Err(e) => {
                    warn!("Settings: read failed at {} ({}), restoring defaults", address, e);
                    self.record = SettingsRecord::defaults();
                    return false;
                }
            }
        }

        let loaded = SettingsRecord::decode(&raw);
        if !loaded.is_valid() {
            warn!(
                "Settings: invalid preamble {:#04x}, restoring defaults",
                loaded.preamble()
            );
            self.record = SettingsRecord::defaults();
            return false;
        }

        self.record = loaded;
        info!("Settings: loaded ({} bytes)", RECORD_SIZE);
        true
    }

    /// Mark the record valid and write it to address 0, rewriting only
    /// bytes that differ from what is stored, then commit.
    pub fn save(&mut self) -> Result<SaveReport, SettingsError> {
        info!("Settings: saving to store");
        if self.store.capacity() < RECORD_SIZE {
            warn!(
                "Settings: store holds {} bytes, record needs {}",
                self.store.capacity(),
                RECORD_SIZE
            );
            return Err(SettingsError::OutOfRange);
        }

        self.record.mark_valid();
        let raw = self.record.encode();

        let mut bytes_written = 0;
        for (address, &value) in raw.iter().enumerate() {
            if self.store.read_byte(address)? != value {
                self.store.write_byte(address, value)?;
                bytes_written += 1;
                debug!("EEPROM write at address {}: {}", address, value);
            }
        }

        match self.store.commit() {
            Ok(()) => {
                info!(
                    "Settings: saved and committed ({} bytes, {} changed)",
                    RECORD_SIZE, bytes_written
                );
                Ok(SaveReport { bytes_written })
            }
            Err(e) => {
                warn!("Settings: failed to commit ({})", e);
                Err(SettingsError::CommitFailed)
            }
        }
    }

    /// [`load`](Self::load) and report the outcome through `sink`.
    pub fn load_reporting(&mut self, sink: &mut impl EventSink) -> bool {
        let valid = self.load();
        sink.emit(&AppEvent::SettingsLoaded { valid });
        valid
    }

    /// [`save`](Self::save) and report the outcome through `sink`.
    pub fn save_reporting(&mut self, sink: &mut impl EventSink) -> Result<SaveReport, SettingsError> {
        let result = self.save();
        let (bytes_written, committed) = match &result {
            Ok(report) => (report.bytes_written, true),
            Err(_) => (0, false),
        };
        sink.emit(&AppEvent::SettingsSaved {
            bytes_written,
            committed,
        });
        result
    }

    /// Write a human-readable listing of every field.
    pub fn dump(&self, out: &mut impl fmt::Write) -> fmt::Result {
        self.record.dump(out)
    }
}
