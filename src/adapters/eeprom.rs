//! Emulated EEPROM adapter.
//!
//! Implements [`RecordStorePort`] as a RAM image of [`STORE_CAPACITY`]
//! bytes.  Byte writes only touch the image; [`commit`] persists the whole
//! image as one NVS blob, and only if some byte actually changed since the
//! last commit.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: blob `eeprom` in NVS namespace `eeprom`,
//!   via `esp_idf_svc::nvs::EspNvs`.
//! - **all other targets**: an in-memory "flash" image with write and
//!   commit counters, plus a switch to make commits fail.
//!
//! [`commit`]: RecordStorePort::commit
//! [`STORE_CAPACITY`]: crate::config::STORE_CAPACITY

use log::{info, warn};

use crate::app::ports::{RecordStorePort, StoreError};

#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};

#[cfg(target_os = "espidf")]
const EEPROM_NAMESPACE: &str = "eeprom";
#[cfg(target_os = "espidf")]
const EEPROM_KEY: &str = "eeprom";

pub struct EepromAdapter {
    image: Vec<u8>,
    dirty: bool,
    byte_writes: usize,
    flash_writes: usize,
    #[cfg(target_os = "espidf")]
    nvs: EspNvs<NvsDefault>,
    #[cfg(not(target_os = "espidf"))]
    flash: Vec<u8>,
    #[cfg(not(target_os = "espidf"))]
    fail_commit: bool,
}

impl EepromAdapter {
    /// Open the NVS namespace and load the stored image.
    ///
    /// A missing or unreadable blob leaves the image zero-filled, which
    /// never carries a valid preamble.
    #[cfg(target_os = "espidf")]
    pub fn new(partition: EspDefaultNvsPartition, capacity: usize) -> Result<Self, StoreError> {
        let nvs = EspNvs::new(partition, EEPROM_NAMESPACE, true).map_err(|e| {
            warn!("EEPROM: cannot open NVS namespace ({:?})", e);
            StoreError::IoError
        })?;

        let mut image = vec![0u8; capacity];
        match nvs.get_blob(EEPROM_KEY, &mut image).map(|b| b.map(<[u8]>::len)) {
            Ok(Some(len)) => info!("EEPROM: loaded {} byte image", len),
            Ok(None) => info!("EEPROM: no stored image, starting blank"),
            Err(e) => {
                warn!("EEPROM: stored image unreadable ({:?}), starting blank", e);
                image.fill(0);
            }
        }

        Ok(Self {
            image,
            dirty: false,
            byte_writes: 0,
            flash_writes: 0,
            nvs,
        })
    }

    /// Blank simulated store.
    #[cfg(not(target_os = "espidf"))]
    pub fn new(capacity: usize) -> Self {
        info!("EEPROM(sim): {} byte blank store", capacity);
        Self::from_image(vec![0u8; capacity])
    }

    /// Simulated store whose flash already holds `image` (a "reboot").
    #[cfg(not(target_os = "espidf"))]
    pub fn from_image(image: Vec<u8>) -> Self {
        Self {
            flash: image.clone(),
            image,
            dirty: false,
            byte_writes: 0,
            flash_writes: 0,
            fail_commit: false,
        }
    }

    /// What a reboot would read back.
    #[cfg(not(target_os = "espidf"))]
    pub fn flash_image(&self) -> &[u8] {
        &self.flash
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn set_fail_commit(&mut self, fail: bool) {
        self.fail_commit = fail;
    }

    /// `write_byte` calls since creation.
    pub fn byte_writes(&self) -> usize {
        self.byte_writes
    }

    /// Commits that actually rewrote the backing blob.
    pub fn flash_writes(&self) -> usize {
        self.flash_writes
    }

    #[cfg(target_os = "espidf")]
    fn persist(&mut self) -> Result<(), StoreError> {
        self.nvs.set_blob(EEPROM_KEY, &self.image).map_err(|e| {
            warn!("EEPROM: NVS write failed ({:?})", e);
            StoreError::CommitFailed
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn persist(&mut self) -> Result<(), StoreError> {
        if self.fail_commit {
            warn!("EEPROM(sim): simulated commit failure");
            return Err(StoreError::CommitFailed);
        }
        self.flash.clone_from(&self.image);
        Ok(())
    }
}

impl RecordStorePort for EepromAdapter {
    fn capacity(&self) -> usize {
        self.image.len()
    }

    fn read_byte(&self, address: usize) -> Result<u8, StoreError> {
        self.image
            .get(address)
            .copied()
            .ok_or(StoreError::OutOfRange { address })
    }

    fn write_byte(&mut self, address: usize, value: u8) -> Result<(), StoreError> {
        let slot = self
            .image
            .get_mut(address)
            .ok_or(StoreError::OutOfRange { address })?;
        self.byte_writes += 1;
        if *slot != value {
            *slot = value;
            self.dirty = true;
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }
        self.persist()?;
        self.dirty = false;
        self.flash_writes += 1;
        info!("EEPROM: committed {} bytes", self.image.len());
        Ok(())
    }
}
