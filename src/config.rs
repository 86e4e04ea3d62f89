//! Persisted device settings.
//!
//! The settings record is a flat, fixed-size blob: one preamble byte followed
//! by six 100-byte NUL-terminated text fields in a fixed order.  The layout is
//! shared with every image ever flashed to the device, so field order and
//! width must never change.
//!
//! ```text
//! offset  0        1          101        201     301        401    501       601
//!         ┌────────┬──────────┬──────────┬───────┬──────────┬──────┬─────────┐
//!         │preamble│ssid_Router│pass_Router│ssid_AP│password_AP│IP_AP │hostname │
//!         │ 0xFC   │ 100 B    │ 100 B    │ 100 B │ 100 B    │100 B │ 100 B   │
//!         └────────┴──────────┴──────────┴───────┴──────────┴──────┴─────────┘
//! ```
//!
//! Every field is described by a row in [`SCHEMA`]; encode, decode and dump
//! iterate that table rather than the in-memory struct layout.

use core::fmt;

use serde::{Serialize, Serializer};

/// Sentinel stored at offset 0 of a valid record.
pub const REQUIRED_PREAMBLE: u8 = 0xFC;

/// Capacity of every text field, including the terminating NUL.
pub const TEXT_CAPACITY: usize = 100;

/// Number of text fields in the record.
pub const FIELD_COUNT: usize = 6;

/// Size of the serialized record in bytes.
pub const RECORD_SIZE: usize = 1 + FIELD_COUNT * TEXT_CAPACITY;

/// Size of the emulated EEPROM region reserved for settings.
pub const STORE_CAPACITY: usize = 700;

/// Router password baked in at build time (`ROOMBRIDGE_WIFI_PASSWORD`).
pub const DEFAULT_ROUTER_PASSWORD: &str = match option_env!("ROOMBRIDGE_WIFI_PASSWORD") {
    Some(pw) => pw,
    None => "",
};

// ---------------------------------------------------------------------------
// Fixed-capacity text
// ---------------------------------------------------------------------------

/// A NUL-terminated text buffer of `N` bytes.
///
/// Writes truncate to at most `N - 1` bytes (on a UTF-8 character boundary)
/// so the buffer always ends in at least one NUL.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FixedText<const N: usize> {
    buf: [u8; N],
}

impl<const N: usize> FixedText<N> {
    pub const fn empty() -> Self {
        Self { buf: [0; N] }
    }

    pub fn new(value: &str) -> Self {
        let mut text = Self::empty();
        text.set(value);
        text
    }

    /// Replace the contents, truncating to fit.
    pub fn set(&mut self, value: &str) {
        let mut len = value.len().min(N.saturating_sub(1));
        while !value.is_char_boundary(len) {
            len -= 1;
        }
        self.buf = [0; N];
        self.buf[..len].copy_from_slice(&value.as_bytes()[..len]);
    }

    /// The text up to the first NUL.
    ///
    /// Bytes loaded from foreign storage may not be UTF-8; only the valid
    /// prefix is returned in that case.
    pub fn as_str(&self) -> &str {
        let bytes = self.content_bytes();
        match core::str::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default(),
        }
    }

    /// Length in bytes up to the first NUL (C `strlen`).
    pub fn len(&self) -> usize {
        self.content_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.first().is_none_or(|b| *b == 0)
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.buf
    }

    /// Load raw bytes, forcing the final byte to NUL.
    pub fn from_raw(raw: &[u8]) -> Self {
        let mut text = Self::empty();
        let len = raw.len().min(N);
        text.buf[..len].copy_from_slice(&raw[..len]);
        if let Some(last) = text.buf.last_mut() {
            *last = 0;
        }
        text
    }

    fn content_bytes(&self) -> &[u8] {
        let end = self.buf.iter().position(|b| *b == 0).unwrap_or(N);
        &self.buf[..end]
    }
}

impl<const N: usize> Default for FixedText<N> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<const N: usize> fmt::Debug for FixedText<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl<const N: usize> fmt::Display for FixedText<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<const N: usize> Serialize for FixedText<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

pub type SettingText = FixedText<TEXT_CAPACITY>;

// ---------------------------------------------------------------------------
// Schema table
// ---------------------------------------------------------------------------

/// Identity of one text field.  The discriminant is the field's position in
/// the on-disk record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SettingsField {
    SsidRouter = 0,
    PasswordRouter = 1,
    SsidAp = 2,
    PasswordAp = 3,
    IpAp = 4,
    Hostname = 5,
}

/// One row of the schema table.
pub struct FieldDescriptor {
    pub field: SettingsField,
    /// Name printed by [`SettingsRecord::dump`].
    pub label: &'static str,
    pub default: &'static str,
}

impl FieldDescriptor {
    /// Byte offset of this field inside the serialized record.
    pub const fn offset(&self) -> usize {
        1 + self.field as usize * TEXT_CAPACITY
    }
}

/// Declared field order.  Must match the layout of every stored record.
pub const SCHEMA: [FieldDescriptor; FIELD_COUNT] = [
    FieldDescriptor {
        field: SettingsField::SsidRouter,
        label: "ssid_Router",
        default: "Bos",
    },
    FieldDescriptor {
        field: SettingsField::PasswordRouter,
        label: "password_Router",
        default: DEFAULT_ROUTER_PASSWORD,
    },
    FieldDescriptor {
        field: SettingsField::SsidAp,
        label: "ssid_AP",
        default: "RoombaAP",
    },
    FieldDescriptor {
        field: SettingsField::PasswordAp,
        label: "password_AP",
        default: "sick",
    },
    FieldDescriptor {
        field: SettingsField::IpAp,
        label: "IP_AP",
        default: "192.168.0.1",
    },
    FieldDescriptor {
        field: SettingsField::Hostname,
        label: "hostname",
        default: "roomba-esp32",
    },
];

// ---------------------------------------------------------------------------
// Settings record
// ---------------------------------------------------------------------------

/// In-memory copy of the persisted settings.
#[derive(Clone, PartialEq, Eq)]
pub struct SettingsRecord {
    preamble: u8,
    fields: [SettingText; FIELD_COUNT],
}

impl SettingsRecord {
    /// Compiled-in defaults.  The preamble is left unset until the record
    /// is saved.
    pub fn defaults() -> Self {
        let mut fields = [SettingText::empty(); FIELD_COUNT];
        for desc in &SCHEMA {
            fields[desc.field as usize].set(desc.default);
        }
        Self {
            preamble: 0,
            fields,
        }
    }

    pub fn preamble(&self) -> u8 {
        self.preamble
    }

    pub fn is_valid(&self) -> bool {
        self.preamble == REQUIRED_PREAMBLE
    }

    pub(crate) fn mark_valid(&mut self) {
        self.preamble = REQUIRED_PREAMBLE;
    }

    pub fn field(&self, field: SettingsField) -> &str {
        self.fields[field as usize].as_str()
    }

    pub fn text(&self, field: SettingsField) -> &SettingText {
        &self.fields[field as usize]
    }

    pub fn set_field(&mut self, field: SettingsField, value: &str) {
        self.fields[field as usize].set(value);
    }

    pub fn ssid_router(&self) -> &str {
        self.field(SettingsField::SsidRouter)
    }

    pub fn password_router(&self) -> &str {
        self.field(SettingsField::PasswordRouter)
    }

    pub fn ssid_ap(&self) -> &str {
        self.field(SettingsField::SsidAp)
    }

    pub fn password_ap(&self) -> &str {
        self.field(SettingsField::PasswordAp)
    }

    pub fn ip_ap(&self) -> &str {
        self.field(SettingsField::IpAp)
    }

    pub fn hostname(&self) -> &str {
        self.field(SettingsField::Hostname)
    }

    pub fn set_ssid_router(&mut self, value: &str) {
        self.set_field(SettingsField::SsidRouter, value);
    }

    pub fn set_password_router(&mut self, value: &str) {
        self.set_field(SettingsField::PasswordRouter, value);
    }

    pub fn set_ssid_ap(&mut self, value: &str) {
        self.set_field(SettingsField::SsidAp, value);
    }

    pub fn set_password_ap(&mut self, value: &str) {
        self.set_field(SettingsField::PasswordAp, value);
    }

    pub fn set_ip_ap(&mut self, value: &str) {
        self.set_field(SettingsField::IpAp, value);
    }

    pub fn set_hostname(&mut self, value: &str) {
        self.set_field(SettingsField::Hostname, value);
    }

    /// Serialize into the fixed 601-byte layout.
    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        out[0] = self.preamble;
        for desc in &SCHEMA {
            let start = desc.offset();
            out[start..start + TEXT_CAPACITY]
                .copy_from_slice(self.fields[desc.field as usize].as_bytes());
        }
        out
    }

    /// Deserialize from the fixed layout.  Never fails: the caller checks
    /// [`is_valid`](Self::is_valid) to decide whether the bytes were a record.
    pub fn decode(raw: &[u8; RECORD_SIZE]) -> Self {
        let mut fields = [SettingText::empty(); FIELD_COUNT];
        for desc in &SCHEMA {
            let start = desc.offset();
            fields[desc.field as usize] = SettingText::from_raw(&raw[start..start + TEXT_CAPACITY]);
        }
        Self {
            preamble: raw[0],
            fields,
        }
    }

    /// Write a `name = value` listing of every field.
    pub fn dump(&self, out: &mut impl fmt::Write) -> fmt::Result {
        writeln!(out, "Dumping configuration:")?;
        for desc in &SCHEMA {
            writeln!(out, "{} = {}", desc.label, self.fields[desc.field as usize])?;
        }
        Ok(())
    }
}

impl Default for SettingsRecord {
    fn default() -> Self {
        Self::defaults()
    }
}

impl fmt::Debug for SettingsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("SettingsRecord");
        s.field("preamble", &format_args!("{:#04x}", self.preamble));
        for desc in &SCHEMA {
            s.field(desc.label, &self.fields[desc.field as usize]);
        }
        s.finish()
    }
}
