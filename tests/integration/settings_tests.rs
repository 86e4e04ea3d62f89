//! Settings persistence and the HTTP settings endpoints, run against the
//! simulated EEPROM adapter.

use roombridge::adapters::eeprom::EepromAdapter;
use roombridge::app::events::AppEvent;
use roombridge::app::ports::RecordStorePort;
use roombridge::app::settings::{SettingsError, SettingsManager};
use roombridge::app::settings_api::{self, SettingsUpdateError};
use roombridge::config::{REQUIRED_PREAMBLE, RECORD_SIZE, STORE_CAPACITY, SettingsRecord};
use serde_json::Value;

use crate::mock_hw::RecordingSink;

fn blank_manager() -> SettingsManager<EepromAdapter> {
    SettingsManager::new(EepromAdapter::new(STORE_CAPACITY))
}

/// Simulate a power cycle: a fresh adapter over the committed flash.
fn reboot(settings: &SettingsManager<EepromAdapter>) -> SettingsManager<EepromAdapter> {
    let image = settings.store().flash_image().to_vec();
    SettingsManager::new(EepromAdapter::from_image(image))
}

#[test]
fn first_boot_restores_and_persists_defaults() {
    let mut settings = blank_manager();
    let mut sink = RecordingSink::new();

    assert!(!settings.load_reporting(&mut sink));
    assert_eq!(settings.record(), &SettingsRecord::defaults());
    let report = settings.save_reporting(&mut sink).unwrap();
    assert!(report.bytes_written > 0);

    assert_eq!(sink.events[0], AppEvent::SettingsLoaded { valid: false });
    assert_eq!(
        sink.events[1],
        AppEvent::SettingsSaved {
            bytes_written: report.bytes_written,
            committed: true
        }
    );

    let mut after = reboot(&settings);
    assert!(after.load());
    assert_eq!(after.record().ssid_ap(), "RoombaAP");
    assert_eq!(after.record().hostname(), "roomba-esp32");
    assert_eq!(after.store().read_byte(0), Ok(REQUIRED_PREAMBLE));
}

#[test]
fn corrupted_preamble_falls_back_to_defaults() {
    let mut settings = blank_manager();
    settings.record_mut().set_ssid_router("Office");
    settings.save().unwrap();

    let mut image = settings.store().flash_image().to_vec();
    image[0] = 0x00;
    let mut after = SettingsManager::new(EepromAdapter::from_image(image));
    assert!(!after.load());
    assert_eq!(after.record().ssid_router(), "Bos");
    assert!(!after.record().is_valid());
}

#[test]
fn unchanged_save_writes_nothing() {
    let mut settings = blank_manager();
    settings.save().unwrap();
    let byte_writes = settings.store().byte_writes();
    let flash_writes = settings.store().flash_writes();

    let report = settings.save().unwrap();
    assert_eq!(report.bytes_written, 0);
    assert_eq!(settings.store().byte_writes(), byte_writes);
    assert_eq!(settings.store().flash_writes(), flash_writes);
}

#[test]
fn changing_one_field_rewrites_only_its_bytes() {
    let mut settings = blank_manager();
    settings.save().unwrap();
    let before = settings.store().byte_writes();

    // "RoombaAP" -> "RoombaAQ": a single differing byte.
    settings.record_mut().set_ssid_ap("RoombaAQ");
    let report = settings.save().unwrap();
    assert_eq!(report.bytes_written, 1);
    assert_eq!(settings.store().byte_writes(), before + 1);
}

#[test]
fn overlong_values_survive_reboot_truncated() {
    let mut settings = blank_manager();
    let long = "n".repeat(150);
    settings.record_mut().set_hostname(&long);
    settings.save().unwrap();

    let mut after = reboot(&settings);
    assert!(after.load());
    assert_eq!(after.record().hostname(), &long[..99]);
}

#[test]
fn failed_commit_keeps_previous_flash() {
    let mut settings = blank_manager();
    settings.save().unwrap();
    let committed = settings.store().flash_image().to_vec();

    settings.store_mut().set_fail_commit(true);
    settings.record_mut().set_ssid_router("Elsewhere");
    let mut sink = RecordingSink::new();
    assert_eq!(
        settings.save_reporting(&mut sink),
        Err(SettingsError::CommitFailed)
    );
    assert_eq!(
        sink.last(),
        Some(&AppEvent::SettingsSaved {
            bytes_written: 0,
            committed: false
        })
    );
    assert_eq!(settings.record().ssid_router(), "Elsewhere");
    assert_eq!(settings.store().flash_image(), committed.as_slice());
}

#[test]
fn undersized_store_is_refused() {
    let mut settings = SettingsManager::new(EepromAdapter::new(RECORD_SIZE - 1));
    assert_eq!(settings.save(), Err(SettingsError::OutOfRange));
}

#[test]
fn dump_lists_every_field() {
    let settings = blank_manager();
    let mut out = String::new();
    settings.dump(&mut out).unwrap();
    assert!(out.starts_with("Dumping configuration:"));
    for label in ["ssid_Router", "password_Router", "ssid_AP", "password_AP", "IP_AP", "hostname"] {
        assert!(out.contains(label), "missing {label}");
    }
}

// ── HTTP endpoints ────────────────────────────────────────────

const UPDATE: &str = r#"{
    "ssid_AP": "RoverAP",
    "password_AP": "roverpass1",
    "ssid_Router": "HomeNet",
    "password_Router": "supersecret",
    "ipAddr": "10.0.0.1",
    "hostname": "rover"
}"#;

#[test]
fn post_then_get_reflects_update_after_reboot() {
    let mut settings = blank_manager();
    settings.save().unwrap();

    let resp = settings_api::handle_post(&mut settings, UPDATE.as_bytes());
    assert_eq!(resp.status, 200);
    let ack: Value = serde_json::from_str(&resp.body).unwrap();
    assert_eq!(ack["status"], "Network updated");

    let mut after = reboot(&settings);
    let resp = settings_api::handle_get(&mut after);
    assert_eq!(resp.status, 200);
    assert_eq!(resp.content_type, "application/json");
    let doc: Value = serde_json::from_str(&resp.body).unwrap();
    assert_eq!(doc["ssid_AP"], "RoverAP");
    assert_eq!(doc["password_AP"], "roverpass1");
    assert_eq!(doc["ssid_Router"], "HomeNet");
    assert_eq!(doc["password_Router"], "supersecret");
    assert_eq!(doc["ipAddr"], "10.0.0.1");
    assert_eq!(doc["hostname"], "rover");
}

#[test]
fn get_rereads_the_store() {
    let mut settings = blank_manager();
    settings.save().unwrap();
    // Unsaved in-memory edits are discarded by the reload.
    settings.record_mut().set_ssid_router("Unsaved");
    let resp = settings_api::handle_get(&mut settings);
    let doc: Value = serde_json::from_str(&resp.body).unwrap();
    assert_eq!(doc["ssid_Router"], "Bos");
}

#[test]
fn rejected_posts_leave_flash_untouched() {
    let mut settings = blank_manager();
    settings.save().unwrap();
    let committed = settings.store().flash_image().to_vec();

    let resp = settings_api::handle_post(&mut settings, b"not json");
    assert_eq!(resp.status, 400);
    assert_eq!(resp.body, "Invalid JSON");

    let resp = settings_api::handle_post(&mut settings, br#"{"ssid_AP":"x"}"#);
    assert_eq!(resp.status, 400);
    assert_eq!(resp.body, "Invalid parameters");

    assert_eq!(settings.store().flash_image(), committed.as_slice());
}

#[test]
fn commit_failure_maps_to_server_error() {
    let mut settings = blank_manager();
    settings.store_mut().set_fail_commit(true);
    assert_eq!(
        settings_api::apply_update(&mut settings, UPDATE.as_bytes()),
        Err(SettingsUpdateError::CommitFailed)
    );
    let resp = settings_api::handle_post(&mut settings, UPDATE.as_bytes());
    assert_eq!(resp.status, 500);
    assert_eq!(resp.body, "Failed to commit EEPROM changes");
}
