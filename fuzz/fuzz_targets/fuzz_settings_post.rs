//! Fuzz target: `settings_api::handle_post`
//!
//! Posts arbitrary bodies to the settings endpoint backed by a simulated
//! EEPROM and checks that a refused update leaves the committed image
//! untouched, while an accepted one always reloads as valid.
//!
//! cargo fuzz run fuzz_settings_post

#![no_main]

use libfuzzer_sys::fuzz_target;
use roombridge::adapters::eeprom::EepromAdapter;
use roombridge::app::settings::SettingsManager;
use roombridge::app::settings_api;
use roombridge::config::STORE_CAPACITY;

fuzz_target!(|data: &[u8]| {
    let mut settings = SettingsManager::new(EepromAdapter::new(STORE_CAPACITY));
    let _ = settings.save();
    let before = settings.store().flash_image().to_vec();

    let resp = settings_api::handle_post(&mut settings, data);
    match resp.status {
        200 => {
            let image = settings.store().flash_image().to_vec();
            let mut after = SettingsManager::new(EepromAdapter::from_image(image));
            assert!(after.load(), "accepted update must reload");
        }
        400 => assert_eq!(settings.store().flash_image(), before.as_slice()),
        other => panic!("unexpected status {other}"),
    }
});
