fn main() {
    println!("cargo:rerun-if-env-changed=ROOMBRIDGE_WIFI_PASSWORD");

    // Only firmware builds need the ESP-IDF environment; host test builds
    // compile without it.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
