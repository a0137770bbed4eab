fn main() {
    println!("cargo:rerun-if-env-changed=DHT_OUTPUT_FILE");

    // Host builds (Raspberry Pi, tests) have no ESP-IDF args to propagate.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("espidf") {
        return;
    }

    // Propagate ESP-IDF link/cfg/include args from esp-idf-sys.
    if let Err(err) = embuild::build::LinkArgs::output_propagated("ESP_IDF") {
        println!("cargo:warning=esp-idf link args not propagated: {err}");
    }
    if let Err(err) = embuild::build::CfgArgs::output_propagated("ESP_IDF") {
        println!("cargo:warning=esp-idf cfg args not propagated: {err}");
    }
}
