fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    // Host builds only run the unit tests and need no ESP-IDF environment.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }
}
