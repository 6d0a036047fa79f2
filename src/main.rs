#[cfg(target_os = "espidf")]
fn main() {
    weather_lcd::esp::start()
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!("weather-lcd runs on ESP-IDF; build it for an espidf target");
    std::process::exit(1);
}
