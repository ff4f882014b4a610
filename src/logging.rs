use log::LevelFilter;
use simplelog::{Config, WriteLogger};
use std::fs::File;

pub fn init_logging() {
    // No log file is not fatal, the engine just runs quiet
    if let Ok(file) = File::create("ember.log") {
        let _ = WriteLogger::init(LevelFilter::Info, Config::default(), file);
        log::info!("logger initialized");
    }
}
