pub mod command;
pub mod config;
pub mod mods;
pub mod process_monitor;
pub mod supervisor;
pub mod utils;
