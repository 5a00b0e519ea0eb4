//! Process-level plumbing shared by the timetable binaries: layered
//! configuration, home directory resolution and logging setup.

pub mod config;
pub mod logging;
pub mod paths;

pub use config::{
    AppConfig, CliArgs, DatabaseConfig, LoggingConfig, Section, ServerConfig, IN_MEMORY_DSN,
};
