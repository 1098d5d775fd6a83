//! Process-level plumbing shared by the users service binaries:
//! environment selection, layered configuration and logging setup.

pub mod config;
pub mod home_dir;
pub mod logging;

pub use config::{
    AppConfig, CliArgs, DatabaseConfig, Environment, EnvironmentSettings, LoggingConfig, Section,
    ServerConfig,
};
