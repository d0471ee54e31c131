// ABOUTME: Library exports for imgup CLI modules for testing and external use
// ABOUTME: Makes internal modules available to integration tests

pub mod cli;
pub mod cli_output;
pub mod config;
pub mod constants;
#[cfg(feature = "oauth")]
pub mod setup;
pub mod upload;
