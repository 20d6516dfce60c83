//! Filesystem access for the mascot core.

pub mod config;
pub mod document;
pub mod paths;
pub mod settings;
