//! Shared value types for the mascot core.
//!
//! These types carry no behavior beyond formatting and comparison; they form
//! the stable vocabulary between the registry, the supervisor and the app.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque name of an image set (one mascot skin).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageSetId(String);

impl ImageSetId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageSetId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Supervisor-assigned mascot identity. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MascotId(pub u64);

impl fmt::Display for MascotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Screen coordinate of a mascot's anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Namespace partition of a configuration entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryKind {
    Action,
    Behavior,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Action => f.write_str("action"),
            EntryKind::Behavior => f.write_str("behavior"),
        }
    }
}

/// Host address width, recorded for native integrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    X86,
    X86_64,
}

impl Platform {
    pub fn detect() -> Self {
        if cfg!(target_pointer_width = "64") {
            Platform::X86_64
        } else {
            Platform::X86
        }
    }
}
