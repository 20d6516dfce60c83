//! Error taxonomy for the mascot core.
//!
//! Two layers, with different policies:
//!
//! - Configuration layer ([`ConfigError`], [`DefinitionError`], [`ValidationError`]):
//!   any of these during startup or reconfiguration terminates the process.
//! - Agent layer ([`BehaviorError`], [`SpawnError`]): contained to the failing
//!   mascot; the supervisor stays usable.
//!
//! [`TrayError`] covers process-level resource setup.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::types::{EntryKind, ImageSetId};

/// Failure to resolve, read, parse, merge or validate an image set's documents.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no {document} for image set '{image_set}' (searched {})", render_paths(.searched))]
    MissingDocument {
        image_set: ImageSetId,
        document: &'static str,
        searched: Vec<PathBuf>,
    },
    #[error("read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },
    #[error("load {}", .path.display())]
    Definition {
        path: PathBuf,
        #[source]
        source: DefinitionError,
    },
    #[error("validate image set '{image_set}'")]
    Invalid {
        image_set: ImageSetId,
        #[source]
        source: ValidationError,
    },
}

impl ConfigError {
    /// Short stable label for structured logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::MissingDocument { .. } => "config_missing_document",
            ConfigError::Read { .. } => "config_read",
            ConfigError::Parse { .. } => "config_parse",
            ConfigError::Definition { .. } => "config_definition",
            ConfigError::Invalid { .. } => "config_invalid",
        }
    }
}

fn render_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A document's structure does not match the definition schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("expected root element 'Mascot', found '{0}'")]
    UnexpectedRoot(String),
    #[error("{element} is missing required attribute '{attribute}'")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },
    #[error("{element} '{name}': invalid {attribute} '{value}'")]
    InvalidAttribute {
        element: String,
        name: String,
        attribute: &'static str,
        value: String,
    },
    #[error("duplicate {kind} '{name}'")]
    Duplicate { kind: EntryKind, name: String },
}

/// An entry refers to a name that is not defined anywhere in the merged namespace.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{from_kind} '{from}' refers to unknown {target_kind} '{target}'")]
pub struct ValidationError {
    pub from_kind: EntryKind,
    pub from: String,
    pub target_kind: EntryKind,
    pub target: String,
}

/// Failure to build, initialize or advance one mascot's behavior.
#[derive(Error, Debug)]
pub enum BehaviorError {
    #[error("cannot instantiate behavior '{name}': {reason}")]
    Instantiation { name: String, reason: String },
    /// The mascot can no longer exist and must be disposed.
    #[error("mascot cannot stay alive: {0}")]
    CantBeAlive(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BehaviorError {
    pub fn instantiation(name: impl Into<String>, reason: impl Into<String>) -> Self {
        BehaviorError::Instantiation {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, BehaviorError::CantBeAlive(_))
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            BehaviorError::Instantiation { .. } => "behavior_instantiation",
            BehaviorError::CantBeAlive(_) => "behavior_cant_be_alive",
            BehaviorError::Other(_) => "behavior_unclassified",
        }
    }
}

/// A mascot could not be created. The supervisor is unchanged.
#[derive(Error, Debug)]
pub enum SpawnError {
    #[error("no image sets are active")]
    NoImageSets,
    #[error("image set '{0}' is not loaded")]
    NotLoaded(ImageSetId),
    #[error("could not create a mascot from image set '{image_set}'")]
    Behavior {
        image_set: ImageSetId,
        #[source]
        source: BehaviorError,
    },
}

impl SpawnError {
    pub fn as_label(&self) -> &'static str {
        match self {
            SpawnError::NoImageSets => "spawn_no_image_sets",
            SpawnError::NotLoaded(_) => "spawn_not_loaded",
            SpawnError::Behavior { source, .. } => source.as_label(),
        }
    }
}

/// Tray installation failure reported by the shell.
#[derive(Error, Debug)]
pub enum TrayError {
    #[error("read tray icon {}", .path.display())]
    Icon {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("system tray is not supported on this host")]
    Unsupported,
}
