//! On-disk layout and definition-document resolution.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::types::ImageSetId;
use crate::error::ConfigError;

/// Image-set directory name that is never offered for selection.
pub const UNUSED_DIR: &str = "unused";

/// The two definition documents every image set needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Actions,
    Behaviors,
}

impl DocumentKind {
    pub fn file_name(self) -> &'static str {
        match self {
            DocumentKind::Actions => "actions.xml",
            DocumentKind::Behaviors => "behaviors.xml",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::Actions => "actions document",
            DocumentKind::Behaviors => "behaviors document",
        }
    }
}

/// Resolved paths under an installation root.
#[derive(Debug, Clone)]
pub struct Layout {
    pub root: PathBuf,
    pub conf_dir: PathBuf,
    pub img_dir: PathBuf,
    pub settings_path: PathBuf,
    pub runtime_config_path: PathBuf,
    pub icon_path: PathBuf,
}

impl Layout {
    pub fn new(root: &Path) -> Self {
        let conf_dir = root.join("conf");
        let img_dir = root.join("img");
        Self {
            root: root.to_path_buf(),
            settings_path: conf_dir.join("settings.properties"),
            runtime_config_path: conf_dir.join("shimeji.toml"),
            icon_path: img_dir.join("icon.png"),
            conf_dir,
            img_dir,
        }
    }

    /// Candidate paths for `document`, highest precedence first:
    /// per-set override under `conf/`, per-set override under `img/<set>/conf/`,
    /// then the shared default under `conf/`.
    pub fn candidates(&self, image_set: &ImageSetId, document: DocumentKind) -> [PathBuf; 3] {
        let file = document.file_name();
        [
            self.conf_dir.join(image_set.as_str()).join(file),
            self.img_dir.join(image_set.as_str()).join("conf").join(file),
            self.conf_dir.join(file),
        ]
    }

    /// First existing candidate for `document`. Candidates are never merged.
    pub fn resolve(
        &self,
        image_set: &ImageSetId,
        document: DocumentKind,
    ) -> Result<PathBuf, ConfigError> {
        let candidates = self.candidates(image_set, document);
        if let Some(found) = candidates.iter().find(|path| path.is_file()) {
            debug!(image_set = %image_set, path = %found.display(), "resolved {}", document.label());
            return Ok(found.clone());
        }
        Err(ConfigError::MissingDocument {
            image_set: image_set.clone(),
            document: document.label(),
            searched: candidates.to_vec(),
        })
    }

    /// Image sets installed under `img/`, sorted by name.
    pub fn available_image_sets(&self) -> Result<Vec<ImageSetId>> {
        if !self.img_dir.exists() {
            return Ok(Vec::new());
        }
        let mut sets = Vec::new();
        for entry in fs::read_dir(&self.img_dir)
            .with_context(|| format!("read {}", self.img_dir.display()))?
        {
            let entry = entry.context("read entry")?;
            if !entry.file_type().context("read file type")?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name == UNUSED_DIR {
                continue;
            }
            sets.push(ImageSetId::new(name));
        }
        sets.sort();
        Ok(sets)
    }
}
