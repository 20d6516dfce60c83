//! Configuration registry: one validated [`Configuration`] per image set.
//!
//! Loading resolves the actions and behaviors documents through the layout's
//! search order, merges them into one namespace (actions first), validates all
//! references, and only then publishes the result. A configuration that fails
//! any step is never stored.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::core::configuration::Configuration;
use crate::core::types::ImageSetId;
use crate::error::ConfigError;
use crate::io::document::read_entry;
use crate::io::paths::{DocumentKind, Layout};

#[derive(Debug, Clone)]
pub struct ConfigurationRegistry {
    layout: Layout,
    configurations: HashMap<ImageSetId, Arc<Configuration>>,
}

impl ConfigurationRegistry {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            configurations: HashMap::new(),
        }
    }

    /// Build a fresh registry holding every set in `image_sets`.
    ///
    /// Stops at the first failure; no partially loaded registry escapes.
    pub fn load_all(layout: Layout, image_sets: &[ImageSetId]) -> Result<Self, ConfigError> {
        let mut registry = Self::new(layout);
        for image_set in image_sets {
            registry.load_configuration(image_set)?;
        }
        Ok(registry)
    }

    /// Load, merge and validate `image_set`, replacing any earlier entry.
    pub fn load_configuration(
        &mut self,
        image_set: &ImageSetId,
    ) -> Result<Arc<Configuration>, ConfigError> {
        let configuration = Arc::new(load_image_set(&self.layout, image_set)?);
        self.configurations
            .insert(image_set.clone(), Arc::clone(&configuration));
        Ok(configuration)
    }

    /// A previously loaded configuration.
    ///
    /// # Panics
    ///
    /// Panics if `image_set` was never loaded. Callers must load first; use
    /// [`ConfigurationRegistry::configuration`] for ids from untrusted input.
    pub fn get(&self, image_set: &ImageSetId) -> &Arc<Configuration> {
        self.configurations
            .get(image_set)
            .unwrap_or_else(|| panic!("configuration for image set '{image_set}' was never loaded"))
    }

    pub fn configuration(&self, image_set: &ImageSetId) -> Option<&Arc<Configuration>> {
        self.configurations.get(image_set)
    }

    pub fn contains(&self, image_set: &ImageSetId) -> bool {
        self.configurations.contains_key(image_set)
    }

    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }
}

/// Resolve, parse, merge and validate both documents for one image set.
pub fn load_image_set(layout: &Layout, image_set: &ImageSetId) -> Result<Configuration, ConfigError> {
    let mut configuration = Configuration::new();

    for document in [DocumentKind::Actions, DocumentKind::Behaviors] {
        let path = layout.resolve(image_set, document)?;
        info!(image_set = %image_set, path = %path.display(), "reading {}", document.label());
        let root = read_entry(&path)?;
        configuration
            .load(&root)
            .map_err(|source| ConfigError::Definition {
                path: path.clone(),
                source,
            })?;
    }

    configuration
        .validate()
        .map_err(|source| ConfigError::Invalid {
            image_set: image_set.clone(),
            source,
        })?;

    debug!(image_set = %image_set, entries = configuration.len(), "configuration validated");
    Ok(configuration)
}
