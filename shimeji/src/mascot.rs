//! Live mascot agents.

use std::sync::Arc;

use crate::behavior::Behavior;
use crate::core::configuration::Configuration;
use crate::core::types::{ImageSetId, MascotId, Point};

/// Anchor for freshly created mascots, outside every screen.
pub const OFFSCREEN_ANCHOR: Point = Point::new(-1000, -1000);

/// The part of a mascot that behaviors may read and mutate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MascotState {
    pub id: MascotId,
    pub image_set: ImageSetId,
    pub anchor: Point,
    pub look_right: bool,
}

/// A registered mascot. Only the supervisor constructs these, and only after
/// its behavior has been built and initialized.
#[derive(Debug)]
pub struct Mascot {
    pub(crate) state: MascotState,
    pub(crate) behavior: Box<dyn Behavior>,
    pub(crate) configuration: Arc<Configuration>,
}

impl Mascot {
    pub fn id(&self) -> MascotId {
        self.state.id
    }

    pub fn image_set(&self) -> &ImageSetId {
        &self.state.image_set
    }

    pub fn anchor(&self) -> Point {
        self.state.anchor
    }

    pub fn look_right(&self) -> bool {
        self.state.look_right
    }

    pub fn behavior_name(&self) -> &str {
        self.behavior.name()
    }

    pub fn state(&self) -> &MascotState {
        &self.state
    }

    /// The configuration this mascot was built from.
    pub fn configuration(&self) -> &Arc<Configuration> {
        &self.configuration
    }
}
