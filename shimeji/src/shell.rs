//! Shell abstraction for user-facing collaborators.
//!
//! The [`Shell`] trait decouples bootstrap and reconfiguration from whatever
//! front-end presents the selection dialog, error messages and tray icon.
//! Tests use scripted shells that answer prompts from a queue.

use crate::core::types::ImageSetId;
use crate::error::TrayError;
use crate::io::paths::Layout;

pub trait Shell {
    /// Ask the user which image sets to activate. `None` means cancelled.
    fn choose_image_sets(&mut self, available: &[ImageSetId]) -> Option<Vec<ImageSetId>>;

    fn show_error(&mut self, message: &str);

    /// Install the tray entry using the icon under `layout`.
    fn install_tray(&mut self, layout: &Layout) -> Result<(), TrayError>;
}
