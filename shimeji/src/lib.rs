//! Desktop mascot control core.
//!
//! Loads per-image-set behavior configurations, owns the live mascot
//! population and decides when the process should end. The architecture
//! keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (definitions, merging, validation,
//!   weighted behavior selection, exit policy). No I/O.
//! - **[`io`]**: Side-effecting operations (document resolution, settings,
//!   runtime config). Isolated to enable temp-dir fixtures in tests.
//!
//! Orchestration modules ([`registry`], [`supervisor`], [`app`]) coordinate
//! core logic with I/O; [`behavior`] and [`shell`] are the seams to the
//! behavior engine and the user-facing front-end.

pub mod app;
pub mod behavior;
pub mod command;
pub mod console;
pub mod core;
pub mod entry;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod mascot;
pub mod registry;
pub mod shell;
pub mod supervisor;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
