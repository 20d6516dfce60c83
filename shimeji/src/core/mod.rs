//! Deterministic, pure logic shared by the mascot core.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures; randomness is always injected by the caller.

pub mod configuration;
pub mod definitions;
pub mod exit_policy;
pub mod types;
