//! Stable exit codes for the `shimeji` binary.

/// Normal termination, including fatal errors unless `--strict-exit` is set.
pub const OK: i32 = 0;
/// Fatal startup or reconfiguration error under `--strict-exit`, or a failed `check`.
pub const FATAL: i32 = 1;
