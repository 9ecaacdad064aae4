//! Stable exit codes for `fixture` commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Fixture file or config could not be read, decoded or validated.
pub const INVALID: i32 = 1;
/// `fixture apply` aborted while setting up a worker.
pub const SETUP_FAILED: i32 = 2;
