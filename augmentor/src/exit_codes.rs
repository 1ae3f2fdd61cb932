//! Stable exit codes for augmentor CLI commands.
//!
//! `augmentor launch` is a special case: once the external inference process
//! has run, its exit status is propagated unchanged, so any code the launcher
//! program produces (including signal deaths reported as `128 + signo`) can
//! surface as our own.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed on our side: bad config, bad CLI arguments, spawn failure.
pub const INVALID: i32 = 1;
