//! Launcher for video diffusion transfer inference over robot-learning datasets.
//!
//! This crate wraps an external multi-process inference launcher (`torchrun`
//! targeting a diffusion transfer entry point) behind a small CLI. The
//! architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (environment defaults, argument
//!   construction, episode numbering). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config files, process execution,
//!   dataset layout, frame probing). Isolated to enable mocking in tests.
//!
//! Orchestration modules ([`launch`], [`batch`]) coordinate core logic with I/O
//! to implement CLI commands.

pub mod batch;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod launch;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
