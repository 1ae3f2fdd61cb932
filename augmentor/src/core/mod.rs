//! Deterministic, pure logic shared by the augmentor.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod env;
pub mod episode;
pub mod invocation;
