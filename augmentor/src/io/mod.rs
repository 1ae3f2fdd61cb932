//! I/O helpers for augmentor commands.

pub mod config;
pub mod dataset;
pub mod describe;
pub mod outputs;
pub mod port;
pub mod probe;
pub mod process;
