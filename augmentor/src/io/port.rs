//! Rendezvous port discovery for the multi-process launcher.

use std::net::TcpListener;

use anyhow::{Context, Result};

/// Find a free TCP port for the launcher's `--master_port`.
///
/// Binds to port 0, reads back the kernel-assigned port, and releases the
/// listener. The port is not reserved afterwards, so each launch should ask
/// for a fresh one right before spawning.
pub fn free_port() -> Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind rendezvous port probe")?;
    let port = listener
        .local_addr()
        .context("read rendezvous port probe addr")?
        .port();
    Ok(port)
}
