//! Verification and repair of inference output files.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

/// Locate the video the external program should have produced.
///
/// The program appends `.mp4` to the save name itself, and older builds
/// double-append when the name already carries the extension. When only
/// `<stem>.mp4.mp4` exists it is renamed into place. Returns `None` when no
/// output can be found; sidecar text files the program leaves next to the
/// video are cleaned up on success.
pub fn verify_output(folder: &Path, stem: &str) -> Result<Option<PathBuf>> {
    let expected = folder.join(format!("{stem}.mp4"));
    if expected.exists() {
        cleanup_sidecar_text(folder, stem);
        return Ok(Some(expected));
    }

    let doubled = folder.join(format!("{stem}.mp4.mp4"));
    if doubled.exists() {
        fs::rename(&doubled, &expected).with_context(|| {
            format!("rename {} -> {}", doubled.display(), expected.display())
        })?;
        info!(path = %expected.display(), "repaired double-extension output");
        cleanup_sidecar_text(folder, stem);
        return Ok(Some(expected));
    }

    warn!(path = %expected.display(), "expected output file not found");
    Ok(None)
}

/// Remove `<stem>*.txt` files generated alongside the video.
///
/// Removal failures are logged, never fatal.
fn cleanup_sidecar_text(folder: &Path, stem: &str) {
    let entries = match fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(err = %err, folder = %folder.display(), "could not scan for sidecar files");
            return;
        }
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(stem) && name.ends_with(".txt") {
            let path = entry.path();
            match fs::remove_file(&path) {
                Ok(()) => info!(path = %path.display(), "removed sidecar text file"),
                Err(err) => {
                    warn!(err = %err, path = %path.display(), "could not remove sidecar file");
                }
            }
        }
    }
}
