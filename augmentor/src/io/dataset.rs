//! Dataset layout discovery for robot-learning datasets.
//!
//! Expected layout under the datasets base directory:
//!
//! ```text
//! <base>/<dataset>/videos/chunk-000/observation.images.<camera>/episode_*.mp4
//! <base>/<dataset>/data/chunk-000/episode_*.parquet
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

use crate::core::episode::{episode_parquet_name, next_episode_number};

const CAMERA_PREFIX: &str = "observation.images.";

/// Resolved paths for one dataset.
#[derive(Debug, Clone)]
pub struct DatasetLayout {
    pub name: String,
    pub videos_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl DatasetLayout {
    /// Locate a dataset under `base`, failing when either chunk directory is
    /// missing.
    pub fn discover(base: &Path, name: &str) -> Result<Self> {
        let root = base.join(name);
        let videos_dir = root.join("videos").join("chunk-000");
        let data_dir = root.join("data").join("chunk-000");
        if !videos_dir.is_dir() {
            return Err(anyhow!("videos path not found: {}", videos_dir.display()));
        }
        if !data_dir.is_dir() {
            return Err(anyhow!("data path not found: {}", data_dir.display()));
        }
        Ok(Self {
            name: name.to_string(),
            videos_dir,
            data_dir,
        })
    }

    /// Camera folders (`observation.images.*`), sorted by name for
    /// deterministic traversal.
    pub fn camera_dirs(&self) -> Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        let entries = fs::read_dir(&self.videos_dir)
            .with_context(|| format!("read {}", self.videos_dir.display()))?;
        for entry in entries {
            let entry = entry.context("read videos dir entry")?;
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if path.is_dir() && name.starts_with(CAMERA_PREFIX) {
                dirs.push(path);
            }
        }
        dirs.sort();
        Ok(dirs)
    }
}

/// Next free episode number in a camera folder.
pub fn next_episode_in(camera_dir: &Path) -> Result<u32> {
    let entries =
        fs::read_dir(camera_dir).with_context(|| format!("read {}", camera_dir.display()))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.context("read camera dir entry")?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(next_episode_number(names.iter().map(String::as_str)))
}

/// Check that the first `count` source episodes have parquet sidecars.
pub fn validate_source_episodes(data_dir: &Path, count: u32) -> Result<()> {
    for number in 0..count {
        let path = data_dir.join(episode_parquet_name(number));
        if !path.exists() {
            return Err(anyhow!(
                "source episode {number:06} not found: {}",
                path.display()
            ));
        }
    }
    Ok(())
}

/// Copy the parquet sidecar from a source episode to a destination episode.
///
/// A missing source is logged and reported as `false`; the caller decides
/// whether that is fatal.
pub fn copy_parquet(data_dir: &Path, src: u32, dest: u32) -> Result<bool> {
    let src_path = data_dir.join(episode_parquet_name(src));
    let dest_path = data_dir.join(episode_parquet_name(dest));
    if !src_path.exists() {
        warn!(src = %src_path.display(), "source parquet file not found");
        return Ok(false);
    }
    fs::copy(&src_path, &dest_path).with_context(|| {
        format!(
            "copy parquet {} -> {}",
            src_path.display(),
            dest_path.display()
        )
    })?;
    info!(src = %src_path.display(), dest = %dest_path.display(), "copied parquet sidecar");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scaffold(temp: &Path, dataset: &str, cameras: &[&str], episodes: u32) {
        let videos = temp.join(dataset).join("videos").join("chunk-000");
        let data = temp.join(dataset).join("data").join("chunk-000");
        fs::create_dir_all(&data).expect("create data dir");
        for camera in cameras {
            let dir = videos.join(format!("{CAMERA_PREFIX}{camera}"));
            fs::create_dir_all(&dir).expect("create camera dir");
            for n in 0..episodes {
                fs::write(dir.join(crate::core::episode::episode_video_name(n)), b"v")
                    .expect("write video");
            }
        }
        for n in 0..episodes {
            fs::write(data.join(episode_parquet_name(n)), b"p").expect("write parquet");
        }
    }

    #[test]
    fn discover_requires_both_chunk_dirs() {
        let temp = tempfile::tempdir().expect("tempdir");
        scaffold(temp.path(), "stack_rings", &["top"], 1);
        assert!(DatasetLayout::discover(temp.path(), "stack_rings").is_ok());
        assert!(DatasetLayout::discover(temp.path(), "missing").is_err());
    }

    #[test]
    fn camera_dirs_are_sorted_and_filtered() {
        let temp = tempfile::tempdir().expect("tempdir");
        scaffold(temp.path(), "ds", &["wrist", "overhead"], 1);
        let layout = DatasetLayout::discover(temp.path(), "ds").expect("layout");
        fs::create_dir_all(layout.videos_dir.join("not-a-camera")).expect("extra dir");

        let cameras = layout.camera_dirs().expect("cameras");
        let names: Vec<String> = cameras
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "observation.images.overhead".to_string(),
                "observation.images.wrist".to_string()
            ]
        );
    }

    #[test]
    fn next_episode_counts_existing_videos() {
        let temp = tempfile::tempdir().expect("tempdir");
        scaffold(temp.path(), "ds", &["top"], 3);
        let layout = DatasetLayout::discover(temp.path(), "ds").expect("layout");
        let cameras = layout.camera_dirs().expect("cameras");
        assert_eq!(next_episode_in(&cameras[0]).expect("next"), 3);
    }

    #[test]
    fn copy_parquet_reports_missing_source() {
        let temp = tempfile::tempdir().expect("tempdir");
        scaffold(temp.path(), "ds", &["top"], 2);
        let layout = DatasetLayout::discover(temp.path(), "ds").expect("layout");

        assert!(copy_parquet(&layout.data_dir, 0, 5).expect("copy"));
        assert!(layout.data_dir.join(episode_parquet_name(5)).exists());
        assert!(!copy_parquet(&layout.data_dir, 9, 10).expect("copy missing"));
    }

    #[test]
    fn validate_source_episodes_fails_on_gap() {
        let temp = tempfile::tempdir().expect("tempdir");
        scaffold(temp.path(), "ds", &["top"], 2);
        let layout = DatasetLayout::discover(temp.path(), "ds").expect("layout");

        assert!(validate_source_episodes(&layout.data_dir, 2).is_ok());
        assert!(validate_source_episodes(&layout.data_dir, 3).is_err());
    }
}
