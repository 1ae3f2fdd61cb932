//! Episode file naming and numbering.
//!
//! Robot-learning datasets store one file per episode, zero-padded to six
//! digits: `episode_000042.mp4` next to `episode_000042.parquet`. New
//! synthetic episodes are appended after the highest existing number.

use std::sync::LazyLock;

use regex::Regex;

static EPISODE_VIDEO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^episode_(\d+)\.mp4$").unwrap());

/// Video file name for an episode number.
pub fn episode_video_name(number: u32) -> String {
    format!("episode_{number:06}.mp4")
}

/// Parquet file name for an episode number.
pub fn episode_parquet_name(number: u32) -> String {
    format!("episode_{number:06}.parquet")
}

/// Save-name stem for an episode (the external program appends `.mp4` itself).
pub fn episode_stem(number: u32) -> String {
    format!("episode_{number:06}")
}

/// Next free episode number given the file names in a camera folder.
///
/// Names that do not match `episode_<digits>.mp4` are skipped. Returns 0 when
/// nothing parses.
pub fn next_episode_number<'a>(file_names: impl IntoIterator<Item = &'a str>) -> u32 {
    file_names
        .into_iter()
        .filter_map(|name| {
            EPISODE_VIDEO_RE
                .captures(name)
                .and_then(|caps| caps[1].parse::<u32>().ok())
        })
        .max()
        .map_or(0, |max| max + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_zero_padded() {
        assert_eq!(episode_video_name(0), "episode_000000.mp4");
        assert_eq!(episode_parquet_name(42), "episode_000042.parquet");
        assert_eq!(episode_stem(7), "episode_000007");
    }

    #[test]
    fn empty_folder_starts_at_zero() {
        assert_eq!(next_episode_number([]), 0);
    }

    #[test]
    fn next_number_is_max_plus_one() {
        let names = ["episode_000000.mp4", "episode_000005.mp4", "episode_000002.mp4"];
        assert_eq!(next_episode_number(names), 6);
    }

    #[test]
    fn non_conforming_names_are_skipped() {
        let names = [
            "episode_000001.mp4",
            "episode_abc.mp4",
            "episode_000003.parquet",
            "notes.txt",
        ];
        assert_eq!(next_episode_number(names), 2);
    }
}
