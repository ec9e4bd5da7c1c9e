//! Multi-volume RAR detection.
//!
//! Split RAR sets are named `basename.partN.rar`, the first volume being
//! `basename.part1.rar`. The external tools must be pointed at the first
//! volume and need every sibling next to it.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::natsort::natural_sort_by_key;

const MULTI_VOLUME_EXT: &str = "rar";

fn multi_part_re() -> &'static Regex {
    static MULTI_PART_RE: OnceLock<Regex> = OnceLock::new();
    MULTI_PART_RE.get_or_init(|| {
        Regex::new(r"(?i)^(.+)\.part([0-9]+)(\.rar)$").expect("valid multi-part regex")
    })
}

/// Volume resolution errors
#[derive(Debug, thiserror::Error)]
pub enum VolumeError {
    #[error("failed to resolve absolute path of {}: {source}", path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The files making up the archive a path belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSet {
    /// True for a `basename.partN.rar` set
    pub is_multi_volume: bool,
    /// Absolute path of the volume to hand to the tool
    pub first_volume: PathBuf,
    /// All volumes found on disk, in natural order
    pub volumes: Vec<PathBuf>,
}

impl VolumeSet {
    pub fn volume_count(&self) -> usize {
        self.volumes.len()
    }
}

/// Work out which volume set `path` belongs to.
///
/// Anything that is not a `.rar` named `basename.partN.rar` is its own single
/// volume. Failing to list siblings is not an error; only turning the first
/// volume into an absolute path can fail.
pub fn resolve(path: impl AsRef<Path>) -> Result<VolumeSet, VolumeError> {
    let path = path.as_ref();

    let is_rar = path
        .extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(MULTI_VOLUME_EXT))
        .unwrap_or(false);

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let captures = if is_rar {
        multi_part_re().captures(&file_name)
    } else {
        None
    };

    let Some(captures) = captures else {
        return Ok(VolumeSet {
            is_multi_volume: false,
            first_volume: absolute(path)?,
            volumes: vec![path.to_path_buf()],
        });
    };

    let base = &captures[1];
    let ext = &captures[3];
    let dir = path.parent().unwrap_or_else(|| Path::new(""));

    let first_volume = dir.join(format!("{}.part1{}", base, ext));
    let mut volumes = find_siblings(dir, base, ext);
    natural_sort_by_key(&mut volumes, |p| p.to_string_lossy().into_owned());

    debug!(
        "Multi-volume archive {} has {} volumes on disk",
        first_volume.display(),
        volumes.len()
    );

    Ok(VolumeSet {
        is_multi_volume: true,
        first_volume: absolute(&first_volume)?,
        volumes,
    })
}

/// Glob `<dir>/<base>.part*<ext>`; errors just shorten the list.
fn find_siblings(dir: &Path, base: &str, ext: &str) -> Vec<PathBuf> {
    let dir_pattern = glob::Pattern::escape(&dir.to_string_lossy());
    let name_pattern = format!(
        "{}.part*{}",
        glob::Pattern::escape(base),
        glob::Pattern::escape(ext)
    );
    let pattern = Path::new(&dir_pattern).join(name_pattern);

    match glob::glob(&pattern.to_string_lossy()) {
        Ok(paths) => paths.filter_map(|entry| entry.ok()).collect(),
        Err(e) => {
            debug!("Invalid volume glob {}: {}", pattern.display(), e);
            Vec::new()
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf, VolumeError> {
    std::path::absolute(path).map_err(|source| VolumeError::Resolve {
        path: path.to_path_buf(),
        source,
    })
}
