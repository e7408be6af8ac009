use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Kind of media implied by a file's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    /// Map a lower-cased extension (without the dot) to a supported kind.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "jpg" => Some(MediaKind::Photo),
            "mp4" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    /// Where the file currently lives
    pub path: PathBuf,
    /// The name as it exists on disk; destinations are built from this
    pub file_name: OsString,
    /// Lossy UTF-8 form of the name, for date parsing and reports
    pub filename: String,
    /// Lower-cased extension without the dot ("" when absent)
    pub extension: String,
    /// File size in bytes (informational)
    pub size: u64,
}

impl MediaFile {
    pub fn new(path: PathBuf, size: u64) -> Self {
        let file_name = path.file_name().map(OsString::from).unwrap_or_default();
        let filename = file_name.to_string_lossy().into_owned();
        let extension = Path::new(&file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        Self {
            path,
            file_name,
            filename,
            extension,
            size,
        }
    }

    /// Build from a path on disk, reading its size.
    pub fn from_path(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let size = fs::metadata(&path)?.len();
        Ok(Self::new(path, size))
    }

    pub fn kind(&self) -> Option<MediaKind> {
        MediaKind::from_extension(&self.extension)
    }
}
