use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

use crate::media::MediaFile;

/// List the supported media files directly inside `dir`, sorted by filename.
/// Subdirectories are not entered, so an output tree under `dir` is never re-scanned.
pub fn scan_media(dir: &Path) -> io::Result<Vec<MediaFile>> {
    let mut media = Vec::new();

    for entry in fs::read_dir(dir)? {
        // Only failing to list the directory is fatal; a single bad entry is skipped
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        // fs::metadata follows symlinks, so a link to a photo counts as a photo
        let meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping entry");
                continue;
            }
        };
        if !meta.is_file() {
            continue;
        }

        let file = MediaFile::new(path, meta.len());
        if file.kind().is_none() {
            continue;
        }
        media.push(file);
    }

    media.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    debug!(dir = %dir.display(), count = media.len(), "scanned media files");
    Ok(media)
}
