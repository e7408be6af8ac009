use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::date::ResolutionOutcome;
use crate::media::{MediaFile, MediaKind};

/// Destination bucket for a processed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Photo,
    Video,
    Failed,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Photo, Category::Video, Category::Failed];

    /// Folder name under the output root
    pub fn folder(self) -> &'static str {
        match self {
            Category::Photo => "photos",
            Category::Video => "videos",
            Category::Failed => "failed",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder())
    }
}

/// A failed resolution always lands in `Failed`; a resolved file goes by its
/// extension, and unknown extensions fail as unsupported.
pub fn classify(file: &MediaFile, outcome: &ResolutionOutcome) -> Category {
    if !outcome.is_resolved() {
        return Category::Failed;
    }
    match file.kind() {
        Some(MediaKind::Photo) => Category::Photo,
        Some(MediaKind::Video) => Category::Video,
        None => Category::Failed,
    }
}

pub fn destination_dir(output_root: &Path, category: Category) -> PathBuf {
    output_root.join(category.folder())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::{DateCandidate, DateSource};
    use crate::error::FailureReason;

    fn resolved() -> ResolutionOutcome {
        ResolutionOutcome::Resolved {
            date: DateCandidate::from_ymd(2023, 6, 15).unwrap(),
            source: DateSource::Filename,
        }
    }

    fn file(name: &str) -> MediaFile {
        MediaFile::new(PathBuf::from(name), 0)
    }

    #[test]
    fn test_resolved_files_follow_extension() {
        assert_eq!(classify(&file("IMG-20230615-beach.jpg"), &resolved()), Category::Photo);
        assert_eq!(classify(&file("IMG-20230615-beach.JPG"), &resolved()), Category::Photo);
        assert_eq!(classify(&file("VID-20230615-WA0001.mp4"), &resolved()), Category::Video);
        assert_eq!(classify(&file("IMG-20230615-anim.gif"), &resolved()), Category::Failed);
    }

    #[test]
    fn test_failed_outcome_wins_over_extension() {
        let failed = ResolutionOutcome::failed(FailureReason::NoDateFound);
        assert_eq!(classify(&file("a.jpg"), &failed), Category::Failed);
        assert_eq!(classify(&file("a.mp4"), &failed), Category::Failed);
        assert_eq!(classify(&file("a.gif"), &failed), Category::Failed);
    }

    #[test]
    fn test_destination_dirs() {
        let root = Path::new("output");
        assert_eq!(destination_dir(root, Category::Photo), root.join("photos"));
        assert_eq!(destination_dir(root, Category::Video), root.join("videos"));
        assert_eq!(destination_dir(root, Category::Failed), root.join("failed"));
    }
}
