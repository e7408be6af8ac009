use chrono::{DateTime, Local};
use filetime::FileTime;

use crate::date::DateCandidate;
use crate::error::StampError;
use crate::media::MediaFile;

/// Writes a resolved timestamp onto a file.
pub trait Stamper: Send + Sync {
    fn stamp(&self, file: &MediaFile, at: DateTime<Local>) -> Result<(), StampError>;
}

/// Sets access and modification times through the filesystem only.
/// Creation time is left alone since it cannot be set portably.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTimeStamper;

impl Stamper for FileTimeStamper {
    fn stamp(&self, file: &MediaFile, at: DateTime<Local>) -> Result<(), StampError> {
        let ft = FileTime::from_unix_time(at.timestamp(), 0);
        filetime::set_file_times(&file.path, ft, ft)?;
        Ok(())
    }
}

/// Stamp `file` with `date` at 15:00 local time. Returns the timestamp written.
pub fn apply_timestamp(
    stamper: &dyn Stamper,
    file: &MediaFile,
    date: DateCandidate,
) -> Result<DateTime<Local>, StampError> {
    let at = date
        .local_timestamp()
        .ok_or_else(|| StampError::NonexistentLocalTime(date.canonical()))?;
    stamper.stamp(file, at)?;
    Ok(at)
}
