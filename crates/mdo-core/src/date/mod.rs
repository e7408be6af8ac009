pub mod exif;
pub mod filename;
pub mod metadata;

use std::fmt;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use tracing::debug;

use crate::error::FailureReason;
use crate::media::MediaFile;
use filename::FilenameDate;
use metadata::{MetadataDate, MetadataSource};

/// Every canonical date is stamped at this local time of day.
pub const CANONICAL_HOUR: u32 = 15;

/// A calendar date decided for a file, without time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DateCandidate(NaiveDate);

impl DateCandidate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The date at 15:00:00, as a naive (wall clock) timestamp.
    pub fn canonical(&self) -> NaiveDateTime {
        self.0.and_time(canonical_time())
    }

    /// The canonical timestamp in the local timezone, or `None` if the local
    /// clock skips that instant. An ambiguous instant resolves to the earlier one.
    pub fn local_timestamp(&self) -> Option<DateTime<Local>> {
        self.canonical().and_local_timezone(Local).earliest()
    }
}

fn canonical_time() -> NaiveTime {
    NaiveTime::from_hms_opt(CANONICAL_HOUR, 0, 0).unwrap_or_default()
}

impl fmt::Display for DateCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Where a resolved date came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "from", rename_all = "lowercase")]
pub enum DateSource {
    Filename,
    Metadata { field: &'static str },
}

impl fmt::Display for DateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateSource::Filename => write!(f, "filename"),
            DateSource::Metadata { field } => write!(f, "metadata {field}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ResolutionOutcome {
    Resolved {
        date: DateCandidate,
        source: DateSource,
    },
    Failed {
        reason: FailureReason,
    },
}

impl ResolutionOutcome {
    pub fn failed(reason: FailureReason) -> Self {
        ResolutionOutcome::Failed { reason }
    }

    pub fn date(&self) -> Option<DateCandidate> {
        match self {
            ResolutionOutcome::Resolved { date, .. } => Some(*date),
            ResolutionOutcome::Failed { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolutionOutcome::Resolved { .. })
    }
}

/// Decide the canonical date of a file.
///
/// The filename is tried first. A date pattern holding an impossible date
/// fails the file outright; metadata is only consulted when the filename has
/// no date pattern at all.
pub fn resolve_date(file: &MediaFile, source: &dyn MetadataSource) -> ResolutionOutcome {
    let outcome = match filename::parse_filename_date(&file.filename) {
        FilenameDate::Found(date) => ResolutionOutcome::Resolved {
            date,
            source: DateSource::Filename,
        },
        FilenameDate::Invalid(raw) => ResolutionOutcome::failed(FailureReason::InvalidDate(raw)),
        FilenameDate::NoPattern => match metadata::read_metadata_date(source, &file.path) {
            MetadataDate::Found { date, field } => ResolutionOutcome::Resolved {
                date,
                source: DateSource::Metadata { field },
            },
            MetadataDate::NotFound => ResolutionOutcome::failed(FailureReason::NoDateFound),
            MetadataDate::ToolError(e) => {
                ResolutionOutcome::failed(FailureReason::MetadataTool(e.to_string()))
            }
        },
    };

    debug!(file = %file.filename, ?outcome, "resolved date");
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use chrono::Timelike;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Metadata source that counts queries and answers with a fixed response.
    struct Spy {
        calls: AtomicUsize,
        response: Option<&'static str>,
        fail: bool,
    }

    impl Spy {
        fn answering(value: Option<&'static str>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                response: value,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                response: None,
                fail: true,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl MetadataSource for Spy {
        fn query(&self, _path: &Path) -> Result<metadata::MetadataFields, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ToolError::Status {
                    status: "exit status: 1".to_string(),
                    stderr: "Error: File format error".to_string(),
                });
            }
            let mut fields = metadata::MetadataFields::new();
            if let Some(v) = self.response {
                fields.insert("DateTimeOriginal".to_string(), v.to_string());
            }
            Ok(fields)
        }
    }

    fn file(name: &str) -> MediaFile {
        MediaFile::new(PathBuf::from(name), 0)
    }

    #[test]
    fn test_canonical_time_is_three_pm() {
        let date = DateCandidate::from_ymd(2023, 6, 15).unwrap();
        assert_eq!(date.canonical().to_string(), "2023-06-15 15:00:00");
        assert_eq!(date.to_string(), "2023-06-15");

        let local = date.local_timestamp().unwrap();
        assert_eq!(local.hour(), 15);
        assert_eq!(local.date_naive(), date.date());
    }

    #[test]
    fn test_filename_date_wins() {
        let spy = Spy::answering(Some("2001:01:01 00:00:00"));
        let outcome = resolve_date(&file("IMG-20230615-beach.jpg"), &spy);
        assert_eq!(
            outcome,
            ResolutionOutcome::Resolved {
                date: DateCandidate::from_ymd(2023, 6, 15).unwrap(),
                source: DateSource::Filename,
            }
        );
        assert_eq!(spy.calls(), 0);
    }

    /// Intentional policy: an impossible filename date is a hard failure and
    /// is never replaced by a metadata date, even when metadata has one.
    #[test]
    fn test_invalid_filename_date_blocks_metadata_fallback() {
        let spy = Spy::answering(Some("2023:02:28 10:00:00"));
        let outcome = resolve_date(&file("IMG-20230231-x.jpg"), &spy);
        assert_eq!(
            outcome,
            ResolutionOutcome::failed(FailureReason::InvalidDate("20230231".to_string()))
        );
        assert_eq!(spy.calls(), 0);
    }

    #[test]
    fn test_metadata_fallback() {
        let spy = Spy::answering(Some("2022:01:01 09:30:00"));
        let outcome = resolve_date(&file("clip001.mp4"), &spy);
        assert_eq!(
            outcome,
            ResolutionOutcome::Resolved {
                date: DateCandidate::from_ymd(2022, 1, 1).unwrap(),
                source: DateSource::Metadata {
                    field: "DateTimeOriginal"
                },
            }
        );
        assert_eq!(spy.calls(), 1);
    }

    #[test]
    fn test_metadata_without_date() {
        let spy = Spy::answering(None);
        let outcome = resolve_date(&file("clip003.mp4"), &spy);
        assert_eq!(outcome, ResolutionOutcome::failed(FailureReason::NoDateFound));
    }

    #[test]
    fn test_metadata_tool_error() {
        let spy = Spy::failing();
        let outcome = resolve_date(&file("clip002.mp4"), &spy);
        match outcome {
            ResolutionOutcome::Failed {
                reason: FailureReason::MetadataTool(msg),
            } => assert!(msg.contains("File format error")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(spy.calls(), 1);
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let spy = Spy::answering(Some("2022:01:01 09:30:00"));
        for name in ["IMG-20230615-beach.jpg", "IMG-20230231-x.jpg", "clip001.mp4"] {
            let first = resolve_date(&file(name), &spy);
            let second = resolve_date(&file(name), &spy);
            assert_eq!(first, second);
        }
    }
}
