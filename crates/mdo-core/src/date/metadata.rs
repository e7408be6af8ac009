use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;

use super::DateCandidate;
use crate::error::ToolError;

/// Tag name -> raw value, as reported by a metadata source.
pub type MetadataFields = BTreeMap<String, String>;

/// Date fields consulted in priority order; the first one that parses wins.
pub const DATE_FIELDS: &[&str] = &["CreateDate", "DateTimeOriginal", "FileModifyDate"];

/// Anything that can report embedded date fields for a file.
pub trait MetadataSource: Send + Sync {
    fn query(&self, path: &Path) -> Result<MetadataFields, ToolError>;
}

#[derive(Debug)]
pub enum MetadataDate {
    Found {
        date: DateCandidate,
        field: &'static str,
    },
    /// The source answered but none of the date fields held a usable date.
    NotFound,
    ToolError(ToolError),
}

pub fn read_metadata_date(source: &dyn MetadataSource, path: &Path) -> MetadataDate {
    let fields = match source.query(path) {
        Ok(fields) => fields,
        Err(e) => return MetadataDate::ToolError(e),
    };

    for &field in DATE_FIELDS {
        if let Some(date) = fields.get(field).and_then(|v| parse_metadata_date(v)) {
            return MetadataDate::Found { date, field };
        }
    }

    MetadataDate::NotFound
}

/// Parse the date part of an exiftool/EXIF style value such as
/// `2022:01:01 10:00:00+01:00`. Time of day and timezone are dropped.
pub fn parse_metadata_date(value: &str) -> Option<DateCandidate> {
    let date_part = value.trim().split([' ', 'T']).next()?;
    let cleaned = date_part.replace(['-', '/', '\\', '.'], ":");
    NaiveDate::parse_from_str(&cleaned, "%Y:%m:%d")
        .ok()
        .map(DateCandidate::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(Result<Vec<(&'static str, &'static str)>, &'static str>);

    impl MetadataSource for Canned {
        fn query(&self, _path: &Path) -> Result<MetadataFields, ToolError> {
            match &self.0 {
                Ok(pairs) => Ok(pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()),
                Err(msg) => Err(ToolError::Output(msg.to_string())),
            }
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> DateCandidate {
        DateCandidate::from_ymd(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_metadata_values() {
        assert_eq!(parse_metadata_date("2022:01:01 10:00:00"), Some(ymd(2022, 1, 1)));
        assert_eq!(parse_metadata_date("2022:01:01 10:00:00+01:00"), Some(ymd(2022, 1, 1)));
        assert_eq!(parse_metadata_date("2016-05-04 03:02:01"), Some(ymd(2016, 5, 4)));
        assert_eq!(parse_metadata_date("2016-05-04T03:02:01Z"), Some(ymd(2016, 5, 4)));
        assert_eq!(parse_metadata_date(" 2019:07:08 "), Some(ymd(2019, 7, 8)));
        assert_eq!(parse_metadata_date("0000:00:00 00:00:00"), None);
        assert_eq!(parse_metadata_date("2023:02:30 12:00:00"), None);
        assert_eq!(parse_metadata_date(""), None);
        assert_eq!(parse_metadata_date("yesterday"), None);
    }

    #[test]
    fn test_field_priority() {
        let source = Canned(Ok(vec![
            ("FileModifyDate", "2024:03:03 08:00:00+00:00"),
            ("DateTimeOriginal", "2021:02:02 08:00:00"),
            ("CreateDate", "2020:01:01 08:00:00"),
        ]));
        match read_metadata_date(&source, Path::new("a.jpg")) {
            MetadataDate::Found { date, field } => {
                assert_eq!(date, ymd(2020, 1, 1));
                assert_eq!(field, "CreateDate");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unparseable_field_falls_through() {
        let source = Canned(Ok(vec![
            ("CreateDate", "0000:00:00 00:00:00"),
            ("DateTimeOriginal", "garbage"),
            ("FileModifyDate", "2024:03:03 08:00:00+00:00"),
        ]));
        match read_metadata_date(&source, Path::new("a.mp4")) {
            MetadataDate::Found { date, field } => {
                assert_eq!(date, ymd(2024, 3, 3));
                assert_eq!(field, "FileModifyDate");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_no_usable_fields() {
        let source = Canned(Ok(vec![("ModifyDate", "2024:03:03 08:00:00")]));
        assert!(matches!(
            read_metadata_date(&source, Path::new("a.mp4")),
            MetadataDate::NotFound
        ));
    }

    #[test]
    fn test_tool_error_is_reported() {
        let source = Canned(Err("boom"));
        assert!(matches!(
            read_metadata_date(&source, Path::new("a.mp4")),
            MetadataDate::ToolError(ToolError::Output(_))
        ));
    }
}
