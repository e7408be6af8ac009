use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use super::DateCandidate;

/// `<prefix>-YYYYMMDD-<suffix>`, matched against the filename without extension.
/// Neither prefix nor suffix may contain the `-` separator.
static FILENAME_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^-]+-(?P<year>\d{4})(?P<month>\d{2})(?P<day>\d{2})-[^-]+$").unwrap()
});

/// Result of looking for a date in a filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilenameDate {
    /// Pattern matched and the date exists in the calendar.
    Found(DateCandidate),
    /// No date pattern in the name; metadata should be tried next.
    NoPattern,
    /// Pattern matched but the date is impossible (e.g. Feb 30). Terminal.
    Invalid(String),
}

pub fn parse_filename_date(filename: &str) -> FilenameDate {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);

    let Some(caps) = FILENAME_DATE_RE.captures(stem) else {
        return FilenameDate::NoPattern;
    };

    let raw = format!("{}{}{}", &caps["year"], &caps["month"], &caps["day"]);
    let parsed = (
        caps["year"].parse::<i32>(),
        caps["month"].parse::<u32>(),
        caps["day"].parse::<u32>(),
    );
    match parsed {
        (Ok(year), Ok(month), Ok(day)) => match DateCandidate::from_ymd(year, month, day) {
            Some(date) => FilenameDate::Found(date),
            None => FilenameDate::Invalid(raw),
        },
        _ => FilenameDate::Invalid(raw),
    }
}
