use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, Local};
use exif::{In, Reader, Tag};

use super::metadata::{MetadataFields, MetadataSource};
use crate::error::ToolError;

/// EXIF tags read in-process, named after the exiftool fields they correspond to.
/// Only tags that feed the date priority list are read.
const EXIF_TAGS: &[(Tag, &str)] = &[
    (Tag::DateTimeDigitized, "CreateDate"),
    (Tag::DateTimeOriginal, "DateTimeOriginal"),
];

/// Metadata source that reads EXIF with kamadak-exif instead of spawning exiftool.
/// Files without an EXIF block (e.g. MP4) only report `FileModifyDate`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifReader;

impl MetadataSource for ExifReader {
    fn query(&self, path: &Path) -> Result<MetadataFields, ToolError> {
        let file = File::open(path)?;
        let modified = file.metadata()?.modified()?;

        let mut fields = MetadataFields::new();
        match Reader::new().read_from_container(&mut BufReader::new(&file)) {
            Ok(exif) => {
                for (tag, name) in EXIF_TAGS {
                    if let Some(field) = exif.get_field(*tag, In::PRIMARY) {
                        fields.insert(name.to_string(), field.display_value().to_string());
                    }
                }
            }
            Err(exif::Error::Io(e)) => return Err(ToolError::Io(e)),
            // No (or unreadable) EXIF container is not an error, just no embedded dates
            Err(_) => {}
        }

        let modified: DateTime<Local> = modified.into();
        fields.insert(
            "FileModifyDate".to_string(),
            modified.format("%Y:%m:%d %H:%M:%S%:z").to_string(),
        );

        Ok(fields)
    }
}
