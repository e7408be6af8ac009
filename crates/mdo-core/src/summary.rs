use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

use crate::classify::Category;
use crate::date::{DateCandidate, DateSource, ResolutionOutcome};
use crate::error::FailureReason;
use crate::media::{MediaFile, MediaKind};

/// Plain-text report written under the output root
pub const SUMMARY_FILENAME: &str = "summary.txt";
/// Machine-readable report, written on request
pub const SUMMARY_JSON_FILENAME: &str = "summary.json";

/// One processed file. Never changed once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunRecord {
    pub filename: String,
    pub kind: Option<MediaKind>,
    pub category: Category,
    pub outcome: ResolutionOutcome,
    /// Where the file ended up; `None` if it could not be moved at all
    pub destination: Option<PathBuf>,
}

impl RunRecord {
    pub fn succeeded(&self) -> bool {
        self.category != Category::Failed
    }

    /// The date a file was organized under, or why it failed. A resolved
    /// file can still fail on an unsupported extension.
    pub fn result(&self) -> Result<(DateCandidate, &DateSource), FailureReason> {
        match (&self.outcome, self.category) {
            (ResolutionOutcome::Failed { reason }, _) => Err(reason.clone()),
            (ResolutionOutcome::Resolved { .. }, Category::Failed) => {
                let ext = self
                    .filename
                    .rsplit_once('.')
                    .map(|(_, ext)| ext.to_lowercase())
                    .unwrap_or_default();
                Err(FailureReason::UnsupportedFormat(ext))
            }
            (ResolutionOutcome::Resolved { date, source }, _) => Ok((*date, source)),
        }
    }

    pub fn failure(&self) -> Option<FailureReason> {
        self.result().err()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub photos: u64,
    pub succeeded_photos: u64,
    pub videos: u64,
    pub succeeded_videos: u64,
}

impl Counts {
    /// Recompute counts from scratch over a record sequence.
    pub fn tally<'a>(records: impl IntoIterator<Item = &'a RunRecord>) -> Self {
        let mut counts = Counts::default();
        for record in records {
            counts.add(record);
        }
        counts
    }

    fn add(&mut self, record: &RunRecord) {
        self.total += 1;
        if record.succeeded() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        match record.kind {
            Some(MediaKind::Photo) => self.photos += 1,
            Some(MediaKind::Video) => self.videos += 1,
            None => {}
        }
        match record.category {
            Category::Photo => self.succeeded_photos += 1,
            Category::Video => self.succeeded_videos += 1,
            Category::Failed => {}
        }
    }
}

/// Accumulates per-file outcomes in processing order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    counts: Counts,
    records: Vec<RunRecord>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &mut self,
        file: &MediaFile,
        category: Category,
        outcome: ResolutionOutcome,
        destination: Option<PathBuf>,
    ) -> &RunRecord {
        let record = RunRecord {
            filename: file.filename.clone(),
            kind: file.kind(),
            category,
            outcome,
            destination,
        };
        self.counts.add(&record);
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    pub fn counts(&self) -> Counts {
        self.counts
    }

    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    pub fn render(&self) -> String {
        let c = &self.counts;
        let mut out = String::new();

        // Writing into a String cannot fail
        let _ = writeln!(out, "File Processing Summary");
        let _ = writeln!(out, "=======================");
        let _ = writeln!(out);
        let _ = writeln!(out, "Total files processed: {}", c.total);
        let _ = writeln!(out, "Successfully processed: {}", c.succeeded);
        let _ = writeln!(out, "Failed: {}", c.failed);
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Photos processed: {}/{} (Failed: {})",
            c.succeeded_photos,
            c.photos,
            c.photos.saturating_sub(c.succeeded_photos)
        );
        let _ = writeln!(
            out,
            "Videos processed: {}/{} (Failed: {})",
            c.succeeded_videos,
            c.videos,
            c.videos.saturating_sub(c.succeeded_videos)
        );

        if !self.records.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Files:");
            let _ = writeln!(out, "------");
            for record in &self.records {
                let _ = writeln!(out, "{}", render_line(record));
            }
        }

        out
    }

    pub fn write_report(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.render())
    }

    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let writer = BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        );
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

fn render_line(record: &RunRecord) -> String {
    match record.result() {
        Ok((date, source)) => format!(
            "[OK] {} -> {} ({}, from {})",
            record.filename, record.category, date, source
        ),
        Err(reason) => format!("[X] {} -> {}: {}", record.filename, record.category, reason),
    }
}
