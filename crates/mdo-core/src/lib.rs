pub mod classify;
pub mod date;
pub mod error;
pub mod exiftool;
pub mod media;
pub mod scan;
pub mod stamp;
pub mod summary;
pub mod writer;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use classify::Category;
pub use date::metadata::MetadataSource;
pub use date::{DateCandidate, DateSource, ResolutionOutcome};
pub use error::{FailureReason, StampError, ToolError};
pub use media::{MediaFile, MediaKind};
pub use stamp::Stamper;
pub use summary::{Counts, RunRecord, RunSummary, SUMMARY_FILENAME, SUMMARY_JSON_FILENAME};

fn default_input() -> PathBuf {
    PathBuf::from(".")
}

fn default_output() -> PathBuf {
    PathBuf::from("output")
}

fn default_tool_timeout() -> u64 {
    30
}

/// Where embedded dates are read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataBackend {
    /// Spawn exiftool per file
    #[default]
    ExifTool,
    /// Read EXIF in-process; videos only get the filesystem modify date
    Exif,
}

/// How resolved dates are written onto files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StampBackend {
    /// Rewrite embedded date tags and file dates with exiftool
    #[default]
    ExifTool,
    /// Only set filesystem access/modify times
    FileTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOptions {
    #[serde(default = "default_input")]
    pub input: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default)]
    pub metadata: MetadataBackend,
    #[serde(default)]
    pub stamp: StampBackend,
    /// Explicit exiftool binary; located automatically when absent
    #[serde(default)]
    pub exiftool: Option<PathBuf>,
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,
    /// Worker threads for date resolution (rayon default when absent)
    #[serde(default)]
    pub jobs: Option<usize>,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub json_report: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            input: default_input(),
            output: default_output(),
            metadata: MetadataBackend::default(),
            stamp: StampBackend::default(),
            exiftool: None,
            tool_timeout_secs: default_tool_timeout(),
            jobs: None,
            dry_run: false,
            json_report: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    pub counts: Counts,
    /// Path of the written text report (absent on dry runs)
    pub report: Option<PathBuf>,
    pub summary: RunSummary,
}

/// Type alias for progress callback
pub type ProgressCallback = dyn Fn(&str, u64, u64, &str) + Send + Sync;

/// Throttled progress reporter: emits at most every 200ms or on completion.
pub struct ThrottledProgress<'a> {
    inner: &'a ProgressCallback,
    last_emit: std::sync::Mutex<Instant>,
}

impl<'a> ThrottledProgress<'a> {
    pub fn new(inner: &'a ProgressCallback) -> Self {
        Self {
            inner,
            last_emit: std::sync::Mutex::new(Instant::now() - Duration::from_secs(1)),
        }
    }

    pub fn report(&self, stage: &str, current: u64, total: u64, message: &str) {
        let is_done = current + 1 >= total;
        if !is_done {
            // A poisoned lock only means another reporter panicked; keep reporting
            let mut last = self
                .last_emit
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if last.elapsed().as_millis() < 200 {
                return;
            }
            *last = Instant::now();
        }
        (self.inner)(stage, current, total, message);
    }
}

/// Runs the resolve / classify / stamp / move pipeline over a set of files.
pub struct Organizer<'a> {
    metadata: &'a dyn MetadataSource,
    stamper: &'a dyn Stamper,
    output: PathBuf,
    dry_run: bool,
}

impl<'a> Organizer<'a> {
    pub fn new(
        metadata: &'a dyn MetadataSource,
        stamper: &'a dyn Stamper,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            metadata,
            stamper,
            output: output.into(),
            dry_run: false,
        }
    }

    /// Plan destinations without stamping or moving anything.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Process `files` in order. Every file yields exactly one record and no
    /// per-file failure stops the run.
    pub fn run(&self, files: &[MediaFile], progress: &ThrottledProgress) -> RunSummary {
        let total = files.len() as u64;

        // Resolution is pure per file, so it runs in parallel; collect keeps input order
        let counter = AtomicU64::new(0);
        let outcomes: Vec<ResolutionOutcome> = files
            .par_iter()
            .map(|file| {
                let outcome = date::resolve_date(file, self.metadata);
                let current = counter.fetch_add(1, Ordering::Relaxed);
                progress.report("date", current, total, &file.filename);
                outcome
            })
            .collect();

        let mut summary = RunSummary::new();
        let mut destinations = writer::Destinations::new();
        for (i, (file, outcome)) in files.iter().zip(outcomes).enumerate() {
            let (category, outcome, destination) = self.settle(file, outcome, &mut destinations);
            let record = summary.append(file, category, outcome, destination);
            if let Some(reason) = record.failure() {
                warn!(file = %record.filename, %reason, "file failed");
            }
            progress.report("organize", i as u64, total, &file.filename);
        }

        let counts = summary.counts();
        info!(
            total = counts.total,
            succeeded = counts.succeeded,
            failed = counts.failed,
            "run finished"
        );
        summary
    }

    /// Classify, stamp and move one file, downgrading the outcome when a
    /// later step fails.
    fn settle(
        &self,
        file: &MediaFile,
        mut outcome: ResolutionOutcome,
        destinations: &mut writer::Destinations,
    ) -> (Category, ResolutionOutcome, Option<PathBuf>) {
        let mut category = classify::classify(file, &outcome);

        if category != Category::Failed && !self.dry_run {
            if let Some(date) = outcome.date() {
                if let Err(e) = stamp::apply_timestamp(self.stamper, file, date) {
                    outcome =
                        ResolutionOutcome::failed(FailureReason::TimestampApply(e.to_string()));
                    category = Category::Failed;
                }
            }
        }

        let dir = classify::destination_dir(&self.output, category);
        let dest = destinations.assign(&dir, &file.file_name);
        if self.dry_run {
            return (category, outcome, Some(dest));
        }

        match writer::move_file(&file.path, &dest) {
            Ok(()) => (category, outcome, Some(dest)),
            Err(e) if category != Category::Failed => {
                let failed_dir = classify::destination_dir(&self.output, Category::Failed);
                let failed_dest = destinations.assign(&failed_dir, &file.file_name);
                let moved = self.move_to_failed(file, &failed_dest);
                (
                    Category::Failed,
                    ResolutionOutcome::failed(FailureReason::Move(e.to_string())),
                    moved,
                )
            }
            Err(e) => {
                warn!(file = %file.filename, error = %e, "could not move file to failed folder");
                (category, outcome, None)
            }
        }
    }

    fn move_to_failed(&self, file: &MediaFile, dest: &Path) -> Option<PathBuf> {
        match writer::move_file(&file.path, dest) {
            Ok(()) => Some(dest.to_path_buf()),
            Err(e) => {
                warn!(file = %file.filename, error = %e, "could not move file to failed folder");
                None
            }
        }
    }
}

/// Run the full pipeline over `options.input` with progress reporting.
pub fn process(
    options: &ProcessOptions,
    progress_callback: &ProgressCallback,
) -> anyhow::Result<ProcessResult> {
    let tp = ThrottledProgress::new(progress_callback);

    // The only fatal error: the input cannot be listed
    let files = scan::scan_media(&options.input)
        .with_context(|| format!("failed to read input directory {}", options.input.display()))?;
    info!(count = files.len(), input = %options.input.display(), "found media files");

    if !options.dry_run {
        writer::prepare_output(&options.output).with_context(|| {
            format!("failed to create output folders in {}", options.output.display())
        })?;
    }

    let timeout = Duration::from_secs(options.tool_timeout_secs);
    let needs_exiftool =
        options.metadata == MetadataBackend::ExifTool || options.stamp == StampBackend::ExifTool;
    let exiftool = needs_exiftool
        .then(|| exiftool::ExifTool::locate(options.exiftool.as_deref(), timeout));

    let exif_reader = date::exif::ExifReader;
    let metadata: &dyn MetadataSource = match (&exiftool, options.metadata) {
        (Some(tool), MetadataBackend::ExifTool) => tool,
        _ => &exif_reader,
    };
    let file_times = stamp::FileTimeStamper;
    let stamper: &dyn Stamper = match (&exiftool, options.stamp) {
        (Some(tool), StampBackend::ExifTool) => tool,
        _ => &file_times,
    };

    let organizer = Organizer::new(metadata, stamper, &options.output).dry_run(options.dry_run);
    let summary = match options.jobs {
        Some(jobs) => rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .context("failed to build worker pool")?
            .install(|| organizer.run(&files, &tp)),
        None => organizer.run(&files, &tp),
    };

    let mut report = None;
    if !options.dry_run {
        let report_path = options.output.join(SUMMARY_FILENAME);
        summary
            .write_report(&report_path)
            .with_context(|| format!("failed to write {}", report_path.display()))?;
        if options.json_report {
            let json_path = options.output.join(SUMMARY_JSON_FILENAME);
            summary
                .write_json(&json_path)
                .with_context(|| format!("failed to write {}", json_path.display()))?;
        }
        report = Some(report_path);
    }

    Ok(ProcessResult {
        counts: summary.counts(),
        report,
        summary,
    })
}
