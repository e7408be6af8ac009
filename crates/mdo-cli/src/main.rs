use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use mdo_core::{MetadataBackend, ProcessOptions, StampBackend};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "media-date-organiser",
    version,
    about = "Sort photos and videos into folders, stamping each with the date from its filename or metadata"
)]
struct Cli {
    /// Directory holding the .jpg/.mp4 files to organize [default: .]
    input: Option<PathBuf>,

    /// Output directory for photos/, videos/, failed/ and summary.txt [default: output]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON config file with default options; flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where embedded dates are read from
    #[arg(long, value_enum)]
    metadata: Option<MetadataArg>,

    /// How resolved dates are written onto files
    #[arg(long, value_enum)]
    stamp: Option<StampArg>,

    /// Path to the exiftool binary
    #[arg(long)]
    exiftool: Option<PathBuf>,

    /// Seconds to wait for a single exiftool call
    #[arg(long)]
    tool_timeout: Option<u64>,

    /// Worker threads for date lookup
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Show what would happen without stamping or moving anything
    #[arg(long)]
    dry_run: bool,

    /// Also write summary.json next to summary.txt
    #[arg(long)]
    json_report: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum MetadataArg {
    Exiftool,
    Exif,
}

#[derive(Clone, Copy, ValueEnum)]
enum StampArg {
    Exiftool,
    Filetime,
}

impl Cli {
    fn log_level(&self) -> Level {
        match (self.quiet, self.verbose) {
            (true, _) => Level::ERROR,
            (false, 0) => Level::WARN,
            (false, 1) => Level::DEBUG,
            (false, _) => Level::TRACE,
        }
    }

    /// Options from the config file (or defaults) with command-line flags applied on top.
    fn into_options(self) -> anyhow::Result<ProcessOptions> {
        let mut options = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("invalid config {}", path.display()))?
            }
            None => ProcessOptions::default(),
        };

        if let Some(input) = self.input {
            options.input = input;
        }
        if let Some(output) = self.output {
            options.output = output;
        }
        if let Some(metadata) = self.metadata {
            options.metadata = match metadata {
                MetadataArg::Exiftool => MetadataBackend::ExifTool,
                MetadataArg::Exif => MetadataBackend::Exif,
            };
        }
        if let Some(stamp) = self.stamp {
            options.stamp = match stamp {
                StampArg::Exiftool => StampBackend::ExifTool,
                StampArg::Filetime => StampBackend::FileTime,
            };
        }
        if self.exiftool.is_some() {
            options.exiftool = self.exiftool;
        }
        if let Some(secs) = self.tool_timeout {
            options.tool_timeout_secs = secs;
        }
        if self.jobs.is_some() {
            options.jobs = self.jobs;
        }
        options.dry_run |= self.dry_run;
        options.json_report |= self.json_report;
        Ok(options)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .init();

    let t_total = std::time::Instant::now();
    let options = cli.into_options()?;

    let pb = ProgressBar::new(0);
    pb.set_style(ProgressStyle::default_bar().template("[{bar:40}] {pos}/{len} {msg}")?);
    let current_stage = Mutex::new(String::new());

    let pb_cb = pb.clone();
    let result = mdo_core::process(&options, &move |stage, current, total, message| {
        let mut last = current_stage
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *last != stage {
            *last = stage.to_string();
            pb_cb.reset();
        }
        pb_cb.set_length(total);
        pb_cb.set_position(current + 1);
        pb_cb.set_message(format!("{stage}: {message}"));
    })?;
    pb.finish_and_clear();

    let counts = result.counts;
    match &result.report {
        Some(path) => eprintln!("Processing complete. Check {} for details.", path.display()),
        None => print!("{}", result.summary.render()),
    }
    eprintln!(
        "Photos: {}/{} processed ({} failed)",
        counts.succeeded_photos,
        counts.photos,
        counts.photos.saturating_sub(counts.succeeded_photos)
    );
    eprintln!(
        "Videos: {}/{} processed ({} failed)",
        counts.succeeded_videos,
        counts.videos,
        counts.videos.saturating_sub(counts.succeeded_videos)
    );
    eprintln!(
        "Done! {} files, {} succeeded, {} failed ({:.2}s)",
        counts.total,
        counts.succeeded,
        counts.failed,
        t_total.elapsed().as_secs_f64()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "media-date-organiser",
            "photos-in",
            "-o",
            "sorted",
            "--stamp",
            "filetime",
            "--metadata",
            "exif",
            "--dry-run",
        ]);
        let options = cli.into_options().unwrap();
        assert_eq!(options.input, PathBuf::from("photos-in"));
        assert_eq!(options.output, PathBuf::from("sorted"));
        assert_eq!(options.stamp, StampBackend::FileTime);
        assert_eq!(options.metadata, MetadataBackend::Exif);
        assert!(options.dry_run);
        assert_eq!(options.tool_timeout_secs, 30);
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(Cli::parse_from(["m"]).log_level(), Level::WARN);
        assert_eq!(Cli::parse_from(["m", "-v"]).log_level(), Level::DEBUG);
        assert_eq!(Cli::parse_from(["m", "-vv"]).log_level(), Level::TRACE);
        assert_eq!(Cli::parse_from(["m", "-q"]).log_level(), Level::ERROR);
    }
}
