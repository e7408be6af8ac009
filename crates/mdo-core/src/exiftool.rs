use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::date::metadata::{MetadataFields, MetadataSource, DATE_FIELDS};
use crate::error::{StampError, ToolError};
use crate::media::{MediaFile, MediaKind};
use crate::stamp::Stamper;

/// Where a bundled exiftool lives relative to the working directory.
const BUNDLED_DIR: &str = "program";

#[cfg(windows)]
const PROGRAM_NAME: &str = "exiftool.exe";
#[cfg(not(windows))]
const PROGRAM_NAME: &str = "exiftool";

/// Tags written on videos; QuickTime keeps separate movie, media and track dates.
const VIDEO_DATE_TAGS: &[&str] = &[
    "CreateDate",
    "ModifyDate",
    "MediaCreateDate",
    "MediaModifyDate",
    "TrackCreateDate",
    "TrackModifyDate",
];

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Handle on an external `exiftool` binary, used both to read date fields and
/// to write them back.
#[derive(Debug, Clone)]
pub struct ExifTool {
    program: PathBuf,
    timeout: Duration,
}

impl ExifTool {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Find exiftool: an explicit path, then `program/exiftool` under the
    /// working directory, then `PATH`. Falls back to the bare program name so
    /// every invocation fails per file instead of aborting the run.
    pub fn locate(explicit: Option<&Path>, timeout: Duration) -> Self {
        if let Some(path) = explicit {
            return Self::new(path, timeout);
        }

        let bundled = Path::new(BUNDLED_DIR).join(PROGRAM_NAME);
        if bundled.is_file() {
            return Self::new(bundled, timeout);
        }

        match which::which(PROGRAM_NAME) {
            Ok(path) => Self::new(path, timeout),
            Err(e) => {
                warn!(error = %e, "exiftool not found; metadata lookups will fail");
                Self::new(PROGRAM_NAME, timeout)
            }
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn run(&self, args: Vec<OsString>) -> Result<Vec<u8>, ToolError> {
        let mut command = Command::new(&self.program);
        command.args(args);
        run_with_timeout(command, self.timeout).map_err(|e| match e {
            ToolError::Io(source) => ToolError::Spawn {
                program: self.program.clone(),
                source,
            },
            other => other,
        })
    }
}

impl MetadataSource for ExifTool {
    fn query(&self, path: &Path) -> Result<MetadataFields, ToolError> {
        let mut args: Vec<OsString> = vec!["-json".into()];
        args.extend(DATE_FIELDS.iter().map(|f| OsString::from(format!("-{f}"))));
        args.push(path.as_os_str().to_owned());

        let stdout = self.run(args)?;
        parse_json_output(&stdout)
    }
}

impl Stamper for ExifTool {
    fn stamp(&self, file: &MediaFile, at: DateTime<Local>) -> Result<(), StampError> {
        let args = stamp_args(file, at);
        debug!(file = %file.filename, "writing dates with exiftool");
        self.run(args)?;
        Ok(())
    }
}

fn stamp_args(file: &MediaFile, at: DateTime<Local>) -> Vec<OsString> {
    let naive = at.format("%Y:%m:%d %H:%M:%S").to_string();
    let zoned = at.format("%Y:%m:%d %H:%M:%S%:z").to_string();

    let mut args: Vec<OsString> = vec!["-overwrite_original".into()];
    match file.kind() {
        Some(MediaKind::Video) => {
            for tag in VIDEO_DATE_TAGS {
                args.push(format!("-{tag}={naive}").into());
            }
        }
        _ => args.push(format!("-AllDates={naive}").into()),
    }
    if cfg!(any(windows, target_os = "macos")) {
        args.push(format!("-FileCreateDate={zoned}").into());
    }
    args.push(format!("-FileModifyDate={zoned}").into());
    args.push(file.path.as_os_str().to_owned());
    args
}

/// exiftool `-json` prints an array with one object per file.
fn parse_json_output(stdout: &[u8]) -> Result<MetadataFields, ToolError> {
    let parsed: Vec<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_slice(stdout).map_err(|e| ToolError::Output(e.to_string()))?;
    let first = parsed
        .into_iter()
        .next()
        .ok_or_else(|| ToolError::Output("empty result".to_string()))?;

    Ok(first
        .into_iter()
        .filter_map(|(k, v)| match v {
            serde_json::Value::String(s) => Some((k, s)),
            _ => None,
        })
        .collect())
}

/// Run `command` to completion, killing it once `timeout` elapses.
/// Returns stdout on a zero exit status.
pub fn run_with_timeout(mut command: Command, timeout: Duration) -> Result<Vec<u8>, ToolError> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // Drain both pipes on their own threads so a chatty child cannot block on a full pipe
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let out_reader = thread::spawn(move || drain(stdout));
    let err_reader = thread::spawn(move || drain(stderr));

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            let _ = out_reader.join();
            let _ = err_reader.join();
            return Err(ToolError::Timeout(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = out_reader.join().unwrap_or_default();
    let stderr = err_reader.join().unwrap_or_default();

    if !status.success() {
        return Err(ToolError::Status {
            status: status.to_string(),
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        });
    }
    Ok(stdout)
}

fn drain<R: Read>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    buf
}
