use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::classify::{self, Category};

/// Create `photos/`, `videos/` and `failed/` under the output root if absent.
pub fn prepare_output(output_dir: &Path) -> io::Result<()> {
    for category in Category::ALL {
        fs::create_dir_all(classify::destination_dir(output_dir, category))?;
    }
    Ok(())
}

/// Hands out destination paths that never overwrite an existing file or a
/// path already handed out during this run.
#[derive(Debug, Default)]
pub struct Destinations {
    used: HashSet<PathBuf>,
}

impl Destinations {
    pub fn new() -> Self {
        Self::default()
    }

    /// `dir/file_name`, or `dir/stem(N).ext` with the smallest free N.
    /// The name is used byte for byte, so non-UTF-8 names survive.
    pub fn assign(&mut self, dir: &Path, file_name: impl AsRef<OsStr>) -> PathBuf {
        let file_name = file_name.as_ref();
        let mut dest = dir.join(file_name);
        if self.is_taken(&dest) {
            let name = Path::new(file_name);
            let stem = name.file_stem().unwrap_or(OsStr::new("file"));
            let ext = name.extension();
            let mut counter = 1u32;
            loop {
                let mut new_name = stem.to_os_string();
                new_name.push(format!("({})", counter));
                if let Some(ext) = ext {
                    new_name.push(".");
                    new_name.push(ext);
                }
                dest = dir.join(&new_name);
                if !self.is_taken(&dest) {
                    break;
                }
                counter += 1;
            }
        }

        self.used.insert(dest.clone());
        dest
    }

    fn is_taken(&self, path: &Path) -> bool {
        self.used.contains(path) || path.exists()
    }
}

/// Move `src` to `dest`. Tries a rename first; across volumes it copies,
/// checks the copied size and only then removes the source.
pub fn move_file(src: &Path, dest: &Path) -> io::Result<()> {
    if fs::rename(src, dest).is_ok() {
        return Ok(());
    }

    let expected = fs::metadata(src)?.len();
    let copied = match fs::copy(src, dest) {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_file(dest);
            return Err(e);
        }
    };
    let written = fs::metadata(dest)?.len();
    if copied != expected || written != expected {
        let _ = fs::remove_file(dest);
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("copied {written} of {expected} bytes"),
        ));
    }

    fs::remove_file(src)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_prepare_output_is_idempotent() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("output");
        prepare_output(&out).unwrap();
        fs::write(out.join("failed").join("keep.jpg"), b"x").unwrap();
        prepare_output(&out).unwrap();

        for folder in ["photos", "videos", "failed"] {
            assert!(out.join(folder).is_dir());
        }
        assert!(out.join("failed").join("keep.jpg").exists());
    }

    #[test]
    fn test_collisions_get_suffix() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.jpg"), b"existing").unwrap();

        let mut dests = Destinations::new();
        assert_eq!(dests.assign(dir.path(), "a.jpg"), dir.path().join("a(1).jpg"));
        assert_eq!(dests.assign(dir.path(), "a.jpg"), dir.path().join("a(2).jpg"));
        assert_eq!(dests.assign(dir.path(), "b.mp4"), dir.path().join("b.mp4"));
        assert_eq!(dests.assign(dir.path(), "b.mp4"), dir.path().join("b(1).mp4"));
        assert_eq!(dests.assign(dir.path(), "noext"), dir.path().join("noext"));
        assert_eq!(dests.assign(dir.path(), "noext"), dir.path().join("noext(1)"));
    }

    #[cfg(unix)]
    #[test]
    fn test_collision_suffix_keeps_raw_bytes() {
        use std::os::unix::ffi::OsStrExt;

        let dir = tempdir().unwrap();
        let raw = OsStr::from_bytes(b"IMG-\xffbeach.jpg");
        let mut dests = Destinations::new();
        assert_eq!(dests.assign(dir.path(), raw), dir.path().join(raw));
        assert_eq!(
            dests.assign(dir.path(), raw),
            dir.path().join(OsStr::from_bytes(b"IMG-\xffbeach(1).jpg"))
        );
    }

    #[test]
    fn test_move_file() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("clip001.mp4");
        let dest = dir.path().join("videos").join("clip001.mp4");
        fs::create_dir_all(dest.parent().unwrap()).unwrap();
        fs::write(&src, b"video bytes").unwrap();

        move_file(&src, &dest).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read(&dest).unwrap(), b"video bytes");
    }

    #[test]
    fn test_move_into_missing_dir_keeps_source() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("clip001.mp4");
        fs::write(&src, b"video bytes").unwrap();

        let dest = dir.path().join("nowhere").join("clip001.mp4");
        assert!(move_file(&src, &dest).is_err());
        assert!(src.exists());
    }
}
