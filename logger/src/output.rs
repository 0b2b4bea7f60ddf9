//! Output directories and export file names.

use chrono::{NaiveDate, NaiveDateTime};
use log::*;
use std::path::{Path, PathBuf};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Where the exports of one identifier end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    /// File name identifier, used for the directory and every file in it.
    pub identifier: String,
    /// `<base>/<identifier>_<date>`
    pub directory: PathBuf,
}

impl OutputTarget {
    /// Compute the directory for `identifier` below `base` without touching the filesystem.
    pub fn new(base: &Path, identifier: &str, date: NaiveDate) -> Self {
        OutputTarget {
            identifier: identifier.to_string(),
            directory: base.join(format!("{}_{}", identifier, date.format(DATE_FORMAT))),
        }
    }

    /// Like [`OutputTarget::new`], creating the directory if it does not exist yet.
    pub fn create(base: &Path, identifier: &str, date: NaiveDate) -> std::io::Result<Self> {
        let target = Self::new(base, identifier, date);
        if !target.directory.is_dir() {
            debug!("Creating {}", target.directory.display());
            std::fs::create_dir_all(&target.directory)?;
        }
        Ok(target)
    }

    /// Path of the export made at `time`, `<identifier>_<timestamp>.csv`.
    pub fn capture_path(&self, time: NaiveDateTime) -> PathBuf {
        self.directory.join(format!(
            "{}_{}.csv",
            self.identifier,
            time.format(TIMESTAMP_FORMAT)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn directory_and_file_names() {
        let target = OutputTarget::new(Path::new("/data"), "CH0_output", at(0, 0, 0).date());
        assert_eq!(target.directory, PathBuf::from("/data/CH0_output_2024-03-09"));
        assert_eq!(
            target.capture_path(at(14, 5, 7)),
            PathBuf::from("/data/CH0_output_2024-03-09/CH0_output_2024-03-09_14-05-07.csv")
        );
    }

    #[test]
    fn timestamps_have_second_resolution() {
        let target = OutputTarget::new(Path::new("/data"), "uart", at(0, 0, 0).date());
        assert_ne!(target.capture_path(at(1, 2, 3)), target.capture_path(at(1, 2, 4)));
        assert_eq!(
            target.capture_path(at(1, 2, 3)),
            target.capture_path(at(1, 2, 3) + chrono::Duration::milliseconds(999))
        );
    }

    #[test]
    fn create_is_idempotent() {
        let base = tempfile::tempdir().unwrap();
        let first = OutputTarget::create(base.path(), "CH1_output", at(0, 0, 0).date()).unwrap();
        assert!(first.directory.is_dir());
        let second = OutputTarget::create(base.path(), "CH1_output", at(0, 0, 0).date()).unwrap();
        assert_eq!(first, second);
    }
}
