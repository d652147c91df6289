//! Size-capped log file with numbered backups.
//!
//! `valorix_api.log` is written until the next write would reach the cap,
//! then renamed to `valorix_api.log.1` (older backups shift up by one and
//! the oldest past `backups` is discarded) and a fresh file is opened.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub struct SizeRotatingFile {
    path: PathBuf,
    max_bytes: u64,
    backups: usize,
    file: File,
    written: u64,
}

impl SizeRotatingFile {
    /// Open (or create) the active log file in append mode.
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64, backups: usize) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();

        Ok(Self {
            path,
            max_bytes,
            backups,
            file,
            written,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the `index`-th backup (`<file>.<index>`).
    pub fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{index}"));
        PathBuf::from(name)
    }

    fn should_roll_over(&self, incoming: usize) -> bool {
        // an oversized record still lands in an empty file
        self.max_bytes > 0 && self.written > 0 && self.written + incoming as u64 >= self.max_bytes
    }

    fn roll_over(&mut self) -> io::Result<()> {
        self.file.flush()?;

        if self.backups > 0 {
            for index in (1..self.backups).rev() {
                let source = self.backup_path(index);
                if source.exists() {
                    let target = self.backup_path(index + 1);
                    if target.exists() {
                        fs::remove_file(&target)?;
                    }
                    fs::rename(&source, &target)?;
                }
            }
            let first = self.backup_path(1);
            if first.exists() {
                fs::remove_file(&first)?;
            }
            fs::rename(&self.path, &first)?;
        }

        self.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

impl Write for SizeRotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.should_roll_over(buf.len()) {
            self.roll_over()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LOG_BACKUP_COUNT;
    use tempfile::tempdir;

    #[test]
    fn creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs/nested/app.log");
        let mut file = SizeRotatingFile::open(&path, 1024, 2).unwrap();
        file.write_all(b"hello\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn rolls_over_at_cap() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut file = SizeRotatingFile::open(&path, 10, 5).unwrap();

        file.write_all(b"12345\n").unwrap();
        file.write_all(b"abcde\n").unwrap();
        file.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "abcde\n");
        assert_eq!(fs::read_to_string(file.backup_path(1)).unwrap(), "12345\n");
    }

    #[test]
    fn keeps_at_most_configured_backups() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut file = SizeRotatingFile::open(&path, 4, LOG_BACKUP_COUNT).unwrap();

        for n in 0..8 {
            file.write_all(format!("l{n}\n").as_bytes()).unwrap();
        }
        file.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "l7\n");
        for index in 1..=LOG_BACKUP_COUNT {
            assert_eq!(
                fs::read_to_string(file.backup_path(index)).unwrap(),
                format!("l{}\n", 7 - index)
            );
        }
        assert!(!file.backup_path(LOG_BACKUP_COUNT + 1).exists());
    }

    #[test]
    fn resumes_size_of_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, b"12345678").unwrap();

        let mut file = SizeRotatingFile::open(&path, 10, 1).unwrap();
        file.write_all(b"xyz").unwrap();
        file.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "xyz");
        assert_eq!(fs::read_to_string(file.backup_path(1)).unwrap(), "12345678");
    }

    #[test]
    fn oversized_record_goes_to_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut file = SizeRotatingFile::open(&path, 4, 1).unwrap();

        file.write_all(b"a long record\n").unwrap();
        file.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "a long record\n");
        assert!(!file.backup_path(1).exists());
    }
}
