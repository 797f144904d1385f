use crate::models::SensorRecord;
use log::debug;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Append-only CSV file mirroring every sensor update. The file is opened on
/// the first write after being closed.
#[derive(Debug)]
pub struct RawLog {
    path: PathBuf,
    file: Option<File>,
}

impl RawLog {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn append(&mut self, line: &str) -> io::Result<()> {
        if self.file.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            debug!("Opened raw log {}", self.path.display());
            self.file = Some(file);
        }
        if let Some(file) = self.file.as_mut() {
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }

    /// Returns true if a handle was actually closed.
    pub fn close(&mut self) -> bool {
        match self.file.take() {
            Some(file) => {
                drop(file);
                debug!("Closed raw log {}", self.path.display());
                true
            }
            None => false,
        }
    }
}

/// `<unix-timestamp>,<location>,<name>,<value>,<unit>`
pub fn format_line(timestamp: i64, record: &SensorRecord) -> String {
    format!(
        "{},{},{},{},{}",
        timestamp, record.location, record.name, record.value, record.unit
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_append_opens_lazily_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = RawLog::new(dir.path().join("raw.csv"));
        assert!(!log.is_open());
        assert!(!log.exists());

        log.append("1,kitchen,temp,21.5,Celsius").unwrap();
        assert!(log.is_open());
        assert!(log.close());
        assert!(!log.close());

        log.append("2,kitchen,temp,21.6,Celsius").unwrap();
        log.close();

        let content = fs::read_to_string(log.path()).unwrap();
        assert_eq!(
            content,
            "1,kitchen,temp,21.5,Celsius\n2,kitchen,temp,21.6,Celsius\n"
        );
    }

    #[test]
    fn test_format_line() {
        let mut record = SensorRecord::new("w1", "28-0001", "kitchen", "temp", Some("Celsius"));
        record.update("21.5", None, 1000);
        assert_eq!(format_line(1000, &record), "1000,kitchen,temp,21.5,Celsius");
    }
}
