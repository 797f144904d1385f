//! Rotation of the raw sensor log into dated archive files.
//!
//! The raw log is closed after a short quiet period, and also just before it
//! is archived, so sensors that write continuously do not hold it open
//! forever. Each tick may archive it:
//!
//! - during the first hour of a day (the hour before was 23), the log is moved
//!   into the archive of the day that just ended, once;
//! - at any other time, at most once per hour, the log is copied into the
//!   archive of the current day so that partial days survive a restart.
//!
//! Archive files are named `YYYY-MM-DD.<extension>`.

use crate::database::rawlog::RawLog;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike};
use log::{debug, info};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Seconds without a write before the raw log is closed.
pub const QUIET_PERIOD: i64 = 10;

const HOUR: i64 = 3600;
const DAILY_MOVE_HOUR: u32 = 23;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("cannot create archive directory {}: {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot move {} to {}: {source}", .from.display(), .to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveAction {
    /// The raw log was moved into this archive and is now gone.
    DailyMove(PathBuf),
    /// The raw log was copied over this archive.
    Snapshot(PathBuf),
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ArchiveSettings {
    pub log_file: PathBuf,
    pub directory: PathBuf,
    pub extension: String,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from("/dev/shm/housesensor.csv"),
            directory: PathBuf::from("/var/lib/house/sensor"),
            extension: "csv".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct ArchiveScheduler {
    log: RawLog,
    directory: PathBuf,
    extension: String,
    last_write: i64,
    last_move: i64,
    last_snapshot: i64,
}

impl ArchiveScheduler {
    pub fn new(settings: ArchiveSettings) -> Self {
        Self {
            log: RawLog::new(settings.log_file),
            directory: settings.directory,
            extension: settings.extension,
            last_write: 0,
            last_move: 0,
            last_snapshot: 0,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn log_path(&self) -> &Path {
        self.log.path()
    }

    pub fn is_log_open(&self) -> bool {
        self.log.is_open()
    }

    pub fn archive_path(&self, date: NaiveDate) -> PathBuf {
        self.directory
            .join(format!("{}.{}", date.format("%Y-%m-%d"), self.extension))
    }

    /// Startup check: when started during the first hour of a day whose
    /// previous day is already archived, skip this hour's daily move so the
    /// existing archive is not replaced by today's data.
    pub fn reconcile<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> bool {
        let hour_before = now.clone() - Duration::hours(1);
        if hour_before.hour() != DAILY_MOVE_HOUR {
            return false;
        }

        let archive = self.archive_path(hour_before.date_naive());
        if !archive.is_file() {
            return false;
        }
        self.last_move = now.timestamp();
        info!(
            "{} already archived, skipping this hour's daily move",
            archive.display()
        );
        true
    }

    /// Appends one line to the raw log and records the write time.
    pub fn record(&mut self, line: &str, now: i64) -> io::Result<()> {
        self.log.append(line)?;
        self.last_write = now;
        Ok(())
    }

    pub fn tick<Tz: TimeZone>(
        &mut self,
        now: &DateTime<Tz>,
    ) -> Result<Option<ArchiveAction>, ArchiveError> {
        let timestamp = now.timestamp();

        if self.log.is_open() && timestamp > self.last_write + QUIET_PERIOD {
            self.log.close();
        }
        if !self.log.exists() {
            return Ok(None);
        }

        let hour_before = now.clone() - Duration::hours(1);
        let move_due =
            hour_before.hour() == DAILY_MOVE_HOUR && timestamp > self.last_move + HOUR + 1;
        let snapshot_due = hour_before.timestamp() > self.last_snapshot;
        if !move_due && !snapshot_due {
            return Ok(None);
        }

        // Rotation never works on an open handle. The next record reopens the log.
        self.log.close();

        if move_due {
            let target = self.archive_path(hour_before.date_naive());
            self.move_log(&target)?;
            self.last_move = timestamp;
            self.last_snapshot = timestamp;
            info!("Moved raw log to {}", target.display());
            return Ok(Some(ArchiveAction::DailyMove(target)));
        }

        let target = self.archive_path(now.date_naive());
        self.copy_log(&target)?;
        self.last_snapshot = timestamp;
        debug!("Copied raw log to {}", target.display());
        Ok(Some(ArchiveAction::Snapshot(target)))
    }

    pub fn close(&mut self) {
        self.log.close();
    }

    fn ensure_directory(&self) -> Result<(), ArchiveError> {
        fs::create_dir_all(&self.directory).map_err(|source| ArchiveError::Directory {
            path: self.directory.clone(),
            source,
        })
    }

    fn move_log(&self, target: &Path) -> Result<(), ArchiveError> {
        self.ensure_directory()?;
        let from = self.log.path();

        if let Err(e) = fs::rename(from, target) {
            // rename cannot cross filesystems, and the raw log usually lives on tmpfs.
            debug!("rename of {} failed ({}), copying instead", from.display(), e);
            fs::copy(from, target)
                .and_then(|_| fs::remove_file(from))
                .map_err(|source| ArchiveError::Move {
                    from: from.to_path_buf(),
                    to: target.to_path_buf(),
                    source,
                })?;
        }
        Ok(())
    }

    fn copy_log(&self, target: &Path) -> Result<(), ArchiveError> {
        self.ensure_directory()?;
        let from = self.log.path();

        fs::copy(from, target).map_err(|source| ArchiveError::Copy {
            from: from.to_path_buf(),
            to: target.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn scheduler(dir: &TempDir) -> ArchiveScheduler {
        ArchiveScheduler::new(ArchiveSettings {
            log_file: dir.path().join("raw.csv"),
            directory: dir.path().join("archive"),
            extension: "csv".to_string(),
        })
    }

    fn write(scheduler: &mut ArchiveScheduler, when: &DateTime<Utc>, line: &str) {
        scheduler.record(line, when.timestamp()).unwrap();
    }

    #[test]
    fn test_log_closes_after_quiet_period() {
        let dir = tempfile::tempdir().unwrap();
        let mut sched = scheduler(&dir);
        let t = at(2024, 3, 1, 12, 0, 0);

        write(&mut sched, &t, "a");
        // First snapshot of the day, taken right away.
        let action = sched.tick(&(t + Duration::seconds(1))).unwrap();
        assert!(matches!(action, Some(ArchiveAction::Snapshot(_))));
        assert!(!sched.is_log_open());

        write(&mut sched, &(t + Duration::seconds(2)), "b");
        assert_eq!(sched.tick(&(t + Duration::seconds(5))).unwrap(), None);
        assert!(sched.is_log_open());

        assert_eq!(sched.tick(&(t + Duration::seconds(13))).unwrap(), None);
        assert!(!sched.is_log_open());
    }

    #[test]
    fn test_steady_writer_is_still_archived() {
        let dir = tempfile::tempdir().unwrap();
        let mut sched = scheduler(&dir);

        let mut moves = 0;
        let mut t = at(2024, 2, 29, 23, 0, 0);
        let end = at(2024, 3, 1, 1, 0, 10);
        while t < end {
            // A write every ten seconds never leaves a quiet period.
            if t.timestamp() % 10 == 0 {
                write(&mut sched, &t, "reading");
            }
            if let Some(ArchiveAction::DailyMove(_)) = sched.tick(&t).unwrap() {
                moves += 1;
            }
            t += Duration::seconds(1);
        }

        assert_eq!(moves, 1);
        assert!(dir.path().join("archive").join("2024-02-29.csv").is_file());
        assert!(dir.path().join("archive").join("2024-03-01.csv").is_file());
    }

    #[test]
    fn test_daily_move_happens_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut sched = scheduler(&dir);

        write(&mut sched, &at(2024, 2, 29, 23, 59, 40), "yesterday");
        let action = sched.tick(&at(2024, 3, 1, 0, 0, 0)).unwrap();

        let expected = dir.path().join("archive").join("2024-02-29.csv");
        assert_eq!(action, Some(ArchiveAction::DailyMove(expected.clone())));
        assert_eq!(fs::read_to_string(&expected).unwrap(), "yesterday\n");
        assert!(!sched.log_path().exists());

        write(&mut sched, &at(2024, 3, 1, 0, 10, 0), "today");
        assert_eq!(sched.tick(&at(2024, 3, 1, 0, 30, 0)).unwrap(), None);
        assert_eq!(fs::read_to_string(&expected).unwrap(), "yesterday\n");
        assert!(sched.log_path().exists());
    }

    #[test]
    fn test_hourly_snapshot_copies_into_today() {
        let dir = tempfile::tempdir().unwrap();
        let mut sched = scheduler(&dir);

        write(&mut sched, &at(2024, 3, 1, 10, 0, 0), "morning");
        let action = sched.tick(&at(2024, 3, 1, 10, 0, 30)).unwrap();

        let expected = dir.path().join("archive").join("2024-03-01.csv");
        assert_eq!(action, Some(ArchiveAction::Snapshot(expected.clone())));
        assert!(sched.log_path().exists());

        // Less than an hour later: nothing to do.
        write(&mut sched, &at(2024, 3, 1, 10, 20, 0), "later");
        assert_eq!(sched.tick(&at(2024, 3, 1, 10, 30, 0)).unwrap(), None);

        let action = sched.tick(&at(2024, 3, 1, 11, 0, 31)).unwrap();
        assert_eq!(action, Some(ArchiveAction::Snapshot(expected.clone())));
        assert_eq!(fs::read_to_string(&expected).unwrap(), "morning\nlater\n");
    }

    #[test]
    fn test_nothing_to_archive_without_log() {
        let dir = tempfile::tempdir().unwrap();
        let mut sched = scheduler(&dir);
        assert_eq!(sched.tick(&at(2024, 3, 1, 0, 0, 0)).unwrap(), None);
        assert!(!dir.path().join("archive").exists());
    }

    #[test]
    fn test_reconcile_suppresses_move_when_archived() {
        let dir = tempfile::tempdir().unwrap();
        let mut sched = scheduler(&dir);
        let archived = dir.path().join("archive").join("2024-02-29.csv");
        fs::create_dir_all(archived.parent().unwrap()).unwrap();
        fs::write(&archived, "complete day\n").unwrap();

        assert!(sched.reconcile(&at(2024, 3, 1, 0, 20, 0)));

        write(&mut sched, &at(2024, 3, 1, 0, 25, 0), "after restart");
        let action = sched.tick(&at(2024, 3, 1, 0, 40, 0)).unwrap();

        assert!(!matches!(action, Some(ArchiveAction::DailyMove(_))));
        assert_eq!(fs::read_to_string(&archived).unwrap(), "complete day\n");
    }

    #[test]
    fn test_reconcile_ignores_other_hours() {
        let dir = tempfile::tempdir().unwrap();
        let mut sched = scheduler(&dir);
        assert!(!sched.reconcile(&at(2024, 3, 1, 5, 0, 0)));
        assert!(!sched.reconcile(&at(2024, 3, 1, 0, 20, 0)));
    }

    #[test]
    fn test_failed_rotation_is_reported_and_retried() {
        let dir = tempfile::tempdir().unwrap();
        // A plain file where the archive directory should be.
        fs::write(dir.path().join("archive"), "").unwrap();
        let mut sched = scheduler(&dir);

        write(&mut sched, &at(2024, 3, 1, 10, 0, 0), "data");
        let result = sched.tick(&at(2024, 3, 1, 10, 1, 0));
        assert!(matches!(result, Err(ArchiveError::Directory { .. })));

        fs::remove_file(dir.path().join("archive")).unwrap();
        let action = sched.tick(&at(2024, 3, 1, 10, 1, 1)).unwrap();
        assert!(matches!(action, Some(ArchiveAction::Snapshot(_))));
    }
}
