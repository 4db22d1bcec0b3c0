use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dedup::dedup;
use crate::models::{AttendanceRecord, RawRecord, StoredRow};
use crate::normalize::Normalizer;

pub const HEADER: [&str; 4] = ["student_id", "student_name", "date", "status"];

/// A row dropped during a bulk read, with its 1-based line in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ReadOutcome {
    pub records: Vec<AttendanceRecord>,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CleanOutcome {
    pub kept: usize,
    pub removed: usize,
    pub skipped: usize,
}

/// Flat CSV table of attendance rows. Every call re-reads or rewrites the file.
#[derive(Debug, Clone)]
pub struct AttendanceStore {
    path: PathBuf,
    normalizer: Normalizer,
}

impl AttendanceStore {
    /// Open the table at `path`, creating it with a header when absent or empty.
    pub fn open(path: impl Into<PathBuf>, normalizer: Normalizer) -> anyhow::Result<Self> {
        let store = Self {
            path: path.into(),
            normalizer,
        };
        store.ensure_header()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    fn ensure_header(&self) -> anyhow::Result<()> {
        let needs_header = match fs::metadata(&self.path) {
            Ok(meta) => meta.is_file() && meta.len() == 0,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => true,
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to inspect {}", self.path.display()))
            }
        };
        if !needs_header {
            return Ok(());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let mut writer = csv::Writer::from_path(&self.path)
            .with_context(|| format!("failed to create {}", self.path.display()))?;
        writer.write_record(HEADER)?;
        writer.flush()?;
        debug!(path = %self.path.display(), "created attendance table");
        Ok(())
    }

    /// Append one already-normalized record to the end of the table.
    pub fn append(&self, record: &AttendanceRecord) -> anyhow::Result<()> {
        self.ensure_header()?;

        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {} for append", self.path.display()))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.serialize(StoredRow::from(record))?;
        writer.flush()?;

        info!(
            student_id = %record.student_id,
            date = %record.date_iso(),
            "appended attendance record"
        );
        Ok(())
    }

    /// Read every row in file order, normalizing each; bad rows are skipped and reported.
    pub fn read_all(&self) -> anyhow::Result<ReadOutcome> {
        let mut outcome = ReadOutcome::default();
        if !self.path.exists() {
            return Ok(outcome);
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;

        let headers = reader
            .headers()
            .with_context(|| format!("failed to read header of {}", self.path.display()))?
            .clone();

        let mut line = 1u64;
        for result in reader.records() {
            line = match &result {
                Ok(row) => row.position().map(|p| p.line()).unwrap_or(line + 1),
                Err(err) => err.position().map(|p| p.line()).unwrap_or(line + 1),
            };

            let normalized = result
                .and_then(|row| row.deserialize::<RawRecord>(Some(&headers)))
                .map_err(|err| err.to_string())
                .and_then(|raw| self.normalizer.normalize(&raw).map_err(|err| err.to_string()));

            match normalized {
                Ok(record) => outcome.records.push(record),
                Err(reason) => {
                    warn!(line, %reason, "skipping invalid row");
                    outcome.skipped.push(SkippedRow { line, reason });
                }
            }
        }

        debug!(
            rows = outcome.records.len(),
            skipped = outcome.skipped.len(),
            "read attendance table"
        );
        Ok(outcome)
    }

    /// Replace the whole table with `records`.
    ///
    /// Rows go to a sibling temp file that is renamed over the table, so a
    /// failure mid-write leaves the previous contents intact.
    pub fn overwrite(&self, records: &[AttendanceRecord]) -> anyhow::Result<()> {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attendance.csv".to_string());
        let temp_path = self
            .path
            .with_file_name(format!("{}.{}.tmp", file_name, Uuid::new_v4()));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let written = write_table(&temp_path, records).and_then(|_| {
            fs::rename(&temp_path, &self.path).with_context(|| {
                format!(
                    "failed to replace {} with {}",
                    self.path.display(),
                    temp_path.display()
                )
            })
        });

        if written.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        written?;

        info!(rows = records.len(), path = %self.path.display(), "rewrote attendance table");
        Ok(())
    }

    /// Read, deduplicate and rewrite the table.
    pub fn save_cleaned(&self) -> anyhow::Result<CleanOutcome> {
        let ReadOutcome { records, skipped } = self.read_all()?;
        let before = records.len();
        let unique = dedup(records);
        self.overwrite(&unique)?;

        Ok(CleanOutcome {
            kept: unique.len(),
            removed: before - unique.len(),
            skipped: skipped.len(),
        })
    }
}

fn write_table(path: &Path, records: &[AttendanceRecord]) -> anyhow::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(HEADER)?;
    for record in records {
        writer.serialize(StoredRow::from(record))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;
    use crate::normalize::StatusPolicy;
    use tempfile::TempDir;

    fn record(id: &str, name: &str, date: &str, status: &str) -> AttendanceRecord {
        Normalizer::default()
            .normalize(&RawRecord::new(id, name, date, status))
            .unwrap()
    }

    fn open(dir: &TempDir) -> AttendanceStore {
        AttendanceStore::open(dir.path().join("data").join("attendance.csv"), Normalizer::default())
            .unwrap()
    }

    #[test]
    fn open_creates_file_with_header() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let contents = fs::read_to_string(store.path()).unwrap();
        assert_eq!(contents, "student_id,student_name,date,status\n");
        assert!(store.read_all().unwrap().records.is_empty());
    }

    #[test]
    fn open_leaves_existing_rows_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("attendance.csv");
        fs::write(&path, "student_id,student_name,date,status\nS1,Alice,2024-01-01,P\n").unwrap();

        let store = AttendanceStore::open(&path, Normalizer::default()).unwrap();
        assert_eq!(store.read_all().unwrap().records.len(), 1);
    }

    #[test]
    fn appended_rows_read_back_in_order() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.append(&record("S1", "Alice", "2024-01-02", "P")).unwrap();
        store.append(&record("S2", "Bob, Jr.", "2024-1-1", "absent")).unwrap();

        let outcome = store.read_all().unwrap();
        assert!(outcome.skipped.is_empty());
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].student_id, "S1");
        assert_eq!(outcome.records[1].student_name, "Bob, Jr.");
        assert_eq!(outcome.records[1].date_iso(), "2024-01-01");
        assert_eq!(outcome.records[1].status, Status::Absent);

        let contents = fs::read_to_string(store.path()).unwrap();
        assert!(contents.ends_with("S2,\"Bob, Jr.\",2024-01-01,A\n"));
    }

    #[test]
    fn append_recreates_header_when_file_was_removed() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        fs::remove_file(store.path()).unwrap();

        store.append(&record("S1", "Alice", "2024-01-01", "P")).unwrap();
        let contents = fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            contents,
            "student_id,student_name,date,status\nS1,Alice,2024-01-01,P\n"
        );
    }

    #[test]
    fn invalid_rows_are_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("attendance.csv");
        fs::write(
            &path,
            "student_id,student_name,date,status\n\
             S1,Alice,2024-01-01,Present\n\
             S2,Bob,2024-13-40,P\n\
             S3,Cara\n\
             S4,Dan, 2024-1-3 ,late\n",
        )
        .unwrap();

        let store = AttendanceStore::open(&path, Normalizer::default()).unwrap();
        let outcome = store.read_all().unwrap();

        let ids: Vec<&str> = outcome.records.iter().map(|r| r.student_id.as_str()).collect();
        assert_eq!(ids, vec!["S1", "S4"]);
        assert_eq!(outcome.records[1].date_iso(), "2024-01-03");
        assert_eq!(outcome.skipped.len(), 2);
        assert!(outcome.skipped[0].reason.contains("invalid date"));
        assert_eq!(outcome.skipped[0].line, 3);
        assert_eq!(outcome.skipped[1].line, 4);
    }

    #[test]
    fn strict_store_skips_unknown_statuses() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("attendance.csv");
        fs::write(
            &path,
            "student_id,student_name,date,status\nS1,Alice,2024-01-01,X\nS1,Alice,2024-01-02,P\n",
        )
        .unwrap();

        let permissive = AttendanceStore::open(&path, Normalizer::default()).unwrap();
        assert_eq!(permissive.read_all().unwrap().records.len(), 2);

        let strict = AttendanceStore::open(&path, Normalizer::new(StatusPolicy::Strict)).unwrap();
        let outcome = strict.read_all().unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.skipped.len(), 1);
    }

    #[test]
    fn overwrite_replaces_contents_and_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.append(&record("S9", "Old", "2024-01-01", "A")).unwrap();

        store
            .overwrite(&[
                record("S1", "Alice", "2024-01-01", "P"),
                record("S2", "", "2024-01-01", "X"),
            ])
            .unwrap();

        let contents = fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            contents,
            "student_id,student_name,date,status\nS1,Alice,2024-01-01,P\nS2,,2024-01-01,X\n"
        );

        let leftovers: Vec<_> = fs::read_dir(store.path().parent().unwrap())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn failed_overwrite_keeps_previous_contents() {
        let dir = TempDir::new().unwrap();
        let table = dir.path().join("attendance.csv");
        fs::create_dir(&table).unwrap();
        fs::write(table.join("keep.txt"), "existing").unwrap();

        let store = AttendanceStore::open(&table, Normalizer::default()).unwrap();
        let result = store.overwrite(&[record("S1", "Alice", "2024-01-01", "P")]);
        assert!(result.is_err());

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
        assert!(table.is_dir());
        assert_eq!(fs::read_to_string(table.join("keep.txt")).unwrap(), "existing");
    }

    #[test]
    fn save_cleaned_drops_duplicates_and_invalid_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("attendance.csv");
        fs::write(
            &path,
            "student_id,student_name,date,status\n\
             S1,Alice,2024-01-01,P\n\
             S1,Alice,2024-01-01,A\n\
             S1,Alice,not-a-date,P\n\
             S1,Alice,2024-01-02,A\n",
        )
        .unwrap();

        let store = AttendanceStore::open(&path, Normalizer::default()).unwrap();
        let outcome = store.save_cleaned().unwrap();
        assert_eq!(
            outcome,
            CleanOutcome {
                kept: 2,
                removed: 1,
                skipped: 1
            }
        );

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "student_id,student_name,date,status\nS1,Alice,2024-01-01,P\nS1,Alice,2024-01-02,A\n"
        );

        let again = store.save_cleaned().unwrap();
        assert_eq!(again.removed, 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), contents);
    }
}
