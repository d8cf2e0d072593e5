//! Access record storage backends.

use crate::protocol::models::{ContentId, DateRange};
use crate::recorder::AccessRecord;
use crate::GateError;
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Append-only storage for access records.
pub trait RecordStore: Send + Sync {
    /// Append a record, assigning its id. Returns the stored record.
    fn append(&self, record: AccessRecord) -> Result<AccessRecord, GateError>;

    /// Records whose access date (UTC) falls within `range`, oldest first.
    fn records(&self, range: &DateRange) -> Result<Vec<AccessRecord>, GateError>;
}

/// In-memory record store.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<Vec<AccessRecord>>,
}

impl MemoryRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether no record has been stored.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// All records for one content item.
    pub fn records_for(&self, content_id: ContentId) -> Vec<AccessRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.content_id == content_id)
            .cloned()
            .collect()
    }
}

impl RecordStore for MemoryRecordStore {
    fn append(&self, mut record: AccessRecord) -> Result<AccessRecord, GateError> {
        let mut records = self.records.lock();
        record.id = records.len() as u64 + 1;
        records.push(record.clone());
        Ok(record)
    }

    fn records(&self, range: &DateRange) -> Result<Vec<AccessRecord>, GateError> {
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|r| range.contains(r.access_time.date_naive()))
            .cloned()
            .collect())
    }
}

/// Record store writing one JSON object per line to a file.
///
/// Ids continue from the number of lines already in the file. Lines that
/// fail to parse are skipped with a warning when reading.
#[derive(Debug)]
pub struct JsonlRecordStore {
    path: PathBuf,
    /// Next id to assign; `None` until the file has been scanned.
    next_id: Mutex<Option<u64>>,
}

impl JsonlRecordStore {
    /// Open (or create on first append) a record file.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, GateError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| GateError::RecordIO(format!("Failed to create record dir: {}", e)))?;
        }
        Ok(Self {
            path,
            next_id: Mutex::new(None),
        })
    }

    /// Path of the record file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_lines(&self) -> Result<Vec<String>, GateError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(contents
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(String::from)
                .collect()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(GateError::RecordIO(format!("Failed to read records: {}", e))),
        }
    }
}

impl RecordStore for JsonlRecordStore {
    fn append(&self, mut record: AccessRecord) -> Result<AccessRecord, GateError> {
        // Held across the write so ids and lines stay in step.
        let mut next_id = self.next_id.lock();
        let id = match *next_id {
            Some(id) => id,
            None => self.read_lines()?.len() as u64 + 1,
        };
        record.id = id;

        let mut line = serde_json::to_string(&record)
            .map_err(|e| GateError::RecordIO(format!("Failed to serialize record: {}", e)))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| GateError::RecordIO(format!("Failed to open record file: {}", e)))?;
        file.write_all(line.as_bytes())
            .map_err(|e| GateError::RecordIO(format!("Failed to append record: {}", e)))?;

        *next_id = Some(id + 1);
        Ok(record)
    }

    fn records(&self, range: &DateRange) -> Result<Vec<AccessRecord>, GateError> {
        let mut records = Vec::new();
        for (index, line) in self.read_lines()?.iter().enumerate() {
            match serde_json::from_str::<AccessRecord>(line) {
                Ok(record) if range.contains(record.access_time.date_naive()) => records.push(record),
                Ok(_) => {}
                Err(e) => warn!(error = %e, line = index + 1, "Skipping corrupt access record"),
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate, Utc};
    use serde_json::Map;
    use tempfile::TempDir;

    fn record(content_id: ContentId, at: &str) -> AccessRecord {
        AccessRecord {
            id: 0,
            content_id,
            token_fingerprint: "ab".repeat(32),
            access_time: DateTime::parse_from_rfc3339(at).unwrap().with_timezone(&Utc),
            claims_snapshot: Map::new(),
            client_address: Some("203.0.113.0".to_string()),
            user_agent: "Bot/1.0".to_string(),
        }
    }

    fn january() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn memory_store_assigns_sequential_ids() {
        let store = MemoryRecordStore::new();
        let a = store.append(record(1, "2025-01-15T12:00:00Z")).unwrap();
        let b = store.append(record(1, "2025-01-15T12:00:00Z")).unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(store.records_for(1).len(), 2);
    }

    #[test]
    fn memory_store_filters_by_range() {
        let store = MemoryRecordStore::new();
        store.append(record(1, "2025-01-15T12:00:00Z")).unwrap();
        store.append(record(2, "2025-02-01T00:00:00Z")).unwrap();
        let found = store.records(&january()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content_id, 1);
    }

    #[test]
    fn jsonl_store_appends_and_reads_back() {
        let dir = TempDir::new().unwrap();
        let store = JsonlRecordStore::new(dir.path().join("records/access.jsonl")).unwrap();

        store.append(record(5, "2025-01-10T08:00:00Z")).unwrap();
        let second = store.append(record(6, "2025-01-11T08:00:00Z")).unwrap();
        assert_eq!(second.id, 2);

        let found = store.records(&january()).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].content_id, 6);
        assert_eq!(found[1].client_address.as_deref(), Some("203.0.113.0"));
    }

    #[test]
    fn jsonl_ids_continue_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("access.jsonl");
        JsonlRecordStore::new(&path)
            .unwrap()
            .append(record(1, "2025-01-10T08:00:00Z"))
            .unwrap();

        let reopened = JsonlRecordStore::new(&path).unwrap();
        let next = reopened.append(record(1, "2025-01-10T09:00:00Z")).unwrap();
        assert_eq!(next.id, 2);
    }

    #[test]
    fn jsonl_skips_corrupt_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("access.jsonl");
        let store = JsonlRecordStore::new(&path).unwrap();
        store.append(record(1, "2025-01-10T08:00:00Z")).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{not json").unwrap();

        assert_eq!(store.records(&january()).unwrap().len(), 1);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonlRecordStore::new(dir.path().join("none.jsonl")).unwrap();
        assert!(store.records(&january()).unwrap().is_empty());
    }
}
