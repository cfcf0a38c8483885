//! Bounded in-memory record of recent query attempts.
//!
//! Recording is best-effort bookkeeping for the attempts API. It must never
//! block or fail an execution response, so the store is a fixed-capacity
//! ring guarded by a plain mutex; once full, the oldest record is evicted.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::Serialize;
use time::OffsetDateTime;

/// One recorded execution attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    /// Assignment the attempt was made against.
    pub assignment_id: Option<String>,
    /// The submitted SQL text, as received.
    pub sql_query: String,
    /// Whether the execution envelope was the success variant.
    pub is_successful: bool,
    /// Wall-clock execution time in milliseconds.
    pub execution_time: u64,
    /// Failure message for unsuccessful attempts.
    pub error_message: Option<String>,
    /// When the attempt was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Fixed-capacity attempt store; reads are newest first.
#[derive(Debug)]
pub struct AttemptLog {
    records: Mutex<VecDeque<AttemptRecord>>,
    capacity: usize,
}

impl AttemptLog {
    /// Creates a log retaining at most `capacity` records.
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            capacity,
        }
    }

    /// Appends a record, evicting the oldest once the log is full.
    pub fn record(&self, record: AttemptRecord) {
        if self.capacity == 0 {
            return;
        }
        let mut records = self.records.lock();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Most recent attempts, newest first, optionally filtered by assignment
    /// and capped at `limit`.
    pub fn recent(&self, assignment_id: Option<&str>, limit: usize) -> Vec<AttemptRecord> {
        let records = self.records.lock();
        records
            .iter()
            .rev()
            .filter(|record| {
                assignment_id.map_or(true, |id| record.assignment_id.as_deref() == Some(id))
            })
            .take(limit)
            .cloned()
            .collect()
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether the log holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}
