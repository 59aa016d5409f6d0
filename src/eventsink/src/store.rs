use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::record::CapturedRecord;

/// Ordered, append-only collection of captured records.
///
/// A single lock guards the sequence, and it is only ever held long enough to
/// push, clear, count or clone the list of record handles. Records themselves
/// are immutable, so a [`Snapshot`] stays valid while capture continues.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Mutex<Vec<Arc<CapturedRecord>>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record to the end of the sequence and returns the number of
    /// stored records, including this one.
    pub fn append(&self, record: CapturedRecord) -> usize {
        let mut records = self.lock();
        records.push(Arc::new(record));
        records.len()
    }

    /// Returns the records stored at this instant, in arrival order
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            records: self.lock().clone(),
        }
    }

    /// Discards every record
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    // Every critical section is a single push, clear, clone or len, so the
    // sequence is never left half-updated by a panicking holder.
    fn lock(&self) -> MutexGuard<'_, Vec<Arc<CapturedRecord>>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Records frozen at the moment [`RecordStore::snapshot`] was called
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    records: Vec<Arc<CapturedRecord>>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapturedRecord> {
        self.records.iter().map(|record| &**record)
    }
}
