//! Shared sample store
//!
//! The acquisition worker is the only writer and only ever appends. A record
//! is pushed onto every sequence under a single write guard, so readers that
//! take a read guard always observe sequences of equal length. Readers copy
//! out what they need ([`SampleStore::snapshot`], [`SampleStore::last_n`])
//! instead of holding the guard while drawing.

use crate::error::{Result, SerialGraphError};
use crate::types::{ColumnCount, Record};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Index-aligned, append-only sequences: elapsed time plus one per column
#[derive(Debug)]
pub struct SampleStore {
    columns: ColumnCount,
    inner: RwLock<Vec<Vec<f64>>>,
    generation: AtomicU64,
}

impl SampleStore {
    pub fn new(columns: ColumnCount) -> Self {
        Self {
            columns,
            inner: RwLock::new(vec![Vec::new(); columns.record_width()]),
            generation: AtomicU64::new(0),
        }
    }

    pub fn columns(&self) -> ColumnCount {
        self.columns
    }

    /// Advances with every appended record
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Number of records stored
    pub fn len(&self) -> usize {
        self.read().first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one record; a width mismatch leaves the store untouched
    pub fn append(&self, record: &Record) -> Result<()> {
        self.check_width(record)?;
        let mut sequences = self.write();
        for (sequence, &value) in sequences.iter_mut().zip(record.values()) {
            sequence.push(value);
        }
        drop(sequences);
        self.generation.fetch_add(1, Ordering::Release);
        Ok(())
    }

    /// Append several records under one guard; all widths are checked first
    pub fn append_batch(&self, records: &[Record]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        for record in records {
            self.check_width(record)?;
        }
        let mut sequences = self.write();
        for record in records {
            for (sequence, &value) in sequences.iter_mut().zip(record.values()) {
                sequence.push(value);
            }
        }
        drop(sequences);
        self.generation
            .fetch_add(records.len() as u64, Ordering::Release);
        Ok(())
    }

    /// Point-in-time copy of every sequence
    pub fn snapshot(&self) -> StoreSnapshot {
        let sequences = self.read();
        let generation = self.generation();
        StoreSnapshot::from_sequences(sequences.clone(), generation)
    }

    /// Copy of the most recent `count` samples of every sequence
    pub fn last_n(&self, count: usize) -> StoreSnapshot {
        let sequences = self.read();
        let generation = self.generation();
        let total = sequences.first().map(Vec::len).unwrap_or(0);
        let start = total.saturating_sub(count);
        let window = sequences.iter().map(|s| s[start..].to_vec()).collect();
        StoreSnapshot {
            sequences: window,
            generation,
            total_len: total,
        }
    }

    fn check_width(&self, record: &Record) -> Result<()> {
        let expected = self.columns.record_width();
        if record.width() != expected {
            return Err(SerialGraphError::RecordWidth {
                expected,
                actual: record.width(),
            });
        }
        Ok(())
    }

    // Pushes only happen after validation, so a poisoned lock still holds
    // aligned sequences.
    fn read(&self) -> RwLockReadGuard<'_, Vec<Vec<f64>>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Vec<f64>>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Owned copy of the store taken under one read guard
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoreSnapshot {
    pub sequences: Vec<Vec<f64>>,
    /// Store generation at the time of the copy
    pub generation: u64,
    /// Records in the store at the time of the copy (may exceed the window)
    pub total_len: usize,
}

impl StoreSnapshot {
    pub fn from_sequences(sequences: Vec<Vec<f64>>, generation: u64) -> Self {
        let total_len = sequences.first().map(Vec::len).unwrap_or(0);
        Self {
            sequences,
            generation,
            total_len,
        }
    }

    /// Sequence by store index (0 = elapsed time)
    pub fn sequence(&self, index: usize) -> Option<&[f64]> {
        self.sequences.get(index).map(Vec::as_slice)
    }

    /// Samples in this copy
    pub fn len(&self) -> usize {
        self.sequences.first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn store(columns: usize) -> SampleStore {
        SampleStore::new(ColumnCount::new(columns).unwrap())
    }

    #[test]
    fn test_append_and_snapshot() {
        let store = store(2);
        store.append(&Record::new(0.0, [1.0, 2.0])).unwrap();
        store.append(&Record::new(1.0, [3.0, 4.0])).unwrap();

        let snap = store.snapshot();
        assert_eq!(snap.sequence(0), Some(&[0.0, 1.0][..]));
        assert_eq!(snap.sequence(1), Some(&[1.0, 3.0][..]));
        assert_eq!(snap.sequence(2), Some(&[2.0, 4.0][..]));
        assert_eq!(snap.generation, 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_wrong_width_leaves_store_untouched() {
        let store = store(2);
        store.append(&Record::new(0.0, [1.0, 2.0])).unwrap();
        let err = store.append(&Record::new(1.0, [1.0])).unwrap_err();
        assert!(matches!(
            err,
            SerialGraphError::RecordWidth {
                expected: 3,
                actual: 2
            }
        ));
        assert_eq!(store.len(), 1);
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let store = store(1);
        let batch = vec![Record::new(0.0, [1.0]), Record::new(1.0, [1.0, 2.0])];
        assert!(store.append_batch(&batch).is_err());
        assert!(store.is_empty());

        let batch = vec![Record::new(0.0, [1.0]), Record::new(1.0, [2.0])];
        store.append_batch(&batch).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.generation(), 2);
    }

    #[test]
    fn test_last_n_windows_the_tail() {
        let store = store(1);
        for i in 0..10 {
            store.append(&Record::new(i as f64, [i as f64 * 10.0])).unwrap();
        }
        let window = store.last_n(3);
        assert_eq!(window.sequence(0), Some(&[7.0, 8.0, 9.0][..]));
        assert_eq!(window.sequence(1), Some(&[70.0, 80.0, 90.0][..]));
        assert_eq!(window.total_len, 10);

        let all = store.last_n(100);
        assert_eq!(all.len(), 10);
    }

    #[test]
    fn test_empty_store() {
        let store = store(3);
        let snap = store.last_n(5);
        assert!(snap.is_empty());
        assert_eq!(snap.sequences.len(), 4);
        assert_eq!(store.generation(), 0);
    }

    #[test]
    fn test_concurrent_readers_see_equal_lengths() {
        let store = Arc::new(store(4));
        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 0..2000 {
                    let v = i as f64;
                    store.append(&Record::new(v, [v, v, v, v])).unwrap();
                }
            })
        };

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        let snap = store.last_n(64);
                        let len = snap.len();
                        assert!(snap.sequences.iter().all(|s| s.len() == len));
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(store.len(), 2000);
    }
}
