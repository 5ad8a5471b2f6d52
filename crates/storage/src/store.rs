// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The durable `Store`: one WAL file plus a periodic zstd-compressed
//! snapshot, backing the List/Mapping/PriorityQueue primitives.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Result, StoreError};
use crate::wal::{QueueRow, Tables, WalEntry};

/// Number of WAL entries accumulated since the last snapshot before the
/// store compacts automatically.
const COMPACT_THRESHOLD: usize = 1024;

struct Inner {
    tables: Tables,
    wal_file: File,
    entries_since_snapshot: usize,
}

/// A single named durable store: `<name>.wal` records every mutation,
/// `<name>.snapshot.zst` holds a compressed checkpoint. On open, the
/// snapshot (if any) is loaded and the WAL is replayed on top of it.
pub struct Store {
    wal_path: PathBuf,
    snapshot_path: PathBuf,
    inner: Mutex<Inner>,
}

impl Store {
    pub fn open(dir: &Path, name: &str) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|source| StoreError::Open { path: dir.to_path_buf(), source })?;
        let wal_path = dir.join(format!("{name}.wal"));
        let snapshot_path = dir.join(format!("{name}.snapshot.zst"));

        let mut tables = Tables::default();
        if snapshot_path.exists() {
            tables = load_snapshot(&snapshot_path)?;
        }

        let mut entries_since_snapshot = 0;
        if wal_path.exists() {
            let file = File::open(&wal_path).map_err(|source| StoreError::WalIo {
                path: wal_path.clone(),
                source,
            })?;
            for (idx, line) in BufReader::new(file).lines().enumerate() {
                let line = line.map_err(|source| StoreError::WalIo { path: wal_path.clone(), source })?;
                if line.is_empty() {
                    continue;
                }
                let entry: WalEntry = serde_json::from_str(&line)
                    .map_err(|source| StoreError::WalDecode { path: wal_path.clone(), line: idx, source })?;
                tables.apply(&entry);
                entries_since_snapshot += 1;
            }
        }

        let wal_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&wal_path)
            .map_err(|source| StoreError::WalIo { path: wal_path.clone(), source })?;

        let store = Store {
            wal_path,
            snapshot_path,
            inner: Mutex::new(Inner { tables, wal_file, entries_since_snapshot }),
        };
        if entries_since_snapshot >= COMPACT_THRESHOLD {
            store.compact()?;
        }
        Ok(store)
    }

    fn append(&self, mut inner: parking_lot::MutexGuard<'_, Inner>, entry: WalEntry) -> Result<()> {
        let line = serde_json::to_string(&entry).map_err(|source| StoreError::ValueEncode {
            table: "wal".into(),
            source,
        })?;
        writeln!(inner.wal_file, "{line}").map_err(|source| StoreError::WalIo {
            path: self.wal_path.clone(),
            source,
        })?;
        inner.wal_file.flush().map_err(|source| StoreError::WalIo {
            path: self.wal_path.clone(),
            source,
        })?;
        inner.tables.apply(&entry);
        inner.entries_since_snapshot += 1;
        let should_compact = inner.entries_since_snapshot >= COMPACT_THRESHOLD;
        drop(inner);
        if should_compact {
            self.compact()?;
        }
        Ok(())
    }

    /// Write a fresh snapshot of the current state and truncate the WAL.
    /// Crash-safe: the snapshot is written to a temp file and renamed over
    /// the old one before the WAL is truncated, so a crash mid-compaction
    /// leaves either the old snapshot+full WAL or the new snapshot+full WAL,
    /// never a torn state.
    pub fn compact(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        let snapshot = serde_json::to_vec(&inner.tables)
            .map_err(|source| StoreError::ValueEncode { table: "snapshot".into(), source })?;
        let compressed = zstd::encode_all(snapshot.as_slice(), 0)
            .map_err(|source| StoreError::SnapshotIo { path: self.snapshot_path.clone(), source })?;

        let tmp_path = self.snapshot_path.with_extension("snapshot.zst.tmp");
        fs::write(&tmp_path, &compressed)
            .map_err(|source| StoreError::SnapshotIo { path: tmp_path.clone(), source })?;
        fs::rename(&tmp_path, &self.snapshot_path)
            .map_err(|source| StoreError::SnapshotIo { path: self.snapshot_path.clone(), source })?;

        let wal_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.wal_path)
            .map_err(|source| StoreError::WalIo { path: self.wal_path.clone(), source })?;
        inner.wal_file = wal_file;
        inner.entries_since_snapshot = 0;
        Ok(())
    }

    // ---- List ----

    pub fn list_append<T: Serialize>(&self, table: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|source| StoreError::ValueEncode { table: table.into(), source })?;
        let inner = self.inner.lock();
        self.append(inner, WalEntry::ListAppend { table: table.into(), value })
    }

    pub fn list_len(&self, table: &str) -> usize {
        self.inner.lock().tables.lists.get(table).map_or(0, Vec::len)
    }

    pub fn list_get<T: DeserializeOwned>(&self, table: &str, index: usize) -> Result<Option<T>> {
        let inner = self.inner.lock();
        match inner.tables.lists.get(table).and_then(|l| l.get(index)) {
            Some(v) => Ok(Some(
                serde_json::from_value(v.clone())
                    .map_err(|source| StoreError::ValueDecode { table: table.into(), source })?,
            )),
            None => Ok(None),
        }
    }

    pub fn list_delete_range(&self, table: &str, start: usize, end: usize) -> Result<()> {
        let inner = self.inner.lock();
        self.append(inner, WalEntry::ListDeleteRange { table: table.into(), start, end })
    }

    pub fn list_iterate<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>> {
        let inner = self.inner.lock();
        let Some(items) = inner.tables.lists.get(table) else {
            return Ok(Vec::new());
        };
        items
            .iter()
            .map(|v| {
                serde_json::from_value(v.clone())
                    .map_err(|source| StoreError::ValueDecode { table: table.into(), source })
            })
            .collect()
    }

    // ---- Mapping ----

    pub fn map_set<T: Serialize>(&self, table: &str, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|source| StoreError::ValueEncode { table: table.into(), source })?;
        let inner = self.inner.lock();
        self.append(inner, WalEntry::MapSet { table: table.into(), key: key.into(), value })
    }

    pub fn map_get<T: DeserializeOwned>(&self, table: &str, key: &str) -> Result<Option<T>> {
        let inner = self.inner.lock();
        match inner.tables.maps.get(table).and_then(|m| m.get(key)) {
            Some(v) => Ok(Some(
                serde_json::from_value(v.clone())
                    .map_err(|source| StoreError::ValueDecode { table: table.into(), source })?,
            )),
            None => Ok(None),
        }
    }

    pub fn map_delete(&self, table: &str, key: &str) -> Result<()> {
        let inner = self.inner.lock();
        self.append(inner, WalEntry::MapDelete { table: table.into(), key: key.into() })
    }

    pub fn map_len(&self, table: &str) -> usize {
        self.inner.lock().tables.maps.get(table).map_or(0, std::collections::HashMap::len)
    }

    pub fn map_iterate_keys(&self, table: &str) -> Vec<String> {
        self.inner
            .lock()
            .tables
            .maps
            .get(table)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    // ---- PriorityQueue ----

    pub fn queue_put<T: Serialize>(&self, table: &str, priority: f64, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|source| StoreError::ValueEncode { table: table.into(), source })?;
        let inner = self.inner.lock();
        self.append(inner, WalEntry::QueuePut { table: table.into(), priority, value })
    }

    /// Remove and return the highest-priority row. Ties broken by lowest id
    /// (earliest inserted wins), mirroring a stable priority queue.
    pub fn queue_pop<T: DeserializeOwned>(&self, table: &str) -> Result<Option<(u64, T)>> {
        let inner = self.inner.lock();
        let Some(row) = highest_priority_row(&inner.tables, table) else {
            return Ok(None);
        };
        let (id, value) = (row.id, row.value.clone());
        self.append(inner, WalEntry::QueueDeleteRow { table: table.into(), id })?;
        let value = serde_json::from_value(value)
            .map_err(|source| StoreError::ValueDecode { table: table.into(), source })?;
        Ok(Some((id, value)))
    }

    /// Remove the row with the given id, if still present. Used for
    /// delete-and-retry discipline when a candidate popped by a caller has
    /// already vanished underneath it.
    pub fn queue_remove(&self, table: &str, id: u64) -> Result<bool> {
        let inner = self.inner.lock();
        let present = inner
            .tables
            .queues
            .get(table)
            .is_some_and(|q| q.rows.iter().any(|r| r.id == id));
        if present {
            self.append(inner, WalEntry::QueueDeleteRow { table: table.into(), id })?;
        } else {
            drop(inner);
        }
        Ok(present)
    }

    /// Delete every row whose decoded value matches `pred`, returning the
    /// count removed. Mirrors `JsonSqlitePriorityQueue.remove(func)`: walk
    /// the table once to find candidates, then delete each; if a candidate
    /// vanishes underneath us (deleted by a concurrent `pop`/`remove`
    /// between the scan and the delete), rescan from scratch rather than
    /// risk over- or under-counting against a stale snapshot.
    pub fn queue_remove_where<T, F>(&self, table: &str, pred: F) -> Result<usize>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let mut total_removed = 0;
        loop {
            let candidates: Vec<u64> = {
                let inner = self.inner.lock();
                let Some(q) = inner.tables.queues.get(table) else {
                    return Ok(total_removed);
                };
                let mut matched = Vec::new();
                for row in &q.rows {
                    let value: T = serde_json::from_value(row.value.clone())
                        .map_err(|source| StoreError::ValueDecode { table: table.into(), source })?;
                    if pred(&value) {
                        matched.push(row.id);
                    }
                }
                matched
            };
            if candidates.is_empty() {
                return Ok(total_removed);
            }

            let mut vanished = false;
            for id in &candidates {
                if self.queue_remove(table, *id)? {
                    total_removed += 1;
                } else {
                    vanished = true;
                    break;
                }
            }
            if !vanished {
                return Ok(total_removed);
            }
        }
    }

    pub fn queue_list<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<(u64, f64, T)>> {
        let inner = self.inner.lock();
        let Some(q) = inner.tables.queues.get(table) else {
            return Ok(Vec::new());
        };
        q.rows
            .iter()
            .map(|row| {
                let value = serde_json::from_value(row.value.clone())
                    .map_err(|source| StoreError::ValueDecode { table: table.into(), source })?;
                Ok((row.id, row.priority, value))
            })
            .collect()
    }

    pub fn queue_clear(&self, table: &str) -> Result<()> {
        let inner = self.inner.lock();
        self.append(inner, WalEntry::QueueClear { table: table.into() })
    }

    pub fn queue_len(&self, table: &str) -> usize {
        self.inner.lock().tables.queues.get(table).map_or(0, |q| q.rows.len())
    }
}

fn highest_priority_row<'a>(tables: &'a Tables, table: &str) -> Option<&'a QueueRow> {
    tables.queues.get(table)?.rows.iter().max_by(|a, b| {
        a.priority
            .total_cmp(&b.priority)
            .then_with(|| b.id.cmp(&a.id))
    })
}

fn load_snapshot(path: &Path) -> Result<Tables> {
    let compressed =
        fs::read(path).map_err(|source| StoreError::SnapshotIo { path: path.to_path_buf(), source })?;
    let raw = zstd::decode_all(compressed.as_slice())
        .map_err(|source| StoreError::SnapshotIo { path: path.to_path_buf(), source })?;
    serde_json::from_slice(&raw)
        .map_err(|source| StoreError::SnapshotDecode { path: path.to_path_buf(), source })
}
