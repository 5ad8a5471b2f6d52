// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ergonomic generic wrappers over the raw JSON-valued [`Store`] tables.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;
use crate::store::Store;

/// An ordered, append-only sequence of `T`, such as the finished-jobs log.
pub struct List<T> {
    store: Arc<Store>,
    table: String,
    _marker: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> List<T> {
    pub fn new(store: Arc<Store>, table: impl Into<String>) -> Self {
        List { store, table: table.into(), _marker: PhantomData }
    }

    pub fn append(&self, value: &T) -> Result<()> {
        self.store.list_append(&self.table, value)
    }

    pub fn len(&self) -> usize {
        self.store.list_len(&self.table)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Result<Option<T>> {
        self.store.list_get(&self.table, index)
    }

    pub fn delete_range(&self, start: usize, end: usize) -> Result<()> {
        self.store.list_delete_range(&self.table, start, end)
    }

    pub fn iterate(&self) -> Result<Vec<T>> {
        self.store.list_iterate(&self.table)
    }
}

/// A key-unique mapping from `String` to `V`, such as the running-jobs set.
pub struct Mapping<V> {
    store: Arc<Store>,
    table: String,
    _marker: PhantomData<V>,
}

impl<V: Serialize + DeserializeOwned> Mapping<V> {
    pub fn new(store: Arc<Store>, table: impl Into<String>) -> Self {
        Mapping { store, table: table.into(), _marker: PhantomData }
    }

    pub fn set(&self, key: &str, value: &V) -> Result<()> {
        self.store.map_set(&self.table, key, value)
    }

    pub fn get(&self, key: &str) -> Result<Option<V>> {
        self.store.map_get(&self.table, key)
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        self.store.map_delete(&self.table, key)
    }

    pub fn len(&self) -> usize {
        self.store.map_len(&self.table)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<String> {
        self.store.map_iterate_keys(&self.table)
    }
}

/// A pop-highest-priority queue of `T`, keyed by an opaque row id assigned
/// on insertion. Ties break toward the earliest-inserted (lowest id) row.
pub struct PriorityQueue<T> {
    store: Arc<Store>,
    table: String,
    _marker: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> PriorityQueue<T> {
    pub fn new(store: Arc<Store>, table: impl Into<String>) -> Self {
        PriorityQueue { store, table: table.into(), _marker: PhantomData }
    }

    pub fn put(&self, priority: f64, value: &T) -> Result<()> {
        self.store.queue_put(&self.table, priority, value)
    }

    pub fn pop(&self) -> Result<Option<(u64, T)>> {
        self.store.queue_pop(&self.table)
    }

    /// Delete every row whose value matches `pred`, returning the count
    /// removed.
    pub fn remove<F: Fn(&T) -> bool>(&self, pred: F) -> Result<usize> {
        self.store.queue_remove_where(&self.table, pred)
    }

    pub fn list(&self) -> Result<Vec<(u64, f64, T)>> {
        self.store.queue_list(&self.table)
    }

    pub fn clear(&self) -> Result<()> {
        self.store.queue_clear(&self.table)
    }

    pub fn len(&self) -> usize {
        self.store.queue_len(&self.table)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn typed_priority_queue_round_trips() {
        let dir = tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path(), "t").unwrap());
        let q: PriorityQueue<String> = PriorityQueue::new(store, "pending");
        q.put(1.0, &"a".to_string()).unwrap();
        q.put(2.0, &"b".to_string()).unwrap();
        let (_, v) = q.pop().unwrap().unwrap();
        assert_eq!(v, "b");
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn typed_priority_queue_removes_by_predicate() {
        let dir = tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path(), "t").unwrap());
        let q: PriorityQueue<String> = PriorityQueue::new(store, "pending");
        q.put(1.0, &"a".to_string()).unwrap();
        q.put(2.0, &"b".to_string()).unwrap();
        q.put(3.0, &"ab".to_string()).unwrap();
        let removed = q.remove(|v| v.starts_with('a')).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(q.len(), 1);
        assert_eq!(q.list().unwrap()[0].2, "b");
    }

    #[test]
    fn typed_mapping_round_trips() {
        let dir = tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path(), "t").unwrap());
        let m: Mapping<i64> = Mapping::new(store, "running");
        m.set("job-1", &7).unwrap();
        assert_eq!(m.get("job-1").unwrap(), Some(7));
        assert_eq!(m.keys(), vec!["job-1".to_string()]);
        m.delete("job-1").unwrap();
        assert!(m.is_empty());
    }
}
