// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One durable priority queue per known project, all backed by a single
//! store file (`queues.db`), one table per project.

use std::sync::Arc;

use cld_core::{CrawlMessage, QueueEntry};
use cld_storage::{PriorityQueue, Store};

use crate::error::Result;

/// Owns the `queues.db` store and hands out a per-project priority queue
/// view over it. Project tables are created lazily on first access.
pub struct ProjectQueueSet {
    store: Arc<Store>,
}

impl ProjectQueueSet {
    pub fn new(store: Arc<Store>) -> Self {
        ProjectQueueSet { store }
    }

    /// The priority queue of pending crawl messages for `project`.
    pub fn queue(&self, project: &str) -> PriorityQueue<CrawlMessage> {
        PriorityQueue::new(self.store.clone(), format!("project:{project}"))
    }

    pub fn put(&self, project: &str, priority: f64, msg: &CrawlMessage) -> Result<()> {
        self.queue(project).put(priority, msg)?;
        Ok(())
    }

    pub fn list(&self, project: &str) -> Result<Vec<QueueEntry>> {
        Ok(self
            .queue(project)
            .list()?
            .into_iter()
            .map(|(id, priority, payload)| QueueEntry { id, priority, payload })
            .collect())
    }

    /// Remove every pending entry for `project` matching `pred`, returning
    /// the count removed.
    pub fn remove<F: Fn(&CrawlMessage) -> bool>(&self, project: &str, pred: F) -> Result<usize> {
        Ok(self.queue(project).remove(pred)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cld_core::CrawlMessage;
    use tempfile::tempdir;

    #[test]
    fn per_project_queues_are_independent() {
        let dir = tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path(), "queues").unwrap());
        let set = ProjectQueueSet::new(store);

        let msg_a = CrawlMessage::new("a", "spider-a", 1.0);
        let msg_b = CrawlMessage::new("b", "spider-b", 1.0);
        set.put("a", 1.0, &msg_a).unwrap();
        set.put("b", 1.0, &msg_b).unwrap();

        assert_eq!(set.queue("a").len(), 1);
        assert_eq!(set.queue("b").len(), 1);
        let (_, popped) = set.queue("a").pop().unwrap().unwrap();
        assert_eq!(popped.spider, "spider-a");
        assert_eq!(set.queue("b").len(), 1);
    }

    #[test]
    fn list_returns_queue_entries_and_remove_filters_by_predicate() {
        let dir = tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path(), "queues").unwrap());
        let set = ProjectQueueSet::new(store);

        let keep = CrawlMessage::new("a", "spider-keep", 1.0);
        let drop = CrawlMessage::new("a", "spider-drop", 1.0);
        set.put("a", 1.0, &keep).unwrap();
        set.put("a", 1.0, &drop).unwrap();

        let entries = set.list("a").unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.payload.spider == "spider-keep"));

        let removed = set.remove("a", |m| m.spider == "spider-drop").unwrap();
        assert_eq!(removed, 1);
        let remaining = set.list("a").unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].payload.spider, "spider-keep");
    }
}
