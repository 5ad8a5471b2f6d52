// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single entry point external callers (and the launcher's own
//! repeat-count mechanism) use to enqueue a crawl message.

use std::sync::Arc;

use cld_core::CrawlMessage;

use crate::error::Result;
use crate::poller::Poller;
use crate::queueset::ProjectQueueSet;

/// Enqueues crawl messages into their project's durable queue and wakes any
/// waiting poller. This is the only way a message enters a project queue —
/// external API handlers and the launcher's repeat-count resubmission both
/// call `schedule`.
#[derive(Clone)]
pub struct Scheduler {
    queues: Arc<ProjectQueueSet>,
    poller: Arc<Poller>,
}

impl Scheduler {
    pub fn new(queues: Arc<ProjectQueueSet>, poller: Arc<Poller>) -> Self {
        Scheduler { queues, poller }
    }

    pub fn schedule(&self, msg: CrawlMessage) -> Result<()> {
        self.queues.put(&msg.project, msg.priority, &msg)?;
        self.poller.notify_put();
        Ok(())
    }

    pub fn poller(&self) -> &Arc<Poller> {
        &self.poller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cld_storage::Store;
    use tempfile::tempdir;

    #[tokio::test]
    async fn schedule_wakes_a_suspended_poller() {
        let dir = tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path(), "queues").unwrap());
        let queues = Arc::new(ProjectQueueSet::new(store));
        let poller = Arc::new(Poller::new(queues.clone()));
        poller.update_projects(&["p".to_string()]);
        let scheduler = Scheduler::new(queues, poller.clone());

        let poller2 = poller.clone();
        let waiter = tokio::spawn(async move { poller2.next().await.unwrap() });
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        scheduler.schedule(CrawlMessage::new("p", "s", 1.0)).unwrap();

        let (project, _) = tokio::time::timeout(std::time::Duration::from_millis(500), waiter)
            .await
            .expect("poller did not wake")
            .unwrap();
        assert_eq!(project, "p");
    }
}
