// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Round-robin fair delivery of the next ready crawl message across every
//! known project's queue.

use std::sync::Arc;

use cld_core::CrawlMessage;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::Result;
use crate::queueset::ProjectQueueSet;

/// Delivers `(project, message)` pairs fairly across projects: a rotating
/// cursor over known project names, not implicit map iteration order.
pub struct Poller {
    queues: Arc<ProjectQueueSet>,
    cursor: Mutex<Vec<String>>,
    notify: Notify,
}

impl Poller {
    pub fn new(queues: Arc<ProjectQueueSet>) -> Self {
        Poller { queues, cursor: Mutex::new(Vec::new()), notify: Notify::new() }
    }

    /// Replace the set of known projects, preserving the rotation position
    /// of projects that are still known and appending newly known ones at
    /// the tail.
    pub fn update_projects(&self, projects: &[String]) {
        let mut cursor = self.cursor.lock();
        let mut next: Vec<String> = cursor.iter().filter(|p| projects.contains(p)).cloned().collect();
        for p in projects {
            if !next.contains(p) {
                next.push(p.clone());
            }
        }
        *cursor = next;
        drop(cursor);
        self.notify.notify_waiters();
    }

    /// Called after a `put` into any project queue, to wake a suspended waiter.
    pub fn notify_put(&self) {
        self.notify.notify_waiters();
    }

    /// One rotation attempt: try each known project once, front to back.
    /// The first project with a non-empty pop wins and is moved to the
    /// tail, so the next call starts from the project after it.
    fn try_pop_one(&self) -> Result<Option<(String, CrawlMessage)>> {
        let mut cursor = self.cursor.lock();
        let attempts = cursor.len();
        for _ in 0..attempts {
            let Some(project) = cursor.first().cloned() else { break };
            cursor.rotate_left(1);
            if let Some((_, msg)) = self.queues.queue(&project).pop()? {
                return Ok(Some((project, msg)));
            }
        }
        Ok(None)
    }

    /// Suspend until a message is available, then return it along with the
    /// project it came from. Cancellation-safe: dropping the future before
    /// it resolves consumes nothing.
    ///
    /// Registers interest in `notify` before checking the queues, not after,
    /// so a `notify_put()` racing the check can't be missed: without this
    /// ordering a put landing between an empty `try_pop_one` and the
    /// `notified().await` call would go unnoticed until the next notify.
    pub async fn next(&self) -> Result<(String, CrawlMessage)> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(found) = self.try_pop_one()? {
                return Ok(found);
            }
            notified.await;
        }
    }
}
