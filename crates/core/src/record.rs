// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable records: a pending `QueueEntry`, a `RunningJob`, and a `FinishedJob`.

use crate::message::CrawlMessage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `(id, priority, payload)` as stored in one project's priority queue.
///
/// `id` is assigned by the store at `put` time and only used to break ties
/// between equal-priority entries; it is not meaningful outside the queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueEntry {
    pub id: u64,
    pub priority: f64,
    pub payload: CrawlMessage,
}

/// How a job's child process concluded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExitOutcome {
    /// Exited with the given status code.
    Exited { code: i32 },
    /// The OS refused to spawn the child.
    SpawnFailed { reason: String },
    /// The message failed validation before a child was ever spawned.
    MalformedMessage { reason: String },
}

impl ExitOutcome {
    pub fn is_clean(&self) -> bool {
        matches!(self, ExitOutcome::Exited { code: 0 })
    }
}

/// A job whose child process is currently running (or, just after a restart,
/// about to be respawned) in a given slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunningJob {
    pub slot: u32,
    pub project: String,
    pub spider: String,
    pub job: String,
    pub priority: f64,
    pub pid: u32,
    pub start_time: DateTime<Utc>,
    pub env: BTreeMap<String, String>,
    pub msg: CrawlMessage,
}

/// A job whose child process has exited (or never started).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinishedJob {
    pub slot: u32,
    pub project: String,
    pub spider: String,
    pub job: String,
    pub priority: f64,
    pub pid: Option<u32>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub env: BTreeMap<String, String>,
    pub msg: CrawlMessage,
    pub outcome: ExitOutcome,
}

impl FinishedJob {
    pub fn from_running(running: RunningJob, end_time: DateTime<Utc>, outcome: ExitOutcome) -> Self {
        FinishedJob {
            slot: running.slot,
            project: running.project,
            spider: running.spider,
            job: running.job,
            priority: running.priority,
            pid: Some(running.pid),
            start_time: running.start_time,
            end_time,
            env: running.env,
            msg: running.msg,
            outcome,
        }
    }

    pub fn runtime(&self) -> chrono::Duration {
        self.end_time.signed_duration_since(self.start_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(slot: u32) -> RunningJob {
        RunningJob {
            slot,
            project: "p".into(),
            spider: "s".into(),
            job: "job1".into(),
            priority: 1.0,
            pid: 42,
            start_time: Utc::now(),
            env: BTreeMap::new(),
            msg: CrawlMessage::new("p", "s", 1.0),
        }
    }

    #[test]
    fn finished_job_start_before_end() {
        let r = running(0);
        let start = r.start_time;
        let end = start + chrono::Duration::seconds(5);
        let finished = FinishedJob::from_running(r, end, ExitOutcome::Exited { code: 0 });
        assert!(finished.start_time <= finished.end_time);
        assert_eq!(finished.runtime(), chrono::Duration::seconds(5));
        assert!(finished.outcome.is_clean());
    }

    #[test]
    fn crash_outcome_is_not_clean() {
        assert!(!ExitOutcome::Exited { code: 1 }.is_clean());
        assert!(!ExitOutcome::SpawnFailed { reason: "boom".into() }.is_clean());
    }
}
