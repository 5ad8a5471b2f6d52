// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status snapshot types shared between the daemon's in-process state and
//! its HTTP status view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingEntry {
    pub project: String,
    pub spider: String,
    pub job: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunningEntry {
    pub project: String,
    pub spider: String,
    pub job: String,
    pub pid: u32,
    pub count: u32,
    pub start_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinishedEntry {
    pub project: String,
    pub spider: String,
    pub job: String,
    pub count: u32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// A full point-in-time view of the daemon, as shown at `/jobs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatusSnapshot {
    pub pending: Vec<PendingEntry>,
    pub running: Vec<RunningEntry>,
    pub finished: Vec<FinishedEntry>,
    pub now: Option<DateTime<Utc>>,
}
