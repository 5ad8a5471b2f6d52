// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `CrawlMessage` wire format and its reserved-key contract.
//!
//! A crawl message is conceptually a flat mapping of string keys to string
//! values: four reserved keys (`_project`, `_spider`, `_job`, `_priority`)
//! carry the fields the launcher needs to route and spawn the crawl, `count`
//! drives the repeat mechanism, `settings` is a nested mapping forwarded as
//! `-s KEY=VALUE` pairs, and every other non-underscore-prefixed key is
//! forwarded as a `-a key=value` pair to the spider. Keys starting with `_`
//! other than the four reserved ones are dropped — they are not part of this
//! system's contract.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::id::new_job_id;

/// A crawl message failed validation: a reserved field was missing or malformed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessageError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("field '{field}' has the wrong type: {detail}")]
    WrongType { field: &'static str, detail: String },
}

/// A fully validated crawl message, ready to be queued or dequeued.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrawlMessage {
    pub project: String,
    pub spider: String,
    pub job: String,
    pub priority: f64,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub args: BTreeMap<String, String>,
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

fn default_count() -> u32 {
    1
}

impl CrawlMessage {
    /// Build a new message for scheduling. `job` is generated if not yet known;
    /// callers that need a specific id (e.g. repeat-count resubmission) set it directly.
    pub fn new(project: impl Into<String>, spider: impl Into<String>, priority: f64) -> Self {
        Self {
            project: project.into(),
            spider: spider.into(),
            job: new_job_id(),
            priority,
            count: 1,
            args: BTreeMap::new(),
            settings: BTreeMap::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count.max(1);
        self
    }

    /// Parse from the raw JSON wire representation, validating the reserved fields.
    ///
    /// Accepts either the canonical underscore-prefixed keys (`_project`, `_spider`,
    /// `_job`, `_priority`) or their bare equivalents (`project`, `spider`, `job`,
    /// `priority`); the underscore form takes precedence when both are present.
    pub fn from_wire(value: &serde_json::Value) -> Result<Self, MessageError> {
        let obj = value.as_object().ok_or(MessageError::WrongType {
            field: "<message>",
            detail: "expected a JSON object".to_string(),
        })?;

        let project = required_string(obj, "_project", "project")?;
        let spider = required_string(obj, "_spider", "spider")?;
        let job = match required_string(obj, "_job", "job") {
            Ok(j) => j,
            Err(MessageError::MissingField(_)) => new_job_id(),
            Err(e) => return Err(e),
        };
        let priority = required_f64(obj, "_priority", "priority")?;
        let count = obj
            .get("count")
            .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
            .map(|c| c.max(1) as u32)
            .unwrap_or(1);

        let settings = obj
            .get("settings")
            .and_then(|v| v.as_object())
            .map(|m| {
                m.iter()
                    .map(|(k, v)| (k.clone(), value_to_string(v)))
                    .collect::<BTreeMap<_, _>>()
            })
            .unwrap_or_default();

        let reserved = [
            "_project", "project", "_spider", "spider", "_job", "job", "_priority", "priority",
            "count", "settings",
        ];
        let args = obj
            .iter()
            .filter(|(k, _)| !k.starts_with('_') && !reserved.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), value_to_string(v)))
            .collect::<BTreeMap<_, _>>();

        Ok(CrawlMessage { project, spider, job, priority, count, args, settings })
    }
}

fn value_to_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn required_string(
    obj: &serde_json::Map<String, serde_json::Value>,
    underscored: &'static str,
    bare: &'static str,
) -> Result<String, MessageError> {
    let v = obj.get(underscored).or_else(|| obj.get(bare));
    match v {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(other) => Err(MessageError::WrongType {
            field: bare,
            detail: format!("expected non-empty string, got {other}"),
        }),
        None => Err(MessageError::MissingField(bare)),
    }
}

fn required_f64(
    obj: &serde_json::Map<String, serde_json::Value>,
    underscored: &'static str,
    bare: &'static str,
) -> Result<f64, MessageError> {
    let v = obj.get(underscored).or_else(|| obj.get(bare));
    match v {
        Some(n) if n.is_number() => Ok(n.as_f64().unwrap_or(0.0)),
        Some(serde_json::Value::String(s)) => {
            s.parse().map_err(|_| MessageError::WrongType {
                field: bare,
                detail: format!("cannot parse '{s}' as a number"),
            })
        }
        Some(other) => Err(MessageError::WrongType {
            field: bare,
            detail: format!("expected a number, got {other}"),
        }),
        None => Err(MessageError::MissingField(bare)),
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
