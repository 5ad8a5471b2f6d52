// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn builder_defaults_count_to_one() {
    let msg = CrawlMessage::new("proj", "spider1", 1.0);
    assert_eq!(msg.count, 1);
    assert!(msg.args.is_empty());
}

#[test]
fn from_wire_accepts_underscored_keys() {
    let value = json!({
        "_project": "proj",
        "_spider": "spider1",
        "_job": "a".repeat(32),
        "_priority": 3.5,
        "count": 2,
        "name": "custom",
        "settings": {"DOWNLOAD_DELAY": "2"},
    });
    let msg = CrawlMessage::from_wire(&value).unwrap();
    assert_eq!(msg.project, "proj");
    assert_eq!(msg.spider, "spider1");
    assert_eq!(msg.priority, 3.5);
    assert_eq!(msg.count, 2);
    assert_eq!(msg.args.get("name"), Some(&"custom".to_string()));
    assert_eq!(msg.settings.get("DOWNLOAD_DELAY"), Some(&"2".to_string()));
}

#[test]
fn from_wire_accepts_bare_keys() {
    let value = json!({"project": "p", "spider": "s", "priority": 1.0});
    let msg = CrawlMessage::from_wire(&value).unwrap();
    assert_eq!(msg.project, "p");
    assert_eq!(msg.spider, "s");
}

#[test]
fn from_wire_generates_job_when_absent() {
    let value = json!({"_project": "p", "_spider": "s", "_priority": 1.0});
    let msg = CrawlMessage::from_wire(&value).unwrap();
    assert!(crate::id::is_job_id(&msg.job));
}

#[test]
fn from_wire_rejects_missing_project() {
    let value = json!({"_spider": "s", "_priority": 1.0});
    let err = CrawlMessage::from_wire(&value).unwrap_err();
    assert_eq!(err, MessageError::MissingField("project"));
}

#[test]
fn from_wire_rejects_missing_priority() {
    let value = json!({"_project": "p", "_spider": "s"});
    let err = CrawlMessage::from_wire(&value).unwrap_err();
    assert_eq!(err, MessageError::MissingField("priority"));
}

#[test]
fn from_wire_drops_unknown_underscored_keys() {
    let value = json!({
        "_project": "p", "_spider": "s", "_priority": 1.0, "_internal": "drop-me",
    });
    let msg = CrawlMessage::from_wire(&value).unwrap();
    assert!(!msg.args.contains_key("_internal"));
}

#[test]
fn round_trips_through_json() {
    let msg = CrawlMessage::new("p", "s", 2.0).with_arg("url", "http://x");
    let encoded = serde_json::to_value(&msg).unwrap();
    let decoded: CrawlMessage = serde_json::from_value(encoded).unwrap();
    assert_eq!(msg, decoded);
}
