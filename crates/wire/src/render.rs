// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure rendering of a [`StatusSnapshot`] into the HTML jobs table. No
//! routing, templating engine, or request handling lives here.

use crate::status::StatusSnapshot;

const HEADER_COLS: [&str; 10] =
    ["Project", "Spider", "Job", "PID", "Count", "Start", "Runtime", "Finish", "Log", "Items"];

/// Render the full `/jobs` page for a snapshot.
pub fn render_status_html(snapshot: &StatusSnapshot) -> String {
    format!(
        "<html><head><title>crawld</title></head><body><h1>Jobs</h1>{}</body></html>",
        render_table(snapshot)
    )
}

fn render_table(snapshot: &StatusSnapshot) -> String {
    format!(
        "<table id=\"jobs\" border=\"1\"><thead>{header}</thead>\
         <tbody><tr><th colspan=\"{n}\">Pending</th></tr>{pending}</tbody>\
         <tbody><tr><th colspan=\"{n}\">Running</th></tr>{running}</tbody>\
         <tbody><tr><th colspan=\"{n}\">Finished</th></tr>{finished}</tbody></table>",
        header = prep_row(&HEADER_COLS.map(str::to_string)),
        n = HEADER_COLS.len(),
        pending = render_pending(snapshot),
        running = render_running(snapshot),
        finished = render_finished(snapshot),
    )
}

fn render_pending(snapshot: &StatusSnapshot) -> String {
    snapshot
        .pending
        .iter()
        .map(|e| {
            prep_row(&[
                e.project.clone(),
                e.spider.clone(),
                e.job.clone(),
                String::new(),
                e.count.to_string(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
            ])
        })
        .collect()
}

fn render_running(snapshot: &StatusSnapshot) -> String {
    let now = snapshot.now.unwrap_or_else(chrono::Utc::now);
    snapshot
        .running
        .iter()
        .map(|e| {
            let runtime = now - e.start_time;
            prep_row(&[
                e.project.clone(),
                e.spider.clone(),
                e.job.clone(),
                e.pid.to_string(),
                e.count.to_string(),
                e.start_time.to_rfc3339(),
                format_duration(runtime),
                String::new(),
                log_link(&e.project, &e.spider, &e.job),
                items_link(&e.project, &e.spider, &e.job),
            ])
        })
        .collect()
}

fn render_finished(snapshot: &StatusSnapshot) -> String {
    snapshot
        .finished
        .iter()
        .map(|e| {
            let runtime = e.end_time - e.start_time;
            prep_row(&[
                e.project.clone(),
                e.spider.clone(),
                e.job.clone(),
                String::new(),
                e.count.to_string(),
                e.start_time.to_rfc3339(),
                format_duration(runtime),
                e.end_time.to_rfc3339(),
                log_link(&e.project, &e.spider, &e.job),
                items_link(&e.project, &e.spider, &e.job),
            ])
        })
        .collect()
}

fn log_link(project: &str, spider: &str, job: &str) -> String {
    format!("<a href=\"/logs/{project}/{spider}/{job}.log\">Log</a>")
}

fn items_link(project: &str, spider: &str, job: &str) -> String {
    format!("<a href=\"/items/{project}/{spider}/{job}.jl\">Items</a>")
}

fn format_duration(d: chrono::Duration) -> String {
    let secs = d.num_seconds().max(0);
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

fn prep_row(cells: &[String]) -> String {
    let cells: String = cells.iter().map(|c| format!("<td>{c}</td>")).collect();
    format!("<tr>{cells}</tr>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{FinishedEntry, PendingEntry, RunningEntry};
    use chrono::{TimeZone, Utc};

    #[yare::parameterized(
        zero       = { 0,    "00:00:00" },
        sub_minute = { 45,   "00:00:45" },
        minutes    = { 90,   "00:01:30" },
        hours      = { 3661, "01:01:01" },
        negative   = { -5,   "00:00:00" },
    )]
    fn format_duration_renders_hh_mm_ss(secs: i64, expected: &str) {
        assert_eq!(format_duration(chrono::Duration::seconds(secs)), expected);
    }

    #[test]
    fn renders_header_columns() {
        let html = render_status_html(&StatusSnapshot::default());
        for col in HEADER_COLS {
            assert!(html.contains(col), "missing column {col}");
        }
    }

    #[test]
    fn renders_pending_running_finished_sections() {
        let start = Utc.with_ymd_and_hms(2026, 7, 31, 0, 0, 0).unwrap();
        let now = start + chrono::Duration::seconds(90);
        let snapshot = StatusSnapshot {
            pending: vec![PendingEntry {
                project: "p".into(),
                spider: "s".into(),
                job: "j1".into(),
                count: 1,
            }],
            running: vec![RunningEntry {
                project: "p".into(),
                spider: "s".into(),
                job: "j2".into(),
                pid: 1234,
                count: 1,
                start_time: start,
            }],
            finished: vec![FinishedEntry {
                project: "p".into(),
                spider: "s".into(),
                job: "j3".into(),
                count: 1,
                start_time: start,
                end_time: now,
            }],
            now: Some(now),
        };
        let html = render_status_html(&snapshot);
        assert!(html.contains("j1"));
        assert!(html.contains("j2"));
        assert!(html.contains("j3"));
        assert!(html.contains("1234"));
        assert!(html.contains("00:01:30"));
        assert!(html.contains("/logs/p/s/j2.log"));
        assert!(html.contains("/items/p/s/j3.jl"));
    }
}
