// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A tiny `tokio`-based TCP responder for the read-only status view: no
//! router DSL, no web framework. One connection at a time, a request line
//! is read (and its headers drained and ignored), and a plain-text or HTML
//! response is written back.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use cld_core::Clock;
use cld_engine::{Launcher, ProjectQueueSet};
use cld_wire::status::{FinishedEntry, PendingEntry, RunningEntry, StatusSnapshot};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::projects::ProjectSource;

pub struct StatusCtx<C: Clock> {
    pub queues: Arc<ProjectQueueSet>,
    pub projects: Arc<dyn ProjectSource>,
    pub launcher: Arc<Launcher<C>>,
    pub logs_dir: PathBuf,
    pub items_dir: PathBuf,
    pub node_name: String,
}

/// Accept connections forever, handling each on its own task.
pub async fn run<C: Clock + 'static>(listener: TcpListener, ctx: Arc<StatusCtx<C>>) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, ctx).await {
                        tracing::warn!(error = %e, "status connection error");
                    }
                });
            }
            Err(e) => tracing::error!(error = %e, "status listener accept error"),
        }
    }
}

async fn handle_connection<C: Clock + 'static>(
    stream: TcpStream,
    ctx: Arc<StatusCtx<C>>,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    // Drain and ignore headers up to the blank line.
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 || line == "\r\n" || line == "\n" {
            break;
        }
    }

    let path = parse_path(&request_line).unwrap_or_else(|| "/".to_string());
    let (status, content_type, body) = route(&path, &ctx).await;

    let mut stream = reader.into_inner();
    let header = format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(header.as_bytes()).await?;
    stream.write_all(&body).await?;
    stream.flush().await
}

fn parse_path(request_line: &str) -> Option<String> {
    request_line.split_whitespace().nth(1).map(|s| s.to_string())
}

async fn route<C: Clock + 'static>(path: &str, ctx: &StatusCtx<C>) -> (&'static str, &'static str, Vec<u8>) {
    if path == "/" {
        let body = format!("crawld node {}\nSee /jobs for status.\n", ctx.node_name);
        return ("200 OK", "text/plain; charset=utf-8", body.into_bytes());
    }
    if path == "/jobs" {
        let snapshot = build_snapshot(ctx).await;
        let html = cld_wire::render_status_html(&snapshot);
        return ("200 OK", "text/html; charset=utf-8", html.into_bytes());
    }
    if let Some(rest) = path.strip_prefix("/logs/") {
        return serve_file(&ctx.logs_dir, rest, "text/plain; charset=utf-8").await;
    }
    if let Some(rest) = path.strip_prefix("/items/") {
        return serve_file(&ctx.items_dir, rest, "application/json-lines").await;
    }
    ("404 Not Found", "text/plain; charset=utf-8", b"not found\n".to_vec())
}

async fn build_snapshot<C: Clock + 'static>(ctx: &StatusCtx<C>) -> StatusSnapshot {
    let mut pending = Vec::new();
    for project in ctx.projects.list_projects() {
        if let Ok(entries) = ctx.queues.list(&project) {
            pending.extend(entries.into_iter().map(|e| PendingEntry {
                project: e.payload.project,
                spider: e.payload.spider,
                job: e.payload.job,
                count: e.payload.count,
            }));
        }
    }

    let running = ctx
        .launcher
        .running_jobs()
        .into_iter()
        .map(|r| RunningEntry {
            project: r.project,
            spider: r.spider,
            job: r.job,
            pid: r.pid,
            count: r.msg.count,
            start_time: r.start_time,
        })
        .collect();

    let finished = ctx
        .launcher
        .finished_jobs()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|f| FinishedEntry {
            project: f.project,
            spider: f.spider,
            job: f.job,
            count: f.msg.count,
            start_time: f.start_time,
            end_time: f.end_time,
        })
        .collect();

    StatusSnapshot { pending, running, finished, now: Some(Utc::now()) }
}

/// Serve a file under `root/rest`, rejecting any path segment that would
/// escape `root` (no `..`, no absolute components).
async fn serve_file(root: &Path, rest: &str, content_type: &'static str) -> (&'static str, &'static str, Vec<u8>) {
    if rest.split('/').any(|segment| segment.is_empty() || segment == ".." || segment == ".") {
        return ("400 Bad Request", "text/plain; charset=utf-8", b"invalid path\n".to_vec());
    }
    let path = root.join(rest);
    match tokio::fs::read(&path).await {
        Ok(body) => ("200 OK", content_type, body),
        Err(_) => ("404 Not Found", "text/plain; charset=utf-8", b"not found\n".to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_path_from_request_line() {
        assert_eq!(parse_path("GET /jobs HTTP/1.1\r\n"), Some("/jobs".to_string()));
        assert_eq!(parse_path(""), None);
    }

    #[tokio::test]
    async fn serve_file_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.log"), b"hello").unwrap();

        let (status, _, _) = serve_file(dir.path(), "../a.log", "text/plain").await;
        assert_eq!(status, "400 Bad Request");

        let (status, _, body) = serve_file(dir.path(), "a.log", "text/plain").await;
        assert_eq!(status, "200 OK");
        assert_eq!(body, b"hello");

        let (status, _, _) = serve_file(dir.path(), "missing.log", "text/plain").await;
        assert_eq!(status, "404 Not Found");
    }
}
