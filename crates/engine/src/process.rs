// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-child process supervision: spawn, tag and forward stdout/stderr to
//! `tracing`, and signal completion exactly once.

use std::collections::BTreeMap;
use std::process::Stdio;

use cld_core::{CrawlMessage, ExitOutcome};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;

/// How to invoke the crawl runner and where its log/items files land.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub interpreter: String,
    pub runner_module: String,
    pub logs_dir: std::path::PathBuf,
    pub items_dir: std::path::PathBuf,
    pub settings_module: Option<String>,
}

/// Build the argv for invoking the crawl runner on behalf of `msg`.
///
/// `<interpreter> -m <runner> crawl <spider> -a k=v ... -s K=V ...`
pub fn build_argv(config: &RunnerConfig, msg: &CrawlMessage) -> Vec<String> {
    let mut argv = vec![
        config.interpreter.clone(),
        "-m".to_string(),
        config.runner_module.clone(),
        "crawl".to_string(),
        msg.spider.clone(),
    ];
    for (k, v) in &msg.args {
        argv.push("-a".to_string());
        argv.push(format!("{k}={v}"));
    }
    for (k, v) in &msg.settings {
        argv.push("-s".to_string());
        argv.push(format!("{k}={v}"));
    }
    argv
}

/// Build the environment the runner collaborator (§6) must supply:
/// `SCRAPY_PROJECT`, `SCRAPY_SPIDER`, `SCRAPY_JOB`, `SCRAPY_LOG_FILE`,
/// `SCRAPY_FEED_URI`, and `SCRAPY_SETTINGS_MODULE` when configured.
pub fn build_env(config: &RunnerConfig, project: &str, msg: &CrawlMessage) -> BTreeMap<String, String> {
    let log_file = config.logs_dir.join(project).join(&msg.spider).join(format!("{}.log", msg.job));
    let feed_uri = config.items_dir.join(project).join(&msg.spider).join(format!("{}.jl", msg.job));

    let mut env = BTreeMap::new();
    env.insert("SCRAPY_PROJECT".to_string(), project.to_string());
    env.insert("SCRAPY_SPIDER".to_string(), msg.spider.clone());
    env.insert("SCRAPY_JOB".to_string(), msg.job.clone());
    env.insert("SCRAPY_LOG_FILE".to_string(), log_file.display().to_string());
    env.insert("SCRAPY_FEED_URI".to_string(), feed_uri.display().to_string());
    if let Some(module) = &config.settings_module {
        env.insert("SCRAPY_SETTINGS_MODULE".to_string(), module.clone());
    }
    env
}

/// A child process that has been successfully spawned: its pid is known
/// immediately, and `completion` resolves exactly once when it exits.
pub struct SpawnedChild {
    pub pid: u32,
    pub completion: oneshot::Receiver<ExitOutcome>,
}

/// Spawn the crawl runner for `msg` with the given argv/env, wiring its
/// stdout/stderr into `tracing` tagged by pid, and returning a handle whose
/// `completion` channel fires once on exit.
pub fn spawn_child(
    argv: &[String],
    env: &BTreeMap<String, String>,
    cwd: &std::path::Path,
) -> std::io::Result<SpawnedChild> {
    let mut cmd = Command::new(&argv[0]);
    cmd.args(&argv[1..])
        .envs(env)
        .current_dir(cwd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(false);

    let mut child = cmd.spawn()?;
    let pid = child.id().unwrap_or(0);

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        if let Some(stdout) = stdout {
            tokio::spawn(forward_lines(stdout, pid, false));
        }
        if let Some(stderr) = stderr {
            tokio::spawn(forward_lines(stderr, pid, true));
        }

        let outcome = match child.wait().await {
            Ok(status) => ExitOutcome::Exited { code: status.code().unwrap_or(-1) },
            Err(e) => ExitOutcome::SpawnFailed { reason: e.to_string() },
        };
        let _ = tx.send(outcome);
    });

    Ok(SpawnedChild { pid, completion: rx })
}

async fn forward_lines(reader: impl tokio::io::AsyncRead + Unpin, pid: u32, is_stderr: bool) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if is_stderr {
                    tracing::warn!(pid, "{line}");
                } else {
                    tracing::info!(pid, "{line}");
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(pid, error = %e, "error reading child output");
                break;
            }
        }
    }
}
