// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! crawld: a long-running daemon that schedules and supervises external
//! crawler processes on behalf of multiple named projects.
//!
//! Architecture:
//! - Launcher task: owns the slot pool, spawns and supervises children
//! - Project-refresh task: polls the project source, keeps the poller in sync
//! - Status listener: a tiny TCP responder serving the read-only status view

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod error;
mod projects;
mod status_listener;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cld_core::SystemClock;
use cld_engine::{Launcher, LauncherConfig, Poller, ProjectQueueSet, RunnerConfig, Scheduler};
use cld_storage::Store;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::projects::{DirProjectSource, ProjectSource};
use crate::status_listener::StatusCtx;

const PROJECT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    match std::env::args().nth(1).as_deref() {
        Some("--version") | Some("-V") => {
            println!("crawld {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some("--help") | Some("-h") => {
            println!("crawld [config.toml]");
            println!("Schedules and supervises crawl processes across projects.");
            Ok(())
        }
        Some(path) => run(Some(PathBuf::from(path))).await.map_err(Into::into),
        None => run(None).await.map_err(Into::into),
    }
}

async fn run(config_path: Option<PathBuf>) -> Result<()> {
    let config = Config::load(config_path.as_deref())?;
    let _log_guard = setup_logging(&config)?;

    info!(node = %config.node_name, max_proc = config.max_proc, "starting crawld");

    let queue_store = Arc::new(Store::open(&config.dbs_dir, "queues")?);
    let launcher_store = Arc::new(Store::open(&config.dbs_dir, "launcher")?);

    let queues = Arc::new(ProjectQueueSet::new(queue_store));
    let poller = Arc::new(Poller::new(queues.clone()));
    let scheduler = Scheduler::new(queues.clone(), poller.clone());

    let runner = RunnerConfig {
        interpreter: config.interpreter.clone(),
        runner_module: config.runner.clone(),
        logs_dir: config.logs_dir.clone(),
        items_dir: config.items_dir.clone(),
        settings_module: None,
    };
    let launcher_config = LauncherConfig {
        max_proc: config.max_proc,
        max_proc_per_cpu: config.max_proc_per_cpu,
        finished_to_keep: config.finished_to_keep,
        runner,
        cwd: config.dbs_dir.clone(),
    };
    let launcher =
        Arc::new(Launcher::new(launcher_config, scheduler.clone(), launcher_store, SystemClock));
    info!(max_proc = launcher.max_proc(), "resolved slot pool size");

    std::fs::create_dir_all(config.projects_dir())
        .map_err(|source| error::DaemonError::Io { path: config.projects_dir(), source })?;
    let project_source: Arc<dyn ProjectSource> = Arc::new(DirProjectSource::new(config.projects_dir()));

    tokio::spawn(refresh_projects(project_source.clone(), poller.clone()));
    tokio::spawn(Arc::clone(&launcher).run());

    let status_ctx = Arc::new(StatusCtx {
        queues,
        projects: project_source,
        launcher,
        logs_dir: config.logs_dir.clone(),
        items_dir: config.items_dir.clone(),
        node_name: config.node_name.clone(),
    });
    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|source| error::DaemonError::Io { path: PathBuf::from(&config.bind_addr), source })?;
    info!(addr = %config.bind_addr, "status listener ready");
    tokio::spawn(status_listener::run(listener, status_ctx));

    wait_for_shutdown().await;
    info!("shutting down");
    Ok(())
}

async fn refresh_projects(source: Arc<dyn ProjectSource>, poller: Arc<Poller>) {
    loop {
        let projects = source.list_projects();
        poller.update_projects(&projects);
        tokio::time::sleep(PROJECT_REFRESH_INTERVAL).await;
    }
}

async fn wait_for_shutdown() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to install SIGTERM handler");
            std::future::pending::<()>().await;
            unreachable!()
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
            unreachable!()
        }
    };
    tokio::select! {
        _ = sigterm.recv() => {}
        _ = sigint.recv() => {}
    }
}

fn setup_logging(config: &Config) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let file_appender = tracing_appender::rolling::never(&config.logs_dir, "crawld.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if config.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
