// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The slot pool: `max_proc` independent "waiter → spawner → awaiter →
//! recorder" loops, backed by a durable running-set that survives restart.

use std::collections::HashMap;
use std::sync::Arc;

use cld_core::{Clock, CrawlMessage, ExitOutcome, FinishedJob, RunningJob};
use cld_storage::{List, Mapping, Store};
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex as AsyncMutex;

use crate::error::Result;
use crate::process::{build_argv, build_env, spawn_child, RunnerConfig};
use crate::scheduler::Scheduler;

/// Tunables controlling slot count and finished-list retention.
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    /// `0` means "derive from cpu_count * max_proc_per_cpu".
    pub max_proc: u32,
    pub max_proc_per_cpu: u32,
    pub finished_to_keep: usize,
    pub runner: RunnerConfig,
    pub cwd: std::path::PathBuf,
}

impl LauncherConfig {
    pub fn resolved_max_proc(&self) -> u32 {
        if self.max_proc > 0 {
            return self.max_proc;
        }
        let cpus = std::thread::available_parallelism().map(|n| n.get() as u32).unwrap_or(1);
        (cpus * self.max_proc_per_cpu).max(1)
    }
}

fn now_utc<C: Clock>(clock: &C) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(clock.epoch_ms() as i64).single().unwrap_or_else(Utc::now)
}

/// Owns every slot, the durable running-set, and the bounded finished log.
pub struct Launcher<C: Clock> {
    config: LauncherConfig,
    scheduler: Scheduler,
    running: Mapping<RunningJob>,
    finished: AsyncMutex<List<FinishedJob>>,
    processes: SyncMutex<HashMap<u32, RunningJob>>,
    clock: C,
}

impl<C: Clock + 'static> Launcher<C> {
    pub fn new(config: LauncherConfig, scheduler: Scheduler, store: Arc<Store>, clock: C) -> Self {
        Launcher {
            config,
            scheduler,
            running: Mapping::new(store.clone(), "processes"),
            finished: AsyncMutex::new(List::new(store, "finished_job")),
            processes: SyncMutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn max_proc(&self) -> u32 {
        self.config.resolved_max_proc()
    }

    /// A snapshot of currently-running jobs, for the status view.
    pub fn running_jobs(&self) -> Vec<RunningJob> {
        self.processes.lock().values().cloned().collect()
    }

    pub async fn finished_jobs(&self) -> Result<Vec<FinishedJob>> {
        Ok(self.finished.lock().await.iterate()?)
    }

    /// Run every slot's loop forever. Slots recovered from a prior run's
    /// durable running-set immediately respawn their stored message before
    /// joining the normal poller-driven loop.
    pub async fn run(self: Arc<Self>) {
        let max_proc = self.max_proc();
        let mut handles = Vec::new();
        for slot in 0..max_proc {
            let recovered = self.running.get(&slot.to_string()).ok().flatten();
            if recovered.is_some() {
                tracing::warn!(slot, "recovering slot from durable running-set after restart");
                let _ = self.running.delete(&slot.to_string());
            }
            let this = self.clone();
            handles.push(tokio::spawn(this.slot_loop(slot, recovered)));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }

    async fn slot_loop(self: Arc<Self>, slot: u32, mut recovered: Option<RunningJob>) {
        loop {
            let (project, msg, reused_env) = if let Some(r) = recovered.take() {
                (r.project, r.msg, Some(r.env))
            } else {
                match self.scheduler.poller().next().await {
                    Ok(v) => (v.0, v.1, None),
                    Err(e) => {
                        tracing::error!(slot, error = %e, "poller error, retrying");
                        continue;
                    }
                }
            };
            if let Err(e) = self.run_one(slot, project, msg, reused_env).await {
                tracing::error!(slot, error = %e, "error running job");
            }
        }
    }

    async fn run_one(
        &self,
        slot: u32,
        project: String,
        msg: CrawlMessage,
        reused_env: Option<std::collections::BTreeMap<String, String>>,
    ) -> Result<()> {
        let env = reused_env.unwrap_or_else(|| build_env(&self.config.runner, &project, &msg));
        let argv = build_argv(&self.config.runner, &msg);

        let spawned = match spawn_child(&argv, &env, &self.config.cwd) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(slot, project, spider = %msg.spider, error = %e, "failed to spawn child");
                let now = now_utc(&self.clock);
                let finished = FinishedJob {
                    slot,
                    project: project.clone(),
                    spider: msg.spider.clone(),
                    job: msg.job.clone(),
                    priority: msg.priority,
                    pid: None,
                    start_time: now,
                    end_time: now,
                    env,
                    msg: msg.clone(),
                    outcome: ExitOutcome::SpawnFailed { reason: e.to_string() },
                };
                self.record_finished(finished).await?;
                self.requeue_if_repeating(&msg)?;
                return Ok(());
            }
        };

        let running = RunningJob {
            slot,
            project: project.clone(),
            spider: msg.spider.clone(),
            job: msg.job.clone(),
            priority: msg.priority,
            pid: spawned.pid,
            start_time: now_utc(&self.clock),
            env,
            msg: msg.clone(),
        };
        self.running.set(&slot.to_string(), &running)?;
        self.processes.lock().insert(slot, running.clone());

        let outcome = spawned
            .completion
            .await
            .unwrap_or_else(|_| ExitOutcome::SpawnFailed { reason: "completion channel dropped".into() });

        self.running.delete(&slot.to_string())?;
        self.processes.lock().remove(&slot);

        let finished = FinishedJob::from_running(running, now_utc(&self.clock), outcome);
        self.record_finished(finished).await?;
        self.requeue_if_repeating(&msg)?;
        Ok(())
    }

    /// Record a message that failed validation before ever reaching a slot:
    /// no process ran, so no `RunningJob` ever existed for it.
    pub async fn record_malformed(&self, project: &str, spider: &str, reason: String) -> Result<()> {
        let now = now_utc(&self.clock);
        let finished = FinishedJob {
            slot: u32::MAX,
            project: project.to_string(),
            spider: spider.to_string(),
            job: String::new(),
            priority: 0.0,
            pid: None,
            start_time: now,
            end_time: now,
            env: Default::default(),
            msg: CrawlMessage::new(project, spider, 0.0),
            outcome: ExitOutcome::MalformedMessage { reason },
        };
        self.record_finished(finished).await
    }

    async fn record_finished(&self, finished: FinishedJob) -> Result<()> {
        let finished_list = self.finished.lock().await;
        finished_list.append(&finished)?;
        let len = finished_list.len();
        let keep = self.config.finished_to_keep;
        if len > keep {
            finished_list.delete_range(0, len - keep)?;
        }
        Ok(())
    }

    fn requeue_if_repeating(&self, msg: &CrawlMessage) -> Result<()> {
        if msg.count > 1 {
            let mut next = msg.clone();
            next.count -= 1;
            next.job = cld_core::new_job_id();
            self.scheduler.schedule(next)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "launcher_tests.rs"]
mod tests;
