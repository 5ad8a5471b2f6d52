// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: a TOML file merged with `CRAWLD_`-prefixed
//! environment variable overrides, validated and filled with derived
//! defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{DaemonError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
struct RawConfig {
    dbs_dir: Option<String>,
    max_proc: Option<u32>,
    max_proc_per_cpu: Option<u32>,
    finished_to_keep: Option<usize>,
    runner: Option<String>,
    interpreter: Option<String>,
    logs_dir: Option<String>,
    items_dir: Option<String>,
    node_name: Option<String>,
    debug: Option<bool>,
    bind_addr: Option<String>,
}

/// Fully resolved daemon settings, ready to drive store opens, the
/// launcher, and the status listener.
#[derive(Debug, Clone)]
pub struct Config {
    pub dbs_dir: PathBuf,
    pub max_proc: u32,
    pub max_proc_per_cpu: u32,
    pub finished_to_keep: usize,
    pub runner: String,
    pub interpreter: String,
    pub logs_dir: PathBuf,
    pub items_dir: PathBuf,
    pub node_name: String,
    pub debug: bool,
    pub bind_addr: String,
}

impl Config {
    /// Directory housing one subdirectory per known project, scanned by
    /// `DirProjectSource`. Not itself a configuration key — derived from
    /// `dbs_dir` so it survives alongside the durable stores.
    pub fn projects_dir(&self) -> PathBuf {
        self.dbs_dir.join("projects")
    }

    /// Load from an optional TOML file, then apply `CRAWLD_*` environment
    /// overrides, then fill defaults and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let raw = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)
                    .map_err(|source| DaemonError::Io { path: p.to_path_buf(), source })?;
                toml::from_str(&text).map_err(|e| DaemonError::Configuration(e.to_string()))?
            }
            None => RawConfig::default(),
        };

        let dbs_dir = env_string("CRAWLD_DBS_DIR")
            .or(raw.dbs_dir)
            .unwrap_or_else(|| "./dbs".to_string())
            .into();
        let logs_dir = env_string("CRAWLD_LOGS_DIR")
            .or(raw.logs_dir)
            .unwrap_or_else(|| "./logs".to_string())
            .into();
        let items_dir = env_string("CRAWLD_ITEMS_DIR")
            .or(raw.items_dir)
            .unwrap_or_else(|| "./items".to_string())
            .into();
        let runner = env_string("CRAWLD_RUNNER").or(raw.runner).unwrap_or_else(|| "crawld.runner".to_string());
        let interpreter =
            env_string("CRAWLD_INTERPRETER").or(raw.interpreter).unwrap_or_else(|| "python3".to_string());
        let node_name = env_string("CRAWLD_NODE_NAME")
            .or(raw.node_name)
            .or_else(|| env_string("HOSTNAME"))
            .unwrap_or_else(|| "crawld".to_string());
        let bind_addr = env_string("CRAWLD_BIND_ADDR")
            .or(raw.bind_addr)
            .unwrap_or_else(|| "127.0.0.1:6800".to_string());

        let max_proc = env_u32("CRAWLD_MAX_PROC").or(raw.max_proc).unwrap_or(0);
        let max_proc_per_cpu = env_u32("CRAWLD_MAX_PROC_PER_CPU").or(raw.max_proc_per_cpu).unwrap_or(4);
        let finished_to_keep =
            env_usize("CRAWLD_FINISHED_TO_KEEP").or(raw.finished_to_keep).unwrap_or(100);
        let debug = env_bool("CRAWLD_DEBUG").or(raw.debug).unwrap_or(false);

        if finished_to_keep == 0 {
            return Err(DaemonError::Configuration("finished_to_keep must be positive".into()));
        }
        if max_proc_per_cpu == 0 {
            return Err(DaemonError::Configuration("max_proc_per_cpu must be positive".into()));
        }

        let config = Config {
            dbs_dir,
            max_proc,
            max_proc_per_cpu,
            finished_to_keep,
            runner,
            interpreter,
            logs_dir,
            items_dir,
            node_name,
            debug,
            bind_addr,
        };

        std::fs::create_dir_all(&config.dbs_dir)
            .map_err(|source| DaemonError::Io { path: config.dbs_dir.clone(), source })?;
        std::fs::create_dir_all(&config.logs_dir)
            .map_err(|source| DaemonError::Io { path: config.logs_dir.clone(), source })?;
        std::fs::create_dir_all(&config.items_dir)
            .map_err(|source| DaemonError::Io { path: config.items_dir.clone(), source })?;

        Ok(config)
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u32(key: &str) -> Option<u32> {
    env_string(key).and_then(|s| s.parse().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_string(key).and_then(|s| s.parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    env_string(key).and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    #[serial]
    fn defaults_apply_with_no_file_and_no_env() {
        for key in [
            "CRAWLD_DBS_DIR",
            "CRAWLD_MAX_PROC",
            "CRAWLD_MAX_PROC_PER_CPU",
            "CRAWLD_FINISHED_TO_KEEP",
            "CRAWLD_RUNNER",
            "CRAWLD_INTERPRETER",
            "CRAWLD_LOGS_DIR",
            "CRAWLD_ITEMS_DIR",
            "CRAWLD_NODE_NAME",
            "CRAWLD_DEBUG",
            "CRAWLD_BIND_ADDR",
        ] {
            std::env::remove_var(key);
        }
        let dir = tempdir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();

        let config = Config::load(None).unwrap();
        assert_eq!(config.max_proc, 0);
        assert_eq!(config.max_proc_per_cpu, 4);
        assert_eq!(config.finished_to_keep, 100);
        assert_eq!(config.bind_addr, "127.0.0.1:6800");
        assert!(config.dbs_dir.exists());
    }

    #[test]
    #[serial]
    fn toml_file_values_are_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crawld.toml");
        std::fs::write(
            &path,
            r#"
            dbs_dir = "data"
            max_proc = 2
            finished_to_keep = 5
            node_name = "test-node"
            "#,
        )
        .unwrap();
        std::env::set_current_dir(dir.path()).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.max_proc, 2);
        assert_eq!(config.finished_to_keep, 5);
        assert_eq!(config.node_name, "test-node");
    }

    #[test]
    #[serial]
    fn env_override_beats_toml_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crawld.toml");
        std::fs::write(&path, "max_proc = 2\n").unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        std::env::set_var("CRAWLD_MAX_PROC", "9");

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.max_proc, 9);
        std::env::remove_var("CRAWLD_MAX_PROC");
    }

    #[test]
    #[serial]
    fn rejects_non_positive_finished_to_keep() {
        let dir = tempdir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        std::env::set_var("CRAWLD_FINISHED_TO_KEEP", "0");

        let err = Config::load(None).unwrap_err();
        assert!(matches!(err, DaemonError::Configuration(_)));
        std::env::remove_var("CRAWLD_FINISHED_TO_KEEP");
    }
}
