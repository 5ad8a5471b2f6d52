// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The daemon-level error taxonomy: configuration, storage, and engine
//! errors that can abort startup or a request.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("io error at {path}: {source}")]
    Io { path: std::path::PathBuf, source: std::io::Error },

    #[error(transparent)]
    Store(#[from] cld_storage::StoreError),

    #[error(transparent)]
    Engine(#[from] cld_engine::EngineError),
}

pub type Result<T> = std::result::Result<T, DaemonError>;
