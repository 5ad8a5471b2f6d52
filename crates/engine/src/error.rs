// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the scheduling and launching subsystem.

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Store(#[from] cld_storage::StoreError),

    #[error("malformed crawl message: {0}")]
    MalformedMessage(String),

    #[error("failed to spawn child process: {0}")]
    ChildSpawn(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
