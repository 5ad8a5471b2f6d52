// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cld-storage: the durable, crash-safe store behind every queue, running
//! set, and finished-jobs log in the daemon. Each logical store is a
//! write-ahead log plus a periodic zstd-compressed snapshot; on top of the
//! raw JSON-valued tables sit typed `List`, `Mapping`, and `PriorityQueue`
//! façades.

pub mod error;
pub mod store;
pub mod typed;
pub mod wal;

pub use error::{Result, StoreError};
pub use store::Store;
pub use typed::{List, Mapping, PriorityQueue};
