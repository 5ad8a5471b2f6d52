// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job id generation.
//!
//! Crawl job ids are opaque 32-character lowercase hex strings, matching the
//! identifier shape external schedulers and log/item file paths are keyed on.

use uuid::Uuid;

/// Generate a fresh 32-hex-character job id.
pub fn new_job_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Returns true if `s` looks like a job id: 32 lowercase hex characters.
pub fn is_job_id(s: &str) -> bool {
    s.len() == 32 && s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_id_is_32_lowercase_hex_chars() {
        let id = new_job_id();
        assert!(is_job_id(&id), "not a job id: {id}");
    }

    #[test]
    fn new_job_id_is_unique() {
        let a = new_job_id();
        let b = new_job_id();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_wrong_shapes() {
        assert!(!is_job_id("too-short"));
        assert!(!is_job_id(&"a".repeat(32).to_uppercase()));
        assert!(!is_job_id(&"g".repeat(32)));
    }
}
