// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stand-in for the egg-storage collaborator: enumerates known project
//! names so the poller can be kept in sync via `update_projects()`.

use std::path::PathBuf;

/// Enumerates the set of known project names.
pub trait ProjectSource: Send + Sync {
    fn list_projects(&self) -> Vec<String>;
}

/// Lists subdirectories of a configured project root, one per known
/// project, sorted for deterministic iteration order.
pub struct DirProjectSource {
    root: PathBuf,
}

impl DirProjectSource {
    pub fn new(root: PathBuf) -> Self {
        DirProjectSource { root }
    }
}

impl ProjectSource for DirProjectSource {
    fn list_projects(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lists_only_subdirectories_sorted() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("zeta")).unwrap();
        std::fs::create_dir(dir.path().join("alpha")).unwrap();
        std::fs::write(dir.path().join("not-a-project.txt"), b"x").unwrap();

        let source = DirProjectSource::new(dir.path().to_path_buf());
        assert_eq!(source.list_projects(), vec!["alpha".to_string(), "zeta".to_string()]);
    }

    #[test]
    fn missing_root_yields_empty_list() {
        let source = DirProjectSource::new(PathBuf::from("/nonexistent/crawld-project-root"));
        assert!(source.list_projects().is_empty());
    }
}
