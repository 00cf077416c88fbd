//! User-managed rule list backed by `CODIAL.md`.
//!
//! Rules are newline-separated free-form strings, 1-indexed externally.
//! Every mutation rewrites the file atomically (write to a temp file in
//! the same directory, then rename). Concurrent writers are serialized by
//! a single lock.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use codial_domain::error::{Error, Result};

pub struct RulesStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl RulesStore {
    /// `workspace_root/CODIAL.md` is the backing file; it is created on
    /// first append.
    pub fn new(workspace_root: &Path) -> Self {
        Self {
            path: workspace_root.join("CODIAL.md"),
            write_lock: Mutex::new(()),
        }
    }

    pub fn list(&self) -> Result<Vec<String>> {
        let _guard = self.write_lock.lock();
        self.read_lines()
    }

    pub fn append(&self, rule: &str) -> Result<Vec<String>> {
        let _guard = self.write_lock.lock();
        let mut rules = self.read_lines()?;
        rules.push(rule.trim().to_owned());
        self.write_atomic(&rules)?;
        Ok(rules)
    }

    /// Remove the rule at a 1-based index.
    pub fn remove(&self, index: usize) -> Result<Vec<String>> {
        let _guard = self.write_lock.lock();
        let mut rules = self.read_lines()?;
        if index < 1 || index > rules.len() {
            return Err(Error::IndexOutOfRange(index));
        }
        rules.remove(index - 1);
        self.write_atomic(&rules)?;
        Ok(rules)
    }

    fn read_lines(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        Ok(raw
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_owned)
            .collect())
    }

    fn write_atomic(&self, rules: &[String]) -> Result<()> {
        let dir = self.path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir)?;
        let mut content = rules.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        let tmp = tempfile::NamedTempFile::new_in(dir)?;
        std::fs::write(tmp.path(), content)?;
        tmp.persist(&self.path)
            .map_err(|e| Error::Internal(format!("persisting {}: {}", self.path.display(), e.error)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_then_list_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = RulesStore::new(dir.path());

        store.append("A").unwrap();
        store.append("B").unwrap();
        assert_eq!(store.list().unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn remove_is_one_based() {
        let dir = tempfile::tempdir().unwrap();
        let store = RulesStore::new(dir.path());
        store.append("A").unwrap();
        store.append("B").unwrap();

        store.remove(1).unwrap();
        assert_eq!(store.list().unwrap(), vec!["B"]);
    }

    #[test]
    fn remove_out_of_range_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = RulesStore::new(dir.path());
        store.append("A").unwrap();

        let err = store.remove(5).unwrap_err();
        assert_eq!(err.wire_code(), "INDEX_OUT_OF_RANGE");
        let err = store.remove(0).unwrap_err();
        assert_eq!(err.wire_code(), "INDEX_OUT_OF_RANGE");
        // List unchanged after failed removals.
        assert_eq!(store.list().unwrap(), vec!["A"]);
    }

    #[test]
    fn empty_store_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = RulesStore::new(dir.path());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn file_content_is_newline_separated() {
        let dir = tempfile::tempdir().unwrap();
        let store = RulesStore::new(dir.path());
        store.append("one").unwrap();
        store.append("two").unwrap();

        let raw = std::fs::read_to_string(dir.path().join("CODIAL.md")).unwrap();
        assert_eq!(raw, "one\ntwo\n");
    }

    #[test]
    fn blank_lines_are_ignored_on_read() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("CODIAL.md"), "one\n\n  \ntwo\n").unwrap();
        let store = RulesStore::new(dir.path());
        assert_eq!(store.list().unwrap(), vec!["one", "two"]);
    }
}
