//! Directory-backed migration definitions.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::debug;

use super::node::{MigrationNode, single_line};
use super::resolver::resolve;
use crate::error::{LedgerError, LedgerResult};

/// A directory of `*.sql` migration files.
#[derive(Debug, Clone)]
pub struct MigrationDir {
    path: PathBuf,
}

impl MigrationDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }

    /// Load every definition, newest-defined first (file name descending).
    pub fn load(&self) -> LedgerResult<Vec<MigrationNode>> {
        if !self.exists() {
            return Err(LedgerError::Configuration(format!(
                "Migrations directory not found: {}",
                self.path.display()
            )));
        }

        let entries = fs::read_dir(&self.path).map_err(|e| {
            LedgerError::Configuration(format!(
                "Failed to read migrations directory {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "sql"))
            .collect();
        files.sort();
        files.reverse();

        let mut nodes = Vec::with_capacity(files.len());
        for file in &files {
            nodes.push(load_file(file)?);
        }
        debug!(dir = %self.path.display(), count = nodes.len(), "loaded migration definitions");
        Ok(nodes)
    }

    /// Author a new migration revising the current head.
    ///
    /// Revision ids are zero-padded sequence numbers (`001`, `002`, ...).
    pub fn create(&self, message: &str) -> LedgerResult<(PathBuf, MigrationNode)> {
        if !self.exists() {
            fs::create_dir_all(&self.path).map_err(|e| {
                LedgerError::Configuration(format!(
                    "Failed to create {}: {}",
                    self.path.display(),
                    e
                ))
            })?;
        }

        let message = single_line(message);
        let resolution = resolve(self.load()?, None)?;
        let parent = resolution.head().map(|n| n.revision.clone());
        let revision = next_revision_id(resolution.nodes().map(|n| n.revision.as_str()))?;

        let node = MigrationNode::new(&revision, parent.as_deref(), message.as_str())
            .created_at(Local::now().naive_local())
            .up("-- write the upgrade statements here")
            .down("-- write the downgrade statements here");

        let path = self.path.join(format!("{}_{}.sql", revision, slug(&message)));
        fs::write(&path, node.to_file()).map_err(|e| {
            LedgerError::Configuration(format!("Failed to write {}: {}", path.display(), e))
        })?;
        Ok((path, node))
    }
}

fn load_file(path: &Path) -> LedgerResult<MigrationNode> {
    let content = fs::read_to_string(path).map_err(|e| {
        LedgerError::Configuration(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let mut node = MigrationNode::parse(&content).map_err(|e| {
        LedgerError::Configuration(format!("Invalid migration {}: {}", path.display(), e))
    })?;
    if node.created_at.is_none() {
        node.created_at = fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .map(|t| DateTime::<Local>::from(t).naive_local());
    }
    Ok(node)
}

/// Next zero-padded numeric id after the largest numeric revision.
fn next_revision_id<'a>(revisions: impl Iterator<Item = &'a str>) -> LedgerResult<String> {
    let next = match revisions.filter_map(|r| r.parse::<u64>().ok()).max() {
        None => 1,
        Some(max) => max.checked_add(1).ok_or_else(|| {
            LedgerError::Configuration(format!("No revision id follows {}", max))
        })?,
    };
    Ok(format!("{:03}", next))
}

fn slug(message: &str) -> String {
    let mut out = String::new();
    for c in message.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    let trimmed = out.trim_end_matches('_');
    if trimmed.is_empty() {
        "migration".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_missing_dir_is_configuration_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = MigrationDir::new(tmp.path().join("nope")).load().unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_load_newest_first_ignores_other_files() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "001_users.sql", "-- revision: 001\n-- +up\nSELECT 1;\n");
        write(
            tmp.path(),
            "002_posts.sql",
            "-- revision: 002\n-- revises: 001\n-- +up\nSELECT 2;\n",
        );
        write(tmp.path(), "README.md", "not a migration");

        let nodes = MigrationDir::new(tmp.path()).load().unwrap();
        let revs: Vec<_> = nodes.iter().map(|n| n.revision.as_str()).collect();
        assert_eq!(revs, ["002", "001"]);
        // falls back to file mtime
        assert!(nodes.iter().all(|n| n.created_at.is_some()));
    }

    #[test]
    fn test_malformed_file_names_path() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "001_bad.sql", "-- message: no revision\n-- +up\n");
        let err = MigrationDir::new(tmp.path()).load().unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("001_bad.sql"));
    }

    #[test]
    fn test_create_revises_head() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = MigrationDir::new(tmp.path().join("migrations"));

        let (first_path, first) = dir.create("create users table").unwrap();
        assert_eq!(first.revision, "001");
        assert!(first.parent_revision.is_none());
        assert!(first_path.ends_with("001_create_users_table.sql"));

        let (_, second) = dir.create("Create posts, table!").unwrap();
        assert_eq!(second.revision, "002");
        assert_eq!(second.parent_revision.as_deref(), Some("001"));

        let loaded = dir.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].description, "Create posts, table!");
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("Create posts, table!"), "create_posts_table");
        assert_eq!(slug("  ---  "), "migration");
    }

    #[test]
    fn test_next_revision_id() {
        assert_eq!(next_revision_id(["001", "abc", "009"].into_iter()).unwrap(), "010");
        assert_eq!(next_revision_id(std::iter::empty()).unwrap(), "001");
    }

    #[test]
    fn test_next_revision_id_overflow() {
        let max = u64::MAX.to_string();
        let err = next_revision_id([max.as_str()].into_iter()).unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains(&max));
    }

    #[test]
    fn test_create_multiline_message_stays_loadable() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = MigrationDir::new(tmp.path());
        dir.create("create users table").unwrap();

        let (path, node) = dir.create("add posts\nand comments").unwrap();
        assert_eq!(node.description, "add posts and comments");
        assert!(path.ends_with("002_add_posts_and_comments.sql"));

        let (_, injected) = dir.create("x\n-- revision: 999\n-- revises: none").unwrap();
        assert_eq!(injected.revision, "003");

        let loaded = dir.load().unwrap();
        let revs: Vec<_> = loaded.iter().map(|n| n.revision.as_str()).collect();
        assert_eq!(revs, ["003", "002", "001"]);
        assert_eq!(loaded[1].description, "add posts and comments");
        assert_eq!(loaded[0].parent_revision.as_deref(), Some("002"));
        assert!(resolve(loaded, None).is_ok());
    }
}
