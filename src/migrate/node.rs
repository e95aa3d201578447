//! Migration node definitions and the `.sql` file header format.
//!
//! ```sql
//! -- revision: 002
//! -- revises: 001
//! -- message: create posts table
//! -- created: 2024-01-15T11:45:00
//! -- +up
//! CREATE TABLE posts (id SERIAL PRIMARY KEY);
//! -- +down
//! DROP TABLE posts;
//! ```

use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime};

use crate::error::{LedgerError, LedgerResult};

/// Description used when a definition carries no message.
pub const DEFAULT_DESCRIPTION: &str = "No description";

/// Longest revision id the version table column holds.
pub const MAX_REVISION_LEN: usize = 64;

const UP_MARKER: &str = "-- +up";
const DOWN_MARKER: &str = "-- +down";
const HEADER_KEYS: [&str; 4] = ["revision", "revises", "message", "created"];

/// One schema-change unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationNode {
    pub revision: String,
    /// Revision this node is built on, `None` for the root.
    pub parent_revision: Option<String>,
    pub description: String,
    /// Advisory only, never used for ordering.
    pub created_at: Option<NaiveDateTime>,
    pub up_sql: String,
    /// `None` when the node cannot be reverted.
    pub down_sql: Option<String>,
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Header,
    Up,
    Down,
}

impl MigrationNode {
    pub fn new(
        revision: impl Into<String>,
        parent_revision: Option<&str>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            revision: revision.into(),
            parent_revision: parent_revision.map(str::to_string),
            description: description.into(),
            created_at: None,
            up_sql: String::new(),
            down_sql: None,
        }
    }

    pub fn created_at(mut self, at: NaiveDateTime) -> Self {
        self.created_at = Some(at);
        self
    }

    pub fn up(mut self, sql: impl Into<String>) -> Self {
        self.up_sql = sql.into();
        self
    }

    pub fn down(mut self, sql: impl Into<String>) -> Self {
        self.down_sql = Some(sql.into());
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_revision.is_none()
    }

    /// Parse a migration definition file.
    pub fn parse(content: &str) -> LedgerResult<Self> {
        let mut revision = None;
        let mut parent = None;
        let mut description = None;
        let mut created_at = None;
        let mut up = Vec::new();
        let mut down = Vec::new();
        let mut section = Section::Header;
        let mut has_up = false;
        let mut has_down = false;
        let mut seen = HashSet::new();

        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        for (lineno, line) in content.lines().enumerate() {
            let trimmed = line.trim();

            if trimmed.eq_ignore_ascii_case(UP_MARKER) {
                if has_up {
                    return Err(config_err(lineno, "duplicate '-- +up' marker"));
                }
                has_up = true;
                section = Section::Up;
                continue;
            }
            if trimmed.eq_ignore_ascii_case(DOWN_MARKER) {
                if !has_up || has_down {
                    return Err(config_err(lineno, "'-- +down' must follow a single '-- +up'"));
                }
                has_down = true;
                section = Section::Down;
                continue;
            }

            match section {
                Section::Header => {
                    if trimmed.is_empty() {
                        continue;
                    }
                    let Some(comment) = trimmed.strip_prefix("--") else {
                        return Err(config_err(lineno, "statement before '-- +up' marker"));
                    };
                    let Some((key, value)) = comment.split_once(':') else {
                        continue;
                    };
                    let value = value.trim();
                    let key = key.trim().to_ascii_lowercase();
                    if HEADER_KEYS.contains(&key.as_str()) && !seen.insert(key.clone()) {
                        return Err(config_err(lineno, &format!("duplicate '-- {}:' header", key)));
                    }
                    match key.as_str() {
                        "revision" => revision = Some(value.to_string()),
                        "revises" => {
                            parent = match value {
                                "" => None,
                                v if v.eq_ignore_ascii_case("none") => None,
                                v => Some(v.to_string()),
                            }
                        }
                        "message" => description = Some(value.to_string()),
                        "created" => {
                            created_at = Some(parse_timestamp(value).ok_or_else(|| {
                                config_err(lineno, &format!("invalid created date '{}'", value))
                            })?)
                        }
                        _ => {}
                    }
                }
                Section::Up => up.push(line),
                Section::Down => down.push(line),
            }
        }

        let revision = match revision {
            Some(r) if !r.is_empty() => r,
            _ => {
                return Err(LedgerError::Configuration(
                    "missing '-- revision:' header".to_string(),
                ));
            }
        };
        if revision.len() > MAX_REVISION_LEN {
            return Err(LedgerError::Configuration(format!(
                "revision '{}' is longer than {} characters",
                revision, MAX_REVISION_LEN
            )));
        }
        if !has_up {
            return Err(LedgerError::Configuration(
                "missing '-- +up' section".to_string(),
            ));
        }

        Ok(Self {
            revision,
            parent_revision: parent,
            description: description
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            created_at,
            up_sql: up.join("\n").trim().to_string(),
            down_sql: has_down.then(|| down.join("\n").trim().to_string()),
        })
    }

    /// Render this node back to the file format understood by [`MigrationNode::parse`].
    pub fn to_file(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("-- revision: {}\n", self.revision));
        out.push_str(&format!(
            "-- revises: {}\n",
            self.parent_revision.as_deref().unwrap_or("none")
        ));
        out.push_str(&format!("-- message: {}\n", single_line(&self.description)));
        if let Some(created) = self.created_at {
            out.push_str(&format!("-- created: {}\n", created.format("%Y-%m-%dT%H:%M:%S")));
        }
        out.push_str(UP_MARKER);
        out.push('\n');
        if !self.up_sql.is_empty() {
            out.push_str(&self.up_sql);
            out.push('\n');
        }
        if let Some(down) = &self.down_sql {
            out.push_str(DOWN_MARKER);
            out.push('\n');
            if !down.is_empty() {
                out.push_str(down);
                out.push('\n');
            }
        }
        out
    }
}

/// Accepts RFC 3339 or a naive `YYYY-MM-DD[T ]HH:MM:SS[.f]` timestamp.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Collapse all whitespace runs, newlines included, into single spaces.
pub fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn config_err(lineno: usize, msg: &str) -> LedgerError {
    LedgerError::Configuration(format!("line {}: {}", lineno + 1, msg))
}
