//! Error types for ledger and resolver operations.

use thiserror::Error;

/// Structural problems in the authored migration chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainDefect {
    /// Two or more nodes revise the same parent.
    #[error("branched history: {parent} is revised by {first} and {second}")]
    Branch {
        parent: String,
        first: String,
        second: String,
    },
    /// Following parent links never reaches a root.
    #[error("cyclic history involving revision {0}")]
    Cycle(String),
    /// The same revision id is defined twice.
    #[error("duplicate revision {0}")]
    DuplicateRevision(String),
    /// More than one node has no parent.
    #[error("multiple roots: {0:?}")]
    MultipleRoots(Vec<String>),
    /// A node revises a revision that is not defined.
    #[error("revision {revision} revises unknown revision {parent}")]
    UnknownParent { revision: String, parent: String },
}

/// Errors raised by the migration ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Definition source missing, unreadable or unparseable.
    #[error("{0}")]
    Configuration(String),

    /// The authored chain is not a single linear history.
    #[error("Malformed migration chain: {0}")]
    MalformedChain(#[from] ChainDefect),

    /// Applying or reverting a revision failed.
    #[error("revision {revision}: {cause}")]
    Execution { revision: String, cause: String },

    /// Nothing to do (rollback with no applied revision).
    #[error("{0}")]
    NoOp(String),

    /// The applied marker names a revision the source does not define.
    #[error("Current revision {0} is not defined by any migration")]
    UnknownRevision(String),

    /// Tracking-marker read failure.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl LedgerError {
    pub fn execution(revision: impl Into<String>, cause: impl ToString) -> Self {
        LedgerError::Execution {
            revision: revision.into(),
            cause: cause.to_string(),
        }
    }

    /// True for errors that describe the definition source rather than the database.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::Configuration(_))
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_display() {
        let err = LedgerError::from(ChainDefect::Branch {
            parent: "001".into(),
            first: "002a".into(),
            second: "002b".into(),
        });
        let msg = err.to_string();
        assert!(msg.starts_with("Malformed migration chain"));
        assert!(msg.contains("002a"));
        assert!(msg.contains("002b"));
    }

    #[test]
    fn test_execution_keeps_cause() {
        let err = LedgerError::execution("002", "relation \"users\" does not exist");
        assert_eq!(
            err.to_string(),
            "revision 002: relation \"users\" does not exist"
        );
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_configuration_is_not_found() {
        let err = LedgerError::Configuration("Migrations directory not found: x".into());
        assert!(err.is_not_found());
    }
}
