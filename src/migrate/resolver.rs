//! Migration chain resolver.
//!
//! Rebuilds linear history from parent links and classifies every node
//! against the applied marker. Pure: `(nodes, current_revision) -> Resolution`.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};

use super::node::MigrationNode;
use crate::error::{ChainDefect, LedgerResult};

/// Display value for `current_revision` when nothing has been applied.
pub const NO_REVISION_SENTINEL: &str = "No migrations applied";

/// One node of the history with its derived status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationEntry {
    pub revision: String,
    #[serde(rename = "down_revision")]
    pub parent_revision: Option<String>,
    #[serde(rename = "message")]
    pub description: String,
    pub is_current: bool,
    pub is_pending: bool,
    #[serde(rename = "created_date")]
    pub created_at: Option<NaiveDateTime>,
}

/// Summary of the whole ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    #[serde(rename = "current_revision", serialize_with = "serialize_current")]
    pub current: Option<String>,
    #[serde(rename = "total_migrations")]
    pub total: usize,
    #[serde(rename = "pending_migrations")]
    pub pending: usize,
    pub is_up_to_date: bool,
}

impl MigrationStatus {
    /// Current revision, or the sentinel when none is applied.
    pub fn current_display(&self) -> &str {
        self.current.as_deref().unwrap_or(NO_REVISION_SENTINEL)
    }
}

fn serialize_current<S: Serializer>(current: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(current.as_deref().unwrap_or(NO_REVISION_SENTINEL))
}

/// Inconsistencies that do not prevent resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// The marker names a revision no node defines. Every node resolves as pending.
    UnknownCurrentRevision(String),
}

impl std::fmt::Display for Anomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anomaly::UnknownCurrentRevision(rev) => {
                write!(f, "current revision {} is not defined by any migration", rev)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mark {
    is_current: bool,
    is_pending: bool,
}

/// A resolved chain, oldest first.
#[derive(Debug, Clone)]
pub struct Resolution {
    nodes: Vec<MigrationNode>,
    /// Arena indices in chronological order.
    chain: Vec<usize>,
    /// Parallel to `chain`.
    marks: Vec<Mark>,
    /// Revision -> position in `chain`.
    position: HashMap<String, usize>,
    current: Option<String>,
}

/// Resolve `nodes` against the applied marker.
pub fn resolve(nodes: Vec<MigrationNode>, current: Option<&str>) -> LedgerResult<Resolution> {
    let n = nodes.len();
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(n);
    for (i, node) in nodes.iter().enumerate() {
        if index.insert(node.revision.as_str(), i).is_some() {
            return Err(ChainDefect::DuplicateRevision(node.revision.clone()).into());
        }
    }

    let mut child: Vec<Option<usize>> = vec![None; n];
    let mut roots = Vec::new();
    for (i, node) in nodes.iter().enumerate() {
        let Some(parent) = node.parent_revision.as_deref() else {
            roots.push(i);
            continue;
        };
        let &p = index.get(parent).ok_or_else(|| ChainDefect::UnknownParent {
            revision: node.revision.clone(),
            parent: parent.to_string(),
        })?;
        if let Some(existing) = child[p] {
            return Err(ChainDefect::Branch {
                parent: parent.to_string(),
                first: nodes[existing].revision.clone(),
                second: node.revision.clone(),
            }
            .into());
        }
        child[p] = Some(i);
    }

    if n > 0 {
        if roots.len() > 1 {
            let revs = roots.iter().map(|&i| nodes[i].revision.clone()).collect();
            return Err(ChainDefect::MultipleRoots(revs).into());
        }
        if roots.is_empty() {
            return Err(ChainDefect::Cycle(nodes[0].revision.clone()).into());
        }
    }

    // Newest to oldest.
    let mut walk = Vec::with_capacity(n);
    let mut marks = Vec::with_capacity(n);
    let mut seen_current = current.is_none();
    let mut cursor = (0..n).find(|&i| child[i].is_none());
    while let Some(i) = cursor {
        if walk.len() >= n {
            return Err(ChainDefect::Cycle(nodes[i].revision.clone()).into());
        }
        let node = &nodes[i];
        let is_current = current == Some(node.revision.as_str());
        marks.push(Mark {
            is_current,
            is_pending: !seen_current,
        });
        if is_current {
            seen_current = true;
        }
        walk.push(i);
        cursor = node.parent_revision.as_deref().and_then(|p| index.get(p).copied());
    }

    if walk.len() < n {
        let orphan = (0..n)
            .find(|i| !walk.contains(i))
            .map(|i| nodes[i].revision.clone())
            .unwrap_or_default();
        return Err(ChainDefect::Cycle(orphan).into());
    }

    walk.reverse();
    marks.reverse();

    let position = walk
        .iter()
        .enumerate()
        .map(|(pos, &i)| (nodes[i].revision.clone(), pos))
        .collect();

    Ok(Resolution {
        nodes,
        chain: walk,
        marks,
        position,
        current: current.map(str::to_string),
    })
}

impl Resolution {
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn current_revision(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Chain position of `revision`, oldest = 0.
    pub fn position_of(&self, revision: &str) -> Option<usize> {
        self.position.get(revision).copied()
    }

    /// Nodes in chronological order.
    pub fn nodes(&self) -> impl Iterator<Item = &MigrationNode> {
        self.chain.iter().map(|&i| &self.nodes[i])
    }

    pub fn head(&self) -> Option<&MigrationNode> {
        self.chain.last().map(|&i| &self.nodes[i])
    }

    /// The node the marker points at, if it is defined.
    pub fn current_node(&self) -> Option<&MigrationNode> {
        let pos = self.position_of(self.current.as_deref()?)?;
        Some(&self.nodes[self.chain[pos]])
    }

    /// Oldest pending node.
    pub fn next_pending(&self) -> Option<&MigrationNode> {
        self.marks
            .iter()
            .position(|m| m.is_pending)
            .map(|pos| &self.nodes[self.chain[pos]])
    }

    pub fn pending_count(&self) -> usize {
        self.marks.iter().filter(|m| m.is_pending).count()
    }

    pub fn anomaly(&self) -> Option<Anomaly> {
        let current = self.current.as_deref()?;
        if self.position.contains_key(current) {
            None
        } else {
            Some(Anomaly::UnknownCurrentRevision(current.to_string()))
        }
    }

    /// Annotated history, oldest first.
    pub fn entries(&self) -> Vec<MigrationEntry> {
        self.chain
            .iter()
            .zip(&self.marks)
            .map(|(&i, mark)| {
                let node = &self.nodes[i];
                MigrationEntry {
                    revision: node.revision.clone(),
                    parent_revision: node.parent_revision.clone(),
                    description: node.description.clone(),
                    is_current: mark.is_current,
                    is_pending: mark.is_pending,
                    created_at: node.created_at,
                }
            })
            .collect()
    }

    pub fn status(&self) -> MigrationStatus {
        let pending = self.pending_count();
        MigrationStatus {
            current: self.current.clone(),
            total: self.len(),
            pending,
            is_up_to_date: pending == 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn rev(i: usize) -> String {
        format!("{:03}", i + 1)
    }

    /// Linear chain of `n` nodes, newest first.
    fn chain(n: usize) -> Vec<MigrationNode> {
        (0..n)
            .rev()
            .map(|i| {
                let parent = i.checked_sub(1).map(rev);
                MigrationNode::new(rev(i), parent.as_deref(), format!("step {}", i + 1))
            })
            .collect()
    }

    fn defect(err: LedgerError) -> ChainDefect {
        match err {
            LedgerError::MalformedChain(d) => d,
            other => panic!("expected malformed chain, got {other:?}"),
        }
    }

    #[test]
    fn test_two_node_scenario() {
        let res = resolve(chain(2), Some("001")).unwrap();
        let entries = res.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].revision, "001");
        assert!(entries[0].is_current);
        assert!(!entries[0].is_pending);
        assert_eq!(entries[1].revision, "002");
        assert!(!entries[1].is_current);
        assert!(entries[1].is_pending);

        assert_eq!(
            res.status(),
            MigrationStatus {
                current: Some("001".into()),
                total: 2,
                pending: 1,
                is_up_to_date: false,
            }
        );
        assert_eq!(res.next_pending().unwrap().revision, "002");
    }

    #[test]
    fn test_empty_set() {
        let res = resolve(Vec::new(), None).unwrap();
        assert!(res.is_empty());
        let status = res.status();
        assert_eq!(status.current_display(), NO_REVISION_SENTINEL);
        assert_eq!(status.total, 0);
        assert_eq!(status.pending, 0);
        assert!(status.is_up_to_date);
        assert!(res.next_pending().is_none());
    }

    #[test]
    fn test_no_marker_everything_pending() {
        let res = resolve(chain(4), None).unwrap();
        assert!(res.entries().iter().all(|e| e.is_pending && !e.is_current));
        assert_eq!(res.next_pending().unwrap().revision, "001");
        assert!(res.anomaly().is_none());
    }

    #[test]
    fn test_marker_at_head() {
        let res = resolve(chain(3), Some("003")).unwrap();
        assert_eq!(res.pending_count(), 0);
        assert!(res.status().is_up_to_date);
        assert_eq!(res.current_node().unwrap().revision, "003");
    }

    #[test]
    fn test_unknown_marker_silently_pending() {
        let res = resolve(chain(3), Some("999")).unwrap();
        let entries = res.entries();
        assert!(entries.iter().all(|e| e.is_pending));
        assert!(entries.iter().all(|e| !e.is_current));
        assert_eq!(res.status().pending, 3);
    }

    #[test]
    fn test_unknown_marker_detected_as_anomaly() {
        let res = resolve(chain(3), Some("999")).unwrap();
        assert_eq!(
            res.anomaly(),
            Some(Anomaly::UnknownCurrentRevision("999".into()))
        );
        assert!(res.current_node().is_none());
    }

    #[test]
    fn test_branch_rejected() {
        let mut nodes = chain(2);
        nodes.push(MigrationNode::new("002b", Some("001"), "other branch"));
        match defect(resolve(nodes, None).unwrap_err()) {
            ChainDefect::Branch { parent, .. } => assert_eq!(parent, "001"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_cycle_rejected() {
        let nodes = vec![
            MigrationNode::new("a", Some("b"), "a"),
            MigrationNode::new("b", Some("a"), "b"),
        ];
        assert!(matches!(
            defect(resolve(nodes, None).unwrap_err()),
            ChainDefect::Cycle(_)
        ));
    }

    #[test]
    fn test_detached_cycle_rejected() {
        let mut nodes = chain(2);
        nodes.push(MigrationNode::new("x", Some("y"), "x"));
        nodes.push(MigrationNode::new("y", Some("x"), "y"));
        assert!(matches!(
            defect(resolve(nodes, None).unwrap_err()),
            ChainDefect::Cycle(_)
        ));
    }

    #[test]
    fn test_self_parent_rejected() {
        let nodes = vec![MigrationNode::new("a", Some("a"), "loop")];
        assert!(matches!(
            defect(resolve(nodes, None).unwrap_err()),
            ChainDefect::Cycle(_)
        ));
    }

    #[test]
    fn test_duplicate_and_dangling_rejected() {
        let mut nodes = chain(2);
        nodes.push(MigrationNode::new("001", None, "again"));
        assert_eq!(
            defect(resolve(nodes, None).unwrap_err()),
            ChainDefect::DuplicateRevision("001".into())
        );

        let nodes = vec![MigrationNode::new("002", Some("001"), "orphan")];
        assert!(matches!(
            defect(resolve(nodes, None).unwrap_err()),
            ChainDefect::UnknownParent { .. }
        ));
    }

    #[test]
    fn test_multiple_roots_rejected() {
        let nodes = vec![
            MigrationNode::new("a", None, "a"),
            MigrationNode::new("b", None, "b"),
        ];
        assert!(matches!(
            defect(resolve(nodes, None).unwrap_err()),
            ChainDefect::MultipleRoots(_)
        ));
    }

    #[test]
    fn test_status_serializes_sentinel() {
        let status = resolve(chain(1), None).unwrap().status();
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "current_revision": NO_REVISION_SENTINEL,
                "total_migrations": 1,
                "pending_migrations": 1,
                "is_up_to_date": false,
            })
        );
    }

    fn shuffled_chain() -> impl Strategy<Value = (Vec<MigrationNode>, Option<String>)> {
        (1usize..24)
            .prop_flat_map(|n| (Just(chain(n)).prop_shuffle(), proptest::option::of(0..n)))
            .prop_map(|(nodes, current)| (nodes, current.map(rev)))
    }

    proptest! {
        #[test]
        fn prop_length_matches_input((nodes, current) in shuffled_chain()) {
            let n = nodes.len();
            let res = resolve(nodes, current.as_deref()).unwrap();
            prop_assert_eq!(res.entries().len(), n);
        }

        #[test]
        fn prop_chronological_order((nodes, current) in shuffled_chain()) {
            let res = resolve(nodes, current.as_deref()).unwrap();
            let entries = res.entries();
            prop_assert!(entries[0].parent_revision.is_none());
            for pair in entries.windows(2) {
                prop_assert_eq!(
                    pair[1].parent_revision.as_deref(),
                    Some(pair[0].revision.as_str())
                );
            }
        }

        #[test]
        fn prop_classification_partitions((nodes, current) in shuffled_chain()) {
            let res = resolve(nodes, current.as_deref()).unwrap();
            let entries = res.entries();
            let pending = entries.iter().filter(|e| e.is_pending).count();
            let currents = entries.iter().filter(|e| e.is_current).count();
            let applied = entries.iter().filter(|e| !e.is_pending && !e.is_current).count();
            prop_assert_eq!(pending + applied + currents, entries.len());
            prop_assert!(entries.iter().all(|e| !(e.is_current && e.is_pending)));
            prop_assert_eq!(currents, usize::from(current.is_some()));
        }

        #[test]
        fn prop_resolution_is_idempotent((nodes, current) in shuffled_chain()) {
            let first = resolve(nodes.clone(), current.as_deref()).unwrap();
            let second = resolve(nodes, current.as_deref()).unwrap();
            prop_assert_eq!(first.entries(), second.entries());
            prop_assert_eq!(first.status(), second.status());
        }
    }

    #[test]
    fn test_root_current_only_non_pending() {
        for n in 1..6 {
            let res = resolve(chain(n), Some("001")).unwrap();
            let entries = res.entries();
            let non_pending: Vec<_> = entries.iter().filter(|e| !e.is_pending).collect();
            assert_eq!(non_pending.len(), 1);
            assert_eq!(non_pending[0].revision, "001");
            assert!(non_pending[0].is_current);
        }
    }
}
