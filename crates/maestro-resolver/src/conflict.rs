//! Conflict resolution policies.

use crate::graph::{DependencyNode, NodeId};
use maestro_config::ConflictStrategy;
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// A policy that could not pick a candidate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct NoWinner {
    /// Explanation.
    pub reason: String,
}

impl NoWinner {
    /// Create a new error.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Picks the node kept for an identity.
///
/// Candidates share a `groupId:artifactId` and arrive in discovery order.
/// The returned id must be one of them.
pub trait ConflictResolver: Send + Sync + fmt::Debug {
    /// Pick the winner.
    fn resolve(&self, candidates: &[&DependencyNode]) -> Result<NodeId, NoWinner>;
}

/// Built-in policies. Every one breaks ties by discovery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConflictPolicy {
    /// Smallest depth wins.
    #[default]
    NearestWins,
    /// Highest version wins.
    NewestWins,
    /// Lowest version wins.
    OldestWins,
}

impl ConflictPolicy {
    /// Ordering of `candidate` against the current best; `Greater` replaces it.
    fn compare(self, candidate: &DependencyNode, best: &DependencyNode) -> Ordering {
        match self {
            Self::NearestWins => best.depth.cmp(&candidate.depth),
            Self::NewestWins => candidate.version().cmp(&best.version()),
            Self::OldestWins => best.version().cmp(&candidate.version()),
        }
    }
}

impl ConflictResolver for ConflictPolicy {
    fn resolve(&self, candidates: &[&DependencyNode]) -> Result<NodeId, NoWinner> {
        let mut iter = candidates.iter().copied();
        let first = iter.next().ok_or_else(|| NoWinner::new("no candidates"))?;
        let best = iter.fold(first, |best, candidate| {
            if self.compare(candidate, best) == Ordering::Greater {
                candidate
            } else {
                best
            }
        });
        Ok(best.id)
    }
}

impl From<ConflictStrategy> for ConflictPolicy {
    fn from(strategy: ConflictStrategy) -> Self {
        match strategy {
            ConflictStrategy::Nearest => Self::NearestWins,
            ConflictStrategy::Newest => Self::NewestWins,
            ConflictStrategy::Oldest => Self::OldestWins,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ChildDependency, DependencyGraph};
    use maestro_core::{ArtifactVersion, Coordinate, Scope, VersionConstraint};
    use std::sync::Arc;
    use test_case::test_case;

    /// Builds `root -> a:<v1>`, `root -> b -> a:<v2>`, `root -> a:<v3>`.
    fn candidates() -> (DependencyGraph, Vec<NodeId>) {
        let mut graph = DependencyGraph::new(
            Coordinate::new("org.acme", "app"),
            ArtifactVersion::parse("1"),
            Arc::default(),
        );
        let edge = |artifact_id: &str| ChildDependency {
            coordinate: Coordinate::new("org.acme", artifact_id),
            constraint: VersionConstraint::parse("1.0").unwrap(),
            declared_scope: Scope::Compile,
            scope: Scope::Compile,
            optional: false,
            exclusions: Vec::new(),
        };
        let root = graph.root();
        let first = graph.create_child(root, edge("a"));
        let b = graph.create_child(root, edge("b"));
        let deep = graph.create_child(b, edge("a"));
        let second = graph.create_child(root, edge("a"));
        for (id, version) in [(first, "1.5"), (deep, "3.0"), (second, "1.0")] {
            graph.node_mut(id).artifact.select_version(ArtifactVersion::parse(version));
        }
        (graph, vec![first, deep, second])
    }

    #[test_case(ConflictPolicy::NearestWins, 0 ; "nearest keeps first declared")]
    #[test_case(ConflictPolicy::NewestWins, 1 ; "newest ignores depth")]
    #[test_case(ConflictPolicy::OldestWins, 2 ; "oldest ignores depth")]
    fn picks_winner(policy: ConflictPolicy, expected: usize) {
        let (graph, ids) = candidates();
        let nodes: Vec<&DependencyNode> = ids.iter().map(|&id| &graph[id]).collect();
        assert_eq!(policy.resolve(&nodes).unwrap(), ids[expected]);
    }

    #[test]
    fn equal_versions_keep_discovery_order() {
        let (mut graph, ids) = candidates();
        graph.node_mut(ids[2]).artifact.select_version(ArtifactVersion::parse("1.5"));
        let nodes = vec![&graph[ids[0]], &graph[ids[2]]];
        assert_eq!(ConflictPolicy::OldestWins.resolve(&nodes).unwrap(), ids[0]);
        assert_eq!(ConflictPolicy::NewestWins.resolve(&nodes).unwrap(), ids[0]);
    }

    #[test]
    fn empty_candidates_fail() {
        assert!(ConflictPolicy::NearestWins.resolve(&[]).is_err());
    }

    #[test]
    fn from_settings_strategy() {
        assert_eq!(
            ConflictPolicy::from(ConflictStrategy::Newest),
            ConflictPolicy::NewestWins
        );
        assert_eq!(
            ConflictPolicy::from(ConflictStrategy::default()),
            ConflictPolicy::NearestWins
        );
    }
}
