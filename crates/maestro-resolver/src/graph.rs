//! Dependency node arena.
//!
//! Nodes live in a flat vector and refer to each other by [`NodeId`]. A node
//! is created once per attempted inclusion of a coordinate and is never
//! removed; losing or failing only changes its [`NodeState`].

use crate::management::ManagementMap;
use maestro_core::{
    Artifact, ArtifactKey, ArtifactVersion, Coordinate, DependencyTrail, Exclusion, Scope,
    VersionConstraint,
};
use std::collections::VecDeque;
use std::fmt;
use std::ops::Index;
use std::sync::Arc;

/// Index of a node in its [`DependencyGraph`].
///
/// Ids grow in creation order, which is also traversal discovery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position in the arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a node stands in the resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    /// Created, version not yet registered.
    Pending,
    /// Part of the result.
    Included,
    /// Its coordinate already appears on its own trail.
    OmittedForCycle,
    /// Another node of the same identity won.
    OmittedForConflict,
    /// Its version or descriptor could not be resolved.
    Failed,
}

impl NodeState {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Included => "included",
            Self::OmittedForCycle => "omitted for cycle",
            Self::OmittedForConflict => "omitted for conflict",
            Self::Failed => "failed",
        }
    }

    /// Either of the omitted states.
    #[must_use]
    pub const fn is_omitted(self) -> bool {
        matches!(self, Self::OmittedForCycle | Self::OmittedForConflict)
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attempted inclusion of an artifact.
#[derive(Debug, Clone)]
pub struct DependencyNode {
    /// Own id.
    pub id: NodeId,
    /// The artifact, with its trail from the root.
    pub artifact: Artifact,
    /// Distance from the root.
    pub depth: usize,
    /// Node whose descriptor declared this one.
    pub parent: Option<NodeId>,
    /// Nodes created from this node's descriptor, in declaration order.
    pub children: Vec<NodeId>,
    /// Current state.
    pub state: NodeState,
    /// Constraint the version was selected from.
    pub constraint: VersionConstraint,
    /// Scope as declared, after management.
    pub declared_scope: Scope,
    /// Exclusions in force below this node, accumulated from the root.
    pub exclusions: Vec<Exclusion>,
    /// Dependency management of this node's own descriptor.
    pub management: Arc<ManagementMap>,
    /// Whether the descriptor has been read and children created.
    pub expanded: bool,
    /// Node that won against this one, for omitted nodes.
    pub kept: Option<NodeId>,
}

impl DependencyNode {
    /// Conflict identity.
    #[must_use]
    pub fn key(&self) -> ArtifactKey {
        self.artifact.key()
    }

    /// Selected version.
    #[must_use]
    pub const fn version(&self) -> Option<&ArtifactVersion> {
        self.artifact.version.as_ref()
    }

    /// Check whether the node is part of the result.
    #[must_use]
    pub fn is_included(&self) -> bool {
        self.state == NodeState::Included
    }
}

/// A dependency about to be attached below a node.
#[derive(Debug, Clone)]
pub struct ChildDependency {
    /// Target coordinate.
    pub coordinate: Coordinate,
    /// Constraint after management.
    pub constraint: VersionConstraint,
    /// Declared scope after management.
    pub declared_scope: Scope,
    /// Effective scope after inheritance.
    pub scope: Scope,
    /// Declared optional.
    pub optional: bool,
    /// Exclusions in force below the child.
    pub exclusions: Vec<Exclusion>,
}

/// Arena of dependency nodes rooted at the resolution root.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: Vec<DependencyNode>,
}

impl DependencyGraph {
    /// A graph holding only the included, unexpanded root.
    #[must_use]
    pub fn new(
        coordinate: Coordinate,
        version: ArtifactVersion,
        management: Arc<ManagementMap>,
    ) -> Self {
        let constraint = VersionConstraint::exact(version.clone());
        let root = Artifact::root(coordinate, version);
        Self {
            nodes: vec![DependencyNode {
                id: NodeId(0),
                declared_scope: root.scope,
                artifact: root,
                depth: 0,
                parent: None,
                children: Vec::new(),
                state: NodeState::Included,
                constraint,
                exclusions: Vec::new(),
                management,
                expanded: false,
                kept: None,
            }],
        }
    }

    /// The root node.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Node by id.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&DependencyNode> {
        self.nodes.get(id.0)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut DependencyNode {
        &mut self.nodes[id.0]
    }

    /// Number of nodes ever created.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; the root is always present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.nodes.iter()
    }

    /// Children of `id` in declaration order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], |node| node.children.as_slice())
    }

    /// Ancestors of `id`, nearest first, ending with the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.get(id).and_then(|n| n.parent), |&current| {
            self.get(current).and_then(|n| n.parent)
        })
    }

    /// Every node below `id`, depth first, excluding `id`.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            found.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        found
    }

    /// Nodes shown in the resolved tree, breadth first: the root, and every
    /// child of a shown included node.
    #[must_use]
    pub fn visible(&self) -> Vec<NodeId> {
        let mut order = vec![self.root()];
        let mut queue = VecDeque::from([self.root()]);
        while let Some(current) = queue.pop_front() {
            for &child in self.children(current) {
                order.push(child);
                if self[child].is_included() {
                    queue.push_back(child);
                }
            }
        }
        order
    }

    /// Included nodes below the root, breadth first.
    #[must_use]
    pub fn included(&self) -> Vec<NodeId> {
        self.visible()
            .into_iter()
            .filter(|&id| id != self.root() && self[id].is_included())
            .collect()
    }

    /// Attach a new node below `parent`.
    ///
    /// The child's trail is the parent's trail plus its own coordinate. A
    /// child whose coordinate is already on the parent's trail starts as
    /// [`NodeState::OmittedForCycle`]; every other child starts pending.
    pub fn create_child(&mut self, parent: NodeId, child: ChildDependency) -> NodeId {
        let id = NodeId(self.nodes.len());
        let parent_node = &self.nodes[parent.0];
        let cycle = parent_node.artifact.trail.contains(&child.coordinate);
        let trail = parent_node.artifact.trail.child(child.coordinate.clone());
        let depth = parent_node.depth + 1;

        let mut artifact = Artifact::new(child.coordinate, child.scope, trail);
        artifact.optional = child.optional;
        artifact.base_version = child.constraint.recommended_version().cloned();

        self.nodes.push(DependencyNode {
            id,
            artifact,
            depth,
            parent: Some(parent),
            children: Vec::new(),
            state: if cycle {
                NodeState::OmittedForCycle
            } else {
                NodeState::Pending
            },
            constraint: child.constraint,
            declared_scope: child.declared_scope,
            exclusions: child.exclusions,
            management: Arc::default(),
            expanded: false,
            kept: None,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Trail of a node, or an empty trail for an unknown id.
    #[must_use]
    pub fn trail(&self, id: NodeId) -> DependencyTrail {
        self.get(id)
            .map(|node| node.artifact.trail.clone())
            .unwrap_or_default()
    }
}

impl Index<NodeId> for DependencyGraph {
    type Output = DependencyNode;

    fn index(&self, id: NodeId) -> &Self::Output {
        &self.nodes[id.0]
    }
}
