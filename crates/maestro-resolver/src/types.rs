//! Resolution request and result types.

use crate::error::NodeError;
use crate::graph::{DependencyGraph, DependencyNode, NodeId, NodeState};
use crate::management::{ManagedDependency, ManagementMap};
use crate::source::DeclaredDependency;
use crate::tree;
use ahash::AHashMap;
use maestro_core::{
    Artifact, ArtifactKey, ArtifactVersion, Coordinate, DependencyTrail, Scope, ScopeFilter,
    VersionConstraint,
};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::fmt;
use std::time::Duration;

/// Group and artifact id of the placeholder root used by
/// [`ResolutionRequest::anonymous`].
pub const ANONYMOUS_ROOT: &str = "__root__";

/// What to resolve.
#[derive(Debug, Clone)]
pub struct ResolutionRequest {
    /// Root coordinate.
    pub root: Coordinate,
    /// Root version.
    pub root_version: ArtifactVersion,
    /// Direct dependencies in declaration order.
    pub dependencies: Vec<DeclaredDependency>,
    /// Pins that override every transitive declaration.
    pub managed: ManagementMap,
    /// Classpath to resolve, or everything.
    pub scope_filter: Option<ScopeFilter>,
}

impl ResolutionRequest {
    /// Request for a root artifact without dependencies yet.
    #[must_use]
    pub fn new(root: Coordinate, root_version: ArtifactVersion) -> Self {
        Self {
            root,
            root_version,
            dependencies: Vec::new(),
            managed: ManagementMap::new(),
            scope_filter: None,
        }
    }

    /// Request for a bare dependency list under a placeholder root.
    #[must_use]
    pub fn anonymous(dependencies: Vec<DeclaredDependency>) -> Self {
        let root = Coordinate::new(ANONYMOUS_ROOT, ANONYMOUS_ROOT).with_type("pom");
        let mut request = Self::new(root, ArtifactVersion::parse("0"));
        request.dependencies = dependencies;
        request
    }

    /// Add a direct dependency.
    #[must_use]
    pub fn with_dependency(mut self, dependency: DeclaredDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Add a management entry.
    #[must_use]
    pub fn with_managed(mut self, key: ArtifactKey, managed: ManagedDependency) -> Self {
        self.managed.insert(key, managed);
        self
    }

    /// Pin the version of `key`.
    #[must_use]
    pub fn manage_version(self, key: ArtifactKey, constraint: VersionConstraint) -> Self {
        self.with_managed(key, ManagedDependency::version(constraint))
    }

    /// Resolve only the classpath of `scope`.
    #[must_use]
    pub fn with_scope_filter(mut self, scope: Scope) -> Self {
        self.scope_filter = Some(ScopeFilter::new(scope));
        self
    }
}

/// A node that could not be resolved, recorded without aborting.
#[derive(Debug, Clone)]
pub struct ResolutionProblem {
    /// The artifact, as far as it was resolved.
    pub artifact: Artifact,
    /// What went wrong.
    pub error: NodeError,
}

impl ResolutionProblem {
    /// Path from the root.
    #[must_use]
    pub const fn trail(&self) -> &DependencyTrail {
        &self.artifact.trail
    }
}

impl fmt::Display for ResolutionProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.artifact.trail, self.error)
    }
}

/// Counters for one resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    /// Nodes created.
    pub nodes: usize,
    /// Artifacts in the result.
    pub included: usize,
    /// Visible nodes omitted for conflict.
    pub omitted_for_conflict: usize,
    /// Visible nodes omitted for cycle.
    pub omitted_for_cycle: usize,
    /// Visible nodes that failed.
    pub failed: usize,
    /// Deepest included node.
    pub max_depth: usize,
    /// Metadata requests issued.
    pub fetches: usize,
    /// Time spent waiting for metadata.
    pub fetch_time: Duration,
    /// Total wall time.
    pub duration: Duration,
}

impl ResolutionStats {
    /// Count node states over the visible tree.
    pub(crate) fn tally(&mut self, graph: &DependencyGraph) {
        self.nodes = graph.len();
        for id in graph.visible() {
            let node = &graph[id];
            match node.state {
                NodeState::Included if id != graph.root() => {
                    self.included += 1;
                    self.max_depth = self.max_depth.max(node.depth);
                }
                NodeState::OmittedForConflict => self.omitted_for_conflict += 1,
                NodeState::OmittedForCycle => self.omitted_for_cycle += 1,
                NodeState::Failed => self.failed += 1,
                NodeState::Included | NodeState::Pending => {}
            }
        }
    }

    /// One-line summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Collected: {} included, {} omitted (conflict), {} omitted (cycle), {} failed, depth={}, nodes={}, fetches={}, fetch={}ms, total={}ms",
            self.included,
            self.omitted_for_conflict,
            self.omitted_for_cycle,
            self.failed,
            self.max_depth,
            self.nodes,
            self.fetches,
            self.fetch_time.as_millis(),
            self.duration.as_millis(),
        )
    }
}

/// Outcome of a resolution.
#[derive(Debug, Clone)]
pub struct ResolutionResult {
    /// Included artifacts, breadth first, with final versions and scopes.
    pub included: Vec<Artifact>,
    /// Every node created, for diagnostics.
    pub graph: DependencyGraph,
    /// Non-fatal failures.
    pub problems: Vec<ResolutionProblem>,
    /// Counters.
    pub stats: ResolutionStats,
}

impl ResolutionResult {
    /// Included artifact with identity `key`.
    #[must_use]
    pub fn find(&self, key: &ArtifactKey) -> Option<&Artifact> {
        self.included.iter().find(|a| a.coordinate.has_key(key))
    }

    /// Included version of `key`.
    #[must_use]
    pub fn version_of(&self, key: &ArtifactKey) -> Option<&ArtifactVersion> {
        self.find(key).and_then(|a| a.version.as_ref())
    }

    /// Whether no problems were recorded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }

    /// Visible nodes that closed a cycle.
    #[must_use]
    pub fn cycles(&self) -> Vec<&DependencyNode> {
        self.graph
            .visible()
            .into_iter()
            .map(|id| &self.graph[id])
            .filter(|node| node.state == NodeState::OmittedForCycle)
            .collect()
    }

    /// `dependency:tree` style rendering.
    #[must_use]
    pub fn render_tree(&self) -> String {
        tree::render(&self.graph)
    }

    /// Included artifacts with every artifact after the ones it depends on.
    ///
    /// Dependencies are taken from every edge between included identities,
    /// including edges whose target lost a conflict or closed a cycle.
    /// Artifacts on a cycle are kept together in discovery order.
    #[must_use]
    pub fn dependency_order(&self) -> Vec<&Artifact> {
        let included = self.graph.included();
        let mut graph: DiGraph<NodeId, ()> = DiGraph::with_capacity(included.len(), included.len());
        let mut index: AHashMap<ArtifactKey, NodeIndex> = AHashMap::with_capacity(included.len());
        for &id in &included {
            index.insert(self.graph[id].key(), graph.add_node(id));
        }

        for &id in &included {
            let Some(&from) = index.get(&self.graph[id].key()) else {
                continue;
            };
            for &child in self.graph.children(id) {
                let node = &self.graph[child];
                if node.state == NodeState::Failed {
                    continue;
                }
                if let Some(&to) = index.get(&node.key()) {
                    if to != from {
                        graph.update_edge(from, to, ());
                    }
                }
            }
        }

        tarjan_scc(&graph)
            .into_iter()
            .flat_map(|mut component| {
                component.sort_by_key(|&ix| graph[ix]);
                component
            })
            .map(|ix| &self.graph[graph[ix]].artifact)
            .collect()
    }
}
