//! Breadth-first transitive dependency collection.
//!
//! The collector walks the graph one depth level at a time. Each level runs
//! four stages:
//!
//! 1. Select a version for every pending node (parallel, bounded).
//! 2. Register the nodes in discovery order: narrow ranges, resolve
//!    conflicts, widen scopes and disable subtrees of losers.
//! 3. Fetch the descriptors of the newly included nodes (parallel, bounded).
//! 4. Expand those descriptors in discovery order into the next level.
//!
//! Stages 1 and 3 fetch from the [`MetadataSource`] in parallel; stage 2 only
//! re-queries versions when a narrowed range excludes the current one. Every
//! decision is made serially in node-id order, so the outcome does not depend
//! on the order in which fetches complete.

use crate::conflict::{ConflictPolicy, ConflictResolver};
use crate::error::{MetadataError, NodeError, ResolveError, Result};
use crate::graph::{ChildDependency, DependencyGraph, DependencyNode, NodeId, NodeState};
use crate::listener::{ResolutionEvent, ResolutionListener};
use crate::management::{ManagedDependency, ManagementMap};
use crate::source::{ArtifactDescriptor, DeclaredDependency, MetadataSource, SourceFuture};
use crate::types::{ResolutionProblem, ResolutionRequest, ResolutionResult, ResolutionStats};
use futures::stream::{self, StreamExt};
use indexmap::{IndexMap, IndexSet};
use maestro_config::ResolverSettings;
use maestro_core::{
    Artifact, ArtifactKey, ArtifactVersion, Coordinate, DependencyTrail, Exclusion, Scope,
    ScopeFilter, VersionConstraint,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

type Selection = std::result::Result<ArtifactVersion, NodeError>;
type Fetched = std::result::Result<ArtifactDescriptor, MetadataError>;

/// Collector configuration.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Built-in policy used unless a custom resolver is installed.
    pub conflict_policy: ConflictPolicy,
    /// Treat every non-optional failure as fatal.
    pub strict: bool,
    /// Maximum metadata requests in flight.
    pub max_concurrent_fetches: usize,
    /// Limit for a single metadata request.
    pub fetch_timeout: Option<Duration>,
    /// Limit for the whole resolution.
    pub timeout: Option<Duration>,
    /// Classpath to resolve when the request names none.
    pub scope_filter: Option<ScopeFilter>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            conflict_policy: ConflictPolicy::NearestWins,
            strict: false,
            max_concurrent_fetches: 16,
            fetch_timeout: Some(Duration::from_secs(30)),
            timeout: Some(Duration::from_secs(300)),
            scope_filter: None,
        }
    }
}

impl CollectorConfig {
    /// Build from loaded settings.
    #[must_use]
    pub fn from_settings(settings: &ResolverSettings) -> Self {
        Self {
            conflict_policy: settings.conflict_policy.into(),
            strict: settings.strict,
            max_concurrent_fetches: settings.max_concurrent_fetches.max(1),
            fetch_timeout: settings.fetch_timeout(),
            timeout: settings.resolution_timeout(),
            scope_filter: settings.scope_filter.map(ScopeFilter::new),
        }
    }
}

/// State of one resolution.
struct Collection {
    graph: DependencyGraph,
    /// Nodes per identity, in discovery order.
    identities: IndexMap<ArtifactKey, Vec<NodeId>, ahash::RandomState>,
    problems: Vec<ResolutionProblem>,
    root_management: Arc<ManagementMap>,
    scope_filter: Option<ScopeFilter>,
    /// Included nodes that must be expanded (again) at the next level.
    requeue: IndexSet<NodeId, ahash::RandomState>,
    stats: ResolutionStats,
}

impl Collection {
    fn new(request: &ResolutionRequest, scope_filter: Option<ScopeFilter>) -> Self {
        let root_management = Arc::new(request.managed.clone());
        Self {
            graph: DependencyGraph::new(
                request.root.clone(),
                request.root_version.clone(),
                Arc::clone(&root_management),
            ),
            identities: IndexMap::default(),
            problems: Vec::new(),
            root_management,
            scope_filter,
            requeue: IndexSet::default(),
            stats: ResolutionStats::default(),
        }
    }

    /// Included node of an identity.
    fn winner(&self, key: &ArtifactKey) -> Option<NodeId> {
        self.identities
            .get(key)?
            .iter()
            .copied()
            .find(|&id| self.graph[id].is_included())
    }

    /// Management entry for a dependency declared by `parent`.
    ///
    /// The root's management beats every descriptor; otherwise the nearest
    /// ancestor that manages the identity wins.
    fn managed_for(&self, parent: NodeId, key: &ArtifactKey) -> Option<ManagedDependency> {
        if let Some(managed) = self.root_management.get(key) {
            return Some(managed.clone());
        }
        let root = self.graph.root();
        std::iter::once(parent)
            .chain(self.graph.ancestors(parent))
            .take_while(|&id| id != root)
            .find_map(|id| self.graph[id].management.get(key).cloned())
    }

    fn forget(&mut self, id: NodeId) {
        let key = self.graph[id].key();
        if let Some(ids) = self.identities.get_mut(&key) {
            ids.retain(|&other| other != id);
        }
    }
}

/// Transitive dependency collector.
///
/// # Example
///
/// ```no_run
/// use maestro_resolver::{ArtifactCollector, DeclaredDependency, MemorySource, ResolutionRequest};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let source = MemorySource::new();
/// source.add_version("org.acme:lib", "1.0", &[])?;
///
/// let request = ResolutionRequest::anonymous(vec![DeclaredDependency::parse("org.acme:lib", "1.0")?]);
/// let result = ArtifactCollector::new(source).collect(&request).await?;
/// println!("{}", result.render_tree());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ArtifactCollector<S> {
    source: S,
    config: CollectorConfig,
    resolver: Arc<dyn ConflictResolver>,
    listeners: Vec<Arc<dyn ResolutionListener>>,
}

impl<S: MetadataSource> ArtifactCollector<S> {
    /// Create a collector with default configuration.
    pub fn new(source: S) -> Self {
        Self::with_config(source, CollectorConfig::default())
    }

    /// Create a collector with custom configuration.
    pub fn with_config(source: S, config: CollectorConfig) -> Self {
        Self {
            source,
            resolver: Arc::new(config.conflict_policy),
            config,
            listeners: Vec::new(),
        }
    }

    /// Replace the conflict policy with a custom resolver.
    #[must_use]
    pub fn with_conflict_resolver(mut self, resolver: Arc<dyn ConflictResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Register a listener. Listeners are called in registration order.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn ResolutionListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Get the metadata source.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Resolve a bare dependency list.
    pub async fn resolve(
        &self,
        dependencies: Vec<DeclaredDependency>,
        managed: ManagementMap,
    ) -> Result<ResolutionResult> {
        let mut request = ResolutionRequest::anonymous(dependencies);
        request.managed = managed;
        self.collect(&request).await
    }

    /// Resolve the transitive closure of a request.
    ///
    /// # Errors
    ///
    /// Fails when a required artifact cannot be resolved, when the conflict
    /// resolver cannot pick a winner, or when the resolution timeout expires.
    /// Other failures are recorded in [`ResolutionResult::problems`].
    pub async fn collect(&self, request: &ResolutionRequest) -> Result<ResolutionResult> {
        let start = Instant::now();
        let run = self.run(request, start);
        match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| {
                warn!(
                    root = %request.root,
                    timeout_ms = limit.as_millis(),
                    "dependency resolution timed out"
                );
                ResolveError::Timeout {
                    elapsed: start.elapsed(),
                }
            })?,
            None => run.await,
        }
    }

    async fn run(&self, request: &ResolutionRequest, start: Instant) -> Result<ResolutionResult> {
        let mut state = Collection::new(
            request,
            request.scope_filter.or(self.config.scope_filter),
        );
        debug!(
            root = %request.root,
            dependencies = request.dependencies.len(),
            managed = request.managed.len(),
            "collecting dependencies"
        );

        let root = state.graph.root();
        let descriptor = ArtifactDescriptor {
            dependencies: request.dependencies.clone(),
            management: request.managed.clone(),
        };
        let mut level = self.expand(&mut state, root, descriptor);

        while !level.is_empty() || !state.requeue.is_empty() {
            let fetch_start = Instant::now();
            let (selections, sent) = self.select_versions(&state.graph, &level).await;
            state.stats.fetches += sent;
            state.stats.fetch_time += fetch_start.elapsed();

            for (id, selection) in selections {
                self.register(&mut state, id, selection).await?;
            }

            let mut expandable = std::mem::take(&mut state.requeue);
            expandable.extend(level.iter().copied());
            let expandable: Vec<NodeId> = expandable
                .into_iter()
                .filter(|&id| {
                    let node = &state.graph[id];
                    node.is_included() && !node.expanded
                })
                .collect();

            let fetch_start = Instant::now();
            state.stats.fetches += expandable.len();
            let descriptors = self.fetch_descriptors(&state.graph, &expandable).await;
            state.stats.fetch_time += fetch_start.elapsed();

            level = Vec::new();
            for (id, descriptor) in descriptors {
                if !state.graph[id].is_included() {
                    continue;
                }
                match descriptor {
                    Ok(descriptor) => level.extend(self.expand(&mut state, id, descriptor)),
                    Err(error) => self.fail(&mut state, id, error.into())?,
                }
            }
        }

        let included: Vec<Artifact> = state
            .graph
            .included()
            .into_iter()
            .map(|id| state.graph[id].artifact.clone())
            .collect();
        state.stats.tally(&state.graph);
        state.stats.duration = start.elapsed();

        info!(
            root = %request.root,
            included = state.stats.included,
            omitted = state.stats.omitted_for_conflict,
            cycles = state.stats.omitted_for_cycle,
            problems = state.problems.len(),
            depth = state.stats.max_depth,
            fetches = state.stats.fetches,
            duration_ms = state.stats.duration.as_millis(),
            "dependency resolution complete"
        );

        Ok(ResolutionResult {
            included,
            graph: state.graph,
            problems: state.problems,
            stats: state.stats,
        })
    }

    fn emit(&self, event: impl FnOnce() -> ResolutionEvent) {
        if self.listeners.is_empty() {
            return;
        }
        let event = event();
        for listener in &self.listeners {
            listener.on_event(&event);
        }
    }

    /// Run a source request under the per-fetch timeout.
    async fn bounded<T>(
        &self,
        coordinate: &Coordinate,
        request: SourceFuture<'_, std::result::Result<T, MetadataError>>,
    ) -> std::result::Result<T, MetadataError> {
        match self.config.fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .unwrap_or_else(|_| {
                    Err(MetadataError::Timeout {
                        coordinate: coordinate.to_string(),
                        timeout: limit,
                    })
                }),
            None => request.await,
        }
    }

    async fn select_versions(
        &self,
        graph: &DependencyGraph,
        ids: &[NodeId],
    ) -> (Vec<(NodeId, Selection)>, usize) {
        let jobs: Vec<(NodeId, Artifact, VersionConstraint)> = ids
            .iter()
            .map(|&id| &graph[id])
            .filter(|node| node.state == NodeState::Pending)
            .map(|node| (node.id, node.artifact.clone(), node.constraint.clone()))
            .collect();
        let sent = jobs
            .iter()
            .filter(|(_, _, constraint)| needs_source(constraint))
            .count();

        let selections = stream::iter(jobs)
            .map(|(id, artifact, constraint)| async move {
                let selected = self.select_version(&artifact, &constraint).await;
                (id, selected)
            })
            .buffered(self.config.max_concurrent_fetches.max(1))
            .collect()
            .await;
        (selections, sent)
    }

    /// Version for a constraint: the recommendation of a soft constraint,
    /// concretized if symbolic, or the highest available version in range.
    async fn select_version(
        &self,
        artifact: &Artifact,
        constraint: &VersionConstraint,
    ) -> Selection {
        if let Some(recommended) = constraint.recommended_version() {
            if !needs_concretizing(recommended) {
                return Ok(recommended.clone());
            }
            let mut probe = artifact.clone();
            probe.base_version = Some(recommended.clone());
            probe.version = None;
            let version = self
                .bounded(&artifact.coordinate, self.source.concretize(&probe))
                .await?;
            trace!(artifact = %artifact.coordinate, declared = %recommended, %version, "concretized version");
            return Ok(version);
        }

        let available = self
            .bounded(
                &artifact.coordinate,
                self.source.available_versions(&artifact.coordinate),
            )
            .await?;
        Ok(constraint.select_version(&available)?)
    }

    async fn fetch_descriptors(
        &self,
        graph: &DependencyGraph,
        ids: &[NodeId],
    ) -> Vec<(NodeId, Fetched)> {
        let jobs: Vec<(NodeId, Artifact)> = ids
            .iter()
            .map(|&id| (id, graph[id].artifact.clone()))
            .collect();

        stream::iter(jobs)
            .map(|(id, artifact)| async move {
                let descriptor = self
                    .bounded(&artifact.coordinate, self.source.retrieve(&artifact))
                    .await;
                (id, descriptor)
            })
            .buffered(self.config.max_concurrent_fetches.max(1))
            .collect()
            .await
    }

    /// Create the children of an included node from its descriptor.
    fn expand(
        &self,
        state: &mut Collection,
        parent: NodeId,
        descriptor: ArtifactDescriptor,
    ) -> Vec<NodeId> {
        let ArtifactDescriptor {
            dependencies,
            management,
        } = descriptor;
        {
            let node = state.graph.node_mut(parent);
            node.expanded = true;
            node.artifact.resolved = true;
            node.management = Arc::new(management);
        }
        trace!(
            artifact = %state.graph[parent].artifact,
            dependencies = dependencies.len(),
            "expanding"
        );

        self.emit(|| ResolutionEvent::StartProcessChildren {
            artifact: state.graph[parent].artifact.clone(),
        });
        let mut created = Vec::with_capacity(dependencies.len());
        for dependency in dependencies {
            if let Some(id) = self.attach(state, parent, dependency) {
                created.push(id);
            }
        }
        self.emit(|| ResolutionEvent::EndProcessChildren {
            artifact: state.graph[parent].artifact.clone(),
        });
        created
    }

    /// Attach one declared dependency below `parent`, unless it is filtered
    /// out. Returns the new node when it joins the next level.
    fn attach(
        &self,
        state: &mut Collection,
        parent: NodeId,
        dependency: DeclaredDependency,
    ) -> Option<NodeId> {
        let DeclaredDependency {
            coordinate,
            constraint: declared_constraint,
            scope: declared,
            optional,
            exclusions: own_exclusions,
        } = dependency;
        let key = coordinate.key();
        let parent_node = &state.graph[parent];
        let depth = parent_node.depth;
        let parent_scope = parent_node.artifact.scope;

        if depth >= 1 && optional {
            trace!(artifact = %coordinate, "skipping optional transitive dependency");
            return None;
        }
        if let Some(exclusion) = parent_node.exclusions.iter().find(|e| e.matches(&key)) {
            trace!(artifact = %coordinate, %exclusion, "excluded");
            return None;
        }

        let mut constraint = declared_constraint;
        let mut declared_scope = declared;
        if depth >= 1 {
            if let Some(managed) = state.managed_for(parent, &key) {
                self.emit(|| ResolutionEvent::ManageArtifact {
                    artifact: preview(
                        &state.graph[parent].artifact.trail,
                        &coordinate,
                        &constraint,
                        declared_scope,
                    ),
                    managed: managed.clone(),
                });
                debug!(
                    artifact = %coordinate,
                    version = ?managed.version.as_ref().map(ToString::to_string),
                    scope = ?managed.scope,
                    "applied dependency management"
                );
                if let Some(version) = managed.version {
                    constraint = version;
                }
                if let Some(scope) = managed.scope {
                    declared_scope = scope;
                }
            }
        }

        let scope = if depth == 0 {
            declared_scope
        } else if let Some(scope) = parent_scope.inherit(declared_scope) {
            scope
        } else {
            trace!(artifact = %coordinate, scope = %declared_scope, "scope not propagated");
            return None;
        };
        if let Some(filter) = state.scope_filter {
            if !filter.includes(scope) {
                trace!(artifact = %coordinate, %scope, "outside requested classpath");
                return None;
            }
        }

        let mut exclusions: Vec<Exclusion> = state.graph[parent].exclusions.clone();
        exclusions.extend(own_exclusions);

        let id = state.graph.create_child(
            parent,
            ChildDependency {
                coordinate,
                constraint,
                declared_scope,
                scope,
                optional,
                exclusions,
            },
        );
        self.emit(|| ResolutionEvent::TestArtifact {
            artifact: state.graph[id].artifact.clone(),
        });

        if state.graph[id].state == NodeState::OmittedForCycle {
            debug!(
                artifact = %state.graph[id].artifact,
                trail = %state.graph[id].artifact.trail,
                "cycle detected"
            );
            self.emit(|| ResolutionEvent::OmitForCycle {
                artifact: state.graph[id].artifact.clone(),
            });
            return None;
        }

        state.identities.entry(key).or_default().push(id);
        Some(id)
    }

    /// Settle a node whose version selection finished.
    async fn register(&self, state: &mut Collection, id: NodeId, selection: Selection) -> Result<()> {
        if state.graph[id].state != NodeState::Pending {
            return Ok(());
        }
        let version = match selection {
            Ok(version) => version,
            Err(error) => return self.fail(state, id, error),
        };
        state.graph.node_mut(id).artifact.select_version(version);
        if state.graph[id].constraint.is_range() {
            self.emit(|| ResolutionEvent::SelectVersionFromRange {
                artifact: state.graph[id].artifact.clone(),
            });
        }

        let key = state.graph[id].key();
        if let Some(current) = state.winner(&key) {
            if !self.restrict(state, &key, current, id).await? {
                return Ok(());
            }
        }
        if state.graph[id].state != NodeState::Pending {
            return Ok(());
        }

        match state.winner(&key) {
            Some(current) => self.resolve_conflict(state, &key, current, id),
            None => {
                self.elect(state, &key, &[id])?;
                self.include(state, id);
                Ok(())
            }
        }
    }

    /// Narrow the constraints of the current winner and a newcomer unless
    /// both are unrestricted recommendations. Both nodes then carry the
    /// intersection and its version. Returns false when the newcomer failed.
    async fn restrict(
        &self,
        state: &mut Collection,
        key: &ArtifactKey,
        current: NodeId,
        id: NodeId,
    ) -> Result<bool> {
        let existing = &state.graph[current].constraint;
        let incoming = &state.graph[id].constraint;
        if existing.is_soft() && incoming.is_soft() {
            return Ok(true);
        }
        let restricted = match existing.intersect(incoming) {
            Ok(restricted) => restricted,
            Err(error) => {
                self.fail(state, id, error.into())?;
                return Ok(false);
            }
        };
        debug!(artifact = %key, constraint = %restricted, "restricted version range");
        self.emit(|| ResolutionEvent::RestrictRange {
            artifact: state.graph[current].artifact.clone(),
            replacement: state.graph[id].artifact.clone(),
            constraint: restricted.clone(),
        });

        state.graph.node_mut(id).constraint = restricted.clone();
        match self.reselect(state, id, &restricted).await {
            Ok(Some(version)) => state.graph.node_mut(id).artifact.select_version(version),
            Ok(None) => {}
            Err(error) => {
                self.fail(state, id, error)?;
                return Ok(false);
            }
        }

        state.graph.node_mut(current).constraint = restricted.clone();
        match self.reselect(state, current, &restricted).await {
            Ok(Some(version)) => self.change_version(state, current, version)?,
            Ok(None) => {}
            Err(error) => self.fail(state, current, error)?,
        }
        Ok(true)
    }

    /// Version a node moves to under a restricted constraint: its
    /// recommendation, or the highest version in range once the current one
    /// falls outside. `None` keeps the current version.
    async fn reselect(
        &self,
        state: &mut Collection,
        id: NodeId,
        constraint: &VersionConstraint,
    ) -> std::result::Result<Option<ArtifactVersion>, NodeError> {
        let artifact = &state.graph[id].artifact;
        let keep = match constraint.recommended_version() {
            Some(recommended) => {
                artifact.version.as_ref() == Some(recommended)
                    || (artifact.version.is_some()
                        && artifact.base_version.as_ref() == Some(recommended))
            }
            None => artifact.version.as_ref().is_some_and(|v| constraint.contains(v)),
        };
        if keep {
            return Ok(None);
        }
        let artifact = artifact.clone();
        if needs_source(constraint) {
            state.stats.fetches += 1;
        }
        self.select_version(&artifact, constraint).await.map(Some)
    }

    /// Give an included node a new version, re-expanding it if needed.
    fn change_version(&self, state: &mut Collection, id: NodeId, version: ArtifactVersion) -> Result<()> {
        debug!(
            artifact = %state.graph[id].artifact,
            %version,
            "version changed by range restriction"
        );
        state.graph.node_mut(id).artifact.select_version(version);
        if !state.graph[id].expanded {
            return Ok(());
        }
        let affected = self.disable_subtree(state, id, true);
        state.graph.node_mut(id).expanded = false;
        state.requeue.insert(id);
        self.reelect(state, affected)
    }

    fn resolve_conflict(
        &self,
        state: &mut Collection,
        key: &ArtifactKey,
        current: NodeId,
        id: NodeId,
    ) -> Result<()> {
        let mut candidates = [current, id];
        candidates.sort_unstable();
        let winner = self.elect(state, key, &candidates)?;
        let loser = if winner == id { current } else { id };

        {
            let node = state.graph.node_mut(loser);
            node.state = NodeState::OmittedForConflict;
            node.kept = Some(winner);
        }
        debug!(
            artifact = %key,
            kept = ?state.graph[winner].version().map(ToString::to_string),
            omitted = ?state.graph[loser].version().map(ToString::to_string),
            "conflict resolved"
        );
        self.emit(|| ResolutionEvent::OmitForNearer {
            omitted: state.graph[loser].artifact.clone(),
            kept: state.graph[winner].artifact.clone(),
        });

        if winner == id {
            self.include(state, id);
            if let Some(ids) = state.identities.get(key) {
                for &other in ids {
                    if state.graph[other].kept == Some(current) {
                        state.graph.node_mut(other).kept = Some(id);
                    }
                }
            }
        }
        self.widen_scope(state, winner, loser);

        if winner == id && state.graph[current].expanded {
            let affected = self.disable_subtree(state, current, false);
            self.reelect(state, affected)?;
        }
        Ok(())
    }

    fn include(&self, state: &mut Collection, id: NodeId) {
        let node = state.graph.node_mut(id);
        node.state = NodeState::Included;
        node.kept = None;
        trace!(artifact = %state.graph[id].artifact, "included");
        self.emit(|| ResolutionEvent::IncludeArtifact {
            artifact: state.graph[id].artifact.clone(),
        });
    }

    /// Carry a loser's wider scope over to the winner.
    fn widen_scope(&self, state: &mut Collection, winner: NodeId, loser: NodeId) {
        let winner_scope = state.graph[winner].artifact.scope;
        let loser_scope = state.graph[loser].artifact.scope;
        if !loser_scope.is_wider_than(winner_scope) {
            return;
        }

        if state.graph[winner].depth == 1 {
            debug!(
                artifact = %state.graph[winner].artifact,
                ignored = %loser_scope,
                "direct dependency keeps its declared scope"
            );
            self.emit(|| ResolutionEvent::UpdateScopeCurrentPom {
                artifact: state.graph[winner].artifact.clone(),
                ignored_scope: loser_scope,
            });
            return;
        }

        debug!(
            artifact = %state.graph[winner].artifact,
            scope = %loser_scope,
            "widened scope"
        );
        self.emit(|| ResolutionEvent::UpdateScope {
            artifact: state.graph[winner].artifact.clone(),
            scope: loser_scope,
        });
        state.graph.node_mut(winner).artifact.scope = loser_scope;
        for descendant in state.graph.descendants(winner) {
            let Some(parent) = state.graph[descendant].parent else {
                continue;
            };
            let parent_scope = state.graph[parent].artifact.scope;
            let node = state.graph.node_mut(descendant);
            if let Some(scope) = parent_scope.inherit(node.declared_scope) {
                node.artifact.scope = scope;
            }
        }
    }

    /// Mark every node below `id` omitted. Returns the identities that lost
    /// their winner. With `detach`, the old children are also dropped from
    /// the graph's child list and from conflict bookkeeping.
    fn disable_subtree(&self, state: &mut Collection, id: NodeId, detach: bool) -> Vec<ArtifactKey> {
        let descendants = state.graph.descendants(id);
        let mut affected = Vec::new();
        for &descendant in &descendants {
            let node = state.graph.node_mut(descendant);
            match node.state {
                NodeState::Included => {
                    affected.push(node.key());
                    node.state = NodeState::OmittedForConflict;
                }
                NodeState::Pending => node.state = NodeState::OmittedForConflict,
                _ => {}
            }
        }
        if detach {
            for &descendant in &descendants {
                state.forget(descendant);
            }
            state.graph.node_mut(id).children.clear();
        }
        if !descendants.is_empty() {
            debug!(
                artifact = %state.graph[id].artifact,
                nodes = descendants.len(),
                detach,
                "disabled subtree"
            );
        }
        affected
    }

    /// Pick new winners for identities whose winner was removed.
    ///
    /// Candidates are omitted nodes that still have a version and an
    /// included parent. An elected node that had been expanded is expanded
    /// again from scratch.
    fn reelect(&self, state: &mut Collection, keys: Vec<ArtifactKey>) -> Result<()> {
        for key in keys {
            if state.winner(&key).is_some() {
                continue;
            }
            let Some(ids) = state.identities.get(&key) else {
                continue;
            };
            let candidates: Vec<NodeId> = ids
                .iter()
                .copied()
                .filter(|&candidate| {
                    let node = &state.graph[candidate];
                    node.state == NodeState::OmittedForConflict
                        && node.version().is_some()
                        && node.parent.is_some_and(|p| state.graph[p].is_included())
                })
                .collect();
            if candidates.is_empty() {
                continue;
            }

            let winner = self.elect(state, &key, &candidates)?;
            for &candidate in &candidates {
                state.graph.node_mut(candidate).kept = Some(winner);
            }
            if state.graph[winner].expanded {
                let stale = state.graph.descendants(winner);
                for descendant in stale {
                    state.forget(descendant);
                }
                let node = state.graph.node_mut(winner);
                node.children.clear();
                node.expanded = false;
            }
            self.include(state, winner);
            debug!(
                artifact = %state.graph[winner].artifact,
                candidates = candidates.len(),
                "re-elected after subtree removal"
            );
            state.requeue.insert(winner);
        }
        Ok(())
    }

    /// Ask the conflict resolver for a winner among `candidates`.
    fn elect(&self, state: &Collection, key: &ArtifactKey, candidates: &[NodeId]) -> Result<NodeId> {
        let nodes: Vec<&DependencyNode> = candidates.iter().map(|&c| &state.graph[c]).collect();
        let trail = nodes
            .first()
            .map(|node| node.artifact.trail.clone())
            .unwrap_or_default();
        match self.resolver.resolve(&nodes) {
            Ok(winner) if candidates.contains(&winner) => Ok(winner),
            Ok(other) => Err(ResolveError::NoWinner {
                key: key.clone(),
                trail,
                reason: format!("resolver picked {other}, which is not a candidate"),
            }),
            Err(error) => Err(ResolveError::NoWinner {
                key: key.clone(),
                trail,
                reason: error.reason,
            }),
        }
    }

    /// Record a failed node. Fatal for required direct dependencies, and
    /// for every non-optional node in strict mode.
    fn fail(&self, state: &mut Collection, id: NodeId, error: NodeError) -> Result<()> {
        let was_included = state.graph[id].is_included();
        state.graph.node_mut(id).state = NodeState::Failed;

        let node = &state.graph[id];
        let fatal = !node.artifact.optional && (node.depth == 1 || self.config.strict);
        warn!(
            artifact = %node.artifact,
            trail = %node.artifact.trail,
            %error,
            fatal,
            "failed to resolve artifact"
        );
        if fatal {
            return Err(ResolveError::RequiredArtifact {
                artifact: node.artifact.to_string(),
                trail: node.artifact.trail.clone(),
                source: error,
            });
        }

        let key = node.key();
        let expanded = node.expanded;
        state.problems.push(ResolutionProblem {
            artifact: node.artifact.clone(),
            error,
        });
        if was_included {
            let mut affected = vec![key];
            if expanded {
                affected.extend(self.disable_subtree(state, id, false));
            }
            self.reelect(state, affected)?;
        }
        Ok(())
    }
}

/// Whether selecting a version for `constraint` asks the source.
fn needs_source(constraint: &VersionConstraint) -> bool {
    constraint.recommended_version().is_none_or(needs_concretizing)
}

fn needs_concretizing(version: &ArtifactVersion) -> bool {
    version.is_symbolic() || version.is_unresolved_snapshot()
}

/// Artifact as declared, before management.
fn preview(
    parent_trail: &DependencyTrail,
    coordinate: &Coordinate,
    constraint: &VersionConstraint,
    scope: Scope,
) -> Artifact {
    let mut artifact = Artifact::new(coordinate.clone(), scope, parent_trail.child(coordinate.clone()));
    artifact.base_version = constraint.recommended_version().cloned();
    artifact
}
