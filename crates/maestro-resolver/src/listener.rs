//! Resolution listeners.
//!
//! Listeners observe the collector's decisions. They receive events after
//! each decision is made and cannot influence the outcome.

use crate::management::ManagedDependency;
use maestro_core::{Artifact, Scope, VersionConstraint};
use parking_lot::Mutex;
use std::fmt;
use tracing::debug;

/// Event kinds, for filtering and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A dependency is about to be considered.
    TestArtifact,
    /// Children of an artifact are about to be created.
    StartProcessChildren,
    /// Children of an artifact have been created.
    EndProcessChildren,
    /// An artifact became part of the result.
    IncludeArtifact,
    /// An artifact lost a conflict.
    OmitForNearer,
    /// An artifact closed a cycle.
    OmitForCycle,
    /// A transitive winner's scope widened.
    UpdateScope,
    /// A direct dependency kept its scope despite a wider transitive one.
    UpdateScopeCurrentPom,
    /// Dependency management changed a version or scope.
    ManageArtifact,
    /// Two constraints were narrowed to their intersection.
    RestrictRange,
    /// A version was picked from a range.
    SelectVersionFromRange,
}

impl EventKind {
    /// camelCase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TestArtifact => "testArtifact",
            Self::StartProcessChildren => "startProcessChildren",
            Self::EndProcessChildren => "endProcessChildren",
            Self::IncludeArtifact => "includeArtifact",
            Self::OmitForNearer => "omitForNearer",
            Self::OmitForCycle => "omitForCycle",
            Self::UpdateScope => "updateScope",
            Self::UpdateScopeCurrentPom => "updateScopeCurrentPom",
            Self::ManageArtifact => "manageArtifact",
            Self::RestrictRange => "restrictRange",
            Self::SelectVersionFromRange => "selectVersionFromRange",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A collector decision. Artifacts are snapshots taken when the event fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionEvent {
    /// A dependency is about to be considered.
    TestArtifact {
        /// Candidate.
        artifact: Artifact,
    },
    /// Children of an artifact are about to be created.
    StartProcessChildren {
        /// Parent.
        artifact: Artifact,
    },
    /// Children of an artifact have been created.
    EndProcessChildren {
        /// Parent.
        artifact: Artifact,
    },
    /// An artifact became part of the result.
    IncludeArtifact {
        /// Winner.
        artifact: Artifact,
    },
    /// An artifact lost a conflict.
    OmitForNearer {
        /// Loser.
        omitted: Artifact,
        /// Winner.
        kept: Artifact,
    },
    /// An artifact closed a cycle.
    OmitForCycle {
        /// The repeated artifact.
        artifact: Artifact,
    },
    /// A transitive winner's scope widened.
    UpdateScope {
        /// Winner before the update.
        artifact: Artifact,
        /// New scope.
        scope: Scope,
    },
    /// A direct dependency kept its scope despite a wider transitive one.
    UpdateScopeCurrentPom {
        /// Direct dependency.
        artifact: Artifact,
        /// Scope that was not applied.
        ignored_scope: Scope,
    },
    /// Dependency management changed a version or scope.
    ManageArtifact {
        /// Artifact before management.
        artifact: Artifact,
        /// Applied pin.
        managed: ManagedDependency,
    },
    /// Two constraints were narrowed to their intersection.
    RestrictRange {
        /// Current winner.
        artifact: Artifact,
        /// Newly discovered artifact.
        replacement: Artifact,
        /// Intersection now applied to both.
        constraint: VersionConstraint,
    },
    /// A version was picked from a range.
    SelectVersionFromRange {
        /// Artifact with its selected version.
        artifact: Artifact,
    },
}

impl ResolutionEvent {
    /// Kind of the event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::TestArtifact { .. } => EventKind::TestArtifact,
            Self::StartProcessChildren { .. } => EventKind::StartProcessChildren,
            Self::EndProcessChildren { .. } => EventKind::EndProcessChildren,
            Self::IncludeArtifact { .. } => EventKind::IncludeArtifact,
            Self::OmitForNearer { .. } => EventKind::OmitForNearer,
            Self::OmitForCycle { .. } => EventKind::OmitForCycle,
            Self::UpdateScope { .. } => EventKind::UpdateScope,
            Self::UpdateScopeCurrentPom { .. } => EventKind::UpdateScopeCurrentPom,
            Self::ManageArtifact { .. } => EventKind::ManageArtifact,
            Self::RestrictRange { .. } => EventKind::RestrictRange,
            Self::SelectVersionFromRange { .. } => EventKind::SelectVersionFromRange,
        }
    }

    /// The artifact the event is about.
    #[must_use]
    pub const fn artifact(&self) -> &Artifact {
        match self {
            Self::TestArtifact { artifact }
            | Self::StartProcessChildren { artifact }
            | Self::EndProcessChildren { artifact }
            | Self::IncludeArtifact { artifact }
            | Self::OmitForCycle { artifact }
            | Self::UpdateScope { artifact, .. }
            | Self::UpdateScopeCurrentPom { artifact, .. }
            | Self::ManageArtifact { artifact, .. }
            | Self::RestrictRange { artifact, .. }
            | Self::SelectVersionFromRange { artifact } => artifact,
            Self::OmitForNearer { omitted, .. } => omitted,
        }
    }
}

/// Receives collector events.
pub trait ResolutionListener: Send + Sync + fmt::Debug {
    /// Called once per event, in decision order.
    fn on_event(&self, event: &ResolutionEvent);
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ResolutionEvent>>,
}

impl RecordingListener {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far.
    #[must_use]
    pub fn events(&self) -> Vec<ResolutionEvent> {
        self.events.lock().clone()
    }

    /// Kinds of the events received so far.
    #[must_use]
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(ResolutionEvent::kind).collect()
    }

    /// Events of one kind.
    #[must_use]
    pub fn of_kind(&self, kind: EventKind) -> Vec<ResolutionEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.kind() == kind)
            .cloned()
            .collect()
    }

    /// Forget recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl ResolutionListener for RecordingListener {
    fn on_event(&self, event: &ResolutionEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Logs every event at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl ResolutionListener for TracingListener {
    fn on_event(&self, event: &ResolutionEvent) {
        debug!(
            event = %event.kind(),
            artifact = %event.artifact(),
            trail = %event.artifact().trail,
            "resolution event"
        );
    }
}
