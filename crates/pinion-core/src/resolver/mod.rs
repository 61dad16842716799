//! Resolver backends.
//!
//! A backend turns a [`ResolutionRequest`] into a raw dependency graph
//! plus any conflicts it already resolved itself. Both backends uphold the
//! same contract: every requested artifact appears as a node (or as a
//! reported conflict when the backend consolidated it away), edges carry
//! resolved versions, and cross-artifact cycles have been rejected.

mod coursier;
mod maven;

pub use coursier::CoursierResolver;
pub use maven::MavenResolver;

use crate::error::ResolveError;
use crate::events::EventSink;
use crate::graph::DependencyGraph;
use crate::reconcile::Conflict;
use crate::request::ResolutionRequest;
use crate::transport::HttpTransport;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Backend used when none is named.
pub const DEFAULT_RESOLVER: &str = "maven";

/// A backend resolution pass: the raw graph and backend-reported
/// conflicts.
#[derive(Debug, Default)]
pub struct ResolutionResult {
    graph: DependencyGraph,
    conflicts: BTreeSet<Conflict>,
}

impl ResolutionResult {
    #[must_use]
    pub fn new(graph: DependencyGraph, conflicts: BTreeSet<Conflict>) -> Self {
        Self { graph, conflicts }
    }

    #[must_use]
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    #[must_use]
    pub fn conflicts(&self) -> &BTreeSet<Conflict> {
        &self.conflicts
    }

    #[must_use]
    pub fn into_parts(self) -> (DependencyGraph, BTreeSet<Conflict>) {
        (self.graph, self.conflicts)
    }
}

#[async_trait]
pub trait Resolver: Send + Sync {
    /// Stable backend name, as selected on the command line.
    fn name(&self) -> &'static str;

    /// Resolve the request into a dependency graph.
    async fn resolve(&self, request: &ResolutionRequest) -> Result<ResolutionResult, ResolveError>;
}

/// Look up a backend by name.
pub fn resolver_for(
    name: &str,
    transport: Arc<HttpTransport>,
    events: Arc<dyn EventSink>,
) -> Result<Box<dyn Resolver>, ResolveError> {
    match name {
        "maven" => Ok(Box::new(MavenResolver::new(transport, events))),
        "coursier" => Ok(Box::new(CoursierResolver::new(events))),
        other => Err(ResolveError::UnknownResolver {
            name: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullSink;
    use crate::netrc::CredentialStore;

    #[test]
    fn test_resolver_lookup() {
        let transport = Arc::new(HttpTransport::new(&[], CredentialStore::default()).unwrap());
        let events: Arc<dyn EventSink> = Arc::new(NullSink);
        let maven = resolver_for("maven", Arc::clone(&transport), Arc::clone(&events)).unwrap();
        assert_eq!(maven.name(), "maven");
        let coursier = resolver_for("coursier", Arc::clone(&transport), Arc::clone(&events)).unwrap();
        assert_eq!(coursier.name(), "coursier");
        assert!(matches!(
            resolver_for("ivy", transport, events),
            Err(ResolveError::UnknownResolver { .. })
        ));
    }
}
