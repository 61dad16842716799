//! Native Maven backend: transitive POM traversal over the configured
//! repositories.
//!
//! The walk proceeds in waves. Each wave fetches the descriptors it needs
//! concurrently (one fetch per coordinate, shared through a descriptor
//! cache), then expands dependencies sequentially so graph construction
//! stays deterministic.

use super::{ResolutionResult, Resolver};
use crate::coords::Coordinates;
use crate::error::ResolveError;
use crate::events::{Event, EventSink};
use crate::graph::DependencyGraph;
use crate::pom::{EffectivePom, PomDependency, RawPom};
use crate::request::{Exclusion, ResolutionRequest};
use crate::transport::{join_repo, HttpTransport};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use url::Url;

/// Concurrent descriptor fetches per wave.
const MAX_CONCURRENT_FETCHES: usize = 16;
/// Transitive depth cap.
const MAX_DEPTH: usize = 100;
/// Parent chain cap; a deeper chain indicates a descriptor loop.
const MAX_PARENT_DEPTH: usize = 16;

type DescriptorCache = Arc<RwLock<HashMap<Coordinates, Arc<RawPom>>>>;

pub struct MavenResolver {
    transport: Arc<HttpTransport>,
    events: Arc<dyn EventSink>,
    descriptors: DescriptorCache,
}

impl MavenResolver {
    #[must_use]
    pub fn new(transport: Arc<HttpTransport>, events: Arc<dyn EventSink>) -> Self {
        Self {
            transport,
            events,
            descriptors: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Fetch and parse one POM, through the descriptor cache.
    async fn fetch_raw(
        &self,
        repositories: &[Url],
        coordinates: &Coordinates,
    ) -> Result<Arc<RawPom>, ResolveError> {
        {
            let cache = self.descriptors.read().await;
            if let Some(raw) = cache.get(coordinates) {
                return Ok(Arc::clone(raw));
            }
        }
        let rel_path = coordinates.descriptor().to_repo_path();
        for repository in repositories {
            let url = join_repo(repository, &rel_path)?;
            match self.transport.get(&url, self.events.as_ref()).await {
                Ok(bytes) => {
                    let xml = String::from_utf8_lossy(&bytes);
                    let raw = Arc::new(crate::pom::parse_pom(&xml, coordinates)?);
                    self.descriptors
                        .write()
                        .await
                        .insert(coordinates.clone(), Arc::clone(&raw));
                    return Ok(raw);
                }
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err.into()),
            }
        }
        Err(ResolveError::ArtifactNotFound {
            coordinates: coordinates.clone(),
            requested_by: Vec::new(),
        })
    }

    /// Fetch a POM and its parent chain, merged to the effective model.
    async fn fetch_effective(
        &self,
        repositories: &[Url],
        coordinates: &Coordinates,
    ) -> Result<EffectivePom, ResolveError> {
        let mut chain: Vec<Arc<RawPom>> = Vec::new();
        let mut visited: HashSet<Coordinates> = HashSet::new();
        let mut cursor = Some(coordinates.clone());
        while let Some(current) = cursor {
            if chain.len() >= MAX_PARENT_DEPTH || !visited.insert(current.clone()) {
                return Err(ResolveError::DescriptorInvalid {
                    coordinates: coordinates.clone(),
                    reason: "parent chain does not terminate".to_string(),
                });
            }
            let raw = self.fetch_raw(repositories, &current).await?;
            cursor = raw
                .parent
                .as_ref()
                .map(|p| Coordinates::new(p.group_id.clone(), p.artifact_id.clone(), p.version.clone()));
            chain.push(raw);
        }
        EffectivePom::from_chain(&chain, coordinates)
    }
}

#[async_trait]
impl Resolver for MavenResolver {
    fn name(&self) -> &'static str {
        "maven"
    }

    async fn resolve(&self, request: &ResolutionRequest) -> Result<ResolutionResult, ResolveError> {
        let mut walk = PomWalk {
            resolver: self,
            repositories: request.repositories(),
            bom_pins: HashMap::new(),
            poms: HashMap::new(),
            failed: HashSet::new(),
        };
        walk.pin_boms(request).await?;
        let graph = walk.expand(request).await?;
        graph.check_cycles()?;
        Ok(ResolutionResult::new(graph, BTreeSet::new()))
    }
}

struct WalkItem {
    coordinates: Coordinates,
    exclusions: Arc<BTreeSet<Exclusion>>,
    depth: usize,
    root: bool,
}

struct PomWalk<'a> {
    resolver: &'a MavenResolver,
    repositories: &'a [Url],
    /// `(group, artifact)` to version pinned by the first BOM declaring it.
    bom_pins: HashMap<(String, String), String>,
    poms: HashMap<Coordinates, Arc<EffectivePom>>,
    failed: HashSet<Coordinates>,
}

impl PomWalk<'_> {
    /// Load BOM version pins. BOMs are processed in declaration order,
    /// each followed by its `scope=import` transitive BOMs, and the first
    /// pin for a `(group, artifact)` wins.
    async fn pin_boms(&mut self, request: &ResolutionRequest) -> Result<(), ResolveError> {
        let mut queue: VecDeque<Coordinates> = request
            .boms()
            .iter()
            .map(|bom| bom.coordinates.clone())
            .collect();
        let mut visited: HashSet<Coordinates> = HashSet::new();
        while let Some(bom) = queue.pop_front() {
            if !visited.insert(bom.clone()) {
                continue;
            }
            let pom = self.resolver.fetch_effective(self.repositories, &bom).await?;
            for ((group, artifact), version) in &pom.managed_versions {
                self.bom_pins
                    .entry((group.clone(), artifact.clone()))
                    .or_insert_with(|| version.clone());
            }
            for import in pom.managed_imports.iter().rev() {
                queue.push_front(import.clone());
            }
        }
        Ok(())
    }

    async fn expand(&mut self, request: &ResolutionRequest) -> Result<DependencyGraph, ResolveError> {
        let mut graph = DependencyGraph::new();
        let mut visited: HashSet<(Coordinates, BTreeSet<Exclusion>)> = HashSet::new();
        let mut queue: VecDeque<WalkItem> = VecDeque::new();

        for artifact in request.artifacts() {
            let mut exclusions = request.global_exclusions().clone();
            exclusions.extend(artifact.exclusions.iter().cloned());
            graph.add_node(artifact.coordinates.clone());
            queue.push_back(WalkItem {
                coordinates: artifact.coordinates.clone(),
                exclusions: Arc::new(exclusions),
                depth: 0,
                root: true,
            });
        }

        while !queue.is_empty() {
            let mut batch: Vec<WalkItem> = Vec::new();
            while let Some(item) = queue.pop_front() {
                let key = (item.coordinates.clone(), item.exclusions.as_ref().clone());
                if visited.insert(key) {
                    batch.push(item);
                }
            }

            self.fetch_wave(&batch, &graph).await?;

            for item in batch {
                if item.depth >= MAX_DEPTH {
                    continue;
                }
                let Some(pom) = self.poms.get(&item.coordinates).map(Arc::clone) else {
                    continue;
                };
                for dep in pom.dependencies.iter().filter(|d| d.is_transitive()) {
                    if item
                        .exclusions
                        .iter()
                        .any(|ex| ex.matches_parts(&dep.group_id, &dep.artifact_id))
                    {
                        continue;
                    }
                    let Some(version) = self.effective_version(&pom, dep) else {
                        self.resolver.events.emit(Event::Warning {
                            message: format!(
                                "{}:{} is declared without a resolvable version in {}; dropping the edge",
                                dep.group_id, dep.artifact_id, item.coordinates
                            ),
                        });
                        continue;
                    };
                    let mut child = Coordinates::new(dep.group_id.clone(), dep.artifact_id.clone(), version);
                    if let Some(extension) = &dep.extension {
                        child = child.with_extension(extension.clone());
                    }
                    if let Some(classifier) = &dep.classifier {
                        child = child.with_classifier(classifier.clone());
                    }
                    graph.add_edge(item.coordinates.clone(), child.clone());

                    let mut child_exclusions = item.exclusions.as_ref().clone();
                    for (group, artifact) in &dep.exclusions {
                        child_exclusions.insert(Exclusion::new(group.clone(), artifact.clone()));
                    }
                    queue.push_back(WalkItem {
                        coordinates: child,
                        exclusions: Arc::new(child_exclusions),
                        depth: item.depth + 1,
                        root: false,
                    });
                }
            }
        }

        Ok(graph)
    }

    /// Fetch effective POMs for one wave of items concurrently. Failures
    /// on root items abort; failures on transitives degrade those nodes
    /// to leaves with a warning.
    async fn fetch_wave(
        &mut self,
        batch: &[WalkItem],
        graph: &DependencyGraph,
    ) -> Result<(), ResolveError> {
        let wanted: BTreeSet<Coordinates> = batch
            .iter()
            .map(|item| item.coordinates.clone())
            .filter(|c| !self.poms.contains_key(c) && !self.failed.contains(c))
            .collect();

        let resolver = self.resolver;
        let repositories = self.repositories;
        let fetched: Vec<(Coordinates, Result<EffectivePom, ResolveError>)> = stream::iter(wanted)
            .map(move |coordinates| async move {
                let result = resolver.fetch_effective(repositories, &coordinates).await;
                (coordinates, result)
            })
            .buffer_unordered(MAX_CONCURRENT_FETCHES)
            .collect()
            .await;

        let mut failures: HashMap<Coordinates, ResolveError> = HashMap::new();
        for (coordinates, result) in fetched {
            match result {
                Ok(pom) => {
                    self.poms.insert(coordinates, Arc::new(pom));
                }
                Err(err) => {
                    failures.insert(coordinates, err);
                }
            }
        }

        for item in batch {
            if item.root {
                if let Some(err) = failures.remove(&item.coordinates) {
                    return Err(err.with_request_chain(graph));
                }
            }
        }
        for (coordinates, err) in failures {
            self.resolver.events.emit(Event::Warning {
                message: format!(
                    "descriptor for {coordinates} could not be resolved ({err}); keeping it as a leaf"
                ),
            });
            self.failed.insert(coordinates);
        }
        Ok(())
    }

    /// Version for a dependency edge: BOM pins override declared
    /// versions, which override the declaring POM's managed versions.
    fn effective_version(&self, declaring: &EffectivePom, dep: &PomDependency) -> Option<String> {
        let key = dep.key();
        if let Some(version) = self.bom_pins.get(&key) {
            return Some(version.clone());
        }
        dep.version
            .clone()
            .or_else(|| declaring.managed_versions.get(&key).cloned())
    }
}
