//! End-to-end pipeline: backend resolution, version consolidation,
//! bounded parallel downloads, and package indexing.

use crate::coords::Coordinates;
use crate::download::{ArtifactDownloader, DownloadOutcome};
use crate::error::ResolveError;
use crate::events::{warn, Event, EventSink, Phase};
use crate::graph::DependencyGraph;
use crate::index;
use crate::reconcile::{self, Conflict};
use crate::request::ResolutionRequest;
use crate::resolver::Resolver;
use crate::transport::HttpTransport;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// Concurrent downloads when the embedder does not say otherwise.
pub const DEFAULT_MAX_THREADS: usize = 8;

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Download pool width.
    pub max_threads: usize,
    /// Also fetch `-sources` jars for every resolved artifact.
    pub fetch_sources: bool,
    /// Also fetch `-javadoc` jars for every resolved artifact.
    pub fetch_javadocs: bool,
    /// Skip provenance probes; credit the first configured repository.
    pub assume_present: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_threads: DEFAULT_MAX_THREADS,
            fetch_sources: false,
            fetch_javadocs: false,
            assume_present: false,
        }
    }
}

/// Everything the pipeline learned about one resolved artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyInfo {
    pub coordinates: Coordinates,
    /// Repositories that can serve the artifact, in configured order.
    pub repositories: Vec<Url>,
    /// Local cache path; `None` for aggregators and skipped artifacts.
    pub file: Option<PathBuf>,
    pub checksum: Option<String>,
    /// Classifier to checksum, for fetched sources/javadoc variants.
    pub variants: BTreeMap<String, String>,
    pub dependencies: BTreeSet<Coordinates>,
    pub packages: BTreeSet<String>,
    pub services: BTreeMap<String, Vec<String>>,
}

#[derive(Debug)]
pub struct ResolutionOutput {
    pub graph: DependencyGraph,
    pub conflicts: BTreeSet<Conflict>,
    /// One entry per graph node, sorted by coordinate.
    pub infos: Vec<DependencyInfo>,
    /// Artifacts (including classifier variants) that could not be
    /// downloaded but did not abort the run.
    pub skipped: BTreeSet<Coordinates>,
}

/// Run the full pipeline for one request.
///
/// Requested artifacts that fail to download abort the run; transitive
/// failures degrade to a warning, a `skipped` entry, and a file-less
/// info so the graph stays complete.
pub async fn run(
    request: &ResolutionRequest,
    resolver: &dyn Resolver,
    options: &ResolveOptions,
    transport: Arc<HttpTransport>,
    events: Arc<dyn EventSink>,
) -> Result<ResolutionOutput, ResolveError> {
    events.emit(Event::PhaseStarted(Phase::Resolve));
    let backend = resolver.resolve(request).await?;
    let (raw, backend_conflicts) = backend.into_parts();
    let requested = request.requested_coordinates();
    let (graph, mut conflicts) = reconcile::reconcile(&raw, &requested);
    conflicts.extend(backend_conflicts);
    events.emit(Event::PhaseFinished(Phase::Resolve));

    events.emit(Event::PhaseStarted(Phase::Download));
    let downloader = ArtifactDownloader::new(
        transport,
        request.repositories().to_vec(),
        request.local_cache_dir().to_path_buf(),
        options.assume_present,
        Arc::clone(&events),
    );
    let concurrency = options.max_threads.max(1);

    // A node is a request's survivor when it matches the request up to
    // version; matching on the consolidation key alone would also catch
    // classifier variants that were never asked for.
    let is_requested = |coordinates: &Coordinates| {
        requested
            .iter()
            .any(|r| r.with_version(coordinates.version()) == *coordinates)
    };

    let primaries: Vec<Coordinates> = graph.nodes().cloned().collect();
    let outcomes = download_all(&downloader, primaries, concurrency).await;

    let mut infos: BTreeMap<Coordinates, DependencyInfo> = BTreeMap::new();
    let mut skipped: BTreeSet<Coordinates> = BTreeSet::new();
    for (coordinates, outcome) in outcomes {
        match outcome {
            Ok(outcome) => {
                let (packages, services) = index_outcome(&coordinates, &outcome, events.as_ref());
                infos.insert(
                    coordinates.clone(),
                    DependencyInfo {
                        repositories: outcome.repositories,
                        file: outcome.file,
                        checksum: outcome.checksum,
                        variants: BTreeMap::new(),
                        dependencies: graph.successors(&coordinates).cloned().collect(),
                        packages,
                        services,
                        coordinates,
                    },
                );
            }
            Err(err) if is_requested(&coordinates) => {
                return Err(err.with_request_chain(&graph));
            }
            Err(err) => {
                warn(events.as_ref(), format!("skipping {coordinates}: {err}"));
                skipped.insert(coordinates.clone());
                infos.insert(
                    coordinates.clone(),
                    DependencyInfo {
                        repositories: Vec::new(),
                        file: None,
                        checksum: None,
                        variants: BTreeMap::new(),
                        dependencies: graph.successors(&coordinates).cloned().collect(),
                        packages: BTreeSet::new(),
                        services: BTreeMap::new(),
                        coordinates,
                    },
                );
            }
        }
    }

    let mut classifiers: Vec<&str> = Vec::new();
    if options.fetch_sources {
        classifiers.push("sources");
    }
    if options.fetch_javadocs {
        classifiers.push("javadoc");
    }
    if !classifiers.is_empty() {
        let variants: Vec<Coordinates> = infos
            .values()
            .filter(|info| info.coordinates.classifier().is_none() && info.checksum.is_some())
            .flat_map(|info| {
                classifiers
                    .iter()
                    .map(|classifier| info.coordinates.clone().with_classifier(*classifier))
            })
            .collect();
        let outcomes = download_all(&downloader, variants, concurrency).await;
        for (variant, outcome) in outcomes {
            let primary = variant.clone().with_classifier("");
            match outcome {
                Ok(outcome) => {
                    if let (Some(info), Some(checksum), Some(classifier)) = (
                        infos.get_mut(&primary),
                        outcome.checksum,
                        variant.classifier(),
                    ) {
                        info.variants.insert(classifier.to_string(), checksum);
                    }
                }
                Err(_) => {
                    warn(
                        events.as_ref(),
                        format!(
                            "no {} artifact for {primary}",
                            variant.classifier().unwrap_or_default()
                        ),
                    );
                    skipped.insert(variant);
                }
            }
        }
    }
    events.emit(Event::PhaseFinished(Phase::Download));

    Ok(ResolutionOutput {
        graph,
        conflicts,
        infos: infos.into_values().collect(),
        skipped,
    })
}

/// Download a set of coordinates through a bounded pool. Every download
/// has finished (or failed) by the time this returns.
async fn download_all(
    downloader: &ArtifactDownloader,
    targets: Vec<Coordinates>,
    concurrency: usize,
) -> BTreeMap<Coordinates, Result<DownloadOutcome, ResolveError>> {
    stream::iter(targets)
        .map(move |coordinates| async move {
            let outcome = downloader.download(&coordinates).await;
            (coordinates, outcome)
        })
        .buffer_unordered(concurrency)
        .collect()
        .await
}

fn index_outcome(
    coordinates: &Coordinates,
    outcome: &DownloadOutcome,
    events: &dyn EventSink,
) -> (BTreeSet<String>, BTreeMap<String, Vec<String>>) {
    let Some(file) = outcome.file.as_deref() else {
        return (BTreeSet::new(), BTreeMap::new());
    };
    if file.extension().and_then(|e| e.to_str()) != Some("jar") {
        return (BTreeSet::new(), BTreeMap::new());
    }
    match index::index_jar(file) {
        Ok(jar) => (jar.packages, jar.services),
        Err(err) => {
            // Indexing is best-effort; a jar we cannot read still resolves.
            warn(events, format!("failed to index {coordinates}: {err}"));
            (BTreeSet::new(), BTreeMap::new())
        }
    }
}
