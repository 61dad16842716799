//! Artifact downloads: cache short-circuit, ordered repository probing,
//! packaging and descriptor fallbacks, checksum sidecars.

use crate::coords::{Coordinates, DEFAULT_EXTENSION};
use crate::error::ResolveError;
use crate::events::{Event, EventSink};
use crate::pom;
use crate::transport::{join_repo, HttpTransport};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Extensions fetched as-is, with no packaging fallback.
const BINARY_EXTENSIONS: [&str; 6] = ["jar", "zip", "exe", "war", "ear", "aar"];
/// Classifiers that never fall back to another extension or a descriptor.
const DOC_CLASSIFIERS: [&str; 2] = ["sources", "javadoc"];

/// What a download produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub coordinates: Coordinates,
    /// Local cache path; `None` for aggregator (pom-packaged) artifacts
    /// that ship no file.
    pub file: Option<PathBuf>,
    /// SHA-256 of the cached file, when there is one.
    pub checksum: Option<String>,
    /// Repositories that can serve this artifact, in configured order.
    pub repositories: Vec<Url>,
}

pub struct ArtifactDownloader {
    transport: Arc<HttpTransport>,
    repositories: Vec<Url>,
    cache_dir: PathBuf,
    assume_present: bool,
    events: Arc<dyn EventSink>,
}

impl ArtifactDownloader {
    #[must_use]
    pub fn new(
        transport: Arc<HttpTransport>,
        repositories: Vec<Url>,
        cache_dir: PathBuf,
        assume_present: bool,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            transport,
            repositories,
            cache_dir,
            assume_present,
            events,
        }
    }

    /// Materialize one artifact into the local cache.
    ///
    /// Order of attempts:
    /// 1. cache short-circuit (file already present);
    /// 2. GET against each repository in declared order;
    /// 3. for non-binary extensions, the same path with the extension
    ///    forced to `jar` (packaging names frequently differ from the
    ///    deployed file);
    /// 4. the POM descriptor alone: `pom` packaging means an aggregator
    ///    artifact with no file of its own.
    pub async fn download(&self, coordinates: &Coordinates) -> Result<DownloadOutcome, ResolveError> {
        self.events.emit(Event::DownloadStarted {
            coordinates: coordinates.clone(),
        });
        let outcome = self.fetch(coordinates).await;
        if let Ok(outcome) = &outcome {
            let bytes = outcome
                .file
                .as_deref()
                .and_then(|path| std::fs::metadata(path).ok())
                .map_or(0, |meta| meta.len());
            self.events.emit(Event::DownloadFinished {
                coordinates: coordinates.clone(),
                bytes,
            });
        }
        outcome
    }

    async fn fetch(&self, coordinates: &Coordinates) -> Result<DownloadOutcome, ResolveError> {
        let cache_path = self.cache_dir.join(coordinates.to_repo_path());
        if cache_path.is_file() {
            let checksum = self.sidecar_checksum(&cache_path)?;
            let repositories = self.provenance(coordinates).await;
            return Ok(DownloadOutcome {
                coordinates: coordinates.clone(),
                file: Some(cache_path),
                checksum: Some(checksum),
                repositories,
            });
        }

        if let Some(outcome) = self.fetch_binary(coordinates, &cache_path).await? {
            return Ok(outcome);
        }

        if !is_binary_extension(coordinates.extension()) && !is_doc_classifier(coordinates) {
            let jar_coordinates = coordinates.clone().with_extension(DEFAULT_EXTENSION);
            let jar_path = self.cache_dir.join(jar_coordinates.to_repo_path());
            if let Some(outcome) = self.fetch_binary(&jar_coordinates, &jar_path).await? {
                // Keep the requested identity; the cached file is the jar.
                return Ok(DownloadOutcome {
                    coordinates: coordinates.clone(),
                    file: outcome.file,
                    checksum: outcome.checksum,
                    repositories: outcome.repositories,
                });
            }
        }

        if coordinates.classifier().is_none() {
            if let Some(probe) = self.fetch_descriptor(coordinates).await? {
                if probe.packaging == "pom" {
                    return Ok(DownloadOutcome {
                        coordinates: coordinates.clone(),
                        file: None,
                        checksum: None,
                        repositories: probe.repositories,
                    });
                }
            }
        }

        Err(ResolveError::ArtifactNotFound {
            coordinates: coordinates.clone(),
            requested_by: Vec::new(),
        })
    }

    /// Try each repository in order; cache and checksum the first hit.
    async fn fetch_binary(
        &self,
        coordinates: &Coordinates,
        cache_path: &Path,
    ) -> Result<Option<DownloadOutcome>, ResolveError> {
        let rel_path = coordinates.to_repo_path();
        for repository in &self.repositories {
            let url = join_repo(repository, &rel_path)?;
            match self.transport.get(&url, self.events.as_ref()).await {
                Ok(bytes) => {
                    if let Some(parent) = cache_path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    pinion_util::fs::atomic_write(cache_path, &bytes)?;
                    let checksum = pinion_util::hash::sha256_bytes(&bytes);
                    pinion_util::fs::atomic_write(
                        &sidecar_path(cache_path),
                        checksum.as_bytes(),
                    )?;
                    return Ok(Some(DownloadOutcome {
                        coordinates: coordinates.clone(),
                        file: Some(cache_path.to_path_buf()),
                        checksum: Some(checksum),
                        repositories: vec![repository.clone()],
                    }));
                }
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(None)
    }

    async fn fetch_descriptor(
        &self,
        coordinates: &Coordinates,
    ) -> Result<Option<DescriptorProbe>, ResolveError> {
        let descriptor = coordinates.descriptor();
        let rel_path = descriptor.to_repo_path();
        for repository in &self.repositories {
            let url = join_repo(repository, &rel_path)?;
            match self.transport.get(&url, self.events.as_ref()).await {
                Ok(bytes) => {
                    let xml = String::from_utf8_lossy(&bytes);
                    let raw = pom::parse_pom(&xml, coordinates)?;
                    return Ok(Some(DescriptorProbe {
                        packaging: raw.packaging.unwrap_or_else(|| DEFAULT_EXTENSION.to_string()),
                        repositories: vec![repository.clone()],
                    }));
                }
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(None)
    }

    /// Which repositories answer for this coordinate. With
    /// `assume_present` the first configured repository is credited
    /// without any network traffic.
    async fn provenance(&self, coordinates: &Coordinates) -> Vec<Url> {
        if self.assume_present {
            return self.repositories.first().cloned().into_iter().collect();
        }
        let rel_path = coordinates.to_repo_path();
        let mut sources = Vec::new();
        for repository in &self.repositories {
            if let Ok(url) = join_repo(repository, &rel_path) {
                if self.transport.head(&url, self.events.as_ref()).await {
                    sources.push(repository.clone());
                }
            }
        }
        sources
    }

    /// Checksum for a cached file, preferring the `.sha256` sidecar and
    /// rebuilding it after a cache hit that lacks one.
    fn sidecar_checksum(&self, cache_path: &Path) -> Result<String, ResolveError> {
        let sidecar = sidecar_path(cache_path);
        if let Ok(existing) = std::fs::read_to_string(&sidecar) {
            let trimmed = existing.trim();
            if !trimmed.is_empty() {
                return Ok(trimmed.to_string());
            }
        }
        let checksum = pinion_util::hash::sha256_file(cache_path)?;
        let _ = pinion_util::fs::atomic_write(&sidecar, checksum.as_bytes());
        Ok(checksum)
    }
}

struct DescriptorProbe {
    packaging: String,
    repositories: Vec<Url>,
}

fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".sha256");
    path.with_file_name(name)
}

fn is_binary_extension(extension: &str) -> bool {
    BINARY_EXTENSIONS.contains(&extension)
}

fn is_doc_classifier(coordinates: &Coordinates) -> bool {
    coordinates
        .classifier()
        .is_some_and(|classifier| DOC_CLASSIFIERS.contains(&classifier))
}
