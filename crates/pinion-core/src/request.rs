//! Resolution requests: what to resolve, from where, with what excluded.

use crate::coords::Coordinates;
use crate::error::ResolveError;
use crate::paths;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use url::Url;

/// Default repository consulted when none are configured.
pub const DEFAULT_REPOSITORY: &str = "https://repo1.maven.org/maven2/";

/// A `group:artifact` pair pruned from transitive traversal. Either side
/// may be `*`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Exclusion {
    group_id: String,
    artifact_id: String,
}

impl Exclusion {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    /// Parse `group:artifact`; `*` wildcards either side.
    pub fn parse(input: &str) -> Result<Self, ResolveError> {
        let trimmed = input.trim();
        match trimmed.split_once(':') {
            Some((group, artifact)) if !group.is_empty() && !artifact.is_empty() => {
                Ok(Self::new(group, artifact))
            }
            _ => Err(ResolveError::MalformedCoordinate {
                input: input.to_string(),
                reason: "exclusion must be group:artifact".to_string(),
            }),
        }
    }

    #[must_use]
    pub fn matches(&self, coordinates: &Coordinates) -> bool {
        self.matches_parts(coordinates.group_id(), coordinates.artifact_id())
    }

    #[must_use]
    pub fn matches_parts(&self, group_id: &str, artifact_id: &str) -> bool {
        segment_matches(&self.group_id, group_id) && segment_matches(&self.artifact_id, artifact_id)
    }
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

fn segment_matches(pattern: &str, value: &str) -> bool {
    pattern == "*" || pattern == value
}

/// One requested artifact with its per-artifact exclusions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub coordinates: Coordinates,
    pub exclusions: BTreeSet<Exclusion>,
}

impl Artifact {
    #[must_use]
    pub fn new(coordinates: Coordinates) -> Self {
        Self {
            coordinates,
            exclusions: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_exclusion(mut self, exclusion: Exclusion) -> Self {
        self.exclusions.insert(exclusion);
        self
    }

    /// Parse `group:artifact:version` optionally followed by
    /// `,excluded-group:excluded-artifact` pairs.
    pub fn parse(input: &str) -> Result<Self, ResolveError> {
        let mut parts = input.split(',');
        let coordinates = Coordinates::parse(parts.next().unwrap_or_default())?;
        let mut exclusions = BTreeSet::new();
        for part in parts {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            exclusions.insert(Exclusion::parse(part)?);
        }
        Ok(Self {
            coordinates,
            exclusions,
        })
    }
}

/// Where downloaded artifacts live between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// A fresh directory per run; nothing is shared between invocations.
    #[default]
    EphemeralPerRun,
    /// The shared user-level cache; faster, but a corrupted cache entry
    /// short-circuits downloads without re-verification.
    SharedUserCache,
}

/// Everything a resolver backend needs to produce a graph.
#[derive(Debug, Default)]
pub struct ResolutionRequest {
    repositories: Vec<Url>,
    artifacts: Vec<Artifact>,
    boms: Vec<Artifact>,
    global_exclusions: BTreeSet<Exclusion>,
    cache: CachePolicy,
    cache_dir: OnceLock<PathBuf>,
}

impl ResolutionRequest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_repository(mut self, url: Url) -> Self {
        self.repositories.push(url);
        self
    }

    #[must_use]
    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    #[must_use]
    pub fn with_bom(mut self, bom: Artifact) -> Self {
        self.boms.push(bom);
        self
    }

    #[must_use]
    pub fn with_global_exclusion(mut self, exclusion: Exclusion) -> Self {
        self.global_exclusions.insert(exclusion);
        self
    }

    #[must_use]
    pub fn with_cache_policy(mut self, cache: CachePolicy) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn repositories(&self) -> &[Url] {
        &self.repositories
    }

    #[must_use]
    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    #[must_use]
    pub fn boms(&self) -> &[Artifact] {
        &self.boms
    }

    #[must_use]
    pub fn global_exclusions(&self) -> &BTreeSet<Exclusion> {
        &self.global_exclusions
    }

    #[must_use]
    pub fn cache_policy(&self) -> CachePolicy {
        self.cache
    }

    /// The explicitly requested coordinates, in declaration order.
    #[must_use]
    pub fn requested_coordinates(&self) -> Vec<Coordinates> {
        self.artifacts
            .iter()
            .map(|a| a.coordinates.clone())
            .collect()
    }

    /// Directory downloaded artifacts are materialized into. Computed once
    /// per request; an ephemeral policy yields the same directory for the
    /// whole run.
    pub fn local_cache_dir(&self) -> &Path {
        self.cache_dir.get_or_init(|| match self.cache {
            CachePolicy::SharedUserCache => paths::shared_cache_dir(),
            CachePolicy::EphemeralPerRun => paths::ephemeral_cache_dir(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusion_parse_and_match() {
        let exclusion = Exclusion::parse("com.google.guava:listenablefuture").unwrap();
        assert!(exclusion.matches(&Coordinates::new(
            "com.google.guava",
            "listenablefuture",
            "1.0"
        )));
        assert!(!exclusion.matches(&Coordinates::new("com.google.guava", "guava", "1.0")));
    }

    #[test]
    fn test_exclusion_wildcards() {
        let any_artifact = Exclusion::parse("com.google.guava:*").unwrap();
        assert!(any_artifact.matches(&Coordinates::new("com.google.guava", "guava", "1.0")));
        let any_group = Exclusion::parse("*:annotations").unwrap();
        assert!(any_group.matches(&Coordinates::new("org.jetbrains", "annotations", "13.0")));
        assert!(!any_group.matches(&Coordinates::new("org.jetbrains", "kotlin-stdlib", "1.9")));
    }

    #[test]
    fn test_exclusion_rejects_bare_group() {
        assert!(Exclusion::parse("com.google.guava").is_err());
        assert!(Exclusion::parse(":x").is_err());
    }

    #[test]
    fn test_artifact_parse_with_exclusions() {
        let artifact = Artifact::parse(
            "com.google.guava:guava:31.1-jre,com.google.code.findbugs:jsr305,*:listenablefuture",
        )
        .unwrap();
        assert_eq!(
            artifact.coordinates,
            Coordinates::parse("com.google.guava:guava:31.1-jre").unwrap()
        );
        assert_eq!(artifact.exclusions.len(), 2);
    }

    #[test]
    fn test_artifact_parse_plain() {
        let artifact = Artifact::parse("com.example:lib:1.0").unwrap();
        assert!(artifact.exclusions.is_empty());
    }

    #[test]
    fn test_cache_dir_is_memoized() {
        let request = ResolutionRequest::new();
        let first = request.local_cache_dir().to_path_buf();
        let second = request.local_cache_dir().to_path_buf();
        assert_eq!(first, second);
    }

    #[test]
    fn test_shared_cache_policy_uses_shared_dir() {
        let request = ResolutionRequest::new().with_cache_policy(CachePolicy::SharedUserCache);
        assert_eq!(request.local_cache_dir(), paths::shared_cache_dir());
    }

    #[test]
    fn test_requested_coordinates_keep_declaration_order() {
        let request = ResolutionRequest::new()
            .with_artifact(Artifact::parse("com.example:z:1.0").unwrap())
            .with_artifact(Artifact::parse("com.example:a:1.0").unwrap());
        let requested = request.requested_coordinates();
        assert_eq!(requested[0].artifact_id(), "z");
        assert_eq!(requested[1].artifact_id(), "a");
    }
}
