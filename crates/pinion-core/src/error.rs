//! Error types for the resolution pipeline.

use crate::coords::Coordinates;
use crate::graph::DependencyGraph;
use thiserror::Error;

/// Failures that abort a resolution run.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("malformed coordinate '{input}': {reason}")]
    MalformedCoordinate { input: String, reason: String },

    #[error("artifact {coordinates} was not found in any of the configured repositories{}", format_request_chain(.requested_by))]
    ArtifactNotFound {
        coordinates: Coordinates,
        requested_by: Vec<Coordinates>,
    },

    #[error("dependency cycle across distinct artifacts: {}", format_cycle(.path))]
    IllegalCycle { path: Vec<Coordinates> },

    #[error("invalid descriptor for {coordinates}: {reason}")]
    DescriptorInvalid {
        coordinates: Coordinates,
        reason: String,
    },

    #[error("resolver backend '{backend}' failed: {reason}")]
    BackendFailed {
        backend: &'static str,
        reason: String,
    },

    #[error("unknown resolver '{name}' (expected 'maven' or 'coursier')")]
    UnknownResolver { name: String },

    #[error("invalid lock file: {reason}")]
    InvalidLockfile { reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResolveError {
    /// Fill in the request chain of an [`ResolveError::ArtifactNotFound`]
    /// from the graph, when the error does not already carry one.
    #[must_use]
    pub fn with_request_chain(self, graph: &DependencyGraph) -> Self {
        match self {
            Self::ArtifactNotFound {
                coordinates,
                requested_by,
            } if requested_by.is_empty() => {
                let requested_by = graph.request_chain(&coordinates);
                Self::ArtifactNotFound {
                    coordinates,
                    requested_by,
                }
            }
            other => other,
        }
    }
}

/// Failures inside the HTTP/file transport layer.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("resource not found: {url}")]
    NotFound { url: String },

    #[error("unexpected status {status} fetching {url}")]
    Status { url: String, status: u16 },

    #[error("invalid repository URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("transfer failed for {url}: {reason}")]
    Io { url: String, reason: String },

    #[error("failed to initialize HTTP client: {reason}")]
    Init { reason: String },
}

impl TransportError {
    /// Whether this failure means "the resource does not exist here",
    /// as opposed to a transfer or server problem.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

fn format_request_chain(chain: &[Coordinates]) -> String {
    if chain.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = chain.iter().map(ToString::to_string).collect();
    format!(" (requested via {})", rendered.join(" -> "))
}

fn format_cycle(path: &[Coordinates]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_includes_chain() {
        let err = ResolveError::ArtifactNotFound {
            coordinates: Coordinates::parse("com.example:leaf:1.0").unwrap(),
            requested_by: vec![
                Coordinates::parse("com.example:root:2.0").unwrap(),
                Coordinates::parse("com.example:mid:1.5").unwrap(),
            ],
        };
        let message = err.to_string();
        assert!(message.contains("com.example:leaf:1.0"));
        assert!(message.contains("requested via com.example:root:2.0 -> com.example:mid:1.5"));
    }

    #[test]
    fn test_not_found_message_without_chain() {
        let err = ResolveError::ArtifactNotFound {
            coordinates: Coordinates::parse("com.example:leaf:1.0").unwrap(),
            requested_by: Vec::new(),
        };
        assert!(!err.to_string().contains("requested via"));
    }

    #[test]
    fn test_cycle_message_lists_path() {
        let err = ResolveError::IllegalCycle {
            path: vec![
                Coordinates::parse("com.example:a:1.0").unwrap(),
                Coordinates::parse("com.example:b:1.0").unwrap(),
                Coordinates::parse("com.example:a:1.0").unwrap(),
            ],
        };
        assert!(err
            .to_string()
            .contains("com.example:a:1.0 -> com.example:b:1.0 -> com.example:a:1.0"));
    }

    #[test]
    fn test_transport_not_found_predicate() {
        let not_found = TransportError::NotFound {
            url: "https://repo.example/x".to_string(),
        };
        let status = TransportError::Status {
            url: "https://repo.example/x".to_string(),
            status: 500,
        };
        assert!(not_found.is_not_found());
        assert!(!status.is_not_found());
    }
}
