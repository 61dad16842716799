//! Maven coordinate parsing and canonical rendering.
//!
//! A coordinate names an artifact as `group:artifact:version`, optionally
//! carrying a packaging extension and a classifier:
//!
//! - `com.google.guava:guava:31.1-jre`
//! - `org.something:lib:zip:2.4`
//! - `io.grpc:protoc-gen-grpc-java:exe:linux-x86_64:1.57.1`

use crate::error::ResolveError;
use std::fmt;

/// Packaging extension assumed when a coordinate does not name one.
pub const DEFAULT_EXTENSION: &str = "jar";

/// A fully-specified artifact coordinate.
///
/// The extension is always normalized: an absent or empty extension becomes
/// [`DEFAULT_EXTENSION`], so equality and ordering never distinguish
/// `g:a:1.0` from `g:a:jar:1.0`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coordinates {
    group_id: String,
    artifact_id: String,
    extension: String,
    classifier: String,
    version: String,
}

impl Coordinates {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            extension: DEFAULT_EXTENSION.to_string(),
            classifier: String::new(),
            version: version.into(),
        }
    }

    /// Set the packaging extension. An empty extension resets to the default.
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        self.extension = if extension.is_empty() {
            DEFAULT_EXTENSION.to_string()
        } else {
            extension
        };
        self
    }

    /// Set the classifier. An empty classifier means the primary artifact.
    #[must_use]
    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = classifier.into();
        self
    }

    /// Same coordinate at a different version.
    #[must_use]
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.version = version.into();
        next
    }

    #[must_use]
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    #[must_use]
    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    #[must_use]
    pub fn classifier(&self) -> Option<&str> {
        if self.classifier.is_empty() {
            None
        } else {
            Some(&self.classifier)
        }
    }

    /// Whether two coordinates name the same artifact, ignoring version.
    #[must_use]
    pub fn same_artifact(&self, other: &Self) -> bool {
        self.group_id == other.group_id && self.artifact_id == other.artifact_id
    }

    /// Parse a coordinate string.
    ///
    /// Accepted forms, in segment count order:
    ///
    /// - `group:artifact:version`
    /// - `group:artifact:extension:version`
    /// - `group:artifact:extension:classifier:version`
    pub fn parse(input: &str) -> Result<Self, ResolveError> {
        let trimmed = input.trim();
        let segments: Vec<&str> = trimmed.split(':').collect();
        let coordinates = match segments.as_slice() {
            [group, artifact, version] => Self::new(*group, *artifact, *version),
            [group, artifact, extension, version] => {
                Self::new(*group, *artifact, *version).with_extension(*extension)
            }
            [group, artifact, extension, classifier, version] => Self::new(*group, *artifact, *version)
                .with_extension(*extension)
                .with_classifier(*classifier),
            _ => {
                return Err(malformed(
                    input,
                    "expected group:artifact[:extension[:classifier]]:version",
                ))
            }
        };
        if coordinates.group_id.is_empty()
            || coordinates.artifact_id.is_empty()
            || coordinates.version.is_empty()
        {
            return Err(malformed(input, "group, artifact, and version must be non-empty"));
        }
        Ok(coordinates)
    }

    /// Reconstruct coordinates from a lock-document key plus a version.
    ///
    /// Keys are `group:artifact`, `group:artifact:extension`, or
    /// `group:artifact:extension:classifier`.
    pub fn from_qualified_key(key: &str, version: &str) -> Result<Self, ResolveError> {
        let segments: Vec<&str> = key.split(':').collect();
        let coordinates = match segments.as_slice() {
            [group, artifact] => Self::new(*group, *artifact, version),
            [group, artifact, extension] => {
                Self::new(*group, *artifact, version).with_extension(*extension)
            }
            [group, artifact, extension, classifier] => Self::new(*group, *artifact, version)
                .with_extension(*extension)
                .with_classifier(*classifier),
            _ => {
                return Err(malformed(
                    key,
                    "expected group:artifact[:extension[:classifier]]",
                ))
            }
        };
        if coordinates.group_id.is_empty() || coordinates.artifact_id.is_empty() {
            return Err(malformed(key, "group and artifact must be non-empty"));
        }
        Ok(coordinates)
    }

    /// Consolidation key: `group:artifact`, with the extension appended when
    /// it is not the default. All versions and classifiers of one artifact
    /// share a key.
    #[must_use]
    pub fn as_key(&self) -> String {
        if self.extension == DEFAULT_EXTENSION {
            format!("{}:{}", self.group_id, self.artifact_id)
        } else {
            format!("{}:{}:{}", self.group_id, self.artifact_id, self.extension)
        }
    }

    /// Lock-document key: [`Coordinates::as_key`] plus the classifier when
    /// present. Classified coordinates always spell out the extension.
    #[must_use]
    pub fn qualified_key(&self) -> String {
        if self.classifier.is_empty() {
            self.as_key()
        } else {
            format!(
                "{}:{}:{}:{}",
                self.group_id, self.artifact_id, self.extension, self.classifier
            )
        }
    }

    /// Repository-relative path of the artifact file.
    #[must_use]
    pub fn to_repo_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.group_id.replace('.', "/"),
            self.artifact_id,
            self.version,
            self.file_name()
        )
    }

    /// File name of the artifact: `artifact-version[-classifier].extension`.
    #[must_use]
    pub fn file_name(&self) -> String {
        if self.classifier.is_empty() {
            format!("{}-{}.{}", self.artifact_id, self.version, self.extension)
        } else {
            format!(
                "{}-{}-{}.{}",
                self.artifact_id, self.version, self.classifier, self.extension
            )
        }
    }

    /// The POM descriptor coordinate for this artifact (classifier cleared,
    /// extension forced to `pom`).
    #[must_use]
    pub fn descriptor(&self) -> Self {
        Self {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            extension: "pom".to_string(),
            classifier: String::new(),
            version: self.version.clone(),
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.classifier.is_empty() {
            write!(
                f,
                "{}:{}:{}:{}:{}",
                self.group_id, self.artifact_id, self.extension, self.classifier, self.version
            )
        } else if self.extension != DEFAULT_EXTENSION {
            write!(
                f,
                "{}:{}:{}:{}",
                self.group_id, self.artifact_id, self.extension, self.version
            )
        } else {
            write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
        }
    }
}

fn malformed(input: &str, reason: &str) -> ResolveError {
    ResolveError::MalformedCoordinate {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}
