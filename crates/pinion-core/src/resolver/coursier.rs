//! Coursier backend: shells out to the `cs` launcher and adapts its JSON
//! resolution report.
//!
//! Coursier does its own version consolidation, so the adapter's main job
//! is mapping the report back onto requested coordinates: artifacts the
//! report consolidated away are surfaced as conflicts rather than silently
//! resurrected as graph nodes.

use super::{ResolutionResult, Resolver};
use crate::coords::{Coordinates, DEFAULT_EXTENSION};
use crate::error::ResolveError;
use crate::events::{Event, EventSink};
use crate::graph::DependencyGraph;
use crate::reconcile::Conflict;
use crate::request::ResolutionRequest;
use async_trait::async_trait;
use pinion_util::fs::read_to_string_lossy;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use tokio::process::Command;

/// Launcher binary consulted when [`LAUNCHER_ENV`] is unset.
pub const DEFAULT_LAUNCHER: &str = "cs";
/// Overrides the coursier launcher path.
pub const LAUNCHER_ENV: &str = "PINION_COURSIER";

const REPORT_FILE: &str = "coursier-report.json";

pub struct CoursierResolver {
    launcher: String,
    events: Arc<dyn EventSink>,
}

impl CoursierResolver {
    #[must_use]
    pub fn new(events: Arc<dyn EventSink>) -> Self {
        let launcher =
            std::env::var(LAUNCHER_ENV).unwrap_or_else(|_| DEFAULT_LAUNCHER.to_string());
        Self { launcher, events }
    }

    #[must_use]
    pub fn with_launcher(mut self, launcher: impl Into<String>) -> Self {
        self.launcher = launcher.into();
        self
    }

    fn command_args(request: &ResolutionRequest, report: &Path) -> Vec<String> {
        let mut args = vec![
            "fetch".to_string(),
            "--quiet".to_string(),
            "--json-output-file".to_string(),
            report.display().to_string(),
        ];
        for repository in request.repositories() {
            args.push("--repository".to_string());
            // Embedded credentials pass through; coursier strips them
            // from its own output.
            args.push(repository.as_str().to_string());
        }
        // Coursier has no per-artifact exclusion flag, so per-artifact
        // exclusions widen to global ones for this backend.
        let mut exclusions: BTreeSet<String> = request
            .global_exclusions()
            .iter()
            .map(ToString::to_string)
            .collect();
        for artifact in request.artifacts() {
            exclusions.extend(artifact.exclusions.iter().map(ToString::to_string));
        }
        for exclusion in exclusions {
            args.push("--exclude".to_string());
            args.push(exclusion);
        }
        for bom in request.boms() {
            args.push("--bom".to_string());
            args.push(bom.coordinates.to_string());
        }
        for artifact in request.artifacts() {
            args.push(launcher_coordinate(&artifact.coordinates));
        }
        args
    }
}

#[async_trait]
impl Resolver for CoursierResolver {
    fn name(&self) -> &'static str {
        "coursier"
    }

    async fn resolve(&self, request: &ResolutionRequest) -> Result<ResolutionResult, ResolveError> {
        std::fs::create_dir_all(request.local_cache_dir())?;
        let report_path = request.local_cache_dir().join(REPORT_FILE);
        let args = Self::command_args(request, &report_path);

        let output = Command::new(&self.launcher)
            .args(&args)
            .output()
            .await
            .map_err(|e| ResolveError::BackendFailed {
                backend: "coursier",
                reason: format!("failed to launch '{}': {e}", self.launcher),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            let reason = if stderr.trim().is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr.trim().to_string()
            };
            return Err(ResolveError::BackendFailed {
                backend: "coursier",
                reason,
            });
        }
        if !stderr.trim().is_empty() {
            self.events.emit(Event::Warning {
                message: format!("coursier: {}", stderr.trim()),
            });
        }

        let report_text =
            read_to_string_lossy(&report_path).map_err(|e| ResolveError::BackendFailed {
                backend: "coursier",
                reason: format!("launcher succeeded but the report is unreadable: {e}"),
            })?;
        let report: Report =
            serde_json::from_str(&report_text).map_err(|e| ResolveError::BackendFailed {
                backend: "coursier",
                reason: format!("malformed JSON report: {e}"),
            })?;
        build_result(&report, request)
    }
}

#[derive(Debug, Deserialize)]
struct Report {
    #[serde(default)]
    conflict_resolution: BTreeMap<String, String>,
    #[serde(default)]
    dependencies: Vec<ReportDependency>,
}

#[derive(Debug, Deserialize)]
struct ReportDependency {
    coord: String,
    #[serde(default, rename = "directDependencies")]
    direct_dependencies: Vec<String>,
}

/// Render a coordinate in the launcher's dependency syntax.
fn launcher_coordinate(coordinates: &Coordinates) -> String {
    let mut rendered = format!(
        "{}:{}:{}",
        coordinates.group_id(),
        coordinates.artifact_id(),
        coordinates.version()
    );
    if coordinates.extension() != DEFAULT_EXTENSION {
        rendered.push_str(",ext=");
        rendered.push_str(coordinates.extension());
    }
    if let Some(classifier) = coordinates.classifier() {
        rendered.push_str(",classifier=");
        rendered.push_str(classifier);
    }
    rendered
}

/// Parse a report coordinate, which may carry `,key=value` attributes.
fn parse_report_coordinate(input: &str) -> Result<Coordinates, ResolveError> {
    let mut parts = input.split(',');
    let mut coordinates = Coordinates::parse(parts.next().unwrap_or_default())?;
    for attribute in parts {
        match attribute.split_once('=') {
            Some(("classifier", value)) => coordinates = coordinates.with_classifier(value),
            Some(("ext" | "type", value)) => coordinates = coordinates.with_extension(value),
            _ => {}
        }
    }
    Ok(coordinates)
}

fn build_result(
    report: &Report,
    request: &ResolutionRequest,
) -> Result<ResolutionResult, ResolveError> {
    let mut graph = DependencyGraph::new();
    for dependency in &report.dependencies {
        let node = parse_report_coordinate(&dependency.coord)?;
        graph.add_node(node.clone());
        for direct in &dependency.direct_dependencies {
            graph.add_edge(node.clone(), parse_report_coordinate(direct)?);
        }
    }

    let mut conflicts: BTreeSet<Conflict> = BTreeSet::new();
    for (requested, resolved) in &report.conflict_resolution {
        conflicts.insert(Conflict {
            requested: parse_report_coordinate(requested)?,
            resolved: parse_report_coordinate(resolved)?,
        });
    }

    // A requested artifact missing from the report either lost a version
    // fight (record the conflict) or was never reported at all (keep it
    // as a leaf so downloads still cover it).
    for artifact in request.artifacts() {
        let requested = &artifact.coordinates;
        if graph.contains(requested) {
            continue;
        }
        let winner = graph
            .nodes()
            .find(|node| node.as_key() == requested.as_key())
            .cloned();
        match winner {
            Some(resolved) => {
                conflicts.insert(Conflict {
                    resolved,
                    requested: requested.clone(),
                });
            }
            None => graph.add_node(requested.clone()),
        }
    }

    graph.check_cycles()?;
    Ok(ResolutionResult::new(graph, conflicts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullSink;
    use crate::request::Artifact;

    fn coords(s: &str) -> Coordinates {
        Coordinates::parse(s).unwrap()
    }

    fn report(json: &str) -> Report {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_report_builds_graph_edges() {
        let report = report(
            r#"{
              "conflict_resolution": {},
              "dependencies": [
                {"coord": "com.example:app:1.0", "directDependencies": ["com.example:lib:2.0"]},
                {"coord": "com.example:lib:2.0", "directDependencies": []}
              ]
            }"#,
        );
        let request =
            ResolutionRequest::new().with_artifact(Artifact::parse("com.example:app:1.0").unwrap());
        let result = build_result(&report, &request).unwrap();

        assert_eq!(result.graph().len(), 2);
        let children: Vec<String> = result
            .graph()
            .successors(&coords("com.example:app:1.0"))
            .map(ToString::to_string)
            .collect();
        assert_eq!(children, vec!["com.example:lib:2.0"]);
        assert!(result.conflicts().is_empty());
    }

    #[test]
    fn test_report_conflicts_are_adopted() {
        let report = report(
            r#"{
              "conflict_resolution": {"com.example:lib:1.0": "com.example:lib:2.0"},
              "dependencies": [
                {"coord": "com.example:lib:2.0", "directDependencies": []}
              ]
            }"#,
        );
        let request =
            ResolutionRequest::new().with_artifact(Artifact::parse("com.example:lib:2.0").unwrap());
        let result = build_result(&report, &request).unwrap();
        assert_eq!(result.conflicts().len(), 1);
        let conflict = result.conflicts().iter().next().unwrap();
        assert_eq!(conflict.requested, coords("com.example:lib:1.0"));
        assert_eq!(conflict.resolved, coords("com.example:lib:2.0"));
    }

    #[test]
    fn test_consolidated_request_becomes_conflict_not_node() {
        let report = report(
            r#"{
              "dependencies": [
                {"coord": "com.example:lib:2.0", "directDependencies": []}
              ]
            }"#,
        );
        let request =
            ResolutionRequest::new().with_artifact(Artifact::parse("com.example:lib:1.0").unwrap());
        let result = build_result(&report, &request).unwrap();

        assert!(!result.graph().contains(&coords("com.example:lib:1.0")));
        assert!(result.graph().contains(&coords("com.example:lib:2.0")));
        assert_eq!(result.conflicts().len(), 1);
        let conflict = result.conflicts().iter().next().unwrap();
        assert_eq!(conflict.requested, coords("com.example:lib:1.0"));
        assert_eq!(conflict.resolved, coords("com.example:lib:2.0"));
    }

    #[test]
    fn test_unreported_request_stays_as_leaf() {
        let report = report(r#"{"dependencies": []}"#);
        let request = ResolutionRequest::new()
            .with_artifact(Artifact::parse("com.example:standalone:3.1").unwrap());
        let result = build_result(&report, &request).unwrap();
        let node = coords("com.example:standalone:3.1");
        assert!(result.graph().contains(&node));
        assert_eq!(result.graph().successors(&node).count(), 0);
    }

    #[test]
    fn test_report_coordinate_attributes() {
        let parsed = parse_report_coordinate("com.example:lib:1.0,classifier=sources").unwrap();
        assert_eq!(parsed.classifier(), Some("sources"));
        let typed = parse_report_coordinate("com.example:lib:1.0,ext=zip").unwrap();
        assert_eq!(typed.extension(), "zip");
        assert!(parse_report_coordinate("nonsense").is_err());
    }

    #[test]
    fn test_launcher_coordinate_rendering() {
        assert_eq!(
            launcher_coordinate(&coords("com.example:lib:1.0")),
            "com.example:lib:1.0"
        );
        assert_eq!(
            launcher_coordinate(&Coordinates::new("com.example", "lib", "1.0").with_classifier("sources")),
            "com.example:lib:1.0,classifier=sources"
        );
        assert_eq!(
            launcher_coordinate(&coords("com.example:lib:zip:2.4")),
            "com.example:lib:2.4,ext=zip"
        );
    }

    #[test]
    fn test_command_args_cover_request() {
        let request = ResolutionRequest::new()
            .with_repository(url::Url::parse("https://repo1.maven.org/maven2/").unwrap())
            .with_artifact(
                Artifact::parse("com.example:app:1.0,org.bad:junk").unwrap(),
            )
            .with_bom(Artifact::parse("com.example:bom:2.0").unwrap())
            .with_global_exclusion(crate::request::Exclusion::parse("org.ugly:legacy").unwrap());
        let args = CoursierResolver::command_args(&request, Path::new("/tmp/report.json"));

        assert_eq!(args[0], "fetch");
        assert!(args.contains(&"--json-output-file".to_string()));
        assert!(args.contains(&"https://repo1.maven.org/maven2/".to_string()));
        assert!(args.contains(&"org.bad:junk".to_string()));
        assert!(args.contains(&"org.ugly:legacy".to_string()));
        assert!(args.contains(&"com.example:bom:2.0".to_string()));
        assert_eq!(args.last(), Some(&"com.example:app:1.0".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fake_launcher_end_to_end() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let json = r#"{"conflict_resolution":{},"dependencies":[{"coord":"com.example:app:1.0","directDependencies":["com.example:lib:2.0"]},{"coord":"com.example:lib:2.0","directDependencies":[]}]}"#;
        let script_path = dir.path().join("fake-cs");
        let script = format!(
            "#!/bin/sh\nout=\"\"\nprev=\"\"\nfor a in \"$@\"; do\n  if [ \"$prev\" = \"--json-output-file\" ]; then out=\"$a\"; fi\n  prev=\"$a\"\ndone\nprintf '%s' '{json}' > \"$out\"\n"
        );
        std::fs::write(&script_path, script).unwrap();
        std::fs::set_permissions(&script_path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let resolver = CoursierResolver::new(Arc::new(NullSink))
            .with_launcher(script_path.display().to_string());
        let request =
            ResolutionRequest::new().with_artifact(Artifact::parse("com.example:app:1.0").unwrap());
        let result = resolver.resolve(&request).await.unwrap();
        assert_eq!(result.graph().len(), 2);
        assert!(result.graph().contains(&coords("com.example:lib:2.0")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_launcher_reports_stderr() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script_path = dir.path().join("fake-cs");
        std::fs::write(&script_path, "#!/bin/sh\necho 'no such thing' >&2\nexit 1\n").unwrap();
        std::fs::set_permissions(&script_path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let resolver = CoursierResolver::new(Arc::new(NullSink))
            .with_launcher(script_path.display().to_string());
        let request =
            ResolutionRequest::new().with_artifact(Artifact::parse("com.example:app:1.0").unwrap());
        let err = resolver.resolve(&request).await.unwrap_err();
        match err {
            ResolveError::BackendFailed { backend, reason } => {
                assert_eq!(backend, "coursier");
                assert!(reason.contains("no such thing"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
