//! POM descriptor parsing and effective-model merging.
//!
//! A raw POM is one XML document. The effective model folds in the parent
//! chain (properties, managed versions, inherited dependencies) and
//! expands `${property}` placeholders, which is what resolution actually
//! consumes.

use crate::coords::Coordinates;
use crate::error::ResolveError;
use roxmltree::{Document, Node};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Scopes that participate in transitive resolution.
const TRANSITIVE_SCOPES: [&str; 2] = ["compile", "runtime"];

/// Placeholder expansion passes; covers properties defined in terms of
/// other properties without looping forever on self-references.
const MAX_PROPERTY_DEPTH: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PomDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub classifier: Option<String>,
    pub extension: Option<String>,
    pub scope: Option<String>,
    pub optional: bool,
    pub exclusions: Vec<(String, String)>,
}

impl PomDependency {
    /// Whether this dependency is followed transitively: compile/runtime
    /// scope (or none) and not optional.
    #[must_use]
    pub fn is_transitive(&self) -> bool {
        !self.optional
            && self
                .scope
                .as_deref()
                .map_or(true, |scope| TRANSITIVE_SCOPES.contains(&scope))
    }

    #[must_use]
    pub fn key(&self) -> (String, String) {
        (self.group_id.clone(), self.artifact_id.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

/// One parsed POM document, before inheritance.
#[derive(Debug, Clone, Default)]
pub struct RawPom {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,
    pub parent: Option<ParentRef>,
    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<PomDependency>,
    pub dependency_management: Vec<PomDependency>,
}

/// Parse a POM document. `origin` names the artifact the descriptor was
/// fetched for and is only used in error values.
pub fn parse_pom(xml: &str, origin: &Coordinates) -> Result<RawPom, ResolveError> {
    let invalid = |reason: String| ResolveError::DescriptorInvalid {
        coordinates: origin.clone(),
        reason,
    };
    let doc = Document::parse(xml).map_err(|e| invalid(format!("XML parse error: {e}")))?;
    let project = doc.root_element();
    if project.tag_name().name() != "project" {
        return Err(invalid(format!(
            "root element is <{}>, expected <project>",
            project.tag_name().name()
        )));
    }

    let mut pom = RawPom {
        group_id: child_text(project, "groupId"),
        artifact_id: child_text(project, "artifactId"),
        version: child_text(project, "version"),
        packaging: child_text(project, "packaging"),
        ..RawPom::default()
    };

    if let Some(parent) = child(project, "parent") {
        match (
            child_text(parent, "groupId"),
            child_text(parent, "artifactId"),
            child_text(parent, "version"),
        ) {
            (Some(group_id), Some(artifact_id), Some(version)) => {
                pom.parent = Some(ParentRef {
                    group_id,
                    artifact_id,
                    version,
                });
            }
            _ => return Err(invalid("incomplete <parent> reference".to_string())),
        }
    }

    if let Some(properties) = child(project, "properties") {
        for prop in properties.children().filter(Node::is_element) {
            let name = prop.tag_name().name().to_string();
            let value = prop.text().map(str::trim).unwrap_or_default().to_string();
            pom.properties.insert(name, value);
        }
    }

    if let Some(dependencies) = child(project, "dependencies") {
        pom.dependencies = parse_dependency_list(dependencies);
    }
    if let Some(management) = child(project, "dependencyManagement") {
        if let Some(dependencies) = child(management, "dependencies") {
            pom.dependency_management = parse_dependency_list(dependencies);
        }
    }

    Ok(pom)
}

fn parse_dependency_list(node: Node<'_, '_>) -> Vec<PomDependency> {
    node.children()
        .filter(|c| c.is_element() && c.tag_name().name() == "dependency")
        .filter_map(parse_dependency)
        .collect()
}

fn parse_dependency(node: Node<'_, '_>) -> Option<PomDependency> {
    let group_id = child_text(node, "groupId")?;
    let artifact_id = child_text(node, "artifactId")?;
    let exclusions = child(node, "exclusions")
        .map(|list| {
            list.children()
                .filter(|c| c.is_element() && c.tag_name().name() == "exclusion")
                .map(|exclusion| {
                    (
                        child_text(exclusion, "groupId").unwrap_or_else(|| "*".to_string()),
                        child_text(exclusion, "artifactId").unwrap_or_else(|| "*".to_string()),
                    )
                })
                .collect()
        })
        .unwrap_or_default();
    Some(PomDependency {
        group_id,
        artifact_id,
        version: child_text(node, "version"),
        classifier: child_text(node, "classifier"),
        extension: child_text(node, "type"),
        scope: child_text(node, "scope"),
        optional: child_text(node, "optional").as_deref() == Some("true"),
        exclusions,
    })
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    child(node, name)
        .and_then(|c| c.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// The merged view of a POM and its parent chain.
#[derive(Debug, Clone)]
pub struct EffectivePom {
    pub coordinates: Coordinates,
    pub packaging: String,
    pub dependencies: Vec<PomDependency>,
    /// `(group, artifact)` to version pins from `dependencyManagement`.
    pub managed_versions: BTreeMap<(String, String), String>,
    /// BOMs pulled in with `scope=import`, in declaration order.
    pub managed_imports: Vec<Coordinates>,
}

impl EffectivePom {
    /// Merge a parent chain into an effective model. `chain[0]` is the POM
    /// itself, followed by its parents in order.
    pub fn from_chain(chain: &[Arc<RawPom>], origin: &Coordinates) -> Result<Self, ResolveError> {
        let invalid = |reason: String| ResolveError::DescriptorInvalid {
            coordinates: origin.clone(),
            reason,
        };
        let Some(own) = chain.first() else {
            return Err(invalid("empty descriptor chain".to_string()));
        };

        // Child property definitions override parents'.
        let mut properties: BTreeMap<String, String> = BTreeMap::new();
        for pom in chain.iter().rev() {
            properties.extend(pom.properties.clone());
        }

        let group_id = first_value(chain, |pom| pom.group_id.clone())
            .or_else(|| own.parent.as_ref().map(|p| p.group_id.clone()))
            .ok_or_else(|| invalid("no groupId in descriptor or parents".to_string()))?;
        let artifact_id = own
            .artifact_id
            .clone()
            .ok_or_else(|| invalid("no artifactId in descriptor".to_string()))?;
        let version = first_value(chain, |pom| pom.version.clone())
            .or_else(|| own.parent.as_ref().map(|p| p.version.clone()))
            .ok_or_else(|| invalid("no version in descriptor or parents".to_string()))?;

        for (name, value) in [
            ("project.groupId", group_id.clone()),
            ("pom.groupId", group_id.clone()),
            ("project.artifactId", artifact_id.clone()),
            ("pom.artifactId", artifact_id.clone()),
            ("project.version", version.clone()),
            ("pom.version", version.clone()),
        ] {
            properties.entry(name.to_string()).or_insert(value);
        }
        if let Some(parent) = &own.parent {
            properties
                .entry("project.parent.version".to_string())
                .or_insert_with(|| parent.version.clone());
        }

        // Own dependencies first, then inherited ones; the nearest
        // declaration of a (group, artifact, classifier) wins.
        let mut dependencies: Vec<PomDependency> = Vec::new();
        for pom in chain {
            for dep in &pom.dependencies {
                let dep = expand_dependency(dep, &properties);
                let duplicate = dependencies.iter().any(|existing| {
                    existing.group_id == dep.group_id
                        && existing.artifact_id == dep.artifact_id
                        && existing.classifier == dep.classifier
                });
                if !duplicate {
                    dependencies.push(dep);
                }
            }
        }

        let mut managed_versions: BTreeMap<(String, String), String> = BTreeMap::new();
        let mut managed_imports: Vec<Coordinates> = Vec::new();
        for pom in chain {
            for dep in &pom.dependency_management {
                let dep = expand_dependency(dep, &properties);
                let Some(version) = dep.version.clone() else {
                    continue;
                };
                if dep.scope.as_deref() == Some("import") {
                    managed_imports.push(Coordinates::new(dep.group_id, dep.artifact_id, version));
                } else {
                    managed_versions.entry(dep.key()).or_insert(version);
                }
            }
        }

        Ok(Self {
            coordinates: Coordinates::new(group_id, artifact_id, version),
            packaging: own.packaging.clone().unwrap_or_else(|| "jar".to_string()),
            dependencies,
            managed_versions,
            managed_imports,
        })
    }
}

fn first_value<T>(chain: &[Arc<RawPom>], get: impl Fn(&RawPom) -> Option<T>) -> Option<T> {
    chain.iter().find_map(|pom| get(pom))
}

fn expand_dependency(dep: &PomDependency, properties: &BTreeMap<String, String>) -> PomDependency {
    let expand = |value: &str| expand_properties(value, properties);
    PomDependency {
        group_id: expand(&dep.group_id),
        artifact_id: expand(&dep.artifact_id),
        version: dep.version.as_ref().map(|v| expand(v)),
        classifier: dep.classifier.as_ref().map(|c| expand(c)),
        extension: dep.extension.clone(),
        scope: dep.scope.clone(),
        optional: dep.optional,
        exclusions: dep.exclusions.clone(),
    }
}

/// Expand `${name}` placeholders from the property map. Unknown
/// placeholders stay as written so the failure is visible downstream.
#[must_use]
pub fn expand_properties(input: &str, properties: &BTreeMap<String, String>) -> String {
    let mut value = input.to_string();
    for _ in 0..MAX_PROPERTY_DEPTH {
        if !value.contains("${") {
            break;
        }
        let mut result = String::with_capacity(value.len());
        let mut chars = value.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch == '$' && chars.peek() == Some(&'{') {
                chars.next();
                let mut name = String::new();
                for ch in chars.by_ref() {
                    if ch == '}' {
                        break;
                    }
                    name.push(ch);
                }
                match properties.get(&name) {
                    Some(resolved) => result.push_str(resolved),
                    None => {
                        result.push_str("${");
                        result.push_str(&name);
                        result.push('}');
                    }
                }
            } else {
                result.push(ch);
            }
        }
        if result == value {
            break;
        }
        value = result;
    }
    value
}
