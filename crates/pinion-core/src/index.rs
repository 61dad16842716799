//! Jar content indexing: Java packages and `META-INF/services` bindings.
//!
//! Indexing is advisory. Callers treat a failed index as an empty one and
//! keep resolving; a broken archive must never fail the run.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JarIndex {
    /// Java package names derived from `.class` entry paths.
    pub packages: BTreeSet<String>,
    /// Service interface to implementation list, from
    /// `META-INF/services/` files.
    pub services: BTreeMap<String, Vec<String>>,
}

/// Index the classes and service bindings in a jar.
pub fn index_jar(path: &Path) -> io::Result<JarIndex> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(io::Error::other)?;
    let names: Vec<String> = archive.file_names().map(str::to_string).collect();

    let mut index = JarIndex::default();
    for name in &names {
        if name.starts_with("META-INF/") {
            continue;
        }
        if let Some(class_path) = name.strip_suffix(".class") {
            // Root-package classes carry no package information.
            if let Some((dir, _)) = class_path.rsplit_once('/') {
                index.packages.insert(dir.replace('/', "."));
            }
        }
    }

    for name in names {
        let Some(service) = name.strip_prefix("META-INF/services/") else {
            continue;
        };
        if service.is_empty() || service.ends_with('/') {
            continue;
        }
        let Ok(mut entry) = archive.by_name(&name) else {
            continue;
        };
        let mut content = String::new();
        if entry.read_to_string(&mut content).is_err() {
            continue;
        }
        let implementations: Vec<String> = content
            .lines()
            .map(|line| line.split('#').next().unwrap_or_default().trim())
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        if !implementations.is_empty() {
            index.services.insert(service.to_string(), implementations);
        }
    }

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_jar(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_packages_from_class_entries() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("lib.jar");
        write_jar(
            &jar,
            &[
                ("com/example/util/Strings.class", ""),
                ("com/example/util/Strings$Inner.class", ""),
                ("com/example/net/Client.class", ""),
                ("com/example/net/package-info.class", ""),
                ("RootClass.class", ""),
                ("com/example/data.properties", "k=v"),
            ],
        );
        let index = index_jar(&jar).unwrap();
        let packages: Vec<&str> = index.packages.iter().map(String::as_str).collect();
        assert_eq!(packages, vec!["com.example.net", "com.example.util"]);
    }

    #[test]
    fn test_meta_inf_classes_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("lib.jar");
        write_jar(
            &jar,
            &[("META-INF/versions/9/com/example/Mod.class", "")],
        );
        let index = index_jar(&jar).unwrap();
        assert!(index.packages.is_empty());
    }

    #[test]
    fn test_services_parse_with_comments() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("lib.jar");
        write_jar(
            &jar,
            &[(
                "META-INF/services/com.example.spi.Codec",
                "# default codecs\ncom.example.codec.Json # bundled\n\ncom.example.codec.Cbor\n",
            )],
        );
        let index = index_jar(&jar).unwrap();
        assert_eq!(
            index.services.get("com.example.spi.Codec").unwrap(),
            &vec![
                "com.example.codec.Json".to_string(),
                "com.example.codec.Cbor".to_string()
            ]
        );
    }

    #[test]
    fn test_empty_service_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("lib.jar");
        write_jar(&jar, &[("META-INF/services/com.example.spi.Empty", "# none\n")]);
        let index = index_jar(&jar).unwrap();
        assert!(index.services.is_empty());
    }

    #[test]
    fn test_invalid_archive_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_jar = dir.path().join("broken.jar");
        std::fs::write(&not_a_jar, b"definitely not a zip").unwrap();
        assert!(index_jar(&not_a_jar).is_err());
    }
}
