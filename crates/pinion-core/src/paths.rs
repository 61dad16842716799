//! Cache and repository directory locations.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::path::PathBuf;

/// Layout version segment for the shared cache. Bump when the on-disk
/// layout changes incompatibly.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

/// Shared user-level artifact cache, reused across runs.
///
/// Resolves to `<platform cache dir>/pinion/v1/repository`, falling back
/// to `~/.cache/pinion/...` and finally a relative directory when no home
/// is available.
#[must_use]
pub fn shared_cache_dir() -> PathBuf {
    let base = dirs_next::cache_dir().map_or_else(
        || {
            dirs_next::home_dir().map_or_else(
                || PathBuf::from(".pinion-cache"),
                |home| home.join(".cache").join("pinion"),
            )
        },
        |cache| cache.join("pinion"),
    );
    base.join(format!("v{CACHE_SCHEMA_VERSION}")).join("repository")
}

/// A fresh per-run cache directory under the system temp dir. Each call
/// returns a new path; nothing is created.
#[must_use]
pub fn ephemeral_cache_dir() -> PathBuf {
    std::env::temp_dir().join(format!("pinion-{}-{:08x}", std::process::id(), rand_u32()))
}

/// The conventional local Maven repository (`~/.m2/repository`), when a
/// home directory exists.
#[must_use]
pub fn m2_local_repository() -> Option<PathBuf> {
    dirs_next::home_dir().map(|home| home.join(".m2").join("repository"))
}

// Cheap non-crypto randomness for temp dir names; avoids pulling in a
// full RNG dependency.
fn rand_u32() -> u32 {
    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u64(std::time::UNIX_EPOCH.elapsed().map_or(0, |d| d.subsec_nanos().into()));
    hasher.finish() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_cache_dir_is_versioned() {
        let dir = shared_cache_dir();
        let rendered = dir.to_string_lossy();
        assert!(rendered.contains("pinion"));
        assert!(rendered.contains("v1"));
        assert!(dir.ends_with("repository") || rendered.ends_with("repository"));
    }

    #[test]
    fn test_ephemeral_dirs_are_distinct() {
        assert_ne!(ephemeral_cache_dir(), ephemeral_cache_dir());
    }

    #[test]
    fn test_m2_local_repository_layout() {
        if let Some(dir) = m2_local_repository() {
            assert!(dir.ends_with(".m2/repository"));
        }
    }
}
