//! `.netrc` parsing for per-host repository credentials.
//!
//! Supports the classic token stream (`machine`, `login`, `password`,
//! `default`) in both multi-line and single-line form. The `NETRC`
//! environment variable overrides the file location.

use std::collections::HashMap;
use std::path::PathBuf;

/// Environment variable overriding the netrc location.
pub const NETRC_ENV: &str = "NETRC";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Host-to-credentials mapping with an optional `default` fallback.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    hosts: HashMap<String, Credentials>,
    fallback: Option<Credentials>,
}

impl CredentialStore {
    /// Credentials for a host, falling back to the `default` entry.
    #[must_use]
    pub fn for_host(&self, host: &str) -> Option<&Credentials> {
        self.hosts.get(host).or(self.fallback.as_ref())
    }

    /// Insert credentials for a host. The first entry for a host wins.
    pub fn insert(&mut self, host: impl Into<String>, credentials: Credentials) {
        self.hosts.entry(host.into()).or_insert(credentials);
    }

    /// Merge another store in; existing entries keep priority.
    pub fn merge(&mut self, other: &CredentialStore) {
        for (host, credentials) in &other.hosts {
            self.hosts
                .entry(host.clone())
                .or_insert_with(|| credentials.clone());
        }
        if self.fallback.is_none() {
            self.fallback.clone_from(&other.fallback);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty() && self.fallback.is_none()
    }
}

/// Parse netrc content. Unknown tokens are skipped; entries without a
/// login and password are dropped; the first entry for a machine wins.
#[must_use]
pub fn parse_netrc(content: &str) -> CredentialStore {
    let stripped: String = content
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");

    let mut store = CredentialStore::default();
    // (host, login, password); host None means the `default` entry
    let mut current: Option<(Option<String>, String, String)> = None;
    let mut tokens = stripped.split_whitespace();
    while let Some(token) = tokens.next() {
        match token {
            "machine" => {
                commit(&mut store, current.take());
                current = tokens
                    .next()
                    .map(|host| (Some(host.to_string()), String::new(), String::new()));
            }
            "default" => {
                commit(&mut store, current.take());
                current = Some((None, String::new(), String::new()));
            }
            "login" => {
                if let (Some(entry), Some(value)) = (current.as_mut(), tokens.next()) {
                    entry.1 = value.to_string();
                }
            }
            "password" => {
                if let (Some(entry), Some(value)) = (current.as_mut(), tokens.next()) {
                    entry.2 = value.to_string();
                }
            }
            "account" => {
                tokens.next();
            }
            _ => {}
        }
    }
    commit(&mut store, current.take());
    store
}

fn commit(store: &mut CredentialStore, entry: Option<(Option<String>, String, String)>) {
    let Some((host, login, password)) = entry else {
        return;
    };
    if login.is_empty() && password.is_empty() {
        return;
    }
    let credentials = Credentials {
        username: login,
        password,
    };
    match host {
        Some(host) => store.insert(host, credentials),
        None => {
            if store.fallback.is_none() {
                store.fallback = Some(credentials);
            }
        }
    }
}

/// Load credentials from the user's netrc, or an empty store when none
/// exists or it cannot be read.
#[must_use]
pub fn load() -> CredentialStore {
    netrc_path()
        .and_then(|path| pinion_util::fs::read_to_string_lossy(&path).ok())
        .map(|content| parse_netrc(&content))
        .unwrap_or_default()
}

fn netrc_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(NETRC_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    dirs_next::home_dir().map(|home| home.join(".netrc"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_multi_line() {
        let store = parse_netrc(
            "machine repo.example.com\nlogin alice\npassword s3cret\n\nmachine other.example.com\nlogin bob\npassword hunter2\n",
        );
        let creds = store.for_host("repo.example.com").unwrap();
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.password, "s3cret");
        assert_eq!(store.for_host("other.example.com").unwrap().username, "bob");
    }

    #[test]
    fn test_parse_single_line() {
        let store =
            parse_netrc("machine repo.example.com login alice password s3cret");
        assert_eq!(store.for_host("repo.example.com").unwrap().password, "s3cret");
    }

    #[test]
    fn test_default_entry_is_fallback() {
        let store = parse_netrc(
            "machine repo.example.com login alice password a\ndefault login anon password anon123\n",
        );
        assert_eq!(store.for_host("repo.example.com").unwrap().username, "alice");
        assert_eq!(store.for_host("unknown.example.com").unwrap().username, "anon");
    }

    #[test]
    fn test_first_machine_entry_wins() {
        let store = parse_netrc(
            "machine repo.example.com login first password one\nmachine repo.example.com login second password two\n",
        );
        assert_eq!(store.for_host("repo.example.com").unwrap().username, "first");
    }

    #[test]
    fn test_comments_are_ignored() {
        let store = parse_netrc(
            "# machine commented.example.com login x password y\nmachine repo.example.com login alice password s3cret\n",
        );
        assert!(store.for_host("commented.example.com").is_none());
        assert!(store.for_host("repo.example.com").is_some());
    }

    #[test]
    fn test_incomplete_entries_are_dropped() {
        let store = parse_netrc("machine repo.example.com\nmachine other.example.com login bob password pw\n");
        assert!(store.for_host("repo.example.com").is_none());
        assert!(store.for_host("other.example.com").is_some());
    }

    #[test]
    fn test_merge_keeps_existing_entries() {
        let mut first = parse_netrc("machine repo.example.com login a password 1");
        let second = parse_netrc(
            "machine repo.example.com login b password 2\nmachine new.example.com login c password 3",
        );
        first.merge(&second);
        assert_eq!(first.for_host("repo.example.com").unwrap().username, "a");
        assert_eq!(first.for_host("new.example.com").unwrap().username, "c");
    }

    #[test]
    #[serial]
    fn test_load_honors_netrc_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom-netrc");
        std::fs::write(&path, "machine env.example.com login env password fromenv").unwrap();
        std::env::set_var(NETRC_ENV, &path);
        let store = load();
        std::env::remove_var(NETRC_ENV);
        assert_eq!(store.for_host("env.example.com").unwrap().username, "env");
    }

    #[test]
    #[serial]
    fn test_load_with_missing_file_is_empty() {
        std::env::set_var(NETRC_ENV, "/nonexistent/netrc");
        let store = load();
        std::env::remove_var(NETRC_ENV);
        assert!(store.is_empty());
    }
}
