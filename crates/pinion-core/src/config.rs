//! Environment-driven settings.
//!
//! Every toggle here also has a command-line flag; the environment values
//! act as defaults so CI wrappers can configure runs without editing
//! invocations.

/// Force verbose logging, as if `-v` were passed.
pub const VERBOSE_ENV: &str = "PINION_VERBOSE";
/// Default download pool size.
pub const MAX_THREADS_ENV: &str = "PINION_MAX_THREADS";
/// Reuse the shared user-level cache across runs.
pub const SHARED_CACHE_ENV: &str = "PINION_SHARED_CACHE";
/// Skip provenance checks for cached artifacts and credit the first
/// configured repository.
pub const ASSUME_PRESENT_ENV: &str = "PINION_ASSUME_PRESENT";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub verbose: bool,
    pub max_threads: Option<usize>,
    pub shared_cache: bool,
    pub assume_present: bool,
}

impl Settings {
    /// Read settings from the process environment. Unset or unparsable
    /// values fall back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            verbose: env_flag(VERBOSE_ENV),
            max_threads: std::env::var(MAX_THREADS_ENV)
                .ok()
                .and_then(|v| v.trim().parse().ok()),
            shared_cache: env_flag(SHARED_CACHE_ENV),
            assume_present: env_flag(ASSUME_PRESENT_ENV),
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).map_or(false, |v| is_truthy(&v))
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}
