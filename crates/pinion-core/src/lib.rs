#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Core resolution library for pinion.
//!
//! Turns a set of Maven coordinates plus an ordered list of repositories
//! into a deterministic, conflict-resolved dependency graph, downloads the
//! resolved artifacts, and renders a pinned lock document.

pub mod config;
pub mod coords;
pub mod download;
pub mod error;
pub mod events;
pub mod graph;
pub mod index;
pub mod lockfile;
pub mod netrc;
pub mod paths;
pub mod pom;
pub mod reconcile;
pub mod request;
pub mod resolve;
pub mod resolver;
pub mod transport;
pub mod version;

pub use coords::Coordinates;
pub use error::{ResolveError, TransportError};
pub use graph::DependencyGraph;
pub use lockfile::Lockfile;
pub use reconcile::Conflict;
pub use request::{Artifact, CachePolicy, Exclusion, ResolutionRequest};
pub use resolve::{DependencyInfo, ResolutionOutput, ResolveOptions};
pub use resolver::{resolver_for, ResolutionResult, Resolver};
