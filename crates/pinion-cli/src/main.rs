#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]

//! `pinion` binary: resolve Maven coordinates into a pinned lock file.

mod argsfile;
mod events;
mod logging;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use pinion_core::config::Settings;
use pinion_core::events::{Event, EventSink, Phase};
use pinion_core::netrc;
use pinion_core::request::DEFAULT_REPOSITORY;
use pinion_core::resolve::{self, ResolveOptions, DEFAULT_MAX_THREADS};
use pinion_core::transport::HttpTransport;
use pinion_core::{
    Artifact, CachePolicy, Exclusion, Lockfile, ResolutionRequest, ResolveError, TransportError,
};
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "pinion")]
#[command(author, version, about = "Resolve Maven coordinates into a pinned lock file", long_about = None)]
struct Cli {
    /// Repository URI to resolve against (repeatable, order-significant)
    #[arg(long = "repository", value_name = "URI")]
    repositories: Vec<String>,

    /// Bill-of-materials coordinates pinning transitive versions
    /// (repeatable; the first BOM to pin a group:artifact wins)
    #[arg(long = "bom", value_name = "COORDS")]
    boms: Vec<String>,

    /// Exclude a group:artifact from every dependency (either side may be `*`)
    #[arg(long = "exclude", value_name = "GROUP:ARTIFACT")]
    exclusions: Vec<String>,

    /// Resolution backend
    #[arg(long, value_name = "NAME", default_value = "maven")]
    resolver: String,

    /// Also fetch -sources jars for every resolved artifact
    #[arg(long)]
    sources: bool,

    /// Also fetch -javadoc jars for every resolved artifact
    #[arg(long)]
    javadocs: bool,

    /// Download pool width
    #[arg(long = "max-threads", value_name = "N")]
    max_threads: Option<usize>,

    /// Reuse the shared user-level artifact cache across runs
    #[arg(long = "use_unsafe_shared_cache")]
    use_unsafe_shared_cache: bool,

    /// Write the lock file here instead of stdout
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Read additional command-line tokens from a file, one per line
    /// (expanded in place before parsing)
    #[arg(long, value_name = "PATH")]
    argsfile: Option<PathBuf>,

    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Coordinates to resolve, each optionally suffixed with
    /// `,excluded-group:excluded-artifact` pairs
    #[arg(required = true, value_name = "COORDS")]
    artifacts: Vec<String>,
}

fn main() -> Result<()> {
    // Argsfiles are expanded before clap sees the command line, so the
    // `--argsfile` field above only ever serves the help text.
    let args = argsfile::expand(std::env::args().collect()).into_diagnostic()?;
    let cli = Cli::parse_from(args);
    let settings = Settings::from_env();

    let verbosity = if cli.verbose == 0 && settings.verbose {
        1
    } else {
        cli.verbose
    };
    logging::init(verbosity);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;
    runtime.block_on(run(cli, settings)).into_diagnostic()?;
    Ok(())
}

async fn run(cli: Cli, settings: Settings) -> Result<(), ResolveError> {
    let request = build_request(&cli, &settings)?;
    let options = ResolveOptions {
        max_threads: cli
            .max_threads
            .or(settings.max_threads)
            .unwrap_or(DEFAULT_MAX_THREADS),
        fetch_sources: cli.sources,
        fetch_javadocs: cli.javadocs,
        assume_present: settings.assume_present,
    };

    let transport = Arc::new(HttpTransport::new(request.repositories(), netrc::load())?);
    let sink: Arc<dyn EventSink> = Arc::new(events::LogSink);
    let resolver = pinion_core::resolver_for(&cli.resolver, Arc::clone(&transport), Arc::clone(&sink))?;

    let output = resolve::run(&request, resolver.as_ref(), &options, transport, Arc::clone(&sink)).await?;

    sink.emit(Event::PhaseStarted(Phase::Lock));
    let lockfile = Lockfile::render(
        request.repositories(),
        &output.infos,
        &output.conflicts,
        &output.skipped,
    );
    let rendered = lockfile.to_json();
    match &cli.output {
        Some(path) => pinion_util::fs::atomic_write(path, rendered.as_bytes())?,
        None => print!("{rendered}"),
    }
    sink.emit(Event::PhaseFinished(Phase::Lock));
    Ok(())
}

fn build_request(cli: &Cli, settings: &Settings) -> Result<ResolutionRequest, ResolveError> {
    let mut request = ResolutionRequest::new();

    let repositories: Vec<&str> = if cli.repositories.is_empty() {
        vec![DEFAULT_REPOSITORY]
    } else {
        cli.repositories.iter().map(String::as_str).collect()
    };
    for repository in repositories {
        request = request.with_repository(parse_repository(repository)?);
    }
    for artifact in &cli.artifacts {
        request = request.with_artifact(Artifact::parse(artifact)?);
    }
    for bom in &cli.boms {
        request = request.with_bom(Artifact::parse(bom)?);
    }
    for exclusion in &cli.exclusions {
        request = request.with_global_exclusion(Exclusion::parse(exclusion)?);
    }

    let cache = if cli.use_unsafe_shared_cache || settings.shared_cache {
        CachePolicy::SharedUserCache
    } else {
        CachePolicy::EphemeralPerRun
    };
    Ok(request.with_cache_policy(cache))
}

fn parse_repository(input: &str) -> Result<Url, ResolveError> {
    let url = Url::parse(input).map_err(|e| TransportError::InvalidUrl {
        url: input.to_string(),
        reason: e.to_string(),
    })?;
    Ok(url)
}
