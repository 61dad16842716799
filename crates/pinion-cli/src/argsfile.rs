//! Batch-configuration file expansion.
//!
//! An argsfile holds one command-line token per line; `#` starts a
//! comment and blank lines are skipped. `--argsfile <path>` occurrences
//! are replaced in place with the file's tokens before clap parsing.
//! Expansion is a single pass; an argsfile cannot pull in another one.

use std::io;
use std::path::Path;

/// Replace every `--argsfile <path>` (or `--argsfile=<path>`) in `args`
/// with the tokens read from that file.
pub fn expand(args: Vec<String>) -> io::Result<Vec<String>> {
    let mut expanded = Vec::with_capacity(args.len());
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if arg == "--argsfile" {
            let path = iter.next().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "--argsfile requires a path")
            })?;
            expanded.extend(read_tokens(Path::new(&path))?);
        } else if let Some(path) = arg.strip_prefix("--argsfile=") {
            expanded.extend(read_tokens(Path::new(path))?);
        } else {
            expanded.push(arg);
        }
    }
    Ok(expanded)
}

fn read_tokens(path: &Path) -> io::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}
