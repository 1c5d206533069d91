//! CLI commands for skillgen: generate, resolve, the downloaders, and strip-comments.

use std::path::Path;

use crate::config::Config;
use crate::error;
use crate::fetch::HttpFetcher;
use crate::grammar::ReferenceGrammar;
use crate::plugin;
use crate::rbs_inline;
use crate::rbs_signatures;
use crate::resolver;
use crate::sorbet_rbi;
use crate::stripper;
use crate::types::ResolveSummary;

/// Copy `source` into a clean `output` and resolve its references.
///
/// # Errors
///
/// Returns errors from validation, copying, downloading, or rewriting.
pub fn generate(config: &Config, source: &Path, output: &Path) -> Result<(), error::Error> {
    let fetcher = HttpFetcher::new(config)?;
    let summary = plugin::generate(source, output, &grammar(config)?, &fetcher)?;
    eprintln!("Generated {}: {}", output.display(), summary_line(&summary));
    return Ok(());
}

/// Reference grammar for the configured hosts.
///
/// # Errors
///
/// Returns `Error::Regex` if a host produces an invalid pattern.
fn grammar(config: &Config) -> Result<ReferenceGrammar, error::Error> {
    return ReferenceGrammar::new(&config.source_host, &config.raw_host);
}

/// Download RBS core and stdlib signatures into `dest`.
///
/// # Errors
///
/// Returns fetch, extraction, or filesystem errors.
pub fn rbs(config: &Config, dest: &Path) -> Result<(), error::Error> {
    let fetcher = HttpFetcher::new(config)?;
    let count = rbs_signatures::download(config, &fetcher, dest)?;
    eprintln!("Wrote {count} RBS signatures to {}", dest.display());
    return Ok(());
}

/// Download the configured rbs-inline gems into `dest`.
///
/// # Errors
///
/// Returns fetch, extraction, or filesystem errors.
pub fn rbs_inline(config: &Config, dest: &Path) -> Result<(), error::Error> {
    let fetcher = HttpFetcher::new(config)?;
    let count = rbs_inline::download(config, &fetcher, dest)?;
    let gems = config.rbs_inline.gems.len();
    eprintln!("Wrote {count} Ruby files from {gems} gems to {}", dest.display());
    return Ok(());
}

/// Resolve references in place under `dir`.
///
/// # Errors
///
/// Returns errors from scanning, downloading, or rewriting.
pub fn resolve(config: &Config, dir: &Path) -> Result<(), error::Error> {
    let fetcher = HttpFetcher::new(config)?;
    let summary = resolver::resolve_tree(dir, &grammar(config)?, &fetcher)?;
    eprintln!("Resolved {}: {}", dir.display(), summary_line(&summary));
    return Ok(());
}

/// Download the configured Sorbet RBI gems into `dest`.
///
/// # Errors
///
/// Returns fetch, extraction, or filesystem errors.
pub fn sorbet_rbi(config: &Config, dest: &Path) -> Result<(), error::Error> {
    let fetcher = HttpFetcher::new(config)?;
    let counts = sorbet_rbi::download(config, &fetcher, dest)?;
    eprintln!("Wrote {} RBI and {} Ruby files to {}", counts.rbi, counts.rb, dest.display());
    return Ok(());
}

/// Strip comment lines from every `*.<extension>` file under `dir`.
///
/// # Errors
///
/// Returns `Error::Io` if a file cannot be read or written.
pub fn strip_comments(dir: &Path, extension: &str) -> Result<(), error::Error> {
    let count = stripper::strip_tree(dir, extension)?;
    eprintln!("Stripped comments from {count} .{extension} files in {}", dir.display());
    return Ok(());
}

/// One-line description of a resolution run.
fn summary_line(summary: &ResolveSummary) -> String {
    return format!(
        "{} references in {} of {} markdown files",
        summary.references, summary.files_updated, summary.files_scanned
    );
}
