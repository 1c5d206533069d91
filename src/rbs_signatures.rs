//! RBS core and stdlib signatures from the RBS repository.

use std::path::Path;

use regex::Regex;

use crate::archive::{self, Extractor};
use crate::config::{Config, RepoSource};
use crate::error::Error;
use crate::fetch::Fetch;
use crate::structure;

/// Top-level folders of the RBS repository that are kept.
const KEPT_ROOTS: [&str; 2] = ["core/", "stdlib/"];

/// Download `core/` and `stdlib/` signatures into a fresh `dest` and index them.
/// Returns the number of signature files written.
///
/// # Errors
///
/// Returns fetch, extraction, or filesystem errors.
pub fn download(config: &Config, fetcher: &dyn Fetch, dest: &Path) -> Result<usize, Error> {
    let RepoSource { branch, repo } = &config.rbs;
    tracing::info!(%repo, dest = %dest.display(), "Downloading RBS signatures");

    archive::reset_dir(dest)?;
    let tarball = archive::fetch_tarball(fetcher, &config.source_host, repo, branch)?;

    let version_folder = Regex::new(r"^(stdlib/[^/]+)/\d+/")?;
    let written = Extractor::default().extract(&tarball, dest, |path| {
        return select_signature(path, &version_folder);
    })?;
    tracing::info!(count = written.len(), "Extracted RBS files");

    write_indexes(dest, repo, &config.source_host)?;
    return Ok(written.len());
}

/// Map a root-relative archive path to its destination, if it is a kept signature.
///
/// Stdlib signatures live under a numeric version folder
/// (`stdlib/json/0/json.rbs`), which is dropped.
fn select_signature(path: &str, version_folder: &Regex) -> Option<String> {
    let is_signature = path.ends_with(".rbs");
    if !is_signature || !KEPT_ROOTS.iter().any(|root| return path.starts_with(root)) {
        return None;
    }
    return Some(version_folder.replace(path, "$1/").into_owned());
}

/// Write the root, `core/`, and `stdlib/` indexes.
///
/// # Errors
///
/// Returns `Error::Io` if a listing or write fails.
fn write_indexes(dest: &Path, repo: &str, source_host: &str) -> Result<(), Error> {
    structure::write_index(dest, &structure::rbs_root_index(repo, source_host))?;

    let core = dest.join("core");
    let files = structure::list_files(&core, "rbs")?;
    structure::write_index(&core, &structure::rbs_core_index(&files))?;

    let stdlib = dest.join("stdlib");
    let dirs = structure::list_directories(&stdlib)?;
    structure::write_index(&stdlib, &structure::rbs_stdlib_index(&dirs))?;

    return Ok(());
}
