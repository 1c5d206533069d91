//! Ruby sources of gems annotated with rbs-inline.

use std::path::Path;

use crate::archive::{self, Extractor};
use crate::config::{Config, InlineGem};
use crate::error::Error;
use crate::fetch::Fetch;
use crate::structure;

/// Download every configured gem into `<dest>/<name>` and write the index.
/// Returns the total number of Ruby files written.
///
/// # Errors
///
/// Returns fetch, extraction, or filesystem errors from the first failing gem.
pub fn download(config: &Config, fetcher: &dyn Fetch, dest: &Path) -> Result<usize, Error> {
    tracing::info!(dest = %dest.display(), "Downloading rbs-inline examples");
    std::fs::create_dir_all(dest)?;

    let mut total = 0_usize;
    for gem in &config.rbs_inline.gems {
        total = total.saturating_add(download_gem(gem, config, fetcher, dest)?);
    }

    let index = structure::rbs_inline_index(&config.rbs_inline.gems, &config.source_host);
    structure::write_index(dest, &index)?;
    return Ok(total);
}

/// Replace `<dest>/<name>` with the gem's `lib_path` Ruby files.
///
/// # Errors
///
/// Returns fetch, extraction, or filesystem errors.
fn download_gem(gem: &InlineGem, config: &Config, fetcher: &dyn Fetch, dest: &Path) -> Result<usize, Error> {
    tracing::info!(gem = %gem.name, repo = %gem.repo, "Downloading gem");

    let gem_dest = dest.join(&gem.name);
    archive::reset_dir(&gem_dest)?;
    let tarball = archive::fetch_tarball(fetcher, &config.source_host, &gem.repo, &gem.branch)?;

    let written = Extractor::default().extract(&tarball, &gem_dest, |path| {
        if !path.ends_with(".rb") {
            return None;
        }
        return archive::strip_source_path(path, &gem.lib_path).map(String::from);
    })?;

    tracing::info!(gem = %gem.name, count = written.len(), "Done");
    return Ok(written.len());
}
