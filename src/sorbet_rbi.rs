//! RBI files, and optionally Ruby sources, from gems that ship Sorbet types.

use std::path::{Path, PathBuf};

use crate::archive::{self, Extractor};
use crate::config::{Config, RbiGem};
use crate::error::Error;
use crate::fetch::Fetch;
use crate::structure;

/// Destination subfolder for extracted `.rb` files.
const LIB_DIR: &str = "lib";

/// Destination subfolder for extracted `.rbi` files.
const RBI_DIR: &str = "rbi";

/// Per-gem extraction counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GemCounts {
    /// Ruby source files written under `lib/`.
    pub rb: usize,
    /// RBI files written under `rbi/`.
    pub rbi: usize,
}

/// Count written paths by destination subfolder.
fn count_by_kind(written: &[PathBuf]) -> GemCounts {
    let mut counts = GemCounts::default();
    for path in written {
        if path.starts_with(RBI_DIR) {
            counts.rbi = counts.rbi.saturating_add(1);
        } else if path.starts_with(LIB_DIR) {
            counts.rb = counts.rb.saturating_add(1);
        }
    }
    return counts;
}

/// Download every configured gem into `<dest>/<name>` and write the index.
/// Returns the combined counts.
///
/// # Errors
///
/// Returns fetch, extraction, or filesystem errors from the first failing gem.
pub fn download(config: &Config, fetcher: &dyn Fetch, dest: &Path) -> Result<GemCounts, Error> {
    tracing::info!(dest = %dest.display(), "Downloading Sorbet RBI examples");
    std::fs::create_dir_all(dest)?;

    let extractor = Extractor {
        max_entry_bytes: Some(config.sorbet_rbi.max_entry_bytes),
    };
    let mut total = GemCounts::default();
    for gem in &config.sorbet_rbi.gems {
        let counts = download_gem(gem, config, &extractor, fetcher, dest)?;
        total.rb = total.rb.saturating_add(counts.rb);
        total.rbi = total.rbi.saturating_add(counts.rbi);
    }

    structure::write_index(dest, structure::sorbet_rbi_index())?;
    return Ok(total);
}

/// Replace `<dest>/<name>` with the gem's RBI and Ruby files.
///
/// # Errors
///
/// Returns fetch, extraction, or filesystem errors.
fn download_gem(
    gem: &RbiGem,
    config: &Config,
    extractor: &Extractor,
    fetcher: &dyn Fetch,
    dest: &Path,
) -> Result<GemCounts, Error> {
    tracing::info!(gem = %gem.name, repo = %gem.repo, "Downloading gem");

    let gem_dest = dest.join(&gem.name);
    archive::reset_dir(&gem_dest)?;
    let tarball = archive::fetch_tarball(fetcher, &config.source_host, &gem.repo, &gem.branch)?;

    let written = extractor.extract(&tarball, &gem_dest, |path| return select_entry(gem, path))?;
    let counts = count_by_kind(&written);

    tracing::info!(gem = %gem.name, rbi = counts.rbi, rb = counts.rb, "Extracted");
    return Ok(counts);
}

/// Route `.rbi` files under `rbi_path` to `rbi/` and `.rb` files under
/// `lib_path` to `lib/`.
fn select_entry(gem: &RbiGem, path: &str) -> Option<String> {
    if path.ends_with(".rbi") {
        let rest = archive::strip_source_path(path, &gem.rbi_path)?;
        return Some(format!("{RBI_DIR}/{rest}"));
    }
    if path.ends_with(".rb") {
        let lib_path = gem.lib_path.as_deref()?;
        let rest = archive::strip_source_path(path, lib_path)?;
        return Some(format!("{LIB_DIR}/{rest}"));
    }
    return None;
}
