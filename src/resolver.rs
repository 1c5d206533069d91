//! Reference resolution: rewrite blob URLs in markdown to local `reference/` copies.
//!
//! `rewrite` is pure. `resolve_file` and `resolve_tree` add the downloads and
//! the write-back, with all downloads of a file completing before its
//! markdown is touched.

use std::ops::Range;
use std::path::Path;

use crate::error::Error;
use crate::fetch::Fetch;
use crate::grammar::ReferenceGrammar;
use crate::scanner;
use crate::types::{Reference, ResolveSummary};

/// Marker of a directory listing URL, which is never a single file.
const DIRECTORY_MARKER: &str = "/tree/";

/// Folder created next to each markdown file to hold downloaded references.
pub const REFERENCE_DIR: &str = "reference";

/// Output of `rewrite`: the new text and the downloads it depends on, in
/// replacement order (inline links first, then bare URLs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    /// References whose local copies the new text points at.
    pub references: Vec<Reference>,
    /// Rewritten document text.
    pub text: String,
}

/// Find bare URLs in `text`: not preceded by `(` and not a directory listing.
///
/// # Errors
///
/// Returns `Error::InvalidReferenceUrl` if a candidate fails the strict grammar.
fn bare_url_pass(
    text: &str,
    grammar: &ReferenceGrammar,
    references: &mut Vec<Reference>,
) -> Result<String, Error> {
    let mut edits: Vec<(Range<usize>, String)> = Vec::new();
    let mut at = 0_usize;

    while let Some(found) = grammar.bare().find_at(text, at) {
        // A `(` right before the URL means it is a link target the link pass
        // did not claim; retry one byte later like a look-behind would.
        if text.get(..found.start()).is_some_and(|before| return before.ends_with('(')) {
            at = found.start().saturating_add(1);
            continue;
        }
        at = found.end();

        if found.as_str().contains(DIRECTORY_MARKER) {
            continue;
        }

        let reference = grammar.parse(found.as_str())?;
        edits.push((found.range(), reference.relative_path.clone()));
        references.push(reference);
    }

    return Ok(splice(text, &edits));
}

/// Replace the URL of every `[text](url)` link, keeping the link text as is.
///
/// # Errors
///
/// Returns `Error::InvalidReferenceUrl` if a link target fails the strict grammar.
fn inline_link_pass(
    text: &str,
    grammar: &ReferenceGrammar,
    references: &mut Vec<Reference>,
) -> Result<String, Error> {
    let mut edits: Vec<(Range<usize>, String)> = Vec::new();

    for caps in grammar.link().captures_iter(text) {
        let Some(url) = caps.get(2) else { continue };
        let reference = grammar.parse(url.as_str())?;
        edits.push((url.range(), reference.relative_path.clone()));
        references.push(reference);
    }

    return Ok(splice(text, &edits));
}

/// Resolve every reference in one markdown file.
///
/// Downloads run in replacement order into `<dir>/reference/<filename>`.
/// The markdown is written once, after the last download succeeded, and
/// only if at least one reference was found. Returns the number of
/// references rewritten.
///
/// # Errors
///
/// Returns `Error::Io` for read/write failures, `Error::InvalidReferenceUrl`
/// for grammar failures, or any fetch error. On error the markdown file is
/// left untouched.
pub fn resolve_file(
    md_path: &Path,
    grammar: &ReferenceGrammar,
    fetcher: &dyn Fetch,
) -> Result<usize, Error> {
    let content = std::fs::read_to_string(md_path)?;
    let rewrite = rewrite(&content, grammar)?;
    if rewrite.references.is_empty() {
        return Ok(0);
    }

    let md_dir = md_path.parent().unwrap_or_else(|| return Path::new("."));
    let reference_dir = md_dir.join(REFERENCE_DIR);
    std::fs::create_dir_all(&reference_dir)?;

    for reference in &rewrite.references {
        tracing::info!(url = %reference.raw_url, "Downloading");
        let bytes = fetcher.fetch(&reference.raw_url, false)?;

        let local_path = reference_dir.join(&reference.filename);
        std::fs::write(&local_path, bytes)?;
        tracing::info!(path = %local_path.display(), "Saved");
        tracing::info!(from = %reference.url, to = %reference.relative_path, "Replaced");
    }

    std::fs::write(md_path, &rewrite.text)?;
    tracing::info!(path = %md_path.display(), "Updated");

    return Ok(rewrite.references.len());
}

/// Resolve every markdown file under `root`, in sorted traversal order.
///
/// # Errors
///
/// Stops at the first file that fails; see `resolve_file`.
pub fn resolve_tree(
    root: &Path,
    grammar: &ReferenceGrammar,
    fetcher: &dyn Fetch,
) -> Result<ResolveSummary, Error> {
    let files = scanner::markdown_files(root)?;
    let mut summary = ResolveSummary {
        files_scanned: files.len(),
        ..ResolveSummary::default()
    };

    for md_path in &files {
        let count = resolve_file(md_path, grammar, fetcher)?;
        if count > 0 {
            summary.files_updated = summary.files_updated.saturating_add(1);
            summary.references = summary.references.saturating_add(count);
        }
    }

    return Ok(summary);
}

/// Rewrite all blob references in `text` to their local relative paths.
///
/// Inline links are handled first, replacing only the URL. The bare URL
/// pass then runs over that result. Rewritten text contains no blob URLs
/// for the replaced references, so rewriting it again is a no-op.
///
/// # Errors
///
/// Returns `Error::InvalidReferenceUrl` if a candidate fails the strict grammar.
pub fn rewrite(text: &str, grammar: &ReferenceGrammar) -> Result<Rewrite, Error> {
    let mut references = Vec::new();
    let linked = inline_link_pass(text, grammar, &mut references)?;
    let text = bare_url_pass(&linked, grammar, &mut references)?;
    return Ok(Rewrite { references, text });
}

/// Apply non-overlapping, ascending byte-range replacements to `text`.
fn splice(text: &str, edits: &[(Range<usize>, String)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0_usize;

    for (range, replacement) in edits {
        out.push_str(text.get(cursor..range.start).unwrap_or_default());
        out.push_str(replacement);
        cursor = range.end;
    }
    out.push_str(text.get(cursor..).unwrap_or_default());

    return out;
}
