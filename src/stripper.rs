//! Comment stripping for signature files.

use std::path::Path;

use crate::error::Error;
use crate::scanner;

/// Remove comment lines, collapse blank runs, and trim blank edges.
///
/// A line is a comment when its trimmed content starts with `#`. Line
/// endings of kept lines are preserved. Applying this to its own output
/// returns the output unchanged.
pub fn strip_comments(text: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut prev_blank = false;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            continue;
        }

        let blank = trimmed.is_empty();
        if !(blank && prev_blank) {
            kept.push(line);
        }
        prev_blank = blank;
    }

    let start = kept.iter().position(|l| return !l.trim().is_empty()).unwrap_or(kept.len());
    let end = kept.iter().rposition(|l| return !l.trim().is_empty()).map_or(start, |i| return i.saturating_add(1));

    return kept.get(start..end).unwrap_or_default().concat();
}

/// Strip comments from every `*.<extension>` file under `dir`.
///
/// Files whose content does not change are not rewritten. Returns the
/// number of files processed.
///
/// # Errors
///
/// Returns `Error::Io` if a file cannot be read or written.
pub fn strip_tree(dir: &Path, extension: &str) -> Result<usize, Error> {
    let files = scanner::files_with_extension(dir, extension)?;

    for file in &files {
        let content = std::fs::read_to_string(file)?;
        let stripped = strip_comments(&content);
        if stripped != content {
            std::fs::write(file, stripped)?;
            tracing::debug!(path = %file.display(), "stripped");
        }
    }

    return Ok(files.len());
}
