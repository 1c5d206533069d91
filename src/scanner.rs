use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::error::Error;

/// Collect every file under `root` with the given extension, in sorted
/// traversal order. Hidden files and directories are skipped.
///
/// The list is gathered up front so files created while processing it are
/// never picked up by the same run.
///
/// # Errors
///
/// Returns `Error::Io` if a directory cannot be read.
pub fn files_with_extension(root: &Path, extension: &str) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| return e.depth() == 0 || !is_hidden(e))
    {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| return ext == extension)
        {
            files.push(entry.into_path());
        }
    }

    return Ok(files);
}

/// Whether a walk entry's name starts with a dot.
fn is_hidden(entry: &DirEntry) -> bool {
    return entry.file_name().to_str().is_some_and(|name| return name.starts_with('.'));
}

/// Collect all markdown files under `root`. See `files_with_extension`.
///
/// # Errors
///
/// Returns `Error::Io` if a directory cannot be read.
pub fn markdown_files(root: &Path) -> Result<Vec<PathBuf>, Error> {
    return files_with_extension(root, "md");
}
