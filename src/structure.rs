//! `STRUCTURE.md` index files describing downloaded example trees.

use std::path::Path;

use crate::config::InlineGem;
use crate::error::Error;

/// File name of every generated index.
pub const STRUCTURE_FILE: &str = "STRUCTURE.md";

/// Fixed index for the Sorbet RBI examples.
const SORBET_RBI_TEMPLATE: &str = include_str!("../templates/sorbet_rbi_structure.md");

/// Render a markdown bullet list, one `- ` line per item, joined by newlines.
fn bullets<I>(items: I) -> String
where
    I: IntoIterator<Item = String>,
{
    return items.into_iter().map(|item| return format!("- {item}")).collect::<Vec<_>>().join("\n");
}

/// Sorted names of entries directly under `dir` accepted by `keep`.
///
/// # Errors
///
/// Returns `Error::Io` if the directory exists but cannot be read.
fn list_children<F>(dir: &Path, keep: F) -> Result<Vec<String>, Error>
where
    F: Fn(&Path) -> bool,
{
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if keep(&entry.path()) {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    return Ok(names);
}

/// Sorted names of directories directly under `dir`.
/// A missing directory lists nothing.
///
/// # Errors
///
/// Returns `Error::Io` if the directory exists but cannot be read.
pub fn list_directories(dir: &Path) -> Result<Vec<String>, Error> {
    return list_children(dir, Path::is_dir);
}

/// Sorted names of regular files directly under `dir` with `extension`.
/// A missing directory lists nothing.
///
/// # Errors
///
/// Returns `Error::Io` if the directory exists but cannot be read.
pub fn list_files(dir: &Path, extension: &str) -> Result<Vec<String>, Error> {
    return list_children(dir, |path| {
        return path.is_file() && path.extension().is_some_and(|ext| return ext == extension);
    });
}

/// Content of the RBS `core/` index.
pub fn rbs_core_index(files: &[String]) -> String {
    let list = bullets(files.iter().map(|f| return format!("[{f}]({f})")));
    return format!(
        "# Core RBS Signatures\n\n\
         Type signatures for Ruby built-in classes and modules.\n\n\
         {list}\n"
    );
}

/// Content of the rbs-inline examples index.
pub fn rbs_inline_index(gems: &[InlineGem], source_host: &str) -> String {
    let list = bullets(gems.iter().map(|gem| {
        return format!("[{name}/]({name}/) - https://{source_host}/{repo}", name = gem.name, repo = gem.repo);
    }));
    return format!(
        "# RBS-Inline Examples\n\n\
         Ruby gems that use rbs-inline type annotations as real-world references.\n\n\
         {list}\n"
    );
}

/// Content of the RBS root index.
pub fn rbs_root_index(repo: &str, source_host: &str) -> String {
    return format!(
        "# RBS Examples\n\n\
         RBS type signatures from [{repo}](https://{source_host}/{repo}) repository.\n\n\
         - [core/](core/STRUCTURE.md) - Ruby core library signatures\n\
         - [stdlib/](stdlib/STRUCTURE.md) - Ruby standard library signatures\n"
    );
}

/// Content of the RBS `stdlib/` index.
pub fn rbs_stdlib_index(dirs: &[String]) -> String {
    let list = bullets(dirs.iter().map(|d| return format!("[{d}/]({d}/)")));
    return format!(
        "# Stdlib RBS Signatures\n\n\
         Type signatures for Ruby standard library.\n\n\
         {list}\n"
    );
}

/// Content of the Sorbet RBI index.
pub const fn sorbet_rbi_index() -> &'static str {
    return SORBET_RBI_TEMPLATE;
}

/// Write `content` to `<dir>/STRUCTURE.md`, creating `dir` if needed.
///
/// # Errors
///
/// Returns `Error::Io` if the directory or file cannot be written.
pub fn write_index(dir: &Path, content: &str) -> Result<(), Error> {
    std::fs::create_dir_all(dir)?;
    std::fs::write(dir.join(STRUCTURE_FILE), content)?;
    return Ok(());
}
