//! Plugin generation: copy a skills tree into a fresh output and resolve it.

use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::archive;
use crate::error::Error;
use crate::fetch::Fetch;
use crate::grammar::ReferenceGrammar;
use crate::resolver;
use crate::types::ResolveSummary;

/// Absolute form of `path` with symlinks and `..` resolved, even when the
/// tail of `path` does not exist yet.
///
/// The deepest existing ancestor is canonicalized and the missing
/// components are applied lexically on top of it.
///
/// # Errors
///
/// Returns `Error::Io` if the current directory cannot be read.
fn absolute(path: &Path) -> Result<PathBuf, Error> {
    let absolute = std::path::absolute(path)?;
    let components: Vec<Component<'_>> = absolute.components().collect();

    for split in (1..=components.len()).rev() {
        let (Some(head), Some(tail)) = (components.get(..split), components.get(split..)) else { continue };
        let Ok(mut resolved) = head.iter().collect::<PathBuf>().canonicalize() else { continue };
        for component in tail {
            match component {
                Component::Normal(name) => resolved.push(name),
                Component::ParentDir => {
                    resolved.pop();
                },
                Component::CurDir | Component::Prefix(_) | Component::RootDir => {},
            }
        }
        return Ok(resolved);
    }

    return Ok(absolute);
}

/// Reject an output that equals, contains, or lies inside `source`.
///
/// # Errors
///
/// Returns `Error::OutputOverlapsSource` on overlap, or `Error::Io`.
fn check_overlap(source: &Path, output: &Path) -> Result<(), Error> {
    let source_abs = absolute(source)?;
    let output_abs = absolute(output)?;
    if source_abs.starts_with(&output_abs) || output_abs.starts_with(&source_abs) {
        return Err(Error::OutputOverlapsSource {
            output: output.to_path_buf(),
            source_dir: source.to_path_buf(),
        });
    }
    return Ok(());
}

/// Copy every non-hidden top-level child of `source` into `output`,
/// recursing into directories. Returns the number of files copied.
///
/// # Errors
///
/// Returns `Error::Io` if any entry cannot be read or written.
fn copy_children(source: &Path, output: &Path) -> Result<usize, Error> {
    let mut children: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        if !entry.file_name().to_string_lossy().starts_with('.') {
            children.push(entry.path());
        }
    }
    children.sort();

    let mut copied = 0_usize;
    for child in &children {
        for entry in WalkDir::new(child).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            let Ok(relative) = entry.path().strip_prefix(source) else { continue };
            let target = output.join(relative);

            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&target)?;
            } else {
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::copy(entry.path(), &target)?;
                copied = copied.saturating_add(1);
            }
        }
    }

    return Ok(copied);
}

/// Build a clean `output` from `source` and resolve its references.
///
/// # Errors
///
/// Returns `Error::SourceNotFound` if `source` is not a directory,
/// `Error::OutputOverlapsSource` if the trees overlap, or any copy or
/// resolution error.
pub fn generate(
    source: &Path,
    output: &Path,
    grammar: &ReferenceGrammar,
    fetcher: &dyn Fetch,
) -> Result<ResolveSummary, Error> {
    if !source.is_dir() {
        return Err(Error::SourceNotFound { path: source.to_path_buf() });
    }
    check_overlap(source, output)?;

    tracing::info!(path = %output.display(), "Cleaning output");
    archive::reset_dir(output)?;

    let copied = copy_children(source, output)?;
    tracing::info!(from = %source.display(), to = %output.display(), count = copied, "Copied");

    return resolver::resolve_tree(output, grammar, fetcher);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MockFetch;

    fn grammar() -> ReferenceGrammar {
        return ReferenceGrammar::new("github.com", "raw.githubusercontent.com").unwrap();
    }

    fn skills_tree(root: &Path) {
        std::fs::create_dir_all(root.join("skills/ruby/nested")).unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::write(root.join(".git/HEAD"), "ref").unwrap();
        std::fs::write(root.join(".hidden.md"), "x").unwrap();
        std::fs::write(
            root.join("skills/ruby/SKILL.md"),
            "See https://github.com/o/r/blob/main/lib/a.rb#L1 now.\n",
        )
        .unwrap();
        std::fs::write(root.join("skills/ruby/nested/notes.txt"), "n").unwrap();
        std::fs::write(root.join("plugin.json"), "{}").unwrap();
    }

    #[test]
    fn copies_visible_children_and_resolves_output_only() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src");
        let output = dir.path().join("out");
        skills_tree(&source);
        std::fs::create_dir_all(output.join("stale")).unwrap();

        let mut fetcher = MockFetch::new();
        fetcher
            .expect_fetch()
            .withf(|url, follow| return url == "https://raw.githubusercontent.com/o/r/main/lib/a.rb" && !*follow)
            .times(1)
            .returning(|_, _| return Ok(b"puts 1".to_vec()));

        let summary = generate(&source, &output, &grammar(), &fetcher).unwrap();

        assert_eq!(summary.files_updated, 1);
        assert_eq!(summary.references, 1);
        assert!(!output.join("stale").exists());
        assert!(!output.join(".git").exists());
        assert!(!output.join(".hidden.md").exists());
        assert!(output.join("plugin.json").is_file());
        assert!(output.join("skills/ruby/nested/notes.txt").is_file());
        assert_eq!(
            std::fs::read_to_string(output.join("skills/ruby/SKILL.md")).unwrap(),
            "See reference/a.rb#L1 now.\n"
        );
        assert_eq!(std::fs::read(output.join("skills/ruby/reference/a.rb")).unwrap(), b"puts 1");
        assert!(
            std::fs::read_to_string(source.join("skills/ruby/SKILL.md")).unwrap().contains("https://"),
            "source is never modified"
        );
    }

    #[test]
    fn missing_source_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = MockFetch::new();

        let result = generate(&dir.path().join("nope"), &dir.path().join("out"), &grammar(), &fetcher);

        assert!(matches!(result, Err(Error::SourceNotFound { .. })));
    }

    #[test]
    fn overlapping_output_is_rejected_before_deleting() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src");
        skills_tree(&source);
        let fetcher = MockFetch::new();

        for output in [source.clone(), dir.path().to_path_buf(), source.join("out")] {
            let result = generate(&source, &output, &grammar(), &fetcher);
            assert!(matches!(result, Err(Error::OutputOverlapsSource { .. })), "{}", output.display());
        }
        assert!(source.join("plugin.json").is_file());
    }

    #[test]
    fn parent_components_in_missing_output_are_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src");
        skills_tree(&source);
        let fetcher = MockFetch::new();

        for output in [dir.path().join("missing/../src"), dir.path().join("missing/../src/out")] {
            let result = generate(&source, &output, &grammar(), &fetcher);
            assert!(matches!(result, Err(Error::OutputOverlapsSource { .. })), "{}", output.display());
        }
        assert_eq!(
            std::fs::read_to_string(source.join("skills/ruby/SKILL.md")).unwrap(),
            "See https://github.com/o/r/blob/main/lib/a.rb#L1 now.\n"
        );
        assert!(!source.join("out").exists());
        assert!(!dir.path().join("missing").exists());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_output_parent_is_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src");
        skills_tree(&source);
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&source, &link).unwrap();
        let fetcher = MockFetch::new();

        let result = generate(&source, &link.join("out"), &grammar(), &fetcher);

        assert!(matches!(result, Err(Error::OutputOverlapsSource { .. })));
        assert!(!source.join("out").exists());
    }

    #[test]
    fn sibling_output_with_parent_components_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src");
        std::fs::create_dir_all(source.join("skills")).unwrap();
        std::fs::write(source.join("skills/SKILL.md"), "hi\n").unwrap();
        let fetcher = MockFetch::new();

        let summary = generate(&source, &dir.path().join("missing/../out"), &grammar(), &fetcher).unwrap();

        assert_eq!(summary.files_scanned, 1);
        assert_eq!(std::fs::read_to_string(dir.path().join("out/skills/SKILL.md")).unwrap(), "hi\n");
        assert_eq!(std::fs::read_to_string(source.join("skills/SKILL.md")).unwrap(), "hi\n");
    }
}
