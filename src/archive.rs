//! Selective extraction of repository tarballs.
//!
//! Hosted tarballs wrap the tree in a root folder whose name embeds the
//! branch (`proj-main/`). The root is discovered from the first real entry
//! and every later file is offered to the caller relative to it.

use std::io::{Cursor, Read as _};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::{Archive, EntryType};

use crate::error::Error;
use crate::fetch::Fetch;

/// Streams a gzip tarball and writes the entries a selector accepts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor {
    /// Entries larger than this are skipped. `None` keeps everything.
    pub max_entry_bytes: Option<u64>,
}

impl Extractor {
    /// Extract selected files from `tarball` into `dest`.
    ///
    /// `select` receives each regular file's path relative to the archive
    /// root and returns the destination path relative to `dest`, or `None`
    /// to skip the entry. Returns the written destination-relative paths in
    /// archive order.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` for decode or write failures, or
    /// `Error::UnsafeArchivePath` if a selected path escapes `dest`.
    pub fn extract<F>(&self, tarball: &[u8], dest: &Path, mut select: F) -> Result<Vec<PathBuf>, Error>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut archive = Archive::new(GzDecoder::new(Cursor::new(tarball)));
        let mut root: Option<String> = None;
        let mut written = Vec::new();

        for entry in archive.entries()? {
            let mut entry = entry?;
            let full_name = entry.path()?.to_string_lossy().into_owned();
            let entry_type = entry.header().entry_type();

            if root.is_none() {
                root = discover_root(&full_name, entry_type);
            }
            let Some(root_name) = root.as_deref() else { continue };

            if !entry_type.is_file() {
                continue;
            }
            if self.max_entry_bytes.is_some_and(|max| return entry.size() > max) {
                tracing::debug!(path = %full_name, size = entry.size(), "skipping oversized entry");
                continue;
            }

            let Some(relative) = strip_source_path(&full_name, root_name) else { continue };
            let Some(target) = select(relative) else { continue };

            let target = safe_relative_path(&target)?;
            let dest_path = dest.join(&target);
            if let Some(parent) = dest_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;
            std::fs::write(&dest_path, bytes)?;
            written.push(target);
        }

        return Ok(written);
    }
}

/// Root folder name implied by an entry, if it can define one.
///
/// Pax metadata entries carry no tree path and are ignored, as are
/// top-level names without a `/`.
fn discover_root(full_name: &str, entry_type: EntryType) -> Option<String> {
    if matches!(entry_type, EntryType::XGlobalHeader | EntryType::XHeader) || full_name.starts_with("pax") {
        return None;
    }
    let (first, _) = full_name.split_once('/')?;
    if first.is_empty() {
        return None;
    }
    return Some(first.to_string());
}

/// Download the head tarball of `repo` at `branch`, following redirects.
///
/// # Errors
///
/// Returns any fetch error.
pub fn fetch_tarball(
    fetcher: &dyn Fetch,
    source_host: &str,
    repo: &str,
    branch: &str,
) -> Result<Vec<u8>, Error> {
    let url = tarball_url(source_host, repo, branch);
    tracing::info!(%url, "Downloading tarball");
    let bytes = fetcher.fetch(&url, true)?;
    tracing::info!(bytes = bytes.len(), "Downloaded");
    return Ok(bytes);
}

/// Delete `dir` if present and recreate it empty.
///
/// # Errors
///
/// Returns `Error::Io` if removal or creation fails.
pub fn reset_dir(dir: &Path) -> Result<(), Error> {
    match std::fs::remove_dir_all(dir) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(Error::Io(e)),
        _ => {},
    }
    std::fs::create_dir_all(dir)?;
    return Ok(());
}

/// Validate a selector-provided path: relative, with no `..` or root components.
///
/// # Errors
///
/// Returns `Error::UnsafeArchivePath` for absolute, empty, or parent-escaping paths.
fn safe_relative_path(target: &str) -> Result<PathBuf, Error> {
    let path = PathBuf::from(target);
    let escapes = path
        .components()
        .any(|c| return !matches!(c, Component::Normal(_) | Component::CurDir));
    if target.is_empty() || escapes {
        return Err(Error::UnsafeArchivePath { path: target.to_string() });
    }
    return Ok(path);
}

/// The part of `path` under `<source_path>/`, or `None` if it lies elsewhere.
///
/// A trailing slash on `source_path` is accepted.
pub fn strip_source_path<'a>(path: &'a str, source_path: &str) -> Option<&'a str> {
    let source_path = source_path.trim_end_matches('/');
    let rest = path.strip_prefix(source_path)?.strip_prefix('/')?;
    if rest.is_empty() {
        return None;
    }
    return Some(rest);
}

/// Archive URL of the head of `branch`.
pub fn tarball_url(source_host: &str, repo: &str, branch: &str) -> String {
    return format!("https://{source_host}/{repo}/archive/refs/heads/{branch}.tar.gz");
}

#[cfg(test)]
pub(crate) mod tests {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tar::{Builder, Header};

    use super::*;

    /// Build a gzip tarball from `(path, contents)` pairs, optionally led by
    /// a pax global header like hosted archives have.
    pub(crate) fn tarball(entries: &[(&str, &[u8])], pax_header: bool) -> Vec<u8> {
        let mut builder = Builder::new(GzEncoder::new(Vec::new(), Compression::default()));

        if pax_header {
            let comment = b"52 comment=0123456789abcdef0123456789abcdef01234567\n";
            let mut header = Header::new_ustar();
            header.set_entry_type(EntryType::XGlobalHeader);
            header.set_size(u64::try_from(comment.len()).unwrap());
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, "pax_global_header", comment.as_slice()).unwrap();
        }

        for (path, contents) in entries {
            let mut header = Header::new_gnu();
            header.set_size(u64::try_from(contents.len()).unwrap());
            header.set_mode(0o644);
            header.set_entry_type(EntryType::Regular);
            header.set_cksum();
            builder.append_data(&mut header, path, *contents).unwrap();
        }

        return builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn discovers_root_and_strips_source_path() {
        let bytes = tarball(&[("proj-main/lib/a.rb", b"a".as_slice()), ("proj-main/lib/b.rb", b"b".as_slice())], false);
        let dest = tempfile::tempdir().unwrap();

        let written = Extractor::default()
            .extract(&bytes, dest.path(), |p| return strip_source_path(p, "lib").map(String::from))
            .unwrap();

        assert_eq!(written, [PathBuf::from("a.rb"), PathBuf::from("b.rb")]);
        assert_eq!(std::fs::read(dest.path().join("a.rb")).unwrap(), b"a");
        assert_eq!(std::fs::read(dest.path().join("b.rb")).unwrap(), b"b");
    }

    #[test]
    fn root_name_does_not_matter() {
        let bytes = tarball(&[("zeitwerk-0f1e2d/lib/zeitwerk/loader.rb", b"x".as_slice())], true);
        let dest = tempfile::tempdir().unwrap();

        Extractor::default()
            .extract(&bytes, dest.path(), |p| return strip_source_path(p, "lib").map(String::from))
            .unwrap();

        assert!(dest.path().join("zeitwerk/loader.rb").is_file());
    }

    #[test]
    fn selector_sees_root_relative_paths_and_can_nest() {
        let bytes = tarball(
            &[
                ("gem-master/rbi/gem.rbi", b"rbi".as_slice()),
                ("gem-master/lib/gem.rb", b"rb".as_slice()),
                ("gem-master/README.md", b"readme".as_slice()),
            ],
            true,
        );
        let dest = tempfile::tempdir().unwrap();
        let mut offered = Vec::new();

        let written = Extractor::default()
            .extract(&bytes, dest.path(), |p| {
                offered.push(p.to_string());
                return strip_source_path(p, "rbi").map(|rest| return format!("rbi/{rest}"));
            })
            .unwrap();

        assert_eq!(offered, ["rbi/gem.rbi", "lib/gem.rb", "README.md"]);
        assert_eq!(written, [PathBuf::from("rbi/gem.rbi")]);
        assert!(dest.path().join("rbi/gem.rbi").is_file());
    }

    #[test]
    fn oversized_entries_are_skipped() {
        let big = vec![b'x'; 64];
        let bytes = tarball(&[("p-main/small.rb", b"ok".as_slice()), ("p-main/big.rb", big.as_slice())], false);
        let dest = tempfile::tempdir().unwrap();

        let written = Extractor { max_entry_bytes: Some(32) }
            .extract(&bytes, dest.path(), |p| return Some(p.to_string()))
            .unwrap();

        assert_eq!(written, [PathBuf::from("small.rb")]);
        assert!(!dest.path().join("big.rb").exists());
    }

    #[test]
    fn escaping_target_is_rejected() {
        let bytes = tarball(&[("p-main/a.rb", b"a".as_slice())], false);
        let dest = tempfile::tempdir().unwrap();

        let result = Extractor::default().extract(&bytes, dest.path(), |_| return Some("../a.rb".to_string()));

        assert!(matches!(result, Err(Error::UnsafeArchivePath { .. })));
    }

    #[test]
    fn reset_dir_empties_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");
        std::fs::create_dir_all(target.join("stale")).unwrap();
        std::fs::write(target.join("stale/file.rb"), "old").unwrap();

        reset_dir(&target).unwrap();

        assert!(target.is_dir());
        assert_eq!(std::fs::read_dir(&target).unwrap().count(), 0);
        reset_dir(&dir.path().join("fresh")).unwrap();
        assert!(dir.path().join("fresh").is_dir());
    }

    #[test]
    fn tarball_url_points_at_branch_head() {
        assert_eq!(
            tarball_url("github.com", "ruby/rbs", "master"),
            "https://github.com/ruby/rbs/archive/refs/heads/master.tar.gz"
        );
    }

    #[test]
    fn strip_source_path_requires_a_segment_boundary() {
        assert_eq!(strip_source_path("lib/a.rb", "lib"), Some("a.rb"));
        assert_eq!(strip_source_path("lib/a.rb", "lib/"), Some("a.rb"));
        assert_eq!(strip_source_path("library/a.rb", "lib"), None);
        assert_eq!(strip_source_path("lib/", "lib"), None);
    }
}
