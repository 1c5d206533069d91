/// Blob URL grammar: recognition in markdown and decomposition into a `Reference`.
use regex::Regex;

use crate::error::Error;
use crate::types::Reference;

/// Characters dropped from the end of a path or fragment when a URL closes a sentence.
const TRAILING_PUNCTUATION: [char; 6] = ['.', ',', ';', ':', '!', '?'];

/// Compiled patterns for one source host.
///
/// `link` and `bare` find candidates in markdown; `strict` decomposes a
/// candidate. A candidate that `strict` rejects is a grammar bug, not a
/// skippable input.
#[derive(Debug, Clone)]
pub struct ReferenceGrammar {
    /// Bare URL form. Callers must reject matches preceded by `(`.
    bare: Regex,
    /// Inline link form `[text](url)`; group 1 is the text, group 2 the URL.
    link: Regex,
    /// Host serving raw file contents.
    raw_host: String,
    /// Anchored capture of owner, repo, branch, and path.
    strict: Regex,
}

impl ReferenceGrammar {
    /// The bare URL pattern.
    pub const fn bare(&self) -> &Regex {
        return &self.bare;
    }

    /// The inline link pattern.
    pub const fn link(&self) -> &Regex {
        return &self.link;
    }

    /// Compile the patterns for blob URLs on `source_host`, raw content on `raw_host`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Regex` if a pattern fails to compile.
    pub fn new(source_host: &str, raw_host: &str) -> Result<Self, Error> {
        let host = regex::escape(source_host);
        let shape = format!(r"https://{host}/[^/]+/[^/]+/blob/[^/]+/");

        return Ok(Self {
            bare: Regex::new(&format!(r"{shape}[^\s)\]]+"))?,
            link: Regex::new(&format!(r"\[([^\]]+)\]\(({shape}[^\s)]+)\)"))?,
            raw_host: raw_host.to_string(),
            strict: Regex::new(&format!(
                r"^https://{host}/([^/]+)/([^/]+)/blob/([^/]+)/([^\s)\]]+)"
            ))?,
        });
    }

    /// Decompose a blob URL into a `Reference`.
    ///
    /// The path is split on its first `#`; trailing sentence punctuation is
    /// stripped from the path and the fragment independently, and an empty
    /// fragment is dropped.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidReferenceUrl` if the URL does not fit the strict
    /// grammar or its path has no file name left after stripping.
    pub fn parse(&self, url: &str) -> Result<Reference, Error> {
        let invalid = || return Error::InvalidReferenceUrl { url: url.to_string() };

        let caps = self.strict.captures(url).ok_or_else(invalid)?;
        let (Some(owner), Some(repo), Some(branch), Some(raw_path)) =
            (caps.get(1), caps.get(2), caps.get(3), caps.get(4))
        else {
            return Err(invalid());
        };

        let (path, fragment) = split_fragment(raw_path.as_str());
        let filename = path
            .rsplit('/')
            .find(|segment| return !segment.is_empty())
            .ok_or_else(invalid)?;

        let relative_path = match fragment {
            Some(f) => format!("reference/{filename}#{f}"),
            None => format!("reference/{filename}"),
        };
        let raw_url = format!(
            "https://{}/{}/{}/{}/{path}",
            self.raw_host,
            owner.as_str(),
            repo.as_str(),
            branch.as_str(),
        );

        return Ok(Reference {
            branch: branch.as_str().to_string(),
            filename: filename.to_string(),
            fragment: fragment.map(String::from),
            owner: owner.as_str().to_string(),
            path: path.to_string(),
            raw_url,
            relative_path,
            repo: repo.as_str().to_string(),
            url: url.to_string(),
        });
    }
}

/// Split `path#fragment` and strip trailing punctuation from both halves.
fn split_fragment(raw: &str) -> (&str, Option<&str>) {
    let (path, fragment) = match raw.split_once('#') {
        Some((p, f)) => (p, Some(f)),
        None => (raw, None),
    };

    let path = path.trim_end_matches(TRAILING_PUNCTUATION);
    let fragment = fragment
        .map(|f| return f.trim_end_matches(TRAILING_PUNCTUATION))
        .filter(|f| return !f.is_empty());
    return (path, fragment);
}
