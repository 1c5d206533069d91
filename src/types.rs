//! Core domain types for skillgen references and run summaries.

/// A blob URL found in markdown, decomposed by the reference grammar.
/// `filename` is never empty by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Branch or commit segment of the URL.
    pub branch: String,
    /// Last non-empty segment of `path`.
    pub filename: String,
    /// Sub-resource locator after `#`, punctuation-stripped.
    pub fragment: Option<String>,
    /// Repository owner.
    pub owner: String,
    /// Repo-relative path without fragment or trailing punctuation.
    pub path: String,
    /// Directly fetchable URL of the file's bytes.
    pub raw_url: String,
    /// Link target written into the markdown: `reference/<filename>[#fragment]`.
    pub relative_path: String,
    /// Repository name.
    pub repo: String,
    /// The URL text exactly as matched in the markdown.
    pub url: String,
}

/// Counts reported after resolving a tree of markdown files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveSummary {
    /// Markdown files read.
    pub files_scanned: usize,
    /// Markdown files rewritten on disk.
    pub files_updated: usize,
    /// References downloaded and rewritten.
    pub references: usize,
}
