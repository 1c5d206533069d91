//! Crate-level error types for skillgen diagnostics.
use std::path::PathBuf;

/// Every failure aborts the current command. Each variant names the URL,
/// path, or status that caused it so the diagnostic is actionable on its own.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An explicitly requested config file does not exist on disk.
    #[error("config not found: {}", path.display())]
    ConfigNotFound {
        /// Path to the missing config file.
        path: PathBuf,
    },

    /// The final response for a URL was not a 2xx success.
    #[error("failed to download {url} (HTTP {status})")]
    DownloadFailed {
        /// HTTP status code of the final response.
        status: u16,
        /// URL that was requested.
        url: String,
    },

    /// Transport-level failure from the HTTP client.
    #[error("http: {0}")]
    Http(
        /// The wrapped client error.
        #[from]
        reqwest::Error,
    ),

    /// A redirect response carried no usable `Location` header.
    #[error("invalid redirect from {url} to `{location}`")]
    InvalidRedirect {
        /// Raw `Location` header value, empty when absent.
        location: String,
        /// URL that answered with the redirect.
        url: String,
    },

    /// A URL matched the coarse reference scan but not the strict grammar.
    #[error("invalid reference url: {url}")]
    InvalidReferenceUrl {
        /// The offending URL text as found in the markdown.
        url: String,
    },

    /// A URL handed to the fetcher could not be parsed.
    #[error("invalid url {url}: {reason}")]
    InvalidUrl {
        /// Parser message.
        reason: String,
        /// The URL text as given.
        url: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// The output directory would be deleted on top of the source tree.
    #[error("output {} overlaps source {}", output.display(), source_dir.display())]
    OutputOverlapsSource {
        /// Output directory that is about to be cleaned.
        output: PathBuf,
        /// Source directory being copied.
        source_dir: PathBuf,
    },

    /// A reference pattern failed to compile.
    #[error("regex: {0}")]
    Regex(
        /// The wrapped regex error.
        #[from]
        regex::Error,
    ),

    /// The plugin source directory does not exist.
    #[error("source directory not found: {}", path.display())]
    SourceNotFound {
        /// Path given as the source directory.
        path: PathBuf,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// Redirect chain exceeded the configured hop limit.
    #[error("too many redirects (max {max}) starting at {url}")]
    TooManyRedirects {
        /// Maximum number of hops allowed.
        max: u32,
        /// URL the chain started from.
        url: String,
    },

    /// An archive entry would be written outside the destination directory.
    #[error("unsafe archive path: {path}")]
    UnsafeArchivePath {
        /// Entry path as stored in the archive.
        path: String,
    },
}
