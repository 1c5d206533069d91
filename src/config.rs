use std::path::Path;

use serde::Deserialize;

use crate::error::Error;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".skillgen.toml";

/// Project configuration loaded from `.skillgen.toml`.
/// Every key is optional; absent tables fall back to the built-in sources.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Seconds allowed to establish a connection.
    pub connect_timeout_secs: u64,
    /// Accept invalid TLS certificates. Only for controlled test environments.
    pub insecure_skip_tls_verify: bool,
    /// Maximum redirect hops followed by tarball downloads.
    pub max_redirects: u32,
    /// Host serving raw file contents.
    pub raw_host: String,
    /// RBS core/stdlib signature source.
    pub rbs: RepoSource,
    /// Gems downloaded as rbs-inline examples.
    pub rbs_inline: RbsInlineConfig,
    /// Sorbet RBI example gems and their size ceiling.
    pub sorbet_rbi: SorbetRbiConfig,
    /// Host of the blob URLs recognized in markdown and of tarball archives.
    pub source_host: String,
    /// Seconds allowed for a whole request, body included. Sized for
    /// repository tarballs on slow links.
    pub timeout_secs: u64,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

/// A gem whose Ruby sources are extracted from `lib_path`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InlineGem {
    /// Branch whose head tarball is downloaded.
    pub branch: String,
    /// Directory inside the repository holding the Ruby sources.
    pub lib_path: String,
    /// Destination folder name.
    pub name: String,
    /// `owner/repo` on the source host.
    pub repo: String,
}

/// A gem shipping RBI files, optionally with its Ruby sources.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RbiGem {
    /// Branch whose head tarball is downloaded.
    pub branch: String,
    /// Directory holding Ruby sources; `None` skips them.
    #[serde(default)]
    pub lib_path: Option<String>,
    /// Destination folder name.
    pub name: String,
    /// Directory inside the repository holding `.rbi` files.
    pub rbi_path: String,
    /// `owner/repo` on the source host.
    pub repo: String,
}

/// `[rbs_inline]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RbsInlineConfig {
    /// Gems to download, in order.
    pub gems: Vec<InlineGem>,
}

/// A repository and branch to download as a tarball.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepoSource {
    /// Branch whose head tarball is downloaded.
    pub branch: String,
    /// `owner/repo` on the source host.
    pub repo: String,
}

/// `[sorbet_rbi]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SorbetRbiConfig {
    /// Gems to download, in order.
    pub gems: Vec<RbiGem>,
    /// Archive entries larger than this many bytes are skipped.
    pub max_entry_bytes: u64,
}

impl Config {
    /// Load config from `path`.
    ///
    /// A missing file yields the defaults when `explicit` is false, and an
    /// error when the user named the file on the command line. A file that
    /// exists but is malformed is always an error.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigNotFound` for a missing explicit file,
    /// `Error::Io` if reading fails, or `Error::TomlDe` if the TOML is malformed.
    pub fn load(path: &Path, explicit: bool) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if explicit {
                    return Err(Error::ConfigNotFound { path: path.to_path_buf() });
                }
                return Ok(Self::default());
            },
            Err(e) => return Err(Error::Io(e)),
        };

        return Self::parse(&content);
    }

    /// Parse config from TOML content.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed or has unknown keys.
    pub fn parse(content: &str) -> Result<Self, Error> {
        return Ok(toml::from_str(content)?);
    }
}

impl Default for Config {
    fn default() -> Self {
        return Self {
            connect_timeout_secs: 30,
            insecure_skip_tls_verify: false,
            max_redirects: 10,
            raw_host: "raw.githubusercontent.com".to_string(),
            rbs: RepoSource::default(),
            rbs_inline: RbsInlineConfig::default(),
            sorbet_rbi: SorbetRbiConfig::default(),
            source_host: "github.com".to_string(),
            timeout_secs: 600,
            user_agent: "ruby-agent-skills-rake".to_string(),
        };
    }
}

impl Default for RbsInlineConfig {
    fn default() -> Self {
        return Self {
            gems: vec![InlineGem {
                branch: "main".to_string(),
                lib_path: "lib".to_string(),
                name: "zeitwerk".to_string(),
                repo: "fxn/zeitwerk".to_string(),
            }],
        };
    }
}

impl Default for RepoSource {
    fn default() -> Self {
        return Self {
            branch: "master".to_string(),
            repo: "ruby/rbs".to_string(),
        };
    }
}

impl Default for SorbetRbiConfig {
    fn default() -> Self {
        return Self {
            gems: vec![RbiGem {
                branch: "master".to_string(),
                lib_path: Some("lib".to_string()),
                name: "stripe-ruby".to_string(),
                rbi_path: "rbi".to_string(),
                repo: "stripe/stripe-ruby".to_string(),
            }],
            max_entry_bytes: 500_000,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.source_host, "github.com");
        assert_eq!(config.max_redirects, 10);
        assert_eq!(config.rbs.repo, "ruby/rbs");
        assert_eq!(config.rbs_inline.gems.len(), 1);
        assert_eq!(config.sorbet_rbi.max_entry_bytes, 500_000);
        assert_eq!(config.connect_timeout_secs, 30);
        assert_eq!(config.timeout_secs, 600);
    }

    #[test]
    fn timeouts_are_configured_separately() {
        let config = Config::parse("connect_timeout_secs = 5\ntimeout_secs = 1800\n").unwrap();
        assert_eq!(config.connect_timeout_secs, 5);
        assert_eq!(config.timeout_secs, 1800);
    }

    #[test]
    fn gem_list_replaces_defaults() {
        let config = Config::parse(
            r#"
            [[rbs_inline.gems]]
            name = "foo"
            repo = "acme/foo"
            branch = "trunk"
            lib_path = "src"
            "#,
        )
        .unwrap();
        let names: Vec<&str> = config.rbs_inline.gems.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["foo"]);
        assert_eq!(config.sorbet_rbi.gems.len(), 1, "untouched table keeps defaults");
    }

    #[test]
    fn partial_table_fills_missing_keys() {
        let config = Config::parse("[rbs]\nbranch = \"main\"\n").unwrap();
        assert_eq!(config.rbs.branch, "main");
        assert_eq!(config.rbs.repo, "ruby/rbs");
    }

    #[test]
    fn missing_default_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join(DEFAULT_CONFIG_FILE), false).unwrap();
        assert!(!config.insecure_skip_tls_verify);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(&dir.path().join("custom.toml"), true);
        assert!(matches!(result, Err(Error::ConfigNotFound { .. })));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let result = Config::parse("user_agnet = \"typo\"\n");
        assert!(matches!(result, Err(Error::TomlDe(_))));
    }
}
