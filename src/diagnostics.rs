use std::io::IsTerminal as _;
use std::path::Path;

use crate::config::DEFAULT_CONFIG_FILE;
use crate::error::Error;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown and print it to stderr, with bold
/// headings when stderr is a terminal.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    let bold = std::io::stderr().is_terminal();
    for line in md.lines() {
        if bold && line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
    return;
}

fn render_config_not_found(path: &Path) -> String {
    return format!(
        "\
# Error: Config Not Found

`{}` does not exist.

## Fix

Pass an existing file to `--config`, or drop the flag to use `{DEFAULT_CONFIG_FILE}`
from the working directory (built-in defaults apply when it is absent).
",
        path.display()
    );
}

fn render_download_failed(url: &str, status: u16) -> String {
    return format!(
        "\
# Error: Download Failed

`{url}` answered HTTP {status}.

## Fix

Check that the referenced file or branch still exists. Markdown files with a
failed reference are left unchanged, so the command can be re-run.
"
    );
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where there is
/// one, how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::ConfigNotFound { path } => render_config_not_found(path),
        Error::DownloadFailed { status, url } => render_download_failed(url, *status),
        Error::InvalidRedirect { location, url } => render_invalid_redirect(url, location),
        Error::InvalidReferenceUrl { url } => render_invalid_reference(url),
        Error::OutputOverlapsSource { output, source_dir } => render_overlap(output, source_dir),
        Error::TooManyRedirects { max, url } => render_too_many_redirects(url, *max),
        _ => render_generic(e),
    };
}

fn render_generic(e: &Error) -> String {
    return match e {
        Error::Http(e) => format!(
            "\
# Error: HTTP

{e}
"
        ),
        Error::InvalidUrl { reason, url } => format!(
            "\
# Error: Invalid URL

`{url}` is not a valid URL: {reason}
"
        ),
        Error::Io(e) => format!(
            "\
# Error: I/O

{e}
"
        ),
        Error::SourceNotFound { path } => format!(
            "\
# Error: Source Not Found

`{}` is not a directory.
",
            path.display()
        ),
        Error::TomlDe(e) => format!(
            "\
# Error: Invalid TOML

{e}

## Fix

Correct `{DEFAULT_CONFIG_FILE}`. Unknown keys are rejected.
"
        ),
        Error::UnsafeArchivePath { path } => format!(
            "\
# Error: Unsafe Archive Path

`{path}` would be written outside the destination directory.
"
        ),
        // Already handled in render_error, but need exhaustive match.
        _ => format!(
            "\
# Error

{e}
"
        ),
    };
}

fn render_invalid_redirect(url: &str, location: &str) -> String {
    return format!(
        "\
# Error: Invalid Redirect

`{url}` redirected to `{location}`, which is not a usable URL.
"
    );
}

fn render_invalid_reference(url: &str) -> String {
    return format!(
        "\
# Error: Invalid Reference URL

`{url}` looks like a blob link but does not name a file.

## Fix

Link to a single file:

    https://github.com/<owner>/<repo>/blob/<branch>/<path>[#fragment]

Directory listings use `/tree/` and are left alone.
"
    );
}

fn render_overlap(output: &Path, source_dir: &Path) -> String {
    return format!(
        "\
# Error: Output Overlaps Source

`{}` is deleted before copying and cannot share a tree with `{}`.

## Fix

Choose an output directory outside the source.
",
        output.display(),
        source_dir.display()
    );
}

fn render_too_many_redirects(url: &str, max: u32) -> String {
    return format!(
        "\
# Error: Too Many Redirects

`{url}` redirected more than {max} times.

## Fix

Raise `max_redirects` in `{DEFAULT_CONFIG_FILE}` if the chain is legitimate.
"
    );
}
