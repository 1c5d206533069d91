//! Remote byte retrieval: the `Fetch` capability and its HTTPS implementation.

use std::io::Read as _;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::LOCATION;

use crate::config::Config;
use crate::error::Error;

/// Retrieve the bytes behind a URL.
///
/// The resolver and downloaders only see this trait, so they can be driven
/// without a network in tests.
#[cfg_attr(test, mockall::automock)]
pub trait Fetch {
    /// GET `url` and return the response body.
    ///
    /// # Errors
    ///
    /// Returns `Error::DownloadFailed` for a non-2xx final status,
    /// `Error::TooManyRedirects` when the redirect chain is too long,
    /// or `Error::Http` for transport failures.
    fn fetch(&self, url: &str, follow_redirects: bool) -> Result<Vec<u8>, Error>;
}

/// One step of a request chain.
#[derive(Debug)]
pub enum Hop {
    /// Final response: status and body.
    Done {
        /// Response body.
        body: Vec<u8>,
        /// HTTP status code.
        status: u16,
    },
    /// A 3xx response with its raw `Location` header, if any.
    Redirect {
        /// The `Location` header value.
        location: Option<String>,
        /// HTTP status code.
        status: u16,
    },
}

/// Blocking HTTPS client with a fixed user agent and a redirect hop limit.
pub struct HttpFetcher {
    /// Underlying client; redirects are disabled so `follow` can count hops.
    client: Client,
    /// Maximum redirect hops before giving up.
    max_redirects: u32,
}

impl HttpFetcher {
    /// Build a fetcher from the user agent, timeouts, and TLS settings in `config`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` if the TLS backend cannot be initialized.
    pub fn new(config: &Config) -> Result<Self, Error> {
        if config.insecure_skip_tls_verify {
            tracing::warn!("TLS certificate verification is disabled by configuration");
        }

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .https_only(true)
            .danger_accept_invalid_certs(config.insecure_skip_tls_verify)
            .build()?;

        return Ok(Self {
            client,
            max_redirects: config.max_redirects,
        });
    }

    /// Issue a single GET without following redirects.
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` for transport failures or `Error::Io` if the body
    /// cannot be read.
    fn send(&self, url: &Url) -> Result<Hop, Error> {
        let mut response = self.client.get(url.clone()).send()?;
        let status = response.status();

        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| return v.to_str().ok())
                .map(String::from);
            return Ok(Hop::Redirect {
                location,
                status: status.as_u16(),
            });
        }

        let mut body = Vec::new();
        response.read_to_end(&mut body)?;
        return Ok(Hop::Done {
            body,
            status: status.as_u16(),
        });
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str, follow_redirects: bool) -> Result<Vec<u8>, Error> {
        return follow(url, follow_redirects, self.max_redirects, |u| return self.send(u));
    }
}

/// Drive a request chain from `url` until a final response.
///
/// Without `follow_redirects` a 3xx is treated as the final response and
/// therefore fails as a non-success status. Relative `Location` values are
/// resolved against the URL that returned them.
///
/// # Errors
///
/// Returns `Error::InvalidUrl` for an unparseable `url`,
/// `Error::InvalidRedirect` for an unusable `Location`,
/// `Error::TooManyRedirects` after `max_redirects` hops,
/// `Error::DownloadFailed` for a non-2xx final status,
/// or whatever `send` returns.
pub fn follow<F>(
    url: &str,
    follow_redirects: bool,
    max_redirects: u32,
    mut send: F,
) -> Result<Vec<u8>, Error>
where
    F: FnMut(&Url) -> Result<Hop, Error>,
{
    let mut current = Url::parse(url).map_err(|err| {
        return Error::InvalidUrl {
            reason: err.to_string(),
            url: url.to_string(),
        };
    })?;
    let mut hops = 0_u32;

    loop {
        match send(&current)? {
            Hop::Done { body, status } => {
                if !(200..300).contains(&status) {
                    return Err(Error::DownloadFailed {
                        status,
                        url: url.to_string(),
                    });
                }
                return Ok(body);
            },
            Hop::Redirect { status, .. } if !follow_redirects => {
                return Err(Error::DownloadFailed {
                    status,
                    url: url.to_string(),
                });
            },
            Hop::Redirect { location, .. } => {
                if hops >= max_redirects {
                    return Err(Error::TooManyRedirects {
                        max: max_redirects,
                        url: url.to_string(),
                    });
                }
                hops = hops.saturating_add(1);

                let Some(raw) = location else {
                    return Err(Error::InvalidRedirect {
                        location: String::new(),
                        url: current.to_string(),
                    });
                };
                let next = current.join(&raw).map_err(|_err| {
                    return Error::InvalidRedirect {
                        location: raw.clone(),
                        url: current.to_string(),
                    };
                })?;
                tracing::debug!(from = %current, to = %next, "following redirect");
                current = next;
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn done(status: u16, body: &[u8]) -> Result<Hop, Error> {
        return Ok(Hop::Done { body: body.to_vec(), status });
    }

    fn redirect(location: &str) -> Result<Hop, Error> {
        return Ok(Hop::Redirect { location: Some(location.to_string()), status: 302 });
    }

    #[test]
    fn success_returns_body() {
        let body = follow("https://example.com/a", false, 10, |_| done(200, b"hello")).unwrap();
        assert_eq!(body, b"hello");
    }

    #[test]
    fn non_success_reports_url_and_status() {
        let err = follow("https://example.com/missing", false, 10, |_| done(404, b"")).unwrap_err();
        match err {
            Error::DownloadFailed { status, url } => {
                assert_eq!(status, 404);
                assert_eq!(url, "https://example.com/missing");
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn redirect_without_follow_is_a_failure() {
        let err = follow("https://example.com/a", false, 10, |_| redirect("/b")).unwrap_err();
        assert!(matches!(err, Error::DownloadFailed { status: 302, .. }));
    }

    #[test]
    fn follows_relative_and_absolute_locations() {
        let mut seen: Vec<String> = Vec::new();
        let body = follow("https://github.com/o/r/archive/main.tar.gz", true, 10, |u| {
            seen.push(u.to_string());
            return match seen.len() {
                1 => redirect("https://codeload.github.com/o/r/tar.gz/main"),
                2 => redirect("/o/r/tar.gz/refs/heads/main"),
                _ => done(200, b"tarball"),
            };
        })
        .unwrap();

        assert_eq!(body, b"tarball");
        assert_eq!(
            seen,
            [
                "https://github.com/o/r/archive/main.tar.gz",
                "https://codeload.github.com/o/r/tar.gz/main",
                "https://codeload.github.com/o/r/tar.gz/refs/heads/main",
            ]
        );
    }

    #[test]
    fn redirect_loop_is_capped() {
        let mut calls = 0_u32;
        let err = follow("https://example.com/loop", true, 3, |_| {
            calls += 1;
            return redirect("/loop");
        })
        .unwrap_err();

        assert!(matches!(err, Error::TooManyRedirects { max: 3, .. }));
        assert_eq!(calls, 4, "initial request plus three followed hops");
    }

    #[test]
    fn missing_location_is_rejected() {
        let err = follow("https://example.com/a", true, 10, |_| {
            return Ok(Hop::Redirect { location: None, status: 301 });
        });
        assert!(matches!(err, Err(Error::InvalidRedirect { .. })));
    }

    #[test]
    fn client_builds_from_default_config() {
        let fetcher = HttpFetcher::new(&Config::default()).unwrap();
        assert_eq!(fetcher.max_redirects, 10);
    }

    #[test]
    fn unparseable_url_is_rejected_before_sending() {
        let mut calls = 0_u32;
        let err = follow("not a url", false, 10, |_| {
            calls = calls.saturating_add(1);
            return done(200, b"");
        })
        .unwrap_err();

        assert_eq!(calls, 0);
        match err {
            Error::InvalidUrl { reason, url } => {
                assert_eq!(url, "not a url");
                assert!(!reason.is_empty());
            },
            other => panic!("expected InvalidUrl, got {other:?}"),
        }
    }
}
