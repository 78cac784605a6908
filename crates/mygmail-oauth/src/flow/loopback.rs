//! Local HTTP listener that captures the authorization redirect.

use crate::error::{Error, Result};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};
use url::Url;

const SUCCESS_PAGE: &str = "<!DOCTYPE html>\n<html><head><title>mygmail</title></head>\
<body><p>The authentication flow has completed. You may close this window.</p></body></html>";

const FAILURE_PAGE: &str = "<!DOCTYPE html>\n<html><head><title>mygmail</title></head>\
<body><p>Authentication failed. Check the terminal for details.</p></body></html>";

/// Query parameters Google appends to the redirect URI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redirect {
    /// Authorization code.
    pub code: Option<String>,
    /// Echoed `state` parameter.
    pub state: Option<String>,
    /// Error code when the user declined or the request was rejected.
    pub error: Option<String>,
}

impl Redirect {
    /// Parses the first line of an HTTP request (`GET /?code=.. HTTP/1.1`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request line has no target.
    pub fn from_request_line(line: &str) -> Result<Self> {
        let target = line
            .split_whitespace()
            .nth(1)
            .ok_or_else(|| Error::InvalidResponse("empty redirect request".into()))?;
        Ok(Self::from_url(&Url::parse("http://localhost")?.join(target)?))
    }

    /// Extracts the redirect parameters from a full URL.
    #[must_use]
    pub fn from_url(url: &Url) -> Self {
        let mut redirect = Self::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => redirect.code = Some(value.into_owned()),
                "state" => redirect.state = Some(value.into_owned()),
                "error" => redirect.error = Some(value.into_owned()),
                _ => {}
            }
        }
        redirect
    }

    /// Validates the redirect against the state we sent and returns the code.
    ///
    /// # Errors
    ///
    /// Returns `AccessDenied` or an OAuth error if the server reported one,
    /// `StateMismatch` if the state differs, and `InvalidResponse` if no code
    /// is present.
    pub fn into_code(self, expected_state: Option<&str>) -> Result<String> {
        if let Some(error) = self.error {
            return Err(if error == "access_denied" {
                Error::AccessDenied
            } else {
                Error::oauth_error(error, "authorization request rejected")
            });
        }
        if let Some(expected) = expected_state
            && self.state.as_deref() != Some(expected)
        {
            return Err(Error::StateMismatch);
        }
        self.code
            .filter(|code| !code.is_empty())
            .ok_or_else(|| Error::InvalidResponse("no authorization code in redirect".into()))
    }
}

/// One-shot HTTP listener bound to a loopback address.
#[derive(Debug)]
pub struct LoopbackReceiver {
    listener: TcpListener,
    host: String,
    port: u16,
}

impl LoopbackReceiver {
    /// Binds to the first free port of `ports` on `host`.
    ///
    /// An empty port list lets the OS pick one.
    ///
    /// # Errors
    ///
    /// Returns an error if none of the ports can be bound.
    pub async fn bind(host: &str, ports: &[u16]) -> Result<Self> {
        let candidates: &[u16] = if ports.is_empty() { &[0] } else { ports };

        for &port in candidates {
            match TcpListener::bind((host, port)).await {
                Ok(listener) => {
                    let port = listener.local_addr()?.port();
                    info!("Redirect listener on {host}:{port}");
                    return Ok(Self {
                        listener,
                        host: host.to_string(),
                        port,
                    });
                }
                Err(e) => debug!("Cannot bind {host}:{port}: {e}"),
            }
        }

        Err(Error::InvalidConfig(format!(
            "cannot bind a redirect listener on {host} ports {candidates:?}"
        )))
    }

    /// Returns the bound port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the redirect URI to register with the authorization request.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }

    /// Waits for the browser redirect and returns the authorization code.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` if no redirect arrives in time, plus any error from
    /// [`Redirect::into_code`].
    pub async fn receive(self, expected_state: Option<&str>, timeout: Duration) -> Result<String> {
        let (mut stream, peer) = tokio::time::timeout(timeout, self.listener.accept())
            .await
            .map_err(|_| Error::Timeout(timeout.as_secs()))??;
        debug!("Redirect connection from {peer}");

        let mut buf = vec![0u8; 8192];
        let n = stream.read(&mut buf).await?;
        let request = String::from_utf8_lossy(&buf[..n]);
        let first_line = request.lines().next().unwrap_or_default();

        let result = Redirect::from_request_line(first_line)
            .and_then(|redirect| redirect.into_code(expected_state));

        let page = if result.is_ok() { SUCCESS_PAGE } else { FAILURE_PAGE };
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{page}",
            page.len()
        );
        // The browser may already be gone; the code is what matters
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.flush().await;

        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::net::TcpStream;

    #[test]
    fn test_parse_request_line() {
        let redirect =
            Redirect::from_request_line("GET /?state=abc&code=4%2F0Ad-xyz&scope=s HTTP/1.1")
                .unwrap();
        assert_eq!(redirect.code.as_deref(), Some("4/0Ad-xyz"));
        assert_eq!(redirect.state.as_deref(), Some("abc"));
        assert!(redirect.error.is_none());
    }

    #[test]
    fn test_request_line_with_error() {
        let redirect = Redirect::from_request_line("GET /?error=access_denied HTTP/1.1").unwrap();
        assert_eq!(redirect.error.as_deref(), Some("access_denied"));
        assert!(matches!(redirect.into_code(None), Err(Error::AccessDenied)));
    }

    #[test]
    fn test_empty_request_line() {
        assert!(Redirect::from_request_line("").is_err());
    }

    #[test]
    fn test_into_code_checks_state() {
        let redirect = Redirect {
            code: Some("c".into()),
            state: Some("other".into()),
            error: None,
        };
        assert!(matches!(
            redirect.into_code(Some("abc")),
            Err(Error::StateMismatch)
        ));
    }

    #[test]
    fn test_into_code_reports_denial() {
        let redirect = Redirect {
            error: Some("access_denied".into()),
            ..Redirect::default()
        };
        assert!(matches!(redirect.into_code(None), Err(Error::AccessDenied)));
    }

    #[test]
    fn test_into_code_requires_code() {
        assert!(matches!(
            Redirect::default().into_code(None),
            Err(Error::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_receive_redirect() {
        let receiver = LoopbackReceiver::bind("127.0.0.1", &[]).await.unwrap();
        let port = receiver.port();
        assert_eq!(receiver.redirect_uri(), format!("http://127.0.0.1:{port}/"));

        let browser = tokio::spawn(async move {
            let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
            stream
                .write_all(b"GET /?code=abc123&state=s1 HTTP/1.1\r\nHost: localhost\r\n\r\n")
                .await
                .unwrap();
            let mut page = String::new();
            stream.read_to_string(&mut page).await.unwrap();
            page
        });

        let code = receiver
            .receive(Some("s1"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(code, "abc123");

        let page = browser.await.unwrap();
        assert!(page.starts_with("HTTP/1.1 200 OK"));
        assert!(page.contains("completed"));
    }

    #[tokio::test]
    async fn test_receive_times_out() {
        let receiver = LoopbackReceiver::bind("127.0.0.1", &[]).await.unwrap();
        let err = receiver
            .receive(None, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test]
    async fn test_bind_falls_through_taken_port() {
        let first = LoopbackReceiver::bind("127.0.0.1", &[]).await.unwrap();
        let taken = first.port();
        let second = LoopbackReceiver::bind("127.0.0.1", &[taken, 0]).await.unwrap();
        assert_ne!(second.port(), taken);
    }
}
