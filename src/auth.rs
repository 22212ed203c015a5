//! Interactive authorization: browser consent plus a loopback redirect listener.

use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use url::Url;

use crate::config::OAuthConfig;
use crate::error::AuthError;

pub const REDIRECT_WAIT: Duration = Duration::from_secs(120);
const CALLBACK_PATH: &str = "/callback";
const MAX_REQUEST_HEAD: usize = 8 * 1024;

const SUCCESS_PAGE: &str = "<!doctype html><html><body style=\"font-family:sans-serif\">\
<h2>tasklane is authorized</h2><p>You can close this tab and return to the terminal.</p>\
</body></html>";
const FAILURE_PAGE: &str = "<!doctype html><html><body style=\"font-family:sans-serif\">\
<h2>Authorization failed</h2><p>Return to the terminal for details.</p></body></html>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    Code { code: String, state: Option<String> },
    Error(String),
}

/// Parses the request target of a callback hit, e.g. `/callback?code=..&state=..`.
///
/// Returns `None` for anything that is not the callback path or carries
/// neither a code nor an error.
pub fn parse_callback(target: &str) -> Option<Redirect> {
    let url = Url::parse(&format!("http://localhost{target}")).ok()?;
    if url.path() != CALLBACK_PATH {
        return None;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    match (error, code) {
        (Some(error), _) => Some(Redirect::Error(error)),
        (None, Some(code)) if !code.is_empty() => Some(Redirect::Code { code, state }),
        _ => None,
    }
}

pub struct RedirectListener {
    listener: TcpListener,
    addr: SocketAddr,
}

impl RedirectListener {
    pub async fn bind(port: u16) -> Result<Self, AuthError> {
        let listener = TcpListener::bind(("127.0.0.1", port)).await?;
        let addr = listener.local_addr()?;
        Ok(Self { listener, addr })
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://{}{CALLBACK_PATH}", self.addr)
    }

    /// Serves until the first callback or until `wait` elapses, then closes.
    ///
    /// The outcome is delivered exactly once through the returned channel.
    pub fn spawn(self, wait: Duration) -> oneshot::Receiver<Result<Redirect, AuthError>> {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let outcome = match tokio::time::timeout(wait, self.serve()).await {
                Ok(result) => result,
                Err(_) => Err(AuthError::Timeout(wait.as_secs())),
            };
            let _ = tx.send(outcome);
            tracing::debug!("redirect listener closed");
        });
        rx
    }

    async fn serve(self) -> Result<Redirect, AuthError> {
        loop {
            let (mut stream, peer) = self.listener.accept().await?;
            tracing::debug!(%peer, "redirect listener connection");
            let target = match read_request_target(&mut stream).await {
                Ok(Some(target)) => target,
                Ok(None) => {
                    write_response(&mut stream, "400 Bad Request", "").await;
                    continue;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "failed to read redirect request");
                    continue;
                }
            };

            match parse_callback(&target) {
                Some(redirect) => {
                    let page = match redirect {
                        Redirect::Code { .. } => SUCCESS_PAGE,
                        Redirect::Error(_) => FAILURE_PAGE,
                    };
                    write_response(&mut stream, "200 OK", page).await;
                    return Ok(redirect);
                }
                None => write_response(&mut stream, "404 Not Found", "").await,
            }
        }
    }
}

async fn read_request_target(stream: &mut TcpStream) -> std::io::Result<Option<String>> {
    let mut head = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") && head.len() < MAX_REQUEST_HEAD {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        head.extend_from_slice(&chunk[..read]);
    }

    let text = String::from_utf8_lossy(&head);
    let Some(request_line) = text.lines().next() else {
        return Ok(None);
    };
    let mut parts = request_line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("GET"), Some(target)) => Ok(Some(target.to_string())),
        _ => Ok(None),
    }
}

async fn write_response(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    if let Err(err) = stream.write_all(response.as_bytes()).await {
        tracing::warn!(error = %err, "failed to answer redirect request");
    }
    let _ = stream.shutdown().await;
}

pub fn authorize_url(config: &OAuthConfig, state: &str, redirect_uri: &str) -> Option<Url> {
    let mut url = Url::parse(&config.authorize_url).ok()?;
    url.query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("scope", &config.scope)
        .append_pair("state", state)
        .append_pair("redirect_uri", redirect_uri);
    Some(url)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

pub async fn exchange_code(
    config: &OAuthConfig,
    code: &str,
    redirect_uri: &str,
) -> Result<String, AuthError> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("client_id", &config.client_id)
        .append_pair("client_secret", &config.client_secret)
        .append_pair("code", code)
        .append_pair("redirect_uri", redirect_uri)
        .finish();

    let response = reqwest::Client::new()
        .post(&config.token_url)
        .header(
            reqwest::header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        )
        .body(body)
        .send()
        .await?
        .error_for_status()?;
    let token: TokenResponse = response.json().await?;
    Ok(token.access_token)
}

/// Full browser flow; returns the access token.
pub async fn login(config: &OAuthConfig) -> Result<String, AuthError> {
    if config.client_id.is_empty() || config.client_secret.is_empty() {
        return Err(AuthError::MissingClient);
    }

    let listener = RedirectListener::bind(config.redirect_port).await?;
    let redirect_uri = listener.redirect_uri();
    let state = uuid::Uuid::new_v4().to_string();
    let url = authorize_url(config, &state, &redirect_uri).ok_or(AuthError::MissingClient)?;

    let outcome = listener.spawn(REDIRECT_WAIT);
    println!("Opening the browser to authorize tasklane:\n  {url}");
    if let Err(err) = open::that(url.as_str()) {
        tracing::warn!(error = %err, "could not open browser");
        println!("Open the URL above manually.");
    }

    let redirect = outcome
        .await
        .map_err(|_| AuthError::Timeout(REDIRECT_WAIT.as_secs()))??;
    match redirect {
        Redirect::Error(reason) => Err(AuthError::Denied(reason)),
        Redirect::Code {
            state: returned, ..
        } if returned.as_deref() != Some(state.as_str()) => Err(AuthError::StateMismatch),
        Redirect::Code { code, .. } => {
            tracing::info!("authorization code received");
            exchange_code(config, &code, &redirect_uri).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_with_code_and_state() {
        assert_eq!(
            parse_callback("/callback?code=abc&state=xyz"),
            Some(Redirect::Code {
                code: "abc".into(),
                state: Some("xyz".into())
            })
        );
    }

    #[test]
    fn callback_with_error_wins_over_code() {
        assert_eq!(
            parse_callback("/callback?error=access_denied&code=abc"),
            Some(Redirect::Error("access_denied".into()))
        );
    }

    #[test]
    fn unrelated_paths_are_ignored() {
        assert_eq!(parse_callback("/favicon.ico"), None);
        assert_eq!(parse_callback("/callback"), None);
    }

    #[test]
    fn authorize_url_carries_state_and_redirect() {
        let config = OAuthConfig {
            client_id: "cid".into(),
            ..OAuthConfig::default()
        };
        let url = authorize_url(&config, "s1", "http://127.0.0.1:1/callback").expect("url");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client_id".into(), "cid".into())));
        assert!(pairs.contains(&("state".into(), "s1".into())));
        assert!(pairs.contains(&("redirect_uri".into(), "http://127.0.0.1:1/callback".into())));
    }

    #[tokio::test]
    async fn login_without_client_is_rejected() {
        let result = login(&OAuthConfig::default()).await;
        assert!(matches!(result, Err(AuthError::MissingClient)));
    }
}
