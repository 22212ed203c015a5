use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use url::Url;

use tasklane::auth::{Redirect, RedirectListener};
use tasklane::error::AuthError;

async fn get(port: u16, target: &str) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", port))
        .await
        .expect("connect");
    let request = format!("GET {target} HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n");
    stream
        .write_all(request.as_bytes())
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    response
}

fn port_of(uri: &str) -> u16 {
    Url::parse(uri)
        .expect("redirect uri")
        .port()
        .expect("explicit port")
}

#[tokio::test]
async fn delivers_code_and_state_once() {
    let listener = RedirectListener::bind(0).await.expect("bind");
    let uri = listener.redirect_uri();
    assert!(uri.ends_with("/callback"));
    let port = port_of(&uri);
    let outcome = listener.spawn(Duration::from_secs(5));

    let stray = get(port, "/favicon.ico").await;
    assert!(stray.starts_with("HTTP/1.1 404"));

    let response = get(port, "/callback?code=abc&state=xyz").await;
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.contains("authorized"));

    let redirect = outcome.await.expect("sender kept").expect("redirect");
    assert_eq!(
        redirect,
        Redirect::Code {
            code: "abc".into(),
            state: Some("xyz".into()),
        }
    );
}

#[tokio::test]
async fn provider_error_is_passed_through() {
    let listener = RedirectListener::bind(0).await.expect("bind");
    let port = port_of(&listener.redirect_uri());
    let outcome = listener.spawn(Duration::from_secs(5));

    let response = get(port, "/callback?error=access_denied").await;
    assert!(response.contains("Authorization failed"));
    let redirect = outcome.await.expect("sender kept").expect("redirect");
    assert_eq!(redirect, Redirect::Error("access_denied".into()));
}

#[tokio::test]
async fn gives_up_after_the_wait() {
    let listener = RedirectListener::bind(0).await.expect("bind");
    let outcome = listener.spawn(Duration::from_millis(50));
    let result = outcome.await.expect("sender kept");
    assert!(matches!(result, Err(AuthError::Timeout(0))));
}
