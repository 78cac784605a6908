//! Draft and send calls against a recording double and a local HTTP stub.

#![allow(clippy::unwrap_used, clippy::significant_drop_tightening)]

use chrono::{Duration, Utc};
use mygmail_api::{
    Draft, Error, GmailApi, GmailService, MessageRef, RawMessage, Result, USER_ME, create_draft,
    create_message, send_message,
};
use mygmail_oauth::{Credentials, OAuthClient, Provider, Token, TokenStore};
use std::sync::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<(&'static str, String, RawMessage)>>,
    fail: bool,
}

impl Recorder {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn record(&self, call: &'static str, user_id: &str, message: &RawMessage) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((call, user_id.to_string(), message.clone()));
        if self.fail {
            return Err(Error::Api {
                status: 403,
                message: "Insufficient Permission".to_string(),
            });
        }
        Ok(())
    }
}

impl GmailApi for Recorder {
    async fn create_draft(&self, user_id: &str, message: &RawMessage) -> Result<Draft> {
        self.record("draft", user_id, message)?;
        Ok(Draft {
            id: "r-1".to_string(),
            message: MessageRef {
                id: "m-1".to_string(),
                ..MessageRef::default()
            },
        })
    }

    async fn send_message(&self, user_id: &str, message: &RawMessage) -> Result<MessageRef> {
        self.record("send", user_id, message)?;
        Ok(MessageRef {
            id: "m-2".to_string(),
            thread_id: Some("t-2".to_string()),
            label_ids: vec!["SENT".to_string()],
        })
    }
}

fn message() -> RawMessage {
    create_message("sender@example.com", "recipient@example.com", "Hi", "Hello world!").unwrap()
}

#[tokio::test]
async fn draft_is_returned_and_recorded() {
    let recorder = Recorder::default();
    let raw = message();
    let draft = create_draft(&recorder, USER_ME, &raw).await.unwrap().unwrap();

    assert_eq!(draft.id, "r-1");
    let calls = recorder.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "draft");
    assert_eq!(calls[0].1, "me");
    assert_eq!(calls[0].2, raw);
}

#[tokio::test]
async fn send_returns_message_ref() {
    let recorder = Recorder::default();
    let sent = send_message(&recorder, "someone@example.com", &message())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(sent.id, "m-2");
    assert_eq!(recorder.calls.lock().unwrap()[0].1, "someone@example.com");
}

#[tokio::test]
async fn api_failures_become_none() {
    let recorder = Recorder::failing();
    assert!(create_draft(&recorder, USER_ME, &message()).await.unwrap().is_none());
    assert!(send_message(&recorder, USER_ME, &message()).await.unwrap().is_none());
    assert_eq!(recorder.calls.lock().unwrap().len(), 2);
}

/// Serves one HTTP request with `status` and `body`, handing back the raw
/// request text.
async fn stub(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}/gmail/v1", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request).to_string();
            if let Some((head, rest)) = text.split_once("\r\n\r\n") {
                let length = head
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if rest.len() >= length {
                    break;
                }
            }
            if n == 0 {
                break;
            }
        }

        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        String::from_utf8_lossy(&request).to_string()
    });

    (base, handle)
}

fn service_with(dir: &tempfile::TempDir, base: &str, token: Token) -> GmailService {
    let credentials = Credentials::new(
        OAuthClient::new("client-id", Provider::google().unwrap()),
        TokenStore::new(dir.path().join("token.json")),
        token,
    );
    GmailService::new(credentials, "mygmail-test")
        .unwrap()
        .with_base_url(base)
}

fn service(dir: &tempfile::TempDir, base: &str) -> GmailService {
    let token = Token::new("ya29.test-token", "Bearer")
        .with_expires_at(Utc::now() + Duration::seconds(3600));
    service_with(dir, base, token)
}

#[tokio::test]
async fn service_posts_draft_with_bearer_token() {
    let (base, handle) = stub(
        "200 OK",
        r#"{"id":"r-9","message":{"id":"m-9","threadId":"t-9","labelIds":["DRAFT"]}}"#,
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let service = service(&dir, &base);

    let draft = service.create_draft(USER_ME, &RawMessage::new("SGk=")).await.unwrap();
    assert_eq!(draft.id, "r-9");
    assert_eq!(draft.message.label_ids, vec!["DRAFT"]);

    let request = handle.await.unwrap();
    assert!(request.starts_with("POST /gmail/v1/users/me/drafts HTTP/1.1"));
    assert!(request.to_lowercase().contains("authorization: bearer ya29.test-token"));
    assert!(request.to_lowercase().contains("user-agent: mygmail-test"));
    assert!(request.ends_with(r#"{"message":{"raw":"SGk="}}"#));
}

#[tokio::test]
async fn service_posts_send() {
    let (base, handle) = stub("200 OK", r#"{"id":"m-5","threadId":"t-5"}"#).await;
    let dir = tempfile::tempdir().unwrap();
    let service = service(&dir, &base);

    let sent = service.send_message(USER_ME, &RawMessage::new("SGk=")).await.unwrap();
    assert_eq!(sent.id, "m-5");

    let request = handle.await.unwrap();
    assert!(request.starts_with("POST /gmail/v1/users/me/messages/send HTTP/1.1"));
    assert!(request.ends_with(r#"{"raw":"SGk="}"#));
}

#[tokio::test]
async fn service_reports_api_errors() {
    let (base, handle) = stub(
        "400 Bad Request",
        r#"{"error":{"code":400,"message":"Invalid To header","status":"INVALID_ARGUMENT"}}"#,
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let service = service(&dir, &base);

    let err = service
        .send_message(USER_ME, &RawMessage::new("SGk="))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Api { status: 400, ref message } if message == "Invalid To header"
    ));
    handle.await.unwrap();
}

#[tokio::test]
async fn send_message_helper_returns_none_on_http_error() {
    let (base, handle) = stub("500 Internal Server Error", "oops").await;
    let dir = tempfile::tempdir().unwrap();
    let service = service(&dir, &base);

    assert!(send_message(&service, USER_ME, &message()).await.unwrap().is_none());
    handle.await.unwrap();
}

#[tokio::test]
async fn unrefreshable_credential_is_an_error_not_none() {
    let dir = tempfile::tempdir().unwrap();
    let stale = Token::new("ya29.stale", "Bearer")
        .with_expires_at(Utc::now() - Duration::seconds(3600));
    // Nothing listens here; the token check fails before any request
    let service = service_with(&dir, "http://127.0.0.1:9/gmail/v1", stale);

    let err = send_message(&service, USER_ME, &message()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Auth(mygmail_oauth::Error::NoRefreshToken)
    ));
    assert!(create_draft(&service, USER_ME, &message()).await.is_err());
}
