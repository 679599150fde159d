//! Loopback stand-in for the identity platform's endpoints.

#![allow(dead_code, clippy::unwrap_used)]

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Answers one connection per scripted reply, in order, and records each
/// request body. The request path is ignored.
pub struct StubProvider {
    pub authority: String,
    handle: JoinHandle<Vec<String>>,
}

impl StubProvider {
    pub async fn start(replies: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let authority = format!("http://{}/tenant-1", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let mut bodies = Vec::new();
            for (status, body) in replies {
                let (mut socket, _) = listener.accept().await.unwrap();
                bodies.push(read_body(&mut socket).await);
                let response = format!(
                    "HTTP/1.1 {status} Stub\r\n\
                     Content-Type: application/json\r\n\
                     Content-Length: {}\r\n\
                     Connection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
            bodies
        });

        Self { authority, handle }
    }

    /// Bodies of the requests served so far; waits for every reply to be used.
    pub async fn requests(self) -> Vec<String> {
        self.handle.await.unwrap()
    }
}

async fn read_body(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            return String::from_utf8_lossy(&buf).into_owned();
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(head_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
        let length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        let body_start = head_end + 4;
        if buf.len() >= body_start + length {
            return String::from_utf8_lossy(&buf[body_start..body_start + length]).into_owned();
        }
    }
}

/// A `400` reply in the identity platform's error format.
pub fn refusal(error: &str, description: &str, correlation_id: &str) -> (u16, String) {
    (
        400,
        serde_json::json!({
            "error": error,
            "error_description": description,
            "error_codes": [70000],
            "correlation_id": correlation_id,
        })
        .to_string(),
    )
}

/// A device code reply that asks for one-second polling.
pub fn device_code() -> (u16, String) {
    (
        200,
        serde_json::json!({
            "device_code": "dc-1",
            "user_code": "ABCD-1234",
            "verification_uri": "https://microsoft.com/devicelogin",
            "expires_in": 60,
            "interval": 1,
            "message": "To sign in, enter ABCD-1234",
        })
        .to_string(),
    )
}

/// A token reply; `id_token` names `ops@contoso.com` with account key `o-1.t-1`.
pub fn token(access_token: &str, refresh_token: Option<&str>) -> (u16, String) {
    let mut body = serde_json::json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": 3600,
        "id_token": "eyJhbGciOiJub25lIn0.eyJwcmVmZXJyZWRfdXNlcm5hbWUiOiJvcHNAY29udG9zby5jb20iLCJvaWQiOiJvLTEiLCJ0aWQiOiJ0LTEifQ.sig",
    });
    if let Some(refresh) = refresh_token {
        body["refresh_token"] = refresh.into();
    }
    (200, body.to_string())
}
