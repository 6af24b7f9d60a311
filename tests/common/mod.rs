//! Common test utilities and fixtures.

use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use trapper_lib::protocol::{encode_frame, receive};

pub const SUCCESS_REPLY: &[u8] =
    br#"{"response":"success","info":"processed: 1; failed: 0; total: 1; seconds spent: 0.000010"}"#;

/// A collector stand-in that decodes every request and answers with a
/// fixed success frame.
pub struct FakeCollector {
    pub addr: String,
    requests: mpsc::UnboundedReceiver<serde_json::Value>,
}

impl FakeCollector {
    pub async fn start(compress_reply: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (tx, requests) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let tx = tx.clone();
                tokio::spawn(async move {
                    let Ok(body) = receive(&mut socket).await else {
                        return;
                    };
                    if let Ok(value) = serde_json::from_slice(&body) {
                        let _ = tx.send(value);
                    }
                    let reply = encode_frame(SUCCESS_REPLY, compress_reply).unwrap();
                    let _ = socket.write_all(&reply).await;
                });
            }
        });

        Self { addr, requests }
    }

    /// Wait for the next decoded request.
    pub async fn next_request(&mut self, wait: Duration) -> Option<serde_json::Value> {
        tokio::time::timeout(wait, self.requests.recv()).await.ok().flatten()
    }
}
