//! 結合テスト用の偽サーバーと偽実装

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use gesture_studio::api::GestureSink;
use gesture_studio::events::{EventReceiver, SessionEvent};
use gesture_studio::stream::{Connector, Inbound, Outbound, SocketChannels};
use gesture_studio::{Result, StudioError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// スタブサーバーが受け取ったリクエスト
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

pub fn http_response(status: u16, body: &str) -> String {
    format!(
        "HTTP/1.1 {} STUB\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    )
}

/// 接続ごとに `responses` を順番に返すHTTPスタブ
pub async fn serve_sequence(
    responses: Vec<String>,
) -> (String, mpsc::UnboundedReceiver<RecordedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        for response in responses {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            if let Some(request) = read_request(&mut stream).await {
                let _ = tx.send(request);
            }
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });

    (format!("http://{}", addr), rx)
}

async fn read_request(stream: &mut tokio::net::TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        if name == "content-length" {
            content_length = value.trim().parse().unwrap_or(0);
        } else if name == "authorization" {
            authorization = Some(value.trim().to_string());
        }
    }

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body_end = buf.len().min(header_end + content_length);
    Some(RecordedRequest {
        method,
        path,
        authorization,
        body: String::from_utf8_lossy(&buf[header_end..body_end]).to_string(),
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// サーバー側の端（クライアントからの受信 / クライアントへの送信）
pub type ServerEnd = (
    mpsc::UnboundedReceiver<Outbound>,
    mpsc::UnboundedSender<Inbound>,
);

/// 接続ごとにサーバー側の端をテストへ渡す偽コネクタ
pub struct FakeConnector {
    servers: mpsc::UnboundedSender<ServerEnd>,
    refuse: bool,
    hang: bool,
}

impl FakeConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ServerEnd>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                servers: tx,
                refuse: false,
                hang: false,
            }),
            rx,
        )
    }

    pub fn refusing() -> Arc<Self> {
        let (tx, _) = mpsc::unbounded_channel();
        Arc::new(Self {
            servers: tx,
            refuse: true,
            hang: false,
        })
    }

    /// ハンドシェイクが終わらないコネクタ
    pub fn hanging() -> Arc<Self> {
        let (tx, _) = mpsc::unbounded_channel();
        Arc::new(Self {
            servers: tx,
            refuse: false,
            hang: true,
        })
    }
}

impl Connector for FakeConnector {
    fn connect<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<SocketChannels>> {
        Box::pin(async move {
            if self.refuse {
                return Err(StudioError::Stream("connection refused".into()));
            }
            if self.hang {
                std::future::pending::<()>().await;
            }
            let (out_tx, out_rx) = mpsc::unbounded_channel();
            let (in_tx, in_rx) = mpsc::unbounded_channel();
            let _ = self.servers.send((out_rx, in_tx));
            Ok(SocketChannels {
                outbound: out_tx,
                inbound: in_rx,
                writer: None,
                reader: None,
            })
        })
    }
}

/// 保存呼び出しを記録する
#[derive(Default)]
pub struct RecordingSink {
    pub calls: Mutex<Vec<(String, String, Vec<String>)>>,
    fail_with: Option<String>,
}

impl RecordingSink {
    /// 保存がサーバーエラーになるシンク
    pub fn failing(detail: &str) -> Self {
        Self {
            calls: Mutex::default(),
            fail_with: Some(detail.to_string()),
        }
    }

    pub fn calls(&self) -> Vec<(String, String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl GestureSink for RecordingSink {
    fn save_gesture<'a>(
        &'a self,
        gesture_name: &'a str,
        action: &'a str,
        frames: &'a [String],
    ) -> BoxFuture<'a, Result<String>> {
        self.calls.lock().unwrap().push((
            gesture_name.to_string(),
            action.to_string(),
            frames.to_vec(),
        ));
        let result = match &self.fail_with {
            Some(detail) => Err(StudioError::Server(detail.clone())),
            None => Ok(format!("{} frames saved", frames.len() * 6)),
        };
        Box::pin(async move { result })
    }
}

/// 受信済みのイベントをすべて取り出す
pub fn drain(rx: &mut EventReceiver) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn frames(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("data:image/jpeg;base64,frame{}", i))
        .collect()
}
