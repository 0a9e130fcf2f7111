//! WebSocket接続
//!
//! 接続はチャネルの組（送信/受信）として扱う。
//! 実装は `tokio-tungstenite`。テストではメモリ上の偽物に差し替える。

use futures::future::BoxFuture;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::error::{Result, StudioError};

/// クライアント→サーバー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Close,
}

/// サーバー→クライアント
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Error(String),
    Closed,
}

/// 開いた接続
pub struct SocketChannels {
    pub outbound: mpsc::UnboundedSender<Outbound>,
    pub inbound: mpsc::UnboundedReceiver<Inbound>,
    /// 送信ポンプ。`Outbound::Close` を受けるとクローズフレームを送って終わる
    pub writer: Option<JoinHandle<()>>,
    /// 受信ポンプ
    pub reader: Option<JoinHandle<()>>,
}

pub trait Connector: Send + Sync {
    /// 接続を開く。返った時点で接続は開いている
    fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<SocketChannels>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<SocketChannels>> {
        Box::pin(async move {
            let (socket, _) = tokio_tungstenite::connect_async(url)
                .await
                .map_err(|e| StudioError::Stream(e.to_string()))?;
            tracing::debug!("websocket opened: {}", url);

            let (mut write, mut read) = socket.split();
            let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Outbound>();
            let (in_tx, in_rx) = mpsc::unbounded_channel::<Inbound>();

            let writer_events = in_tx.clone();
            let writer = tokio::spawn(async move {
                while let Some(message) = out_rx.recv().await {
                    match message {
                        Outbound::Text(text) => {
                            if let Err(e) = write.send(Message::Text(text)).await {
                                let _ = writer_events.send(Inbound::Error(e.to_string()));
                                return;
                            }
                        }
                        Outbound::Close => break,
                    }
                }
                let _ = write.close().await;
            });

            let reader = tokio::spawn(async move {
                while let Some(item) = read.next().await {
                    let event = match item {
                        Ok(Message::Text(text)) => Inbound::Text(text),
                        Ok(Message::Close(_)) => break,
                        Ok(_) => continue,
                        Err(e) => Inbound::Error(e.to_string()),
                    };
                    let failed = matches!(event, Inbound::Error(_));
                    if in_tx.send(event).is_err() || failed {
                        return;
                    }
                }
                let _ = in_tx.send(Inbound::Closed);
            });

            Ok(SocketChannels {
                outbound: out_tx,
                inbound: in_rx,
                writer: Some(writer),
                reader: Some(reader),
            })
        })
    }
}
