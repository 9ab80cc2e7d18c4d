use std::future::Future;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::SinkExt;
use futures::stream::SplitSink;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Error, Debug)]
pub enum SendError {
    #[error("connection closed")]
    Closed,
    #[error("send timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<axum::Error> for SendError {
    fn from(error: axum::Error) -> Self {
        SendError::Transport(error.to_string())
    }
}

/// One open live-update connection, as seen by the registry and broadcaster.
pub trait Subscriber: Send + Sync + 'static {
    /// Push one text payload to the client.
    fn send_text(&self, text: &str) -> impl Future<Output = Result<(), SendError>> + Send;

    /// Close the underlying connection.
    fn close(&self) -> impl Future<Output = Result<(), SendError>> + Send;
}

/// Write half of an accepted WebSocket.
///
/// The read half stays with the endpoint's receive loop.
pub struct WsSubscriber {
    sink: Mutex<SplitSink<WebSocket, Message>>,
}

impl WsSubscriber {
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }
}

impl Subscriber for WsSubscriber {
    async fn send_text(&self, text: &str) -> Result<(), SendError> {
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(text.to_owned())).await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), SendError> {
        let mut sink = self.sink.lock().await;
        sink.close().await?;
        Ok(())
    }
}
