//! WebSocket transport for browser clients.

use std::{io, net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use axum::{
    Router,
    extract::{
        ConnectInfo, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use chat_relay_core::{ChatMessage, MessageSink, MessageSource, TransportError};
use chat_relay_session::Relay;
use futures::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::protocol::{ClientMessage, ServerMessage, decode, encode};

/// Inbound half of a WebSocket. One JSON frame per text message.
pub struct WsSource {
    stream: SplitStream<WebSocket>,
}

impl WsSource {
    #[must_use]
    pub const fn new(stream: SplitStream<WebSocket>) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl MessageSource for WsSource {
    async fn recv(&mut self) -> Result<Option<ChatMessage>, TransportError> {
        while let Some(msg) = self.stream.next().await {
            let text = match msg.map_err(io::Error::other)? {
                Message::Text(t) => t.as_str().to_owned(),
                Message::Binary(data) => match String::from_utf8(data.to_vec()) {
                    Ok(s) => s,
                    Err(e) => {
                        tracing::warn!("Invalid client message: {e}");
                        continue;
                    }
                },
                Message::Close(_) => return Ok(None),
                Message::Ping(_) | Message::Pong(_) => continue,
            };

            match decode::<ClientMessage>(&text) {
                Ok(frame) => return Ok(Some(frame.into())),
                Err(e) => tracing::warn!("Invalid client message: {e}"),
            }
        }
        Ok(None)
    }
}

/// Outbound half of a WebSocket.
pub struct WsSink {
    sink: SplitSink<WebSocket, Message>,
}

impl WsSink {
    #[must_use]
    pub const fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl MessageSink for WsSink {
    async fn send(&mut self, msg: &ChatMessage) -> Result<(), TransportError> {
        let json = encode(&ServerMessage::from(msg))?;
        self.sink
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| TransportError::Io(io::Error::other(e)))
    }
}

/// WebSocket upgrade handler.
///
/// Requires the router to be served with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(relay): State<Arc<Relay>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| async move {
        let (sink, stream) = socket.split();
        relay
            .serve_connection(peer.to_string(), WsSource::new(stream), WsSink::new(sink))
            .await;
    })
}

/// Create the WebSocket router (`GET /ws`).
#[must_use]
pub fn create_ws_router(relay: Arc<Relay>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(relay)
}

/// Serve the WebSocket router on `listener` until the future is dropped.
///
/// # Errors
/// Returns an error if the HTTP server fails.
pub async fn serve_ws(listener: TcpListener, relay: Arc<Relay>) -> io::Result<()> {
    axum::serve(
        listener,
        create_ws_router(relay).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;
    use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite};

    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

    async fn start() -> (SocketAddr, Arc<Relay>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let relay = Arc::new(Relay::default());
        tokio::spawn(serve_ws(listener, Arc::clone(&relay)));
        (addr, relay)
    }

    async fn connect(addr: SocketAddr) -> Client {
        let (ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
        ws
    }

    fn chat_json(message: &str) -> String {
        encode(&ClientMessage::chat(message)).unwrap()
    }

    async fn send_text(ws: &mut Client, text: String) {
        ws.send(tungstenite::Message::Text(text.into())).await.unwrap();
    }

    // Skips control frames; returns the next relayed chat message.
    async fn next_chat(ws: &mut Client) -> String {
        loop {
            let frame = timeout(WAIT, ws.next())
                .await
                .expect("delivery stalled")
                .expect("socket closed")
                .unwrap();
            if let tungstenite::Message::Text(text) = frame {
                let ServerMessage::Chat { message } = decode::<ServerMessage>(text.as_str()).unwrap();
                return message;
            }
        }
    }

    async fn wait_until_no_sessions(relay: &Relay) {
        timeout(WAIT, async {
            while !relay.registry().is_empty().await {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("session still registered");
    }

    #[tokio::test]
    async fn test_relays_between_ws_clients_with_replay() {
        let (addr, _relay) = start().await;

        let mut a = connect(addr).await;
        send_text(&mut a, chat_json("m1")).await;
        assert_eq!(next_chat(&mut a).await, "m1");

        let mut b = connect(addr).await;
        assert_eq!(next_chat(&mut b).await, "m1");

        send_text(&mut b, chat_json("hi")).await;
        assert_eq!(next_chat(&mut a).await, "hi");
        assert_eq!(next_chat(&mut b).await, "hi");
    }

    #[tokio::test]
    async fn test_binary_control_and_malformed_frames() {
        let (addr, relay) = start().await;
        let mut ws = connect(addr).await;

        ws.send(tungstenite::Message::Binary(chat_json("bin").into_bytes().into()))
            .await
            .unwrap();
        ws.send(tungstenite::Message::Ping(b"keepalive".to_vec().into()))
            .await
            .unwrap();
        ws.send(tungstenite::Message::Pong(b"unsolicited".to_vec().into()))
            .await
            .unwrap();
        send_text(&mut ws, "not json".to_owned()).await;
        ws.send(tungstenite::Message::Binary(vec![0xff, 0xfe].into()))
            .await
            .unwrap();
        send_text(&mut ws, chat_json("after")).await;

        assert_eq!(next_chat(&mut ws).await, "bin");
        assert_eq!(next_chat(&mut ws).await, "after");

        let log: Vec<String> = relay
            .log()
            .snapshot(0)
            .iter()
            .map(|m| m.message.clone())
            .collect();
        assert_eq!(log, ["bin", "after"]);
        assert_eq!(relay.registry().len().await, 1);
    }

    #[tokio::test]
    async fn test_close_frame_ends_session() {
        let (addr, relay) = start().await;
        let mut ws = connect(addr).await;

        send_text(&mut ws, chat_json("last")).await;
        assert_eq!(next_chat(&mut ws).await, "last");

        ws.close(None).await.unwrap();
        wait_until_no_sessions(&relay).await;
        assert_eq!(relay.log().len(), 1);
        assert_eq!(relay.log().waiter_count(), 0);
    }
}
