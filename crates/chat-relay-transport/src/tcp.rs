//! TCP transport: line-delimited JSON over a socket.

use std::{net::SocketAddr, sync::Arc};

use chat_relay_session::Relay;
use tokio::{
    io::BufReader,
    net::{
        TcpListener, TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
};

use crate::{LineSink, LineSource};

/// Split a socket into relay transport halves.
#[must_use]
pub fn split_tcp(stream: TcpStream) -> (LineSource<BufReader<OwnedReadHalf>>, LineSink<OwnedWriteHalf>) {
    let (reader, writer) = stream.into_split();
    (
        LineSource::new(BufReader::new(reader)),
        LineSink::new(writer),
    )
}

/// Accept connections forever, one relay session per socket.
///
/// Accept errors are logged and the loop continues. Stop it by dropping the
/// future (e.g. from a `select!` against a shutdown signal).
pub async fn serve_tcp(listener: TcpListener, relay: Arc<Relay>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => spawn_session(stream, peer, &relay),
            Err(error) => tracing::warn!(?error, "failed to accept connection"),
        }
    }
}

fn spawn_session(stream: TcpStream, peer: SocketAddr, relay: &Arc<Relay>) {
    if let Err(error) = stream.set_nodelay(true) {
        tracing::debug!(%peer, ?error, "failed to set TCP_NODELAY");
    }
    let relay = Arc::clone(relay);
    tokio::spawn(async move {
        let (source, sink) = split_tcp(stream);
        relay.serve_connection(peer.to_string(), source, sink).await;
    });
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::{
        line::{read_frame, write_frame},
        protocol::{ClientMessage, ServerMessage},
    };

    const WAIT: Duration = Duration::from_secs(5);

    async fn connect(addr: SocketAddr) -> (BufReader<OwnedReadHalf>, OwnedWriteHalf) {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        (BufReader::new(reader), writer)
    }

    async fn next(reader: &mut BufReader<OwnedReadHalf>) -> String {
        let frame: ServerMessage = timeout(WAIT, read_frame(reader))
            .await
            .expect("delivery stalled")
            .unwrap()
            .expect("server closed connection");
        let ServerMessage::Chat { message } = frame;
        message
    }

    #[tokio::test]
    async fn test_relays_between_tcp_clients() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let relay = Arc::new(Relay::default());
        let server = tokio::spawn(serve_tcp(listener, Arc::clone(&relay)));

        let (mut a_rx, mut a_tx) = connect(addr).await;
        write_frame(&mut a_tx, &ClientMessage::chat("m1")).await.unwrap();
        write_frame(&mut a_tx, &ClientMessage::chat("m2")).await.unwrap();
        assert_eq!(next(&mut a_rx).await, "m1");
        assert_eq!(next(&mut a_rx).await, "m2");

        let (mut b_rx, mut b_tx) = connect(addr).await;
        assert_eq!(next(&mut b_rx).await, "m1");
        assert_eq!(next(&mut b_rx).await, "m2");

        write_frame(&mut b_tx, &ClientMessage::chat("hi")).await.unwrap();
        assert_eq!(next(&mut a_rx).await, "hi");
        assert_eq!(next(&mut b_rx).await, "hi");

        server.abort();
    }
}
