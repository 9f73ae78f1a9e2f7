//! Server network layer: TCP accept loop, per-connection tasks and event dispatch

use crate::config::ServerConfig;
use crate::game::{GameSession, Outgoing};
use crate::player::ConnectionId;
use log::{debug, error, info, warn};
use plantation_shared::{FrameDecoder, Packet, ProtocolError};
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

const READ_CHUNK: usize = 4096;

/// Messages sent from connection tasks and the operator console to the main loop
#[derive(Debug)]
pub enum ServerEvent {
    PacketReceived {
        connection: ConnectionId,
        packet: Packet,
    },
    Malformed {
        connection: ConnectionId,
        error: ProtocolError,
    },
    Disconnected {
        connection: ConnectionId,
    },
    ForceStart,
    Shutdown,
}

/// Main server owning the game session and routing packets to connections
pub struct Server {
    listener: TcpListener,
    session: GameSession,
    /// Outbound queue of every open connection
    connections: HashMap<ConnectionId, mpsc::UnboundedSender<Packet>>,
    next_connection_id: ConnectionId,
    max_frame_len: usize,

    server_tx: mpsc::UnboundedSender<ServerEvent>,
    server_rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl Server {
    pub async fn new(config: &ServerConfig) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(config.bind_address()).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener,
            session: GameSession::new(config),
            connections: HashMap::new(),
            next_connection_id: 1,
            max_frame_len: config.max_frame_len,
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle for injecting operator commands such as [`ServerEvent::ForceStart`].
    pub fn command_sender(&self) -> mpsc::UnboundedSender<ServerEvent> {
        self.server_tx.clone()
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// Main server loop. Runs until a [`ServerEvent::Shutdown`] arrives.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!("Server started, waiting for players");

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => self.register_connection(stream, addr),
                        Err(e) => error!("Failed to accept connection: {}", e),
                    }
                },

                event = self.server_rx.recv() => {
                    match event {
                        Some(ServerEvent::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                        Some(event) => self.handle_event(event),
                    }
                },
            }
        }

        Ok(())
    }

    /// Spawns the reader and writer tasks of a freshly accepted connection
    fn register_connection(&mut self, stream: TcpStream, addr: SocketAddr) {
        let connection = self.next_connection_id;
        self.next_connection_id += 1;
        info!("Connection {} accepted from {}", connection, addr);

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not disable Nagle on connection {}: {}", connection, e);
        }

        let (reader, writer) = stream.into_split();
        let (packet_tx, packet_rx) = mpsc::unbounded_channel();
        self.connections.insert(connection, packet_tx);

        let server_tx = self.server_tx.clone();
        let max_frame_len = self.max_frame_len;
        tokio::spawn(async move {
            if let Err(e) = read_connection(reader, connection, max_frame_len, &server_tx).await {
                warn!("Connection {} failed: {}", connection, e);
            }
            if server_tx
                .send(ServerEvent::Disconnected { connection })
                .is_err()
            {
                debug!("Main loop gone before connection {} closed", connection);
            }
        });

        tokio::spawn(write_connection(writer, connection, packet_rx));
    }

    fn handle_event(&mut self, event: ServerEvent) {
        let deliveries = match event {
            ServerEvent::PacketReceived { connection, packet } => {
                debug!("Connection {} sent {}", connection, packet.kind());
                self.session.handle_packet(connection, packet)
            }
            ServerEvent::Malformed { connection, error } => {
                self.session.handle_malformed(connection, &error)
            }
            ServerEvent::Disconnected { connection } => {
                self.connections.remove(&connection);
                info!("Connection {} closed", connection);
                self.session.handle_disconnect(connection)
            }
            ServerEvent::ForceStart => self.session.force_start(),
            ServerEvent::Shutdown => Vec::new(),
        };

        self.deliver(deliveries);
    }

    /// Queues each packet on its connection's writer
    fn deliver(&self, deliveries: Vec<Outgoing>) {
        for Outgoing { connection, packet } in deliveries {
            match self.connections.get(&connection) {
                Some(tx) => {
                    if tx.send(packet).is_err() {
                        debug!("Writer of connection {} already stopped", connection);
                    }
                }
                None => debug!("Dropping {} for closed connection {}", packet.kind(), connection),
            }
        }
    }
}

/// Decodes a frame payload, accepting only packets a client may send.
pub fn decode_request(payload: Vec<u8>) -> Result<Packet, ProtocolError> {
    let packet = Packet::from_payload(payload)?;
    if !packet.kind().is_client_request() {
        return Err(ProtocolError::UnexpectedKind(packet.kind()));
    }
    Ok(packet)
}

/// Reads frames from one connection until EOF, forwarding each as an event.
///
/// Bytes may arrive in any chunking. A frame longer than `max_frame_len`
/// fails the connection with `InvalidData`.
pub async fn read_connection<R>(
    mut reader: R,
    connection: ConnectionId,
    max_frame_len: usize,
    events: &mpsc::UnboundedSender<ServerEvent>,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut decoder = FrameDecoder::new(max_frame_len);
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let read = reader.read(&mut chunk).await?;
        if read == 0 {
            if decoder.buffered() > 0 {
                debug!(
                    "Connection {} closed with {} bytes of an unfinished frame",
                    connection,
                    decoder.buffered()
                );
            }
            return Ok(());
        }
        decoder.extend(&chunk[..read]);

        while let Some(payload) = decoder
            .next_frame()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
        {
            let event = match decode_request(payload) {
                Ok(packet) => ServerEvent::PacketReceived { connection, packet },
                Err(error) => ServerEvent::Malformed { connection, error },
            };
            if events.send(event).is_err() {
                return Ok(());
            }
        }
    }
}

/// Writes queued packets to one connection until its queue closes.
pub async fn write_connection<W>(
    mut writer: W,
    connection: ConnectionId,
    mut packets: mpsc::UnboundedReceiver<Packet>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(packet) = packets.recv().await {
        let frame = match packet.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode {} for connection {}: {}", packet.kind(), connection, e);
                continue;
            }
        };

        if let Err(e) = writer.write_all(&frame).await {
            warn!("Failed to write to connection {}: {}", connection, e);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plantation_shared::{encode_frame, EndTurnRequest, JoinRequest};

    fn join_frame(nickname: &str) -> Vec<u8> {
        encode_frame(&format!(r#"JOIN|{{"nickname":"{}","contact":""}}"#, nickname))
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_reader_reassembles_split_frames() {
        let frame = join_frame("Ann");
        let (head, tail) = frame.split_at(3);
        let mock = tokio_test::io::Builder::new().read(head).read(tail).build();
        let (tx, mut rx) = mpsc::unbounded_channel();

        read_connection(mock, 7, 1024, &tx).await.unwrap();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        match &events[0] {
            ServerEvent::PacketReceived { connection, packet } => {
                assert_eq!(*connection, 7);
                assert_eq!(
                    packet,
                    &Packet::Join(JoinRequest {
                        nickname: "Ann".into(),
                        contact: String::new(),
                    })
                );
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reader_handles_several_frames_in_one_chunk() {
        let mut bytes = join_frame("Ann");
        bytes.extend(encode_frame("END_TURN|{}"));
        bytes.extend(encode_frame("END_TURN|"));
        let mock = tokio_test::io::Builder::new().read(&bytes).build();
        let (tx, mut rx) = mpsc::unbounded_channel();

        read_connection(mock, 1, 1024, &tx).await.unwrap();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 3);
        for event in &events[1..] {
            match event {
                ServerEvent::PacketReceived { packet, .. } => {
                    assert_eq!(packet, &Packet::EndTurn(EndTurnRequest {}));
                }
                other => panic!("Unexpected event: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_reader_reports_malformed_and_keeps_going() {
        let mut bytes = encode_frame("BUILD|{not json");
        bytes.extend(encode_frame(r#"RESPONSE|{"success":true,"message":""}"#));
        bytes.extend(encode_frame("TELEPORT|{}"));
        bytes.extend(join_frame("Bob"));
        let mock = tokio_test::io::Builder::new().read(&bytes).build();
        let (tx, mut rx) = mpsc::unbounded_channel();

        read_connection(mock, 2, 1024, &tx).await.unwrap();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 4);
        assert!(matches!(
            events[0],
            ServerEvent::Malformed { error: ProtocolError::MalformedPayload { .. }, .. }
        ));
        assert!(matches!(
            events[1],
            ServerEvent::Malformed { error: ProtocolError::UnexpectedKind(_), .. }
        ));
        assert!(matches!(
            events[2],
            ServerEvent::Malformed { error: ProtocolError::UnknownKind(_), .. }
        ));
        assert!(matches!(events[3], ServerEvent::PacketReceived { .. }));
    }

    #[tokio::test]
    async fn test_reader_rejects_oversized_frame() {
        let frame = encode_frame(&format!("JOIN|{}", "x".repeat(64)));
        let mock = tokio_test::io::Builder::new().read(&frame[..4]).build();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let err = read_connection(mock, 3, 16, &tx).await.unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_reader_ignores_trailing_partial_frame() {
        let frame = join_frame("Cid");
        let mock = tokio_test::io::Builder::new()
            .read(&frame[..frame.len() - 1])
            .build();
        let (tx, mut rx) = mpsc::unbounded_channel();

        read_connection(mock, 4, 1024, &tx).await.unwrap();
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_writer_frames_every_packet() {
        let first = Packet::response(true, "Подключено");
        let second = Packet::response(false, "Не ваш ход");
        let mock = tokio_test::io::Builder::new()
            .write(&first.to_frame().unwrap())
            .write(&second.to_frame().unwrap())
            .build();
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send(first).unwrap();
        tx.send(second).unwrap();
        drop(tx);

        write_connection(mock, 1, rx).await;
    }

    #[test]
    fn test_decode_request_accepts_client_kinds_only() {
        let join = "JOIN|{}".as_bytes().to_vec();
        assert!(matches!(decode_request(join), Ok(Packet::Join(_))));

        let state = r#"TURN_ENDED|{"playerId":1,"nextPlayerId":2}"#.as_bytes().to_vec();
        assert!(matches!(
            decode_request(state),
            Err(ProtocolError::UnexpectedKind(_))
        ));

        assert!(matches!(
            decode_request(vec![0xff, 0xfe]),
            Err(ProtocolError::InvalidUtf8(_))
        ));
    }

    #[tokio::test]
    async fn test_server_binds_ephemeral_port() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..ServerConfig::default()
        };
        let server = Server::new(&config).await.unwrap();

        assert_ne!(server.local_addr().unwrap().port(), 0);
        assert_eq!(server.session().registry().len(), 0);
    }
}
