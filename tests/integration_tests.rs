//! Integration tests for the plantation server over real TCP connections
//!
//! Each test boots a server on an ephemeral loopback port and talks to it
//! with raw sockets, exactly as a game client would.

use plantation_server::config::ServerConfig;
use plantation_server::network::{Server, ServerEvent};
use plantation_shared::{
    Archetype, BuildRequest, BuildingType, ChooseArchetype, EndTurnRequest, FrameDecoder,
    JoinRequest, Packet, PacketKind,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

async fn start_server(config: ServerConfig) -> (SocketAddr, mpsc::UnboundedSender<ServerEvent>) {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        rng_seed: Some(11),
        ..config
    };
    let mut server = Server::new(&config).await.expect("server should bind");
    let addr = server.local_addr().unwrap();
    let commands = server.command_sender();

    tokio::spawn(async move {
        if let Err(e) = server.run().await {
            panic!("server failed: {}", e);
        }
    });

    (addr, commands)
}

struct TestClient {
    stream: TcpStream,
    decoder: FrameDecoder,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        TestClient {
            stream,
            decoder: FrameDecoder::default(),
        }
    }

    async fn send(&mut self, packet: Packet) {
        let frame = packet.to_frame().unwrap();
        self.stream.write_all(&frame).await.unwrap();
    }

    async fn recv(&mut self) -> Packet {
        loop {
            if let Some(payload) = self.decoder.next_frame().unwrap() {
                return Packet::from_payload(payload).unwrap();
            }
            let mut buf = [0u8; 4096];
            let read = timeout(WAIT, self.stream.read(&mut buf))
                .await
                .expect("timed out waiting for a packet")
                .unwrap();
            assert!(read > 0, "server closed the connection");
            self.decoder.extend(&buf[..read]);
        }
    }

    /// Skips packets until one of `kind` arrives.
    async fn recv_kind(&mut self, kind: PacketKind) -> Packet {
        loop {
            let packet = self.recv().await;
            if packet.kind() == kind {
                return packet;
            }
        }
    }

    async fn recv_response(&mut self) -> (bool, String) {
        match self.recv_kind(PacketKind::Response).await {
            Packet::Response(r) => (r.success, r.message),
            _ => unreachable!(),
        }
    }

    async fn join(&mut self, nickname: &str) {
        self.send(Packet::Join(JoinRequest {
            nickname: nickname.to_string(),
            contact: format!("{}@example.com", nickname),
        }))
        .await;
        assert_eq!(self.recv_response().await, (true, "Подключено".to_string()));
    }
}

/// FULL SESSION TESTS
mod session_tests {
    use super::*;

    /// Plays the opening of a two-player session end to end
    #[tokio::test]
    async fn two_player_opening_over_tcp() {
        let (addr, commands) = start_server(ServerConfig::default()).await;

        let mut ann = TestClient::connect(addr).await;
        ann.join("Ann").await;
        let mut bob = TestClient::connect(addr).await;
        bob.join("Bob").await;

        commands.send(ServerEvent::ForceStart).unwrap();

        let mut ids = Vec::new();
        for client in [&mut ann, &mut bob] {
            match client.recv_kind(PacketKind::StartGame).await {
                Packet::StartGame(start) => {
                    assert_eq!(start.player_count, 2);
                    assert_eq!(start.roster.len(), 2);
                    ids.push(start.player_id);
                }
                _ => unreachable!(),
            }
        }
        assert_eq!(ids, vec![1, 2]);

        for client in [&mut ann, &mut bob] {
            client
                .send(Packet::Archetype(ChooseArchetype {
                    archetype: Archetype::Neutral,
                }))
                .await;
        }

        let acting = match ann.recv_kind(PacketKind::StartTurn).await {
            Packet::StartTurn(turn) => {
                assert_eq!(turn.cycle, 1);
                assert_eq!(turn.turn, 1);
                turn.player_id
            }
            _ => unreachable!(),
        };
        bob.recv_kind(PacketKind::StartTurn).await;

        let (actor, idle) = if acting == 1 {
            (&mut ann, &mut bob)
        } else {
            (&mut bob, &mut ann)
        };

        match actor.recv_kind(PacketKind::State).await {
            Packet::State(state) => {
                assert_eq!(state.soldiers, 1000);
                assert!(state.resources.values().all(|&amount| amount == 1));
            }
            _ => unreachable!(),
        }

        actor
            .send(Packet::Build(BuildRequest {
                place_id: 0,
                building_type: BuildingType::Logging,
            }))
            .await;
        assert_eq!(
            actor.recv_response().await,
            (false, "Не хватает ресурсов".to_string())
        );

        idle.send(Packet::EndTurn(EndTurnRequest {})).await;
        assert_eq!(idle.recv_response().await, (false, "Не ваш ход".to_string()));

        actor.send(Packet::EndTurn(EndTurnRequest {})).await;
        for client in [&mut *actor, &mut *idle] {
            match client.recv_kind(PacketKind::TurnEnded).await {
                Packet::TurnEnded(ended) => {
                    assert_eq!(ended.player_id, acting);
                    assert_ne!(ended.next_player_id, acting);
                }
                _ => unreachable!(),
            }
        }

        actor.stream.shutdown().await.unwrap();
        match idle.recv_kind(PacketKind::GameEnd).await {
            Packet::GameEnd(end) => {
                assert_ne!(end.winner_id, Some(acting));
                assert_eq!(end.all_scores.len(), 1);
            }
            _ => unreachable!(),
        }
    }

    /// The lobby starts on its own once the configured size is reached
    #[tokio::test]
    async fn lobby_auto_starts_at_threshold() {
        let (addr, _commands) = start_server(ServerConfig {
            auto_start_players: 2,
            ..ServerConfig::default()
        })
        .await;

        let mut ann = TestClient::connect(addr).await;
        ann.join("Ann").await;
        let mut bob = TestClient::connect(addr).await;
        bob.join("Bob").await;

        assert!(matches!(
            ann.recv_kind(PacketKind::StartGame).await,
            Packet::StartGame(_)
        ));

        let mut late = TestClient::connect(addr).await;
        late.send(Packet::Join(JoinRequest::default())).await;
        assert_eq!(late.recv_response().await, (false, "Игра уже началась".to_string()));
    }
}

/// WIRE PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// Frames built by hand with the shared key are understood by the server
    #[tokio::test]
    async fn hand_built_frame_round_trip() {
        let (addr, _commands) = start_server(ServerConfig::default()).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        let key = b"Happy_New_Year_2_0_2_6_!!!";
        let body = serde_json::json!({ "nickname": "Raw", "contact": "" });
        let mut payload = format!("JOIN|{}", body).into_bytes();
        for (i, byte) in payload.iter_mut().enumerate() {
            *byte ^= key[i % key.len()];
        }
        let mut frame = (payload.len() as u32).to_le_bytes().to_vec();
        frame.extend(payload);
        stream.write_all(&frame).await.unwrap();

        let mut len_bytes = [0u8; 4];
        timeout(WAIT, stream.read_exact(&mut len_bytes)).await.unwrap().unwrap();
        let mut reply = vec![0u8; u32::from_le_bytes(len_bytes) as usize];
        timeout(WAIT, stream.read_exact(&mut reply)).await.unwrap().unwrap();
        for (i, byte) in reply.iter_mut().enumerate() {
            *byte ^= key[i % key.len()];
        }

        let text = String::from_utf8(reply).unwrap();
        let (kind, json) = text.split_once('|').unwrap();
        assert_eq!(kind, "RESPONSE");
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["message"], "Подключено");
    }

    /// A request delivered one byte at a time is still decoded
    #[tokio::test]
    async fn byte_by_byte_delivery() {
        let (addr, _commands) = start_server(ServerConfig::default()).await;
        let mut client = TestClient::connect(addr).await;

        let frame = Packet::Join(JoinRequest {
            nickname: "Slow".into(),
            contact: String::new(),
        })
        .to_frame()
        .unwrap();
        for byte in frame {
            client.stream.write_all(&[byte]).await.unwrap();
            client.stream.flush().await.unwrap();
        }

        assert_eq!(client.recv_response().await, (true, "Подключено".to_string()));
    }

    /// Garbage is answered and the connection stays usable
    #[tokio::test]
    async fn malformed_request_is_answered() {
        let (addr, _commands) = start_server(ServerConfig::default()).await;
        let mut client = TestClient::connect(addr).await;

        let garbage = plantation_shared::encode_frame("BUILD|{oops");
        client.stream.write_all(&garbage).await.unwrap();
        assert_eq!(
            client.recv_response().await,
            (false, "Некорректный запрос".to_string())
        );

        client.join("Ann").await;
    }

    /// A frame declaring more than the limit drops the connection
    #[tokio::test]
    async fn oversized_frame_closes_connection() {
        let (addr, _commands) = start_server(ServerConfig {
            max_frame_len: 64,
            ..ServerConfig::default()
        })
        .await;
        let mut stream = TcpStream::connect(addr).await.unwrap();

        stream.write_all(&4096u32.to_le_bytes()).await.unwrap();

        let mut buf = [0u8; 16];
        let read = timeout(WAIT, stream.read(&mut buf)).await.unwrap();
        assert!(matches!(read, Ok(0) | Err(_)));
    }
}
