use clap::Parser;
use plantation_shared::{
    Archetype, BuildRequest, BuildingType, ChooseArchetype, EndTurnRequest, FrameDecoder,
    JoinRequest, Packet, PlayerId, ResourceKind,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;

/// Headless player that joins a running server and plays every turn.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    #[clap(short, long, default_value = "5000")]
    port: u16,
    #[clap(short, long, default_value = "bot")]
    nickname: String,
    /// Archetype name, e.g. Neutral or Engineer
    #[clap(short, long, default_value = "Neutral")]
    archetype: String,
    /// Only end turns, never build
    #[clap(long)]
    passive: bool,
}

#[derive(Debug, Default)]
struct Bot {
    player_id: Option<PlayerId>,
    my_turn: bool,
    awaiting_build: bool,
    next_place: u32,
}

async fn send(writer: &mut OwnedWriteHalf, packet: Packet) -> Result<(), Box<dyn std::error::Error>> {
    println!("-> {}", packet.kind());
    writer.write_all(&packet.to_frame()?).await?;
    Ok(())
}

fn parse_archetype(name: &str) -> Option<Archetype> {
    Archetype::ALL
        .into_iter()
        .find(|a| a.to_string().eq_ignore_ascii_case(name))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let archetype = parse_archetype(&args.archetype)
        .ok_or_else(|| format!("unknown archetype '{}'", args.archetype))?;

    let address = format!("{}:{}", args.host, args.port);
    let stream = TcpStream::connect(&address).await?;
    println!("Connected to {}", address);
    let (mut reader, mut writer) = stream.into_split();

    send(
        &mut writer,
        Packet::Join(JoinRequest {
            nickname: args.nickname.clone(),
            contact: String::new(),
        }),
    )
    .await?;

    let mut bot = Bot::default();
    let mut decoder = FrameDecoder::default();
    let mut buf = [0u8; 4096];

    loop {
        let read = reader.read(&mut buf).await?;
        if read == 0 {
            println!("Server closed the connection");
            return Ok(());
        }
        decoder.extend(&buf[..read]);

        while let Some(payload) = decoder.next_frame()? {
            let packet = match Packet::from_payload(payload) {
                Ok(packet) => packet,
                Err(e) => {
                    println!("Failed to decode packet: {}", e);
                    continue;
                }
            };

            match packet {
                Packet::Response(response) => {
                    println!("<- RESPONSE {} {}", response.success, response.message);
                    if bot.awaiting_build {
                        bot.awaiting_build = false;
                        send(&mut writer, Packet::EndTurn(EndTurnRequest {})).await?;
                    }
                }
                Packet::StartGame(start) => {
                    println!("<- START_GAME as #{} with {} players", start.player_id, start.player_count);
                    bot.player_id = Some(start.player_id);
                    send(&mut writer, Packet::Archetype(ChooseArchetype { archetype })).await?;
                }
                Packet::StartTurn(turn) => {
                    println!("<- START_TURN cycle {} turn {} player #{}", turn.cycle, turn.turn, turn.player_id);
                    bot.my_turn = bot.player_id == Some(turn.player_id);
                }
                Packet::State(state) if bot.my_turn => {
                    bot.my_turn = false;
                    let stone = state.resources.get(&ResourceKind::Stone).copied().unwrap_or(0);
                    if !args.passive && stone >= 2 {
                        bot.awaiting_build = true;
                        let place_id = bot.next_place;
                        bot.next_place += 1;
                        send(
                            &mut writer,
                            Packet::Build(BuildRequest {
                                place_id,
                                building_type: BuildingType::Logging,
                            }),
                        )
                        .await?;
                    } else {
                        send(&mut writer, Packet::EndTurn(EndTurnRequest {})).await?;
                    }
                }
                Packet::GameEnd(end) => {
                    println!("<- GAME_END winner {:?} with {} points", end.winner_id, end.winner_points);
                    for score in end.all_scores {
                        println!("   #{} {}: {}", score.player_id, score.nickname, score.points);
                    }
                    return Ok(());
                }
                other => println!("<- {}", other.kind()),
            }
        }
    }
}
