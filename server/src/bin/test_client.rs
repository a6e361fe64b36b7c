//! Scripted bot that joins a running server and reports random gameplay.

use bincode::{deserialize, serialize};
use clap::Parser;
use log::{info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use shared::{GameEvent, GameMode, Packet, PlayerId, Team, PROTOCOL_VERSION};
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout, Duration};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server address
    #[clap(short, long, default_value = "127.0.0.1:8080")]
    server: SocketAddr,
    /// Number of gameplay events to send
    #[clap(short, long, default_value = "20")]
    events: u32,
    /// Mode to request after joining (tdm, domination, ctf, snd, zombies)
    #[clap(short, long)]
    mode: Option<String>,
    /// Quest to start after joining
    #[clap(short, long)]
    quest: Option<u32>,
}

fn random_event(rng: &mut impl Rng, me: PlayerId) -> GameEvent {
    let other = rng.gen_range(1..=8);
    match rng.gen_range(0..6) {
        0 => GameEvent::Kill {
            killer: me,
            victim: other,
        },
        1 => GameEvent::EnterPoint {
            player: me,
            point: Some(rng.gen_range(0..3)),
        },
        2 => GameEvent::ZombieDamaged {
            zombie_id: rng.gen_range(1..=10),
            attacker: me,
            amount: rng.gen_range(10.0..80.0),
        },
        3 => GameEvent::Collect {
            player: me,
            item: ["intel", "ammo", "dog_tag"]
                .choose(rng)
                .map_or("intel", |item| *item)
                .to_string(),
        },
        4 => GameEvent::FlagPickup {
            player: me,
            flag_team: Team::Bravo,
        },
        _ => GameEvent::FlagCapture { player: me },
    }
}

async fn send(
    socket: &UdpSocket,
    packet: &Packet,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    socket.send_to(&serialize(packet)?, addr).await?;
    Ok(())
}

/// Logs every packet that arrives within `wait`.
async fn drain_replies(socket: &UdpSocket, buf: &mut [u8], wait: Duration) {
    while let Ok(Ok((len, _))) = timeout(wait, socket.recv_from(buf)).await {
        match deserialize::<Packet>(&buf[..len]) {
            Ok(Packet::Match(summary)) => info!(
                "Match {:?}: alpha {} bravo {} round {}",
                summary.mode, summary.scores.alpha, summary.scores.bravo, summary.round
            ),
            Ok(packet) => info!("Received {:?}", packet),
            Err(e) => warn!("Failed to deserialize reply: {}", e),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = rand::thread_rng();

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    info!("Client socket bound to {}", socket.local_addr()?);

    let team = if rng.gen_bool(0.5) {
        Team::Alpha
    } else {
        Team::Bravo
    };
    let join = Packet::Join {
        client_version: PROTOCOL_VERSION,
        team,
    };
    send(&socket, &join, args.server).await?;

    let mut buf = [0u8; 2048];
    let player_id = loop {
        let (len, _) = timeout(Duration::from_secs(3), socket.recv_from(&mut buf)).await??;
        match deserialize::<Packet>(&buf[..len])? {
            Packet::Joined { player_id } => break player_id,
            Packet::Rejected { reason } => {
                warn!("Join rejected: {}", reason);
                return Ok(());
            }
            other => info!("Ignoring {:?} while joining", other),
        }
    };
    info!("Joined as player {} on {:?}", player_id, team);

    if let Some(tag) = args.mode.as_deref() {
        match GameMode::from_tag(tag) {
            Some(mode) => send(&socket, &Packet::SelectMode { mode }, args.server).await?,
            None => warn!("Unknown mode '{}', keeping the server's", tag),
        }
    }
    if let Some(quest_id) = args.quest {
        send(&socket, &Packet::StartQuest { quest_id }, args.server).await?;
    }

    for _ in 0..args.events {
        let event = random_event(&mut rng, player_id);
        info!("Sending {:?}", event);
        send(&socket, &Packet::Gameplay(event), args.server).await?;
        send(&socket, &Packet::Heartbeat, args.server).await?;

        drain_replies(&socket, &mut buf, Duration::from_millis(50)).await;
        sleep(Duration::from_millis(rng.gen_range(100..400))).await;
    }

    send(&socket, &Packet::Leave, args.server).await?;
    info!("Test client finished");
    Ok(())
}
