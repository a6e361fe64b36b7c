//! Performance benchmarks for critical game systems

use bincode::{deserialize, serialize};
use server::catalog::Catalog;
use server::game::GameServer;
use server::modes::WaveConfig;
use shared::{GameEvent, GameMode, MatchSummary, Packet, Team, TeamScores};
use std::time::Instant;

fn populated_game(mode: GameMode, players: u32) -> GameServer {
    let mut game = GameServer::new();
    Catalog::bundled().unwrap().install(&mut game);
    game.set_mode(mode);
    for id in 1..=players {
        let team = if id % 2 == 0 { Team::Alpha } else { Team::Bravo };
        game.add_player(id, team);
    }
    game
}

/// Benchmarks the Domination tick with every player standing on a point
#[test]
fn benchmark_domination_tick() {
    let mut game = populated_game(GameMode::Domination, 16);
    for id in 1..=16u32 {
        game.handle_event(&GameEvent::EnterPoint {
            player: id,
            point: Some(id % 3),
        });
    }

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        game.tick(1.0 / 60.0);
    }

    let duration = start.elapsed();
    println!(
        "Domination tick: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in under 2 seconds for 100k ticks
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks kill fan-out into quests and missions for a full lobby
#[test]
fn benchmark_progression_notify() {
    let mut game = populated_game(GameMode::TeamDeathmatch, 16);
    for id in 1..=16u32 {
        game.quests_mut().start_quest(id, 1);
        game.quests_mut().start_quest(id, 12);
        game.missions_mut().start_mission(id, 1);
    }

    let iterations = 50_000u32;
    let start = Instant::now();

    for i in 0..iterations {
        game.handle_event(&GameEvent::Kill {
            killer: i % 16 + 1,
            victim: (i + 1) % 16 + 1,
        });
    }

    let duration = start.elapsed();
    println!(
        "Progression notify: {} kills in {:?} ({:.2} μs/kill)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks wave composition and clearing rounds deep into Zombies
#[test]
fn benchmark_zombie_waves() {
    let start = Instant::now();
    let mut spawned = 0u64;
    for round in 1..=1_000 {
        spawned += u64::from(WaveConfig::for_round(round).total());
    }
    let planning = start.elapsed();
    println!("Wave planning: 1000 rounds, {} zombies in {:?}", spawned, planning);

    let mut game = populated_game(GameMode::Zombies, 4);
    let start = Instant::now();
    for _ in 0..30 {
        assert!(game.start_round());
        let ids: Vec<u32> = game.zombies().alive_zombies().iter().map(|z| z.id).collect();
        for zombie_id in ids {
            game.handle_event(&GameEvent::ZombieKilled {
                zombie_id,
                killer: 1,
            });
        }
        assert!(game.zombies().round_complete);
    }

    let duration = start.elapsed();
    println!("Zombies: 30 rounds cleared in {:?}", duration);

    assert_eq!(game.zombies().current_round, 30);
    assert!(planning.as_millis() < 100);
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks match summary serialization, sent to every client every tick
#[test]
fn benchmark_summary_serialization() {
    let packet = Packet::Match(MatchSummary {
        mode: GameMode::SearchAndDestroy,
        scores: TeamScores { alpha: 3, bravo: 2 },
        game_over: false,
        winner: Team::None,
        round: 6,
    });

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let bytes = serialize(&packet).unwrap();
        let _: Packet = deserialize(&bytes).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Summary serialization: {} round trips in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 1000);
}
