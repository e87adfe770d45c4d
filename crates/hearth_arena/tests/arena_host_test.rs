//! Arena driven through the host, stepped manually unless noted.

use std::sync::Arc;
use std::time::{Duration, Instant};

use hearth_abilities::AttributeId;
use hearth_arena::{
    ArenaCommand, ArenaEvent, ArenaReply, ArenaResult, ArenaSimulation, ArenaSnapshot, CommandEnvelope,
    EventEnvelope, DEFEATED_TAG,
};
use hearth_core::{encode_to_vec, ByteReader};
use hearth_host::{CorrelationId, Host, HostConfig, StopOutcome};
use parking_lot::Mutex;

const DT: f32 = 0.125;

struct Recorded {
    results: Arc<Mutex<Vec<ArenaResult>>>,
    events: Arc<Mutex<Vec<EventEnvelope>>>,
}

fn arena(config: HostConfig) -> (Host<ArenaSimulation>, Recorded) {
    let host = Host::new(ArenaSimulation::with_default_book().unwrap(), config);
    let results = Arc::new(Mutex::new(Vec::new()));
    let events = Arc::new(Mutex::new(Vec::new()));
    {
        let results = Arc::clone(&results);
        host.on_result(move |r: &ArenaResult| results.lock().push(r.clone()));
    }
    {
        let events = Arc::clone(&events);
        host.on_event(move |e: &EventEnvelope| events.lock().push(e.clone()));
    }
    (host, Recorded { results, events })
}

fn send(host: &Host<ArenaSimulation>, id: u128, command: ArenaCommand) {
    assert!(host.send_command(CommandEnvelope::new(CorrelationId::from_u128(id), 1, command)));
}

fn spawn(name: &str, health: f32, attack_damage: f32) -> ArenaCommand {
    ArenaCommand::SpawnActor {
        name: name.to_string(),
        health,
        attack_damage,
    }
}

fn grant(actor: u64, ability: &str) -> ArenaCommand {
    ArenaCommand::GrantAbility {
        actor,
        ability: ability.to_string(),
    }
}

fn activate(actor: u64, handle: u32, target: u64) -> ArenaCommand {
    ArenaCommand::ActivateAbility {
        actor,
        handle,
        target: Some(target),
    }
}

fn health(host: &Host<ArenaSimulation>, actor: u64) -> f32 {
    host.latest_snapshot()
        .and_then(|s| s.actor(actor).and_then(|a| a.attribute(AttributeId::HEALTH)))
        .unwrap()
}

#[test]
fn test_strike_until_defeat() {
    let (host, recorded) = arena(HostConfig::default());

    send(&host, 1, spawn("attacker", 100.0, 60.0));
    send(&host, 2, spawn("dummy", 100.0, 1.0));
    send(&host, 3, grant(1, "Strike"));
    send(&host, 4, activate(1, 1, 2));
    host.advance(DT);
    host.flush_events();

    let replies: Vec<ArenaReply> = recorded.results.lock().iter().map(|r| r.reply.clone()).collect();
    assert_eq!(
        replies,
        vec![
            ArenaReply::Spawned { actor: 1 },
            ArenaReply::Spawned { actor: 2 },
            ArenaReply::Granted { actor: 1, handle: 1 },
            ArenaReply::Activated {
                actor: 1,
                handle: 1,
                targets: 1
            },
        ]
    );
    assert_eq!(health(&host, 2), 40.0);

    // Still cooling down.
    send(&host, 5, activate(1, 1, 2));
    host.advance(DT);
    host.flush_events();
    assert_eq!(recorded.results.lock().last().unwrap().header.error, "ability not ready");

    for _ in 0..10 {
        host.advance(DT);
    }
    send(&host, 6, activate(1, 1, 2));
    host.advance(DT);
    host.flush_events();

    assert!(recorded.results.lock().last().unwrap().header.success);
    assert_eq!(health(&host, 2), 0.0);
    let defeats: Vec<_> = recorded
        .events
        .lock()
        .iter()
        .filter(|e| matches!(e.event, ArenaEvent::ActorDefeated { actor: 2 }))
        .map(|e| e.header.tick)
        .collect();
    assert_eq!(defeats, vec![host.current_tick()]);

    let snapshot = host.latest_snapshot().unwrap();
    assert!(snapshot.actor(2).unwrap().has_tag(DEFEATED_TAG));
}

#[test]
fn test_stun_blocks_strike_until_it_expires() {
    let (host, recorded) = arena(HostConfig::default());

    send(&host, 1, spawn("stunner", 100.0, 1.0));
    send(&host, 2, spawn("striker", 100.0, 5.0));
    send(&host, 3, grant(1, "Stun"));
    send(&host, 4, grant(2, "Strike"));
    send(&host, 5, activate(1, 1, 2));
    send(&host, 6, activate(2, 1, 1));
    host.advance(DT);
    host.flush_events();

    {
        let results = recorded.results.lock();
        assert!(results[4].header.success);
        assert!(!results[5].header.success);
    }
    assert!(host.latest_snapshot().unwrap().actor(2).unwrap().has_tag("State.Stunned"));

    for _ in 0..14 {
        host.advance(DT);
    }
    assert!(!host.latest_snapshot().unwrap().actor(2).unwrap().has_tag("State.Stunned"));

    send(&host, 7, activate(2, 1, 1));
    host.advance(DT);
    host.flush_events();
    assert!(recorded.results.lock().last().unwrap().header.success);
    assert_eq!(health(&host, 1), 95.0);
}

#[test]
fn test_command_failure_becomes_event() {
    let (host, recorded) = arena(HostConfig::default());

    send(&host, 77, spawn("broken", f32::INFINITY, 1.0));
    host.advance(DT);
    host.flush_events();

    assert!(recorded.results.lock().is_empty());
    let events = recorded.events.lock();
    assert_eq!(events.len(), 1);
    match &events[0].event {
        ArenaEvent::CommandFailed {
            correlation_id,
            sender_id,
            reason,
        } => {
            assert_eq!(*correlation_id, CorrelationId::from_u128(77));
            assert_eq!(*sender_id, 1);
            assert!(reason.starts_with("command rejected"), "{reason}");
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(host.stats().command_failures, 1);
}

#[test]
fn test_snapshot_survives_the_wire() {
    let (host, _recorded) = arena(HostConfig::default());
    send(&host, 1, spawn("a", 100.0, 10.0));
    send(&host, 2, spawn("b", 80.0, 10.0));
    send(&host, 3, grant(1, "Shockwave"));
    send(&host, 4, activate(1, 1, 2));
    host.advance(DT);

    let snapshot = host.latest_snapshot().unwrap();
    let bytes = encode_to_vec(snapshot.as_ref()).unwrap();
    let decoded = ArenaSnapshot::read_from(&mut ByteReader::new(&bytes)).unwrap();
    assert_eq!(&decoded, snapshot.as_ref());
    assert_eq!(decoded.actor(2).unwrap().attribute(AttributeId::HEALTH), Some(65.0));
    assert!(decoded.actor(1).unwrap().has_tag("Cooldown.Shockwave"));
}

#[test]
fn test_threaded_loop_answers_commands() {
    let config = HostConfig {
        fixed_step: 1.0 / 240.0,
        sleep_ms: 0,
        ..HostConfig::default()
    };
    let (host, recorded) = arena(config);
    host.start_simulation().unwrap();

    send(&host, 1, spawn("a", 100.0, 10.0));
    send(&host, 2, grant(1, "Mend"));

    let deadline = Instant::now() + Duration::from_secs(2);
    while recorded.results.lock().len() < 2 && Instant::now() < deadline {
        host.flush_events();
        std::thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(recorded.results.lock().len(), 2);
    assert_eq!(host.stop_simulation(), StopOutcome::Stopped);
    assert!(host.with_simulation(|sim| sim.actor_count()) == 1);
}
