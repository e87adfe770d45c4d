//! Benchmarks for one host step and the consumer-side flush.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use hearth_core::{ByteSerializable, ByteWriter, CodecResult};
use hearth_host::{
    CommandHeader, CommandOutcome, CorrelationId, EventHeader, Host, HostConfig, OutcomeOf, ResultHeader,
    Simulation, SimulationResult, SnapshotHeader, Tick, WireCommand, WireEvent, WireResult, WireSnapshot,
};

struct Ping(CommandHeader);
struct Pong(ResultHeader);
struct Pinged(EventHeader);
struct Counter(SnapshotHeader, u64);

impl ByteSerializable for Ping {
    fn size_of(&self) -> usize {
        CommandHeader::SIZE
    }

    fn write_to(&self, out: &mut ByteWriter<'_>) -> CodecResult<()> {
        self.0.write_to(out)
    }
}

impl WireCommand for Ping {
    fn header(&self) -> &CommandHeader {
        &self.0
    }
}

impl ByteSerializable for Pong {
    fn size_of(&self) -> usize {
        self.0.size_of()
    }

    fn write_to(&self, out: &mut ByteWriter<'_>) -> CodecResult<()> {
        self.0.write_to(out)
    }
}

impl WireResult for Pong {
    fn header(&self) -> &ResultHeader {
        &self.0
    }
}

impl ByteSerializable for Pinged {
    fn size_of(&self) -> usize {
        EventHeader::SIZE
    }

    fn write_to(&self, out: &mut ByteWriter<'_>) -> CodecResult<()> {
        self.0.write_to(out)
    }
}

impl WireEvent for Pinged {
    fn header(&self) -> &EventHeader {
        &self.0
    }
}

impl ByteSerializable for Counter {
    fn size_of(&self) -> usize {
        SnapshotHeader::SIZE + 8
    }

    fn write_to(&self, out: &mut ByteWriter<'_>) -> CodecResult<()> {
        self.0.write_to(out)?;
        out.write_u64(self.1)
    }
}

impl WireSnapshot for Counter {
    fn header(&self) -> &SnapshotHeader {
        &self.0
    }
}

#[derive(Default)]
struct PingPong {
    pings: u64,
}

impl Simulation for PingPong {
    type Command = Ping;
    type Output = Pong;
    type Event = Pinged;
    type Snapshot = Counter;

    fn handle_command(&mut self, tick: Tick, command: &Ping) -> SimulationResult<OutcomeOf<Self>> {
        self.pings += 1;
        Ok(CommandOutcome::result(Pong(ResultHeader::ok(tick, command.0.sender_id)))
            .with_post_event(Pinged(EventHeader::new(tick))))
    }

    fn build_snapshot(&self, tick: Tick) -> Option<Counter> {
        Some(Counter(SnapshotHeader::new(tick), self.pings))
    }
}

fn ping(sender_id: i64) -> Ping {
    Ping(CommandHeader::new(CorrelationId::from_u128(sender_id as u128), sender_id))
}

fn bench_advance_64_commands(c: &mut Criterion) {
    let host = Host::new(PingPong::default(), HostConfig::default());
    host.on_result(|result| {
        black_box(result.0.success);
    });

    c.bench_function("advance_64_commands_and_flush", |b| {
        b.iter_batched(
            || {
                for sender in 0..64 {
                    host.send_command(ping(sender));
                }
            },
            |()| {
                black_box(host.advance(1.0 / 30.0));
                black_box(host.flush_events())
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_empty_step(c: &mut Criterion) {
    let host = Host::new(PingPong::default(), HostConfig::default());
    c.bench_function("advance_empty_step", |b| {
        b.iter(|| black_box(host.advance(1.0 / 30.0)));
    });
}

fn bench_latest_snapshot(c: &mut Criterion) {
    let host = Host::new(PingPong::default(), HostConfig::default());
    host.advance(1.0 / 30.0);
    c.bench_function("latest_snapshot_read", |b| {
        b.iter(|| black_box(host.latest_snapshot()));
    });
}

criterion_group!(benches, bench_advance_64_commands, bench_empty_step, bench_latest_snapshot);
criterion_main!(benches);
