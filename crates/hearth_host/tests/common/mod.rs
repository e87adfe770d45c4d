//! Scripted simulation shared by the host integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hearth_core::{ByteSerializable, ByteWriter, CodecResult};
use hearth_host::{
    CommandHeader, CommandOutcome, CorrelationId, EventHeader, Host, OutcomeOf, ResultHeader, Simulation,
    SimulationError, SimulationResult, SnapshotHeader, Tick, WireCommand, WireEvent, WireResult, WireSnapshot,
};
use parking_lot::Mutex;

/// What a command asks the scripted simulation to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    /// pre `[A, B]`, result, post `[C]`.
    Ordered,
    /// Result only.
    Ack,
    /// Expected rejection: `success = false` result.
    Reject,
    /// Handler error.
    Fail,
    /// Handler panic.
    Panic,
}

#[derive(Debug)]
pub struct TestCommand {
    pub header: CommandHeader,
    pub op: Op,
}

impl TestCommand {
    pub fn new(sender_id: i64, op: Op) -> Self {
        Self {
            header: CommandHeader::new(CorrelationId::from_u128(sender_id as u128), sender_id),
            op,
        }
    }
}

impl ByteSerializable for TestCommand {
    fn size_of(&self) -> usize {
        CommandHeader::SIZE + 1
    }

    fn write_to(&self, out: &mut ByteWriter<'_>) -> CodecResult<()> {
        self.header.write_to(out)?;
        out.write_u8(self.op as u8)
    }
}

impl WireCommand for TestCommand {
    fn header(&self) -> &CommandHeader {
        &self.header
    }
}

#[derive(Clone, Debug)]
pub struct TestResult {
    pub header: ResultHeader,
}

impl ByteSerializable for TestResult {
    fn size_of(&self) -> usize {
        self.header.size_of()
    }

    fn write_to(&self, out: &mut ByteWriter<'_>) -> CodecResult<()> {
        self.header.write_to(out)
    }
}

impl WireResult for TestResult {
    fn header(&self) -> &ResultHeader {
        &self.header
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestEvent {
    pub header: EventHeader,
    pub label: char,
}

impl TestEvent {
    pub fn new(tick: Tick, label: char) -> Self {
        Self {
            header: EventHeader::new(tick),
            label,
        }
    }
}

impl ByteSerializable for TestEvent {
    fn size_of(&self) -> usize {
        EventHeader::SIZE + 4
    }

    fn write_to(&self, out: &mut ByteWriter<'_>) -> CodecResult<()> {
        self.header.write_to(out)?;
        out.write_u32(u32::from(self.label))
    }
}

impl WireEvent for TestEvent {
    fn header(&self) -> &EventHeader {
        &self.header
    }
}

#[derive(Debug)]
pub struct TestSnapshot {
    pub header: SnapshotHeader,
    pub handled: u64,
    pub history: Vec<Tick>,
}

impl ByteSerializable for TestSnapshot {
    fn size_of(&self) -> usize {
        SnapshotHeader::SIZE + 8
    }

    fn write_to(&self, out: &mut ByteWriter<'_>) -> CodecResult<()> {
        self.header.write_to(out)?;
        out.write_u64(self.handled)
    }
}

impl WireSnapshot for TestSnapshot {
    fn header(&self) -> &SnapshotHeader {
        &self.header
    }
}

/// Switches flipped by tests while the host runs.
#[derive(Clone, Default)]
pub struct Faults {
    pub tick_error: Arc<AtomicBool>,
    pub tick_panic: Arc<AtomicBool>,
    pub snapshot_panic: Arc<AtomicBool>,
    /// Milliseconds each `on_tick` sleeps.
    pub stall_ms: Arc<AtomicU64>,
}

#[derive(Default)]
pub struct Scripted {
    pub handled: u64,
    pub ticks: Vec<Tick>,
    pub faults: Faults,
}

impl Scripted {
    pub fn new(faults: Faults) -> Self {
        Self {
            faults,
            ..Self::default()
        }
    }
}

impl Simulation for Scripted {
    type Command = TestCommand;
    type Output = TestResult;
    type Event = TestEvent;
    type Snapshot = TestSnapshot;

    fn handle_command(&mut self, tick: Tick, command: &TestCommand) -> SimulationResult<OutcomeOf<Self>> {
        let sender = command.header.sender_id;
        match command.op {
            Op::Ordered => {
                self.handled += 1;
                Ok(CommandOutcome::new(
                    vec![TestEvent::new(tick, 'A'), TestEvent::new(tick, 'B')],
                    Some(TestResult {
                        header: ResultHeader::ok(tick, sender),
                    }),
                    vec![TestEvent::new(tick, 'C')],
                ))
            }
            Op::Ack => {
                self.handled += 1;
                Ok(CommandOutcome::result(TestResult {
                    header: ResultHeader::ok(tick, sender),
                }))
            }
            Op::Reject => Ok(CommandOutcome::result(TestResult {
                header: ResultHeader::failure(tick, sender, "no empty slot"),
            })),
            Op::Fail => Err(SimulationError::Failed("scripted failure".into())),
            Op::Panic => panic!("scripted handler panic"),
        }
    }

    fn on_tick(&mut self, tick: Tick, _dt: f32, events: &mut Vec<TestEvent>) -> SimulationResult<()> {
        self.ticks.push(tick);
        let stall = self.faults.stall_ms.load(Ordering::SeqCst);
        if stall > 0 {
            std::thread::sleep(Duration::from_millis(stall));
        }
        if self.faults.tick_error.load(Ordering::SeqCst) {
            events.push(TestEvent::new(tick, 'T'));
            return Err(SimulationError::Failed("scripted tick failure".into()));
        }
        if self.faults.tick_panic.load(Ordering::SeqCst) {
            panic!("scripted tick panic");
        }
        Ok(())
    }

    fn build_snapshot(&self, tick: Tick) -> Option<TestSnapshot> {
        if self.faults.snapshot_panic.load(Ordering::SeqCst) {
            panic!("scripted snapshot panic");
        }
        Some(TestSnapshot {
            header: SnapshotHeader::new(tick),
            handled: self.handled,
            history: self.ticks.clone(),
        })
    }

    fn error_event(&self, tick: Tick, _command: &TestCommand, _error: &SimulationError) -> Option<TestEvent> {
        Some(TestEvent::new(tick, 'E'))
    }
}

/// What a subscriber saw, in delivery order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Seen {
    Result { success: bool },
    Event(char),
}

/// Subscribes to both streams and records what arrives.
pub fn record(host: &Host<Scripted>) -> Arc<Mutex<Vec<Seen>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));

    let results = Arc::clone(&seen);
    host.on_result(move |result: &TestResult| {
        results.lock().push(Seen::Result {
            success: result.header.success,
        });
    });

    let events = Arc::clone(&seen);
    host.on_event(move |event: &TestEvent| events.lock().push(Seen::Event(event.label)));

    seen
}

/// Polls `condition` (flushing events in between) for up to two seconds.
pub fn wait_until(host: &Host<Scripted>, mut condition: impl FnMut(&Host<Scripted>) -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        host.flush_events();
        if condition(host) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    false
}
