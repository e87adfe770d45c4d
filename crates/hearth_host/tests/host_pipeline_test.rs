//! Integration tests for the command → outcome → dispatch pipeline,
//! stepped manually for determinism.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{record, Faults, Op, Scripted, Seen, TestCommand};
use hearth_host::{Host, HostConfig};
use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

const DT: f32 = 0.125;

fn host() -> Host<Scripted> {
    Host::new(Scripted::default(), HostConfig::default())
}

#[test]
fn test_outcome_order_pre_result_post() {
    let host = host();
    let seen = record(&host);

    host.send_command(TestCommand::new(1, Op::Ordered));
    host.advance(DT);
    assert_eq!(host.flush_events(), 4);

    assert_eq!(
        *seen.lock(),
        vec![
            Seen::Event('A'),
            Seen::Event('B'),
            Seen::Result { success: true },
            Seen::Event('C'),
        ]
    );
}

#[test]
fn test_commands_dispatch_in_queue_order() {
    let host = host();
    let seen = record(&host);

    host.send_command(TestCommand::new(1, Op::Ack));
    host.send_command(TestCommand::new(2, Op::Ordered));
    host.send_command(TestCommand::new(3, Op::Reject));
    host.advance(DT);
    host.flush_events();

    assert_eq!(
        *seen.lock(),
        vec![
            Seen::Result { success: true },
            Seen::Event('A'),
            Seen::Event('B'),
            Seen::Result { success: true },
            Seen::Event('C'),
            Seen::Result { success: false },
        ]
    );
}

#[test]
fn test_rejection_is_a_result_not_a_failure() {
    let host = host();
    let seen = record(&host);

    host.send_command(TestCommand::new(7, Op::Reject));
    host.advance(DT);
    host.flush_events();

    assert_eq!(*seen.lock(), vec![Seen::Result { success: false }]);
    assert_eq!(host.stats().command_failures, 0);
}

#[test]
fn test_panicking_handler_is_isolated() {
    let host = host();
    let seen = record(&host);

    host.send_command(TestCommand::new(1, Op::Panic));
    host.send_command(TestCommand::new(2, Op::Ack));
    host.send_command(TestCommand::new(3, Op::Fail));
    host.send_command(TestCommand::new(4, Op::Ack));
    assert_eq!(host.advance(DT), 1);
    host.flush_events();

    assert_eq!(
        *seen.lock(),
        vec![
            Seen::Event('E'),
            Seen::Result { success: true },
            Seen::Event('E'),
            Seen::Result { success: true },
        ]
    );

    let stats = host.stats();
    assert_eq!(stats.commands_processed, 4);
    assert_eq!(stats.command_failures, 2);
    assert_eq!(host.with_simulation(|sim| sim.handled), 2);
    assert!(host.loop_failure().is_none());
}

#[test]
fn test_tick_failure_is_isolated() {
    let faults = Faults::default();
    let host = Host::new(Scripted::new(faults.clone()), HostConfig::default());
    let seen = record(&host);

    faults.tick_error.store(true, Ordering::SeqCst);
    host.advance(DT);
    faults.tick_error.store(false, Ordering::SeqCst);

    faults.tick_panic.store(true, Ordering::SeqCst);
    host.advance(DT);
    faults.tick_panic.store(false, Ordering::SeqCst);

    host.send_command(TestCommand::new(1, Op::Ack));
    assert_eq!(host.advance(DT), 3);
    host.flush_events();

    // events raised before the tick hook failed still reach consumers
    assert_eq!(*seen.lock(), vec![Seen::Event('T'), Seen::Result { success: true }]);
    assert_eq!(host.stats().tick_failures, 2);
    assert_eq!(host.with_simulation(|sim| sim.ticks.clone()), vec![1, 2, 3]);
    assert_eq!(host.latest_snapshot().unwrap().header.tick, 3);
}

#[test]
fn test_panicking_subscriber_does_not_stop_flush() {
    let host = host();
    let delivered = Arc::new(AtomicUsize::new(0));

    host.on_result(|_| panic!("subscriber bug"));
    let counter = Arc::clone(&delivered);
    host.on_result(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    for sender in 0..3 {
        host.send_command(TestCommand::new(sender, Op::Ack));
    }
    host.advance(DT);

    assert_eq!(host.flush_events(), 3);
    assert_eq!(delivered.load(Ordering::SeqCst), 3);
    assert_eq!(host.stats().subscriber_panics, 3);
}

#[test]
fn test_snapshot_interval_throttles_publication() {
    let config = HostConfig {
        snapshot_interval: 0.25,
        ..HostConfig::default()
    };
    let host = Host::new(Scripted::default(), config);

    for _ in 0..6 {
        host.advance(DT);
    }

    let ticks: Vec<i64> = host.drain_snapshots().iter().map(|s| s.header.tick).collect();
    assert_eq!(ticks, vec![2, 4, 6]);
    assert_eq!(host.stats().snapshots_published, 3);
}

#[test]
fn test_snapshot_is_independent_copy() {
    let host = host();
    host.advance(DT);
    let first = host.latest_snapshot().unwrap();

    host.advance(DT);
    host.advance(DT);

    assert_eq!(first.history, vec![1]);
    assert_eq!(host.latest_snapshot().unwrap().history, vec![1, 2, 3]);
}

#[test]
fn test_flush_without_subscribers_drains() {
    let host = host();
    host.send_command(TestCommand::new(1, Op::Ordered));
    host.advance(DT);
    assert_eq!(host.flush_events(), 4);
    assert_eq!(host.flush_events(), 0);
}

#[derive(Default)]
struct ErrorLog {
    messages: Arc<Mutex<Vec<String>>>,
}

struct MessageVisitor<'a>(&'a mut String);

impl Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for ErrorLog {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            let mut message = String::new();
            event.record(&mut MessageVisitor(&mut message));
            self.messages.lock().push(message);
        }
    }
}

#[test]
fn test_logs_go_to_injected_dispatch() {
    let log = ErrorLog::default();
    let messages = Arc::clone(&log.messages);
    let dispatch = tracing::Dispatch::new(tracing_subscriber::registry().with(log));

    let host = Host::with_dispatch(Scripted::default(), HostConfig::default(), dispatch);
    host.send_command(TestCommand::new(1, Op::Fail));
    host.advance(DT);

    assert_eq!(*messages.lock(), vec!["command handler failed".to_string()]);
}
