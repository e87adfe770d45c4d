//! # Simulation Host
//!
//! Runs a [`Simulation`] on a dedicated fixed-step thread and connects it to
//! producer and consumer threads without either side blocking.
//!
//! ## Data Flow
//!
//! ```text
//! producers ──send_command──► intake (unbounded MPMC)
//!                                   │
//!                      simulation thread: advance(dt)
//!                        handle_command → pre events, result, post events
//!                        on_tick        → events
//!                        build_snapshot → snapshot queue + latest slot
//!                                   │
//! consumer ◄──flush_events── dispatch (unbounded MPMC)
//! consumer ◄──latest_snapshot── SnapshotSlot (lock-free)
//! ```
//!
//! ## Failure Isolation
//!
//! A handler error or panic is contained to its command, an `on_tick`
//! failure to its tick. Anything else that unwinds out of a step (a
//! panicking `build_snapshot`) ends the loop; the message is kept as a
//! [`LoopFailure`] and the loop is not restarted.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use hearth_core::SnapshotSlot;
use parking_lot::Mutex;
use tracing::{debug, error, info, trace, warn, Dispatch};

use crate::clock::FixedStepClock;
use crate::config::HostConfig;
use crate::error::{panic_message, HostError, HostResult, LoopFailure, SimulationError};
use crate::outcome::CommandOutcome;
use crate::simulation::Simulation;
use crate::stats::HostStats;
use crate::wire::{Tick, WireCommand};

/// Name of the background simulation thread.
pub const SIMULATION_THREAD_NAME: &str = "hearth-sim";

/// Handle returned by [`Host::on_result`] / [`Host::on_event`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// What [`Host::stop_simulation`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopOutcome {
    /// No loop thread was running.
    NotRunning,
    /// The loop thread exited and was joined.
    Stopped,
    /// The loop thread did not exit within `stop_timeout_ms`. It keeps
    /// running detached until it notices the signal.
    TimedOut,
}

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// One item of the dispatch queue.
enum Dispatched<R, E> {
    Result(R),
    Event(E),
}

struct SimCore<S> {
    simulation: S,
    snapshot_accumulator: f32,
}

/// State shared between the owner and the loop thread.
struct Shared<S: Simulation> {
    intake_tx: Sender<S::Command>,
    intake_rx: Receiver<S::Command>,
    dispatch_tx: Sender<Dispatched<S::Output, S::Event>>,
    dispatch_rx: Receiver<Dispatched<S::Output, S::Event>>,
    snapshot_tx: Sender<Arc<S::Snapshot>>,
    snapshot_rx: Receiver<Arc<S::Snapshot>>,
    latest: SnapshotSlot<S::Snapshot>,

    tick: AtomicI64,
    running: AtomicBool,
    disposed: AtomicBool,
    next_subscription: AtomicU64,

    config: Mutex<HostConfig>,
    core: Mutex<SimCore<S>>,
    stats: Mutex<HostStats>,
    failure: Mutex<Option<LoopFailure>>,
    result_subscribers: Mutex<Vec<(SubscriptionId, Callback<S::Output>)>>,
    event_subscribers: Mutex<Vec<(SubscriptionId, Callback<S::Event>)>>,

    /// Logging sink for the loop thread and host entry points.
    dispatch: Dispatch,
}

struct LoopThread {
    handle: JoinHandle<()>,
    shutdown: Arc<AtomicBool>,
    /// Disconnects when the thread body returns.
    exited: Receiver<()>,
}

/// Threaded fixed-step host for one simulation.
///
/// `Host` is `Sync`: share it behind an `Arc` (or hand producers a
/// [`CommandSender`]) to send commands from other threads.
///
/// ## Usage
///
/// ```rust,ignore
/// let host = Host::new(ArenaSimulation::new(book), HostConfig::with_tick_rate(30));
/// host.on_event(|event| println!("{event:?}"));
/// host.start_simulation()?;
///
/// host.send_command(command);
/// loop {
///     host.flush_events();
///     if let Some(snapshot) = host.latest_snapshot() {
///         render(&snapshot);
///     }
/// }
/// ```
pub struct Host<S: Simulation> {
    shared: Arc<Shared<S>>,
    loop_thread: Mutex<Option<LoopThread>>,
}

impl<S: Simulation> Host<S> {
    /// Creates a stopped host logging to the current default dispatcher.
    #[must_use]
    pub fn new(simulation: S, config: HostConfig) -> Self {
        let dispatch = tracing::dispatcher::get_default(Dispatch::clone);
        Self::with_dispatch(simulation, config, dispatch)
    }

    /// Creates a stopped host logging to `dispatch`.
    ///
    /// The snapshot queue capacity is taken from `config` here and cannot
    /// change afterwards.
    #[must_use]
    pub fn with_dispatch(simulation: S, config: HostConfig, dispatch: Dispatch) -> Self {
        let config = config.sanitized();
        let (intake_tx, intake_rx) = crossbeam_channel::unbounded();
        let (dispatch_tx, dispatch_rx) = crossbeam_channel::unbounded();
        let (snapshot_tx, snapshot_rx) = crossbeam_channel::bounded(config.snapshot_queue_capacity);

        Self {
            shared: Arc::new(Shared {
                intake_tx,
                intake_rx,
                dispatch_tx,
                dispatch_rx,
                snapshot_tx,
                snapshot_rx,
                latest: SnapshotSlot::new(),
                tick: AtomicI64::new(0),
                running: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
                next_subscription: AtomicU64::new(1),
                config: Mutex::new(config),
                core: Mutex::new(SimCore {
                    simulation,
                    snapshot_accumulator: 0.0,
                }),
                stats: Mutex::new(HostStats::default()),
                failure: Mutex::new(None),
                result_subscribers: Mutex::new(Vec::new()),
                event_subscribers: Mutex::new(Vec::new()),
                dispatch,
            }),
            loop_thread: Mutex::new(None),
        }
    }

    // =========================================================================
    // PRODUCER SIDE
    // =========================================================================

    /// Queues a command for the next step. Never blocks.
    ///
    /// Returns `false` (and drops the command) once the host is disposed.
    pub fn send_command(&self, command: S::Command) -> bool {
        self.shared.enqueue_command(command)
    }

    /// Cloneable producer handle.
    #[must_use]
    pub fn command_sender(&self) -> CommandSender<S> {
        CommandSender {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Commands waiting for the next step.
    #[must_use]
    pub fn pending_commands(&self) -> usize {
        self.shared.intake_rx.len()
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Spawns the loop thread. A no-op while it is already running.
    ///
    /// A failure captured by a previous run is cleared.
    ///
    /// # Errors
    ///
    /// - [`HostError::Disposed`] after [`Self::dispose`]
    /// - [`HostError::PreviousLoopAlive`] if a thread that timed out on
    ///   stop has not exited yet
    /// - [`HostError::Spawn`] if the OS refuses a new thread
    pub fn start_simulation(&self) -> HostResult<()> {
        let mut slot = self.loop_thread.lock();
        if self.shared.disposed.load(Ordering::SeqCst) {
            return Err(HostError::Disposed);
        }

        if let Some(existing) = slot.as_ref() {
            if !existing.handle.is_finished() {
                return if existing.shutdown.load(Ordering::SeqCst) {
                    Err(HostError::PreviousLoopAlive)
                } else {
                    Ok(())
                };
            }
        }
        if let Some(finished) = slot.take() {
            let _ = finished.handle.join();
        }

        *self.shared.failure.lock() = None;

        let shutdown = Arc::new(AtomicBool::new(false));
        let (exited_tx, exited_rx) = crossbeam_channel::bounded::<()>(1);
        let shared = Arc::clone(&self.shared);
        let thread_shutdown = Arc::clone(&shutdown);

        self.shared.running.store(true, Ordering::SeqCst);
        let spawned = thread::Builder::new()
            .name(SIMULATION_THREAD_NAME.to_string())
            .spawn(move || {
                let _exited = exited_tx;
                let dispatch = shared.dispatch.clone();
                tracing::dispatcher::with_default(&dispatch, || shared.run_loop(&thread_shutdown));
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                self.shared.running.store(false, Ordering::SeqCst);
                return Err(HostError::Spawn(err.to_string()));
            }
        };

        *slot = Some(LoopThread {
            handle,
            shutdown,
            exited: exited_rx,
        });

        let config = *self.shared.config.lock();
        self.shared.in_scope(|| {
            info!(
                fixed_step = config.fixed_step,
                max_steps = config.max_steps_per_tick,
                snapshot_interval = config.snapshot_interval,
                "simulation started"
            );
        });
        Ok(())
    }

    /// Signals the loop to exit and waits up to `stop_timeout_ms` for it.
    ///
    /// On timeout the thread is left running detached; a later
    /// [`Self::start_simulation`] refuses until it has exited. Calling
    /// stop again waits for (and reaps) that thread.
    pub fn stop_simulation(&self) -> StopOutcome {
        let mut slot = self.loop_thread.lock();
        let Some(thread) = slot.as_ref() else {
            return StopOutcome::NotRunning;
        };

        let outcome = if thread.handle.is_finished() {
            // a detached thread reaped after an earlier timeout counts as stopped
            if thread.shutdown.load(Ordering::SeqCst) {
                StopOutcome::Stopped
            } else {
                StopOutcome::NotRunning
            }
        } else {
            thread.shutdown.store(true, Ordering::SeqCst);
            let timeout = self.shared.config.lock().stop_timeout();
            match thread.exited.recv_timeout(timeout) {
                Err(RecvTimeoutError::Timeout) => {
                    self.shared.in_scope(|| {
                        warn!(timeout_ms = timeout.as_millis() as u64, "simulation thread did not stop in time");
                    });
                    return StopOutcome::TimedOut;
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => StopOutcome::Stopped,
            }
        };

        if let Some(thread) = slot.take() {
            let _ = thread.handle.join();
        }
        self.shared.running.store(false, Ordering::SeqCst);

        if outcome == StopOutcome::Stopped {
            let tick = self.current_tick();
            self.shared.in_scope(|| info!(tick, "simulation stopped"));
        }
        outcome
    }

    /// True while the loop thread is stepping.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// The error that ended the last run, if any.
    #[must_use]
    pub fn loop_failure(&self) -> Option<LoopFailure> {
        self.shared.failure.lock().clone()
    }

    /// Stops the loop, drains every queue and drops all subscribers.
    /// No callback fires afterwards. Idempotent; also runs on drop.
    pub fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let stopped = self.stop_simulation();

        let commands = self.shared.intake_rx.try_iter().count();
        let dispatched = self.shared.dispatch_rx.try_iter().count();
        let snapshots = self.shared.snapshot_rx.try_iter().count();
        let _ = self.shared.latest.take();
        self.shared.result_subscribers.lock().clear();
        self.shared.event_subscribers.lock().clear();

        self.shared.in_scope(|| {
            debug!(?stopped, commands, dispatched, snapshots, "host disposed");
        });
    }

    /// True after [`Self::dispose`].
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::SeqCst)
    }

    // =========================================================================
    // STEPPING
    // =========================================================================

    /// Runs one step of `dt` seconds on the calling thread and returns its
    /// tick. Serialized with the loop thread.
    ///
    /// # Panics
    ///
    /// Propagates a panic from `build_snapshot`.
    pub fn advance(&self, dt: f32) -> Tick {
        self.shared.in_scope(|| self.shared.advance(dt))
    }

    /// Last tick advanced; 0 before the first step.
    #[must_use]
    pub fn current_tick(&self) -> Tick {
        self.shared.tick.load(Ordering::SeqCst)
    }

    /// Runs `f` with exclusive access to the simulation, between steps.
    pub fn with_simulation<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.shared.core.lock().simulation)
    }

    // =========================================================================
    // CONSUMER SIDE
    // =========================================================================

    /// Delivers queued results and events to subscribers on this thread.
    ///
    /// Only items queued when the call starts are delivered, so a busy
    /// loop thread cannot keep the caller here. A panicking subscriber is
    /// logged and skipped. Subscriptions changed by a callback apply from
    /// the next flush. Returns the number of items drained.
    pub fn flush_events(&self) -> usize {
        let shared = &self.shared;
        if shared.disposed.load(Ordering::SeqCst) {
            return 0;
        }

        let pending = shared.dispatch_rx.len();
        if pending == 0 {
            return 0;
        }

        let on_result = subscriber_list(&shared.result_subscribers);
        let on_event = subscriber_list(&shared.event_subscribers);

        shared.in_scope(|| {
            let mut drained = 0;
            for item in shared.dispatch_rx.try_iter().take(pending) {
                if shared.disposed.load(Ordering::SeqCst) {
                    break;
                }
                match item {
                    Dispatched::Result(result) => shared.deliver(&on_result, &result, "result"),
                    Dispatched::Event(event) => shared.deliver(&on_event, &event, "event"),
                }
                drained += 1;
            }
            drained
        })
    }

    /// Most recently published snapshot. Never blocks.
    #[must_use]
    pub fn latest_snapshot(&self) -> Option<Arc<S::Snapshot>> {
        self.shared.latest.load()
    }

    /// Oldest snapshot sample not yet consumed.
    #[must_use]
    pub fn try_next_snapshot(&self) -> Option<Arc<S::Snapshot>> {
        self.shared.snapshot_rx.try_recv().ok()
    }

    /// Every queued snapshot sample, oldest first.
    #[must_use]
    pub fn drain_snapshots(&self) -> Vec<Arc<S::Snapshot>> {
        self.shared.snapshot_rx.try_iter().collect()
    }

    /// Subscribes to results. Ignored after dispose.
    pub fn on_result(&self, callback: impl Fn(&S::Output) + Send + Sync + 'static) -> SubscriptionId {
        let id = self.shared.next_subscription_id();
        if !self.is_disposed() {
            self.shared.result_subscribers.lock().push((id, Arc::new(callback)));
        }
        id
    }

    /// Subscribes to events. Ignored after dispose.
    pub fn on_event(&self, callback: impl Fn(&S::Event) + Send + Sync + 'static) -> SubscriptionId {
        let id = self.shared.next_subscription_id();
        if !self.is_disposed() {
            self.shared.event_subscribers.lock().push((id, Arc::new(callback)));
        }
        id
    }

    /// Removes a subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut results = self.shared.result_subscribers.lock();
        let before = results.len();
        results.retain(|(sub, _)| *sub != id);
        if results.len() != before {
            return true;
        }
        drop(results);

        let mut events = self.shared.event_subscribers.lock();
        let before = events.len();
        events.retain(|(sub, _)| *sub != id);
        events.len() != before
    }

    // =========================================================================
    // INTROSPECTION
    // =========================================================================

    /// Counters and step timing.
    #[must_use]
    pub fn stats(&self) -> HostStats {
        *self.shared.stats.lock()
    }

    /// Current tunables.
    #[must_use]
    pub fn config(&self) -> HostConfig {
        *self.shared.config.lock()
    }

    /// Replaces the tunables; the loop picks them up on its next frame.
    /// `snapshot_queue_capacity` keeps the value the host was created with.
    pub fn set_config(&self, config: HostConfig) {
        let mut current = self.shared.config.lock();
        let capacity = current.snapshot_queue_capacity;
        *current = HostConfig {
            snapshot_queue_capacity: capacity,
            ..config.sanitized()
        };
    }
}

impl<S: Simulation> Drop for Host<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Cloneable handle for producer threads.
pub struct CommandSender<S: Simulation> {
    shared: Arc<Shared<S>>,
}

impl<S: Simulation> CommandSender<S> {
    /// Same as [`Host::send_command`].
    pub fn send(&self, command: S::Command) -> bool {
        self.shared.enqueue_command(command)
    }
}

impl<S: Simulation> Clone for CommandSender<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

fn subscriber_list<T: ?Sized>(subscribers: &Mutex<Vec<(SubscriptionId, Arc<T>)>>) -> Vec<Arc<T>> {
    subscribers.lock().iter().map(|(_, callback)| Arc::clone(callback)).collect()
}

/// Snapshot cadence: every tick when `interval` is zero, otherwise once per
/// `interval` of accumulated `dt`. A backlog of more than one interval is
/// dropped.
fn snapshot_due(accumulator: &mut f32, interval: f32, dt: f32) -> bool {
    if interval <= 0.0 {
        return true;
    }
    *accumulator += dt;
    if *accumulator < interval {
        return false;
    }
    *accumulator -= interval;
    if *accumulator >= interval {
        *accumulator = 0.0;
    }
    true
}

impl<S: Simulation> Shared<S> {
    fn in_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    fn next_subscription_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed))
    }

    fn enqueue_command(&self, command: S::Command) -> bool {
        if self.disposed.load(Ordering::SeqCst) {
            return false;
        }
        self.intake_tx.send(command).is_ok()
    }

    // The receivers live in `self`, so sends on the unbounded queues
    // cannot fail.
    fn enqueue_result(&self, result: S::Output) {
        let _ = self.dispatch_tx.send(Dispatched::Result(result));
        self.stats.lock().results_dispatched += 1;
    }

    fn enqueue_event(&self, event: S::Event) {
        let _ = self.dispatch_tx.send(Dispatched::Event(event));
        self.stats.lock().events_dispatched += 1;
    }

    fn deliver<T>(&self, subscribers: &[Callback<T>], item: &T, kind: &'static str) {
        for callback in subscribers {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(item))) {
                self.stats.lock().subscriber_panics += 1;
                warn!(kind, error = %panic_message(payload.as_ref()), "subscriber panicked");
            }
        }
    }

    // =========================================================================
    // LOOP THREAD
    // =========================================================================

    fn run_loop(&self, shutdown: &AtomicBool) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| self.step_loop(shutdown))) {
            let failure = LoopFailure {
                tick: self.tick.load(Ordering::SeqCst),
                message: panic_message(payload.as_ref()),
            };
            error!(tick = failure.tick, error = %failure.message, "simulation loop terminated");
            *self.failure.lock() = Some(failure);
        }
        self.running.store(false, Ordering::SeqCst);
    }

    fn step_loop(&self, shutdown: &AtomicBool) {
        let mut clock = FixedStepClock::from_config(&self.config.lock());
        let mut last_frame = Instant::now();

        while !shutdown.load(Ordering::SeqCst) && !self.disposed.load(Ordering::SeqCst) {
            let config = *self.config.lock();
            clock.retune(config.fixed_step, config.max_steps_per_tick, config.max_frame_delta);

            let now = Instant::now();
            let delta = now.duration_since(last_frame).as_secs_f64();
            last_frame = now;

            let capped_before = clock.stats().capped_frames;
            let steps = clock.accumulate(delta);
            if clock.stats().capped_frames != capped_before {
                self.stats.lock().capped_frames += 1;
                trace!(steps, "step cap hit, backlog discarded");
            }

            let dt = clock.step();
            for _ in 0..steps {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                self.advance(dt);
            }

            if config.sleep_ms == 0 {
                thread::yield_now();
            } else {
                thread::sleep(Duration::from_millis(config.sleep_ms));
            }
        }
    }

    // =========================================================================
    // STEP
    // =========================================================================

    fn advance(&self, dt: f32) -> Tick {
        let started = Instant::now();
        let mut core = self.core.lock();
        if self.disposed.load(Ordering::SeqCst) {
            return self.tick.load(Ordering::SeqCst);
        }
        let tick = self.tick.fetch_add(1, Ordering::SeqCst) + 1;

        let mut commands = 0usize;
        while let Ok(command) = self.intake_rx.try_recv() {
            self.run_command(&mut core.simulation, tick, &command);
            commands += 1;
        }

        self.run_tick_hook(&mut core.simulation, tick, dt);

        let interval = self.config.lock().snapshot_interval;
        if snapshot_due(&mut core.snapshot_accumulator, interval, dt) {
            if let Some(snapshot) = core.simulation.build_snapshot(tick) {
                self.publish_snapshot(tick, Arc::new(snapshot));
            }
        }
        drop(core);

        let budget = self.config.lock().step_duration();
        self.stats.lock().record_step(started.elapsed(), budget);
        trace!(tick, commands, "step");
        tick
    }

    fn run_command(&self, simulation: &mut S, tick: Tick, command: &S::Command) {
        let handled = panic::catch_unwind(AssertUnwindSafe(|| simulation.handle_command(tick, command)))
            .unwrap_or_else(|payload| Err(SimulationError::Panicked(panic_message(payload.as_ref()))));
        self.stats.lock().commands_processed += 1;

        match handled {
            Ok(outcome) => self.dispatch_outcome(outcome),
            Err(err) => {
                self.stats.lock().command_failures += 1;
                let header = command.header();
                error!(
                    tick,
                    correlation_id = %header.correlation_id,
                    sender_id = header.sender_id,
                    error = %err,
                    "command handler failed"
                );

                match panic::catch_unwind(AssertUnwindSafe(|| simulation.error_event(tick, command, &err))) {
                    Ok(Some(event)) => self.enqueue_event(event),
                    Ok(None) => {}
                    Err(payload) => {
                        error!(tick, error = %panic_message(payload.as_ref()), "error event builder panicked");
                    }
                }
            }
        }
    }

    fn dispatch_outcome(&self, outcome: CommandOutcome<S::Output, S::Event>) {
        let (pre_events, result, post_events) = outcome.into_parts();
        for event in pre_events {
            self.enqueue_event(event);
        }
        if let Some(result) = result {
            self.enqueue_result(result);
        }
        for event in post_events {
            self.enqueue_event(event);
        }
    }

    fn run_tick_hook(&self, simulation: &mut S, tick: Tick, dt: f32) {
        let mut events = Vec::new();
        let ticked = panic::catch_unwind(AssertUnwindSafe(|| simulation.on_tick(tick, dt, &mut events)))
            .unwrap_or_else(|payload| Err(SimulationError::Panicked(panic_message(payload.as_ref()))));

        for event in events {
            self.enqueue_event(event);
        }

        if let Err(err) = ticked {
            self.stats.lock().tick_failures += 1;
            error!(tick, error = %err, "tick hook failed");
        }
    }

    fn publish_snapshot(&self, tick: Tick, snapshot: Arc<S::Snapshot>) {
        let mut sample = Arc::clone(&snapshot);
        loop {
            match self.snapshot_tx.try_send(sample) {
                Ok(()) => break,
                Err(TrySendError::Full(rejected)) => {
                    if self.snapshot_rx.try_recv().is_ok() {
                        self.stats.lock().snapshots_dropped += 1;
                        debug!(tick, "snapshot queue full, oldest sample dropped");
                    }
                    sample = rejected;
                }
                Err(TrySendError::Disconnected(_)) => break,
            }
        }

        self.latest.publish(snapshot);
        self.stats.lock().snapshots_published += 1;
    }
}
