//! Fixed-rate tick driver
//!
//! [`GameLoop`] turns uneven real frame times into whole simulation ticks.
//! [`spawn`] runs it on its own thread over a shared state so adapters can
//! issue commands and take snapshots between ticks.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::command::Command;
use crate::consts::MAX_SUBSTEPS;
use crate::error::CommandError;
use crate::sim::{SimEvent, SimulationState, Snapshot, Stats, tick};

/// Longest frame the loop will try to catch up on
pub const MAX_FRAME: Duration = Duration::from_millis(100);

/// State shared between the tick thread and observers
pub type SharedState = Arc<Mutex<SimulationState>>;

pub fn shared(state: SimulationState) -> SharedState {
    Arc::new(Mutex::new(state))
}

/// Lock the state. A panic on another thread leaves the data usable, so
/// poisoning is ignored.
pub fn lock(state: &SharedState) -> MutexGuard<'_, SimulationState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fixed timestep accumulator
#[derive(Debug, Clone)]
pub struct GameLoop {
    step: Duration,
    accumulator: Duration,
    /// Driver time handed to `tick`
    sim_time: Duration,
}

impl GameLoop {
    pub fn new(step: Duration) -> Self {
        Self {
            step: step.max(Duration::from_millis(1)),
            accumulator: Duration::ZERO,
            sim_time: Duration::ZERO,
        }
    }

    pub fn sim_time(&self) -> Duration {
        self.sim_time
    }

    /// Run simulation ticks for `dt` of real time. Returns ticks run.
    pub fn update(&mut self, state: &mut SimulationState, dt: Duration) -> u32 {
        self.accumulator += dt.min(MAX_FRAME);

        let mut substeps = 0;
        while self.accumulator >= self.step && substeps < MAX_SUBSTEPS {
            self.sim_time += self.step;
            tick(state, self.sim_time);
            self.accumulator -= self.step;
            substeps += 1;
        }

        // Don't let a slow host build an ever-growing backlog
        if substeps == MAX_SUBSTEPS && self.accumulator >= self.step {
            log::debug!("Dropping {:?} of tick backlog", self.accumulator);
            self.accumulator = Duration::ZERO;
        }
        substeps
    }
}

/// Handle to a running tick thread; stops the thread when dropped
pub struct TickThread {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TickThread {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("Tick thread panicked");
            }
        }
    }
}

impl Drop for TickThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Tick `state` every `interval` on a background thread
pub fn spawn(state: SharedState, interval: Duration) -> io::Result<TickThread> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);

    let handle = thread::Builder::new()
        .name("sim-tick".into())
        .spawn(move || {
            let mut game_loop = GameLoop::new(interval);
            let mut last = Instant::now();
            log::info!("Tick thread started ({interval:?} step)");
            while !flag.load(Ordering::Relaxed) {
                thread::sleep(interval);
                let now = Instant::now();
                let dt = now - last;
                last = now;
                game_loop.update(&mut lock(&state), dt);
            }
            log::info!("Tick thread stopped at {:?}", game_loop.sim_time());
        })?;

    Ok(TickThread {
        stop,
        handle: Some(handle),
    })
}

pub fn apply_command(state: &SharedState, command: &Command) -> Result<(), CommandError> {
    command.apply(&mut lock(state))
}

pub fn snapshot(state: &SharedState) -> Snapshot {
    lock(state).snapshot()
}

pub fn stats(state: &SharedState) -> Stats {
    lock(state).stats()
}

pub fn drain_events(state: &SharedState) -> Vec<SimEvent> {
    lock(state).drain_events()
}
