use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bevy::log::{error, info};
use bevy::prelude::Resource;
use chamber_core::{MAX_TICK_DELAY_US, Metrics, TICK_DELAY_BASE};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::chamber::Chamber;
use crate::error::SimError;

const MAX_TICK_DELAY: Duration = Duration::from_micros(MAX_TICK_DELAY_US);

/// Shared, lock-guarded chamber.
///
/// Every access holds the lock for its whole duration, so a snapshot taken
/// from another thread always sees a chamber between ticks.
#[derive(Resource, Clone)]
pub struct ChamberHandle(Arc<Mutex<Chamber>>);

impl ChamberHandle {
    pub fn new(chamber: Chamber) -> Self {
        Self(Arc::new(Mutex::new(chamber)))
    }

    /// Run `f` with exclusive access to the chamber
    pub fn with<R>(&self, f: impl FnOnce(&mut Chamber) -> R) -> Result<R, SimError> {
        let mut chamber = self.0.lock().map_err(|_| SimError::Poisoned)?;
        Ok(f(&mut chamber))
    }

    pub fn tick(&self, dt: f64) -> Result<(), SimError> {
        Ok(self.with(|chamber| chamber.tick(dt))??)
    }

    pub fn step(&self) -> Result<(), SimError> {
        Ok(self.with(Chamber::step)??)
    }

    pub fn snapshot(&self) -> Result<Metrics, SimError> {
        self.with(|chamber| chamber.snapshot())
    }
}

impl std::fmt::Debug for ChamberHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ChamberHandle").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Pause,
    Resume,
    SetPeriod(Option<u32>),
    Stop,
}

/// Delay between ticks for a period exponent: `1.2^period` microseconds,
/// capped at five seconds.
pub fn tick_delay(period: u32) -> Duration {
    let micros = TICK_DELAY_BASE.powf(period as f64);
    if micros >= MAX_TICK_DELAY_US as f64 {
        return MAX_TICK_DELAY;
    }
    Duration::from_nanos((micros * 1e3).round() as u64)
}

/// Wait for the next command. `None` means keep ticking; `Some(Stop)` is also
/// returned when every sender is gone.
fn next_command(commands: &Receiver<Command>, paused: bool, period: Option<u32>) -> Option<Command> {
    if paused {
        return Some(commands.recv().unwrap_or(Command::Stop));
    }
    match period {
        Some(period) => match commands.recv_timeout(tick_delay(period)) {
            Ok(command) => Some(command),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Command::Stop),
        },
        None => {
            thread::yield_now();
            match commands.try_recv() {
                Ok(command) => Some(command),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => Some(Command::Stop),
            }
        }
    }
}

/// Driver loop; returns the number of ticks it ran
fn drive(chamber: ChamberHandle, commands: Receiver<Command>, mut period: Option<u32>) -> u64 {
    let mut ticks = 0;
    let mut paused = false;
    loop {
        if !paused {
            if let Err(e) = chamber.step() {
                error!("Physics driver stopping after {} ticks: {}", ticks, e);
                return ticks;
            }
            ticks += 1;
        }
        match next_command(&commands, paused, period) {
            Some(Command::Pause) => paused = true,
            Some(Command::Resume) => paused = false,
            Some(Command::SetPeriod(p)) => period = p,
            Some(Command::Stop) => return ticks,
            None => {}
        }
    }
}

/// Background thread that keeps ticking a shared chamber.
///
/// Pausing takes effect between ticks; a tick in progress always finishes.
#[derive(Resource)]
pub struct PhysicsDriver {
    commands: Sender<Command>,
    thread: Option<JoinHandle<u64>>,
}

impl PhysicsDriver {
    pub fn spawn(chamber: ChamberHandle, period: Option<u32>) -> Result<Self, SimError> {
        let (commands, rx) = crossbeam_channel::unbounded();
        let thread = thread::Builder::new()
            .name("chamber-driver".to_string())
            .spawn(move || drive(chamber, rx, period))?;
        info!("Physics driver started (period {:?})", period);
        Ok(Self {
            commands,
            thread: Some(thread),
        })
    }

    fn send(&self, command: Command) -> Result<(), SimError> {
        self.commands
            .send(command)
            .map_err(|_| SimError::DriverStopped)
    }

    pub fn pause(&self) -> Result<(), SimError> {
        self.send(Command::Pause)
    }

    pub fn resume(&self) -> Result<(), SimError> {
        self.send(Command::Resume)
    }

    /// Change the delay exponent; `None` ticks back to back
    pub fn set_period(&self, period: Option<u32>) -> Result<(), SimError> {
        self.send(Command::SetPeriod(period))
    }

    /// Stop the thread and return how many ticks it ran
    pub fn stop(mut self) -> Result<u64, SimError> {
        // The loop may already have ended on its own.
        self.send(Command::Stop).ok();
        let thread = self.thread.take().ok_or(SimError::DriverStopped)?;
        let ticks = thread.join().map_err(|_| SimError::DriverPanicked)?;
        info!("Physics driver stopped after {} ticks", ticks);
        Ok(ticks)
    }
}

impl Drop for PhysicsDriver {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.commands.send(Command::Stop).ok();
            thread.join().ok();
        }
    }
}

impl std::fmt::Debug for PhysicsDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsDriver")
            .field("running", &self.thread.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chamber_core::{AtomState, ChamberConfig, Parallelism, UnitScale};

    fn handle() -> ChamberHandle {
        let config = ChamberConfig {
            box_size: [1.0; 3],
            cell_size: 0.25,
            units: UnitScale::new(1.0, 1.0).unwrap(),
            dt: 1e-3,
            parallelism: Parallelism::Sequential,
            workers: 1,
            ..Default::default()
        };
        let mut chamber = Chamber::new(config).unwrap();
        chamber
            .push(AtomState::new([0.5; 3], [1.0, 0.5, 0.0], 1.0, 0.05))
            .unwrap();
        ChamberHandle::new(chamber)
    }

    #[test]
    fn test_tick_delay() {
        assert_eq!(tick_delay(0), Duration::from_micros(1));
        assert!(tick_delay(10) > Duration::from_micros(6));
        assert!(tick_delay(10) < Duration::from_micros(7));
        assert_eq!(tick_delay(200), MAX_TICK_DELAY);
        assert_eq!(tick_delay(u32::MAX), MAX_TICK_DELAY);
    }

    #[test]
    fn test_handle_ticks_under_lock() {
        let chamber = handle();
        chamber.step().unwrap();
        chamber.tick(1e-3).unwrap();
        assert!(chamber.tick(-1.0).is_err());
        let metrics = chamber.snapshot().unwrap();
        assert_eq!(metrics.tick, 2);
        assert_eq!(chamber.with(|c| c.len()).unwrap(), 1);
    }

    #[test]
    fn test_driver_pause_and_stop() {
        let chamber = handle();
        let driver = PhysicsDriver::spawn(chamber.clone(), None).unwrap();
        while chamber.snapshot().unwrap().tick < 10 {
            thread::yield_now();
        }

        driver.pause().unwrap();
        // The pause is seen after at most one more tick.
        thread::sleep(Duration::from_millis(50));
        let paused_at = chamber.snapshot().unwrap().tick;
        thread::sleep(Duration::from_millis(50));
        assert_eq!(chamber.snapshot().unwrap().tick, paused_at);

        driver.set_period(Some(5)).unwrap();
        driver.resume().unwrap();
        while chamber.snapshot().unwrap().tick <= paused_at {
            thread::yield_now();
        }

        let ticks = driver.stop().unwrap();
        assert_eq!(ticks, chamber.snapshot().unwrap().tick);
    }

    #[test]
    fn test_dropping_driver_stops_it() {
        let chamber = handle();
        let driver = PhysicsDriver::spawn(chamber.clone(), Some(0)).unwrap();
        while chamber.snapshot().unwrap().tick == 0 {
            thread::yield_now();
        }
        drop(driver);
        let stopped_at = chamber.snapshot().unwrap().tick;
        thread::sleep(Duration::from_millis(20));
        assert_eq!(chamber.snapshot().unwrap().tick, stopped_at);
    }
}
