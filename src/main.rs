use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use chamber_core::ChamberConfig;
use chamber_physics::procgen::{self, GasSpec, Half};
use chamber_sim::{Chamber, ChamberHandle, ChamberPlugin, PhysicsDriver, SimError};

/// Host settings read from the environment
#[derive(Resource, Debug, Clone)]
struct HostSettings {
    config_path: Option<PathBuf>,
    atoms: usize,
    seed: u64,
    run_for: Duration,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

impl HostSettings {
    fn from_env() -> Self {
        Self {
            config_path: std::env::var_os("CHAMBER_CONFIG").map(PathBuf::from),
            atoms: env_or("CHAMBER_ATOMS", 10_000),
            seed: env_or("CHAMBER_SEED", 42),
            run_for: Duration::from_secs_f64(env_or("CHAMBER_RUN_SECS", 10.0f64).max(0.0)),
        }
    }

    fn config(&self) -> ChamberConfig {
        let Some(path) = &self.config_path else {
            return ChamberConfig::default();
        };
        match ChamberConfig::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring {:?} ({}), using the default chamber", path, e);
                ChamberConfig::default()
            }
        }
    }
}

/// Helium in the left half, xenon in the right
fn build_chamber(settings: &HostSettings) -> Result<Chamber, SimError> {
    let config = settings.config();
    let box_size = config.box_size;
    let mut chamber = Chamber::new(config)?;

    let heavy = settings.atoms / 2;
    chamber.populate(
        settings.atoms - heavy,
        procgen::half_gas(
            box_size,
            GasSpec::helium(2e3),
            Half::Lower,
            procgen::seeded_rng(settings.seed),
        ),
    )?;
    chamber.populate(
        heavy,
        procgen::half_gas(
            box_size,
            GasSpec::xenon(3e2),
            Half::Upper,
            procgen::seeded_rng(settings.seed.wrapping_add(1)),
        ),
    )?;
    info!("Chamber ready: {:?}", chamber);
    Ok(chamber)
}

fn start_chamber(mut commands: Commands, settings: Res<HostSettings>, mut exit: EventWriter<AppExit>) {
    let started = build_chamber(&settings).and_then(|chamber| {
        let period = chamber.config().tick_period;
        let handle = ChamberHandle::new(chamber);
        let driver = PhysicsDriver::spawn(handle.clone(), period)?;
        Ok((handle, driver))
    });
    match started {
        Ok((handle, driver)) => {
            commands.insert_resource(handle);
            commands.insert_resource(driver);
        }
        Err(e) => {
            error!("Failed to start the chamber: {}", e);
            exit.send(AppExit::error());
        }
    }
}

/// Stop the driver and leave once the run time is up
fn finish_run(
    mut commands: Commands,
    time: Res<Time>,
    settings: Res<HostSettings>,
    chamber: Option<Res<ChamberHandle>>,
    mut exit: EventWriter<AppExit>,
) {
    if time.elapsed() < settings.run_for {
        return;
    }
    commands.remove_resource::<PhysicsDriver>();
    if let Some(chamber) = chamber {
        match chamber.snapshot() {
            Ok(metrics) => info!(
                "Finished after {} ticks ({:.3e} s simulated), T = {:.1} K",
                metrics.tick,
                metrics.time,
                metrics.temperature()
            ),
            Err(e) => error!("Final metrics unavailable: {}", e),
        }
    }
    exit.send(AppExit::Success);
}

fn main() {
    App::new()
        .add_plugins(
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
                1.0 / 30.0,
            ))),
        )
        .add_plugins(LogPlugin::default())
        .insert_resource(HostSettings::from_env())
        .add_plugins(ChamberPlugin::default())
        .add_systems(Startup, start_chamber)
        .add_systems(Update, finish_run)
        .run();
}
