use std::time::Duration;

use bevy::prelude::*;
use chamber_core::{Metrics, Wall};

use crate::driver::ChamberHandle;

/// Bevy plugin that logs chamber metrics on a repeating timer.
///
/// Systems only run once a [`ChamberHandle`] resource is present.
pub struct ChamberPlugin {
    pub report_every: Duration,
}

impl Default for ChamberPlugin {
    fn default() -> Self {
        Self {
            report_every: Duration::from_secs(1),
        }
    }
}

impl Plugin for ChamberPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(MetricsReport(Timer::new(
            self.report_every,
            TimerMode::Repeating,
        )))
        .add_systems(Update, report_metrics.run_if(resource_exists::<ChamberHandle>));
    }
}

#[derive(Resource)]
struct MetricsReport(Timer);

fn summary(metrics: &Metrics) -> String {
    let walls: Vec<String> = Wall::ALL
        .iter()
        .map(|&wall| format!("{} {:.3e}", wall.name(), metrics.pressure_on(wall)))
        .collect();
    format!(
        "t = {:.3e} s, tick {}, {} atoms, T = {:.1} K, E = {:.3e} J, {} collisions, p [Pa]: {}",
        metrics.time,
        metrics.tick,
        metrics.atoms.len(),
        metrics.temperature(),
        metrics.total_kinetic(),
        metrics.collisions,
        walls.join(", ")
    )
}

fn report_metrics(mut report: ResMut<MetricsReport>, time: Res<Time>, chamber: Res<ChamberHandle>) {
    if !report.0.tick(time.delta()).just_finished() {
        return;
    }
    match chamber.snapshot() {
        Ok(metrics) => info!("{}", summary(&metrics)),
        Err(e) => error!("Metrics unavailable: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chamber::Chamber;
    use chamber_core::{AtomState, ChamberConfig, Parallelism, UnitScale};

    fn chamber() -> Chamber {
        let config = ChamberConfig {
            box_size: [1.0; 3],
            cell_size: 0.25,
            units: UnitScale::new(1.0, 1.0).unwrap(),
            parallelism: Parallelism::Sequential,
            workers: 1,
            ..Default::default()
        };
        let mut chamber = Chamber::new(config).unwrap();
        chamber
            .push(AtomState::new([0.5; 3], [1.0, 0.0, 0.0], 2.0, 0.1))
            .unwrap();
        chamber
    }

    #[test]
    fn test_summary_names_every_wall() {
        let text = summary(&chamber().snapshot());
        assert!(text.contains("1 atoms"));
        for wall in Wall::ALL {
            assert!(text.contains(wall.name()));
        }
    }

    #[test]
    fn test_plugin_runs_with_and_without_chamber() {
        let mut app = App::new();
        app.init_resource::<Time>()
            .add_plugins(ChamberPlugin::default());
        app.update();
        assert!(app.world().contains_resource::<MetricsReport>());

        app.insert_resource(ChamberHandle::new(chamber()));
        app.update();
        app.update();
    }
}
