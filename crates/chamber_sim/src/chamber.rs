use std::ops::Range;

use bevy::log::debug;
use chamber_core::config::validate_timestep;
use chamber_core::{
    AtomError, AtomState, BroadPhaseMode, ChamberConfig, ConfigError, Metrics, SHARDS_PER_WORKER,
    UnitScale, Vector,
};
use chamber_physics::broad_phase::register_atoms;
use chamber_physics::thermodynamics;
use chamber_physics::{
    AtomStore, CollisionResponse, ElasticCollision, EscapeHole, Pair, PairScan, WallHits,
    WallImpulse,
};

use crate::error::SimError;
use crate::executor::Executor;

/// Where a tick currently is. Between ticks the chamber is always `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPhase {
    #[default]
    Idle,
    Moving,
    WallColliding,
    Hashing,
    Sorting,
    BroadPhaseDispatch,
    NarrowPhaseRunning,
}

/// Grid entries produced by one hashing shard
#[derive(Debug, Default)]
struct HashShard {
    atoms: Range<usize>,
    hashes: Vec<u32>,
    entries: Vec<u32>,
}

/// Pairs found in one contiguous group of runs
#[derive(Debug, Default)]
struct PairShard {
    runs: Range<usize>,
    pairs: Vec<Pair>,
}

/// `0..n` cut into `count` contiguous, possibly empty, ranges
fn split_ranges(n: usize, count: usize) -> impl Iterator<Item = Range<usize>> {
    let chunk = n.div_ceil(count.max(1)).max(1);
    (0..count.max(1)).map(move |k| (k * chunk).min(n)..((k + 1) * chunk).min(n))
}

/// A box of hard-sphere gas and everything needed to advance it.
///
/// `tick` runs the whole pipeline (move, escape hole, walls, hash, sort,
/// scan, narrow phase, response) before returning; nothing outside the
/// chamber ever sees a partly advanced state.
pub struct Chamber {
    config: ChamberConfig,
    store: AtomStore,
    impulse: WallImpulse,
    executor: Executor,
    workers: usize,
    response: Box<dyn CollisionResponse>,
    phase: TickPhase,
    /// Simulated seconds
    time: f64,
    ticks: u64,
    collisions: Vec<Pair>,
    resolved: usize,
    escaped: Vec<usize>,
    hash_shards: Vec<HashShard>,
    pair_shards: Vec<PairShard>,
}

impl Chamber {
    pub fn new(config: ChamberConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let store = AtomStore::new(
            &config.box_size,
            config.cell_size,
            config.units,
            config.broad_phase,
        )?;
        let workers = config.worker_count();
        let executor = Executor::new(config.parallelism, workers);
        Ok(Self {
            config,
            store,
            impulse: WallImpulse::new(),
            executor,
            workers,
            response: Box::new(ElasticCollision),
            phase: TickPhase::Idle,
            time: 0.0,
            ticks: 0,
            collisions: Vec::new(),
            resolved: 0,
            escaped: Vec::new(),
            hash_shards: Vec::new(),
            pair_shards: Vec::new(),
        })
    }

    /// Replace box, grid and unit scales, carrying existing atoms over.
    ///
    /// Atoms outside the new box are pulled back inside; the pressure window
    /// restarts.
    pub fn configure(
        &mut self,
        box_size: Vector,
        cell_size: f64,
        units: UnitScale,
    ) -> Result<(), SimError> {
        let mut store = AtomStore::new(&box_size, cell_size, units, self.config.broad_phase)?;
        store.extend_from_slice(&self.store.atoms())?;
        store.set_walls(&box_size)?;

        self.store = store;
        self.config.box_size = box_size;
        self.config.cell_size = cell_size;
        self.config.units = units;
        self.impulse.reset();
        self.collisions.clear();
        Ok(())
    }

    pub fn config(&self) -> &ChamberConfig {
        &self.config
    }

    pub fn store(&self) -> &AtomStore {
        &self.store
    }

    /// Append `n` atoms produced by `generator`
    pub fn populate(
        &mut self,
        n: usize,
        generator: impl FnMut() -> AtomState,
    ) -> Result<(), AtomError> {
        self.store.add_atoms(n, generator)
    }

    pub fn push(&mut self, atom: AtomState) -> Result<usize, AtomError> {
        self.store.push(atom)
    }

    pub fn atom(&self, index: usize) -> Result<AtomState, AtomError> {
        self.store.atom(index)
    }

    pub fn commit(&mut self, index: usize, state: &AtomState) -> Result<(), AtomError> {
        self.store.commit(index, state)
    }

    /// Remove atom `index`; the last atom moves into its slot
    pub fn delete_atom(&mut self, index: usize) -> Result<AtomState, AtomError> {
        self.store.delete_atom(index)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn set_timestep(&mut self, dt: f64) -> Result<(), ConfigError> {
        validate_timestep(dt)?;
        self.config.dt = dt;
        Ok(())
    }

    pub fn set_enable_collisions(&mut self, enabled: bool) {
        self.config.enable_collisions = enabled;
    }

    pub fn set_enable_escape_hole(&mut self, enabled: bool) {
        self.config.enable_hole = enabled;
    }

    /// Move the right wall to `length` metres
    pub fn set_x_length(&mut self, length: f64) -> Result<(), ConfigError> {
        let mut box_size = self.config.box_size;
        box_size[0] = length;
        self.store.set_walls(&box_size)?;
        self.config.box_size = box_size;
        self.impulse.reset();
        Ok(())
    }

    pub fn set_broad_phase_mode(&mut self, mode: BroadPhaseMode) {
        self.store.set_broad_phase_mode(mode);
        self.config.broad_phase = mode;
    }

    pub fn set_response(&mut self, response: Box<dyn CollisionResponse>) {
        self.response = response;
    }

    /// Candidate pairs found during the last tick
    pub fn collisions(&self) -> &[Pair] {
        &self.collisions
    }

    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    /// Simulated time (s)
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn snapshot(&self) -> Metrics {
        thermodynamics::measure(
            &self.store,
            &self.impulse,
            self.time,
            self.ticks,
            self.resolved,
        )
    }

    /// Advance by the configured timestep
    pub fn step(&mut self) -> Result<(), ConfigError> {
        self.tick(self.config.dt)
    }

    /// Advance by `dt` seconds
    pub fn tick(&mut self, dt: f64) -> Result<(), ConfigError> {
        validate_timestep(dt)?;
        let dt_internal = self.store.units().time_in(dt);
        let shards = self.workers * SHARDS_PER_WORKER;

        self.collisions.clear();
        self.resolved = 0;
        self.impulse.advance(dt_internal);

        self.phase = TickPhase::Moving;
        let chunk = self.store.len().div_ceil(shards).max(1);
        let mut moving = self.store.axis_shards(chunk);
        self.executor
            .for_each_mut(&mut moving, |shard| shard.integrate(dt_internal));
        drop(moving);

        self.phase = TickPhase::WallColliding;
        if self.config.enable_hole {
            let hole = EscapeHole::new(&self.store.walls());
            let escaped = self.store.remove_escapes(&hole, &mut self.escaped);
            if escaped > 0 {
                debug!("{} atoms escaped through the hole", escaped);
            }
        }
        self.reflect_walls(shards);

        if self.config.enable_collisions {
            self.find_collisions(shards);
            self.resolved = self
                .store
                .resolve_pairs(&self.collisions, self.response.as_ref());
        }

        self.time += dt;
        self.ticks += 1;
        self.phase = TickPhase::Idle;
        Ok(())
    }

    fn reflect_walls(&mut self, shards: usize) {
        let walls = self.store.walls();
        let chunk = self.store.len().div_ceil(shards).max(1);
        let mut jobs: Vec<_> = self
            .store
            .axis_shards(chunk)
            .into_iter()
            .map(|shard| (shard, WallHits::default()))
            .collect();
        self.executor.for_each_mut(&mut jobs, |(shard, hits)| {
            *hits = shard.reflect(walls[shard.axis]);
        });
        for (shard, hits) in &jobs {
            self.impulse.add_hits(shard.axis, hits);
        }
    }

    /// Hash, sort and scan in parallel shards; leaves every overlapping pair
    /// in `self.collisions`, in shard order.
    fn find_collisions(&mut self, shards: usize) {
        self.phase = TickPhase::Hashing;
        let n = self.store.len();
        self.hash_shards.resize_with(shards, HashShard::default);
        for (shard, atoms) in self.hash_shards.iter_mut().zip(split_ranges(n, shards)) {
            shard.atoms = atoms;
        }

        let (positions, radii, broad) = self.store.split_broad_phase();
        let grid = broad.grid().clone();
        let mode = broad.mode();
        self.executor.for_each_mut(&mut self.hash_shards, |shard| {
            let range = shard.atoms.clone();
            shard.hashes.clear();
            shard.entries.clear();
            register_atoms(
                &grid,
                mode,
                std::array::from_fn(|d| &positions[d][range.clone()]),
                &radii[range.clone()],
                range.start,
                &mut shard.hashes,
                &mut shard.entries,
            );
        });
        broad.clear();
        for shard in &self.hash_shards {
            broad.extend(&shard.hashes, &shard.entries);
        }

        self.phase = TickPhase::Sorting;
        broad.sort();

        self.phase = TickPhase::BroadPhaseDispatch;
        broad.collect_runs();
        let broad = &*broad;
        let runs = broad.runs();
        self.pair_shards.resize_with(shards, PairShard::default);
        for (shard, group) in self.pair_shards.iter_mut().zip(split_ranges(runs.len(), shards)) {
            shard.runs = group;
        }

        self.phase = TickPhase::NarrowPhaseRunning;
        let scan = PairScan::new(positions, radii, broad);
        self.executor.for_each_mut(&mut self.pair_shards, |shard| {
            shard.pairs.clear();
            scan.scan_runs(&runs[shard.runs.clone()], &mut shard.pairs);
        });
        for shard in &self.pair_shards {
            self.collisions.extend_from_slice(&shard.pairs);
        }
    }
}

impl std::fmt::Debug for Chamber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chamber")
            .field("atoms", &self.len())
            .field("parallelism", &self.executor.parallelism())
            .field("workers", &self.workers)
            .field("phase", &self.phase)
            .field("time", &self.time)
            .field("ticks", &self.ticks)
            .finish()
    }
}
