// Engine constants (dimensionless internal units unless noted)
// Lengths are stored as multiples of `UnitScale::meter` and times as
// multiples of `UnitScale::second`, so a default gas of helium-sized atoms
// in a nanometre box moves at O(1) internal units per tick.

/// Number of spatial axes
pub const DIM: usize = 3;

/// Two walls per axis: the near (coordinate 0) and far (coordinate = box length) face
pub const WALL_COUNT: usize = 2 * DIM;

/// Slots in the rolling wall-impulse window used for pressure averaging
pub const MEASUREMENT_SIZE: usize = 64;

/// Width of a packed cell hash
pub const HASH_BITS: u32 = 32;

/// Bits per radix digit
pub const RADIX_DIGIT_BITS: u32 = 8;

/// Buckets per radix pass
pub const RADIX_BUCKETS: usize = 1 << RADIX_DIGIT_BITS;

/// Number of counting-sort passes needed to cover a full cell hash
pub const RADIX_PASSES: u32 = HASH_BITS / RADIX_DIGIT_BITS;

/// Shards handed to each worker per phase (load balancing for uneven runs)
pub const SHARDS_PER_WORKER: usize = 4;

/// Centres closer than this (internal units) have no usable collision normal
pub const MIN_SEPARATION: f64 = 1e-12;

/// Half-extent of the escape aperture relative to the wall it is cut into
pub const HOLE_FRACTION: f64 = 0.1;

/// Upper bound on the driver's inter-tick delay (microseconds)
pub const MAX_TICK_DELAY_US: u64 = 5_000_000;

/// Growth factor of the driver delay per period step
pub const TICK_DELAY_BASE: f64 = 1.2;

/// Boltzmann constant (J/K)
pub const K_B: f64 = 1.38064e-23;

/// Unified atomic mass unit (kg)
pub const DALTON: f64 = 1.660e-27;

/// Default timestep (s)
pub const DT: f64 = 1e-14;
