pub mod broad_phase;
pub mod grid;
pub mod impulse;
pub mod narrow_phase;
pub mod procgen;
pub mod radix;
pub mod response;
pub mod store;
pub mod thermodynamics;
pub mod walls;

pub use broad_phase::BroadPhase;
pub use grid::CellGrid;
pub use impulse::WallImpulse;
pub use narrow_phase::{Pair, PairScan};
pub use radix::RadixSorter;
pub use response::{Body, CollisionResponse, ElasticCollision};
pub use store::AtomStore;
pub use walls::{AxisShard, EscapeHole, WallHits};
