pub mod barrier;
pub mod chamber;
pub mod driver;
pub mod error;
pub mod executor;
pub mod pipeline;
pub mod pool;

pub use barrier::CyclicBarrier;
pub use chamber::{Chamber, TickPhase};
pub use driver::{ChamberHandle, PhysicsDriver};
pub use error::SimError;
pub use executor::Executor;
pub use pipeline::ChamberPlugin;
pub use pool::WorkerPool;
