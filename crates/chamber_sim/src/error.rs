use chamber_core::{AtomError, ConfigError};

/// Failure of a chamber operation or of the thread driving it.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Atom(#[from] AtomError),
    /// A tick panicked while holding the chamber lock; its state may be half-updated
    #[error("chamber lock poisoned by a panicking tick")]
    Poisoned,
    #[error("physics driver is not running")]
    DriverStopped,
    #[error("physics driver thread panicked")]
    DriverPanicked,
    #[error("failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),
}
