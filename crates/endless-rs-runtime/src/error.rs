use thiserror::Error;

/// Failures surfaced through an instance future. Cloneable so every waiter
/// of a coalesced build observes the same outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DimensionServiceError {
    #[error("no dimension definition registered for {0}")]
    UnknownDefinition(String),

    #[error("pack build failed: {0}")]
    Build(String),

    #[error("engine failure: {0}")]
    Engine(String),

    #[error("dimension service is shutting down")]
    Cancelled,
}
