use thiserror::Error;

pub type Result<T, E = AuteurError> = std::result::Result<T, E>;

/// Unified error type covering failure scenarios across the director subsystems.
#[derive(Debug, Error)]
pub enum AuteurError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("timeline error: {0}")]
    Timeline(String),
    #[error("heuristic error: {0}")]
    Heuristic(String),
    #[error("selection error: {0}")]
    Selection(String),
    #[error("clock error: {0}")]
    Clock(String),
    #[error("director error: {0}")]
    Director(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("operational error: {0}")]
    Ops(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
