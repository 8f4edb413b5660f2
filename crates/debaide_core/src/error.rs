//! crates/debaide_core/src/error.rs
//!
//! The error taxonomy surfaced by the debate engine to its callers.

use crate::ports::PortError;

/// Every rejection the engine can produce. Each variant carries enough detail
/// for the caller to act on it (which stage, whose turn, which player is incomplete).
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    /// A topic, session, battle or user does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The requested transition is not valid from the current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Malformed request data (bad stance, empty text, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A segment kind outside {opening, rebuttal, closing}.
    #[error("Invalid segment kind '{0}', expected one of opening, rebuttal, closing")]
    InvalidKind(String),

    /// The caller is not allowed to perform this action right now.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The AI judge was unreachable or returned something unusable.
    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),

    /// A persistence or collaborator error that has no domain meaning.
    #[error("Service Port Error: {0}")]
    Port(PortError),
}

impl ArenaError {
    /// A stable, machine-readable label for the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            ArenaError::NotFound(_) => "not_found",
            ArenaError::InvalidState(_) => "invalid_state",
            ArenaError::InvalidInput(_) | ArenaError::InvalidKind(_) => "invalid_input",
            ArenaError::Forbidden(_) => "forbidden",
            ArenaError::UpstreamFailure(_) => "upstream_failure",
            ArenaError::Port(_) => "internal",
        }
    }
}

impl From<PortError> for ArenaError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(what) => ArenaError::NotFound(what),
            // Guarded writes report a lost race as a conflict; to the caller that
            // is simply a state that no longer allows the transition.
            PortError::Conflict(what) => ArenaError::InvalidState(what),
            other => ArenaError::Port(other),
        }
    }
}

/// A convenience type alias for `Result<T, ArenaError>`.
pub type ArenaResult<T> = Result<T, ArenaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_errors_map_onto_the_taxonomy() {
        let not_found: ArenaError = PortError::NotFound("Battle x not found".into()).into();
        assert!(matches!(not_found, ArenaError::NotFound(_)));

        let conflict: ArenaError = PortError::Conflict("stale turn".into()).into();
        assert!(matches!(conflict, ArenaError::InvalidState(_)));

        let unexpected: ArenaError = PortError::Unexpected("pool closed".into()).into();
        assert_eq!(unexpected.kind(), "internal");
    }

    #[test]
    fn invalid_kind_is_an_input_error() {
        let err = ArenaError::InvalidKind("preamble".into());
        assert_eq!(err.kind(), "invalid_input");
        assert!(err.to_string().contains("preamble"));
    }
}
