use thiserror::Error;

/// Failures reported by the bracket engine.
///
/// Every variant except `Store` is a domain outcome that callers are expected
/// to tell apart; `Store` carries whatever went wrong underneath.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("caller identity is missing")]
    Authentication,

    #[error("{0}")]
    Authorization(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Precondition(String),

    #[error("{0}")]
    Integrity(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl EngineError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Stable identifier used in API error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Authentication => "authentication",
            EngineError::Authorization(_) => "authorization",
            EngineError::NotFound { .. } => "not_found",
            EngineError::InvalidState(_) => "invalid_state",
            EngineError::Precondition(_) => "precondition",
            EngineError::Integrity(_) => "integrity",
            EngineError::Sqlite(_) | EngineError::Store(_) => "internal",
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_stay_distinct() {
        let errors = [
            EngineError::Authentication,
            EngineError::Authorization("no".into()),
            EngineError::not_found("tournament", "t1"),
            EngineError::InvalidState("live".into()),
            EngineError::Precondition("one entrant".into()),
            EngineError::Integrity("missing match".into()),
        ];

        let mut kinds: Vec<_> = errors.iter().map(|e| e.kind()).collect();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn test_not_found_message() {
        let err = EngineError::not_found("match", "m-42");
        assert_eq!(err.to_string(), "match not found: m-42");
    }
}
