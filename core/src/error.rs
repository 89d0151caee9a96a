use crate::complaint::ComplaintStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GrievanceError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Complaint '{complaint_id}' cannot move from {from} to {to}")]
    InvalidTransition {
        complaint_id: String,
        from: ComplaintStatus,
        to: ComplaintStatus,
    },

    #[error("Complaint '{complaint_id}' has no assigned authority; it cannot become {target}")]
    MissingAssignment {
        complaint_id: String,
        target: ComplaintStatus,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GrievanceError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Stable discriminator for transports (HTTP status mapping, IPC replies).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Database(_) => "database",
            Self::Serialization(_) => "serialization",
            Self::NotFound { .. } => "not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::MissingAssignment { .. } => "missing_assignment",
            Self::InvalidInput(_) => "invalid_input",
            Self::Other(_) => "other",
        }
    }
}

pub type GrievanceResult<T> = Result<T, GrievanceError>;

/// A persisted or serialized enum value that matches no known variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
