use crate::types::Revision;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by the OT algebra and the control algorithm. All of
/// these are local, synchronous failures returned to the immediate
/// caller; nothing in this crate retries. A transport that gets one of
/// these back should resynchronize the client (refetch the document)
/// rather than continue, since convergence assumes no operation is ever
/// half-applied.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum OtError {
    #[error("Operation base length {base_length} doesn't match document length {document_length}")]
    LengthMismatch {
        base_length: usize,
        document_length: usize,
    },
    #[error("Operation consumed {consumed} characters of a {document_length}-character document")]
    IncompleteApply {
        consumed: usize,
        document_length: usize,
    },
    #[error("No rule for this pairing of operation components: {0}")]
    IncompatibleOperations(String),
    #[error("Expected an operation at revision {expected}, got revision {actual}")]
    RevisionMismatch { expected: Revision, actual: Revision },
    #[error("Base revision {base} is beyond the history (length {history_len})")]
    RevisionOutOfRange { base: Revision, history_len: usize },
    #[error("Operation not in canonical form: {0}")]
    NotInCanonicalForm(String),
}

pub type OtResult<T> = Result<T, OtError>;
