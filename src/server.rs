//! The server half of the OT control algorithm: the serialization
//! point. One [Server] owns one document and its linear history of
//! accepted operations; every incoming operation is transformed
//! against the history its author hadn't seen, applied, appended, and
//! announced for broadcast.

use crate::error::{OtError, OtResult};
use crate::types::{Revision, StampedOp};
use crate::wrapped::{OperationMeta, WrappedOperation};

/// What the server signals to the transport. One method per event.
pub trait ServerCallbacks<M> {
    /// An operation was accepted at `revision`. The transport
    /// broadcasts it to every connected client (including an echo to
    /// the author, which its client state machine recognizes by id).
    fn operation_accepted(&mut self, revision: Revision, op: &StampedOp<M>);
}

/// Canonical document state plus the append-only operation log.
/// Revision n is the document after the first n operations; the log is
/// never rewritten or compacted.
///
/// Callers must serialize [receive_operation](Self::receive_operation)
/// calls for a document: the transform-against-history step reads the
/// log and then extends it, and two interleaved receives would both
/// transform against the same base and corrupt the ordering. One task
/// or one mutex per document.
#[derive(Debug, Clone)]
pub struct Server<M> {
    document: String,
    operations: Vec<StampedOp<M>>,
}

impl<M: OperationMeta> Server<M> {
    pub fn new(document: String) -> Server<M> {
        Server {
            document,
            operations: vec![],
        }
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    /// The revision the next accepted operation will get.
    pub fn revision(&self) -> Revision {
        self.operations.len()
    }

    /// The accepted operations from `revision` onward, for a client
    /// that needs to catch up (e.g. resynchronizing after a rejected
    /// operation).
    pub fn operations_since(&self, revision: Revision) -> &[StampedOp<M>] {
        if revision < self.operations.len() {
            &self.operations[revision..]
        } else {
            &[]
        }
    }

    /// Accept one operation from a client. `base_revision` is the
    /// revision the author saw; the operation is transformed against
    /// everything accepted since, applied to the document, appended to
    /// the log, and handed to `callbacks` for broadcast. Returns the
    /// operation's canonical revision.
    ///
    /// Fully validates and transforms into new values before touching
    /// stored state, so a failing operation (a corrupt or malicious
    /// client) aborts this call without corrupting the document for
    /// everyone else.
    pub fn receive_operation<C: ServerCallbacks<M>>(
        &mut self,
        base_revision: Revision,
        op: StampedOp<M>,
        callbacks: &mut C,
    ) -> OtResult<Revision> {
        log::debug!(
            "receive_operation, base {}, history length {}, id {:?}",
            base_revision,
            self.operations.len(),
            op.id
        );
        if base_revision > self.operations.len() {
            return Err(OtError::RevisionOutOfRange {
                base: base_revision,
                history_len: self.operations.len(),
            });
        }

        // Transform against every operation the author hadn't seen.
        let mut transformed = op;
        for concurrent in &self.operations[base_revision..] {
            let (op_prime, _) = WrappedOperation::transform(&transformed.op, &concurrent.op)?;
            transformed.op = op_prime;
        }

        // Copy-then-commit: the new document is fully computed before
        // any stored state changes.
        let new_document = transformed.op.apply(&self.document)?;
        let revision = self.operations.len();
        transformed.base = revision;
        self.document = new_document;
        self.operations.push(transformed);

        if let Some(accepted) = self.operations.last() {
            callbacks.operation_accepted(revision, accepted);
        }
        Ok(revision)
    }
}

// *** Tests
