//! The client half of the OT control algorithm: a state machine that
//! tracks one outstanding unacknowledged local operation plus a buffer
//! of further local edits, and transforms every incoming remote
//! operation against both so the local document converges with the
//! server's.

use crate::error::{OtError, OtResult};
use crate::types::{LocalSeq, OpId, Revision, SiteId, StampedOp};
use crate::wrapped::{OperationMeta, WrappedOperation};
use std::mem;

/// What the state machine needs from the transport. One method per
/// event; the client never touches the network itself.
pub trait ClientTransport<M> {
    /// Transmit a local operation to the server. `op.base` is the
    /// revision it applies to.
    fn send_operation(&mut self, op: &StampedOp<M>);

    /// Apply a (possibly transformed) remote operation to the local
    /// document.
    fn apply_operation(&mut self, op: &WrappedOperation<M>);
}

/// The three synchronization states. Illegal combinations (a buffer
/// with no outstanding operation) are unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientState<M> {
    /// The last server revision is fully applied locally and no local
    /// edit is in flight.
    Synchronized,
    /// One local operation was sent and not yet acknowledged.
    AwaitingConfirm { outstanding: StampedOp<M> },
    /// One operation in flight, plus local edits composed into a
    /// buffer to be sent once the outstanding one is acknowledged.
    AwaitingWithBuffer {
        outstanding: StampedOp<M>,
        buffer: StampedOp<M>,
    },
}

/// One editing session's view of a shared document. Lives as long as
/// the session; the transport feeds it local edits via
/// [apply_client](Client::apply_client) and server broadcasts, in
/// server order, via [apply_server](Client::apply_server).
#[derive(Debug, Clone)]
pub struct Client<M> {
    site: SiteId,
    /// The next server revision this client expects.
    revision: Revision,
    /// The last site-local sequence number handed out.
    current_seq: LocalSeq,
    state: ClientState<M>,
}

impl<M: OperationMeta> Client<M> {
    /// `site` is this session's id, `revision` the server revision the
    /// local copy of the document was loaded at.
    pub fn new(site: SiteId, revision: Revision) -> Client<M> {
        Client {
            site,
            revision,
            current_seq: 0,
            state: ClientState::Synchronized,
        }
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn state(&self) -> &ClientState<M> {
        &self.state
    }

    pub fn is_synchronized(&self) -> bool {
        matches!(self.state, ClientState::Synchronized)
    }

    fn state_name(&self) -> &'static str {
        match self.state {
            ClientState::Synchronized => "Synchronized",
            ClientState::AwaitingConfirm { .. } => "AwaitingConfirm",
            ClientState::AwaitingWithBuffer { .. } => "AwaitingWithBuffer",
        }
    }

    fn stamp(&mut self, op: WrappedOperation<M>, base: Revision) -> StampedOp<M> {
        self.current_seq += 1;
        StampedOp {
            id: OpId::new(self.site, self.current_seq),
            base,
            op,
        }
    }

    /// Stamp a locally authored operation with a fresh id and the
    /// revision it will apply to once everything currently in flight
    /// is acknowledged. Hand the result to
    /// [apply_client](Self::apply_client); the id stamped here is the
    /// id the server will echo back.
    pub fn create_operation(&mut self, op: WrappedOperation<M>) -> StampedOp<M> {
        let base = match self.state {
            ClientState::Synchronized => self.revision,
            ClientState::AwaitingConfirm { .. } => self.revision + 1,
            ClientState::AwaitingWithBuffer { .. } => self.revision + 2,
        };
        self.stamp(op, base)
    }

    /// Record a local edit, already applied to the local document and
    /// stamped by [create_operation](Self::create_operation). Sends it
    /// right away when synchronized, otherwise holds it in the buffer;
    /// edits composed into an existing buffer keep the buffer's id.
    pub fn apply_client<T: ClientTransport<M>>(
        &mut self,
        op: StampedOp<M>,
        transport: &mut T,
    ) -> OtResult<()> {
        log::debug!(
            "apply_client, state {}, revision {}, op {:?}",
            self.state_name(),
            self.revision,
            op.id
        );
        match mem::replace(&mut self.state, ClientState::Synchronized) {
            ClientState::Synchronized => {
                transport.send_operation(&op);
                self.state = ClientState::AwaitingConfirm { outstanding: op };
            }
            ClientState::AwaitingConfirm { outstanding } => {
                self.state = ClientState::AwaitingWithBuffer {
                    outstanding,
                    buffer: op,
                };
            }
            ClientState::AwaitingWithBuffer {
                outstanding,
                mut buffer,
            } => match buffer.op.compose(&op.op) {
                Ok(composed) => {
                    buffer.op = composed;
                    self.state = ClientState::AwaitingWithBuffer { outstanding, buffer };
                }
                Err(err) => {
                    self.state = ClientState::AwaitingWithBuffer { outstanding, buffer };
                    return Err(err);
                }
            },
        }
        Ok(())
    }

    /// Process one server broadcast. `revision` is the operation's
    /// canonical revision and must equal the revision this client
    /// expects next; the transport must deliver broadcasts exactly
    /// once, in server order. An operation carrying this client's own
    /// id is the acknowledgement of the outstanding operation.
    ///
    /// On error nothing is mutated; the transport should resynchronize
    /// rather than carry on.
    pub fn apply_server<T: ClientTransport<M>>(
        &mut self,
        revision: Revision,
        op: StampedOp<M>,
        transport: &mut T,
    ) -> OtResult<()> {
        log::debug!(
            "apply_server, state {}, revision {}, incoming {:?} at {}",
            self.state_name(),
            self.revision,
            op.id,
            revision
        );
        if revision != self.revision {
            return Err(OtError::RevisionMismatch {
                expected: self.revision,
                actual: revision,
            });
        }
        match mem::replace(&mut self.state, ClientState::Synchronized) {
            ClientState::Synchronized => {
                transport.apply_operation(&op.op);
            }
            ClientState::AwaitingConfirm { outstanding } => {
                if op.id == outstanding.id {
                    // Our own operation came back; nothing to apply.
                } else {
                    match WrappedOperation::transform(&outstanding.op, &op.op) {
                        Ok((outstanding_prime, op_prime)) => {
                            transport.apply_operation(&op_prime);
                            self.state = ClientState::AwaitingConfirm {
                                outstanding: StampedOp {
                                    id: outstanding.id,
                                    base: outstanding.base,
                                    op: outstanding_prime,
                                },
                            };
                        }
                        Err(err) => {
                            self.state = ClientState::AwaitingConfirm { outstanding };
                            return Err(err);
                        }
                    }
                }
            }
            ClientState::AwaitingWithBuffer {
                outstanding,
                mut buffer,
            } => {
                if op.id == outstanding.id {
                    // Acknowledged; the buffer applies to the revision
                    // the ack establishes.
                    buffer.base = self.revision + 1;
                    transport.send_operation(&buffer);
                    self.state = ClientState::AwaitingConfirm { outstanding: buffer };
                } else {
                    let transformed =
                        WrappedOperation::transform(&outstanding.op, &op.op).and_then(
                            |(outstanding_prime, op1)| {
                                WrappedOperation::transform(&buffer.op, &op1)
                                    .map(|(buffer_prime, op2)| (outstanding_prime, buffer_prime, op2))
                            },
                        );
                    match transformed {
                        Ok((outstanding_prime, buffer_prime, op2)) => {
                            transport.apply_operation(&op2);
                            self.state = ClientState::AwaitingWithBuffer {
                                outstanding: StampedOp {
                                    id: outstanding.id,
                                    base: outstanding.base,
                                    op: outstanding_prime,
                                },
                                buffer: StampedOp {
                                    id: buffer.id,
                                    base: buffer.base,
                                    op: buffer_prime,
                                },
                            };
                        }
                        Err(err) => {
                            self.state = ClientState::AwaitingWithBuffer { outstanding, buffer };
                            return Err(err);
                        }
                    }
                }
            }
        }
        self.revision += 1;
        Ok(())
    }
}

// *** Tests
