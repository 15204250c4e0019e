use crate::wrapped::WrappedOperation;
use serde::{Deserialize, Serialize};

/// A revision number, an index into the server's linear operation
/// history. Revision n is the state of the document after the first n
/// accepted operations.
pub type Revision = usize;

/// SiteId identifies one editing session. Assigned by the transport
/// when a client joins.
pub type SiteId = u32;

/// Site-local sequence number, unique on the same site, starts from 1.
pub type LocalSeq = u32;

/// Identity of an operation: the site that authored it plus that site's
/// sequence number. The server echoes ids back unchanged, which is how a
/// client recognizes its own operation coming back as an
/// acknowledgement. Identity, not content: two sites can author
/// identical edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpId {
    pub site: SiteId,
    pub seq: LocalSeq,
}

impl OpId {
    pub fn new(site: SiteId, seq: LocalSeq) -> OpId {
        OpId { site, seq }
    }
}

/// An operation with the metadata that travels with it on the wire: its
/// identity and the revision it applies to. On the way to the server
/// `base` is the revision the author had seen; once accepted, the server
/// rewrites `base` to the operation's canonical revision (its index in
/// the history).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampedOp<M> {
    pub id: OpId,
    pub base: Revision,
    pub op: WrappedOperation<M>,
}
