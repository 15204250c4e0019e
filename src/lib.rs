#![doc = include_str!("../README.md")]

pub mod client;
pub mod error;
pub mod operation;
pub mod selection;
pub mod server;
pub mod types;
pub mod undo;
pub mod wrapped;

pub use client::{Client, ClientState, ClientTransport};
pub use error::{OtError, OtResult};
pub use operation::{OpComponent, TextOperation, WireOp};
pub use selection::{Range, Selection};
pub use server::{Server, ServerCallbacks};
pub use types::{LocalSeq, OpId, Revision, SiteId, StampedOp};
pub use undo::UndoManager;
pub use wrapped::{OperationMeta, WrappedOperation};
