//! [WrappedOperation] pairs a [TextOperation] with a metadata payload
//! that composes, transforms and inverts in lockstep with it. Metadata
//! kinds implement [OperationMeta]; `()` is the "no metadata" case and
//! [Selection] the common one.

use crate::error::OtResult;
use crate::operation::TextOperation;
use crate::selection::Selection;
use serde::{Deserialize, Serialize};

/// Metadata carried alongside an operation. Every method has a default:
/// compose keeps the later meta (mirroring [Selection::compose]'s
/// "latest cursor update wins"), transform and invert carry the meta
/// through unchanged.
pub trait OperationMeta: Clone {
    /// Combine with the meta of the operation composed after this one.
    fn compose(&self, other: &Self) -> Self {
        other.clone()
    }

    /// Rebase against a concurrent operation.
    fn transform(&self, _operation: &TextOperation) -> Self {
        self.clone()
    }

    /// Meta for the inverse operation. `document` is the text the
    /// original operation applies to.
    fn invert(&self, _document: &str) -> Self {
        self.clone()
    }
}

impl OperationMeta for () {}

impl OperationMeta for Selection {
    fn transform(&self, operation: &TextOperation) -> Self {
        Selection::transform(self, operation)
    }
}

/// An operation plus its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrappedOperation<M> {
    pub operation: TextOperation,
    pub meta: M,
}

impl<M: OperationMeta> WrappedOperation<M> {
    pub fn new(operation: TextOperation, meta: M) -> WrappedOperation<M> {
        WrappedOperation { operation, meta }
    }

    pub fn apply(&self, document: &str) -> OtResult<String> {
        self.operation.apply(document)
    }

    pub fn invert(&self, document: &str) -> WrappedOperation<M> {
        WrappedOperation {
            operation: self.operation.invert(document),
            meta: self.meta.invert(document),
        }
    }

    pub fn compose(&self, other: &WrappedOperation<M>) -> OtResult<WrappedOperation<M>> {
        Ok(WrappedOperation {
            operation: self.operation.compose(&other.operation)?,
            meta: self.meta.compose(&other.meta),
        })
    }

    /// Transform two concurrent wrapped operations. Each side keeps its
    /// own meta, rebased through the *other* side's original operation.
    pub fn transform(
        a: &WrappedOperation<M>,
        b: &WrappedOperation<M>,
    ) -> OtResult<(WrappedOperation<M>, WrappedOperation<M>)> {
        let (a_op, b_op) = TextOperation::transform(&a.operation, &b.operation)?;
        Ok((
            WrappedOperation {
                operation: a_op,
                meta: a.meta.transform(&b.operation),
            },
            WrappedOperation {
                operation: b_op,
                meta: b.meta.transform(&a.operation),
            },
        ))
    }
}

// *** Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::Range;

    fn wrapped(op: TextOperation, cursor: usize) -> WrappedOperation<Selection> {
        WrappedOperation::new(op, Selection::create_cursor(cursor))
    }

    #[test]
    fn transform_rebases_meta_through_the_other_side() {
        // a types "x" at 5, cursor lands after it; b types "yy" at 0.
        let mut op_a = TextOperation::new();
        op_a.retain(5).insert("x");
        let a = wrapped(op_a, 6);

        let mut op_b = TextOperation::new();
        op_b.insert("yy").retain(5);
        let b = wrapped(op_b, 2);

        let (a_prime, b_prime) = WrappedOperation::transform(&a, &b).unwrap();
        // a's cursor shifts right past b's insertion; b's cursor sits
        // before a's edit and stays put.
        assert_eq!(a_prime.meta, Selection::create_cursor(8));
        assert_eq!(b_prime.meta, Selection::create_cursor(2));

        // The wrapped operations still converge.
        let doc = "hello";
        let via_a = b_prime.apply(&a.apply(doc).unwrap()).unwrap();
        let via_b = a_prime.apply(&b.apply(doc).unwrap()).unwrap();
        assert_eq!(via_a, via_b);
    }

    #[test]
    fn compose_keeps_latest_selection() {
        let mut op_a = TextOperation::new();
        op_a.insert("a");
        let mut op_b = TextOperation::new();
        op_b.retain(1).insert("b");
        let a = wrapped(op_a, 1);
        let b = wrapped(op_b, 2);
        let ab = a.compose(&b).unwrap();
        assert_eq!(ab.meta, Selection::create_cursor(2));
        assert_eq!(ab.apply("").unwrap(), "ab");
    }

    #[test]
    fn invert_delegates_to_inner_operation() {
        let doc = "abcdef";
        let mut op = TextOperation::new();
        op.retain(2).delete(3).retain(1);
        let w = WrappedOperation::new(op, Selection::new(vec![Range::new(2, 2)]));
        let inverse = w.invert(doc);
        let edited = w.apply(doc).unwrap();
        assert_eq!(inverse.apply(&edited).unwrap(), doc);
        // Selection meta is carried through unchanged.
        assert_eq!(inverse.meta, w.meta);
    }

    #[test]
    fn unit_meta_is_free() {
        let mut op = TextOperation::new();
        op.insert("hi");
        let w: WrappedOperation<()> = WrappedOperation::new(op, ());
        assert_eq!(w.apply("").unwrap(), "hi");
    }
}
