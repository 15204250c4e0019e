//! Cursor and selection tracking. A [Selection] is a list of
//! anchor/head ranges that editor adapters attach to operations as
//! metadata, so every site can follow where the others are typing.

use crate::operation::{OpComponent, TextOperation};
use serde::{Deserialize, Serialize};

/// One selected span. `anchor` is where the selection started, `head`
/// where the cursor is; they may be in either order, and an empty range
/// (anchor == head) is a plain cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub anchor: usize,
    pub head: usize,
}

impl Range {
    pub fn new(anchor: usize, head: usize) -> Range {
        Range { anchor, head }
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    /// Map both endpoints through `operation`.
    pub fn transform(&self, operation: &TextOperation) -> Range {
        Range {
            anchor: transform_index(self.anchor, operation),
            head: transform_index(self.head, operation),
        }
    }
}

/// Map a document position through an operation: insertions before the
/// position shift it right, deletions before it shift it left, and a
/// position inside a deleted span collapses to the deletion's start.
fn transform_index(index: usize, operation: &TextOperation) -> usize {
    let mut new_index = index as i64;
    let mut remaining = index as i64;
    for comp in operation.components() {
        match comp {
            OpComponent::Retain(n) => {
                remaining -= *n as i64;
            }
            OpComponent::Insert(s) => {
                new_index += s.chars().count() as i64;
            }
            OpComponent::Delete(n) => {
                new_index -= (*n as i64).min(remaining.max(0));
                remaining -= *n as i64;
            }
        }
        if remaining < 0 {
            break;
        }
    }
    new_index.max(0) as usize
}

/// An ordered list of ranges. Stored as given: callers that want to
/// drop empty ranges filter before constructing, it is not an invariant
/// of the type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    pub ranges: Vec<Range>,
}

impl Selection {
    pub fn new(ranges: Vec<Range>) -> Selection {
        Selection { ranges }
    }

    /// A selection holding a single cursor at `position`.
    pub fn create_cursor(position: usize) -> Selection {
        Selection {
            ranges: vec![Range::new(position, position)],
        }
    }

    /// The position of a single-cursor selection, if that's what this
    /// is.
    pub fn position(&self) -> Option<usize> {
        match self.ranges.as_slice() {
            [range] if range.is_empty() => Some(range.head),
            _ => None,
        }
    }

    /// True if any range actually spans text.
    pub fn something_selected(&self) -> bool {
        self.ranges.iter().any(|r| !r.is_empty())
    }

    /// Map every range through `operation`.
    pub fn transform(&self, operation: &TextOperation) -> Selection {
        Selection {
            ranges: self.ranges.iter().map(|r| r.transform(operation)).collect(),
        }
    }

    /// Combine with a later selection from the same site: the newest
    /// one wins.
    pub fn compose(&self, other: &Selection) -> Selection {
        other.clone()
    }
}

// *** Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn ins_at(pos: usize, text: &str, base: usize) -> TextOperation {
        let mut op = TextOperation::new();
        op.retain(pos).insert(text).retain(base - pos);
        op
    }

    fn del_at(pos: usize, n: usize, base: usize) -> TextOperation {
        let mut op = TextOperation::new();
        op.retain(pos).delete(n).retain(base - pos - n);
        op
    }

    #[test]
    fn insert_before_shifts_right() {
        let op = ins_at(2, "xy", 10);
        assert_eq!(transform_index(5, &op), 7);
        // At or after the insertion point.
        assert_eq!(transform_index(2, &op), 4);
        // Strictly before is untouched.
        assert_eq!(transform_index(1, &op), 1);
    }

    #[test]
    fn delete_before_shifts_left() {
        let op = del_at(2, 3, 10);
        assert_eq!(transform_index(8, &op), 5);
        // Inside the deleted span, collapse to its start.
        assert_eq!(transform_index(3, &op), 2);
        assert_eq!(transform_index(5, &op), 2);
        // Before the deletion, untouched.
        assert_eq!(transform_index(1, &op), 1);
    }

    #[test]
    fn range_endpoints_move_independently() {
        let op = del_at(0, 4, 10);
        let range = Range::new(2, 8);
        // The anchor was inside the deletion, the head after it.
        assert_eq!(range.transform(&op), Range::new(0, 4));
    }

    #[test]
    fn collapsed_range_stays_valid() {
        let op = del_at(2, 4, 10);
        let range = Range::new(3, 5);
        let transformed = range.transform(&op);
        assert_eq!(transformed, Range::new(2, 2));
        assert!(transformed.is_empty());
    }

    #[test]
    fn compose_latest_wins() {
        let older = Selection::create_cursor(3);
        let newer = Selection::new(vec![Range::new(1, 4)]);
        assert_eq!(older.compose(&newer), newer);
    }

    #[test]
    fn cursor_helpers() {
        let sel = Selection::create_cursor(7);
        assert_eq!(sel.position(), Some(7));
        assert!(!sel.something_selected());

        let sel = Selection::new(vec![Range::new(1, 4), Range::new(6, 6)]);
        assert_eq!(sel.position(), None);
        assert!(sel.something_selected());
    }
}
