//! This module provides [TextOperation], the value type describing one
//! edit to a flat text document, and the four algorithms the rest of
//! the crate is built on: `apply`, `invert`, `compose` and `transform`.

use crate::error::{OtError, OtResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

// *** Components

/// One primitive of an operation. An operation walks the document left
/// to right: `Retain(n)` skips over n characters, `Insert(s)` adds text
/// at the current position, `Delete(n)` removes the next n characters.
///
/// Deletions are length-only: the deleted text is not stored in the
/// operation and is recovered from the document when needed (see
/// [TextOperation::invert]). Consequently neither `compose` nor
/// `transform` can verify that two concurrent deletions removed the
/// same characters; they trust the server's serialization point, which
/// validates every accepted operation with `apply`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OpComponent {
    Retain(usize),
    Insert(String),
    Delete(usize),
}

/// Count of Unicode scalar values. All lengths and positions in this
/// crate are in chars, not bytes.
pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split `s` after its first `n` chars.
fn char_split(s: &str, n: usize) -> (&str, &str) {
    match s.char_indices().nth(n) {
        Some((idx, _)) => s.split_at(idx),
        None => (s, ""),
    }
}

// *** TextOperation

/// An edit, stored as an ordered list of components in canonical form:
/// no zero-length component, no two adjacent components of the same
/// kind, and an insert always precedes an adjacent delete. Build one
/// with the [retain](Self::retain) / [insert](Self::insert) /
/// [delete](Self::delete) builder methods, which maintain canonical
/// form and the length bookkeeping.
///
/// `base_len` is the length of any document the operation applies to,
/// `target_len` the length of the result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextOperation {
    ops: Vec<OpComponent>,
    base_len: usize,
    target_len: usize,
}

impl TextOperation {
    pub fn new() -> TextOperation {
        TextOperation::default()
    }

    /// Length of the document this operation applies to.
    pub fn base_len(&self) -> usize {
        self.base_len
    }

    /// Length of the document after applying this operation.
    pub fn target_len(&self) -> usize {
        self.target_len
    }

    /// The components, in canonical form.
    pub fn components(&self) -> &[OpComponent] {
        &self.ops
    }

    /// True if applying this operation changes nothing.
    pub fn is_noop(&self) -> bool {
        self.ops.iter().all(|c| matches!(c, OpComponent::Retain(_)))
    }

    /// Skip over `n` characters. `n` = 0 is a no-op.
    pub fn retain(&mut self, n: usize) -> &mut Self {
        if n == 0 {
            return self;
        }
        self.base_len += n;
        self.target_len += n;
        if let Some(OpComponent::Retain(last)) = self.ops.last_mut() {
            *last += n;
        } else {
            self.ops.push(OpComponent::Retain(n));
        }
        self
    }

    /// Insert `text` at the current position. Empty text is a no-op.
    pub fn insert(&mut self, text: &str) -> &mut Self {
        if text.is_empty() {
            return self;
        }
        self.target_len += char_len(text);
        match self.ops.as_mut_slice() {
            [.., OpComponent::Insert(last)] => last.push_str(text),
            [.., OpComponent::Insert(prev), OpComponent::Delete(_)] => prev.push_str(text),
            [.., OpComponent::Delete(_)] => {
                // insert(s) + delete(n) and delete(n) + insert(s) apply
                // to the same effect; canonical form puts the insert
                // first.
                if let Some(del) = self.ops.pop() {
                    self.ops.push(OpComponent::Insert(text.to_string()));
                    self.ops.push(del);
                }
            }
            _ => self.ops.push(OpComponent::Insert(text.to_string())),
        }
        self
    }

    /// Delete the next `n` characters. `n` = 0 is a no-op.
    pub fn delete(&mut self, n: usize) -> &mut Self {
        if n == 0 {
            return self;
        }
        self.base_len += n;
        if let Some(OpComponent::Delete(last)) = self.ops.last_mut() {
            *last += n;
        } else {
            self.ops.push(OpComponent::Delete(n));
        }
        self
    }

    // *** Apply and invert

    /// Apply this operation to `document`, producing the edited text.
    /// The document length must equal `base_len`.
    pub fn apply(&self, document: &str) -> OtResult<String> {
        let document_length = char_len(document);
        if document_length != self.base_len {
            return Err(OtError::LengthMismatch {
                base_length: self.base_len,
                document_length,
            });
        }
        let mut result = String::with_capacity(document.len());
        let mut chars = document.chars();
        let mut consumed = 0;
        for comp in &self.ops {
            match comp {
                OpComponent::Retain(n) => {
                    for _ in 0..*n {
                        match chars.next() {
                            Some(ch) => result.push(ch),
                            None => {
                                return Err(OtError::IncompleteApply {
                                    consumed,
                                    document_length,
                                })
                            }
                        }
                        consumed += 1;
                    }
                }
                OpComponent::Insert(s) => result.push_str(s),
                OpComponent::Delete(n) => {
                    for _ in 0..*n {
                        if chars.next().is_none() {
                            return Err(OtError::IncompleteApply {
                                consumed,
                                document_length,
                            });
                        }
                        consumed += 1;
                    }
                }
            }
        }
        if chars.next().is_some() {
            return Err(OtError::IncompleteApply {
                consumed,
                document_length,
            });
        }
        Ok(result)
    }

    /// Produce the operation that undoes this one: applying `self` to
    /// `document` and then the inverse to the result gives back
    /// `document`. Needs the original document because deletions store
    /// only a count.
    pub fn invert(&self, document: &str) -> TextOperation {
        debug_assert_eq!(char_len(document), self.base_len);
        let mut inverse = TextOperation::new();
        let mut chars = document.chars();
        for comp in &self.ops {
            match comp {
                OpComponent::Retain(n) => {
                    inverse.retain(*n);
                    for _ in 0..*n {
                        chars.next();
                    }
                }
                OpComponent::Insert(s) => {
                    inverse.delete(char_len(s));
                }
                OpComponent::Delete(n) => {
                    let deleted: String = chars.by_ref().take(*n).collect();
                    inverse.insert(&deleted);
                }
            }
        }
        inverse
    }

    // *** Compose

    /// Merge two consecutive operations into one with the same effect:
    /// `compose(a, b).apply(doc) == b.apply(a.apply(doc))`. `other`
    /// must apply to the output of `self`.
    pub fn compose(&self, other: &TextOperation) -> OtResult<TextOperation> {
        if self.target_len != other.base_len {
            return Err(OtError::LengthMismatch {
                base_length: other.base_len,
                document_length: self.target_len,
            });
        }
        let mut result = TextOperation::new();
        let mut iter1 = self.ops.iter().cloned();
        let mut iter2 = other.ops.iter().cloned();
        let mut a = iter1.next();
        let mut b = iter2.next();
        loop {
            // A deletion of self and an insertion of other don't
            // interact with the other side; emit them as-is.
            if let Some(OpComponent::Delete(n)) = &a {
                result.delete(*n);
                a = iter1.next();
                continue;
            }
            if let Some(OpComponent::Insert(s)) = &b {
                result.insert(s);
                b = iter2.next();
                continue;
            }
            match (a.take(), b.take()) {
                (None, None) => break,
                (None, Some(comp)) => {
                    return Err(OtError::IncompatibleOperations(format!(
                        "first operation too short for {:?}",
                        comp
                    )))
                }
                (Some(comp), None) => {
                    return Err(OtError::IncompatibleOperations(format!(
                        "first operation too long, left over {:?}",
                        comp
                    )))
                }
                (Some(OpComponent::Retain(n1)), Some(OpComponent::Retain(n2))) => {
                    match n1.cmp(&n2) {
                        Ordering::Greater => {
                            result.retain(n2);
                            a = Some(OpComponent::Retain(n1 - n2));
                            b = iter2.next();
                        }
                        Ordering::Equal => {
                            result.retain(n1);
                            a = iter1.next();
                            b = iter2.next();
                        }
                        Ordering::Less => {
                            result.retain(n1);
                            b = Some(OpComponent::Retain(n2 - n1));
                            a = iter1.next();
                        }
                    }
                }
                (Some(OpComponent::Insert(s)), Some(OpComponent::Delete(n2))) => {
                    // The insertion is deleted again; only lengths are
                    // compared, see [OpComponent].
                    let len = char_len(&s);
                    match len.cmp(&n2) {
                        Ordering::Greater => {
                            let (_, rest) = char_split(&s, n2);
                            a = Some(OpComponent::Insert(rest.to_string()));
                            b = iter2.next();
                        }
                        Ordering::Equal => {
                            a = iter1.next();
                            b = iter2.next();
                        }
                        Ordering::Less => {
                            b = Some(OpComponent::Delete(n2 - len));
                            a = iter1.next();
                        }
                    }
                }
                (Some(OpComponent::Insert(s)), Some(OpComponent::Retain(n2))) => {
                    let len = char_len(&s);
                    match len.cmp(&n2) {
                        Ordering::Greater => {
                            let (kept, rest) = char_split(&s, n2);
                            result.insert(kept);
                            a = Some(OpComponent::Insert(rest.to_string()));
                            b = iter2.next();
                        }
                        Ordering::Equal => {
                            result.insert(&s);
                            a = iter1.next();
                            b = iter2.next();
                        }
                        Ordering::Less => {
                            result.insert(&s);
                            b = Some(OpComponent::Retain(n2 - len));
                            a = iter1.next();
                        }
                    }
                }
                (Some(OpComponent::Retain(n1)), Some(OpComponent::Delete(n2))) => {
                    match n1.cmp(&n2) {
                        Ordering::Greater => {
                            result.delete(n2);
                            a = Some(OpComponent::Retain(n1 - n2));
                            b = iter2.next();
                        }
                        Ordering::Equal => {
                            result.delete(n2);
                            a = iter1.next();
                            b = iter2.next();
                        }
                        Ordering::Less => {
                            result.delete(n1);
                            b = Some(OpComponent::Delete(n2 - n1));
                            a = iter1.next();
                        }
                    }
                }
                (Some(c1), Some(c2)) => {
                    return Err(OtError::IncompatibleOperations(format!(
                        "compose has no rule for {:?} against {:?}",
                        c1, c2
                    )))
                }
            }
        }
        Ok(result)
    }

    // *** Transform

    /// Transform two concurrent operations authored against the same
    /// document into a pair `(a', b')` that converges: applying `a`
    /// then `b'` gives the same document as applying `b` then `a'`.
    /// Insertions win over every other component, ties broken in favor
    /// of `a`; concurrent deletions of the same span cancel (length
    /// comparison only, see [OpComponent]).
    pub fn transform(
        a: &TextOperation,
        b: &TextOperation,
    ) -> OtResult<(TextOperation, TextOperation)> {
        if a.base_len != b.base_len {
            return Err(OtError::LengthMismatch {
                base_length: a.base_len,
                document_length: b.base_len,
            });
        }
        let mut a_prime = TextOperation::new();
        let mut b_prime = TextOperation::new();
        let mut iter1 = a.ops.iter().cloned();
        let mut iter2 = b.ops.iter().cloned();
        let mut op1 = iter1.next();
        let mut op2 = iter2.next();
        loop {
            if let Some(OpComponent::Insert(s)) = &op1 {
                a_prime.insert(s);
                b_prime.retain(char_len(s));
                op1 = iter1.next();
                continue;
            }
            if let Some(OpComponent::Insert(s)) = &op2 {
                a_prime.retain(char_len(s));
                b_prime.insert(s);
                op2 = iter2.next();
                continue;
            }
            match (op1.take(), op2.take()) {
                (None, None) => break,
                (None, Some(comp)) => {
                    return Err(OtError::IncompatibleOperations(format!(
                        "first operation too short for {:?}",
                        comp
                    )))
                }
                (Some(comp), None) => {
                    return Err(OtError::IncompatibleOperations(format!(
                        "first operation too long, left over {:?}",
                        comp
                    )))
                }
                (Some(OpComponent::Retain(n1)), Some(OpComponent::Retain(n2))) => {
                    let min = match n1.cmp(&n2) {
                        Ordering::Greater => {
                            op1 = Some(OpComponent::Retain(n1 - n2));
                            op2 = iter2.next();
                            n2
                        }
                        Ordering::Equal => {
                            op1 = iter1.next();
                            op2 = iter2.next();
                            n1
                        }
                        Ordering::Less => {
                            op2 = Some(OpComponent::Retain(n2 - n1));
                            op1 = iter1.next();
                            n1
                        }
                    };
                    a_prime.retain(min);
                    b_prime.retain(min);
                }
                (Some(OpComponent::Delete(n1)), Some(OpComponent::Delete(n2))) => {
                    // Both sides deleted the same span; nothing left to
                    // do on either side.
                    match n1.cmp(&n2) {
                        Ordering::Greater => {
                            op1 = Some(OpComponent::Delete(n1 - n2));
                            op2 = iter2.next();
                        }
                        Ordering::Equal => {
                            op1 = iter1.next();
                            op2 = iter2.next();
                        }
                        Ordering::Less => {
                            op2 = Some(OpComponent::Delete(n2 - n1));
                            op1 = iter1.next();
                        }
                    }
                }
                (Some(OpComponent::Delete(n1)), Some(OpComponent::Retain(n2))) => {
                    let min = match n1.cmp(&n2) {
                        Ordering::Greater => {
                            op1 = Some(OpComponent::Delete(n1 - n2));
                            op2 = iter2.next();
                            n2
                        }
                        Ordering::Equal => {
                            op1 = iter1.next();
                            op2 = iter2.next();
                            n1
                        }
                        Ordering::Less => {
                            op2 = Some(OpComponent::Retain(n2 - n1));
                            op1 = iter1.next();
                            n1
                        }
                    };
                    a_prime.delete(min);
                }
                (Some(OpComponent::Retain(n1)), Some(OpComponent::Delete(n2))) => {
                    let min = match n1.cmp(&n2) {
                        Ordering::Greater => {
                            op1 = Some(OpComponent::Retain(n1 - n2));
                            op2 = iter2.next();
                            n2
                        }
                        Ordering::Equal => {
                            op1 = iter1.next();
                            op2 = iter2.next();
                            n1
                        }
                        Ordering::Less => {
                            op2 = Some(OpComponent::Delete(n2 - n1));
                            op1 = iter1.next();
                            n1
                        }
                    };
                    b_prime.delete(min);
                }
                (Some(c1), Some(c2)) => {
                    return Err(OtError::IncompatibleOperations(format!(
                        "transform has no rule for {:?} against {:?}",
                        c1, c2
                    )))
                }
            }
        }
        Ok((a_prime, b_prime))
    }

    // *** Composition heuristics

    /// The single editing component of a "simple" operation: one insert
    /// or one delete, optionally bracketed by retains.
    fn simple_component(&self) -> Option<&OpComponent> {
        match self.ops.as_slice() {
            [c] => Some(c),
            [OpComponent::Retain(_), c] => Some(c),
            [c, OpComponent::Retain(_)] => Some(c),
            [OpComponent::Retain(_), c, OpComponent::Retain(_)] => Some(c),
            _ => None,
        }
    }

    /// Position where this operation starts editing.
    fn start_index(&self) -> usize {
        match self.ops.first() {
            Some(OpComponent::Retain(n)) => *n,
            _ => 0,
        }
    }

    /// Whether `other` (the operation issued right after `self`) should
    /// merge with `self` into a single undo entry: both are simple and
    /// `other` continues typing or deleting where `self` left off.
    /// Deterministic and side-effect free.
    pub fn should_be_composed_with(&self, other: &TextOperation) -> bool {
        if self.is_noop() || other.is_noop() {
            return true;
        }
        let (sa, sb) = match (self.simple_component(), other.simple_component()) {
            (Some(sa), Some(sb)) => (sa, sb),
            _ => return false,
        };
        let start_a = self.start_index();
        let start_b = other.start_index();
        match (sa, sb) {
            (OpComponent::Insert(s), OpComponent::Insert(_)) => start_a + char_len(s) == start_b,
            (OpComponent::Delete(_), OpComponent::Delete(n2)) => {
                start_b + n2 == start_a || start_a == start_b
            }
            _ => false,
        }
    }

    /// Mirror of [should_be_composed_with](Self::should_be_composed_with)
    /// for inverse operations: whether the inverse of `other` should
    /// merge with the inverse of `self`.
    pub fn should_be_composed_with_inverted(&self, other: &TextOperation) -> bool {
        if self.is_noop() || other.is_noop() {
            return true;
        }
        let (sa, sb) = match (self.simple_component(), other.simple_component()) {
            (Some(sa), Some(sb)) => (sa, sb),
            _ => return false,
        };
        let start_a = self.start_index();
        let start_b = other.start_index();
        match (sa, sb) {
            (OpComponent::Insert(s), OpComponent::Insert(_)) => {
                start_a + char_len(s) == start_b || start_a == start_b
            }
            (OpComponent::Delete(_), OpComponent::Delete(n2)) => start_b + n2 == start_a,
            _ => false,
        }
    }
}

impl fmt::Display for TextOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, comp) in self.ops.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            match comp {
                OpComponent::Retain(n) => write!(f, "retain {}", n)?,
                OpComponent::Insert(s) => write!(f, "insert '{}'", s)?,
                OpComponent::Delete(n) => write!(f, "delete {}", n)?,
            }
        }
        Ok(())
    }
}

// *** Wire encoding

/// One element of the wire encoding of an operation: a positive integer
/// is a retain of that many characters, a negative integer a delete,
/// a string an insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireOp {
    Number(i64),
    Text(String),
}

impl TextOperation {
    /// Encode for the wire.
    pub fn to_wire(&self) -> Vec<WireOp> {
        self.ops
            .iter()
            .map(|comp| match comp {
                OpComponent::Retain(n) => WireOp::Number(*n as i64),
                OpComponent::Insert(s) => WireOp::Text(s.clone()),
                OpComponent::Delete(n) => WireOp::Number(-(*n as i64)),
            })
            .collect()
    }

    /// Decode a wire-encoded operation. Rejects zero-length elements
    /// and adjacent elements of the same kind, which a well-formed
    /// encoder would have merged.
    pub fn from_wire(atoms: &[WireOp]) -> OtResult<TextOperation> {
        let mut op = TextOperation::new();
        let mut prev_kind: Option<&str> = None;
        for atom in atoms {
            let kind = match atom {
                WireOp::Number(0) => {
                    return Err(OtError::NotInCanonicalForm(
                        "zero-length component".to_string(),
                    ))
                }
                WireOp::Number(n) if *n > 0 => "retain",
                WireOp::Number(_) => "delete",
                WireOp::Text(s) if s.is_empty() => {
                    return Err(OtError::NotInCanonicalForm("empty insert".to_string()))
                }
                WireOp::Text(_) => "insert",
            };
            if prev_kind == Some(kind) {
                return Err(OtError::NotInCanonicalForm(format!(
                    "adjacent {} components",
                    kind
                )));
            }
            prev_kind = Some(kind);
            match atom {
                WireOp::Number(n) if *n > 0 => {
                    op.retain(*n as usize);
                }
                WireOp::Number(n) => {
                    op.delete(n.unsigned_abs() as usize);
                }
                WireOp::Text(s) => {
                    op.insert(s);
                }
            }
        }
        Ok(op)
    }
}

impl Serialize for TextOperation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TextOperation {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let atoms = Vec::<WireOp>::deserialize(deserializer)?;
        TextOperation::from_wire(&atoms).map_err(serde::de::Error::custom)
    }
}

// *** Tests
