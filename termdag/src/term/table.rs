use super::{Op, Sort, Term, TermKind};
use std::collections::HashMap;

/// Structural fingerprint. Children enter by identity, which is stable for
/// the lifetime of a term.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct TermKey {
    op: Op,
    sort: Sort,
    kind: TermKind,
    children: Vec<u64>,
}

impl TermKey {
    fn of(term: &Term) -> Self {
        TermKey {
            op: term.op,
            sort: term.sort.clone(),
            kind: term.kind.clone(),
            children: term.children.iter().map(Term::id).collect(),
        }
    }
}

/// Canonical store of one session's terms. Entries are only ever removed
/// all at once by [`TermTable::clear`].
#[derive(Debug, Default)]
pub struct TermTable {
    terms: HashMap<TermKey, Term>,
}

impl TermTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// If a structurally equal term is registered, replaces `candidate` with
    /// it and returns true. Otherwise leaves `candidate` untouched; the
    /// caller is expected to [`insert`](Self::insert) it.
    pub fn lookup(&self, candidate: &mut Term) -> bool {
        match self.terms.get(&TermKey::of(candidate)) {
            Some(found) => {
                *candidate = found.clone();
                true
            }
            None => false,
        }
    }

    /// Registers `term` unless an equal one is already present. Returns
    /// whether it was registered.
    pub fn insert(&mut self, term: Term) -> bool {
        let key = TermKey::of(&term);
        if self.terms.contains_key(&key) {
            return false;
        }
        self.terms.insert(key, term);
        true
    }

    pub fn clear(&mut self) {
        self.terms.clear();
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
