use crate::term::{PrimOp, Sort, Term};
use std::collections::HashSet;

fn collect(term: &Term, keep: impl Fn(&Term) -> bool) -> HashSet<Term> {
    let mut visited = HashSet::new();
    let mut found = HashSet::new();
    let mut stack = vec![term.clone()];
    while let Some(t) = stack.pop() {
        if !visited.insert(t.clone()) {
            continue;
        }
        if keep(&t) {
            found.insert(t.clone());
        }
        stack.extend(t.children().iter().cloned());
    }
    found
}

/// Every symbol occurring in `term`, function symbols included.
pub fn free_symbols(term: &Term) -> HashSet<Term> {
    collect(term, Term::is_symbol)
}

/// Every non-function symbol occurring in `term`.
pub fn free_symbolic_consts(term: &Term) -> HashSet<Term> {
    collect(term, Term::is_symbolic_const)
}

/// Splits nested conjunctions into their conjuncts, left to right and
/// without duplicates. With `include_bvand`, 1-bit `bvand` is split too.
pub fn conjunctive_partition(term: &Term, include_bvand: bool) -> Vec<Term> {
    let mut visited = HashSet::new();
    let mut conjuncts = vec![];
    let mut stack = vec![term.clone()];
    while let Some(t) = stack.pop() {
        if !visited.insert(t.clone()) {
            continue;
        }
        let split = match t.op().prim() {
            PrimOp::And => true,
            PrimOp::BVAnd => include_bvand && *t.sort() == Sort::BitVec(1),
            _ => false,
        };
        if split {
            stack.extend(t.children().iter().rev().cloned());
        } else {
            conjuncts.push(t);
        }
    }
    conjuncts
}
