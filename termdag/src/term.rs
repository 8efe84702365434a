mod datatype;
mod op;
mod sort;
mod table;
mod value;

pub use datatype::{ConstructorDecl, DatatypeDecl, Selector};
pub use op::{Op, PrimOp};
pub use sort::{Sort, SortKind};
pub use table::TermTable;
pub use value::Value;

use std::cmp::Ordering;
use std::fmt::{Debug, Display};
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

static NEXT_TERM_ID: AtomicU64 = AtomicU64::new(1);

/// What a node is, beyond its operator.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TermKind {
    Symbol(String),
    Value(Value),
    /// Constant array. Its only child is the fill value.
    ConstArray,
    Apply,
}

#[derive(Debug)]
pub struct TermData {
    id: u64,
    session: u64,
    op: Op,
    sort: Sort,
    kind: TermKind,
    children: Vec<Term>,
}

/// Shared handle to an immutable DAG node.
///
/// Equality and hashing use the node's identity, which is only sound for
/// terms that went through a [`TermTable`]: there, structurally equal
/// nodes are the same node.
#[derive(Clone)]
pub struct Term(Arc<TermData>);

impl Term {
    pub(crate) fn new(
        session: u64,
        op: Op,
        sort: Sort,
        kind: TermKind,
        children: Vec<Term>,
    ) -> Self {
        Term(Arc::new(TermData {
            id: NEXT_TERM_ID.fetch_add(1, AtomicOrdering::Relaxed),
            session,
            op,
            sort,
            kind,
            children,
        }))
    }

    pub fn id(&self) -> u64 {
        self.id
    }
    pub(crate) fn session(&self) -> u64 {
        self.session
    }
    pub fn op(&self) -> Op {
        self.op
    }
    pub fn sort(&self) -> &Sort {
        &self.sort
    }
    pub fn kind(&self) -> &TermKind {
        &self.kind
    }
    pub fn children(&self) -> &[Term] {
        &self.children
    }
    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    /// Literal values and constant arrays. Rewriting never rebuilds these.
    pub fn is_value(&self) -> bool {
        matches!(self.kind, TermKind::Value(_) | TermKind::ConstArray)
    }
    pub fn is_symbol(&self) -> bool {
        matches!(self.kind, TermKind::Symbol(_))
    }
    /// A symbol that is not a function.
    pub fn is_symbolic_const(&self) -> bool {
        self.is_symbol() && !self.sort.is_function()
    }
    pub fn symbol_name(&self) -> Option<&str> {
        match &self.kind {
            TermKind::Symbol(name) => Some(name),
            _ => None,
        }
    }
    pub fn value(&self) -> Option<&Value> {
        match &self.kind {
            TermKind::Value(v) => Some(v),
            _ => None,
        }
    }
    pub fn ptr_eq(&self, other: &Term) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for Term {
    type Target = TermData;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Term {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Term {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

// Long chains would otherwise drop recursively, one frame per level.
impl Drop for TermData {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(term) = stack.pop() {
            if let Ok(mut data) = Arc::try_unwrap(term.0) {
                stack.append(&mut data.children);
            }
        }
    }
}

enum Piece<'a> {
    Term(&'a Term),
    Text(&'static str),
}

impl Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut stack = vec![Piece::Term(self)];
        while let Some(piece) = stack.pop() {
            let term = match piece {
                Piece::Text(s) => {
                    f.write_str(s)?;
                    continue;
                }
                Piece::Term(t) => t,
            };
            match &term.kind {
                TermKind::Symbol(name) => f.write_str(name)?,
                TermKind::Value(v) => write!(f, "{}", v)?,
                TermKind::ConstArray => {
                    write!(f, "((as const {}) ", term.sort)?;
                    stack.push(Piece::Text(")"));
                    if let Some(fill) = term.children.first() {
                        stack.push(Piece::Term(fill));
                    }
                }
                TermKind::Apply if term.children.is_empty() => write!(f, "{}", term.op)?,
                TermKind::Apply => {
                    // function application prints as (f x ..) with no operator name
                    let skip_op = term.op.prim() == PrimOp::Apply;
                    if skip_op {
                        f.write_str("(")?;
                    } else {
                        write!(f, "({}", term.op)?;
                    }
                    stack.push(Piece::Text(")"));
                    for (i, child) in term.children.iter().enumerate().rev() {
                        stack.push(Piece::Term(child));
                        if !(skip_op && i == 0) {
                            stack.push(Piece::Text(" "));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl Debug for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {}", self.id, self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sym(name: &str, sort: Sort) -> Term {
        Term::new(0, Op::null(), sort, TermKind::Symbol(name.to_string()), vec![])
    }

    #[test]
    fn display() {
        let x = sym("x", Sort::bv(4));
        let y = sym("y", Sort::bv(4));
        let add =
            Term::new(0, PrimOp::BVAdd.into(), Sort::bv(4), TermKind::Apply, vec![x.clone(), y]);
        let ext =
            Term::new(0, Op::extract(1, 0), Sort::bv(2), TermKind::Apply, vec![add.clone()]);
        assert_eq!(add.to_string(), "(bvadd x y)");
        assert_eq!(ext.to_string(), "((_ extract 1 0) (bvadd x y))");

        let f = sym("f", Sort::function(vec![Sort::bv(4)], Sort::bv(4)));
        let app =
            Term::new(0, PrimOp::Apply.into(), Sort::bv(4), TermKind::Apply, vec![f.clone(), x]);
        assert_eq!(app.to_string(), "(f x)");
        assert!(!f.is_symbolic_const());

        let zero = Term::new(0, Op::null(), Sort::bv(4), TermKind::Value(Value::bv(4, 0)), vec![]);
        let arr_sort = Sort::array(Sort::bv(4), Sort::bv(4));
        let arr = Term::new(0, Op::null(), arr_sort, TermKind::ConstArray, vec![zero]);
        assert_eq!(arr.to_string(), "((as const (Array (_ BitVec 4) (_ BitVec 4))) #b0000)");
        assert!(arr.is_value());
    }

    #[test]
    fn identity() {
        let a = sym("a", Sort::Bool);
        let b = sym("a", Sort::Bool);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert!(a.ptr_eq(&a.clone()));
        assert!(a < b);
    }

    #[test]
    fn deep_drop() {
        let mut t = sym("x", Sort::Bool);
        for _ in 0..200_000 {
            t = Term::new(0, PrimOp::Not.into(), Sort::Bool, TermKind::Apply, vec![t]);
        }
        assert_eq!(t.num_children(), 1);
        drop(t);
    }
}
