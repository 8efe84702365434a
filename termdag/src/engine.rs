#[cfg(test)]
pub(crate) mod mock;
#[cfg(feature = "z3")]
pub mod z3;

use crate::error::{Error, Result};
use crate::term::{DatatypeDecl, Op, Sort, SortKind, Value};
use bitflags::bitflags;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

bitflags! {
    /// What an engine can do beyond the basic surface.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct Capabilities: u32 {
        /// Terms expose operator and children. Walkers need this.
        const TERM_ITER         = 1 << 0;
        const THEORY_INT        = 1 << 1;
        const THEORY_REAL       = 1 << 2;
        /// `get_array_values` is implemented.
        const ARRAY_MODELS      = 1 << 3;
        const CONST_ARRAYS      = 1 << 4;
        /// Arrays and functions may range over Bool.
        const ARRAY_FUN_BOOLS   = 1 << 5;
        const UNSAT_CORE        = 1 << 6;
        const DATATYPES         = 1 << 7;
        const QUANTIFIERS       = 1 << 8;
        /// Bool and 1-bit bit-vectors are the same native sort, so reported
        /// sorts (and literals) of Boolean terms may come back as `(_ BitVec 1)`.
        const BOOL_BV1_ALIASING = 1 << 9;
        /// `check_sat_interruptible` honors its cancel token.
        const INTERRUPT         = 1 << 10;
        /// The engine keeps a hash-consed term DAG of its own.
        const LOGGING           = 1 << 11;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown,
}

impl SatResult {
    pub fn is_sat(&self) -> bool {
        *self == SatResult::Sat
    }
    pub fn is_unsat(&self) -> bool {
        *self == SatResult::Unsat
    }
    pub fn is_decided(&self) -> bool {
        *self != SatResult::Unknown
    }
}

impl Display for SatResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SatResult::Sat => write!(f, "sat"),
            SatResult::Unsat => write!(f, "unsat"),
            SatResult::Unknown => write!(f, "unknown"),
        }
    }
}

/// Partial array model: explicit index/element pairs over an optional
/// constant base.
#[derive(Clone, Debug)]
pub struct ArrayModel<T> {
    pub assignments: Vec<(T, T)>,
    pub base: Option<T>,
}

/// Shared cancellation flag, polled by engines that support interruption.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Capability surface of a solving engine.
///
/// `Sort` and `Term` are the engine's own handles. Everything above this
/// trait (the logging wrapper, walkers, the portfolio) only goes through it.
pub trait Engine {
    type Sort: Clone + Debug;
    type Term: Clone + Eq + Hash + Debug;

    fn name(&self) -> &str;
    fn capabilities(&self) -> Capabilities;

    fn set_opt(&mut self, option: &str, value: &str) -> Result<()>;
    fn set_logic(&mut self, logic: &str) -> Result<()>;

    /// Sorts without parameters: Bool, Int and Real.
    fn make_sort(&mut self, kind: SortKind) -> Result<Self::Sort>;
    fn make_bv_sort(&mut self, width: u64) -> Result<Self::Sort>;
    fn make_array_sort(&mut self, index: &Self::Sort, element: &Self::Sort) -> Result<Self::Sort>;
    fn make_function_sort(
        &mut self,
        domain: &[Self::Sort],
        range: &Self::Sort,
    ) -> Result<Self::Sort>;
    fn make_uninterpreted_sort(&mut self, name: &str, arity: u64) -> Result<Self::Sort>;
    fn make_datatype_sort(&mut self, decl: &DatatypeDecl) -> Result<Self::Sort> {
        Err(Error::unsupported(format!(
            "{} cannot declare datatype {}",
            self.name(),
            decl.name()
        )))
    }

    fn make_value(&mut self, value: &Value, sort: &Self::Sort) -> Result<Self::Term>;
    fn make_const_array(&mut self, fill: &Self::Term, sort: &Self::Sort) -> Result<Self::Term>;
    fn make_symbol(&mut self, name: &str, sort: &Self::Sort) -> Result<Self::Term>;
    fn make_term(&mut self, op: Op, args: &[Self::Term]) -> Result<Self::Term>;

    /// The sort the engine reports for `term`, in logical form.
    fn sort_of(&self, term: &Self::Term) -> Result<Sort>;
    /// The operator of `term`, or the null operator for leaves.
    fn op_of(&self, term: &Self::Term) -> Result<Op>;
    fn children(&self, term: &Self::Term) -> Result<Vec<Self::Term>> {
        let _ = term;
        Err(Error::unsupported(format!("{} cannot iterate term children", self.name())))
    }
    /// The literal carried by a value term, if the engine can express it.
    fn literal(&self, term: &Self::Term) -> Option<Value>;

    fn assert_formula(&mut self, term: &Self::Term) -> Result<()>;
    fn check_sat(&mut self) -> Result<SatResult>;
    fn check_sat_assuming(&mut self, assumptions: &[Self::Term]) -> Result<SatResult>;
    /// Like `check_sat`, but gives up with `Unknown` once `cancel` fires.
    /// Engines without interruption run to completion.
    fn check_sat_interruptible(&mut self, cancel: &CancelToken) -> Result<SatResult> {
        let _ = cancel;
        self.check_sat()
    }
    fn get_value(&mut self, term: &Self::Term) -> Result<Self::Term>;
    fn get_array_values(&mut self, term: &Self::Term) -> Result<ArrayModel<Self::Term>> {
        let _ = term;
        Err(Error::unsupported(format!("{} does not produce array models", self.name())))
    }
    fn get_unsat_core(&mut self) -> Result<Vec<Self::Term>>;

    fn push(&mut self, levels: u64) -> Result<()>;
    fn pop(&mut self, levels: u64) -> Result<()>;
    /// Drops every assertion and every term.
    fn reset(&mut self) -> Result<()>;
    /// Drops every assertion, keeping terms alive.
    fn reset_assertions(&mut self) -> Result<()>;
}
