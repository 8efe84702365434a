pub mod sort_computation;

use crate::engine::{ArrayModel, CancelToken, Capabilities, Engine, SatResult};
use crate::error::{Error, Result};
use crate::term::{DatatypeDecl, Op, PrimOp, Sort, SortKind, Term, TermKind, TermTable, Value};
use crate::walker::{SubstitutionWalker, TermBuilder, TermMap};
use log::{debug, trace};
use sort_computation::SortComputer;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

fn next_session() -> u64 {
    NEXT_SESSION.fetch_add(1, Ordering::Relaxed)
}

/// Wraps an engine and mirrors every term it builds into a hash-consed DAG.
///
/// Engine handles stay on this side: DAG terms carry no native payload, the
/// solver keeps the mapping. Terms handed in must come from this solver's
/// current session; a [`reset`](Engine::reset) starts a new one.
pub struct LoggingSolver<E: Engine> {
    engine: E,
    session: u64,
    table: TermTable,
    natives: HashMap<Term, E::Term>,
    sorts: HashMap<Sort, E::Sort>,
    declared: HashSet<String>,
    symbols: HashMap<String, Term>,
    // only valid for the latest check_sat_assuming
    assumptions: HashMap<E::Term, Term>,
    computer: SortComputer,
}

impl<E: Engine> LoggingSolver<E> {
    pub fn new(engine: E) -> Self {
        let aliasing = engine
            .capabilities()
            .contains(Capabilities::BOOL_BV1_ALIASING);
        LoggingSolver {
            engine,
            session: next_session(),
            table: TermTable::new(),
            natives: HashMap::new(),
            sorts: HashMap::new(),
            declared: HashSet::new(),
            symbols: HashMap::new(),
            assumptions: HashMap::new(),
            computer: SortComputer::new(aliasing),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Number of canonical terms in the current session.
    pub fn num_terms(&self) -> usize {
        self.table.len()
    }

    /// Whether `sort` can be used in this session without declaring anything.
    pub fn has_sort(&self, sort: &Sort) -> bool {
        match sort {
            Sort::Uninterpreted { .. } | Sort::Datatype(_) => self.sorts.contains_key(sort),
            _ => true,
        }
    }

    fn native_sort(&mut self, sort: &Sort) -> Result<E::Sort> {
        if let Some(native) = self.sorts.get(sort) {
            return Ok(native.clone());
        }
        let native = match sort {
            Sort::Bool => self.engine.make_sort(SortKind::Bool)?,
            Sort::Int => self.engine.make_sort(SortKind::Int)?,
            Sort::Real => self.engine.make_sort(SortKind::Real)?,
            Sort::BitVec(w) => self.engine.make_bv_sort(*w)?,
            Sort::Array(index, element) => {
                let index = self.native_sort(index)?;
                let element = self.native_sort(element)?;
                self.engine.make_array_sort(&index, &element)?
            }
            Sort::Function { domain, range } => {
                let domain = domain
                    .iter()
                    .map(|d| self.native_sort(d))
                    .collect::<Result<Vec<_>>>()?;
                let range = self.native_sort(range)?;
                self.engine.make_function_sort(&domain, &range)?
            }
            Sort::Uninterpreted { .. } | Sort::Datatype(_) => {
                return Err(Error::usage(format!("sort {} was not declared", sort)))
            }
            Sort::Param(_) | Sort::Unresolved(_) => {
                return Err(Error::usage(format!("sort {} is not concrete", sort)))
            }
        };
        self.sorts.insert(sort.clone(), native.clone());
        Ok(native)
    }

    fn native(&self, term: &Term) -> Result<E::Term> {
        if term.session() != self.session {
            return Err(Error::usage(format!(
                "term {} does not belong to this session",
                term
            )));
        }
        self.natives
            .get(term)
            .cloned()
            .ok_or_else(|| Error::internal(format!("no engine term recorded for {}", term)))
    }

    fn natives_of(&self, terms: &[Term]) -> Result<Vec<E::Term>> {
        terms.iter().map(|t| self.native(t)).collect()
    }

    /// Find-or-register. On a hit the fresh engine term is dropped.
    fn register(&mut self, mut term: Term, native: E::Term) -> Term {
        if self.table.lookup(&mut term) {
            trace!("hash-cons hit: {:?}", term);
        } else {
            trace!("new term: {:?}", term);
            self.table.insert(term.clone());
            self.natives.insert(term.clone(), native);
        }
        term
    }

    fn leaf(&mut self, sort: Sort, kind: TermKind, children: Vec<Term>, native: E::Term) -> Term {
        let term = Term::new(self.session, Op::null(), sort, kind, children);
        self.register(term, native)
    }

    /// Wraps an engine value as a value leaf of `sort`.
    fn wrap_value(&mut self, native: E::Term, sort: &Sort) -> Term {
        let value = match self.engine.literal(&native) {
            Some(v) => self.computer.coerce_value(sort, v),
            None => Value::Other(format!("{:?}", native)),
        };
        self.leaf(sort.clone(), TermKind::Value(value), vec![], native)
    }

    pub fn make_bool(&mut self, b: bool) -> Result<Term> {
        self.make_value(&Value::Bool(b), &Sort::Bool)
    }

    /// Integer literal of an Int, Real or BitVec sort. Negative numbers wrap
    /// around for bit-vectors.
    pub fn make_int(&mut self, i: i64, sort: &Sort) -> Result<Term> {
        let value = match sort {
            Sort::Int => Value::Int(i as i128),
            Sort::Real => Value::Real {
                numer: i as i128,
                denom: 1,
            },
            Sort::BitVec(w) => Value::bv(*w, i as i128 as u128),
            other => {
                return Err(Error::UnexpectedSort(
                    "Int, Real or BitVec".to_string(),
                    other.clone(),
                ))
            }
        };
        self.make_value(&value, sort)
    }

    pub fn make_term_from_str(&mut self, repr: &str, sort: &Sort, base: u32) -> Result<Term> {
        let value = Value::parse(repr, sort, base)?;
        self.make_value(&value, sort)
    }

    pub fn get_symbol(&self, name: &str) -> Result<Term> {
        self.symbols
            .get(name)
            .cloned()
            .ok_or_else(|| Error::usage(format!("symbol {} was not declared", name)))
    }

    pub fn substitute(&mut self, term: &Term, map: &TermMap) -> Result<Term> {
        SubstitutionWalker::new(map)?.visit(self, term)
    }

    /// Substitutes in every term, sharing one cache across them.
    pub fn substitute_terms(&mut self, terms: &[Term], map: &TermMap) -> Result<Vec<Term>> {
        let mut walker = SubstitutionWalker::new(map)?;
        terms.iter().map(|t| walker.visit(self, t)).collect()
    }

    fn expect_bool_literal(term: &Term) -> Result<()> {
        let atom = match term.op().prim() {
            PrimOp::Not => &term.children()[0],
            _ => term,
        };
        if !term.sort().is_bool() || !atom.is_symbol() {
            return Err(Error::usage(format!(
                "assumption {} is not a Boolean literal",
                term
            )));
        }
        Ok(())
    }
}

impl<E: Engine> Engine for LoggingSolver<E> {
    type Sort = Sort;
    type Term = Term;

    fn name(&self) -> &str {
        self.engine.name()
    }

    fn capabilities(&self) -> Capabilities {
        self.engine.capabilities() | Capabilities::LOGGING | Capabilities::TERM_ITER
    }

    fn set_opt(&mut self, option: &str, value: &str) -> Result<()> {
        self.engine.set_opt(option, value)
    }

    fn set_logic(&mut self, logic: &str) -> Result<()> {
        self.engine.set_logic(logic)
    }

    fn make_sort(&mut self, kind: SortKind) -> Result<Sort> {
        let sort = match kind {
            SortKind::Bool => Sort::Bool,
            SortKind::Int => Sort::Int,
            SortKind::Real => Sort::Real,
            other => return Err(Error::usage(format!("{} sorts need parameters", other))),
        };
        self.native_sort(&sort)?;
        Ok(sort)
    }

    fn make_bv_sort(&mut self, width: u64) -> Result<Sort> {
        if width == 0 {
            return Err(Error::usage("bit-vector width must be positive"));
        }
        let sort = Sort::BitVec(width);
        self.native_sort(&sort)?;
        Ok(sort)
    }

    fn make_array_sort(&mut self, index: &Sort, element: &Sort) -> Result<Sort> {
        let sort = Sort::array(index.clone(), element.clone());
        self.native_sort(&sort)?;
        Ok(sort)
    }

    fn make_function_sort(&mut self, domain: &[Sort], range: &Sort) -> Result<Sort> {
        if domain.is_empty() {
            return Err(Error::usage("function sorts need a non-empty domain"));
        }
        let sort = Sort::function(domain.to_vec(), range.clone());
        self.native_sort(&sort)?;
        Ok(sort)
    }

    fn make_uninterpreted_sort(&mut self, name: &str, arity: u64) -> Result<Sort> {
        if self.declared.contains(name) {
            return Err(Error::Duplicate("sort", name.to_string()));
        }
        let native = self.engine.make_uninterpreted_sort(name, arity)?;
        let sort = Sort::Uninterpreted {
            name: name.to_string(),
            arity,
        };
        self.declared.insert(name.to_string());
        self.sorts.insert(sort.clone(), native);
        Ok(sort)
    }

    fn make_datatype_sort(&mut self, decl: &DatatypeDecl) -> Result<Sort> {
        if !decl.is_finalized() {
            return Err(Error::usage(format!(
                "datatype {} has unfinalized selectors",
                decl.name()
            )));
        }
        if self.declared.contains(decl.name()) {
            return Err(Error::Duplicate("sort", decl.name().to_string()));
        }
        let native = self.engine.make_datatype_sort(decl)?;
        let sort = Sort::Datatype(decl.name().to_string());
        self.declared.insert(decl.name().to_string());
        self.sorts.insert(sort.clone(), native);
        Ok(sort)
    }

    fn make_value(&mut self, value: &Value, sort: &Sort) -> Result<Term> {
        if !value.fits(sort) {
            return Err(Error::usage(format!("{} is not a literal of {}", value, sort)));
        }
        let value = value.normalize(sort)?;
        let native_sort = self.native_sort(sort)?;
        let native = self.engine.make_value(&value, &native_sort)?;
        Ok(self.leaf(sort.clone(), TermKind::Value(value), vec![], native))
    }

    fn make_const_array(&mut self, fill: &Term, sort: &Sort) -> Result<Term> {
        match sort.element_sort() {
            Some(element) => element.expect_same_as(fill.sort())?,
            None => return Err(Error::UnexpectedSort("Array".to_string(), sort.clone())),
        }
        let native_fill = self.native(fill)?;
        let native_sort = self.native_sort(sort)?;
        let native = self.engine.make_const_array(&native_fill, &native_sort)?;
        Ok(self.leaf(sort.clone(), TermKind::ConstArray, vec![fill.clone()], native))
    }

    fn make_symbol(&mut self, name: &str, sort: &Sort) -> Result<Term> {
        if self.symbols.contains_key(name) {
            return Err(Error::Duplicate("symbol", name.to_string()));
        }
        let native_sort = self.native_sort(sort)?;
        let native = self.engine.make_symbol(name, &native_sort)?;
        let term = self.leaf(sort.clone(), TermKind::Symbol(name.to_string()), vec![], native);
        self.symbols.insert(name.to_string(), term.clone());
        Ok(term)
    }

    fn make_term(&mut self, op: Op, args: &[Term]) -> Result<Term> {
        let natives = self.natives_of(args)?;
        let sorts: Vec<Sort> = args.iter().map(|a| a.sort().clone()).collect();
        let derived = self.computer.derive(op, &sorts)?;
        let native = self.engine.make_term(op, &natives)?;
        let reported = self.engine.sort_of(&native)?;
        let sort = self.computer.reconcile(op, derived, reported);
        let term = Term::new(self.session, op, sort, TermKind::Apply, args.to_vec());
        Ok(self.register(term, native))
    }

    fn sort_of(&self, term: &Term) -> Result<Sort> {
        Ok(term.sort().clone())
    }

    fn op_of(&self, term: &Term) -> Result<Op> {
        Ok(term.op())
    }

    fn children(&self, term: &Term) -> Result<Vec<Term>> {
        Ok(term.children().to_vec())
    }

    fn literal(&self, term: &Term) -> Option<Value> {
        term.value().cloned()
    }

    fn assert_formula(&mut self, term: &Term) -> Result<()> {
        term.sort().expect_bool()?;
        let native = self.native(term)?;
        self.engine.assert_formula(&native)
    }

    fn check_sat(&mut self) -> Result<SatResult> {
        self.engine.check_sat()
    }

    fn check_sat_assuming(&mut self, assumptions: &[Term]) -> Result<SatResult> {
        for a in assumptions {
            Self::expect_bool_literal(a)?;
        }
        let natives = self.natives_of(assumptions)?;
        self.assumptions.clear();
        for (native, a) in natives.iter().zip(assumptions) {
            self.assumptions.insert(native.clone(), a.clone());
        }
        debug!("assumption cache holds {} literal(s)", self.assumptions.len());
        self.engine.check_sat_assuming(&natives)
    }

    fn check_sat_interruptible(&mut self, cancel: &CancelToken) -> Result<SatResult> {
        self.engine.check_sat_interruptible(cancel)
    }

    /// Arrays come back as a chain of stores over a constant array.
    fn get_value(&mut self, term: &Term) -> Result<Term> {
        if term.sort().is_array() {
            let model = self.get_array_values(term)?;
            let base = model.base.ok_or_else(|| {
                Error::internal(format!(
                    "{} gave no constant base for {}; use get_array_values",
                    self.engine.name(),
                    term
                ))
            })?;
            let mut res = self.make_const_array(&base, term.sort())?;
            for (index, element) in model.assignments {
                res = self.make_term(PrimOp::Store.into(), &[res, index, element])?;
            }
            return Ok(res);
        }
        let native = self.native(term)?;
        let value = self.engine.get_value(&native)?;
        Ok(self.wrap_value(value, term.sort()))
    }

    fn get_array_values(&mut self, term: &Term) -> Result<ArrayModel<Term>> {
        let (index, element) = match term.sort() {
            Sort::Array(i, e) => (i.as_ref().clone(), e.as_ref().clone()),
            other => return Err(Error::UnexpectedSort("Array".to_string(), other.clone())),
        };
        let native = self.native(term)?;
        let raw = self.engine.get_array_values(&native)?;
        let base = match raw.base {
            Some(b) => {
                if self.engine.sort_of(&b)?.is_array() {
                    return Err(Error::unsupported(
                        "constant base of a multi-dimensional array",
                    ));
                }
                Some(self.wrap_value(b, &element))
            }
            None => None,
        };
        let assignments = raw
            .assignments
            .into_iter()
            .map(|(i, e)| (self.wrap_value(i, &index), self.wrap_value(e, &element)))
            .collect();
        Ok(ArrayModel { assignments, base })
    }

    fn get_unsat_core(&mut self) -> Result<Vec<Term>> {
        let core = self.engine.get_unsat_core()?;
        core.iter()
            .map(|c| {
                self.assumptions.get(c).cloned().ok_or_else(|| {
                    Error::internal(format!(
                        "unsat core element {:?} was not an assumption of the last check",
                        c
                    ))
                })
            })
            .collect()
    }

    fn push(&mut self, levels: u64) -> Result<()> {
        self.engine.push(levels)
    }

    fn pop(&mut self, levels: u64) -> Result<()> {
        self.engine.pop(levels)
    }

    fn reset(&mut self) -> Result<()> {
        self.engine.reset()?;
        debug!(
            "reset: dropping {} term(s) of session {}",
            self.table.len(),
            self.session
        );
        self.table.clear();
        self.natives.clear();
        self.sorts.clear();
        self.declared.clear();
        self.symbols.clear();
        self.assumptions.clear();
        self.session = next_session();
        Ok(())
    }

    fn reset_assertions(&mut self) -> Result<()> {
        self.assumptions.clear();
        self.engine.reset_assertions()
    }
}

impl<E: Engine> TermBuilder for LoggingSolver<E> {
    fn can_iterate_terms(&self) -> bool {
        true
    }

    fn rebuild(&mut self, op: Op, children: &[Term]) -> Result<Term> {
        self.make_term(op, children)
    }
}
