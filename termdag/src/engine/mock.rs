//! Exhaustive-enumeration engine over tiny domains, for tests.

use super::{ArrayModel, CancelToken, Capabilities, Engine, SatResult};
use crate::error::{Error, Result};
use crate::logging::sort_computation::derive_sort;
use crate::term::{DatatypeDecl, Op, PrimOp, Sort, SortKind, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};

const MAX_SEARCH_BITS: u64 = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MockTerm(usize);

#[derive(Clone, Debug)]
enum Node {
    Symbol(String),
    Value(Value),
    ConstArray(MockTerm),
    App(Op, Vec<MockTerm>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Val {
    Bool(bool),
    BitVec(u64, u128),
    Array(Vec<Val>),
}

impl Val {
    fn to_bool(&self) -> Result<bool> {
        match self {
            Val::Bool(b) => Ok(*b),
            other => Err(Error::internal(format!("expected a Boolean, got {:?}", other))),
        }
    }

    fn to_bv(&self) -> Result<(u64, u128)> {
        match self {
            Val::BitVec(w, b) => Ok((*w, *b)),
            other => Err(Error::internal(format!("expected a bit-vector, got {:?}", other))),
        }
    }

    fn to_array(&self) -> Result<&[Val]> {
        match self {
            Val::Array(elems) => Ok(elems),
            other => Err(Error::internal(format!("expected an array, got {:?}", other))),
        }
    }
}

fn bv(width: u64, bits: u128) -> Val {
    Val::BitVec(width, bits & Value::mask(width))
}

fn signed(width: u64, bits: u128) -> i128 {
    if width == 0 {
        return 0;
    }
    let shift = 128 - width as u32;
    ((bits << shift) as i128) >> shift
}

/// Bits needed to enumerate every inhabitant of `sort`.
fn search_bits(sort: &Sort) -> Result<u64> {
    match sort {
        Sort::Bool => Ok(1),
        Sort::BitVec(w) => Ok(*w),
        Sort::Array(idx, elem) => {
            let idx = idx.expect_bv()?;
            if idx > 8 {
                return Err(Error::unsupported("array index too wide to enumerate"));
            }
            Ok((1u64 << idx) * search_bits(elem)?)
        }
        other => Err(Error::unsupported(format!("cannot enumerate {}", other))),
    }
}

fn decode(sort: &Sort, bits: u128) -> Result<Val> {
    match sort {
        Sort::Bool => Ok(Val::Bool(bits & 1 == 1)),
        Sort::BitVec(w) => Ok(bv(*w, bits)),
        Sort::Array(idx, elem) => {
            let n = 1usize << idx.expect_bv()?;
            let step = search_bits(elem)?;
            let elems = (0..n)
                .map(|i| decode(elem, bits >> (i as u64 * step)))
                .collect::<Result<Vec<_>>>()?;
            Ok(Val::Array(elems))
        }
        other => Err(Error::unsupported(format!("cannot enumerate {}", other))),
    }
}

pub struct MockEngine {
    name: String,
    caps: Capabilities,
    delay: Option<Duration>,
    faulty: bool,
    nodes: Vec<(Node, Sort)>,
    symbols: HashMap<String, MockTerm>,
    scopes: Vec<Vec<MockTerm>>,
    model: Option<HashMap<MockTerm, Val>>,
    assumptions: Vec<MockTerm>,
    core: Vec<MockTerm>,
    pub options: HashMap<String, String>,
}

impl MockEngine {
    pub fn new(name: &str) -> Self {
        MockEngine {
            name: name.to_string(),
            caps: Capabilities::TERM_ITER
                | Capabilities::ARRAY_MODELS
                | Capabilities::CONST_ARRAYS
                | Capabilities::ARRAY_FUN_BOOLS
                | Capabilities::UNSAT_CORE
                | Capabilities::DATATYPES
                | Capabilities::INTERRUPT,
            delay: None,
            faulty: false,
            nodes: vec![],
            symbols: HashMap::new(),
            scopes: vec![vec![]],
            model: None,
            assumptions: vec![],
            core: vec![],
            options: HashMap::new(),
        }
    }

    /// Reports Boolean terms as 1-bit bit-vectors.
    pub fn with_bool_bv1_aliasing(mut self) -> Self {
        self.caps |= Capabilities::BOOL_BV1_ALIASING;
        self
    }

    /// Stalls every satisfiability check.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Array models come without a constant base and unsat cores carry a
    /// term that was never assumed.
    pub fn with_faulty_answers(mut self) -> Self {
        self.faulty = true;
        self
    }

    fn aliasing(&self) -> bool {
        self.caps.contains(Capabilities::BOOL_BV1_ALIASING)
    }

    fn node(&self, t: &MockTerm) -> Result<&(Node, Sort)> {
        self.nodes
            .get(t.0)
            .ok_or_else(|| Error::usage(format!("unknown mock term {}", t.0)))
    }

    fn add(&mut self, node: Node, sort: Sort) -> MockTerm {
        self.nodes.push((node, sort));
        MockTerm(self.nodes.len() - 1)
    }

    fn value_of(&mut self, val: &Val, sort: &Sort) -> Result<MockTerm> {
        let value = match val {
            Val::Bool(b) => Value::Bool(*b),
            Val::BitVec(w, b) => Value::bv(*w, *b),
            Val::Array(_) => {
                return Err(Error::unsupported(
                    "array values are returned by get_array_values",
                ))
            }
        };
        Ok(self.add(Node::Value(value), sort.clone()))
    }

    fn collect_symbols(&self, roots: &[MockTerm]) -> Result<Vec<MockTerm>> {
        let mut seen = vec![false; self.nodes.len()];
        let mut symbols = vec![];
        let mut stack = roots.to_vec();
        while let Some(t) = stack.pop() {
            let node = &self.node(&t)?.0;
            if std::mem::replace(&mut seen[t.0], true) {
                continue;
            }
            match node {
                Node::Symbol(_) => symbols.push(t),
                Node::Value(_) => {}
                Node::ConstArray(fill) => stack.push(*fill),
                Node::App(_, args) => stack.extend(args.iter().copied()),
            }
        }
        symbols.sort();
        Ok(symbols)
    }

    fn eval(&self, t: MockTerm, env: &HashMap<MockTerm, Val>) -> Result<Val> {
        let (node, sort) = self.node(&t)?;
        match node {
            Node::Symbol(_) => match env.get(&t) {
                Some(v) => Ok(v.clone()),
                None => decode(sort, 0),
            },
            Node::Value(Value::Bool(b)) => Ok(Val::Bool(*b)),
            Node::Value(Value::BitVec { width, bits }) => Ok(bv(*width, *bits)),
            Node::Value(other) => Err(Error::unsupported(format!("cannot evaluate {}", other))),
            Node::ConstArray(fill) => {
                let n = 1usize << sort.index_sort().map_or(Ok(0), Sort::expect_bv)?;
                Ok(Val::Array(vec![self.eval(*fill, env)?; n]))
            }
            Node::App(op, args) => {
                let vals = args
                    .iter()
                    .map(|a| self.eval(*a, env))
                    .collect::<Result<Vec<_>>>()?;
                self.apply(*op, &vals, sort)
            }
        }
    }

    fn apply(&self, op: Op, vals: &[Val], sort: &Sort) -> Result<Val> {
        let bools = || vals.iter().map(Val::to_bool).collect::<Result<Vec<_>>>();
        let bvs = || vals.iter().map(Val::to_bv).collect::<Result<Vec<_>>>();
        let width = sort.width().unwrap_or(0);
        let fold = |f: fn(u128, u128) -> u128| -> Result<Val> {
            let args = bvs()?;
            let bits = args[1..].iter().fold(args[0].1, |acc, (_, b)| f(acc, *b));
            Ok(bv(width, bits))
        };
        let cmp = |f: fn((u64, u128), (u64, u128)) -> bool| -> Result<Val> {
            let args = bvs()?;
            Ok(Val::Bool(f(args[0], args[1])))
        };
        Ok(match op.prim() {
            PrimOp::Not => Val::Bool(!vals[0].to_bool()?),
            PrimOp::And => Val::Bool(bools()?.iter().all(|b| *b)),
            PrimOp::Or => Val::Bool(bools()?.iter().any(|b| *b)),
            PrimOp::Xor => Val::Bool(bools()?.iter().fold(false, |acc, b| acc ^ b)),
            PrimOp::Implies => Val::Bool(!vals[0].to_bool()? || vals[1].to_bool()?),
            PrimOp::Iff => Val::Bool(vals[0].to_bool()? == vals[1].to_bool()?),
            PrimOp::Ite => {
                if vals[0].to_bool()? {
                    vals[1].clone()
                } else {
                    vals[2].clone()
                }
            }
            PrimOp::Equal => Val::Bool(vals.windows(2).all(|w| w[0] == w[1])),
            PrimOp::Distinct => Val::Bool(
                vals.iter()
                    .enumerate()
                    .all(|(i, a)| vals[i + 1..].iter().all(|b| a != b)),
            ),
            PrimOp::BVNot => bv(width, !vals[0].to_bv()?.1),
            PrimOp::BVNeg => bv(width, vals[0].to_bv()?.1.wrapping_neg()),
            PrimOp::BVAnd => fold(|a, b| a & b)?,
            PrimOp::BVOr => fold(|a, b| a | b)?,
            PrimOp::BVXor => fold(|a, b| a ^ b)?,
            PrimOp::BVAdd => fold(u128::wrapping_add)?,
            PrimOp::BVSub => fold(u128::wrapping_sub)?,
            PrimOp::BVMul => fold(u128::wrapping_mul)?,
            PrimOp::BVUlt => cmp(|a, b| a.1 < b.1)?,
            PrimOp::BVUle => cmp(|a, b| a.1 <= b.1)?,
            PrimOp::BVUgt => cmp(|a, b| a.1 > b.1)?,
            PrimOp::BVUge => cmp(|a, b| a.1 >= b.1)?,
            PrimOp::BVSlt => cmp(|a, b| signed(a.0, a.1) < signed(b.0, b.1))?,
            PrimOp::BVSle => cmp(|a, b| signed(a.0, a.1) <= signed(b.0, b.1))?,
            PrimOp::Concat => {
                let bits = bvs()?.iter().fold(0u128, |acc, (w, b)| (acc << w) | b);
                bv(width, bits)
            }
            PrimOp::Extract => {
                let low = op.index(1).unwrap_or(0);
                bv(width, vals[0].to_bv()?.1 >> low)
            }
            PrimOp::ZeroExtend => bv(width, vals[0].to_bv()?.1),
            PrimOp::Select => {
                let i = vals[1].to_bv()?.1 as usize;
                vals[0]
                    .to_array()?
                    .get(i)
                    .cloned()
                    .ok_or_else(|| Error::internal("array index out of range"))?
            }
            PrimOp::Store => {
                let mut elems = vals[0].to_array()?.to_vec();
                let i = vals[1].to_bv()?.1 as usize;
                if i < elems.len() {
                    elems[i] = vals[2].clone();
                }
                Val::Array(elems)
            }
            other => return Err(Error::unsupported(format!("mock cannot evaluate {}", other))),
        })
    }

    fn stalled(&self, cancel: Option<&CancelToken>) -> bool {
        let delay = match self.delay {
            Some(d) => d,
            None => return false,
        };
        let start = Instant::now();
        while start.elapsed() < delay {
            if cancel.map_or(false, CancelToken::is_cancelled) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        false
    }

    /// Searches for a model of the current assertions plus `extra`.
    fn search(
        &self,
        extra: &[MockTerm],
        cancel: Option<&CancelToken>,
    ) -> Result<Option<HashMap<MockTerm, Val>>> {
        let formulas: Vec<MockTerm> =
            self.scopes.iter().flatten().chain(extra).copied().collect();
        let symbols = self.collect_symbols(&formulas)?;
        let mut widths = vec![];
        for s in &symbols {
            widths.push(search_bits(&self.node(s)?.1)?);
        }
        let total: u64 = widths.iter().sum();
        if total > MAX_SEARCH_BITS {
            return Err(Error::unsupported(format!("{} bits is too many to enumerate", total)));
        }
        for assignment in 0u128..(1u128 << total) {
            if assignment % 256 == 0 && cancel.map_or(false, CancelToken::is_cancelled) {
                return Err(Error::Undecided);
            }
            let mut env = HashMap::new();
            let mut offset = 0;
            for (s, w) in symbols.iter().zip(&widths) {
                let bits = (assignment >> offset) & Value::mask(*w);
                env.insert(*s, decode(&self.node(s)?.1, bits)?);
                offset += w;
            }
            let mut all = true;
            for f in &formulas {
                if !self.eval(*f, &env)?.to_bool()? {
                    all = false;
                    break;
                }
            }
            if all {
                return Ok(Some(env));
            }
        }
        Ok(None)
    }

    fn check(&mut self, extra: &[MockTerm], cancel: Option<&CancelToken>) -> Result<SatResult> {
        self.model = None;
        self.core.clear();
        if self.stalled(cancel) {
            return Ok(SatResult::Unknown);
        }
        match self.search(extra, cancel) {
            Ok(Some(env)) => {
                self.model = Some(env);
                Ok(SatResult::Sat)
            }
            Ok(None) => Ok(SatResult::Unsat),
            Err(Error::Undecided) => Ok(SatResult::Unknown),
            Err(e) => Err(e),
        }
    }
}

impl Engine for MockEngine {
    type Sort = Sort;
    type Term = MockTerm;

    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn set_opt(&mut self, option: &str, value: &str) -> Result<()> {
        self.options.insert(option.to_string(), value.to_string());
        Ok(())
    }

    fn set_logic(&mut self, logic: &str) -> Result<()> {
        self.set_opt("logic", logic)
    }

    fn make_sort(&mut self, kind: SortKind) -> Result<Sort> {
        match kind {
            SortKind::Bool => Ok(Sort::Bool),
            SortKind::Int => Ok(Sort::Int),
            SortKind::Real => Ok(Sort::Real),
            other => Err(Error::usage(format!("{} sorts need parameters", other))),
        }
    }

    fn make_bv_sort(&mut self, width: u64) -> Result<Sort> {
        Ok(Sort::BitVec(width))
    }

    fn make_array_sort(&mut self, index: &Sort, element: &Sort) -> Result<Sort> {
        Ok(Sort::array(index.clone(), element.clone()))
    }

    fn make_function_sort(&mut self, domain: &[Sort], range: &Sort) -> Result<Sort> {
        Ok(Sort::function(domain.to_vec(), range.clone()))
    }

    fn make_uninterpreted_sort(&mut self, name: &str, arity: u64) -> Result<Sort> {
        Ok(Sort::Uninterpreted {
            name: name.to_string(),
            arity,
        })
    }

    fn make_datatype_sort(&mut self, decl: &DatatypeDecl) -> Result<Sort> {
        Ok(Sort::Datatype(decl.name().to_string()))
    }

    fn make_value(&mut self, value: &Value, sort: &Sort) -> Result<MockTerm> {
        Ok(self.add(Node::Value(value.clone()), sort.clone()))
    }

    fn make_const_array(&mut self, fill: &MockTerm, sort: &Sort) -> Result<MockTerm> {
        self.node(fill)?;
        Ok(self.add(Node::ConstArray(*fill), sort.clone()))
    }

    fn make_symbol(&mut self, name: &str, sort: &Sort) -> Result<MockTerm> {
        if self.symbols.contains_key(name) {
            return Err(Error::Duplicate("symbol", name.to_string()));
        }
        let t = self.add(Node::Symbol(name.to_string()), sort.clone());
        self.symbols.insert(name.to_string(), t);
        Ok(t)
    }

    fn make_term(&mut self, op: Op, args: &[MockTerm]) -> Result<MockTerm> {
        let sorts = args
            .iter()
            .map(|a| self.node(a).map(|(_, s)| s.clone()))
            .collect::<Result<Vec<_>>>()?;
        let sort = derive_sort(op, &sorts)?
            .ok_or_else(|| Error::unsupported(format!("mock cannot build {}", op)))?;
        Ok(self.add(Node::App(op, args.to_vec()), sort))
    }

    fn sort_of(&self, term: &MockTerm) -> Result<Sort> {
        let sort = &self.node(term)?.1;
        match sort {
            Sort::Bool if self.aliasing() => Ok(Sort::BitVec(1)),
            _ => Ok(sort.clone()),
        }
    }

    fn op_of(&self, term: &MockTerm) -> Result<Op> {
        match &self.node(term)?.0 {
            Node::App(op, _) => Ok(*op),
            _ => Ok(Op::null()),
        }
    }

    fn children(&self, term: &MockTerm) -> Result<Vec<MockTerm>> {
        match &self.node(term)?.0 {
            Node::App(_, args) => Ok(args.clone()),
            Node::ConstArray(fill) => Ok(vec![*fill]),
            _ => Ok(vec![]),
        }
    }

    fn literal(&self, term: &MockTerm) -> Option<Value> {
        match self.node(term).ok()? {
            (Node::Value(Value::Bool(b)), _) if self.aliasing() => Some(Value::bv(1, *b as u128)),
            (Node::Value(v), _) => Some(v.clone()),
            _ => None,
        }
    }

    fn assert_formula(&mut self, term: &MockTerm) -> Result<()> {
        self.node(term)?;
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(*term);
        }
        Ok(())
    }

    fn check_sat(&mut self) -> Result<SatResult> {
        self.check(&[], None)
    }

    fn check_sat_assuming(&mut self, assumptions: &[MockTerm]) -> Result<SatResult> {
        self.assumptions = assumptions.to_vec();
        let result = self.check(assumptions, None)?;
        if result.is_unsat() {
            // deletion-based core
            let mut core = assumptions.to_vec();
            let mut i = 0;
            while i < core.len() {
                let mut without = core.clone();
                without.remove(i);
                if self.search(&without, None)?.is_none() {
                    core = without;
                } else {
                    i += 1;
                }
            }
            self.core = core;
        }
        Ok(result)
    }

    fn check_sat_interruptible(&mut self, cancel: &CancelToken) -> Result<SatResult> {
        self.check(&[], Some(cancel))
    }

    fn get_value(&mut self, term: &MockTerm) -> Result<MockTerm> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| Error::usage("no model available"))?;
        let val = self.eval(*term, model)?;
        let sort = self.node(term)?.1.clone();
        self.value_of(&val, &sort)
    }

    fn get_array_values(&mut self, term: &MockTerm) -> Result<ArrayModel<MockTerm>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| Error::usage("no model available"))?;
        let val = self.eval(*term, model)?;
        let sort = self.node(term)?.1.clone();
        let (index, element) = match &sort {
            Sort::Array(i, e) => (i.as_ref().clone(), e.as_ref().clone()),
            other => return Err(Error::UnexpectedSort("Array".to_string(), other.clone())),
        };
        let width = index.expect_bv()?;
        let elems = val.to_array()?.to_vec();
        let base = self.value_of(&elems[0], &element)?;
        let mut assignments = vec![];
        for (i, e) in elems.iter().enumerate().skip(1) {
            if *e != elems[0] {
                let idx = self.value_of(&bv(width, i as u128), &index)?;
                let elem = self.value_of(e, &element)?;
                assignments.push((idx, elem));
            }
        }
        Ok(ArrayModel {
            assignments,
            base: if self.faulty { None } else { Some(base) },
        })
    }

    fn get_unsat_core(&mut self) -> Result<Vec<MockTerm>> {
        let mut core = self.core.clone();
        if self.faulty {
            core.push(self.add(Node::Value(Value::Bool(false)), Sort::Bool));
        }
        Ok(core)
    }

    fn push(&mut self, levels: u64) -> Result<()> {
        for _ in 0..levels {
            self.scopes.push(vec![]);
        }
        Ok(())
    }

    fn pop(&mut self, levels: u64) -> Result<()> {
        if levels as usize >= self.scopes.len() {
            return Err(Error::usage(format!("cannot pop {} level(s)", levels)));
        }
        for _ in 0..levels {
            self.scopes.pop();
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        *self = MockEngine {
            name: std::mem::take(&mut self.name),
            caps: self.caps,
            delay: self.delay,
            faulty: self.faulty,
            options: std::mem::take(&mut self.options),
            ..MockEngine::new("")
        };
        Ok(())
    }

    fn reset_assertions(&mut self) -> Result<()> {
        self.scopes = vec![vec![]];
        self.model = None;
        self.core.clear();
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::MockEngine;
    use crate::engine::{CancelToken, Engine, SatResult};
    use crate::term::{PrimOp, Sort, Value};
    use std::time::Duration;

    #[test]
    fn enumerates_bit_vectors() {
        let mut e = MockEngine::new("mock");
        let bv4 = Sort::bv(4);
        let x = e.make_symbol("x", &bv4).unwrap();
        let three = e.make_value(&Value::bv(4, 3), &bv4).unwrap();
        let sum = e.make_term(PrimOp::BVAdd.into(), &[x, x]).unwrap();
        let eq = e.make_term(PrimOp::Equal.into(), &[sum, three]).unwrap();
        e.assert_formula(&eq).unwrap();
        // x + x is always even
        assert_eq!(e.check_sat().unwrap(), SatResult::Unsat);
    }

    #[test]
    fn models_and_cores() {
        let mut e = MockEngine::new("mock");
        let a = e.make_symbol("a", &Sort::Bool).unwrap();
        let b = e.make_symbol("b", &Sort::Bool).unwrap();
        let na = e.make_term(PrimOp::Not.into(), &[a]).unwrap();
        assert_eq!(e.check_sat_assuming(&[a, b, na]).unwrap(), SatResult::Unsat);
        let mut core = e.get_unsat_core().unwrap();
        core.sort();
        assert_eq!(core, vec![a, na]);

        assert_eq!(e.check_sat_assuming(&[a, b]).unwrap(), SatResult::Sat);
        let v = e.get_value(&a).unwrap();
        assert_eq!(e.literal(&v), Some(Value::Bool(true)));
    }

    #[test]
    fn interruptible() {
        let mut e = MockEngine::new("slow").with_delay(Duration::from_secs(30));
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(e.check_sat_interruptible(&token).unwrap(), SatResult::Unknown);
    }
}
