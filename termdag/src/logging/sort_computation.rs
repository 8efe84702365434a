use crate::error::{Error, Result};
use crate::term::{Op, PrimOp, Sort, Value};
use log::{debug, warn};
use quick_cache::unsync::Cache;

pub const DEFAULT_SORT_CACHE_SIZE: usize = 1024;

fn expect_all_same(args: &[Sort]) -> Result<&Sort> {
    let first = &args[0];
    for s in &args[1..] {
        first.expect_same_as(s)?;
    }
    Ok(first)
}

fn expect_all_bool(args: &[Sort]) -> Result<()> {
    args.iter().try_for_each(Sort::expect_bool)
}

fn expect_same_bv(args: &[Sort]) -> Result<u64> {
    let width = args[0].expect_bv()?;
    expect_all_same(args)?;
    Ok(width)
}

fn expect_same_arith(args: &[Sort]) -> Result<&Sort> {
    args[0].expect_arith()?;
    expect_all_same(args)
}

fn index(op: Op, i: usize) -> Result<u64> {
    op.index(i)
        .ok_or_else(|| Error::usage(format!("{} is missing index {}", op, i)))
}

/// Result sort of `op` applied to arguments of the given sorts.
///
/// Fails on arity, index or argument sort errors. Returns `None` when the
/// result cannot be told from the operator and argument sorts alone
/// (datatype operators), in which case the engine's report is authoritative.
pub fn derive_sort(op: Op, args: &[Sort]) -> Result<Option<Sort>> {
    if !op.is_well_formed() {
        return Err(Error::usage(format!("{} has the wrong number of indices", op)));
    }
    let (min, max) = op.prim().arity();
    if args.len() < min || max.map_or(false, |max| args.len() > max) {
        let expected = match max {
            Some(max) if max == min => min.to_string(),
            Some(max) => format!("{}..{}", min, max),
            None => format!("at least {}", min),
        };
        return Err(Error::Arity(op, expected, args.len()));
    }

    let sort = match op.prim() {
        PrimOp::Null => return Err(Error::usage("cannot apply the null operator")),
        PrimOp::And | PrimOp::Or | PrimOp::Xor | PrimOp::Not | PrimOp::Implies | PrimOp::Iff => {
            expect_all_bool(args)?;
            Sort::Bool
        }
        PrimOp::Ite => {
            args[0].expect_bool()?;
            args[1].expect_same_as(&args[2])?;
            args[1].clone()
        }
        PrimOp::Equal | PrimOp::Distinct => {
            expect_all_same(args)?;
            Sort::Bool
        }
        PrimOp::Apply => {
            let (domain, range) = match &args[0] {
                Sort::Function { domain, range } => (domain, range),
                other => return Err(Error::UnexpectedSort("Function".to_string(), other.clone())),
            };
            if domain.len() != args.len() - 1 {
                return Err(Error::Arity(op, (domain.len() + 1).to_string(), args.len()));
            }
            for (d, a) in domain.iter().zip(&args[1..]) {
                d.expect_same_as(a)?;
            }
            range.as_ref().clone()
        }
        PrimOp::Plus | PrimOp::Minus | PrimOp::Mult | PrimOp::Pow => {
            expect_same_arith(args)?.clone()
        }
        PrimOp::Negate | PrimOp::Abs => {
            args[0].expect_arith()?;
            args[0].clone()
        }
        PrimOp::Div => {
            expect_same_arith(args)?;
            Sort::Real
        }
        PrimOp::IntDiv | PrimOp::Mod => {
            for a in args {
                Sort::Int.expect_same_as(a)?;
            }
            Sort::Int
        }
        PrimOp::Lt | PrimOp::Le | PrimOp::Gt | PrimOp::Ge => {
            expect_same_arith(args)?;
            Sort::Bool
        }
        PrimOp::ToReal => {
            Sort::Int.expect_same_as(&args[0])?;
            Sort::Real
        }
        PrimOp::ToInt => {
            Sort::Real.expect_same_as(&args[0])?;
            Sort::Int
        }
        PrimOp::IsInt => {
            Sort::Real.expect_same_as(&args[0])?;
            Sort::Bool
        }
        PrimOp::Concat => {
            let mut width = 0u64;
            for a in args {
                width = width.checked_add(a.expect_bv()?).ok_or_else(|| too_wide(op))?;
            }
            Sort::BitVec(width)
        }
        PrimOp::Extract => {
            let width = args[0].expect_bv()?;
            let (high, low) = (index(op, 0)?, index(op, 1)?);
            if high >= width || low > high {
                return Err(Error::usage(format!("{} does not fit in {}", op, args[0])));
            }
            Sort::BitVec(high - low + 1)
        }
        PrimOp::BVNot | PrimOp::BVNeg | PrimOp::RotateLeft | PrimOp::RotateRight => {
            args[0].expect_bv()?;
            args[0].clone()
        }
        PrimOp::BVAnd
        | PrimOp::BVOr
        | PrimOp::BVXor
        | PrimOp::BVNand
        | PrimOp::BVNor
        | PrimOp::BVXnor
        | PrimOp::BVAdd
        | PrimOp::BVSub
        | PrimOp::BVMul
        | PrimOp::BVUdiv
        | PrimOp::BVSdiv
        | PrimOp::BVUrem
        | PrimOp::BVSrem
        | PrimOp::BVSmod
        | PrimOp::BVShl
        | PrimOp::BVAshr
        | PrimOp::BVLshr => Sort::BitVec(expect_same_bv(args)?),
        PrimOp::BVComp => {
            expect_same_bv(args)?;
            Sort::BitVec(1)
        }
        PrimOp::BVUlt
        | PrimOp::BVUle
        | PrimOp::BVUgt
        | PrimOp::BVUge
        | PrimOp::BVSlt
        | PrimOp::BVSle
        | PrimOp::BVSgt
        | PrimOp::BVSge => {
            expect_same_bv(args)?;
            Sort::Bool
        }
        PrimOp::ZeroExtend | PrimOp::SignExtend => Sort::BitVec(
            args[0]
                .expect_bv()?
                .checked_add(index(op, 0)?)
                .ok_or_else(|| too_wide(op))?,
        ),
        PrimOp::Repeat => {
            let times = index(op, 0)?;
            if times == 0 {
                return Err(Error::usage("repeat count must be positive"));
            }
            Sort::BitVec(args[0].expect_bv()?.checked_mul(times).ok_or_else(|| too_wide(op))?)
        }
        PrimOp::BVToNat => {
            args[0].expect_bv()?;
            Sort::Int
        }
        PrimOp::IntToBV => {
            Sort::Int.expect_same_as(&args[0])?;
            Sort::BitVec(index(op, 0)?)
        }
        PrimOp::Select => match &args[0] {
            Sort::Array(idx, elem) => {
                idx.expect_same_as(&args[1])?;
                elem.as_ref().clone()
            }
            other => return Err(Error::UnexpectedSort("Array".to_string(), other.clone())),
        },
        PrimOp::Store => match &args[0] {
            Sort::Array(idx, elem) => {
                idx.expect_same_as(&args[1])?;
                elem.expect_same_as(&args[2])?;
                args[0].clone()
            }
            other => return Err(Error::UnexpectedSort("Array".to_string(), other.clone())),
        },
        PrimOp::Forall | PrimOp::Exists => {
            args[args.len() - 1].expect_bool()?;
            Sort::Bool
        }
        PrimOp::ApplySelector | PrimOp::ApplyTester | PrimOp::ApplyConstructor => return Ok(None),
    };
    Ok(Some(sort))
}

fn too_wide(op: Op) -> Error {
    Error::usage(format!("{} overflows the bit-vector width", op))
}

/// Decides the sort recorded on DAG nodes, memoizing derivations.
///
/// The Bool / 1-bit bit-vector correction only applies when the engine
/// declares `BOOL_BV1_ALIASING`.
pub struct SortComputer {
    cache: Cache<(Op, Vec<Sort>), Option<Sort>>,
    aliasing: bool,
}

impl SortComputer {
    pub fn new(aliasing: bool) -> Self {
        SortComputer {
            cache: Cache::new(DEFAULT_SORT_CACHE_SIZE),
            aliasing,
        }
    }

    pub fn derive(&mut self, op: Op, args: &[Sort]) -> Result<Option<Sort>> {
        let key = (op, args.to_vec());
        if let Some(sort) = self.cache.get(&key) {
            return Ok(sort.clone());
        }
        let sort = derive_sort(op, args)?;
        self.cache.insert(key, sort.clone());
        Ok(sort)
    }

    /// Whether a native term reported as `reported` may stand for `expected`.
    pub fn compatible(&self, expected: &Sort, reported: &Sort) -> bool {
        expected == reported
            || self.aliasing
                && matches!(
                    (expected, reported),
                    (Sort::Bool, Sort::BitVec(1)) | (Sort::BitVec(1), Sort::Bool)
                )
    }

    /// Picks between the derived sort and the one the engine reported.
    pub fn reconcile(&self, op: Op, derived: Option<Sort>, reported: Sort) -> Sort {
        match derived {
            Some(derived) => {
                if !self.compatible(&derived, &reported) {
                    warn!(
                        "{}: engine reported {} but the arguments give {}",
                        op, reported, derived
                    );
                } else if derived != reported {
                    debug!("{}: engine reported {}, using {}", op, reported, derived);
                }
                derived
            }
            None => reported,
        }
    }

    /// Reads a 1-bit literal of a Boolean term as a Boolean.
    pub fn coerce_value(&self, sort: &Sort, value: Value) -> Value {
        match (sort, value) {
            (Sort::Bool, Value::BitVec { width: 1, bits }) if self.aliasing => {
                Value::Bool(bits == 1)
            }
            (_, value) => value,
        }
    }
}
