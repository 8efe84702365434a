use super::{Capabilities, Engine, SatResult};
use crate::engine::CancelToken;
use crate::error::{Error, Result};
use crate::logging::LoggingSolver;
use crate::portfolio::{solve_query, Racer};
use crate::term::{Op, PrimOp, Sort, SortKind, Term, Value};
use log::{debug, trace};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use z3::ast::{self, Array, Ast, Bool, Dynamic, Int, Real, BV};
use z3::{Config, Context, DeclKind, FuncDecl, Model, Params, Solver};

const ENGINE_NAME: &str = "z3";

#[derive(Clone, Debug)]
pub enum Z3Sort<'ctx> {
    Sort(z3::Sort<'ctx>),
    Fun {
        domain: Vec<z3::Sort<'ctx>>,
        range: z3::Sort<'ctx>,
    },
}

/// Z3 function declarations are neither hashable nor comparable, so
/// function symbols are referred to by name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Z3Term<'ctx> {
    Ast(Dynamic<'ctx>),
    Fun(String),
}

struct FunSymbol<'ctx> {
    decl: FuncDecl<'ctx>,
    domain: Vec<z3::Sort<'ctx>>,
    range: z3::Sort<'ctx>,
}

pub struct Z3Engine<'ctx> {
    ctx: &'ctx Context,
    solver: Solver<'ctx>,
    funcs: HashMap<String, FunSymbol<'ctx>>,
    model: Option<Model<'ctx>>,
}

/// Portfolio contestant that creates its own z3 context inside the racer
/// thread and drops it when the run ends.
pub struct Z3Racer {
    name: String,
    options: Vec<(String, String)>,
}

impl Z3Racer {
    pub fn new(name: impl Into<String>) -> Self {
        Z3Racer {
            name: name.into(),
            options: vec![],
        }
    }

    /// Passed to `set_opt` before the query is asserted.
    pub fn with_opt(mut self, option: &str, value: &str) -> Self {
        self.options.push((option.to_string(), value.to_string()));
        self
    }
}

impl Racer for Z3Racer {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(self: Box<Self>, query: &Term, cancel: &CancelToken) -> Result<SatResult> {
        let mut cfg = Config::new();
        cfg.set_model_generation(true);
        let ctx = Context::new(&cfg);
        let mut solver = LoggingSolver::new(Z3Engine::new(&ctx));
        for (option, value) in &self.options {
            solver.set_opt(option, value)?;
        }
        solve_query(&mut solver, query, cancel)
    }
}

fn z3_err(msg: impl Into<String>) -> Error {
    Error::Engine(ENGINE_NAME.to_string(), msg.into())
}

fn narrow(n: u64) -> Result<u32> {
    u32::try_from(n).map_err(|_| Error::usage(format!("{} is out of range for z3", n)))
}

impl<'ctx> Z3Engine<'ctx> {
    pub fn new(ctx: &'ctx Context) -> Self {
        Z3Engine {
            ctx,
            solver: Solver::new(ctx),
            funcs: HashMap::new(),
            model: None,
        }
    }

    pub fn context(&self) -> &'ctx Context {
        self.ctx
    }

    fn sort(&self, sort: &Z3Sort<'ctx>) -> Result<z3::Sort<'ctx>> {
        match sort {
            Z3Sort::Sort(s) => Ok(s.clone()),
            Z3Sort::Fun { .. } => Err(Error::usage("function sorts have no z3 values")),
        }
    }

    fn ast(&self, term: &Z3Term<'ctx>) -> Result<Dynamic<'ctx>> {
        match term {
            Z3Term::Ast(a) => Ok(a.clone()),
            Z3Term::Fun(name) => Err(Error::usage(format!("function {} used as a value", name))),
        }
    }

    fn fun(&self, term: &Z3Term<'ctx>) -> Result<&FunSymbol<'ctx>> {
        match term {
            Z3Term::Fun(name) => self
                .funcs
                .get(name)
                .ok_or_else(|| Error::usage(format!("unknown function {}", name))),
            Z3Term::Ast(a) => Err(Error::usage(format!("{} is not a function", a))),
        }
    }

    fn bools(&self, args: &[Z3Term<'ctx>]) -> Result<Vec<Bool<'ctx>>> {
        args.iter()
            .map(|a| {
                self.ast(a)?
                    .as_bool()
                    .ok_or_else(|| Error::UnexpectedSort("Bool".to_string(), self.logical(a)))
            })
            .collect()
    }

    fn bvs(&self, args: &[Z3Term<'ctx>]) -> Result<Vec<BV<'ctx>>> {
        args.iter()
            .map(|a| {
                self.ast(a)?
                    .as_bv()
                    .ok_or_else(|| Error::UnexpectedSort("BitVec".to_string(), self.logical(a)))
            })
            .collect()
    }

    fn array(&self, arg: &Z3Term<'ctx>) -> Result<Array<'ctx>> {
        self.ast(arg)?
            .as_array()
            .ok_or_else(|| Error::UnexpectedSort("Array".to_string(), self.logical(arg)))
    }

    fn arith(&self, args: &[Z3Term<'ctx>]) -> Result<Arith<'ctx>> {
        let dyns = args.iter().map(|a| self.ast(a)).collect::<Result<Vec<_>>>()?;
        if let Some(ints) = dyns.iter().map(Dynamic::as_int).collect::<Option<Vec<_>>>() {
            return Ok(Arith::Int(ints));
        }
        dyns.iter()
            .map(Dynamic::as_real)
            .collect::<Option<Vec<_>>>()
            .map(Arith::Real)
            .ok_or_else(|| Error::usage("mixed or non-arithmetic arguments"))
    }

    /// Best-effort logical sort, for error messages.
    fn logical(&self, term: &Z3Term<'ctx>) -> Sort {
        self.sort_of(term).unwrap_or(Sort::Unresolved(String::from("?")))
    }

    fn apply(&self, op: Op, args: &[Z3Term<'ctx>]) -> Result<Dynamic<'ctx>> {
        let ctx = self.ctx;
        let index = |i: usize| -> Result<u32> {
            narrow(op.index(i).ok_or_else(|| Error::usage(format!("{} is missing an index", op)))?)
        };
        let res: Dynamic<'ctx> = match op.prim() {
            PrimOp::And => {
                let b = self.bools(args)?;
                Bool::and(ctx, &b.iter().collect::<Vec<_>>()).into()
            }
            PrimOp::Or => {
                let b = self.bools(args)?;
                Bool::or(ctx, &b.iter().collect::<Vec<_>>()).into()
            }
            PrimOp::Xor => {
                let b = self.bools(args)?;
                b[1..].iter().fold(b[0].clone(), |acc, x| acc.xor(x)).into()
            }
            PrimOp::Not => self.bools(args)?[0].not().into(),
            PrimOp::Implies => {
                let b = self.bools(args)?;
                b[0].implies(&b[1]).into()
            }
            PrimOp::Iff => {
                let b = self.bools(args)?;
                b[0].iff(&b[1]).into()
            }
            PrimOp::Ite => {
                let cond = self.bools(&args[..1])?;
                cond[0].ite(&self.ast(&args[1])?, &self.ast(&args[2])?)
            }
            PrimOp::Equal => {
                let d = args.iter().map(|a| self.ast(a)).collect::<Result<Vec<_>>>()?;
                let eqs: Vec<Bool<'ctx>> = d.windows(2).map(|w| w[0]._eq(&w[1])).collect();
                conjoin(ctx, eqs).into()
            }
            PrimOp::Distinct => {
                let d = args.iter().map(|a| self.ast(a)).collect::<Result<Vec<_>>>()?;
                Dynamic::distinct(ctx, &d.iter().collect::<Vec<_>>()).into()
            }
            PrimOp::Apply => {
                let f = self.fun(&args[0])?;
                let rest = args[1..].iter().map(|a| self.ast(a)).collect::<Result<Vec<_>>>()?;
                let refs: Vec<&dyn Ast<'ctx>> = rest.iter().map(|a| a as &dyn Ast<'ctx>).collect();
                f.decl.apply(&refs)
            }

            PrimOp::Plus => self.arith(args)?.fold(ctx, Int::add, Real::add),
            PrimOp::Minus => self.arith(args)?.fold(ctx, Int::sub, Real::sub),
            PrimOp::Mult => self.arith(args)?.fold(ctx, Int::mul, Real::mul),
            PrimOp::Negate => match self.arith(args)? {
                Arith::Int(v) => v[0].unary_minus().into(),
                Arith::Real(v) => v[0].unary_minus().into(),
            },
            PrimOp::Div => match self.arith(args)? {
                Arith::Real(v) => v[0].div(&v[1]).into(),
                Arith::Int(v) => v[0].to_real().div(&v[1].to_real()).into(),
            },
            PrimOp::IntDiv | PrimOp::Mod => match self.arith(args)? {
                Arith::Int(v) if op.prim() == PrimOp::IntDiv => v[0].div(&v[1]).into(),
                Arith::Int(v) => v[0].modulo(&v[1]).into(),
                Arith::Real(_) => return Err(Error::UnexpectedSort("Int".to_string(), Sort::Real)),
            },
            PrimOp::Pow => match self.arith(args)? {
                Arith::Int(v) => v[0].power(&v[1]).into(),
                Arith::Real(v) => v[0].power(&v[1]).into(),
            },
            PrimOp::Abs => match self.arith(args)? {
                Arith::Int(v) => {
                    let zero = Int::from_i64(ctx, 0);
                    v[0].lt(&zero).ite(&v[0].unary_minus(), &v[0]).into()
                }
                Arith::Real(v) => {
                    let zero = Real::from_real(ctx, 0, 1);
                    v[0].lt(&zero).ite(&v[0].unary_minus(), &v[0]).into()
                }
            },
            PrimOp::Lt | PrimOp::Le | PrimOp::Gt | PrimOp::Ge => {
                // chained: (< a b c) is (and (< a b) (< b c))
                let prim = op.prim();
                let links: Vec<Bool<'ctx>> = match self.arith(args)? {
                    Arith::Int(v) => v
                        .windows(2)
                        .map(|w| match prim {
                            PrimOp::Lt => w[0].lt(&w[1]),
                            PrimOp::Le => w[0].le(&w[1]),
                            PrimOp::Gt => w[0].gt(&w[1]),
                            _ => w[0].ge(&w[1]),
                        })
                        .collect(),
                    Arith::Real(v) => v
                        .windows(2)
                        .map(|w| match prim {
                            PrimOp::Lt => w[0].lt(&w[1]),
                            PrimOp::Le => w[0].le(&w[1]),
                            PrimOp::Gt => w[0].gt(&w[1]),
                            _ => w[0].ge(&w[1]),
                        })
                        .collect(),
                };
                conjoin(ctx, links).into()
            }
            PrimOp::ToReal => match self.arith(args)? {
                Arith::Int(v) => v[0].to_real().into(),
                Arith::Real(v) => v[0].clone().into(),
            },
            PrimOp::ToInt | PrimOp::IsInt => match self.arith(args)? {
                Arith::Real(v) if op.prim() == PrimOp::ToInt => v[0].to_int().into(),
                Arith::Real(v) => v[0].is_int().into(),
                Arith::Int(_) => return Err(Error::UnexpectedSort("Real".to_string(), Sort::Int)),
            },

            PrimOp::Concat => {
                let v = self.bvs(args)?;
                v[1..].iter().fold(v[0].clone(), |acc, x| acc.concat(x)).into()
            }
            PrimOp::Extract => self.bvs(args)?[0].extract(index(0)?, index(1)?).into(),
            PrimOp::ZeroExtend => self.bvs(args)?[0].zero_ext(index(0)?).into(),
            PrimOp::SignExtend => self.bvs(args)?[0].sign_ext(index(0)?).into(),
            PrimOp::Repeat => {
                let v = self.bvs(args)?;
                let mut res = v[0].clone();
                for _ in 1..index(0)? {
                    res = res.concat(&v[0]);
                }
                res.into()
            }
            PrimOp::RotateLeft | PrimOp::RotateRight => {
                let v = self.bvs(args)?;
                let size = v[0].get_size();
                let amount = BV::from_u64(ctx, u64::from(index(0)? % size.max(1)), size);
                if op.prim() == PrimOp::RotateLeft {
                    v[0].bvrotl(&amount).into()
                } else {
                    v[0].bvrotr(&amount).into()
                }
            }
            PrimOp::BVNot => self.bvs(args)?[0].bvnot().into(),
            PrimOp::BVNeg => self.bvs(args)?[0].bvneg().into(),
            PrimOp::BVComp => {
                let v = self.bvs(args)?;
                let (one, zero) = (BV::from_u64(ctx, 1, 1), BV::from_u64(ctx, 0, 1));
                v[0]._eq(&v[1]).ite(&one, &zero).into()
            }
            PrimOp::BVToNat => self.bvs(args)?[0].to_int(false).into(),
            PrimOp::IntToBV => match self.arith(args)? {
                Arith::Int(v) => BV::from_int(&v[0], index(0)?).into(),
                Arith::Real(_) => return Err(Error::UnexpectedSort("Int".to_string(), Sort::Real)),
            },
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
            | PrimOp::BVLshr => {
                let v = self.bvs(args)?;
                let prim = op.prim();
                let step = |x: BV<'ctx>, y: &BV<'ctx>| match prim {
                    PrimOp::BVAnd => x.bvand(y),
                    PrimOp::BVOr => x.bvor(y),
                    PrimOp::BVXor => x.bvxor(y),
                    PrimOp::BVNand => x.bvnand(y),
                    PrimOp::BVNor => x.bvnor(y),
                    PrimOp::BVXnor => x.bvxnor(y),
                    PrimOp::BVAdd => x.bvadd(y),
                    PrimOp::BVSub => x.bvsub(y),
                    PrimOp::BVMul => x.bvmul(y),
                    PrimOp::BVUdiv => x.bvudiv(y),
                    PrimOp::BVSdiv => x.bvsdiv(y),
                    PrimOp::BVUrem => x.bvurem(y),
                    PrimOp::BVSrem => x.bvsrem(y),
                    PrimOp::BVSmod => x.bvsmod(y),
                    PrimOp::BVShl => x.bvshl(y),
                    PrimOp::BVAshr => x.bvashr(y),
                    _ => x.bvlshr(y),
                };
                // left-associative for the n-ary ones
                v[1..].iter().fold(v[0].clone(), step).into()
            }
            PrimOp::BVUlt
            | PrimOp::BVUle
            | PrimOp::BVUgt
            | PrimOp::BVUge
            | PrimOp::BVSlt
            | PrimOp::BVSle
            | PrimOp::BVSgt
            | PrimOp::BVSge => {
                let v = self.bvs(args)?;
                let (x, y) = (&v[0], &v[1]);
                match op.prim() {
                    PrimOp::BVUlt => x.bvult(y),
                    PrimOp::BVUle => x.bvule(y),
                    PrimOp::BVUgt => x.bvugt(y),
                    PrimOp::BVUge => x.bvuge(y),
                    PrimOp::BVSlt => x.bvslt(y),
                    PrimOp::BVSle => x.bvsle(y),
                    PrimOp::BVSgt => x.bvsgt(y),
                    _ => x.bvsge(y),
                }
                .into()
            }

            PrimOp::Select => self.array(&args[0])?.select(&self.ast(&args[1])?),
            PrimOp::Store => self
                .array(&args[0])?
                .store(&self.ast(&args[1])?, &self.ast(&args[2])?)
                .into(),

            PrimOp::Forall | PrimOp::Exists => {
                let (body, bound) = args
                    .split_last()
                    .ok_or_else(|| Error::usage("quantifier without a body"))?;
                let body = self.bools(std::slice::from_ref(body))?;
                let bound = bound.iter().map(|a| self.ast(a)).collect::<Result<Vec<_>>>()?;
                let refs: Vec<&dyn Ast<'ctx>> = bound.iter().map(|a| a as &dyn Ast<'ctx>).collect();
                if op.prim() == PrimOp::Forall {
                    ast::forall_const(ctx, &refs, &[], &body[0]).into()
                } else {
                    ast::exists_const(ctx, &refs, &[], &body[0]).into()
                }
            }

            PrimOp::ApplySelector
            | PrimOp::ApplyTester
            | PrimOp::ApplyConstructor
            | PrimOp::Null => {
                return Err(Error::unsupported(format!("{} cannot build {}", ENGINE_NAME, op)))
            }
        };
        Ok(res)
    }

    fn check_result(&mut self, res: z3::SatResult) -> SatResult {
        self.model = match res {
            z3::SatResult::Sat => self.solver.get_model(),
            _ => None,
        };
        match res {
            z3::SatResult::Sat => SatResult::Sat,
            z3::SatResult::Unsat => SatResult::Unsat,
            z3::SatResult::Unknown => SatResult::Unknown,
        }
    }
}

fn conjoin<'ctx>(ctx: &'ctx Context, mut conjuncts: Vec<Bool<'ctx>>) -> Bool<'ctx> {
    if conjuncts.len() == 1 {
        return conjuncts.remove(0);
    }
    Bool::and(ctx, &conjuncts.iter().collect::<Vec<_>>())
}

enum Arith<'ctx> {
    Int(Vec<Int<'ctx>>),
    Real(Vec<Real<'ctx>>),
}

impl<'ctx> Arith<'ctx> {
    fn fold(
        self,
        ctx: &'ctx Context,
        int: fn(&'ctx Context, &[&Int<'ctx>]) -> Int<'ctx>,
        real: fn(&'ctx Context, &[&Real<'ctx>]) -> Real<'ctx>,
    ) -> Dynamic<'ctx> {
        match self {
            Arith::Int(v) => int(ctx, &v.iter().collect::<Vec<_>>()).into(),
            Arith::Real(v) => real(ctx, &v.iter().collect::<Vec<_>>()).into(),
        }
    }
}

fn logical_sort(sort: &z3::Sort<'_>) -> Result<Sort> {
    Ok(match sort.kind() {
        z3::SortKind::Bool => Sort::Bool,
        z3::SortKind::Int => Sort::Int,
        z3::SortKind::Real => Sort::Real,
        z3::SortKind::BV => Sort::bv(u64::from(sort.bv_size().unwrap_or(0))),
        z3::SortKind::Array => match (sort.array_domain(), sort.array_range()) {
            (Some(index), Some(element)) => {
                Sort::array(logical_sort(&index)?, logical_sort(&element)?)
            }
            _ => return Err(z3_err(format!("array sort {} without domain", sort))),
        },
        z3::SortKind::Uninterpreted => Sort::Uninterpreted {
            name: sort.to_string(),
            arity: 0,
        },
        z3::SortKind::Datatype => Sort::Datatype(sort.to_string()),
        other => return Err(z3_err(format!("unsupported sort kind {:?}", other))),
    })
}

fn prim_of(kind: DeclKind) -> Option<PrimOp> {
    Some(match kind {
        DeclKind::AND => PrimOp::And,
        DeclKind::OR => PrimOp::Or,
        DeclKind::XOR => PrimOp::Xor,
        DeclKind::NOT => PrimOp::Not,
        DeclKind::IMPLIES => PrimOp::Implies,
        DeclKind::IFF => PrimOp::Iff,
        DeclKind::ITE => PrimOp::Ite,
        DeclKind::EQ => PrimOp::Equal,
        DeclKind::DISTINCT => PrimOp::Distinct,
        DeclKind::ADD => PrimOp::Plus,
        DeclKind::SUB => PrimOp::Minus,
        DeclKind::UMINUS => PrimOp::Negate,
        DeclKind::MUL => PrimOp::Mult,
        DeclKind::DIV => PrimOp::Div,
        DeclKind::IDIV => PrimOp::IntDiv,
        DeclKind::MOD => PrimOp::Mod,
        DeclKind::LT => PrimOp::Lt,
        DeclKind::LE => PrimOp::Le,
        DeclKind::GT => PrimOp::Gt,
        DeclKind::GE => PrimOp::Ge,
        DeclKind::TO_REAL => PrimOp::ToReal,
        DeclKind::TO_INT => PrimOp::ToInt,
        DeclKind::IS_INT => PrimOp::IsInt,
        DeclKind::CONCAT => PrimOp::Concat,
        DeclKind::BNOT => PrimOp::BVNot,
        DeclKind::BNEG => PrimOp::BVNeg,
        DeclKind::BAND => PrimOp::BVAnd,
        DeclKind::BOR => PrimOp::BVOr,
        DeclKind::BXOR => PrimOp::BVXor,
        DeclKind::BADD => PrimOp::BVAdd,
        DeclKind::BSUB => PrimOp::BVSub,
        DeclKind::BMUL => PrimOp::BVMul,
        DeclKind::BUDIV => PrimOp::BVUdiv,
        DeclKind::BSDIV => PrimOp::BVSdiv,
        DeclKind::BUREM => PrimOp::BVUrem,
        DeclKind::BSREM => PrimOp::BVSrem,
        DeclKind::BSMOD => PrimOp::BVSmod,
        DeclKind::BSHL => PrimOp::BVShl,
        DeclKind::BASHR => PrimOp::BVAshr,
        DeclKind::BLSHR => PrimOp::BVLshr,
        DeclKind::ULT => PrimOp::BVUlt,
        DeclKind::ULEQ => PrimOp::BVUle,
        DeclKind::UGT => PrimOp::BVUgt,
        DeclKind::UGEQ => PrimOp::BVUge,
        DeclKind::SLT => PrimOp::BVSlt,
        DeclKind::SLEQ => PrimOp::BVSle,
        DeclKind::SGT => PrimOp::BVSgt,
        DeclKind::SGEQ => PrimOp::BVSge,
        DeclKind::SELECT => PrimOp::Select,
        DeclKind::STORE => PrimOp::Store,
        DeclKind::UNINTERPRETED => PrimOp::Apply,
        _ => return None,
    })
}

impl<'ctx> Engine for Z3Engine<'ctx> {
    type Sort = Z3Sort<'ctx>;
    type Term = Z3Term<'ctx>;

    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::THEORY_INT
            | Capabilities::THEORY_REAL
            | Capabilities::CONST_ARRAYS
            | Capabilities::ARRAY_FUN_BOOLS
            | Capabilities::UNSAT_CORE
            | Capabilities::QUANTIFIERS
            | Capabilities::INTERRUPT
    }

    fn set_opt(&mut self, option: &str, value: &str) -> Result<()> {
        let mut params = Params::new(self.ctx);
        match value {
            "true" => params.set_bool(option, true),
            "false" => params.set_bool(option, false),
            v => match v.parse::<u32>() {
                Ok(n) => params.set_u32(option, n),
                Err(_) => params.set_symbol(option, v),
            },
        }
        debug!("{}: set {} = {}", ENGINE_NAME, option, value);
        self.solver.set_params(&params);
        Ok(())
    }

    fn set_logic(&mut self, logic: &str) -> Result<()> {
        self.solver = Solver::new_for_logic(self.ctx, logic)
            .ok_or_else(|| z3_err(format!("unknown logic {}", logic)))?;
        self.model = None;
        Ok(())
    }

    fn make_sort(&mut self, kind: SortKind) -> Result<Self::Sort> {
        let sort = match kind {
            SortKind::Bool => z3::Sort::bool(self.ctx),
            SortKind::Int => z3::Sort::int(self.ctx),
            SortKind::Real => z3::Sort::real(self.ctx),
            other => return Err(Error::usage(format!("{:?} sorts take parameters", other))),
        };
        Ok(Z3Sort::Sort(sort))
    }

    fn make_bv_sort(&mut self, width: u64) -> Result<Self::Sort> {
        Ok(Z3Sort::Sort(z3::Sort::bitvector(self.ctx, narrow(width)?)))
    }

    fn make_array_sort(&mut self, index: &Self::Sort, element: &Self::Sort) -> Result<Self::Sort> {
        let (index, element) = (self.sort(index)?, self.sort(element)?);
        Ok(Z3Sort::Sort(z3::Sort::array(self.ctx, &index, &element)))
    }

    fn make_function_sort(
        &mut self,
        domain: &[Self::Sort],
        range: &Self::Sort,
    ) -> Result<Self::Sort> {
        Ok(Z3Sort::Fun {
            domain: domain.iter().map(|s| self.sort(s)).collect::<Result<_>>()?,
            range: self.sort(range)?,
        })
    }

    fn make_uninterpreted_sort(&mut self, name: &str, arity: u64) -> Result<Self::Sort> {
        if arity != 0 {
            return Err(Error::unsupported(format!(
                "{} has no uninterpreted sort constructors",
                ENGINE_NAME
            )));
        }
        Ok(Z3Sort::Sort(z3::Sort::uninterpreted(
            self.ctx,
            z3::Symbol::String(name.to_string()),
        )))
    }

    fn make_value(&mut self, value: &Value, sort: &Self::Sort) -> Result<Self::Term> {
        let sort = self.sort(sort)?;
        let ctx = self.ctx;
        let res: Option<Dynamic<'ctx>> = match value {
            Value::Bool(b) => Some(Bool::from_bool(ctx, *b).into()),
            Value::Int(n) => Int::from_str(ctx, &n.to_string()).map(Into::into),
            Value::Real { numer, denom } => {
                Real::from_real_str(ctx, &numer.to_string(), &denom.to_string()).map(Into::into)
            }
            Value::BitVec { width, bits } => {
                BV::from_str(ctx, narrow(*width)?, &bits.to_string()).map(Into::into)
            }
            Value::Other(repr) => return Err(Error::unsupported(format!("literal {}", repr))),
        };
        let res = res.ok_or_else(|| z3_err(format!("cannot express {} as {}", value, sort)))?;
        if res.get_sort() != sort {
            return Err(Error::usage(format!("{} is not of sort {}", value, sort)));
        }
        Ok(Z3Term::Ast(res))
    }

    fn make_const_array(&mut self, fill: &Self::Term, sort: &Self::Sort) -> Result<Self::Term> {
        let sort = self.sort(sort)?;
        let domain = sort
            .array_domain()
            .ok_or_else(|| Error::usage(format!("{} is not an array sort", sort)))?;
        let fill = self.ast(fill)?;
        Ok(Z3Term::Ast(Array::const_array(self.ctx, &domain, &fill).into()))
    }

    fn make_symbol(&mut self, name: &str, sort: &Self::Sort) -> Result<Self::Term> {
        match sort {
            Z3Sort::Sort(s) => Ok(Z3Term::Ast(Dynamic::new_const(self.ctx, name, s))),
            Z3Sort::Fun { domain, range } => {
                let refs: Vec<&z3::Sort<'ctx>> = domain.iter().collect();
                let decl = FuncDecl::new(self.ctx, name, &refs, range);
                self.funcs.insert(
                    name.to_string(),
                    FunSymbol {
                        decl,
                        domain: domain.clone(),
                        range: range.clone(),
                    },
                );
                Ok(Z3Term::Fun(name.to_string()))
            }
        }
    }

    fn make_term(&mut self, op: Op, args: &[Self::Term]) -> Result<Self::Term> {
        trace!("{}: make {} over {} args", ENGINE_NAME, op, args.len());
        Ok(Z3Term::Ast(self.apply(op, args)?))
    }

    fn sort_of(&self, term: &Self::Term) -> Result<Sort> {
        match term {
            Z3Term::Ast(a) => logical_sort(&a.get_sort()),
            Z3Term::Fun(_) => {
                let f = self.fun(term)?;
                let domain = f.domain.iter().map(logical_sort).collect::<Result<Vec<_>>>()?;
                Ok(Sort::function(domain, logical_sort(&f.range)?))
            }
        }
    }

    /// Indexed operators (extract and friends) are not recovered.
    fn op_of(&self, term: &Self::Term) -> Result<Op> {
        let a = match term {
            Z3Term::Fun(_) => return Ok(Op::null()),
            Z3Term::Ast(a) => a,
        };
        if a.is_const() || !a.is_app() {
            return Ok(Op::null());
        }
        let kind = a.decl().kind();
        prim_of(kind)
            .map(Op::new)
            .ok_or_else(|| Error::unsupported(format!("{} operator {:?}", ENGINE_NAME, kind)))
    }

    fn children(&self, term: &Self::Term) -> Result<Vec<Self::Term>> {
        let a = match term {
            Z3Term::Fun(_) => return Ok(vec![]),
            Z3Term::Ast(a) => a,
        };
        let mut res = vec![];
        if a.is_app() && a.decl().kind() == DeclKind::UNINTERPRETED && a.num_children() > 0 {
            let name = a.decl().name();
            if !self.funcs.contains_key(&name) {
                return Err(Error::unsupported(format!("function {} was not declared here", name)));
            }
            res.push(Z3Term::Fun(name));
        }
        res.extend(a.children().into_iter().map(Z3Term::Ast));
        Ok(res)
    }

    fn literal(&self, term: &Self::Term) -> Option<Value> {
        let a = match term {
            Z3Term::Ast(a) => a,
            Z3Term::Fun(_) => return None,
        };
        if let Some(b) = a.as_bool() {
            return b.as_bool().map(Value::Bool);
        }
        if let Some(bv) = a.as_bv() {
            return bv.as_u64().map(|bits| Value::bv(u64::from(bv.get_size()), u128::from(bits)));
        }
        if let Some(i) = a.as_int() {
            return i.as_i64().map(|n| Value::Int(i128::from(n)));
        }
        None
    }

    fn assert_formula(&mut self, term: &Self::Term) -> Result<()> {
        let b = self.bools(std::slice::from_ref(term))?;
        self.solver.assert(&b[0]);
        Ok(())
    }

    fn check_sat(&mut self) -> Result<SatResult> {
        let res = self.solver.check();
        Ok(self.check_result(res))
    }

    fn check_sat_assuming(&mut self, assumptions: &[Self::Term]) -> Result<SatResult> {
        let lits = self.bools(assumptions)?;
        let res = self.solver.check_assumptions(&lits);
        Ok(self.check_result(res))
    }

    fn check_sat_interruptible(&mut self, cancel: &CancelToken) -> Result<SatResult> {
        let handle = self.ctx.handle();
        let done = AtomicBool::new(false);
        let res = std::thread::scope(|scope| {
            scope.spawn(|| {
                while !done.load(Ordering::SeqCst) {
                    if cancel.is_cancelled() {
                        debug!("{}: interrupting check", ENGINE_NAME);
                        handle.interrupt();
                        return;
                    }
                    std::thread::sleep(Duration::from_millis(5));
                }
            });
            let res = self.solver.check();
            done.store(true, Ordering::SeqCst);
            res
        });
        Ok(self.check_result(res))
    }

    fn get_value(&mut self, term: &Self::Term) -> Result<Self::Term> {
        let a = self.ast(term)?;
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| Error::usage("get_value needs a satisfiable check first"))?;
        model
            .eval(&a, true)
            .map(Z3Term::Ast)
            .ok_or_else(|| z3_err(format!("no model value for {}", a)))
    }

    fn get_unsat_core(&mut self) -> Result<Vec<Self::Term>> {
        Ok(self
            .solver
            .get_unsat_core()
            .iter()
            .map(|b| Z3Term::Ast(Dynamic::from_ast(b)))
            .collect())
    }

    fn push(&mut self, levels: u64) -> Result<()> {
        for _ in 0..levels {
            self.solver.push();
        }
        Ok(())
    }

    fn pop(&mut self, levels: u64) -> Result<()> {
        self.solver.pop(narrow(levels)?);
        self.model = None;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.solver.reset();
        self.funcs.clear();
        self.model = None;
        Ok(())
    }

    fn reset_assertions(&mut self) -> Result<()> {
        self.solver.reset();
        self.model = None;
        Ok(())
    }
}
