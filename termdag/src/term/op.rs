use crate::error::{Error, Result};
use std::fmt::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimOp {
    // core
    And,
    Or,
    Xor,
    Not,
    Implies,
    Iff,
    Ite,
    Equal,
    Distinct,
    Apply,
    // arithmetic
    Plus,
    Minus,
    Negate,
    Mult,
    Div,
    IntDiv,
    Lt,
    Le,
    Gt,
    Ge,
    Mod,
    Abs,
    Pow,
    ToReal,
    ToInt,
    IsInt,
    // bit-vectors
    Concat,
    Extract,
    BVNot,
    BVNeg,
    BVAnd,
    BVOr,
    BVXor,
    BVNand,
    BVNor,
    BVXnor,
    BVComp,
    BVAdd,
    BVSub,
    BVMul,
    BVUdiv,
    BVSdiv,
    BVUrem,
    BVSrem,
    BVSmod,
    BVShl,
    BVAshr,
    BVLshr,
    BVUlt,
    BVUle,
    BVUgt,
    BVUge,
    BVSlt,
    BVSle,
    BVSgt,
    BVSge,
    ZeroExtend,
    SignExtend,
    Repeat,
    RotateLeft,
    RotateRight,
    BVToNat,
    IntToBV,
    // arrays
    Select,
    Store,
    // quantifiers
    Forall,
    Exists,
    // datatypes
    ApplySelector,
    ApplyTester,
    ApplyConstructor,
    /// Marker carried by symbols, values and constant arrays.
    Null,
}

impl PrimOp {
    pub fn name(&self) -> &'static str {
        match self {
            PrimOp::And => "and",
            PrimOp::Or => "or",
            PrimOp::Xor => "xor",
            PrimOp::Not => "not",
            PrimOp::Implies => "=>",
            PrimOp::Iff => "<=>",
            PrimOp::Ite => "ite",
            PrimOp::Equal => "=",
            PrimOp::Distinct => "distinct",
            PrimOp::Apply => "apply",
            PrimOp::Plus => "+",
            PrimOp::Minus => "-",
            PrimOp::Negate => "-",
            PrimOp::Mult => "*",
            PrimOp::Div => "/",
            PrimOp::IntDiv => "div",
            PrimOp::Lt => "<",
            PrimOp::Le => "<=",
            PrimOp::Gt => ">",
            PrimOp::Ge => ">=",
            PrimOp::Mod => "mod",
            PrimOp::Abs => "abs",
            PrimOp::Pow => "pow",
            PrimOp::ToReal => "to_real",
            PrimOp::ToInt => "to_int",
            PrimOp::IsInt => "is_int",
            PrimOp::Concat => "concat",
            PrimOp::Extract => "extract",
            PrimOp::BVNot => "bvnot",
            PrimOp::BVNeg => "bvneg",
            PrimOp::BVAnd => "bvand",
            PrimOp::BVOr => "bvor",
            PrimOp::BVXor => "bvxor",
            PrimOp::BVNand => "bvnand",
            PrimOp::BVNor => "bvnor",
            PrimOp::BVXnor => "bvxnor",
            PrimOp::BVComp => "bvcomp",
            PrimOp::BVAdd => "bvadd",
            PrimOp::BVSub => "bvsub",
            PrimOp::BVMul => "bvmul",
            PrimOp::BVUdiv => "bvudiv",
            PrimOp::BVSdiv => "bvsdiv",
            PrimOp::BVUrem => "bvurem",
            PrimOp::BVSrem => "bvsrem",
            PrimOp::BVSmod => "bvsmod",
            PrimOp::BVShl => "bvshl",
            PrimOp::BVAshr => "bvashr",
            PrimOp::BVLshr => "bvlshr",
            PrimOp::BVUlt => "bvult",
            PrimOp::BVUle => "bvule",
            PrimOp::BVUgt => "bvugt",
            PrimOp::BVUge => "bvuge",
            PrimOp::BVSlt => "bvslt",
            PrimOp::BVSle => "bvsle",
            PrimOp::BVSgt => "bvsgt",
            PrimOp::BVSge => "bvsge",
            PrimOp::ZeroExtend => "zero_extend",
            PrimOp::SignExtend => "sign_extend",
            PrimOp::Repeat => "repeat",
            PrimOp::RotateLeft => "rotate_left",
            PrimOp::RotateRight => "rotate_right",
            PrimOp::BVToNat => "bv2nat",
            PrimOp::IntToBV => "int2bv",
            PrimOp::Select => "select",
            PrimOp::Store => "store",
            PrimOp::Forall => "forall",
            PrimOp::Exists => "exists",
            PrimOp::ApplySelector => "apply_selector",
            PrimOp::ApplyTester => "apply_tester",
            PrimOp::ApplyConstructor => "apply_constructor",
            PrimOp::Null => "null",
        }
    }

    /// Number of numeric indices an operator built from this tag must carry.
    pub fn num_indices(&self) -> usize {
        match self {
            PrimOp::Extract => 2,
            PrimOp::ZeroExtend
            | PrimOp::SignExtend
            | PrimOp::Repeat
            | PrimOp::RotateLeft
            | PrimOp::RotateRight
            | PrimOp::IntToBV => 1,
            _ => 0,
        }
    }

    /// Minimum and (optional) maximum number of children.
    pub fn arity(&self) -> (usize, Option<usize>) {
        match self {
            PrimOp::Null => (0, Some(0)),
            PrimOp::Not
            | PrimOp::Negate
            | PrimOp::Abs
            | PrimOp::ToReal
            | PrimOp::ToInt
            | PrimOp::IsInt
            | PrimOp::Extract
            | PrimOp::BVNot
            | PrimOp::BVNeg
            | PrimOp::ZeroExtend
            | PrimOp::SignExtend
            | PrimOp::Repeat
            | PrimOp::RotateLeft
            | PrimOp::RotateRight
            | PrimOp::BVToNat
            | PrimOp::IntToBV => (1, Some(1)),
            PrimOp::Implies
            | PrimOp::Iff
            | PrimOp::Div
            | PrimOp::IntDiv
            | PrimOp::Mod
            | PrimOp::Pow
            | PrimOp::BVComp
            | PrimOp::BVUdiv
            | PrimOp::BVSdiv
            | PrimOp::BVUrem
            | PrimOp::BVSrem
            | PrimOp::BVSmod
            | PrimOp::BVShl
            | PrimOp::BVAshr
            | PrimOp::BVLshr
            | PrimOp::BVUlt
            | PrimOp::BVUle
            | PrimOp::BVUgt
            | PrimOp::BVUge
            | PrimOp::BVSlt
            | PrimOp::BVSle
            | PrimOp::BVSgt
            | PrimOp::BVSge
            | PrimOp::BVNand
            | PrimOp::BVNor
            | PrimOp::BVXnor
            | PrimOp::Select => (2, Some(2)),
            PrimOp::Ite | PrimOp::Store => (3, Some(3)),
            PrimOp::Apply | PrimOp::ApplySelector | PrimOp::ApplyTester => (1, None),
            PrimOp::ApplyConstructor => (0, None),
            PrimOp::Forall | PrimOp::Exists => (2, None),
            _ => (2, None),
        }
    }
}

impl Display for PrimOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Indices {
    None,
    One(u64),
    Two(u64, u64),
}

/// A primitive tag plus up to two numeric indices. Two operators are equal
/// iff their tags, index counts and indices agree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Op {
    prim: PrimOp,
    indices: Indices,
}

impl Op {
    pub fn new(prim: PrimOp) -> Self {
        Op {
            prim,
            indices: Indices::None,
        }
    }

    pub fn null() -> Self {
        Op::new(PrimOp::Null)
    }

    /// Builds an indexed operator, checking the index count against the tag.
    pub fn indexed(prim: PrimOp, indices: &[u64]) -> Result<Self> {
        if indices.len() != prim.num_indices() {
            return Err(Error::usage(format!(
                "{} takes {} index(es), but {} were given",
                prim,
                prim.num_indices(),
                indices.len()
            )));
        }
        let indices = match *indices {
            [] => Indices::None,
            [i] => Indices::One(i),
            [i, j] => Indices::Two(i, j),
            _ => unreachable!("no operator takes more than two indices"),
        };
        Ok(Op { prim, indices })
    }

    pub fn extract(high: u64, low: u64) -> Self {
        Op {
            prim: PrimOp::Extract,
            indices: Indices::Two(high, low),
        }
    }

    pub fn prim(&self) -> PrimOp {
        self.prim
    }

    pub fn is_null(&self) -> bool {
        self.prim == PrimOp::Null
    }

    pub fn num_indices(&self) -> usize {
        match self.indices {
            Indices::None => 0,
            Indices::One(_) => 1,
            Indices::Two(..) => 2,
        }
    }

    pub fn index(&self, i: usize) -> Option<u64> {
        match (self.indices, i) {
            (Indices::One(x), 0) | (Indices::Two(x, _), 0) => Some(x),
            (Indices::Two(_, y), 1) => Some(y),
            _ => None,
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.num_indices() == self.prim.num_indices()
    }
}

impl From<PrimOp> for Op {
    fn from(prim: PrimOp) -> Self {
        Op::new(prim)
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.indices {
            Indices::None => write!(f, "{}", self.prim),
            Indices::One(i) => write!(f, "(_ {} {})", self.prim, i),
            Indices::Two(i, j) => write!(f, "(_ {} {} {})", self.prim, i, j),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Op, PrimOp};

    #[test]
    fn equality() {
        assert_eq!(Op::new(PrimOp::BVAdd), PrimOp::BVAdd.into());
        assert_ne!(Op::new(PrimOp::BVAdd), Op::new(PrimOp::BVSub));
        assert_eq!(Op::extract(3, 0), Op::indexed(PrimOp::Extract, &[3, 0]).unwrap());
        assert_ne!(Op::extract(3, 0), Op::extract(3, 1));
        assert_ne!(
            Op::indexed(PrimOp::ZeroExtend, &[2]).unwrap(),
            Op::indexed(PrimOp::SignExtend, &[2]).unwrap()
        );
    }

    #[test]
    fn index_count_is_checked() {
        assert!(Op::indexed(PrimOp::Extract, &[3]).is_err());
        assert!(Op::indexed(PrimOp::BVAdd, &[1]).is_err());
        assert!(!Op::new(PrimOp::Extract).is_well_formed());
        assert!(Op::indexed(PrimOp::RotateLeft, &[1]).unwrap().is_well_formed());
    }

    #[test]
    fn display() {
        assert_eq!(Op::new(PrimOp::BVAdd).to_string(), "bvadd");
        assert_eq!(Op::extract(7, 4).to_string(), "(_ extract 7 4)");
        assert_eq!(
            Op::indexed(PrimOp::ZeroExtend, &[8]).unwrap().to_string(),
            "(_ zero_extend 8)"
        );
        assert_eq!(Op::null().to_string(), "null");
    }
}
