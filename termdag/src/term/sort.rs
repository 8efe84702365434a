use crate::error::{Error, Result};
use std::fmt::Display;
use std::sync::Arc;

/// Coarse sort category, used when asking an engine for a sort by kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SortKind {
    Bool,
    Int,
    Real,
    BitVec,
    Array,
    Function,
    Uninterpreted,
    Datatype,
    Param,
    Unresolved,
}

impl Display for SortKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Sort {
    Bool,
    Int,
    Real,
    BitVec(u64),
    Array(Arc<Sort>, Arc<Sort>),
    Function {
        domain: Arc<[Sort]>,
        range: Arc<Sort>,
    },
    Uninterpreted {
        name: String,
        arity: u64,
    },
    Datatype(String),
    /// Sort parameter of a parametric datatype.
    Param(String),
    /// Forward reference to a datatype still being declared.
    Unresolved(String),
}

impl Sort {
    pub fn bv(width: u64) -> Self {
        Sort::BitVec(width)
    }

    pub fn array(index: Sort, element: Sort) -> Self {
        Sort::Array(Arc::new(index), Arc::new(element))
    }

    pub fn function(domain: Vec<Sort>, range: Sort) -> Self {
        Sort::Function {
            domain: domain.into(),
            range: Arc::new(range),
        }
    }

    pub fn kind(&self) -> SortKind {
        match self {
            Sort::Bool => SortKind::Bool,
            Sort::Int => SortKind::Int,
            Sort::Real => SortKind::Real,
            Sort::BitVec(_) => SortKind::BitVec,
            Sort::Array(..) => SortKind::Array,
            Sort::Function { .. } => SortKind::Function,
            Sort::Uninterpreted { .. } => SortKind::Uninterpreted,
            Sort::Datatype(_) => SortKind::Datatype,
            Sort::Param(_) => SortKind::Param,
            Sort::Unresolved(_) => SortKind::Unresolved,
        }
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Sort::Bool)
    }
    pub fn is_bv(&self) -> bool {
        matches!(self, Sort::BitVec(_))
    }
    pub fn is_array(&self) -> bool {
        matches!(self, Sort::Array(..))
    }
    pub fn is_function(&self) -> bool {
        matches!(self, Sort::Function { .. })
    }
    pub fn is_arith(&self) -> bool {
        matches!(self, Sort::Int | Sort::Real)
    }

    pub fn width(&self) -> Option<u64> {
        match self {
            Sort::BitVec(w) => Some(*w),
            _ => None,
        }
    }

    pub fn index_sort(&self) -> Option<&Sort> {
        match self {
            Sort::Array(i, _) => Some(i),
            _ => None,
        }
    }

    pub fn element_sort(&self) -> Option<&Sort> {
        match self {
            Sort::Array(_, e) => Some(e),
            _ => None,
        }
    }

    pub fn domain(&self) -> Option<&[Sort]> {
        match self {
            Sort::Function { domain, .. } => Some(domain),
            _ => None,
        }
    }

    pub fn range(&self) -> Option<&Sort> {
        match self {
            Sort::Function { range, .. } => Some(range),
            _ => None,
        }
    }

    pub fn expect_bool(&self) -> Result<()> {
        if !self.is_bool() {
            return Err(Error::UnexpectedSort("Bool".to_string(), self.clone()));
        }
        Ok(())
    }

    pub fn expect_bv(&self) -> Result<u64> {
        self.width()
            .ok_or_else(|| Error::UnexpectedSort("BitVec".to_string(), self.clone()))
    }

    pub fn expect_arith(&self) -> Result<()> {
        if !self.is_arith() {
            return Err(Error::UnexpectedSort("Int or Real".to_string(), self.clone()));
        }
        Ok(())
    }

    pub fn expect_same_as(&self, other: &Sort) -> Result<()> {
        if self != other {
            return Err(Error::SortIntegrity(self.clone(), other.clone()));
        }
        Ok(())
    }

    /// True if the sort mentions a parameter or an unresolved reference.
    pub fn is_parametric(&self) -> bool {
        let mut stack = vec![self];
        while let Some(s) = stack.pop() {
            match s {
                Sort::Param(_) | Sort::Unresolved(_) => return true,
                Sort::Array(i, e) => {
                    stack.push(i);
                    stack.push(e);
                }
                Sort::Function { domain, range } => {
                    stack.extend(domain.iter());
                    stack.push(range);
                }
                _ => {}
            }
        }
        false
    }
}

impl Display for Sort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::Int => write!(f, "Int"),
            Sort::Real => write!(f, "Real"),
            Sort::BitVec(w) => write!(f, "(_ BitVec {})", w),
            Sort::Array(i, e) => write!(f, "(Array {} {})", i, e),
            Sort::Function { domain, range } => {
                write!(f, "(")?;
                for d in domain.iter() {
                    write!(f, "{} ", d)?;
                }
                write!(f, "-> {})", range)
            }
            Sort::Uninterpreted { name, .. } | Sort::Datatype(name) | Sort::Param(name) => {
                write!(f, "{}", name)
            }
            Sort::Unresolved(name) => write!(f, "{}?", name),
        }
    }
}
