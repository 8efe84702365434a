use super::Sort;
use crate::error::{Error, Result};
use std::fmt::Display;

/// A literal carried by a value leaf. Part of the leaf's structural identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    Bool(bool),
    Int(i128),
    Real { numer: i128, denom: i128 },
    BitVec { width: u64, bits: u128 },
    /// Engine-specific literal that has no portable form.
    Other(String),
}

impl Value {
    /// Bit-vector literal, truncated to `width` bits.
    pub fn bv(width: u64, bits: u128) -> Self {
        Value::BitVec {
            width,
            bits: bits & Self::mask(width),
        }
    }

    pub fn mask(width: u64) -> u128 {
        if width >= 128 {
            u128::MAX
        } else {
            (1u128 << width) - 1
        }
    }

    /// Parses `repr` in the given base for a Bool, Int or BitVec sort.
    /// Negative numbers are accepted for bit-vectors and wrap around.
    pub fn parse(repr: &str, sort: &Sort, base: u32) -> Result<Self> {
        if !(2..=36).contains(&base) {
            return Err(Error::usage(format!("base {} is not in 2..=36", base)));
        }
        let bad = || Error::usage(format!("'{}' is not a base-{} literal of {}", repr, base, sort));
        match sort {
            Sort::Bool => match repr {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(bad()),
            },
            Sort::Int => i128::from_str_radix(repr, base).map(Value::Int).map_err(|_| bad()),
            Sort::BitVec(w) => {
                let (neg, digits) = match repr.strip_prefix('-') {
                    Some(d) => (true, d),
                    None => (false, repr),
                };
                let bits = u128::from_str_radix(digits, base).map_err(|_| bad())?;
                let bits = if neg { bits.wrapping_neg() } else { bits };
                Ok(Value::bv(*w, bits))
            }
            _ => Err(Error::unsupported(format!("literals of sort {}", sort))),
        }
    }

    /// Canonical form of this literal as an inhabitant of `sort`: integers
    /// become `n/1` in Real, fractions are reduced with a positive
    /// denominator.
    pub fn normalize(&self, sort: &Sort) -> Result<Self> {
        let (numer, denom) = match (self, sort) {
            (Value::Int(n), Sort::Real) => (*n, 1),
            (Value::Real { numer, denom }, _) => (*numer, *denom),
            _ => return Ok(self.clone()),
        };
        if denom == 0 {
            return Err(Error::usage(format!("{} has a zero denominator", self)));
        }
        let g = gcd(numer.unsigned_abs(), denom.unsigned_abs());
        let sign = if denom < 0 { -1 } else { 1 };
        let reduce = |x: i128| -> Result<i128> {
            i128::try_from(x.unsigned_abs() / g)
                .map(|r| if x < 0 { -r } else { r })
                .map_err(|_| Error::usage(format!("{} is out of range", self)))
        };
        Ok(Value::Real {
            numer: sign * reduce(numer)?,
            denom: sign * reduce(denom)?,
        })
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_bits(&self) -> Option<u128> {
        match self {
            Value::BitVec { bits, .. } => Some(*bits),
            _ => None,
        }
    }

    /// Whether this literal can inhabit `sort`.
    pub fn fits(&self, sort: &Sort) -> bool {
        match (self, sort) {
            (Value::Bool(_), Sort::Bool) => true,
            (Value::Int(_), Sort::Int) => true,
            (Value::Int(_) | Value::Real { .. }, Sort::Real) => true,
            (Value::BitVec { width, .. }, Sort::BitVec(w)) => width == w,
            (Value::Other(_), _) => true,
            _ => false,
        }
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.max(1)
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) if *i < 0 => write!(f, "(- {})", i.unsigned_abs()),
            Value::Int(i) => write!(f, "{}", i),
            Value::Real { numer, denom } => {
                let n = if *numer < 0 {
                    format!("(- {})", numer.unsigned_abs())
                } else {
                    numer.to_string()
                };
                write!(f, "(/ {} {})", n, denom)
            }
            Value::BitVec { width, bits } => {
                write!(f, "#b{:0>width$b}", bits, width = *width as usize)
            }
            Value::Other(s) => write!(f, "{}", s),
        }
    }
}
