// Rylos Values - Dynamic Value Universe and EQL Semantics
//
// The values generic functions dispatch over, CL-style eql across
// numeric representations, and the canonical key form used for
// eql-specialized dispatch children.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive};
use ordered_float::NotNan;

use crate::classes::Instance;
use crate::conditions::GenericError;

/// Signature shared by every registered implementation.
pub type NativeFn = Arc<dyn Fn(&[Value]) -> Result<Value, GenericError> + Send + Sync>;

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    BigInt(BigInt),
    Float(f64),
    Char(char),
    Str(Arc<str>),
    Vector(Arc<Vec<Value>>),
    Instance(Arc<Instance>),
    Function(NativeFn),
}

impl Value {
    /// Wraps a native closure as a callable value.
    pub fn function<F>(f: F) -> Value
    where
        F: Fn(&[Value]) -> Result<Value, GenericError> + Send + Sync + 'static,
    {
        Value::Function(Arc::new(f))
    }

    pub fn string(s: &str) -> Value {
        Value::Str(Arc::from(s))
    }

    pub fn vector(items: Vec<Value>) -> Value {
        Value::Vector(Arc::new(items))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    pub fn as_function(&self) -> Option<&NativeFn> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// CL eql: numbers compare by numeric value across
    /// representations, aggregates and functions by identity, the rest
    /// by content. Structural `==` stays strict per variant.
    pub fn eql(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::BigInt(b)) => BigInt::from(*a) == *b,
            (Value::BigInt(a), Value::Int(b)) => *a == BigInt::from(*b),
            (Value::Int(a), Value::Float(b)) => float_eq_big(*b, &BigInt::from(*a)),
            (Value::Float(a), Value::Int(b)) => float_eq_big(*a, &BigInt::from(*b)),
            (Value::BigInt(a), Value::Float(b)) => float_eq_big(*b, a),
            (Value::Float(a), Value::BigInt(b)) => float_eq_big(*a, b),
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Vector(a), Value::Vector(b)) => Arc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Arc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Exact integer/float comparison. Converting the integer to f64 would
/// round near 2^63 and invent equalities the key form does not have.
fn float_eq_big(x: f64, n: &BigInt) -> bool {
    if !x.is_finite() || x.fract() != 0.0 {
        return false;
    }
    match BigInt::from_f64(x) {
        Some(fx) => fx == *n,
        None => false,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Vector(a), Value::Vector(b)) => a == b,
            (Value::Instance(a), Value::Instance(b)) => Arc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(n) => f.debug_tuple("Int").field(n).finish(),
            Value::BigInt(n) => f.debug_tuple("BigInt").field(n).finish(),
            Value::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Value::Char(c) => f.debug_tuple("Char").field(c).finish(),
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::Vector(items) => f.debug_tuple("Vector").field(items).finish(),
            Value::Instance(inst) => write!(f, "Instance({:p})", Arc::as_ptr(inst)),
            Value::Function(_) => write!(f, "Function(<native>)"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(true) => write!(f, "true"),
            Value::Bool(false) => write!(f, "false"),
            Value::Int(n) => write!(f, "{}", n),
            Value::BigInt(n) => write!(f, "{}", n),
            Value::Float(x) => {
                if x.is_finite() && x.fract() == 0.0 {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{}", x)
                }
            }
            Value::Char(c) => write!(f, "#\\{}", c),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Vector(items) => {
                write!(f, "#(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            Value::Instance(inst) => write!(f, "#<instance {:p}>", Arc::as_ptr(inst)),
            Value::Function(_) => write!(f, "#<function>"),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Value {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Value {
        Value::Char(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Str(Arc::from(s))
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Value {
        Value::BigInt(n)
    }
}

impl From<Arc<Instance>> for Value {
    fn from(inst: Arc<Instance>) -> Value {
        Value::Instance(inst)
    }
}

/// Canonical hashable projection of a value, used as the key for
/// eql-specialized dispatch children. Eql-equal values always produce
/// equal keys: integers, big integers and integral floats collapse to
/// one representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EqlKey {
    Nil,
    Bool(bool),
    Int(i64),
    Big(BigInt),
    Float(NotNan<f64>),
    Char(char),
    Str(Arc<str>),
    Instance(IdentityKey),
}

impl EqlKey {
    /// Projects a value to its canonical key. Values with no stable
    /// key report why they cannot serve as one.
    pub fn of(value: &Value) -> Result<EqlKey, &'static str> {
        match value {
            Value::Nil => Ok(EqlKey::Nil),
            Value::Bool(b) => Ok(EqlKey::Bool(*b)),
            Value::Int(n) => Ok(EqlKey::Int(*n)),
            Value::BigInt(n) => Ok(canonical_big(n)),
            Value::Float(x) => canonical_float(*x),
            Value::Char(c) => Ok(EqlKey::Char(*c)),
            Value::Str(s) => Ok(EqlKey::Str(s.clone())),
            Value::Instance(inst) => Ok(EqlKey::Instance(IdentityKey(inst.clone()))),
            Value::Vector(_) => Err("vectors are not eql-comparable"),
            Value::Function(_) => Err("functions are not eql-comparable"),
        }
    }
}

fn canonical_big(n: &BigInt) -> EqlKey {
    match n.to_i64() {
        Some(small) => EqlKey::Int(small),
        None => EqlKey::Big(n.clone()),
    }
}

fn canonical_float(x: f64) -> Result<EqlKey, &'static str> {
    let not_nan = NotNan::new(x).map_err(|_| "NaN is not eql-comparable")?;
    if x.is_finite() && x.fract() == 0.0 {
        if let Some(big) = BigInt::from_f64(x) {
            return Ok(canonical_big(&big));
        }
    }
    Ok(EqlKey::Float(not_nan))
}

/// Pointer-identity wrapper for instances used as eql keys. Holding
/// the Arc keeps the allocation, and therefore the key, stable.
#[derive(Clone)]
pub struct IdentityKey(Arc<Instance>);

impl PartialEq for IdentityKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for IdentityKey {}

impl Hash for IdentityKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Debug for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityKey({:p})", Arc::as_ptr(&self.0))
    }
}
