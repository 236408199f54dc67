// Native value model for the marshalling executor.
//
// A `Value` is what a generated Go procedure holds after decoding: the Go
// value of a registered type, with named types erased to their underlying
// shape. Slices decoded on the zero-copy path keep a view over the boxed
// vector's storage, so cloning a `Value` behaves like copying a Go slice
// header: both copies see the same elements.

use std::collections::BTreeMap;

use rgo_sexp::{Buffer, Rcomplex};

use crate::types::{BasicKind, Type, TypeTable};

#[derive(Debug, Clone)]
pub enum Value {
    /// nil slice, map, pointer or error.
    Nil,
    Bool(bool),
    /// Signed integer kinds.
    Int(i64),
    /// Unsigned integer kinds.
    Uint(u64),
    /// float32 values are held already rounded to single precision.
    Float(f64),
    Complex(f64, f64),
    String(String),
    Slice(Slice),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Fields in declaration order, keyed by Go field name.
    Struct(Vec<(String, Value)>),
    Pointer(Box<Value>),
    Error(String),
}

/// Elements of a non-nil slice.
#[derive(Debug, Clone)]
pub enum Slice {
    /// Aliases the storage of a boxed vector.
    View(View),
    Owned(Vec<Value>),
}

/// A slice whose elements live in a boxed vector.
#[derive(Debug, Clone)]
pub enum View {
    Uint8(Buffer<u8>),
    Int32(Buffer<i32>),
    /// uint32 elements share the 32-bit integer storage bit for bit.
    Uint32(Buffer<i32>),
    Float64(Buffer<f64>),
    Complex128(Buffer<Rcomplex>),
}

impl View {
    pub fn len(&self) -> usize {
        match self {
            View::Uint8(b) => b.len(),
            View::Int32(b) | View::Uint32(b) => b.len(),
            View::Float64(b) => b.len(),
            View::Complex128(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> BasicKind {
        match self {
            View::Uint8(_) => BasicKind::Uint8,
            View::Int32(_) => BasicKind::Int32,
            View::Uint32(_) => BasicKind::Uint32,
            View::Float64(_) => BasicKind::Float64,
            View::Complex128(_) => BasicKind::Complex128,
        }
    }

    fn to_values(&self) -> Vec<Value> {
        match self {
            View::Uint8(b) => b.as_slice().iter().map(|&v| Value::Uint(v as u64)).collect(),
            View::Int32(b) => b.as_slice().iter().map(|&v| Value::Int(v as i64)).collect(),
            View::Uint32(b) => b.as_slice().iter().map(|&v| Value::Uint(v as u32 as u64)).collect(),
            View::Float64(b) => b.as_slice().iter().map(|&v| Value::Float(v)).collect(),
            View::Complex128(b) => b.as_slice().iter().map(|c| Value::Complex(c.r, c.i)).collect(),
        }
    }
}

impl Slice {
    pub fn len(&self) -> usize {
        match self {
            Slice::View(v) => v.len(),
            Slice::Owned(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element values, copied out of any underlying view.
    pub fn to_values(&self) -> Vec<Value> {
        match self {
            Slice::View(v) => v.to_values(),
            Slice::Owned(v) => v.clone(),
        }
    }
}

impl Value {
    pub fn slice(elems: Vec<Value>) -> Value {
        Value::Slice(Slice::Owned(elems))
    }

    pub fn pointer(v: Value) -> Value {
        Value::Pointer(Box::new(v))
    }

    pub fn string(s: impl Into<String>) -> Value {
        Value::String(s.into())
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// The Go zero value of `ty`.
    pub fn zero(ty: &Type, table: &TypeTable) -> Value {
        match table.underlying(ty) {
            Some(Type::Basic(k)) => match k.normalize() {
                BasicKind::Bool => Value::Bool(false),
                BasicKind::String => Value::String(String::new()),
                BasicKind::Float32 | BasicKind::Float64 => Value::Float(0.0),
                BasicKind::Complex64 | BasicKind::Complex128 => Value::Complex(0.0, 0.0),
                k if k.is_unsigned() => Value::Uint(0),
                _ => Value::Int(0),
            },
            Some(Type::Array { elem, len }) => {
                Value::Array((0..*len).map(|_| Value::zero(elem, table)).collect())
            }
            Some(Type::Struct(fields)) => Value::Struct(
                fields.iter().map(|f| (f.name.clone(), Value::zero(&f.ty, table))).collect(),
            ),
            _ => Value::Nil,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Uint(a), Value::Uint(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Complex(ar, ai), Value::Complex(br, bi)) => ar == br && ai == bi,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Slice(a), Value::Slice(b)) => a.to_values() == b.to_values(),
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Struct(a), Value::Struct(b)) => a == b,
            (Value::Pointer(a), Value::Pointer(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            _ => false,
        }
    }
}
