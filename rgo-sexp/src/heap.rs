// In-memory boxed value heap.
//
// Mirrors the R C API surface used by rgo marshallers: allocVector,
// XLENGTH, VECTOR_ELT/SET_VECTOR_ELT, STRING_ELT/SET_STRING_ELT, the typed
// data pointers (LOGICAL, INTEGER, REAL, COMPLEX, RAW), getAttrib/setAttrib
// for names, and PROTECT/UNPROTECT.

use crate::buffer::Buffer;
use crate::error::{SexpError, SexpResult};
use crate::handles::{Rcomplex, Sexp, SexpType};

enum Payload {
    Nil,
    Logical(Buffer<i32>),
    Integer(Buffer<i32>),
    Real(Buffer<f64>),
    Complex(Buffer<Rcomplex>),
    Raw(Buffer<u8>),
    // None is NA_character_.
    Character(Vec<Option<String>>),
    List(Vec<Sexp>),
}

impl Payload {
    fn kind(&self) -> SexpType {
        match self {
            Payload::Nil => SexpType::Nil,
            Payload::Logical(_) => SexpType::Logical,
            Payload::Integer(_) => SexpType::Integer,
            Payload::Real(_) => SexpType::Real,
            Payload::Complex(_) => SexpType::Complex,
            Payload::Raw(_) => SexpType::Raw,
            Payload::Character(_) => SexpType::Character,
            Payload::List(_) => SexpType::List,
        }
    }

    fn len(&self) -> usize {
        match self {
            Payload::Nil => 0,
            Payload::Logical(b) | Payload::Integer(b) => b.len(),
            Payload::Real(b) => b.len(),
            Payload::Complex(b) => b.len(),
            Payload::Raw(b) => b.len(),
            Payload::Character(v) => v.len(),
            Payload::List(v) => v.len(),
        }
    }
}

struct Node {
    payload: Payload,
    names: Sexp,
}

/// Owner of all boxed values created during a marshalling session.
pub struct Heap {
    nodes: Vec<Node>,
    protected: Vec<Sexp>,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    pub fn new() -> Self {
        Heap {
            nodes: vec![Node { payload: Payload::Nil, names: Sexp::NIL }],
            protected: Vec::new(),
        }
    }

    fn node(&self, h: Sexp) -> SexpResult<&Node> {
        self.nodes.get(h.index()).ok_or(SexpError::InvalidHandle(h.0))
    }

    fn node_mut(&mut self, h: Sexp) -> SexpResult<&mut Node> {
        self.nodes.get_mut(h.index()).ok_or(SexpError::InvalidHandle(h.0))
    }

    fn push(&mut self, payload: Payload) -> Sexp {
        let h = Sexp(self.nodes.len() as u32);
        self.nodes.push(Node { payload, names: Sexp::NIL });
        h
    }

    // -----------------------------------------------------------------------
    // Allocation
    // -----------------------------------------------------------------------

    /// Allocate a zero-filled vector of the given kind and length.
    pub fn allocate_vector(&mut self, kind: SexpType, n: usize) -> SexpResult<Sexp> {
        let payload = match kind {
            SexpType::Nil => return Err(SexpError::NotAllocatable(kind)),
            SexpType::Logical => Payload::Logical(Buffer::zeroed(n)),
            SexpType::Integer => Payload::Integer(Buffer::zeroed(n)),
            SexpType::Real => Payload::Real(Buffer::zeroed(n)),
            SexpType::Complex => Payload::Complex(Buffer::zeroed(n)),
            SexpType::Raw => Payload::Raw(Buffer::zeroed(n)),
            SexpType::Character => Payload::Character(vec![Some(String::new()); n]),
            SexpType::List => Payload::List(vec![Sexp::NIL; n]),
        };
        Ok(self.push(payload))
    }

    /// Allocate a length-one vector of the given kind.
    pub fn allocate_scalar(&mut self, kind: SexpType) -> SexpResult<Sexp> {
        self.allocate_vector(kind, 1)
    }

    pub fn scalar_logical(&mut self, v: bool) -> Sexp {
        self.push(Payload::Logical(Buffer::from_vec(vec![v as i32])))
    }

    pub fn scalar_integer(&mut self, v: i32) -> Sexp {
        self.push(Payload::Integer(Buffer::from_vec(vec![v])))
    }

    pub fn scalar_real(&mut self, v: f64) -> Sexp {
        self.push(Payload::Real(Buffer::from_vec(vec![v])))
    }

    pub fn scalar_complex(&mut self, v: Rcomplex) -> Sexp {
        self.push(Payload::Complex(Buffer::from_vec(vec![v])))
    }

    pub fn scalar_raw(&mut self, v: u8) -> Sexp {
        self.push(Payload::Raw(Buffer::from_vec(vec![v])))
    }

    pub fn scalar_string(&mut self, v: &str) -> Sexp {
        self.push(Payload::Character(vec![Some(v.to_string())]))
    }

    pub fn logical_vector(&mut self, v: &[bool]) -> Sexp {
        self.push(Payload::Logical(Buffer::from_vec(v.iter().map(|&b| b as i32).collect())))
    }

    pub fn integer_vector(&mut self, v: &[i32]) -> Sexp {
        self.push(Payload::Integer(Buffer::from_vec(v.to_vec())))
    }

    pub fn real_vector(&mut self, v: &[f64]) -> Sexp {
        self.push(Payload::Real(Buffer::from_vec(v.to_vec())))
    }

    pub fn complex_vector(&mut self, v: &[Rcomplex]) -> Sexp {
        self.push(Payload::Complex(Buffer::from_vec(v.to_vec())))
    }

    pub fn raw_vector(&mut self, v: &[u8]) -> Sexp {
        self.push(Payload::Raw(Buffer::from_vec(v.to_vec())))
    }

    pub fn string_vector(&mut self, v: &[&str]) -> Sexp {
        self.push(Payload::Character(v.iter().map(|s| Some(s.to_string())).collect()))
    }

    pub fn list(&mut self, elems: &[Sexp]) -> Sexp {
        self.push(Payload::List(elems.to_vec()))
    }

    /// Build a list with a names attribute from (name, value) pairs.
    pub fn named_list(&mut self, elems: &[(&str, Sexp)]) -> SexpResult<Sexp> {
        let values: Vec<Sexp> = elems.iter().map(|(_, v)| *v).collect();
        let names: Vec<&str> = elems.iter().map(|(n, _)| *n).collect();
        let list = self.list(&values);
        let names = self.string_vector(&names);
        self.set_names(list, names)?;
        Ok(list)
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    pub fn type_of(&self, h: Sexp) -> SexpResult<SexpType> {
        Ok(self.node(h)?.payload.kind())
    }

    /// Number of elements; zero for NULL.
    pub fn length(&self, h: Sexp) -> SexpResult<usize> {
        Ok(self.node(h)?.payload.len())
    }

    pub fn is_null(&self, h: Sexp) -> bool {
        h.is_nil()
    }

    fn mismatch(&self, h: Sexp, expected: SexpType) -> SexpError {
        match self.type_of(h) {
            Ok(found) => SexpError::TypeMismatch { expected, found },
            Err(err) => err,
        }
    }

    pub fn logical(&self, h: Sexp) -> SexpResult<Buffer<i32>> {
        match &self.node(h)?.payload {
            Payload::Logical(b) => Ok(b.clone()),
            _ => Err(self.mismatch(h, SexpType::Logical)),
        }
    }

    pub fn integer(&self, h: Sexp) -> SexpResult<Buffer<i32>> {
        match &self.node(h)?.payload {
            Payload::Integer(b) => Ok(b.clone()),
            _ => Err(self.mismatch(h, SexpType::Integer)),
        }
    }

    pub fn real(&self, h: Sexp) -> SexpResult<Buffer<f64>> {
        match &self.node(h)?.payload {
            Payload::Real(b) => Ok(b.clone()),
            _ => Err(self.mismatch(h, SexpType::Real)),
        }
    }

    pub fn complex(&self, h: Sexp) -> SexpResult<Buffer<Rcomplex>> {
        match &self.node(h)?.payload {
            Payload::Complex(b) => Ok(b.clone()),
            _ => Err(self.mismatch(h, SexpType::Complex)),
        }
    }

    pub fn raw(&self, h: Sexp) -> SexpResult<Buffer<u8>> {
        match &self.node(h)?.payload {
            Payload::Raw(b) => Ok(b.clone()),
            _ => Err(self.mismatch(h, SexpType::Raw)),
        }
    }

    /// STRING_ELT; `None` is NA_character_.
    pub fn string_elt(&self, h: Sexp, i: usize) -> SexpResult<Option<&str>> {
        match &self.node(h)?.payload {
            Payload::Character(v) => v
                .get(i)
                .map(|s| s.as_deref())
                .ok_or(SexpError::IndexOutOfRange { index: i, len: v.len() }),
            _ => Err(self.mismatch(h, SexpType::Character)),
        }
    }

    pub fn set_string_elt(&mut self, h: Sexp, i: usize, s: Option<&str>) -> SexpResult<()> {
        let err = self.mismatch(h, SexpType::Character);
        match &mut self.node_mut(h)?.payload {
            Payload::Character(v) => {
                let len = v.len();
                let slot = v.get_mut(i).ok_or(SexpError::IndexOutOfRange { index: i, len })?;
                *slot = s.map(str::to_string);
                Ok(())
            }
            _ => Err(err),
        }
    }

    /// VECTOR_ELT on a generic list.
    pub fn get_element(&self, h: Sexp, i: usize) -> SexpResult<Sexp> {
        match &self.node(h)?.payload {
            Payload::List(v) => {
                v.get(i).copied().ok_or(SexpError::IndexOutOfRange { index: i, len: v.len() })
            }
            _ => Err(self.mismatch(h, SexpType::List)),
        }
    }

    /// SET_VECTOR_ELT on a generic list.
    pub fn set_element(&mut self, h: Sexp, i: usize, value: Sexp) -> SexpResult<()> {
        self.node(value)?;
        let err = self.mismatch(h, SexpType::List);
        match &mut self.node_mut(h)?.payload {
            Payload::List(v) => {
                let len = v.len();
                let slot = v.get_mut(i).ok_or(SexpError::IndexOutOfRange { index: i, len })?;
                *slot = value;
                Ok(())
            }
            _ => Err(err),
        }
    }

    // -----------------------------------------------------------------------
    // Attributes
    // -----------------------------------------------------------------------

    /// The names attribute, or NIL when absent.
    pub fn names(&self, h: Sexp) -> SexpResult<Sexp> {
        Ok(self.node(h)?.names)
    }

    /// Set the names attribute. `names` must be a character vector of the
    /// same length as `h`, or NIL to remove the attribute.
    pub fn set_names(&mut self, h: Sexp, names: Sexp) -> SexpResult<()> {
        if !names.is_nil() {
            let kind = self.type_of(names)?;
            if kind != SexpType::Character {
                return Err(SexpError::TypeMismatch { expected: SexpType::Character, found: kind });
            }
            let (n, len) = (self.length(names)?, self.length(h)?);
            if n != len {
                return Err(SexpError::NamesLength { names: n, len });
            }
        }
        if h.is_nil() {
            return Err(SexpError::NotAllocatable(SexpType::Nil));
        }
        self.node_mut(h)?.names = names;
        Ok(())
    }

    /// Index of the first element whose name equals `name`
    /// (the getListElementIndex helper of the generated C shim).
    pub fn list_element_index(&self, h: Sexp, name: &str) -> SexpResult<Option<usize>> {
        let names = self.names(h)?;
        if names.is_nil() {
            return Ok(None);
        }
        for i in 0..self.length(names)? {
            if self.string_elt(names, i)? == Some(name) {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    // -----------------------------------------------------------------------
    // Protection
    // -----------------------------------------------------------------------

    /// PROTECT: root `h` until the matching unprotect.
    pub fn protect(&mut self, h: Sexp) -> Sexp {
        self.protected.push(h);
        h
    }

    /// UNPROTECT(n): release the `n` most recently protected values.
    pub fn unprotect(&mut self, n: usize) -> SexpResult<()> {
        let depth = self.protected.len();
        if n > depth {
            return Err(SexpError::Unprotect { requested: n, depth });
        }
        self.protected.truncate(depth - n);
        Ok(())
    }

    /// Current depth of the protect stack.
    pub fn protected(&self) -> usize {
        self.protected.len()
    }

    // -----------------------------------------------------------------------
    // Comparison
    // -----------------------------------------------------------------------

    /// Structural equality in the sense of R's `identical()`: same kind,
    /// same length, same elements and same names attribute.
    pub fn identical(&self, a: Sexp, b: Sexp) -> bool {
        if a == b {
            return self.node(a).is_ok();
        }
        let (Ok(na), Ok(nb)) = (self.node(a), self.node(b)) else {
            return false;
        };
        let same_payload = match (&na.payload, &nb.payload) {
            (Payload::Nil, Payload::Nil) => true,
            (Payload::Logical(x), Payload::Logical(y)) => *x.as_slice() == *y.as_slice(),
            (Payload::Integer(x), Payload::Integer(y)) => *x.as_slice() == *y.as_slice(),
            (Payload::Real(x), Payload::Real(y)) => {
                x.len() == y.len()
                    && x.as_slice().iter().zip(y.as_slice().iter()).all(|(p, q)| p.to_bits() == q.to_bits())
            }
            (Payload::Complex(x), Payload::Complex(y)) => {
                x.len() == y.len()
                    && x.as_slice().iter().zip(y.as_slice().iter()).all(|(p, q)| {
                        p.r.to_bits() == q.r.to_bits() && p.i.to_bits() == q.i.to_bits()
                    })
            }
            (Payload::Raw(x), Payload::Raw(y)) => *x.as_slice() == *y.as_slice(),
            (Payload::Character(x), Payload::Character(y)) => x == y,
            (Payload::List(x), Payload::List(y)) => {
                x.len() == y.len() && x.iter().zip(y).all(|(p, q)| self.identical(*p, *q))
            }
            _ => false,
        };
        same_payload && self.identical(na.names, nb.names)
    }
}
