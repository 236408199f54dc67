// Handle and tag types for boxed values.

use std::fmt;

/// Opaque handle to a boxed value owned by a [`Heap`](crate::Heap).
///
/// Handles are plain identifiers; they are only meaningful for the heap that
/// produced them. `Sexp::NIL` is the distinguished `NULL` sentinel.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Sexp(pub(crate) u32);

impl Sexp {
    /// The `NULL` sentinel (R_NilValue).
    pub const NIL: Sexp = Sexp(0);

    pub fn is_nil(self) -> bool {
        self == Sexp::NIL
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Boxed value kinds that participate in marshalling.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SexpType {
    Nil,
    Logical,
    Integer,
    Real,
    Complex,
    Character,
    Raw,
    List,
}

impl SexpType {
    /// The R C API name of the kind (e.g. "INTSXP").
    pub fn label(self) -> &'static str {
        match self {
            SexpType::Nil => "NILSXP",
            SexpType::Logical => "LGLSXP",
            SexpType::Integer => "INTSXP",
            SexpType::Real => "REALSXP",
            SexpType::Complex => "CPLXSXP",
            SexpType::Character => "STRSXP",
            SexpType::Raw => "RAWSXP",
            SexpType::List => "VECSXP",
        }
    }

    /// The R-level name of the kind as reported by `typeof()`.
    pub fn r_name(self) -> &'static str {
        match self {
            SexpType::Nil => "NULL",
            SexpType::Logical => "logical",
            SexpType::Integer => "integer",
            SexpType::Real => "double",
            SexpType::Complex => "complex",
            SexpType::Character => "character",
            SexpType::Raw => "raw",
            SexpType::List => "list",
        }
    }
}

impl fmt::Display for SexpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// R complex value; layout-compatible with Go's complex128.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Rcomplex {
    pub r: f64,
    pub i: f64,
}

/// Missing value marker for integer vectors.
pub const NA_INTEGER: i32 = i32::MIN;

/// Missing value marker for logical vectors.
pub const NA_LOGICAL: i32 = i32::MIN;
