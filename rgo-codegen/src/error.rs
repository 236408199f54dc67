// Error types for rgo-codegen.
//
// Three classes: per-function rejections that drop one function from the
// wrapped set, per-run fatal errors that abort generation, and call-time
// errors raised by marshallers while converting values.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use rgo_sexp::{SexpError, SexpType};

/// Why a function cannot be wrapped. Never fatal to the run.
///
/// `named` is the type as it was reached and `ty` the offending structural
/// type; they are equal when the offending type was reached directly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("unhandled integer type {}", describe(.named, .ty))]
    Integer { named: String, ty: String },

    #[error("unhandled chan type {}", describe(.named, .ty))]
    Chan { named: String, ty: String },

    #[error("unhandled function type with signature {}", describe(.named, .ty))]
    Func { named: String, ty: String },

    #[error("unhandled interface type {0}")]
    Interface(String),

    #[error("unhandled non-string keyed map type {}", describe(.named, .ty))]
    MapKey { named: String, ty: String },

    #[error("unhandled error parameter type {0}")]
    ErrorParameter(String),

    #[error("recursive type unsupported: {0}")]
    Recursive(String),

    #[error("unknown named type {0}")]
    UnknownNamed(String),

    #[error("no marshaller for {0}")]
    NoMarshaller(String),
}

fn describe(named: &str, ty: &str) -> String {
    if named == ty {
        ty.to_string()
    } else {
        format!("{named} ({ty})")
    }
}

/// Fatal errors that abort a generation run.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },

    #[error("failed to parse config {path}: {source}")]
    Config { path: PathBuf, source: toml::de::Error },

    #[error("failed to parse allowed function pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("mangled name collision in {registry}: {ty} hits {other}")]
    Collision { registry: &'static str, ty: String, other: String },

    #[error("pkg: {0}")]
    Package(String),

    #[error("failed to open destination file {path}: {source}")]
    Open { path: String, source: io::Error },

    #[error("write error: {0}")]
    Write(#[source] io::Error),

    #[error("cannot render marshaller: {0}")]
    Render(#[from] Rejection),
}

/// Result alias for generation runs.
pub type GenerateResult<T> = Result<T, GenerateError>;

/// Errors raised by a marshaller while converting one call's arguments or
/// results. In generated code these surface to R as an error condition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    #[error("missing list element for {ty}: no list element for field: {field}")]
    MissingField { ty: String, field: String },

    #[error("no names attribute for map keys")]
    MissingNames,

    #[error("expected {expected} for {ty}, found {found}")]
    Kind { ty: String, expected: SexpType, found: SexpType },

    #[error("empty vector for scalar {0}")]
    EmptyScalar(String),

    #[error("value does not match type {0}")]
    Shape(String),

    #[error("no marshaller for {0}")]
    Unsupported(String),

    #[error(transparent)]
    Sexp(#[from] SexpError),
}

/// Result alias for marshaller calls.
pub type CallResult<T> = Result<T, CallError>;
