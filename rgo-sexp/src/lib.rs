// rgo-sexp: the boxed value capability consumed by rgo marshallers.
// Models the subset of the R value system that crosses the FFI boundary:
// atomic vectors, generic lists, the names attribute, the NULL sentinel and
// the protect stack that roots allocations against collection.

pub mod buffer;
pub mod error;
pub mod handles;
pub mod heap;

pub use buffer::Buffer;
pub use error::{SexpError, SexpResult};
pub use handles::{NA_INTEGER, NA_LOGICAL, Rcomplex, Sexp, SexpType};
pub use heap::Heap;
