// Boundary acceptance rules for Go types.

use std::collections::HashSet;
use std::fmt;

use crate::error::Rejection;
use crate::types::{BasicKind, Type, TypeTable};

/// Which side of a call a type appears on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Decoded from R before the call.
    Parameter,
    /// Encoded to R after the call.
    Result,
}

/// A type that is accepted but lets Go code alias memory owned by R.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    Pointer { named: String, ty: String },
    Slice { named: String, ty: String },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (what, named, ty) = match self {
            Advisory::Pointer { named, ty } => ("pointer", named, ty),
            Advisory::Slice { named, ty } => ("slice", named, ty),
        };
        if named == ty {
            write!(f, "{what} type {ty}")
        } else {
            write!(f, "{what} type {named} ({ty})")
        }
    }
}

/// Check that `ty` can cross the boundary in `role`.
///
/// The first offending type rejects the whole type. Advisories are only
/// produced for parameters: results are always copied out to R.
pub fn accept(ty: &Type, role: Role, table: &TypeTable) -> Result<Vec<Advisory>, Rejection> {
    let mut checker = Checker {
        role,
        table,
        in_progress: HashSet::new(),
        advisories: Vec::new(),
    };
    checker.check(ty, ty)?;
    Ok(checker.advisories)
}

/// Whether a map key type reduces to string.
pub(crate) fn is_string_key(key: &Type, table: &TypeTable) -> bool {
    matches!(table.underlying(key), Some(Type::Basic(BasicKind::String)))
}

struct Checker<'a> {
    role: Role,
    table: &'a TypeTable,
    in_progress: HashSet<String>,
    advisories: Vec<Advisory>,
}

impl Checker<'_> {
    /// `named` is the type as reached; `ty` is the type being checked.
    fn check(&mut self, ty: &Type, named: &Type) -> Result<(), Rejection> {
        match ty {
            Type::Named(n) => {
                let qualified = n.qualified();
                if self.in_progress.contains(&qualified) {
                    return Err(Rejection::Recursive(qualified));
                }
                let table = self.table;
                let under = table
                    .underlying(ty)
                    .ok_or_else(|| Rejection::UnknownNamed(qualified.clone()))?;
                self.in_progress.insert(qualified.clone());
                let res = self.check(under, ty);
                self.in_progress.remove(&qualified);
                res
            }

            Type::Basic(k) => {
                if k.is_unsupported_integer() {
                    return Err(Rejection::Integer { named: named.to_string(), ty: ty.to_string() });
                }
                Ok(())
            }

            Type::Chan(_) => Err(Rejection::Chan { named: named.to_string(), ty: ty.to_string() }),

            Type::Func { .. } => {
                Err(Rejection::Func { named: named.to_string(), ty: ty.to_string() })
            }

            Type::Interface(_) => Err(Rejection::Interface(named.to_string())),

            Type::Error => match self.role {
                Role::Parameter => Err(Rejection::ErrorParameter(named.to_string())),
                Role::Result => Ok(()),
            },

            Type::Map { key, elem } => {
                if !is_string_key(key, self.table) {
                    return Err(Rejection::MapKey { named: named.to_string(), ty: ty.to_string() });
                }
                self.check(elem, elem)
            }

            Type::Pointer(elem) => {
                self.check(elem, elem)?;
                if self.role == Role::Parameter {
                    self.advisories.push(Advisory::Pointer {
                        named: named.to_string(),
                        ty: ty.to_string(),
                    });
                }
                Ok(())
            }

            Type::Slice(elem) => {
                self.check(elem, elem)?;
                let basic_elem = matches!(self.table.underlying(elem), Some(Type::Basic(_)));
                if self.role == Role::Parameter && !basic_elem {
                    self.advisories.push(Advisory::Slice {
                        named: named.to_string(),
                        ty: ty.to_string(),
                    });
                }
                Ok(())
            }

            Type::Array { elem, .. } => self.check(elem, elem),

            Type::Struct(fields) => {
                for f in fields {
                    self.check(&f.ty, &f.ty)?;
                }
                Ok(())
            }

            Type::Tuple(elems) => {
                for e in elems {
                    self.check(e, e)?;
                }
                Ok(())
            }
        }
    }
}
