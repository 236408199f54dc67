// Reachability walk over function signatures.
//
// Every type reachable from a parameter list is collected into a decode
// registry and every type reachable from a result list into an encode
// registry. Registries hold normalized types keyed by structural identity,
// so each type yields exactly one marshaller however it was reached.

use std::collections::{HashMap, HashSet};

use crate::classify::is_string_key;
use crate::error::{GenerateError, GenerateResult, Rejection};
use crate::mangle::mangle;
use crate::types::{BasicKind, Field, Type, TypeTable};

/// Conversion direction across the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// R value to Go value.
    Decode,
    /// Go value to R value.
    Encode,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Direction::Decode => "SEXP unwrapper",
            Direction::Encode => "SEXP builder",
        }
    }
}

/// The set of types needing a marshaller in one direction.
#[derive(Debug, Clone)]
pub struct Registry {
    direction: Direction,
    types: HashSet<Type>,
}

impl Registry {
    pub fn new(direction: Direction) -> Self {
        Registry { direction, types: HashSet::new() }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Record a type. The first insertion wins; returns false for a type
    /// already present.
    pub fn insert(&mut self, ty: Type) -> bool {
        self.types.insert(ty)
    }

    pub fn contains(&self, ty: &Type) -> bool {
        self.types.contains(ty)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Move every entry of `other` into this registry.
    pub fn merge(&mut self, other: Registry) {
        self.types.extend(other.types);
    }

    /// Registered types in mangled-name order; stable across runs.
    pub fn types(&self) -> Vec<&Type> {
        let mut v: Vec<(String, &Type)> = self.types.iter().map(|t| (mangle(t), t)).collect();
        v.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.to_string().cmp(&b.1.to_string())));
        v.into_iter().map(|(_, t)| t).collect()
    }

    /// Fail if two distinct registered types mangle to the same name.
    pub fn check_collisions(&self) -> GenerateResult<()> {
        let mut seen: HashMap<String, &Type> = HashMap::new();
        for ty in self.types() {
            if let Some(other) = seen.insert(mangle(ty), ty) {
                return Err(GenerateError::Collision {
                    registry: self.direction.label(),
                    ty: ty.to_string(),
                    other: other.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Collect every type reachable from `root` into `registry`.
///
/// On rejection the registry may hold a partial walk; callers walk into a
/// scratch registry and merge it only on success.
pub fn walk(root: &Type, registry: &mut Registry, table: &TypeTable) -> Result<(), Rejection> {
    let mut walker = Walker { registry, table, in_progress: HashSet::new() };
    walker.walk(root, root)
}

struct Walker<'a> {
    registry: &'a mut Registry,
    table: &'a TypeTable,
    in_progress: HashSet<String>,
}

impl Walker<'_> {
    fn visit(&mut self, ty: Type) {
        let helper = match (&ty, self.registry.direction) {
            // complex64 is decoded through the complex128 marshaller.
            (Type::Basic(BasicKind::Complex64), Direction::Decode) => {
                Some(Type::Basic(BasicKind::Complex128))
            }
            _ => None,
        };
        self.registry.insert(ty);
        if let Some(h) = helper {
            self.registry.insert(h);
        }
    }

    fn walk(&mut self, ty: &Type, named: &Type) -> Result<(), Rejection> {
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
                self.visit(ty.clone());
                self.in_progress.insert(qualified.clone());
                let res = self.walk(under, ty);
                self.in_progress.remove(&qualified);
                res
            }

            Type::Array { elem, len } => {
                self.visit(Type::array(elem.normalize(), *len));
                let slice = Type::slice((**elem).clone());
                self.walk(&slice, &slice)
            }

            Type::Basic(k) => {
                if k.is_unsupported_integer() {
                    return Err(Rejection::Integer { named: named.to_string(), ty: ty.to_string() });
                }
                self.visit(Type::Basic(k.normalize()));
                Ok(())
            }

            Type::Map { key, elem } => {
                if !is_string_key(key, self.table) {
                    return Err(Rejection::MapKey { named: named.to_string(), ty: ty.to_string() });
                }
                self.visit(Type::map(key.normalize(), elem.normalize()));
                self.walk(key, key)?;
                self.walk(elem, elem)
            }

            Type::Pointer(elem) => {
                self.visit(Type::pointer(elem.normalize()));
                self.walk(elem, elem)
            }

            Type::Slice(elem) => {
                self.visit(Type::slice(elem.normalize()));
                // Slices of basic kinds are converted inline.
                match self.table.underlying(elem) {
                    Some(Type::Basic(k)) if k.is_unsupported_integer() => {
                        Err(Rejection::Integer { named: elem.to_string(), ty: k.name().to_string() })
                    }
                    Some(Type::Basic(_)) => Ok(()),
                    _ => self.walk(elem, elem),
                }
            }

            Type::Struct(fields) => {
                let mut rebuilt = Vec::with_capacity(fields.len());
                for f in fields {
                    self.walk(&f.ty, &f.ty)?;
                    rebuilt.push(Field { ty: f.ty.normalize(), ..f.clone() });
                }
                self.visit(Type::Struct(rebuilt));
                Ok(())
            }

            Type::Tuple(elems) => {
                for e in elems {
                    self.walk(e, e)?;
                }
                Ok(())
            }

            Type::Error => {
                self.visit(Type::Error);
                self.visit(Type::string());
                Ok(())
            }

            // The classifier rejects these before any walk; reaching one
            // rejects only the owning function.
            Type::Chan(_) => Err(Rejection::Chan { named: named.to_string(), ty: ty.to_string() }),
            Type::Func { .. } => {
                Err(Rejection::Func { named: named.to_string(), ty: ty.to_string() })
            }
            Type::Interface(_) => Err(Rejection::Interface(named.to_string())),
        }
    }
}
