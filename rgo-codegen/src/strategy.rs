// Marshaller strategy selection: Go type shape and direction to the
// conversion a generated marshaller performs.

use rgo_sexp::SexpType;

use crate::error::Rejection;
use crate::types::{BasicKind, Type, TypeTable};
use crate::walk::Direction;

/// R vector storage used for a Go basic kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Logical,
    Integer,
    Raw,
    Real,
    Complex,
    Character,
    List,
}

impl Storage {
    pub fn for_kind(kind: BasicKind) -> Storage {
        match kind.normalize() {
            BasicKind::Bool => Storage::Logical,
            BasicKind::Uint8 => Storage::Raw,
            BasicKind::Float32 | BasicKind::Float64 => Storage::Real,
            BasicKind::Complex64 | BasicKind::Complex128 => Storage::Complex,
            BasicKind::String => Storage::Character,
            _ => Storage::Integer,
        }
    }

    pub fn sexp_type(self) -> SexpType {
        match self {
            Storage::Logical => SexpType::Logical,
            Storage::Integer => SexpType::Integer,
            Storage::Raw => SexpType::Raw,
            Storage::Real => SexpType::Real,
            Storage::Complex => SexpType::Complex,
            Storage::Character => SexpType::Character,
            Storage::List => SexpType::List,
        }
    }

    /// Data pointer accessor of the R C API for atomic storage.
    pub fn accessor(self) -> &'static str {
        match self {
            Storage::Logical => "LOGICAL",
            Storage::Integer => "INTEGER",
            Storage::Raw => "RAW",
            Storage::Real => "REAL",
            Storage::Complex => "COMPLEX",
            Storage::Character => "STRING_PTR",
            Storage::List => "VECTOR_PTR",
        }
    }

    /// Go type of one storage element as seen through the data pointer.
    pub fn go_elem(self) -> &'static str {
        match self {
            Storage::Logical | Storage::Integer => "int32",
            Storage::Raw => "byte",
            Storage::Real => "float64",
            Storage::Complex => "complex128",
            Storage::Character | Storage::List => "C.SEXP",
        }
    }
}

/// Element kinds whose Go layout matches R storage, so slices of them can
/// alias the R vector directly.
///
/// bool is excluded: R logicals are 32-bit and Go bools are one byte.
pub fn is_zero_copy(kind: BasicKind) -> bool {
    matches!(
        kind.normalize(),
        BasicKind::Uint8
            | BasicKind::Int32
            | BasicKind::Uint32
            | BasicKind::Float64
            | BasicKind::Complex128
    )
}

/// How one struct field is marshalled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPlan {
    /// Go field name.
    pub name: String,
    /// List element name on the R side.
    pub external: String,
    pub ty: Type,
}

/// The conversion performed by one generated marshaller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Read or allocate a length-one vector.
    Scalar { kind: BasicKind, storage: Storage },
    /// complex64 is decoded through the complex128 marshaller and narrowed.
    Narrow { kind: BasicKind, via: Type },
    /// Alias the R vector's storage (decode) or block copy into it (encode).
    SliceAlias { kind: BasicKind, storage: Storage },
    /// Element-wise widening or narrowing through the storage kind. `elem`
    /// may be a named type over `kind`.
    SliceConvert { elem: Type, kind: BasicKind, storage: Storage },
    /// Element-wise through the character vector accessors.
    SliceString { elem: Type },
    /// Element-wise through the element's own marshaller, held in a list.
    SliceDelegate { elem: Type },
    /// Through the marshaller of the slice type, copying into a fixed array.
    Array { len: u64, slice: Type },
    /// Keys from the names attribute, values from atomic storage.
    MapFast { elem: Type, kind: BasicKind, storage: Storage },
    /// Keys from the names attribute, values from a character vector.
    MapString { elem: Type },
    /// Keys from the names attribute, values through the element marshaller.
    MapDelegate { elem: Type },
    /// A named list with one element per field, looked up by name.
    Struct { ty: Type, fields: Vec<FieldPlan> },
    /// NULL is nil; anything else goes through the element marshaller.
    Pointer { elem: Type },
    /// Through the underlying type's marshaller. `convert` is set when Go
    /// needs an explicit conversion between the two, which is the case for
    /// basic underlying types.
    Named { underlying: Type, convert: bool },
    /// nil is NULL; anything else is its message string. Encode only.
    Error,
}

/// Select the strategy for a registered type.
pub fn strategy_for(
    ty: &Type,
    direction: Direction,
    table: &TypeTable,
) -> Result<Strategy, Rejection> {
    let strategy = match ty {
        Type::Basic(k) => {
            let kind = k.normalize();
            if kind.is_unsupported_integer() {
                return Err(Rejection::Integer { named: ty.to_string(), ty: ty.to_string() });
            }
            if kind == BasicKind::Complex64 && direction == Direction::Decode {
                Strategy::Narrow { kind, via: Type::Basic(BasicKind::Complex128) }
            } else {
                Strategy::Scalar { kind, storage: Storage::for_kind(kind) }
            }
        }

        Type::Slice(elem) => match table.underlying(elem) {
            Some(Type::Basic(BasicKind::String)) => Strategy::SliceString { elem: (**elem).clone() },
            Some(Type::Basic(k)) => {
                let kind = k.normalize();
                if kind.is_unsupported_integer() {
                    return Err(Rejection::Integer { named: elem.to_string(), ty: kind.name().to_string() });
                }
                let storage = Storage::for_kind(kind);
                if is_zero_copy(kind) && matches!(**elem, Type::Basic(_)) {
                    Strategy::SliceAlias { kind, storage }
                } else {
                    Strategy::SliceConvert { elem: (**elem).clone(), kind, storage }
                }
            }
            Some(_) => Strategy::SliceDelegate { elem: (**elem).clone() },
            None => return Err(unknown(elem)),
        },

        Type::Array { elem, len } => Strategy::Array { len: *len, slice: Type::slice((**elem).clone()) },

        Type::Map { key, elem } => {
            if !matches!(table.underlying(key), Some(Type::Basic(BasicKind::String))) {
                return Err(Rejection::MapKey { named: ty.to_string(), ty: ty.to_string() });
            }
            match table.underlying(elem) {
                Some(Type::Basic(BasicKind::String)) => Strategy::MapString { elem: (**elem).clone() },
                Some(Type::Basic(k)) => {
                    let kind = k.normalize();
                    if kind.is_unsupported_integer() {
                        return Err(Rejection::Integer { named: elem.to_string(), ty: kind.name().to_string() });
                    }
                    Strategy::MapFast { elem: (**elem).clone(), kind, storage: Storage::for_kind(kind) }
                }
                Some(_) => Strategy::MapDelegate { elem: (**elem).clone() },
                None => return Err(unknown(elem)),
            }
        }

        Type::Struct(fields) => Strategy::Struct {
            ty: ty.clone(),
            fields: fields
                .iter()
                .map(|f| FieldPlan {
                    name: f.name.clone(),
                    external: f.target_name().to_string(),
                    ty: f.ty.clone(),
                })
                .collect(),
        },

        Type::Pointer(elem) => Strategy::Pointer { elem: (**elem).clone() },

        Type::Named(_) => {
            let under = table.underlying(ty).ok_or_else(|| unknown(ty))?;
            Strategy::Named {
                underlying: under.normalize(),
                convert: matches!(under, Type::Basic(_)),
            }
        }

        Type::Error => match direction {
            Direction::Encode => Strategy::Error,
            Direction::Decode => return Err(Rejection::ErrorParameter(ty.to_string())),
        },

        Type::Chan(_) => return Err(Rejection::Chan { named: ty.to_string(), ty: ty.to_string() }),
        Type::Func { .. } => {
            return Err(Rejection::Func { named: ty.to_string(), ty: ty.to_string() });
        }
        Type::Interface(_) => return Err(Rejection::Interface(ty.to_string())),
        Type::Tuple(_) => return Err(Rejection::NoMarshaller(ty.to_string())),
    };
    Ok(strategy)
}

fn unknown(ty: &Type) -> Rejection {
    match ty {
        Type::Named(n) => Rejection::UnknownNamed(n.qualified()),
        other => Rejection::UnknownNamed(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Field, Named};

    fn slice_of(k: BasicKind) -> Type {
        Type::slice(Type::Basic(k))
    }

    #[test]
    fn test_storage_mapping() {
        assert_eq!(Storage::for_kind(BasicKind::Bool), Storage::Logical);
        assert_eq!(Storage::for_kind(BasicKind::Uint16), Storage::Integer);
        assert_eq!(Storage::for_kind(BasicKind::Byte), Storage::Raw);
        assert_eq!(Storage::for_kind(BasicKind::Float32), Storage::Real);
        assert_eq!(Storage::for_kind(BasicKind::Complex64), Storage::Complex);
        assert_eq!(Storage::for_kind(BasicKind::String), Storage::Character);
    }

    #[test]
    fn test_slice_strategies() {
        let table = TypeTable::new();
        for k in [
            BasicKind::Uint8,
            BasicKind::Int32,
            BasicKind::Uint32,
            BasicKind::Float64,
            BasicKind::Complex128,
        ] {
            assert!(matches!(
                strategy_for(&slice_of(k), Direction::Decode, &table),
                Ok(Strategy::SliceAlias { .. })
            ));
        }
        for k in [
            BasicKind::Bool,
            BasicKind::Int,
            BasicKind::Int8,
            BasicKind::Int16,
            BasicKind::Uint,
            BasicKind::Uint16,
            BasicKind::Float32,
            BasicKind::Complex64,
        ] {
            assert!(matches!(
                strategy_for(&slice_of(k), Direction::Encode, &table),
                Ok(Strategy::SliceConvert { .. })
            ));
        }
        assert!(matches!(
            strategy_for(&slice_of(BasicKind::String), Direction::Decode, &table),
            Ok(Strategy::SliceString { .. })
        ));
        let structs = Type::slice(Type::Struct(vec![Field::new("A", Type::string())]));
        assert!(matches!(
            strategy_for(&structs, Direction::Decode, &table),
            Ok(Strategy::SliceDelegate { .. })
        ));
    }

    #[test]
    fn test_named_basic_element_converts() {
        let mut table = TypeTable::new();
        let n = Named::new("p", "Meters");
        table.insert(&n, Type::Basic(BasicKind::Float64));
        let ty = Type::slice(Type::Named(n.clone()));
        assert_eq!(
            strategy_for(&ty, Direction::Decode, &table),
            Ok(Strategy::SliceConvert {
                elem: Type::Named(n),
                kind: BasicKind::Float64,
                storage: Storage::Real,
            })
        );
    }

    #[test]
    fn test_complex64_direction_asymmetry() {
        let table = TypeTable::new();
        let c64 = Type::Basic(BasicKind::Complex64);
        assert_eq!(
            strategy_for(&c64, Direction::Decode, &table),
            Ok(Strategy::Narrow {
                kind: BasicKind::Complex64,
                via: Type::Basic(BasicKind::Complex128),
            })
        );
        assert_eq!(
            strategy_for(&c64, Direction::Encode, &table),
            Ok(Strategy::Scalar { kind: BasicKind::Complex64, storage: Storage::Complex })
        );
    }

    #[test]
    fn test_map_strategies() {
        let table = TypeTable::new();
        let s = Type::string();
        assert!(matches!(
            strategy_for(&Type::map(s.clone(), Type::Basic(BasicKind::Int16)), Direction::Decode, &table),
            Ok(Strategy::MapFast { storage: Storage::Integer, .. })
        ));
        assert!(matches!(
            strategy_for(&Type::map(s.clone(), s.clone()), Direction::Encode, &table),
            Ok(Strategy::MapString { .. })
        ));
        assert!(matches!(
            strategy_for(&Type::map(s.clone(), Type::slice(s)), Direction::Encode, &table),
            Ok(Strategy::MapDelegate { .. })
        ));
    }

    #[test]
    fn test_named_strategy() {
        let mut table = TypeTable::new();
        let basic = Named::new("p", "ID");
        let composite = Named::new("p", "Row");
        table.insert(&basic, Type::Basic(BasicKind::Rune));
        table.insert(&composite, Type::slice(Type::Basic(BasicKind::Byte)));
        assert_eq!(
            strategy_for(&Type::Named(basic), Direction::Decode, &table),
            Ok(Strategy::Named { underlying: Type::Basic(BasicKind::Int32), convert: true })
        );
        assert_eq!(
            strategy_for(&Type::Named(composite), Direction::Encode, &table),
            Ok(Strategy::Named {
                underlying: Type::slice(Type::Basic(BasicKind::Uint8)),
                convert: false,
            })
        );
    }

    #[test]
    fn test_struct_plan_uses_external_names() {
        let table = TypeTable::new();
        let ty = Type::Struct(vec![
            Field::tagged("Rows", Type::Basic(BasicKind::Int), r#"rgo:"nrow""#),
            Field::new("Cols", Type::Basic(BasicKind::Int)),
        ]);
        let Ok(Strategy::Struct { fields, .. }) = strategy_for(&ty, Direction::Decode, &table) else {
            panic!("expected struct strategy");
        };
        let ext: Vec<&str> = fields.iter().map(|f| f.external.as_str()).collect();
        assert_eq!(ext, ["nrow", "Cols"]);
    }

    #[test]
    fn test_error_is_encode_only() {
        let table = TypeTable::new();
        assert_eq!(strategy_for(&Type::Error, Direction::Encode, &table), Ok(Strategy::Error));
        assert!(strategy_for(&Type::Error, Direction::Decode, &table).is_err());
    }
}
