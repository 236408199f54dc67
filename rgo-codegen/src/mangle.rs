// Identifier mangling for generated marshaller names.
//
// A mangled name spells the type's structure left to right: one word tag per
// constructor followed by its parameters, separated by underscores. Free-form
// strings (package paths, names, struct tags) are written as `<len>_<escaped>`
// so they cannot run into what follows. Distinct normalized types therefore
// never share a name.

use std::fmt::Write;

use crate::types::Type;

/// Prefix of procedures converting an R value to a Go value.
pub const UNPACK_PREFIX: &str = "unpackSEXP_";

/// Prefix of procedures converting a Go value to an R value.
pub const PACK_PREFIX: &str = "packSEXP_";

/// Flat identifier for a type, e.g. `Basic_int32` or
/// `Slice_Pointer_Basic_float64`.
///
/// The type must be normalized; `rune` and `int32` are the same type but
/// mangle differently.
pub fn mangle(ty: &Type) -> String {
    let mut out = String::with_capacity(32);
    encode(ty, &mut out);
    out
}

/// Name of the procedure decoding `ty` from an R value.
pub fn unpack_name(ty: &Type) -> String {
    format!("{UNPACK_PREFIX}{}", mangle(ty))
}

/// Name of the procedure encoding `ty` as an R value.
pub fn pack_name(ty: &Type) -> String {
    format!("{PACK_PREFIX}{}", mangle(ty))
}

fn encode(ty: &Type, out: &mut String) {
    match ty {
        Type::Basic(k) => {
            out.push_str("Basic_");
            out.push_str(k.name());
        }
        Type::Error => out.push_str("Named_error"),
        Type::Named(n) => {
            out.push_str("Named_");
            word(&n.path, out);
            out.push('_');
            word(&n.name, out);
        }
        Type::Pointer(e) => {
            out.push_str("Pointer_");
            encode(e, out);
        }
        Type::Slice(e) => {
            out.push_str("Slice_");
            encode(e, out);
        }
        Type::Array { elem, len } => {
            let _ = write!(out, "Array_{len}_");
            encode(elem, out);
        }
        Type::Map { key, elem } => {
            out.push_str("Map_");
            encode(key, out);
            out.push('_');
            encode(elem, out);
        }
        Type::Struct(fields) => {
            let _ = write!(out, "Struct_{}", fields.len());
            for f in fields {
                out.push('_');
                word(&f.name, out);
                out.push('_');
                word(&f.tag, out);
                out.push('_');
                encode(&f.ty, out);
            }
        }
        Type::Tuple(elems) => {
            let _ = write!(out, "Tuple_{}", elems.len());
            for e in elems {
                out.push('_');
                encode(e, out);
            }
        }
        Type::Chan(e) => {
            out.push_str("Chan_");
            encode(e, out);
        }
        Type::Func { params, results } => {
            let _ = write!(out, "Signature_{}_{}", params.len(), results.len());
            for e in params.iter().chain(results) {
                out.push('_');
                encode(e, out);
            }
        }
        Type::Interface(None) => out.push_str("Interface_empty"),
        Type::Interface(Some(name)) => {
            out.push_str("Interface_");
            word(name, out);
        }
    }
}

/// `<len>_<escaped>`. ASCII letters and digits are kept, `_` is doubled and
/// anything else becomes `_<hex code point>_`.
fn word(s: &str, out: &mut String) {
    let mut esc = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            c if c.is_ascii_alphanumeric() => esc.push(c),
            '_' => esc.push_str("__"),
            c => {
                let _ = write!(esc, "_{:x}_", c as u32);
            }
        }
    }
    let _ = write!(out, "{}_{esc}", esc.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BasicKind, Field};
    use proptest::prelude::*;

    #[test]
    fn test_mangle_examples() {
        let s = Type::string();
        assert_eq!(mangle(&Type::Basic(BasicKind::Int32)), "Basic_int32");
        assert_eq!(mangle(&Type::slice(s.clone())), "Slice_Basic_string");
        assert_eq!(mangle(&Type::pointer(s.clone())), "Pointer_Basic_string");
        assert_eq!(mangle(&Type::array(s.clone(), 10)), "Array_10_Basic_string");
        assert_eq!(
            mangle(&Type::map(s.clone(), Type::Basic(BasicKind::Int32))),
            "Map_Basic_string_Basic_int32"
        );
        assert_eq!(mangle(&Type::named("path/to/pkg", "T")), "Named_17_path_2f_to_2f_pkg_1_T");
        assert_eq!(mangle(&Type::Error), "Named_error");
        assert_eq!(
            mangle(&Type::Struct(vec![Field::new("F1", s)])),
            "Struct_1_2_F1_0__Basic_string"
        );
        assert_eq!(unpack_name(&Type::Basic(BasicKind::Float64)), "unpackSEXP_Basic_float64");
        assert_eq!(pack_name(&Type::Error), "packSEXP_Named_error");
    }

    #[test]
    fn test_nesting_is_kept() {
        let i = Type::Basic(BasicKind::Int32);
        let a = Type::slice(Type::pointer(Type::slice(i.clone())));
        let b = Type::slice(Type::slice(Type::pointer(i.clone())));
        assert_eq!(mangle(&a), "Slice_Pointer_Slice_Basic_int32");
        assert_eq!(mangle(&b), "Slice_Slice_Pointer_Basic_int32");

        let m1 = Type::map(Type::string(), Type::map(Type::string(), i.clone()));
        let m2 = Type::map(Type::map(Type::string(), Type::string()), i);
        assert_ne!(mangle(&m1), mangle(&m2));
    }

    #[test]
    fn test_escaped_strings_stay_distinct() {
        let dotted = Type::named("example.com/p", "T");
        let underscored = Type::named("example_com/p", "T");
        let split = Type::named("example.com", "p.T");
        assert_ne!(mangle(&dotted), mangle(&underscored));
        assert_ne!(mangle(&dotted), mangle(&split));
        assert_ne!(mangle(&Type::named("", "error")), mangle(&Type::Error));
    }

    #[test]
    fn test_struct_mangle_includes_names_and_tags() {
        let i = Type::Basic(BasicKind::Int32);
        let plain = Type::Struct(vec![Field::new("A", i.clone()), Field::new("B", i.clone())]);
        let swapped = Type::Struct(vec![Field::new("B", i.clone()), Field::new("A", i.clone())]);
        let tagged = Type::Struct(vec![
            Field::tagged("A", i.clone(), r#"rgo:"a""#),
            Field::new("B", i),
        ]);
        assert_ne!(mangle(&plain), mangle(&swapped));
        assert_ne!(mangle(&plain), mangle(&tagged));
    }

    #[test]
    fn test_named_types_over_same_underlying_differ() {
        let a = Type::named("example.com/p", "Celsius");
        let b = Type::named("example.com/p", "Fahrenheit");
        assert_ne!(mangle(&a), mangle(&b));
    }

    fn basic_kind() -> impl Strategy<Value = BasicKind> {
        prop::sample::select(vec![
            BasicKind::Bool,
            BasicKind::Int,
            BasicKind::Int8,
            BasicKind::Int16,
            BasicKind::Int32,
            BasicKind::Uint,
            BasicKind::Uint8,
            BasicKind::Uint16,
            BasicKind::Uint32,
            BasicKind::Float32,
            BasicKind::Float64,
            BasicKind::Complex64,
            BasicKind::Complex128,
            BasicKind::String,
        ])
    }

    // Nested composites over basic, named and error leaves. Paths, names and
    // tags draw from a small alphabet with punctuation so escapes collide
    // often if they are lossy.
    fn any_type() -> impl Strategy<Value = Type> {
        let named = ("[a_./]{0,4}", "[A-Z_][a_1]{0,2}").prop_map(|(p, n)| Type::named(p, n));
        let leaf = prop_oneof![basic_kind().prop_map(Type::Basic), named, Just(Type::Error)];
        leaf.prop_recursive(4, 24, 3, |inner| {
            let field = ("[A-Z_][a_]{0,2}", "[a:\"_ ]{0,3}", inner.clone())
                .prop_map(|(n, tag, ty)| Field::tagged(n, ty, tag));
            prop_oneof![
                inner.clone().prop_map(Type::slice),
                inner.clone().prop_map(Type::pointer),
                (inner.clone(), 0u64..12).prop_map(|(e, n)| Type::array(e, n)),
                (inner.clone(), inner).prop_map(|(k, e)| Type::map(k, e)),
                prop::collection::vec(field, 0..3).prop_map(Type::Struct),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_mangle_is_identifier(ty in any_type()) {
            let m = mangle(&ty);
            prop_assert!(m.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
            prop_assert!(m.chars().next().is_some_and(|c| c.is_ascii_alphabetic()));
        }

        #[test]
        fn prop_mangle_injective(a in any_type(), b in any_type()) {
            prop_assert_eq!(a == b, mangle(&a) == mangle(&b));
        }

        #[test]
        fn prop_mangle_injective_on_near_misses(a in any_type()) {
            // Wrapping changes the name; equal trees share it.
            prop_assert_ne!(mangle(&a), mangle(&Type::slice(a.clone())));
            prop_assert_ne!(mangle(&Type::pointer(Type::slice(a.clone()))), mangle(&Type::slice(Type::pointer(a.clone()))));
            prop_assert_eq!(mangle(&a), mangle(&a.clone()));
        }
    }
}
