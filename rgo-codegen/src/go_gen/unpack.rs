// Decoders: Go procedures converting an R value into a Go value.

use super::{GoFile, data_view, kind_name};
use crate::mangle::unpack_name;
use crate::strategy::{FieldPlan, Storage, Strategy};
use crate::types::{BasicKind, Type, quote};

/// Render `unpackSEXP_<mangle>` for a registered type.
pub fn generate_unpacker(file: &GoFile<'_>, ty: &Type, strategy: &Strategy) -> String {
    let go = file.ty(ty);
    let mut out = String::with_capacity(512);
    out.push_str(&format!("func {}(p C.SEXP) {go} {{\n", unpack_name(ty)));
    match strategy {
        Strategy::Scalar { kind, storage } => unpack_scalar(&mut out, &go, *kind, *storage),
        Strategy::Narrow { via, .. } => {
            out.push_str(&format!("\treturn {go}({}(p))\n", file.unpack(via)));
        }
        Strategy::SliceAlias { kind, storage } => {
            out.push_str(NIL_CHECK);
            out.push_str(&format!(
                "\tn := C.Rf_xlength(p)\n\treturn {}\n",
                data_view(*storage, kind_name(*kind), "p", "n")
            ));
        }
        Strategy::SliceConvert { elem, storage, .. } => {
            let conv = convert(&file.ty(elem), *storage, "v");
            out.push_str(NIL_CHECK);
            out.push_str(&format!(
                "\tn := C.Rf_xlength(p)\n\
                 \tr := make({go}, n)\n\
                 \tfor i, v := range {} {{\n\
                 \t\tr[i] = {conv}\n\
                 \t}}\n\
                 \treturn r\n",
                data_view(*storage, storage.go_elem(), "p", "n")
            ));
        }
        Strategy::SliceString { elem } => {
            out.push_str(NIL_CHECK);
            out.push_str(&format!(
                "\tn := C.Rf_xlength(p)\n\
                 \tr := make({go}, n)\n\
                 \tfor i := range r {{\n\
                 \t\tr[i] = {}(C.R_gostring(p, C.R_xlen_t(i)))\n\
                 \t}}\n\
                 \treturn r\n",
                file.ty(elem)
            ));
        }
        Strategy::SliceDelegate { elem } => {
            out.push_str(NIL_CHECK);
            out.push_str(&format!(
                "\tn := C.Rf_xlength(p)\n\
                 \tr := make({go}, n)\n\
                 \tfor i := range r {{\n\
                 \t\tr[i] = {}(C.VECTOR_ELT(p, C.R_xlen_t(i)))\n\
                 \t}}\n\
                 \treturn r\n",
                file.unpack(elem)
            ));
        }
        Strategy::Array { slice, .. } => {
            out.push_str(&format!(
                "\tvar a {go}\n\tcopy(a[:], {}(p))\n\treturn a\n",
                file.unpack(slice)
            ));
        }
        Strategy::MapFast { elem, storage, .. } => {
            let conv = convert(&file.ty(elem), *storage, "v");
            out.push_str(&map_prologue(&go));
            out.push_str(&format!(
                "\tfor i, v := range {} {{\n\
                 \t\tr[{}] = {conv}\n\
                 \t}}\n\
                 \treturn r\n",
                data_view(*storage, storage.go_elem(), "p", "n"),
                map_key(ty, file)
            ));
        }
        Strategy::MapString { elem } => {
            out.push_str(&map_prologue(&go));
            out.push_str(&format!(
                "\tfor i := 0; i < n; i++ {{\n\
                 \t\tr[{}] = {}(C.R_gostring(p, C.R_xlen_t(i)))\n\
                 \t}}\n\
                 \treturn r\n",
                map_key(ty, file),
                file.ty(elem)
            ));
        }
        Strategy::MapDelegate { elem } => {
            out.push_str(&map_prologue(&go));
            out.push_str(&format!(
                "\tfor i := 0; i < n; i++ {{\n\
                 \t\tr[{}] = {}(C.VECTOR_ELT(p, C.R_xlen_t(i)))\n\
                 \t}}\n\
                 \treturn r\n",
                map_key(ty, file),
                file.unpack(elem)
            ));
        }
        Strategy::Struct { fields, .. } => unpack_struct(&mut out, file, &go, ty, fields),
        Strategy::Pointer { elem } => {
            out.push_str(NIL_CHECK);
            out.push_str(&format!("\tr := {}(p)\n\treturn &r\n", file.unpack(elem)));
        }
        Strategy::Named { underlying, convert } => {
            let call = format!("{}(p)", file.unpack(underlying));
            if *convert {
                out.push_str(&format!("\treturn {go}({call})\n"));
            } else {
                out.push_str(&format!("\treturn {call}\n"));
            }
        }
        // Never selected for decoding.
        Strategy::Error => out.push_str("\tpanic(\"unhandled error parameter type\")\n"),
    }
    out.push_str("}\n");
    out
}

const NIL_CHECK: &str = "\tif C.Rf_isNull(p) != 0 {\n\t\treturn nil\n\t}\n";

fn unpack_scalar(out: &mut String, go: &str, kind: BasicKind, storage: Storage) {
    out.push_str(&format!(
        "\tif C.Rf_xlength(p) < 1 {{\n\t\tpanic(\"empty vector for scalar {go}\")\n\t}}\n"
    ));
    let expr = match (kind, storage) {
        (_, Storage::Logical) => "*C.LOGICAL(p) == 1".to_string(),
        (BasicKind::String, _) => "C.R_gostring(p, 0)".to_string(),
        (BasicKind::Complex128, _) => {
            format!("{go}(*(*complex128)(unsafe.Pointer(C.COMPLEX(p))))")
        }
        (_, storage) => format!("{go}(*C.{}(p))", storage.accessor()),
    };
    out.push_str(&format!("\treturn {expr}\n"));
}

/// Conversion of storage element `v` to the Go element type.
fn convert(elem: &str, storage: Storage, v: &str) -> String {
    match storage {
        Storage::Logical => format!("{elem}({v} == 1)"),
        _ => format!("{elem}({v})"),
    }
}

/// Length, result map and names attribute. A zero-length vector without
/// names is an empty map.
fn map_prologue(go: &str) -> String {
    format!(
        "{NIL_CHECK}\
         \tn := int(C.Rf_xlength(p))\n\
         \tr := make({go}, n)\n\
         \tnames := C.getAttrib(p, C.R_NamesSymbol)\n\
         \tif names == C.R_NilValue {{\n\
         \t\tif n == 0 {{\n\
         \t\t\treturn r\n\
         \t\t}}\n\
         \t\tpanic(\"no names attribute for map keys\")\n\
         \t}}\n"
    )
}

/// Key expression for element i; keys may be a named string type.
fn map_key(ty: &Type, file: &GoFile<'_>) -> String {
    let key = match ty {
        Type::Map { key, .. } => file.ty(key),
        _ => "string".to_string(),
    };
    format!("{key}(C.R_gostring(names, C.R_xlen_t(i)))")
}

fn unpack_struct(out: &mut String, file: &GoFile<'_>, go: &str, ty: &Type, fields: &[FieldPlan]) {
    let n = fields.len();
    let missing = format!("missing list element for {ty}: no list element for field: ");
    let extra = quote(&format!("extra list element ignored for {ty}"));
    out.push_str("\tn := C.Rf_xlength(p)\n");
    if n > 0 {
        // A short list names the first absent field in declaration order.
        out.push_str(&format!("\tif n < {n} {{\n\t\tfields := [...]struct{{ key, name string }}{{\n"));
        for f in fields {
            out.push_str(&format!("\t\t\t{{{}, {}}},\n", quote(&f.external), quote(&f.name)));
        }
        out.push_str(&format!(
            "\t\t}}\n\
             \t\tmissing := fields[n].name\n\
             \t\tfor _, f := range fields {{\n\
             \t\t\tkey := C.CString(f.key)\n\
             \t\t\ti := C.getListElementIndex(p, key)\n\
             \t\t\tC.free(unsafe.Pointer(key))\n\
             \t\t\tif i < 0 {{\n\
             \t\t\t\tmissing = f.name\n\
             \t\t\t\tbreak\n\
             \t\t\t}}\n\
             \t\t}}\n\
             \t\tpanic({} + missing)\n\
             \t}}\n",
            quote(&missing)
        ));
    }
    out.push_str(&format!(
        "\tif n > {n} {{\n\
         \t\twarn := C.CString({extra})\n\
         \t\tC.R_warning(warn)\n\
         \t\tC.free(unsafe.Pointer(warn))\n\
         \t}}\n\
         \tvar r {go}\n"
    ));
    if n > 0 {
        out.push_str("\tvar i C.int\n");
    }
    for (k, f) in fields.iter().enumerate() {
        out.push_str(&format!(
            "\tkey{k} := C.CString({})\n\
             \tdefer C.free(unsafe.Pointer(key{k}))\n\
             \ti = C.getListElementIndex(p, key{k})\n\
             \tif i < 0 {{\n\
             \t\tpanic({})\n\
             \t}}\n\
             \tr.{} = {}(C.VECTOR_ELT(p, C.R_xlen_t(i)))\n",
            quote(&f.external),
            quote(&format!("{missing}{}", f.name)),
            f.name,
            file.unpack(&f.ty)
        ));
    }
    out.push_str("\treturn r\n");
}
