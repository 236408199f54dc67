// Encoders: Go procedures converting a Go value into an R value.

use super::{GoFile, data_view, kind_name, mk_char, sexp_const};
use crate::mangle::pack_name;
use crate::strategy::{FieldPlan, Storage, Strategy};
use crate::types::{BasicKind, Type, quote};

/// Render `packSEXP_<mangle>` for a registered type.
pub fn generate_packer(file: &GoFile<'_>, ty: &Type, strategy: &Strategy) -> String {
    let go = file.ty(ty);
    let mut out = String::with_capacity(512);
    out.push_str(&format!("func {}(p {go}) C.SEXP {{\n", pack_name(ty)));
    match strategy {
        Strategy::Scalar { kind, storage } => pack_scalar(&mut out, *kind, *storage),
        // Never selected for encoding.
        Strategy::Narrow { kind, .. } => {
            out.push_str(&format!("\tpanic(\"no encoder for {}\")\n", kind_name(*kind)));
        }
        Strategy::SliceAlias { kind, storage } => {
            out.push_str(&vector_prologue(*storage, "C.R_xlen_t(len(p))"));
            out.push_str(&format!(
                "\tcopy({}, p)\n",
                data_view(*storage, kind_name(*kind), "r", "len(p)")
            ));
            out.push_str(VECTOR_EPILOGUE);
        }
        Strategy::SliceConvert { storage, .. } => {
            out.push_str(&vector_prologue(*storage, "C.R_xlen_t(len(p))"));
            out.push_str(&format!(
                "\ts := {}\n\tfor i, v := range p {{\n{}\t}}\n",
                data_view(*storage, storage.go_elem(), "r", "len(p)"),
                store(*storage, "s[i]", "v")
            ));
            out.push_str(VECTOR_EPILOGUE);
        }
        Strategy::SliceString { .. } => {
            out.push_str(&vector_prologue(Storage::Character, "C.R_xlen_t(len(p))"));
            out.push_str(&format!(
                "\tfor i, v := range p {{\n\
                 \t\tC.SET_STRING_ELT(r, C.R_xlen_t(i), {})\n\
                 \t}}\n",
                mk_char("string(v)")
            ));
            out.push_str(VECTOR_EPILOGUE);
        }
        Strategy::SliceDelegate { elem } => {
            out.push_str(&vector_prologue(Storage::List, "C.R_xlen_t(len(p))"));
            out.push_str(&format!(
                "\tfor i, v := range p {{\n\
                 \t\tC.SET_VECTOR_ELT(r, C.R_xlen_t(i), {}(v))\n\
                 \t}}\n",
                file.pack(elem)
            ));
            out.push_str(VECTOR_EPILOGUE);
        }
        Strategy::Array { slice, .. } => {
            out.push_str(&format!("\treturn {}(p[:])\n", file.pack(slice)));
        }
        Strategy::MapFast { storage, .. } => {
            out.push_str(&map_prologue(*storage));
            out.push_str(&format!("\ts := {}\n", data_view(*storage, storage.go_elem(), "r", "n")));
            out.push_str(&map_loop(&file.ty(map_key(ty)), &store(*storage, "s[i]", "v")));
            out.push_str(MAP_EPILOGUE);
        }
        Strategy::MapString { .. } => {
            out.push_str(&map_prologue(Storage::Character));
            let set = format!("\t\tC.SET_STRING_ELT(r, C.R_xlen_t(i), {})\n", mk_char("string(v)"));
            out.push_str(&map_loop(&file.ty(map_key(ty)), &set));
            out.push_str(MAP_EPILOGUE);
        }
        Strategy::MapDelegate { elem } => {
            out.push_str(&map_prologue(Storage::List));
            let set = format!("\t\tC.SET_VECTOR_ELT(r, C.R_xlen_t(i), {}(v))\n", file.pack(elem));
            out.push_str(&map_loop(&file.ty(map_key(ty)), &set));
            out.push_str(MAP_EPILOGUE);
        }
        Strategy::Struct { fields, .. } => pack_struct(&mut out, file, fields),
        Strategy::Pointer { elem } => {
            out.push_str(NIL_CHECK);
            out.push_str(&format!("\treturn {}(*p)\n", file.pack(elem)));
        }
        Strategy::Named { underlying, convert } => {
            if *convert {
                out.push_str(&format!(
                    "\treturn {}({}(p))\n",
                    file.pack(underlying),
                    file.ty(underlying)
                ));
            } else {
                out.push_str(&format!("\treturn {}(p)\n", file.pack(underlying)));
            }
        }
        Strategy::Error => {
            out.push_str(NIL_CHECK);
            out.push_str(&format!("\ts := p.Error()\n\treturn C.ScalarString({})\n", mk_char("s")));
        }
    }
    out.push_str("}\n");
    out
}

const NIL_CHECK: &str = "\tif p == nil {\n\t\treturn C.R_NilValue\n\t}\n";

const VECTOR_EPILOGUE: &str = "\tC.Rf_unprotect(1)\n\treturn r\n";

const MAP_EPILOGUE: &str = "\tif n != 0 {\n\
                            \t\tC.setAttrib(r, C.R_NamesSymbol, names)\n\
                            \t}\n\
                            \tC.Rf_unprotect(2)\n\
                            \treturn r\n";

/// Nil check, then a protected vector of length `n`.
fn vector_prologue(storage: Storage, n: &str) -> String {
    format!(
        "{NIL_CHECK}\
         \tr := C.Rf_allocVector({}, {n})\n\
         \tC.Rf_protect(r)\n",
        sexp_const(storage)
    )
}

fn pack_scalar(out: &mut String, kind: BasicKind, storage: Storage) {
    let body = match (kind, storage) {
        (_, Storage::Logical) => {
            "\tb := C.int(0)\n\tif p {\n\t\tb = 1\n\t}\n\treturn C.ScalarLogical(b)\n".to_string()
        }
        (BasicKind::String, _) => format!("\treturn C.ScalarString({})\n", mk_char("p")),
        (_, Storage::Raw) => "\treturn C.ScalarRaw(C.Rbyte(p))\n".to_string(),
        (_, Storage::Real) => "\treturn C.ScalarReal(C.double(p))\n".to_string(),
        (_, Storage::Complex) => "\treturn C.ScalarComplex(C.struct_Rcomplex{r: C.double(real(p)), i: C.double(imag(p))})\n"
            .to_string(),
        _ => "\treturn C.ScalarInteger(C.int(p))\n".to_string(),
    };
    out.push_str(&body);
}

/// Store Go element `v` into storage element `dst`.
fn store(storage: Storage, dst: &str, v: &str) -> String {
    match storage {
        Storage::Logical => format!("\t\t{dst} = 0\n\t\tif {v} {{\n\t\t\t{dst} = 1\n\t\t}}\n"),
        _ => format!("\t\t{dst} = {}({v})\n", storage.go_elem()),
    }
}

fn map_key(ty: &Type) -> &Type {
    match ty {
        Type::Map { key, .. } => key,
        other => other,
    }
}

/// Keys are sorted so encoding is deterministic.
fn map_prologue(storage: Storage) -> String {
    format!(
        "{NIL_CHECK}\
         \tkeys := make([]string, 0, len(p))\n\
         \tfor k := range p {{\n\
         \t\tkeys = append(keys, string(k))\n\
         \t}}\n\
         \tsort.Strings(keys)\n\
         \tn := C.R_xlen_t(len(keys))\n\
         \tr := C.Rf_allocVector({}, n)\n\
         \tC.Rf_protect(r)\n\
         \tnames := C.Rf_allocVector(C.STRSXP, n)\n\
         \tC.Rf_protect(names)\n",
        sexp_const(storage)
    )
}

/// Loop over sorted keys, setting the name and then running `set` with
/// `i` and `v` bound.
fn map_loop(key: &str, set: &str) -> String {
    format!(
        "\tfor i, k := range keys {{\n\
         \t\tC.SET_STRING_ELT(names, C.R_xlen_t(i), {})\n\
         \t\tv := p[{key}(k)]\n\
         {set}\
         \t}}\n",
        mk_char("k")
    )
}

fn pack_struct(out: &mut String, file: &GoFile<'_>, fields: &[FieldPlan]) {
    let n = fields.len();
    out.push_str(&format!(
        "\tr := C.Rf_allocVector(C.VECSXP, {n})\n\
         \tC.Rf_protect(r)\n\
         \tnames := C.Rf_allocVector(C.STRSXP, {n})\n\
         \tC.Rf_protect(names)\n"
    ));
    for (i, f) in fields.iter().enumerate() {
        out.push_str(&format!(
            "\tC.SET_STRING_ELT(names, {i}, C.Rf_mkCharLenCE(C._GoStringPtr({}), {}, C.CE_UTF8))\n\
             \tC.SET_VECTOR_ELT(r, {i}, {}(p.{}))\n",
            quote(&f.external),
            f.external.len(),
            file.pack(&f.ty),
            f.name
        ));
    }
    out.push_str(
        "\tC.setAttrib(r, C.R_NamesSymbol, names)\n\
         \tC.Rf_unprotect(2)\n\
         \treturn r\n",
    );
}
