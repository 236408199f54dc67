// Go source generation: the cgo file exporting one wrapper per function and
// the marshallers the wrappers call.

pub mod pack;
pub mod unpack;
pub mod wrapper;

use std::collections::BTreeSet;

use crate::context::Analysis;
use crate::error::GenerateResult;
use crate::mangle::{pack_name, unpack_name};
use crate::strategy::{Storage, Strategy, strategy_for};
use crate::types::{BasicKind, Type, package_ident};

/// First line of every generated file.
pub const GENERATED: &str = "Code generated by rgnonomic/rgo; DO NOT EDIT.";

/// Shared state for rendering one Go file.
pub struct GoFile<'a> {
    pub analysis: &'a Analysis,
}

impl<'a> GoFile<'a> {
    pub fn new(analysis: &'a Analysis) -> Self {
        GoFile { analysis }
    }

    /// Go spelling of `ty` inside the generated file.
    pub fn ty(&self, ty: &Type) -> String {
        ty.go_name_in(&self.analysis.path, &self.analysis.name)
    }

    /// Name of the decoder for `ty`, which must be in the decode registry.
    pub fn unpack(&self, ty: &Type) -> String {
        unpack_name(&ty.normalize())
    }

    /// Name of the encoder for `ty`, which must be in the encode registry.
    pub fn pack(&self, ty: &Type) -> String {
        pack_name(&ty.normalize())
    }

    /// Packages other than the wrapped one whose named types appear in
    /// marshaller signatures.
    fn imports(&self) -> BTreeSet<String> {
        let mut paths = BTreeSet::new();
        let regs = [&self.analysis.unpackers, &self.analysis.packers];
        for ty in regs.into_iter().flat_map(|r| r.types()) {
            collect_paths(ty, &mut paths);
        }
        paths.remove(&self.analysis.path);
        paths
    }

    /// Whether any map encoder is rendered; those sort their keys.
    fn needs_sort(&self) -> GenerateResult<bool> {
        for ty in self.analysis.packers.types() {
            let strategy = strategy_for(ty, self.analysis.packers.direction(), &self.analysis.types)?;
            if matches!(
                strategy,
                Strategy::MapFast { .. } | Strategy::MapString { .. } | Strategy::MapDelegate { .. }
            ) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn collect_paths(ty: &Type, out: &mut BTreeSet<String>) {
    match ty {
        Type::Named(n) => {
            if !n.path.is_empty() {
                out.insert(n.path.clone());
            }
        }
        Type::Pointer(e) | Type::Slice(e) | Type::Array { elem: e, .. } => collect_paths(e, out),
        Type::Map { key, elem } => {
            collect_paths(key, out);
            collect_paths(elem, out);
        }
        Type::Struct(fields) => {
            for f in fields {
                collect_paths(&f.ty, out);
            }
        }
        _ => {}
    }
}

/// Render `src/rgo/<pkg>.go`.
pub fn generate_go(analysis: &Analysis) -> GenerateResult<String> {
    let file = GoFile::new(analysis);
    let mut out = String::with_capacity(16 * 1024);

    out.push_str(&format!("// {GENERATED}\n\npackage main\n\n"));
    out.push_str(
        "/*\n\
         #define USE_RINTERNALS\n\
         #include <stdlib.h>\n\
         #include <R.h>\n\
         #include <Rinternals.h>\n\
         extern void R_error(char *s);\n\
         extern void R_warning(char *s);\n\
         extern Rboolean Rf_isNull(SEXP s);\n\
         extern _GoString_ R_gostring(SEXP x, R_xlen_t i);\n\
         extern int getListElementIndex(SEXP list, const char *str);\n\
         */\n\
         import \"C\"\n\n",
    );

    out.push_str("import (\n\t\"fmt\"\n");
    if file.needs_sort()? {
        out.push_str("\t\"sort\"\n");
    }
    out.push_str("\t\"unsafe\"\n\n");
    for path in file.imports() {
        out.push_str(&import_line(&path, &package_ident(&path)));
    }
    out.push_str(&import_line(&analysis.path, &analysis.name));
    out.push_str(")\n");

    for f in &analysis.funcs {
        out.push('\n');
        out.push_str(&wrapper::generate_wrapper(&file, f));
    }
    out.push('\n');

    for ty in analysis.unpackers.types() {
        let strategy = strategy_for(ty, analysis.unpackers.direction(), &analysis.types)?;
        out.push_str(&unpack::generate_unpacker(&file, ty, &strategy));
        out.push('\n');
    }
    for ty in analysis.packers.types() {
        let strategy = strategy_for(ty, analysis.packers.direction(), &analysis.types)?;
        out.push_str(&pack::generate_packer(&file, ty, &strategy));
        out.push('\n');
    }

    out.push_str("func main() {}\n");
    Ok(out)
}

/// Import of the package at `path`, aliased when `name` is not the last
/// element of the path.
fn import_line(path: &str, name: &str) -> String {
    let last = path.rsplit('/').next().unwrap_or(path);
    if last == name {
        format!("\t\"{path}\"\n")
    } else {
        format!("\t{name} \"{path}\"\n")
    }
}

// ---------------------------------------------------------------------------
// Snippets shared by decoders and encoders
// ---------------------------------------------------------------------------

/// R type constant for a storage kind.
fn sexp_const(storage: Storage) -> &'static str {
    match storage {
        Storage::Logical => "C.LGLSXP",
        Storage::Integer => "C.INTSXP",
        Storage::Raw => "C.RAWSXP",
        Storage::Real => "C.REALSXP",
        Storage::Complex => "C.CPLXSXP",
        Storage::Character => "C.STRSXP",
        Storage::List => "C.VECSXP",
    }
}

/// A Go slice over the data of R vector `x` with `n` elements.
fn data_view(storage: Storage, elem: &str, x: &str, n: &str) -> String {
    format!("unsafe.Slice((*{elem})(unsafe.Pointer(C.{}({x}))), {n})", storage.accessor())
}

/// A CHARSXP holding Go string `s`.
fn mk_char(s: &str) -> String {
    format!("C.Rf_mkCharLenCE(C._GoStringPtr({s}), C.int(len({s})), C.CE_UTF8)")
}

/// Go spelling of a basic kind.
fn kind_name(kind: BasicKind) -> &'static str {
    kind.normalize().name()
}
