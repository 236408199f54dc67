// Exported wrappers: one cgo export per wrapped function, plus a result
// packer for functions returning more than one value.

use super::GoFile;
use crate::types::{Function, quote};

/// Render `Wrapped_<F>` and, for multi-result functions, `packSEXP_<F>`.
pub fn generate_wrapper(file: &GoFile<'_>, f: &Function) -> String {
    let mut out = String::with_capacity(1024);
    let name = &f.name;
    let args = f.arg_names();

    let params: Vec<String> = args.iter().map(|a| format!("_R_{a}")).collect();
    let sig = if params.is_empty() { String::new() } else { format!("{} C.SEXP", params.join(", ")) };
    out.push_str(&format!(
        "//export Wrapped_{name}\n\
         func Wrapped_{name}({sig}) C.SEXP {{\n\
         \tdefer func() {{\n\
         \t\tr := recover()\n\
         \t\tif r != nil {{\n\
         \t\t\terr := C.CString(fmt.Sprint(r))\n\
         \t\t\tC.R_error(err)\n\
         \t\t\tC.free(unsafe.Pointer(err))\n\
         \t\t}}\n\
         \t}}()\n\n"
    ));

    for (i, (p, arg)) in f.params.iter().zip(&args).enumerate() {
        out.push_str(&format!("\t_p{i} := {}(_R_{arg})\n", file.unpack(&p.ty)));
    }

    let call_args = numbered("_p", f.params.len());
    let spread = if f.variadic && !f.params.is_empty() { "..." } else { "" };
    let call = format!("{}.{name}({call_args}{spread})", file.analysis.name);
    let results = numbered("_r", f.results.len());
    match f.results.len() {
        0 => out.push_str(&format!("\t{call}\n\treturn C.R_NilValue\n}}\n")),
        1 => out.push_str(&format!(
            "\t{results} := {call}\n\treturn {}({results})\n}}\n",
            file.pack(&f.results[0].ty)
        )),
        _ => {
            out.push_str(&format!("\t{results} := {call}\n\treturn packSEXP_{name}({results})\n}}\n"));
            out.push('\n');
            out.push_str(&generate_result_packer(file, f));
        }
    }
    out
}

/// `prefix0, prefix1, ...`
fn numbered(prefix: &str, n: usize) -> String {
    (0..n).map(|i| format!("{prefix}{i}")).collect::<Vec<_>>().join(", ")
}

/// Results are returned to R as a named list. Unnamed results are named by
/// position.
fn generate_result_packer(file: &GoFile<'_>, f: &Function) -> String {
    let n = f.results.len();
    let params: Vec<String> =
        f.results.iter().enumerate().map(|(i, r)| format!("p{i} {}", file.ty(&r.ty))).collect();
    let mut out = format!(
        "func packSEXP_{}({}) C.SEXP {{\n\
         \tr := C.Rf_allocVector(C.VECSXP, {n})\n\
         \tC.Rf_protect(r)\n\
         \tnames := C.Rf_allocVector(C.STRSXP, {n})\n\
         \tC.Rf_protect(names)\n",
        f.name,
        params.join(", ")
    );
    for (i, r) in f.results.iter().enumerate() {
        let label = match r.name.as_str() {
            "" | "_" => format!("r{i}"),
            name => name.to_string(),
        };
        out.push_str(&format!(
            "\tC.SET_STRING_ELT(names, {i}, C.Rf_mkCharLenCE(C._GoStringPtr({}), {}, C.CE_UTF8))\n\
             \tC.SET_VECTOR_ELT(r, {i}, {}(p{i}))\n",
            quote(&label),
            label.len(),
            file.pack(&r.ty)
        ));
    }
    out.push_str(
        "\tC.setAttrib(r, C.R_NamesSymbol, names)\n\
         \tC.Rf_unprotect(2)\n\
         \treturn r\n\
         }\n",
    );
    out
}
