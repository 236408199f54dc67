// C shim generation: the .Call entry points R links against, and the helpers
// the Go side calls back into.

use crate::context::Analysis;
use crate::go_gen::GENERATED;
use crate::naming::{Splitter, snake};

const HELPERS: &str = r#"#include "_cgo_export.h"

void R_warning(char* s) {
	warning(s);
}

void R_error(char* s) {
	error(s);
}

// Needed for unpacking SEXP character.
GoString R_gostring(SEXP x, R_xlen_t i) {
	SEXP _s = STRING_ELT(x, i);
	GoString s = {(char*)CHAR(_s), LENGTH(_s)};
	return s;
}

// Needed for getting list elements by name.
int getListElementIndex(SEXP list, const char *str) {
	int index = -1;
	SEXP names = getAttrib(list, R_NamesSymbol);
	if (!isString(names)) {
		return index;
	}
	for (int i = 0; i < length(list); i++) {
		if (strcmp(CHAR(STRING_ELT(names, i)), str) == 0) {
			index = i;
			break;
		}
	}
	return index;
}
"#;

/// Render `src/rgo/<pkg>.c`.
pub fn generate_c(analysis: &Analysis, splitter: &Splitter) -> String {
    let mut out = String::with_capacity(2048);
    out.push_str(&format!("// {GENERATED}\n\n"));
    out.push_str(HELPERS);
    for f in &analysis.funcs {
        // Go names may be C keywords.
        let args: Vec<String> = f.arg_names().iter().map(|a| format!("r_{a}")).collect();
        let params: Vec<String> = args.iter().map(|a| format!("SEXP {a}")).collect();
        out.push_str(&format!(
            "\nSEXP {}({}) {{\n\treturn Wrapped_{}({});\n}}\n",
            snake(splitter, &f.name),
            params.join(", "),
            f.name,
            args.join(", ")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::analyse;
    use crate::naming::DEFAULT_WORDS;
    use crate::types::{BasicKind, Function, Package, Param, Type};

    #[test]
    fn test_shims_call_exports() {
        let param = |name: &str| Param { name: name.into(), ty: Type::Basic(BasicKind::Float64) };
        let pkg = Package {
            path: "example.com/stats".into(),
            name: "stats".into(),
            funcs: vec![
                Function {
                    name: "NaNMean".into(),
                    params: vec![param("x"), param("w")],
                    results: vec![param("")],
                    variadic: false,
                    recv: None,
                },
                Function { name: "Reset".into(), params: vec![], results: vec![], variadic: false, recv: None },
            ],
            ..Default::default()
        };
        let a = analyse(pkg, None).unwrap();
        let src = generate_c(&a, &Splitter::new(DEFAULT_WORDS.iter().copied()));
        assert!(src.starts_with("// Code generated by rgnonomic/rgo; DO NOT EDIT.\n\n#include \"_cgo_export.h\"\n"));
        assert!(src.contains("int getListElementIndex(SEXP list, const char *str) {"));
        assert!(src.contains("\nSEXP nan_mean(SEXP r_x, SEXP r_w) {\n\treturn Wrapped_NaNMean(r_x, r_w);\n}\n"));
        assert!(src.ends_with("\nSEXP reset() {\n\treturn Wrapped_Reset();\n}\n"));
    }

    #[test]
    fn test_keyword_parameter_names_are_prefixed() {
        let param = |name: &str| Param { name: name.into(), ty: Type::Basic(BasicKind::Int) };
        let pkg = Package {
            path: "example.com/conv".into(),
            name: "conv".into(),
            funcs: vec![Function {
                name: "Widen".into(),
                params: vec![param("int"), param("char"), param("_")],
                results: vec![],
                variadic: false,
                recv: None,
            }],
            ..Default::default()
        };
        let a = analyse(pkg, None).unwrap();
        let src = generate_c(&a, &Splitter::new(DEFAULT_WORDS.iter().copied()));
        assert!(src.contains(
            "\nSEXP widen(SEXP r_int, SEXP r_char, SEXP r_p2) {\n\treturn Wrapped_Widen(r_int, r_char, r_p2);\n}\n"
        ));
    }
}
