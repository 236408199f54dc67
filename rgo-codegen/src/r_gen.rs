// R package files: NAMESPACE, the .Call wrappers, Makevars and DESCRIPTION.

use crate::context::Analysis;
use crate::go_gen::GENERATED;
use crate::naming::{Splitter, snake};

/// Render `NAMESPACE`: load the shared library and export one R function
/// per wrapped Go function.
pub fn generate_namespace(analysis: &Analysis, splitter: &Splitter) -> String {
    let mut out = format!("# {GENERATED}\n\nuseDynLib({})\n", analysis.name);
    for f in &analysis.funcs {
        out.push_str(&format!("export({})\n", snake(splitter, &f.name)));
    }
    out
}

/// Render `R/<pkg>.R`.
pub fn generate_r_calls(analysis: &Analysis, splitter: &Splitter) -> String {
    let mut out = format!("# {GENERATED}\n");
    for f in &analysis.funcs {
        let r_name = snake(splitter, &f.name);
        let args = f.arg_names();

        out.push_str(&format!("\n#' {r_name} wraps {}.{}\n", analysis.name, f.name));
        for (p, arg) in f.params.iter().zip(&args) {
            out.push_str(&format!("#' @param {arg} is a {}\n", p.ty.go_name_in(&analysis.path, &analysis.name)));
        }
        match f.results.len() {
            0 => {}
            1 => out.push_str(&format!(
                "#' @return {}\n",
                f.results[0].ty.go_name_in(&analysis.path, &analysis.name)
            )),
            _ => out.push_str("#' @return a list\n"),
        }
        out.push_str("#' @export\n");

        let call_args: String = args.iter().map(|a| format!(", {a}")).collect();
        out.push_str(&format!(
            "{r_name} <- function({}) {{\n\t.Call(\"{r_name}\"{call_args}, PACKAGE = \"{}\")\n}}\n",
            args.join(", "),
            analysis.name
        ));
    }
    out
}

/// Render `src/Makevars`: build the Go sources as the package's shared
/// library.
pub fn generate_makevars() -> String {
    format!(
        "# {GENERATED}\n\n\
         .PHONY: go\n\n\
         CGO_CFLAGS = \"$(ALL_CPPFLAGS)\"\n\
         CGO_LDFLAGS = \"$(PKG_LIBS) $(SHLIB_LIBADD) $(LIBR)\"\n\n\
         $(SHLIB): go\n\n\
         go:\n\
         \tcd rgo && CGO_CFLAGS=$(CGO_CFLAGS) CGO_LDFLAGS=$(CGO_LDFLAGS) go build -o ../$(SHLIB) -buildmode=c-shared .\n"
    )
}

/// Render `DESCRIPTION` with placeholder metadata for the package author
/// to fill in.
pub fn generate_description(analysis: &Analysis, version: &str) -> String {
    let version = version.strip_prefix('v').unwrap_or(version);
    format!(
        "Package: {}\n\
         Title: What the Package Does (One Line, Title Case)\n\
         Version: {version}\n\
         Authors@R:\n    \
         person(given   = \"First\",\n           \
         family  = \"Last\",\n           \
         role    = c(\"aut\", \"cre\"),\n           \
         email   = \"first.last@example.com\",\n           \
         comment = c(ORCID = \"YOUR-ORCID-ID\"))\n\
         Description: What the package does (one paragraph).\n\
         License: See LICENSE directory\n\
         Encoding: UTF-8\n\
         LazyData: true\n",
        analysis.name
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::analyse;
    use crate::naming::DEFAULT_WORDS;
    use crate::types::{BasicKind, Function, Package, Param, Type};

    fn stats() -> Analysis {
        let f64s = Param { name: "x".into(), ty: Type::slice(Type::Basic(BasicKind::Float64)) };
        let result = |name: &str| Param { name: name.into(), ty: Type::Basic(BasicKind::Float64) };
        let pkg = Package {
            path: "example.com/stats".into(),
            name: "stats".into(),
            funcs: vec![
                Function {
                    name: "MeanNaN".into(),
                    params: vec![f64s.clone()],
                    results: vec![result("")],
                    variadic: false,
                    recv: None,
                },
                Function {
                    name: "MinMax".into(),
                    params: vec![f64s],
                    results: vec![result("min"), result("max")],
                    variadic: false,
                    recv: None,
                },
            ],
            ..Default::default()
        };
        analyse(pkg, None).unwrap()
    }

    fn splitter() -> Splitter {
        Splitter::new(DEFAULT_WORDS.iter().copied())
    }

    #[test]
    fn test_namespace() {
        assert_eq!(
            generate_namespace(&stats(), &splitter()),
            "# Code generated by rgnonomic/rgo; DO NOT EDIT.\n\n\
             useDynLib(stats)\n\
             export(mean_nan)\n\
             export(min_max)\n"
        );
    }

    #[test]
    fn test_r_calls() {
        let src = generate_r_calls(&stats(), &splitter());
        assert!(src.contains(
            "mean_nan <- function(x) {\n\t.Call(\"mean_nan\", x, PACKAGE = \"stats\")\n}\n"
        ));
        assert!(src.contains("#' @param x is a []float64\n"));
        assert!(src.contains("#' @return a list\n"));
    }

    #[test]
    fn test_description_version() {
        let a = stats();
        let d = generate_description(&a, "v1.2.3");
        assert!(d.starts_with("Package: stats\n"));
        assert!(d.contains("\nVersion: 1.2.3\n"));
        assert!(d.contains("    person(given   = \"First\",\n           family  = \"Last\",\n"));
        assert!(generate_description(&a, "0.0.0").contains("\nVersion: 0.0.0\n"));
    }

    #[test]
    fn test_makevars_builds_shared_library() {
        let m = generate_makevars();
        assert!(m.contains("-buildmode=c-shared"));
        assert!(m.contains("\n\tcd rgo && "));
    }
}
