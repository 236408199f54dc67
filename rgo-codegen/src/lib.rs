// rgo-codegen: reads Go package type information, generates the Go, C and R
// sources of an R package calling into the Go package.

pub mod c_gen;
pub mod classify;
pub mod config;
pub mod context;
pub mod dest;
pub mod error;
pub mod filter;
pub mod go_gen;
pub mod mangle;
pub mod marshal;
pub mod naming;
pub mod r_gen;
pub mod schema;
pub mod strategy;
pub mod types;
pub mod value;
pub mod walk;

use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::config::{CodegenConfig, RgoConfig};
use crate::dest::{Destination, OsFs, Txtar};
use crate::error::{GenerateError, GenerateResult};
use crate::naming::Splitter;

pub use crate::context::{Analysis, analyse};

/// Render every file of the R package for `analysis` into `dst`, then flush.
///
/// All sources are rendered before the first file is opened, so a render
/// failure leaves the destination untouched.
pub fn generate(
    analysis: &Analysis,
    config: &CodegenConfig,
    dst: &mut dyn Destination,
) -> GenerateResult<()> {
    let splitter = Splitter::new(config.words());
    let base = analysis.path.rsplit('/').next().unwrap_or(&analysis.path);

    let files = [
        ("NAMESPACE".to_string(), r_gen::generate_namespace(analysis, &splitter)),
        (format!("R/{base}.R"), r_gen::generate_r_calls(analysis, &splitter)),
        (format!("src/rgo/{base}.c"), c_gen::generate_c(analysis, &splitter)),
        (format!("src/rgo/{base}.go"), go_gen::generate_go(analysis)?),
        ("src/Makevars".to_string(), r_gen::generate_makevars()),
        ("DESCRIPTION".to_string(), r_gen::generate_description(analysis, config.version())),
    ];

    for (path, text) in &files {
        let mut w = dst
            .open(path)
            .map_err(|source| GenerateError::Open { path: path.clone(), source })?;
        w.write_all(text.as_bytes()).map_err(GenerateError::Write)?;
    }
    dst.flush().map_err(GenerateError::Write)?;
    info!(files = files.len(), "generated {}", analysis.name);
    Ok(())
}

/// Run the build command: load config and package, analyse, render and
/// write. With `dry_run` the files are printed to stdout as a txtar archive.
pub fn run_generate(config_path: &Path, dry_run: bool) -> GenerateResult<()> {
    let config = RgoConfig::load(config_path)?;
    let codegen = &config.codegen;

    // Paths in the config are relative to its directory.
    let config_dir = match config_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let allowed = codegen.allowed()?;
    let pkg = schema::load_package(&codegen.input_path(config_dir), &codegen.pkg_path)?;
    let analysis = analyse(pkg, allowed.as_ref())?;
    if analysis.is_empty() {
        info!("no functions to wrap");
        return Ok(());
    }

    if dry_run {
        generate(&analysis, codegen, &mut Txtar::stdout())
    } else {
        generate(&analysis, codegen, &mut OsFs::new(codegen.out_path(config_dir)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const PKG: &str = r#"{"packages": [{
        "path": "example.com/stats", "name": "stats",
        "types": [{"name": "Celsius", "underlying": {"kind": "basic", "name": "float64"}}],
        "funcs": [
            {"name": "Mean", "params": [{"name": "x", "type": {"kind": "slice", "elem": {"kind": "basic", "name": "float64"}}}],
             "results": [{"name": "", "type": {"kind": "basic", "name": "float64"}}]},
            {"name": "ToKelvin", "params": [{"name": "c", "type": {"kind": "named", "name": "Celsius"}}],
             "results": [{"name": "", "type": {"kind": "basic", "name": "float64"}}, {"name": "err", "type": {"kind": "error"}}]},
            {"name": "Big", "params": [{"name": "n", "type": {"kind": "basic", "name": "int64"}}]},
            {"name": "helper"}
        ]
    }]}"#;

    fn workspace(extra: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("pkg.json"), PKG).unwrap();
        fs::write(
            dir.path().join("rgo.toml"),
            format!("[codegen]\npkg_path = \"example.com/stats\"\n{extra}"),
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_generate_into_txtar() {
        let dir = workspace("");
        let cfg = RgoConfig::load(&dir.path().join("rgo.toml")).unwrap();
        let pkg = schema::load_package(&dir.path().join("pkg.json"), "example.com/stats").unwrap();
        let analysis = analyse(pkg, None).unwrap();

        let mut dst = Txtar::new(Vec::new());
        generate(&analysis, &cfg.codegen, &mut dst).unwrap();
        let names: Vec<&str> = dst.files().keys().map(String::as_str).collect();
        assert_eq!(
            names,
            ["DESCRIPTION", "NAMESPACE", "R/stats.R", "src/Makevars", "src/rgo/stats.c", "src/rgo/stats.go"]
        );

        let go = String::from_utf8(dst.files()["src/rgo/stats.go"].clone()).unwrap();
        assert!(go.contains("func Wrapped_Mean(_R_x C.SEXP) C.SEXP {"));
        assert!(go.contains("func Wrapped_ToKelvin(_R_c C.SEXP) C.SEXP {"));
        assert!(!go.contains("Wrapped_Big"));
        assert!(go.contains("func unpackSEXP_Named_23_example_2e_com_2f_stats_7_Celsius(p C.SEXP) stats.Celsius {"));

        let out = String::from_utf8(dst.into_inner()).unwrap();
        assert!(out.starts_with("-- DESCRIPTION --\nPackage: stats\n"));
        assert!(out.contains("-- NAMESPACE --\n"));
    }

    #[test]
    fn test_run_generate_writes_package() {
        let dir = workspace("out_dir = \"rpkg\"\nversion = \"0.2.0\"\n");
        run_generate(&dir.path().join("rgo.toml"), false).unwrap();
        let root = dir.path().join("rpkg");
        let ns = fs::read_to_string(root.join("NAMESPACE")).unwrap();
        assert!(ns.contains("export(mean)\nexport(to_kelvin)\n"));
        assert!(root.join("src/rgo/stats.go").exists());
        assert!(root.join("src/rgo/stats.c").exists());
        assert!(fs::read_to_string(root.join("DESCRIPTION")).unwrap().contains("Version: 0.2.0\n"));
    }

    #[test]
    fn test_no_functions_writes_nothing() {
        let dir = workspace("out_dir = \"rpkg\"\nallowed_funcs = \"^Nothing$\"\n");
        run_generate(&dir.path().join("rgo.toml"), false).unwrap();
        assert!(!dir.path().join("rpkg").exists());
    }

    #[test]
    fn test_fatal_errors_write_nothing() {
        let dir = workspace("out_dir = \"rpkg\"\nallowed_funcs = \"(\"\n");
        let err = run_generate(&dir.path().join("rgo.toml"), false).unwrap_err();
        assert!(matches!(err, GenerateError::Pattern(_)));
        assert!(!dir.path().join("rpkg").exists());

        let dir = workspace("out_dir = \"rpkg\"\n");
        fs::write(dir.path().join("pkg.json"), r#"{"packages": []}"#).unwrap();
        let err = run_generate(&dir.path().join("rgo.toml"), false).unwrap_err();
        assert_eq!(err.to_string(), "pkg: no package analysed");
        assert!(!dir.path().join("rpkg").exists());
    }
}
