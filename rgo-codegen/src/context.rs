// Analysis context: the wrapped function set and the marshaller registries
// for one package.

use regex::Regex;
use tracing::{debug, info, warn};

use crate::classify::{Role, accept};
use crate::error::{GenerateResult, Rejection};
use crate::filter::select_functions;
use crate::mangle::mangle;
use crate::types::{Function, Package, TypeTable};
use crate::walk::{Direction, Registry, walk};

/// Result of analysing one package. Constructed per run; nothing is shared
/// between runs.
#[derive(Debug)]
pub struct Analysis {
    /// Import path of the package.
    pub path: String,
    /// Package name used to qualify calls in generated Go source.
    pub name: String,
    pub types: TypeTable,
    /// Wrapped functions in declaration order.
    pub funcs: Vec<Function>,
    /// Types needing an R to Go marshaller.
    pub unpackers: Registry,
    /// Types needing a Go to R marshaller.
    pub packers: Registry,
    /// Candidate functions excluded by the classifier or walker.
    pub rejected: Vec<(String, Rejection)>,
}

impl Analysis {
    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }
}

/// Classify and walk every candidate function of `pkg`.
///
/// A rejected function is logged and left out; its siblings are unaffected.
/// A mangled name collision in either registry fails the whole run.
pub fn analyse(pkg: Package, allowed: Option<&Regex>) -> GenerateResult<Analysis> {
    info!("wrapping: {}", pkg.path);
    let mut analysis = Analysis {
        path: pkg.path,
        name: pkg.name,
        types: pkg.types,
        funcs: Vec::new(),
        unpackers: Registry::new(Direction::Decode),
        packers: Registry::new(Direction::Encode),
        rejected: Vec::new(),
    };

    for f in select_functions(&pkg.funcs, allowed) {
        match plan_function(f, &analysis.types) {
            Ok((unpack, pack)) => {
                analysis.unpackers.merge(unpack);
                analysis.packers.merge(pack);
                analysis.funcs.push(f.clone());
            }
            Err(err) => {
                warn!("skipping {}: {err}", f.name);
                analysis.rejected.push((f.name.clone(), err));
            }
        }
    }

    analysis.unpackers.check_collisions()?;
    analysis.packers.check_collisions()?;

    info!(
        funcs = analysis.funcs.len(),
        unpackers = analysis.unpackers.len(),
        packers = analysis.packers.len(),
        "analysis complete"
    );
    for (label, reg) in [("need C.SEXP->Go for:", &analysis.unpackers), ("need Go->C.SEXP for:", &analysis.packers)] {
        debug!("{label}");
        for ty in reg.types() {
            debug!(" {}: {ty}", mangle(ty));
        }
    }
    Ok(analysis)
}

/// Classify one function and walk it into scratch registries.
fn plan_function(f: &Function, table: &TypeTable) -> Result<(Registry, Registry), Rejection> {
    let params = f.param_tuple();
    let results = f.result_tuple();

    for advisory in accept(&params, Role::Parameter, table)? {
        warn!("warning: {advisory} in {}", f.name);
    }
    accept(&results, Role::Result, table)?;

    let mut unpack = Registry::new(Direction::Decode);
    let mut pack = Registry::new(Direction::Encode);
    walk(&params, &mut unpack, table)?;
    walk(&results, &mut pack, table)?;
    Ok((unpack, pack))
}
