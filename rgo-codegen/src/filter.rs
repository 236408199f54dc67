// Candidate function selection: exported package-level functions allowed by
// the configured pattern.

use regex::Regex;
use tracing::debug;

use crate::types::Function;

/// Functions eligible for wrapping, in declaration order.
pub fn select_functions<'a>(funcs: &'a [Function], allowed: Option<&Regex>) -> Vec<&'a Function> {
    funcs.iter().filter(|f| is_candidate(f, allowed)).collect()
}

fn is_candidate(f: &Function, allowed: Option<&Regex>) -> bool {
    if !f.is_exported() {
        debug!("skipping {}: unexported function", f.name);
        return false;
    }
    if let Some(recv) = &f.recv {
        debug!("skipping {recv}.{}: method function", f.name);
        return false;
    }
    if let Some(re) = allowed {
        if !re.is_match(&f.name) {
            debug!("skipping {}: not matched by allowed_funcs", f.name);
            return false;
        }
    }
    true
}
