// Init command: write a starting rgo.toml for a Go package.

use std::error::Error;
use std::fs;
use std::path::Path;

use tracing::info;

use rgo_codegen::config::{CONFIG_FILE, RgoConfig};

/// Write the default config for `pkg_path` into `dir`, or print it to stdout
/// with `dry_run`.
pub fn run_init(pkg_path: &str, dir: &Path, dry_run: bool) -> Result<(), Box<dyn Error>> {
    let text = RgoConfig::new(pkg_path).to_toml()?;
    if dry_run {
        print!("{text}");
        return Ok(());
    }
    let path = dir.join(CONFIG_FILE);
    fs::write(&path, text).map_err(|e| format!("failed to write config {}: {e}", path.display()))?;
    info!("wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        run_init("example.com/stats", dir.path(), false).unwrap();
        let cfg = RgoConfig::load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(cfg.codegen.pkg_path, "example.com/stats");
        assert_eq!(cfg.codegen.input, "pkg.json");
    }

    #[test]
    fn test_init_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        run_init("example.com/stats", dir.path(), true).unwrap();
        assert!(!dir.path().join(CONFIG_FILE).exists());
    }
}
