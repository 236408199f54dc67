// Output destinations for generated files.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Where generated files go. A file is complete when the writer returned
/// by `open` is dropped; nothing is committed before `flush`.
pub trait Destination {
    fn open(&mut self, path: &str) -> io::Result<Box<dyn Write + '_>>;
    fn flush(&mut self) -> io::Result<()>;
}

/// Writes files beneath a root directory, creating parent directories.
#[derive(Debug, Clone)]
pub struct OsFs {
    root: PathBuf,
}

impl OsFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        OsFs { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Destination for OsFs {
    fn open(&mut self, path: &str) -> io::Result<Box<dyn Write + '_>> {
        let full = self.root.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Box::new(File::create(full)?))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Collects files and writes them as one txtar archive on flush, sorted by
/// path.
pub struct Txtar<W: Write> {
    files: BTreeMap<String, Vec<u8>>,
    out: W,
}

impl Txtar<io::Stdout> {
    pub fn stdout() -> Self {
        Txtar::new(io::stdout())
    }
}

impl<W: Write> Txtar<W> {
    pub fn new(out: W) -> Self {
        Txtar { files: BTreeMap::new(), out }
    }

    /// Collected file contents by path.
    pub fn files(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.files
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Destination for Txtar<W> {
    fn open(&mut self, path: &str) -> io::Result<Box<dyn Write + '_>> {
        let buf = self.files.entry(path.to_string()).or_default();
        buf.clear();
        Ok(Box::new(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        for (name, data) in &self.files {
            writeln!(self.out, "-- {name} --")?;
            self.out.write_all(data)?;
            if !data.is_empty() && !data.ends_with(b"\n") {
                self.out.write_all(b"\n")?;
            }
        }
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dst: &mut dyn Destination, path: &str, chunks: &[&str]) {
        let mut w = dst.open(path).unwrap();
        for c in chunks {
            w.write_all(c.as_bytes()).unwrap();
        }
    }

    #[test]
    fn test_txtar_sorted_by_path() {
        let mut dst = Txtar::new(Vec::new());
        write(&mut dst, "path/to/b", &["B1", "B2"]);
        write(&mut dst, "path/to/a", &["A1", "A2"]);
        dst.flush().unwrap();
        let out = String::from_utf8(dst.into_inner()).unwrap();
        assert_eq!(out, "-- path/to/a --\nA1A2\n-- path/to/b --\nB1B2\n");
    }

    #[test]
    fn test_txtar_nothing_written_before_flush() {
        let mut dst = Txtar::new(Vec::new());
        write(&mut dst, "a", &["A\n"]);
        assert_eq!(dst.files().len(), 1);
        assert!(dst.into_inner().is_empty());
    }

    #[test]
    fn test_osfs_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let mut dst = OsFs::new(dir.path());
        write(&mut dst, "src/rgo/pkg.c", &["int x;\n"]);
        write(&mut dst, "NAMESPACE", &["useDynLib(pkg)\n"]);
        dst.flush().unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("src/rgo/pkg.c")).unwrap(), "int x;\n");
        assert!(dir.path().join("NAMESPACE").exists());
    }
}
