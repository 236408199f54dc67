// Configuration types for rgo-codegen, deserialized from rgo.toml.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{GenerateError, GenerateResult};
use crate::naming::DEFAULT_WORDS;

/// Name of the config file written by `rgo init`.
pub const CONFIG_FILE: &str = "rgo.toml";

/// Top-level config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RgoConfig {
    pub codegen: CodegenConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodegenConfig {
    /// Import path of the wrapped Go package.
    pub pkg_path: String,
    /// Loader output holding the package's type information.
    #[serde(default = "default_input")]
    pub input: String,
    /// Root of the generated R package.
    #[serde(default = "default_out_dir")]
    pub out_dir: String,
    /// Only functions matching this pattern are wrapped. Absent wraps all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_funcs: Option<String>,
    /// Words kept whole when converting Go names to R names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<String>>,
    /// DESCRIPTION version; 0.0.0 when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

fn default_input() -> String {
    "pkg.json".to_string()
}

fn default_out_dir() -> String {
    ".".to_string()
}

impl RgoConfig {
    /// The config `rgo init` writes for a package.
    pub fn new(pkg_path: impl Into<String>) -> Self {
        RgoConfig {
            codegen: CodegenConfig {
                pkg_path: pkg_path.into(),
                input: default_input(),
                out_dir: default_out_dir(),
                allowed_funcs: None,
                words: Some(DEFAULT_WORDS.iter().map(|w| w.to_string()).collect()),
                version: None,
            },
        }
    }

    pub fn from_toml(text: &str, path: &Path) -> GenerateResult<Self> {
        toml::from_str(text).map_err(|source| GenerateError::Config { path: path.to_path_buf(), source })
    }

    pub fn load(path: &Path) -> GenerateResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|source| GenerateError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml(&text, path)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}

impl CodegenConfig {
    /// Compiled `allowed_funcs` pattern.
    pub fn allowed(&self) -> GenerateResult<Option<Regex>> {
        Ok(self.allowed_funcs.as_deref().map(Regex::new).transpose()?)
    }

    /// Known words for the name splitter.
    pub fn words(&self) -> Vec<String> {
        match &self.words {
            Some(words) => words.clone(),
            None => DEFAULT_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }

    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or("0.0.0")
    }

    /// Input path resolved against the config file's directory.
    pub fn input_path(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.input)
    }

    /// Output root resolved against the config file's directory.
    pub fn out_path(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.out_dir)
    }
}
