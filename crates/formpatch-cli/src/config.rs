//! Optional TOML configuration.
//!
//! ```toml
//! [diff]
//! row_id_key = "id"
//!
//! [diff.leaf_arrays]
//! mode = "paths"
//! paths = ["/tags", "/rows/*/codes"]
//! ```

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use formpatch_diff::{DiffOptions, PathPattern};

use crate::cli::DiffFlags;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub diff: DiffOptions,
}

impl Config {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// The configured diff options with command-line flags applied on top.
    pub fn diff_options(&self, flags: &DiffFlags) -> anyhow::Result<DiffOptions> {
        let mut options = self.diff.clone();
        if let Some(key) = &flags.row_id {
            options = options.with_row_id_key(key.clone());
        }
        if !flags.leaf_arrays.is_empty() {
            let patterns = flags
                .leaf_arrays
                .iter()
                .map(|p| PathPattern::parse(p).with_context(|| format!("bad --leaf-array {p:?}")))
                .collect::<anyhow::Result<Vec<_>>>()?;
            options = options.with_leaf_array_paths(patterns);
        }
        Ok(options)
    }
}
