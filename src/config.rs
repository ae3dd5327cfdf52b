use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::collection::LoadOptions;

/// What to load and how. Usually read from a JSON file:
///
/// ```json
/// {
///   "paths": ["data/101.dat", "data/102.dat"],
///   "load": { "apply_disneu_transform": true }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub paths: Vec<PathBuf>,
    pub load: LoadOptions,
}

impl RunConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: RunConfig = serde_json::from_str(text).context("parsing JSON")?;
        Ok(config)
    }

    /// Relative paths in a config file are taken relative to that file.
    pub fn resolve_relative_to(mut self, base: &Path) -> Self {
        for p in &mut self.paths {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg = RunConfig::from_json_str("{}").unwrap();
        assert!(cfg.paths.is_empty());
        assert!(cfg.load.apply_disneu_transform);

        let cfg = RunConfig::from_json_str(r#"{"load": {}}"#).unwrap();
        assert!(cfg.load.apply_disneu_transform);
    }

    #[test]
    fn reads_paths_and_options() {
        let cfg = RunConfig::from_json_str(
            r#"{"paths": ["a.dat", "/abs/b.dat"], "load": {"apply_disneu_transform": false}}"#,
        )
        .unwrap();
        assert!(!cfg.load.apply_disneu_transform);
        let cfg = cfg.resolve_relative_to(Path::new("/data"));
        assert_eq!(
            cfg.paths,
            vec![PathBuf::from("/data/a.dat"), PathBuf::from("/abs/b.dat")]
        );
    }

    #[test]
    fn bad_json_is_an_error() {
        assert!(RunConfig::from_json_str("[1, 2]").is_err());
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(&path, r#"{"paths": ["x.dat"]}"#).unwrap();
        let cfg = RunConfig::from_json_file(&path).unwrap();
        assert_eq!(cfg.paths, vec![PathBuf::from("x.dat")]);
        assert!(RunConfig::from_json_file(&dir.path().join("missing.json")).is_err());
    }
}
